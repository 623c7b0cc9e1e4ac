use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::models::MovieId;

/// The six history sets a movie id can belong to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Shown,
    Watched,
    Loved,
    NotInterested,
    DinnerLiked,
    DinnerDisliked,
}

impl InteractionKind {
    pub const ALL: [InteractionKind; 6] = [
        InteractionKind::Shown,
        InteractionKind::Watched,
        InteractionKind::Loved,
        InteractionKind::NotInterested,
        InteractionKind::DinnerLiked,
        InteractionKind::DinnerDisliked,
    ];

    /// Stable storage key for the set; never rename
    pub fn storage_key(&self) -> &'static str {
        match self {
            InteractionKind::Shown => "shown",
            InteractionKind::Watched => "watched",
            InteractionKind::Loved => "loved",
            InteractionKind::NotInterested => "not_interested",
            InteractionKind::DinnerLiked => "dinner_liked",
            InteractionKind::DinnerDisliked => "dinner_disliked",
        }
    }
}

impl Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.storage_key())
    }
}

/// History sets exported by the previous storage schema
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct LegacyHistory {
    pub shown: Vec<MovieId>,
    pub watched: Vec<MovieId>,
    pub loved: Vec<MovieId>,
    pub not_interested: Vec<MovieId>,
    pub dinner_liked: Vec<MovieId>,
    pub dinner_disliked: Vec<MovieId>,
}

impl LegacyHistory {
    pub fn ids(&self, kind: InteractionKind) -> &[MovieId] {
        match kind {
            InteractionKind::Shown => &self.shown,
            InteractionKind::Watched => &self.watched,
            InteractionKind::Loved => &self.loved,
            InteractionKind::NotInterested => &self.not_interested,
            InteractionKind::DinnerLiked => &self.dinner_liked,
            InteractionKind::DinnerDisliked => &self.dinner_disliked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_keys_match_serde_names() {
        for kind in InteractionKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.storage_key()));
        }
    }

    #[test]
    fn test_legacy_history_partial_json() {
        let legacy: LegacyHistory =
            serde_json::from_str(r#"{"watched": [1, 2], "loved": [2]}"#).unwrap();
        assert_eq!(legacy.ids(InteractionKind::Watched), &[1, 2]);
        assert!(legacy.ids(InteractionKind::Shown).is_empty());
    }
}
