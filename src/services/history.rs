use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::{
    error::{AppError, AppResult},
    models::{InteractionKind, LegacyHistory, MovieId},
};

const LEGACY_IMPORT_FLAG: &str = "legacy_import_done";

/// Per-set counts, keyed by storage key
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HistorySummary {
    pub counts: BTreeMap<String, i64>,
}

/// Durable, categorised sets of movie ids
///
/// Adding an id already present is a no-op. The shown set only shrinks via
/// [`HistoryLedger::clear_shown`]; the other sets record user opinion and are
/// never cleared here.
#[derive(Clone)]
pub struct HistoryLedger {
    pool: SqlitePool,
}

impl HistoryLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Adds an id to a set. Returns `true` when it was not already present.
    pub async fn mark(&self, kind: InteractionKind, movie_id: MovieId) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO history_entries (kind, movie_id, recorded_at) VALUES (?, ?, ?)",
        )
        .bind(kind.storage_key())
        .bind(movie_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        let added = result.rows_affected() > 0;
        tracing::debug!(kind = %kind, movie_id, added, "History mark");
        Ok(added)
    }

    pub async fn mark_shown(&self, movie_id: MovieId) -> AppResult<bool> {
        self.mark(InteractionKind::Shown, movie_id).await
    }

    pub async fn mark_watched(&self, movie_id: MovieId) -> AppResult<bool> {
        self.mark(InteractionKind::Watched, movie_id).await
    }

    pub async fn mark_loved(&self, movie_id: MovieId) -> AppResult<bool> {
        self.mark(InteractionKind::Loved, movie_id).await
    }

    pub async fn mark_not_interested(&self, movie_id: MovieId) -> AppResult<bool> {
        self.mark(InteractionKind::NotInterested, movie_id).await
    }

    pub async fn mark_dinner_like(&self, movie_id: MovieId) -> AppResult<bool> {
        self.mark(InteractionKind::DinnerLiked, movie_id).await
    }

    pub async fn mark_dinner_dislike(&self, movie_id: MovieId) -> AppResult<bool> {
        self.mark(InteractionKind::DinnerDisliked, movie_id).await
    }

    pub async fn contains(&self, kind: InteractionKind, movie_id: MovieId) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM history_entries WHERE kind = ? AND movie_id = ?)",
        )
        .bind(kind.storage_key())
        .bind(movie_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    pub async fn has_been_shown(&self, movie_id: MovieId) -> AppResult<bool> {
        self.contains(InteractionKind::Shown, movie_id).await
    }

    pub async fn ids(&self, kind: InteractionKind) -> AppResult<HashSet<MovieId>> {
        let ids: Vec<MovieId> =
            sqlx::query_scalar("SELECT movie_id FROM history_entries WHERE kind = ?")
                .bind(kind.storage_key())
                .fetch_all(&self.pool)
                .await?;

        Ok(ids.into_iter().collect())
    }

    /// Union of the given sets
    pub async fn exclusion_set(&self, kinds: &[InteractionKind]) -> AppResult<HashSet<MovieId>> {
        let mut excluded = HashSet::new();
        for kind in kinds {
            excluded.extend(self.ids(*kind).await?);
        }
        Ok(excluded)
    }

    /// Empties the shown set only. Returns the number of ids removed.
    pub async fn clear_shown(&self) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM history_entries WHERE kind = ?")
            .bind(InteractionKind::Shown.storage_key())
            .execute(&self.pool)
            .await?;

        tracing::info!(cleared = result.rows_affected(), "Shown history cleared");
        Ok(result.rows_affected())
    }

    pub async fn summary(&self) -> AppResult<HistorySummary> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT kind, COUNT(*) FROM history_entries GROUP BY kind")
                .fetch_all(&self.pool)
                .await?;

        let mut counts: BTreeMap<String, i64> = InteractionKind::ALL
            .iter()
            .map(|kind| (kind.storage_key().to_string(), 0))
            .collect();
        counts.extend(rows);

        Ok(HistorySummary { counts })
    }

    pub async fn legacy_import_done(&self) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM ledger_flags WHERE name = ?)")
                .bind(LEGACY_IMPORT_FLAG)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    /// Unions sets exported by the previous storage schema into the ledger
    ///
    /// Runs at most once per database: the completion flag is written in the
    /// same transaction, and later calls return `Ok(false)` without touching
    /// any set.
    pub async fn import_legacy(&self, legacy: &LegacyHistory) -> AppResult<bool> {
        if self.legacy_import_done().await? {
            tracing::debug!("Legacy history already imported");
            return Ok(false);
        }

        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        let mut imported = 0u64;

        for kind in InteractionKind::ALL {
            for movie_id in legacy.ids(kind) {
                let result = sqlx::query(
                    "INSERT OR IGNORE INTO history_entries (kind, movie_id, recorded_at) VALUES (?, ?, ?)",
                )
                .bind(kind.storage_key())
                .bind(*movie_id)
                .bind(&now)
                .execute(&mut *tx)
                .await?;
                imported += result.rows_affected();
            }
        }

        sqlx::query("INSERT INTO ledger_flags (name, value) VALUES (?, ?)")
            .bind(LEGACY_IMPORT_FLAG)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(imported, "Legacy history imported");
        Ok(true)
    }

    /// Imports a legacy JSON export if one exists at `path`
    ///
    /// A missing file is not an error; an unreadable one is.
    pub async fn import_legacy_file(&self, path: &Path) -> AppResult<bool> {
        if self.legacy_import_done().await? {
            return Ok(false);
        }

        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No legacy history export found");
                return Ok(false);
            }
            Err(e) => {
                return Err(AppError::Internal(format!(
                    "Failed to read legacy history {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let legacy: LegacyHistory = serde_json::from_str(&raw).map_err(|e| {
            AppError::InvalidInput(format!("Malformed legacy history {}: {}", path.display(), e))
        })?;

        self.import_legacy(&legacy).await
    }
}
