use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// SQLite URL for the history ledger
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// TMDB v3 API key
    pub tmdb_api_key: String,

    /// TMDB API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// OMDb API key; ratings lookups are disabled without it
    #[serde(default)]
    pub omdb_api_key: Option<String>,

    /// OMDb API base URL
    #[serde(default = "default_omdb_api_url")]
    pub omdb_api_url: String,

    /// Region used when a request does not name one
    #[serde(default = "default_region")]
    pub default_region: String,

    /// Attempt cap shared by rate-limit and network retries
    #[serde(default = "default_max_fetch_attempts")]
    pub max_fetch_attempts: u32,

    /// JSON export from the previous storage schema, absorbed once at startup
    #[serde(default)]
    pub legacy_history_path: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_database_url() -> String {
    "sqlite://reelpick.db".to_string()
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_omdb_api_url() -> String {
    "https://www.omdbapi.com".to_string()
}

fn default_region() -> String {
    "US".to_string()
}

fn default_max_fetch_attempts() -> u32 {
    4
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from an explicit set of variables
    pub fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_vars(vars(&[("TMDB_API_KEY", "abc")])).unwrap();
        assert_eq!(config.tmdb_api_key, "abc");
        assert_eq!(config.tmdb_api_url, "https://api.themoviedb.org/3");
        assert_eq!(config.default_region, "US");
        assert_eq!(config.max_fetch_attempts, 4);
        assert_eq!(config.port, 3000);
        assert!(config.omdb_api_key.is_none());
        assert!(config.legacy_history_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_vars(vars(&[
            ("TMDB_API_KEY", "abc"),
            ("OMDB_API_KEY", "xyz"),
            ("DEFAULT_REGION", "GB"),
            ("MAX_FETCH_ATTEMPTS", "6"),
            ("PORT", "8080"),
        ]))
        .unwrap();
        assert_eq!(config.omdb_api_key.as_deref(), Some("xyz"));
        assert_eq!(config.default_region, "GB");
        assert_eq!(config.max_fetch_attempts, 6);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_missing_api_key_fails() {
        let result = Config::from_vars(vars(&[("PORT", "8080")]));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("tmdb_api_key"));
    }
}
