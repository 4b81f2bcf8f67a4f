use serde::Deserialize;

/// Smallest accepted recent-release window, in days
pub const MIN_RECENT_WINDOW_DAYS: u32 = 1;
/// Largest accepted recent-release window, in days
pub const MAX_RECENT_WINDOW_DAYS: u32 = 30;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// PostgreSQL connection URL for tracked libraries. In-memory storage when unset.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Redis connection URL for the catalog response cache. Caching is off when unset.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// TMDB API key
    pub tmdb_api_key: String,

    /// TMDB API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// TMDB image CDN base URL
    #[serde(default = "default_tmdb_image_url")]
    pub tmdb_image_url: String,

    /// Show-status (AI summary) backend endpoint
    #[serde(default = "default_status_api_url")]
    pub status_api_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Window for the recently released feed
    #[serde(default = "default_recent_window_days")]
    pub recent_window_days: u32,

    /// Seconds a user session may sit unused before it is evicted
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tmdb_image_url() -> String {
    "https://image.tmdb.org/t/p".to_string()
}

fn default_status_api_url() -> String {
    "https://keepup-backend-5ilq.onrender.com/api/show-status".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_recent_window_days() -> u32 {
    7
}

fn default_session_idle_secs() -> u64 {
    1800
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !(MIN_RECENT_WINDOW_DAYS..=MAX_RECENT_WINDOW_DAYS).contains(&self.recent_window_days) {
            anyhow::bail!(
                "RECENT_WINDOW_DAYS must be between {} and {}, got {}",
                MIN_RECENT_WINDOW_DAYS,
                MAX_RECENT_WINDOW_DAYS,
                self.recent_window_days
            );
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
