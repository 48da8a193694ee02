use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `DRAFTDESK__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub drafting: DraftingConfig,
    #[serde(default)]
    pub publish: PublishConfig,
}

/// Conversation session tuning: context window, message caps, watchdog.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Most recent N messages forwarded to the completion service per turn.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Per-message content cap applied when building the upstream context.
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
    /// Delay before the stuck-request watchdog posts a recovery suggestion.
    #[serde(default = "default_watchdog_delay_secs")]
    pub watchdog_delay_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DraftingConfig {
    /// Country used when a targeting record carries no geography at all.
    #[serde(default = "default_fallback_country")]
    pub fallback_country: String,
    /// Radius attached to city targeting when the source omits one.
    #[serde(default = "default_city_radius")]
    pub city_radius: u32,
    #[serde(default = "default_city_radius_unit")]
    pub city_radius_unit: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_publish_timeout_ms")]
    pub timeout_ms: u64,
}

// Default functions
fn default_window_size() -> usize {
    12
}
fn default_max_message_chars() -> usize {
    4000
}
fn default_watchdog_delay_secs() -> u64 {
    30
}
fn default_fallback_country() -> String {
    "BR".to_string()
}
fn default_city_radius() -> u32 {
    25
}
fn default_city_radius_unit() -> String {
    "kilometer".to_string()
}
fn default_api_base_url() -> String {
    "https://graph.facebook.com/v19.0".to_string()
}
fn default_publish_timeout_ms() -> u64 {
    30_000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            max_message_chars: default_max_message_chars(),
            watchdog_delay_secs: default_watchdog_delay_secs(),
        }
    }
}

impl Default for DraftingConfig {
    fn default() -> Self {
        Self {
            fallback_country: default_fallback_country(),
            city_radius: default_city_radius(),
            city_radius_unit: default_city_radius_unit(),
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            timeout_ms: default_publish_timeout_ms(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            drafting: DraftingConfig::default(),
            publish: PublishConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("DRAFTDESK")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
