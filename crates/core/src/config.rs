use serde::Deserialize;

/// Root application configuration. Loaded from environment variables with
/// the prefix `MERCHANT_DESK__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_tenant_id")]
    pub tenant_id: String,
    #[serde(default)]
    pub console: ConsoleConfig,
}

/// Tunables for the console core. These are deployment policy, not
/// algorithmic content: screens read them, the engines take them as input.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleConfig {
    /// A subscription counts as near expiry when this many days or fewer
    /// remain.
    #[serde(default = "default_near_expiry_days")]
    pub near_expiry_days: i64,
    /// How long a speculative change may stay unconfirmed before the watchdog
    /// reverts it.
    #[serde(default = "default_pending_timeout_secs")]
    pub pending_timeout_secs: u64,
}

fn default_tenant_id() -> String {
    "seller-01".to_string()
}
fn default_near_expiry_days() -> i64 {
    7
}
fn default_pending_timeout_secs() -> u64 {
    30
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            near_expiry_days: default_near_expiry_days(),
            pending_timeout_secs: default_pending_timeout_secs(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tenant_id: default_tenant_id(),
            console: ConsoleConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("MERCHANT_DESK")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
