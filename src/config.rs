use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    /// Callback HTTP server (the surface the remote ledger calls back into)
    #[serde(default)]
    pub callbacks: CallbackConfig,
    /// Remote currency ledger endpoint + app credentials
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Link/transaction store backend selection
    #[serde(default)]
    pub store: StoreConfig,
    /// Login balance-probe dedup window
    #[serde(default)]
    pub login_dedup: LoginDedupConfig,
    /// Stale-escrow reaper policy (off unless explicitly enabled)
    #[serde(default)]
    pub reaper: ReaperPolicyConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CallbackConfig {
    pub host: String,
    pub port: u16,
    /// Base URL the ledger uses to reach this process. Callback URLs sent
    /// with every transaction submission are built from it.
    pub external_base: String,
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7025,
            external_base: "http://127.0.0.1:7025".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LedgerConfig {
    pub base_url: String,
    pub app_key: String,
    pub app_secret: String,
    pub timeout_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://sandbox.ledger.example".to_string(),
            app_key: "gridpay-dev".to_string(),
            app_secret: "dev-secret".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StoreConfig {
    /// "memory" or "postgres"
    pub backend: String,
    pub postgres_url: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            postgres_url: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoginDedupConfig {
    pub window_secs: u64,
}

impl Default for LoginDedupConfig {
    fn default() -> Self {
        Self { window_secs: 10 }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReaperPolicyConfig {
    pub enabled: bool,
    pub scan_interval_secs: u64,
    /// Assets stuck in ENACT_PENDING longer than this get cancelled.
    pub max_pending_secs: u64,
    /// Terminal assets older than this get purged from the registry.
    pub retention_secs: u64,
}

impl Default for ReaperPolicyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scan_interval_secs: 60,
            max_pending_secs: 3600,
            retention_secs: 86400,
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Self {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .unwrap_or_else(|_| panic!("Failed to read config file: {}", config_path));
        serde_yaml::from_str(&content).expect("Failed to parse config yaml")
    }
}
