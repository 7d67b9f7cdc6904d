use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    pub database_url: String,
    pub jwt_secret: String,

    #[serde(default = "default_jwt_audience")]
    pub jwt_audience: String,

    pub evolution_api_url: String,
    /// Gateway credential used when an instance row carries no key of its own.
    pub evolution_api_key: String,

    #[serde(default)]
    pub stripe_secret_key: Option<String>,

    #[serde(default = "default_stripe_api_url")]
    pub stripe_api_url: String,

    #[serde(default = "default_trial_days")]
    pub trial_days: i64,

    /// Server-side reconciliation sweep period. Zero disables the sweep.
    #[serde(default)]
    pub reconcile_interval_secs: u64,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    listen_addr: Option<String>,
    database_url: Option<String>,
    jwt_secret: Option<String>,
    jwt_audience: Option<String>,
    evolution_api_url: Option<String>,
    evolution_api_key: Option<String>,
    stripe_secret_key: Option<String>,
    stripe_api_url: Option<String>,
    trial_days: Option<i64>,
    reconcile_interval_secs: Option<u64>,
    log_dir: Option<String>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_jwt_audience() -> String {
    "authenticated".to_string()
}

fn default_stripe_api_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_trial_days() -> i64 {
    7
}

const MAX_TRIAL_DAYS: i64 = 3650;

fn default_log_dir() -> String {
    "logs".to_string()
}

impl ServerConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config: PartialServerConfig = if let Some(path_str) = config_path {
            let path = Path::new(path_str);
            if path.exists() {
                let contents = fs::read_to_string(path)
                    .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
                toml::from_str(&contents)
                    .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))?
            } else {
                PartialServerConfig::default()
            }
        } else {
            PartialServerConfig::default()
        };

        // 2. Load from environment variables
        let env_config: PartialServerConfig = envy::from_env::<PartialServerConfig>()
            .map_err(|e| format!("Failed to load config from environment: {e}"))?;

        // 3. Merge: environment overrides file
        Self::merge(env_config, file_config)
    }

    fn merge(env_config: PartialServerConfig, file_config: PartialServerConfig) -> Result<Self, String> {
        let stripe_secret_key = env_config
            .stripe_secret_key
            .or(file_config.stripe_secret_key)
            .filter(|key| !key.trim().is_empty());

        let trial_days = env_config.trial_days.or(file_config.trial_days)
            .unwrap_or_else(default_trial_days);
        if !(0..=MAX_TRIAL_DAYS).contains(&trial_days) {
            return Err(format!("TRIAL_DAYS must be between 0 and {MAX_TRIAL_DAYS}, got {trial_days}"));
        }

        Ok(ServerConfig {
            listen_addr: env_config.listen_addr.or(file_config.listen_addr)
                .unwrap_or_else(default_listen_addr),
            database_url: env_config.database_url.or(file_config.database_url)
                .ok_or("DATABASE_URL is required")?,
            jwt_secret: env_config.jwt_secret.or(file_config.jwt_secret)
                .ok_or("JWT_SECRET is required")?,
            jwt_audience: env_config.jwt_audience.or(file_config.jwt_audience)
                .unwrap_or_else(default_jwt_audience),
            evolution_api_url: env_config.evolution_api_url.or(file_config.evolution_api_url)
                .ok_or("EVOLUTION_API_URL is required")?,
            evolution_api_key: env_config.evolution_api_key.or(file_config.evolution_api_key)
                .ok_or("EVOLUTION_API_KEY is required")?,
            stripe_secret_key,
            stripe_api_url: env_config.stripe_api_url.or(file_config.stripe_api_url)
                .unwrap_or_else(default_stripe_api_url),
            trial_days,
            reconcile_interval_secs: env_config.reconcile_interval_secs.or(file_config.reconcile_interval_secs)
                .unwrap_or(0),
            log_dir: env_config.log_dir.or(file_config.log_dir)
                .unwrap_or_else(default_log_dir),
        })
    }
}
