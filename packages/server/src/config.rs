use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub use common::config::MqAppConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// Submission-surface settings.
#[derive(Debug, Deserialize, Clone)]
pub struct SubmissionConfig {
    /// Maximum source size in bytes. Default: 65536.
    #[serde(default = "default_max_source_size")]
    pub max_source_size: usize,
    /// Root of per-submission output artifacts written by the judge server:
    /// `<submission_root>/<submission_id>/<case_name>.out`.
    #[serde(default = "default_submission_root")]
    pub submission_root: String,
    /// Root of problem test data:
    /// `<test_data_root>/<bundle_id>/<case_name>.{in,ans}`.
    #[serde(default = "default_test_data_root")]
    pub test_data_root: String,
}

fn default_max_source_size() -> usize {
    64 * 1024
}
fn default_submission_root() -> String {
    "data/submissions".into()
}
fn default_test_data_root() -> String {
    "data/test-data".into()
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            max_source_size: default_max_source_size(),
            submission_root: default_submission_root(),
            test_data_root: default_test_data_root(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub submission: SubmissionConfig,
    #[serde(default)]
    pub mq: MqAppConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("CHICORY_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600_i64)?
            .set_default("database.url", "postgres://localhost:5432/chicory")?
            .set_default("auth.jwt_secret", "")?
            // Load from config/config.toml
            .add_source(File::with_name(&config_path).required(false))
            // Override from environment (e.g., CHICORY__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("CHICORY").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
