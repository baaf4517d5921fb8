use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub use common::config::{JudgeServerConfig, MqAppConfig};

/// Worker-specific configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    /// Unique identifier for this worker instance. Default: "worker-1".
    #[serde(default = "default_worker_id")]
    pub id: String,
    /// Number of judging tasks processed concurrently. Default: 4.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_worker_id() -> String {
    "worker-1".into()
}
fn default_batch_size() -> usize {
    4
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            id: default_worker_id(),
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Worker application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkerAppConfig {
    #[serde(default)]
    pub worker: WorkerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub mq: MqAppConfig,
    #[serde(default)]
    pub judge: JudgeServerConfig,
}

impl WorkerAppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("CHICORY_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("worker.id", "worker-1")?
            .set_default("worker.batch_size", 4_i64)?
            .set_default("database.url", "postgres://localhost:5432/chicory")?
            .set_default("mq.enabled", true)?
            .set_default("mq.url", "redis://localhost:6379")?
            .set_default("mq.pool_size", 5_i64)?
            .set_default("mq.queue_name", "judge_tasks")?
            .set_default("judge.host", "127.0.0.1")?
            .set_default("judge.port", 18082_i64)?
            .add_source(File::with_name(&config_path).required(false))
            .add_source(Environment::with_prefix("CHICORY").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
