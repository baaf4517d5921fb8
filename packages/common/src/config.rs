use serde::Deserialize;

use crate::retry::RetryPolicy;

/// App-level MQ configuration, shared by the producer (server) and the
/// consumer (worker).
#[derive(Debug, Deserialize, Clone)]
pub struct MqAppConfig {
    /// Whether MQ is enabled. Default: true.
    /// Note: the worker ignores this field (it always requires MQ).
    #[serde(default = "default_mq_enabled")]
    pub enabled: bool,
    /// Redis connection URL. Default: "redis://localhost:6379".
    #[serde(default = "default_mq_url")]
    pub url: String,
    /// Connection pool size. Default: 5.
    #[serde(default = "default_mq_pool_size")]
    pub pool_size: u8,
    /// Queue the judging tasks travel on. Default: "judge_tasks".
    #[serde(default = "default_mq_queue_name")]
    pub queue_name: String,
}

fn default_mq_enabled() -> bool {
    true
}
fn default_mq_url() -> String {
    "redis://localhost:6379".into()
}
fn default_mq_pool_size() -> u8 {
    5
}
fn default_mq_queue_name() -> String {
    "judge_tasks".into()
}

impl Default for MqAppConfig {
    fn default() -> Self {
        Self {
            enabled: default_mq_enabled(),
            url: default_mq_url(),
            pool_size: default_mq_pool_size(),
            queue_name: default_mq_queue_name(),
        }
    }
}

/// Judge server endpoint and round-trip bounds.
#[derive(Debug, Deserialize, Clone)]
pub struct JudgeServerConfig {
    /// Default: "127.0.0.1".
    #[serde(default = "default_judge_host")]
    pub host: String,
    /// Default: 18082.
    #[serde(default = "default_judge_port")]
    pub port: u16,
    /// TCP connect timeout in milliseconds. Default: 5000.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Grace margin added to the problem's CPU limit for the response
    /// deadline, covering compile time and transfer overhead.
    /// Default: 10000.
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_judge_host() -> String {
    "127.0.0.1".into()
}
fn default_judge_port() -> u16 {
    18082
}
fn default_connect_timeout_ms() -> u64 {
    5000
}
fn default_grace_ms() -> u64 {
    10_000
}

impl Default for JudgeServerConfig {
    fn default() -> Self {
        Self {
            host: default_judge_host(),
            port: default_judge_port(),
            connect_timeout_ms: default_connect_timeout_ms(),
            grace_ms: default_grace_ms(),
            retry: RetryPolicy::default(),
        }
    }
}

impl JudgeServerConfig {
    /// `host:port` form used to open the transport connection.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
