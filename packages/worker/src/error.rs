use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[allow(dead_code)]
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Db(#[from] sea_orm::DbErr),

    #[allow(dead_code)]
    #[error("MQ error: {0}")]
    Mq(String),
}

pub type Result<T> = std::result::Result<T, WorkerError>;
