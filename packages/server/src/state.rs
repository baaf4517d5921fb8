use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    /// None when MQ is disabled (e.g. in tests); submissions are then
    /// created but never enqueued.
    pub mq: Option<Arc<mq::Mq>>,
}
