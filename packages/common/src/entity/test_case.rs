use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Test-case configuration of a problem, forwarded to the judge server
/// verbatim. The judging pipeline never interprets `config` or
/// `subcheck_config`; it only checks whether `config` is empty.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "test_case")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Bundle identifier the judge server resolves test data by.
    pub bundle_id: Uuid,
    /// Ordered case list: `[{ "name": "...", "score": 20 }, ...]`.
    #[sea_orm(column_type = "JsonBinary")]
    pub config: serde_json::Value,

    pub spj_id: Uuid,
    /// One of: `none`, `traditional`, `simple`.
    pub spj_mode: String,
    pub use_spj: bool,

    #[sea_orm(column_type = "JsonBinary")]
    pub subcheck_config: serde_json::Value,
    pub use_subcheck: bool,

    /// Whether submissions against this problem may expose test-point data.
    /// Snapshotted onto the submission when its judging task claims it.
    pub allow_download: bool,

    pub problem_id: i32,
    #[sea_orm(belongs_to, from = "problem_id", to = "id")]
    pub problem: HasOne<super::problem::Entity>,

    pub created_at: DateTimeUtc,
}

impl Model {
    /// Number of configured cases.
    pub fn case_count(&self) -> usize {
        self.config.as_array().map(|cases| cases.len()).unwrap_or(0)
    }
}

impl ActiveModelBehavior for ActiveModel {}
