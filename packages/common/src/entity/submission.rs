use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A code submission moving through the judging lifecycle.
///
/// `status` holds the integer-coded
/// [`SubmissionStatus`](crate::SubmissionStatus); the encoding is part of
/// the storage contract. A submission row is written exactly three times:
/// insert (Pending), claim (Judging + `allow_download` snapshot), and the
/// terminal result; only its own judging task performs the last two.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submission")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "Text")]
    pub source: String,
    /// Language tag, e.g. `c`, `cpp`.
    pub language: String,
    pub status: i32,
    pub score: i32,
    /// Judge-reported peak CPU time, milliseconds.
    pub execute_time: i64,
    /// Judge-reported peak memory.
    pub execute_memory: i64,
    /// Per-case result records from the judge response, stored verbatim.
    #[sea_orm(column_type = "JsonBinary")]
    pub detail: serde_json::Value,
    /// Diagnostic/compile output.
    #[sea_orm(column_type = "Text")]
    pub log: String,
    /// Snapshot of the problem's `allow_download` at judge time; not
    /// mutable afterward.
    pub allow_download: bool,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub problem_id: i32,
    #[sea_orm(belongs_to, from = "problem_id", to = "id")]
    pub problem: HasOne<super::problem::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
