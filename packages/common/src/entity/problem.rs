use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "problem")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String, // in Markdown
    pub time_limit: i32,   // in milliseconds
    pub memory_limit: i32, // in megabytes

    /// Hidden problems are invisible to ordinary users.
    pub hidden: bool,
    /// Global kill-switch for new submissions, independent of visibility.
    pub disabled: bool,

    /// Count of submissions ever created. Incremented atomically in the
    /// database; never read-modify-written in application memory.
    pub submission_count: i32,
    /// Count of accepted submissions (not unique solvers).
    pub accepted_count: i32,

    #[sea_orm(has_one)]
    pub test_case: HasOne<super::test_case::Entity>,

    #[sea_orm(has_many)]
    pub submissions: HasMany<super::submission::Entity>,

    #[sea_orm(has_many)]
    pub solves: HasMany<super::problem_solve::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
