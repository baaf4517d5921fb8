use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Marker that a user has at least one accepted submission for a problem.
///
/// At most one row may exist per (user, problem); the composite unique
/// index is created at startup (schema-sync cannot declare it) and inserts
/// go through on-conflict-do-nothing. A marker, not a counter.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "problem_solve")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub problem_id: i32,
    #[sea_orm(belongs_to, from = "problem_id", to = "id")]
    pub problem: HasOne<super::problem::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
