use std::time::Duration;

use sea_orm::sea_query::{Index, PostgresQueryBuilder};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use tracing::{info, warn};

use common::entity::problem_solve;

pub async fn init_db(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    // Set connection pool options
    opt.max_connections(100)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(8))
        .max_lifetime(Duration::from_secs(8))
        .sqlx_logging(true);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("common::entity::*")
        .sync(&db)
        .await?;

    Ok(db)
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite unique indexes, so the
/// (user_id, problem_id) uniqueness backing the solve marker is created
/// manually on startup. The worker's on-conflict-do-nothing insert relies
/// on it.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_problem_solve_user_problem")
        .table(problem_solve::Entity)
        .col(problem_solve::Column::UserId)
        .col(problem_solve::Column::ProblemId)
        .unique()
        .to_string(PostgresQueryBuilder);

    match db.execute_unprepared(&stmt).await {
        Ok(_) => {
            info!("Ensured index idx_problem_solve_user_problem exists");
        }
        Err(e) => {
            warn!("Failed to create index idx_problem_solve_user_problem: {}", e);
        }
    }

    Ok(())
}
