use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest("/submissions", submission_routes())
}

fn submission_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::submission::create_submission))
        .routes(routes!(handlers::submission::get_submission))
        .routes(routes!(handlers::submission::get_submission_status))
        .routes(routes!(handlers::submission::get_test_point))
}
