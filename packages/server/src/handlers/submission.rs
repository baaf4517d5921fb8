use std::path::{Path as FsPath, PathBuf};

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ExprTrait, QueryFilter, Set,
    TransactionTrait,
};
use tracing::{debug, error, info, instrument, warn};

use common::entity::{problem, submission, test_case};
use common::judge::ResourceLimit;
use common::{JudgeTask, SubmissionStatus};

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::submission::*;
use crate::state::AppState;

/// Characters shown in a test-point preview before truncation.
const PREVIEW_LENGTH: usize = 255;

/// The submission-creation gate rule.
///
/// A privileged caller may always submit; everyone else needs the problem
/// visible and accepting submissions (`allow_submit` = not disabled and at
/// least one configured case).
fn submission_allowed(
    privileged: bool,
    visible: bool,
    disabled: bool,
    configured_cases: usize,
) -> bool {
    let allow_submit = !disabled && configured_cases > 0;
    privileged || (visible && allow_submit)
}

/// Find a submission by ID or return 404.
async fn find_submission<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<submission::Model, AppError> {
    submission::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Submission not found".into()))
}

/// Enqueue the judging task for a freshly created submission.
#[instrument(skip(state, sub, tc), fields(submission_id = sub.id))]
async fn enqueue_judge_task(
    state: &AppState,
    sub: &submission::Model,
    prob: &problem::Model,
    tc: &test_case::Model,
) {
    let Some(ref mq) = state.mq else {
        debug!("MQ unavailable, skipping enqueue");
        return;
    };

    let judge_task = JudgeTask {
        task_id: sub.id,
        case_id: tc.bundle_id,
        spj_id: tc.use_spj.then_some(tc.spj_id),
        test_case_config: tc.config.clone(),
        subcheck_config: tc.use_subcheck.then(|| tc.subcheck_config.clone()),
        language: sub.language.clone(),
        source: sub.source.clone(),
        limit: ResourceLimit {
            // Time limit passes through in milliseconds; memory limit is
            // stored in megabytes and sent in bytes.
            max_cpu_time: prob.time_limit as i64,
            max_memory: prob.memory_limit as i64 * 1024 * 1024,
        },
    };

    let task = match judge_task.into_task() {
        Ok(task) => task,
        Err(e) => {
            error!(error = %e, "Failed to serialize JudgeTask");
            return;
        }
    };

    match mq
        .publish(&state.config.mq.queue_name, None, &task, None)
        .await
    {
        Ok(_) => {
            info!(message_id = %task.id, "Judging task enqueued");
        }
        Err(e) => {
            warn!(error = %e, "Failed to enqueue judging task");
        }
    }
}

/// Create a submission.
#[utoipa::path(
    post,
    path = "/",
    tag = "Submissions",
    operation_id = "createSubmission",
    summary = "Submit a solution to a problem",
    description = "Creates a submission in Pending status and enqueues its judging task. Allowed for holders of `problem:judge`, or for anyone when the problem is visible and accepting submissions.",
    request_body = CreateSubmissionRequest,
    responses(
        (status = 201, description = "Submission created", body = SubmissionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn create_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateSubmissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_submission(&payload, state.config.submission.max_source_size)?;

    let txn = state.db.begin().await?;

    let prob = problem::Entity::find_by_id(payload.problem_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Problem not found".into()))?;

    // The test-case row is provisioned with the problem; a problem without
    // one cannot be judged at all.
    let tc = test_case::Entity::find()
        .filter(test_case::Column::ProblemId.eq(prob.id))
        .one(&txn)
        .await?;

    let Some(tc) = tc else {
        return Err(AppError::Validation("Problem submit is not allowed".into()));
    };

    let privileged = auth_user.has_permission(AuthUser::JUDGE_PERMISSION);
    if !submission_allowed(privileged, !prob.hidden, prob.disabled, tc.case_count()) {
        return Err(AppError::Validation("Problem submit is not allowed".into()));
    }

    let new_submission = submission::ActiveModel {
        source: Set(payload.source),
        language: Set(payload.language.trim().to_string()),
        status: Set(i32::from(SubmissionStatus::Pending)),
        score: Set(0),
        execute_time: Set(0),
        execute_memory: Set(0),
        detail: Set(serde_json::Value::Array(vec![])),
        log: Set(String::new()),
        allow_download: Set(false),
        user_id: Set(auth_user.user_id),
        problem_id: Set(prob.id),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let model = new_submission.insert(&txn).await?;

    // Atomic in-database increment; many gates race on this counter.
    problem::Entity::update_many()
        .col_expr(
            problem::Column::SubmissionCount,
            Expr::col(problem::Column::SubmissionCount).add(1),
        )
        .filter(problem::Column::Id.eq(prob.id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    enqueue_judge_task(&state, &model, &prob, &tc).await;

    let response = SubmissionResponse::from_model(model, true);
    Ok((StatusCode::CREATED, Json(response)))
}

/// Get a single submission by ID.
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Submissions",
    operation_id = "getSubmission",
    summary = "Get submission details",
    params(
        ("id" = i32, Path, description = "Submission ID")
    ),
    responses(
        (status = 200, description = "Submission details", body = SubmissionResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Submission not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(submission_id = %id))]
pub async fn get_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let sub = find_submission(&state.db, id).await?;

    let include_source = sub.user_id == auth_user.user_id
        || auth_user.has_permission(AuthUser::VIEW_ALL_PERMISSION);

    Ok(Json(SubmissionResponse::from_model(sub, include_source)))
}

/// Poll a submission's status.
#[utoipa::path(
    get,
    path = "/{id}/status",
    tag = "Submissions",
    operation_id = "getSubmissionStatus",
    summary = "Get submission status",
    params(
        ("id" = i32, Path, description = "Submission ID")
    ),
    responses(
        (status = 200, description = "Current status code", body = StatusResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Submission not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(submission_id = %id))]
pub async fn get_submission_status(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<StatusResponse>, AppError> {
    let sub = find_submission(&state.db, id).await?;
    Ok(Json(StatusResponse { status: sub.status }))
}

/// Preview one test point's data for a submission.
#[utoipa::path(
    get,
    path = "/{id}/test-point/{name}",
    tag = "Submissions",
    operation_id = "getTestPoint",
    summary = "Preview test-point data",
    description = "Returns truncated previews of a test case's input, expected answer, and the submission's own output. Refused unless the submission's `allow_download` snapshot is set and its status permits downloads.",
    params(
        ("id" = i32, Path, description = "Submission ID"),
        ("name" = String, Path, description = "Test case name")
    ),
    responses(
        (status = 200, description = "Test point previews", body = TestPointPreview),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Download refused (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Submission not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(submission_id = %id, case = %name))]
pub async fn get_test_point(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, name)): Path<(i32, String)>,
) -> Result<Json<TestPointPreview>, AppError> {
    validate_case_name(&name)?;

    let sub = find_submission(&state.db, id).await?;

    if !sub.allow_download {
        return Err(AppError::Forbidden(
            "Current submission is not allowed to download case data".into(),
        ));
    }

    let status = SubmissionStatus::try_from(sub.status)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if status.download_blocked() {
        return Err(AppError::Forbidden(
            "Submission in current status is not allowed to download case data".into(),
        ));
    }

    let tc = test_case::Entity::find()
        .filter(test_case::Column::ProblemId.eq(sub.problem_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Test case configuration not found".into()))?;

    let case_dir = PathBuf::from(&state.config.submission.test_data_root)
        .join(tc.bundle_id.to_string());
    let out_dir = PathBuf::from(&state.config.submission.submission_root).join(sub.id.to_string());

    Ok(Json(TestPointPreview {
        input: partly_read(&case_dir.join(format!("{name}.in")), PREVIEW_LENGTH).await,
        ans: partly_read(&case_dir.join(format!("{name}.ans")), PREVIEW_LENGTH).await,
        out: partly_read(&out_dir.join(format!("{name}.out")), PREVIEW_LENGTH).await,
    }))
}

/// Case names come from user input and become path components.
fn validate_case_name(name: &str) -> Result<(), AppError> {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.contains('\0')
    {
        return Err(AppError::Validation("Invalid test case name".into()));
    }
    Ok(())
}

/// Read up to `limit` characters of a file, marking truncation with an
/// ellipsis. Missing files read as a placeholder, matching the judge
/// server's convention of only materializing files it actually produced.
async fn partly_read(path: &FsPath, limit: usize) -> String {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => {
            if content.chars().count() > limit {
                let mut preview: String = content.chars().take(limit).collect();
                preview.push_str("...");
                preview
            } else {
                content
            }
        }
        Err(_) => "FILE NOT FOUND".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod gate_rule {
        use super::*;

        #[test]
        fn ordinary_caller_needs_visible_problem_with_cases() {
            assert!(submission_allowed(false, true, false, 3));
            assert!(!submission_allowed(false, false, false, 3));
            assert!(!submission_allowed(false, true, true, 3));
            assert!(!submission_allowed(false, true, false, 0));
        }

        #[test]
        fn privileged_caller_bypasses_configuration_checks() {
            // Even an empty test-case configuration is accepted.
            assert!(submission_allowed(true, true, false, 0));
            assert!(submission_allowed(true, false, true, 0));
        }
    }

    mod case_names {
        use super::*;

        #[test]
        fn plain_names_pass() {
            assert!(validate_case_name("1").is_ok());
            assert!(validate_case_name("big_input-03").is_ok());
        }

        #[test]
        fn path_escapes_are_rejected() {
            assert!(validate_case_name("").is_err());
            assert!(validate_case_name("../secret").is_err());
            assert!(validate_case_name("a/b").is_err());
            assert!(validate_case_name("a\\b").is_err());
        }
    }

    mod previews {
        use super::*;
        use std::io::Write;

        #[tokio::test]
        async fn short_files_pass_through() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("1.in");
            std::fs::File::create(&path)
                .unwrap()
                .write_all(b"5\n1 2 3 4 5\n")
                .unwrap();

            assert_eq!(partly_read(&path, 255).await, "5\n1 2 3 4 5\n");
        }

        #[tokio::test]
        async fn long_files_are_truncated_with_ellipsis() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("1.ans");
            let content = "a".repeat(1000);
            std::fs::write(&path, &content).unwrap();

            let preview = partly_read(&path, 255).await;
            assert_eq!(preview.len(), 258);
            assert!(preview.ends_with("..."));
        }

        #[tokio::test]
        async fn missing_files_read_as_placeholder() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("nope.out");
            assert_eq!(partly_read(&path, 255).await, "FILE NOT FOUND");
        }
    }
}
