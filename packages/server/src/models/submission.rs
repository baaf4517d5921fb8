use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::entity::submission;

use crate::error::AppError;

/// Languages the judge server can compile.
pub const LANGUAGES: &[&str] = &["c", "cpp"];

/// Request body for creating a submission.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateSubmissionRequest {
    /// Problem to submit against.
    pub problem_id: i32,
    /// Language tag.
    #[schema(example = "cpp")]
    pub language: String,
    /// Source text.
    #[schema(example = "#include <iostream>\nint main() { return 0; }")]
    pub source: String,
}

/// Validate a submission payload before touching the database.
pub fn validate_create_submission(
    payload: &CreateSubmissionRequest,
    max_source_size: usize,
) -> Result<(), AppError> {
    if !LANGUAGES.contains(&payload.language.trim()) {
        return Err(AppError::Validation(format!(
            "Unsupported language '{}'",
            payload.language
        )));
    }
    if payload.source.trim().is_empty() {
        return Err(AppError::Validation("Source must not be empty".into()));
    }
    if payload.source.len() > max_source_size {
        return Err(AppError::Validation(format!(
            "Source exceeds {max_source_size} bytes"
        )));
    }
    Ok(())
}

/// Full submission view.
#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionResponse {
    pub id: i32,
    pub user_id: i32,
    pub problem_id: i32,
    pub language: String,
    /// Integer-coded status: Pending=-4, Judging=-3, CompileError=-2,
    /// WrongAnswer=-1, Accepted=0, TimeLimitExceeded=1,
    /// MemoryLimitExceeded=2, RuntimeError=3, SystemError=4.
    pub status: i32,
    pub score: i32,
    pub execute_time: i64,
    pub execute_memory: i64,
    pub detail: serde_json::Value,
    pub log: String,
    pub allow_download: bool,
    pub created_at: DateTime<Utc>,
    /// Present only for the owner or holders of `submission:view_all`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl SubmissionResponse {
    pub fn from_model(model: submission::Model, include_source: bool) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            problem_id: model.problem_id,
            language: model.language,
            status: model.status,
            score: model.score,
            execute_time: model.execute_time,
            execute_memory: model.execute_memory,
            detail: model.detail,
            log: model.log,
            allow_download: model.allow_download,
            created_at: model.created_at,
            source: include_source.then_some(model.source),
        }
    }
}

/// Status poll response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct StatusResponse {
    /// Integer-coded status (see `SubmissionResponse::status`).
    pub status: i32,
}

/// Truncated previews of one test point's data files.
#[derive(Serialize, utoipa::ToSchema)]
pub struct TestPointPreview {
    /// Test input preview.
    #[serde(rename = "in")]
    pub input: String,
    /// Expected answer preview.
    pub ans: String,
    /// The submission's own output preview.
    pub out: String,
}
