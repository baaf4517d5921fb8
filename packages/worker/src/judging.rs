use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, ExprTrait, QueryFilter, Set,
};
use tracing::{error, info, instrument, warn};

use common::entity::{problem, problem_solve, submission, test_case};
use common::judge::{JudgeRequest, JudgeResponse, map_result_code};
use common::retry::RetryPolicy;
use common::{JudgeTask, SubmissionStatus};
use judge_client::JudgeClient;

use crate::error::Result;

/// Execute one judging task end to end.
///
/// The task claims its submission (the single Pending -> Judging write),
/// performs the judge-server round trip, persists the terminal result in
/// one update, and applies accept side effects. Every exit path leaves the
/// submission in a terminal state except the no-op paths where some other
/// delivery of the same task already owns it.
#[instrument(skip_all, fields(submission_id = task.task_id))]
pub async fn run(
    db: &DatabaseConnection,
    client: &JudgeClient,
    retry: &RetryPolicy,
    task: JudgeTask,
) -> Result<()> {
    let Some(sub) = submission::Entity::find_by_id(task.task_id).one(db).await? else {
        warn!("submission not found, dropping task");
        return Ok(());
    };

    // allow_download is snapshotted from the problem's current test-case
    // configuration at claim time and frozen on the submission.
    let allow_download = test_case::Entity::find()
        .filter(test_case::Column::ProblemId.eq(sub.problem_id))
        .one(db)
        .await?
        .map(|tc| tc.allow_download)
        .unwrap_or(false);

    // Conditional claim: only a Pending submission can enter Judging, so a
    // redelivered task for a claimed or terminal submission no-ops here.
    let claimed = submission::Entity::update_many()
        .col_expr(
            submission::Column::Status,
            Expr::value(i32::from(SubmissionStatus::Judging)),
        )
        .col_expr(submission::Column::AllowDownload, Expr::value(allow_download))
        .filter(submission::Column::Id.eq(sub.id))
        .filter(submission::Column::Status.eq(i32::from(SubmissionStatus::Pending)))
        .exec(db)
        .await?;
    if claimed.rows_affected == 0 {
        info!("submission already claimed or terminal, skipping redelivery");
        return Ok(());
    }

    let request = build_request(&task);
    let response = call_with_retries(client, retry, &request).await;
    finalize(db, &sub, response).await
}

/// Build the wire request from the queued task arguments.
fn build_request(task: &JudgeTask) -> JudgeRequest {
    JudgeRequest {
        task_id: task.task_id.to_string(),
        case_id: task.case_id.to_string(),
        spj_id: task.spj_id.map(|id| id.to_string()),
        test_case_config: task.test_case_config.clone(),
        subcheck_config: task.subcheck_config.clone(),
        lang: task.language.clone(),
        code: task.source.clone(),
        limit: task.limit,
    }
}

/// Call the judge server, retrying transport failures with backoff.
///
/// Exhausted retries produce the synthetic SystemError response with the
/// transport error in `log`, so the caller always has a terminal result to
/// persist. Decode failures never reach this loop: the client already
/// converts them into a terminal response.
async fn call_with_retries(
    client: &JudgeClient,
    retry: &RetryPolicy,
    request: &JudgeRequest,
) -> JudgeResponse {
    let mut attempt: u8 = 0;
    loop {
        match client.judge(request).await {
            Ok(response) => return response,
            Err(err) if attempt < retry.max_retries => {
                attempt += 1;
                let delay = retry.backoff(attempt);
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "judge transport failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                error!(error = %err, "judge server unreachable, giving up");
                return JudgeResponse::system_error(format!("Judge server unreachable: {err}"));
            }
        }
    }
}

/// Persist the terminal result and apply accept side effects.
async fn finalize(
    db: &DatabaseConnection,
    sub: &submission::Model,
    response: JudgeResponse,
) -> Result<()> {
    let status = map_result_code(response.status);

    // Single terminal update, guarded on Judging: a terminal status is
    // never overwritten, whatever arrives late.
    let updated = submission::Entity::update_many()
        .col_expr(submission::Column::Status, Expr::value(i32::from(status)))
        .col_expr(submission::Column::Score, Expr::value(response.score))
        .col_expr(
            submission::Column::ExecuteTime,
            Expr::value(response.statistics.max_time),
        )
        .col_expr(
            submission::Column::ExecuteMemory,
            Expr::value(response.statistics.max_memory),
        )
        .col_expr(submission::Column::Detail, Expr::value(response.detail))
        .col_expr(submission::Column::Log, Expr::value(response.log))
        .filter(submission::Column::Id.eq(sub.id))
        .filter(submission::Column::Status.eq(i32::from(SubmissionStatus::Judging)))
        .exec(db)
        .await?;
    if updated.rows_affected == 0 {
        warn!("submission left Judging outside this task, result discarded");
        return Ok(());
    }

    info!(status = %status, score = response.score, "submission judged");

    if status.is_accepted() {
        apply_accept_side_effects(db, sub.user_id, sub.problem_id).await?;
    }
    Ok(())
}

/// Count the acceptance and mark the problem solved for this user.
///
/// `accepted_count` counts accepted submissions, so it increments on every
/// acceptance; the solve marker is per (user, problem) and inserts at most
/// once.
async fn apply_accept_side_effects(
    db: &DatabaseConnection,
    user_id: i32,
    problem_id: i32,
) -> Result<()> {
    problem::Entity::update_many()
        .col_expr(
            problem::Column::AcceptedCount,
            Expr::col(problem::Column::AcceptedCount).add(1),
        )
        .filter(problem::Column::Id.eq(problem_id))
        .exec(db)
        .await?;

    let solve = problem_solve::ActiveModel {
        user_id: Set(user_id),
        problem_id: Set(problem_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let inserted = problem_solve::Entity::insert(solve)
        .on_conflict(
            OnConflict::columns([
                problem_solve::Column::UserId,
                problem_solve::Column::ProblemId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(db)
        .await;

    match inserted {
        Ok(_) => {
            info!(user_id, problem_id, "problem solve recorded");
            Ok(())
        }
        // Repeat acceptance: the marker already exists.
        Err(DbErr::RecordNotInserted) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::config::JudgeServerConfig;
    use common::judge::{JudgeVerdict, ResourceLimit};
    use serde_json::json;
    use uuid::Uuid;

    fn sample_task(spj_id: Option<Uuid>) -> JudgeTask {
        JudgeTask {
            task_id: 7,
            case_id: Uuid::new_v4(),
            spj_id,
            test_case_config: json!([
                {"name": "1", "score": 40},
                {"name": "2", "score": 60},
            ]),
            subcheck_config: None,
            language: "cpp".into(),
            source: "int main() {}".into(),
            limit: ResourceLimit {
                max_cpu_time: 1000,
                max_memory: 128 * 1024 * 1024,
            },
        }
    }

    #[test]
    fn request_mirrors_task_arguments() {
        let task = sample_task(None);
        let request = build_request(&task);

        assert_eq!(request.task_id, "7");
        assert_eq!(request.case_id, task.case_id.to_string());
        assert_eq!(request.spj_id, None);
        assert_eq!(request.test_case_config, task.test_case_config);
        assert_eq!(request.subcheck_config, None);
        assert_eq!(request.lang, "cpp");
        assert_eq!(request.limit, task.limit);
    }

    #[test]
    fn request_stringifies_spj_id_when_present() {
        let spj = Uuid::new_v4();
        let request = build_request(&sample_task(Some(spj)));
        assert_eq!(request.spj_id.as_deref(), Some(spj.to_string().as_str()));
    }

    #[tokio::test]
    async fn exhausted_retries_yield_terminal_system_error() {
        // Bind then drop so nothing is listening on the port.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = JudgeClient::new(JudgeServerConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
            connect_timeout_ms: 200,
            ..Default::default()
        });
        let retry = RetryPolicy {
            max_retries: 1,
            base_delay_ms: 1,
            max_delay_ms: 2,
        };

        let response = call_with_retries(&client, &retry, &build_request(&sample_task(None))).await;

        assert_eq!(
            map_result_code(response.status),
            SubmissionStatus::SystemError
        );
        assert_eq!(response.score, 0);
        assert!(response.log.contains("unreachable"));
    }

    #[tokio::test]
    async fn successful_response_needs_no_retry() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let _request = judge_client::codec::read_frame(&mut stream).await.unwrap();
            let frame = judge_client::codec::encode_frame(&json!({
                "status": -2,
                "score": 0,
                "statistics": {"max_time": 0, "max_memory": 0},
                "log": "main.cpp:1: error",
                "detail": [],
            }))
            .unwrap();
            tokio::io::AsyncWriteExt::write_all(&mut stream, &frame)
                .await
                .unwrap();
        });

        let client = JudgeClient::new(JudgeServerConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
            ..Default::default()
        });

        let response =
            call_with_retries(&client, &RetryPolicy::default(), &build_request(&sample_task(None)))
                .await;
        assert_eq!(response.status, JudgeVerdict::CompileError as i32);
        assert_eq!(
            map_result_code(response.status),
            SubmissionStatus::CompileError
        );
    }
}
