mod config;
mod error;
mod judging;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::{error, info, warn};

use common::retry::RetryPolicy;
use common::task::{JUDGE_TASK, JudgeTask, Task};
use judge_client::JudgeClient;
use mq::{BroccoliError, BrokerMessage, MqConfig, init_mq};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = config::WorkerAppConfig::load().context("Failed to load config")?;
    info!("Worker starting: {}", config.worker.id);

    let mut opt = ConnectOptions::new(config.database.url.clone());
    opt.max_connections(10)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8));
    let db = Database::connect(opt)
        .await
        .context("Failed to connect to database")?;

    let mq = Arc::new(
        init_mq(MqConfig {
            url: config.mq.url.clone(),
            pool_size: config.mq.pool_size,
        })
        .await
        .context("Failed to initialize MQ")?,
    );

    info!(
        queue_name = %config.mq.queue_name,
        judge_server = %config.judge.endpoint(),
        batch_size = config.worker.batch_size,
        "MQ connected"
    );

    let client = JudgeClient::new(config.judge.clone());
    let retry = config.judge.retry;

    let result = mq
        .process_messages(
            &config.mq.queue_name,
            Some(config.worker.batch_size), // concurrent tasks per worker
            None,
            move |message: BrokerMessage<Task>| {
                let db = db.clone();
                let client = client.clone();
                async move { process_message(message, &db, &client, &retry).await }
            },
        )
        .await;

    if let Err(e) = result {
        error!(error = %e, "Worker stopped unexpectedly");
    }

    Ok(())
}

async fn process_message(
    message: BrokerMessage<Task>,
    db: &DatabaseConnection,
    client: &JudgeClient,
    retry: &RetryPolicy,
) -> Result<(), BroccoliError> {
    let task = message.payload;

    if task.task_type != JUDGE_TASK {
        warn!(task_type = %task.task_type, "Unknown task type, skipping");
        return Ok(());
    }

    let judge_task: JudgeTask = match serde_json::from_value(task.payload) {
        Ok(t) => t,
        Err(e) => {
            // Without a parsable submission id there is no row to drive to a
            // terminal state; drop the message instead of requeueing it.
            error!(message_id = %task.id, error = %e, "Failed to parse JudgeTask, dropping");
            return Ok(());
        }
    };

    let submission_id = judge_task.task_id;
    if let Err(e) = judging::run(db, client, retry, judge_task).await {
        // Store-layer failures surface to the queue's own retry policy; the
        // conditional claim makes the redelivery safe.
        error!(submission_id, error = %e, "Judging task failed");
        return Err(BroccoliError::Job(e.to_string()));
    }

    Ok(())
}
