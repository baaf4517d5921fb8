use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::judge::ResourceLimit;

/// Name of the judging task on the queue.
pub const JUDGE_TASK: &str = "judge";

/// Envelope for messages on the task queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Message identifier, unique per enqueue.
    pub id: String,
    /// Task name; workers dispatch on it.
    pub task_type: String,
    pub payload: Value,
}

/// Payload of one judging task.
///
/// `spj_id` and `subcheck_config` are resolved at enqueue time: they are
/// `None` unless the problem's test-case configuration enables them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeTask {
    /// Submission identifier; also the claim key (exactly one task may ever
    /// judge a given submission).
    pub task_id: i32,
    /// Test-case-bundle identifier of the problem.
    pub case_id: Uuid,
    pub spj_id: Option<Uuid>,
    pub test_case_config: Value,
    pub subcheck_config: Option<Value>,
    pub language: String,
    pub source: String,
    pub limit: ResourceLimit,
}

impl JudgeTask {
    /// Wrap into a queue envelope with a fresh message id.
    pub fn into_task(self) -> Result<Task, serde_json::Error> {
        Ok(Task {
            id: Uuid::new_v4().to_string(),
            task_type: JUDGE_TASK.to_string(),
            payload: serde_json::to_value(&self)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::ResourceLimit;

    fn sample() -> JudgeTask {
        JudgeTask {
            task_id: 42,
            case_id: Uuid::new_v4(),
            spj_id: None,
            test_case_config: serde_json::json!([{"name": "1", "score": 50}]),
            subcheck_config: None,
            language: "c".into(),
            source: "int main() { return 0; }".into(),
            limit: ResourceLimit {
                max_cpu_time: 2000,
                max_memory: 256 * 1024 * 1024,
            },
        }
    }

    #[test]
    fn envelope_carries_the_judge_task_name() {
        let task = sample().into_task().unwrap();
        assert_eq!(task.task_type, JUDGE_TASK);
        assert!(!task.id.is_empty());

        let parsed: JudgeTask = serde_json::from_value(task.payload).unwrap();
        assert_eq!(parsed.task_id, 42);
        assert_eq!(parsed.limit.max_cpu_time, 2000);
    }

    #[test]
    fn envelope_ids_are_unique_per_enqueue() {
        let a = sample().into_task().unwrap();
        let b = sample().into_task().unwrap();
        assert_ne!(a.id, b.id);
    }
}
