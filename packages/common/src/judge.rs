use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

use crate::submission_status::SubmissionStatus;

/// Resource bounds forwarded to the judge server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimit {
    /// CPU time bound in milliseconds.
    pub max_cpu_time: i64,
    /// Memory bound in bytes.
    pub max_memory: i64,
}

/// One judge request frame, serialized verbatim onto the wire.
///
/// `test_case_config` and `subcheck_config` are owned by the problem and
/// forwarded opaquely; this core never interprets them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JudgeRequest {
    /// Submission identifier, stringified; the judge server uses it as a
    /// directory key for per-case output artifacts.
    pub task_id: String,
    /// Test-case-bundle identifier the judge server resolves test data by.
    pub case_id: String,
    /// Special-judge identifier, or null when the problem does not use one.
    pub spj_id: Option<String>,
    pub test_case_config: Value,
    pub subcheck_config: Option<Value>,
    /// Language tag, e.g. `c`, `cpp`.
    pub lang: String,
    /// Submitted source text.
    pub code: String,
    pub limit: ResourceLimit,
}

/// Peak resource usage reported by the judge server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeStatistics {
    /// Peak CPU time over all cases, milliseconds.
    pub max_time: i64,
    /// Peak memory over all cases.
    pub max_memory: i64,
}

/// One judge response frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JudgeResponse {
    /// One of the seven judge result codes (see [`JudgeVerdict`]).
    pub status: i32,
    pub score: i32,
    pub statistics: JudgeStatistics,
    /// Diagnostic/compile output.
    pub log: String,
    /// Per-case result records, stored on the submission verbatim.
    pub detail: Value,
}

impl JudgeResponse {
    /// Synthetic response substituted when the judge server's reply cannot
    /// be decoded, so the pipeline still reaches a terminal state.
    pub fn system_error(log: impl Into<String>) -> Self {
        Self {
            status: JudgeVerdict::SystemError as i32,
            score: 0,
            statistics: JudgeStatistics::default(),
            log: log.into(),
            detail: Value::Array(vec![]),
        }
    }
}

/// The judge server's result codes.
///
/// The numeric values are the judge server's own contract; they happen to
/// coincide with the terminal [`SubmissionStatus`] codes but the mapping
/// below is the authority, not the numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum JudgeVerdict {
    CompileError = -2,
    WrongAnswer = -1,
    Accepted = 0,
    TimeLimitExceeded = 1,
    MemoryLimitExceeded = 2,
    RuntimeError = 3,
    SystemError = 4,
}

/// Error for a result code outside the judge server's known set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown judge result code {0}")]
pub struct UnknownResultCode(pub i32);

impl TryFrom<i32> for JudgeVerdict {
    type Error = UnknownResultCode;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            -2 => Ok(Self::CompileError),
            -1 => Ok(Self::WrongAnswer),
            0 => Ok(Self::Accepted),
            1 => Ok(Self::TimeLimitExceeded),
            2 => Ok(Self::MemoryLimitExceeded),
            3 => Ok(Self::RuntimeError),
            4 => Ok(Self::SystemError),
            other => Err(UnknownResultCode(other)),
        }
    }
}

impl From<JudgeVerdict> for SubmissionStatus {
    fn from(verdict: JudgeVerdict) -> Self {
        match verdict {
            JudgeVerdict::CompileError => SubmissionStatus::CompileError,
            JudgeVerdict::WrongAnswer => SubmissionStatus::WrongAnswer,
            JudgeVerdict::Accepted => SubmissionStatus::Accepted,
            JudgeVerdict::TimeLimitExceeded => SubmissionStatus::TimeLimitExceeded,
            JudgeVerdict::MemoryLimitExceeded => SubmissionStatus::MemoryLimitExceeded,
            JudgeVerdict::RuntimeError => SubmissionStatus::RuntimeError,
            JudgeVerdict::SystemError => SubmissionStatus::SystemError,
        }
    }
}

/// Map a raw result code from a judge response to a terminal status.
///
/// A code outside the known set is a contract violation by the judge
/// server: asserts in debug builds, degrades to SystemError in release so
/// a worker is never crashed by a misbehaving peer.
pub fn map_result_code(code: i32) -> SubmissionStatus {
    match JudgeVerdict::try_from(code) {
        Ok(verdict) => verdict.into(),
        Err(err) => {
            error!(code, "judge server returned an unknown result code");
            debug_assert!(false, "{err}");
            SubmissionStatus::SystemError
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdicts_map_one_to_one() {
        let table = [
            (-2, SubmissionStatus::CompileError),
            (-1, SubmissionStatus::WrongAnswer),
            (0, SubmissionStatus::Accepted),
            (1, SubmissionStatus::TimeLimitExceeded),
            (2, SubmissionStatus::MemoryLimitExceeded),
            (3, SubmissionStatus::RuntimeError),
            (4, SubmissionStatus::SystemError),
        ];
        for (code, expected) in table {
            assert_eq!(map_result_code(code), expected);
            assert!(expected.is_terminal());
        }
    }

    #[test]
    fn unknown_code_is_a_contract_violation() {
        assert_eq!(JudgeVerdict::try_from(7), Err(UnknownResultCode(7)));
        assert_eq!(JudgeVerdict::try_from(-3), Err(UnknownResultCode(-3)));
    }

    // debug builds assert instead; the degradation path is release-only.
    #[cfg(not(debug_assertions))]
    #[test]
    fn unknown_code_degrades_to_system_error() {
        assert_eq!(map_result_code(42), SubmissionStatus::SystemError);
    }

    #[test]
    fn synthetic_system_error_shape() {
        let resp = JudgeResponse::system_error("failed to decode judge server result");
        assert_eq!(resp.status, JudgeVerdict::SystemError as i32);
        assert_eq!(resp.score, 0);
        assert_eq!(resp.statistics, JudgeStatistics::default());
        assert_eq!(resp.detail, serde_json::json!([]));
        assert!(!resp.log.is_empty());
    }

    #[test]
    fn request_serializes_null_spj_when_absent() {
        let req = JudgeRequest {
            task_id: "17".into(),
            case_id: "b64c5a52-0a2b-4e0a-9d42-2b5e4d1f7a10".into(),
            spj_id: None,
            test_case_config: serde_json::json!([{"name": "1", "score": 100}]),
            subcheck_config: None,
            lang: "cpp".into(),
            code: "int main() {}".into(),
            limit: ResourceLimit {
                max_cpu_time: 1000,
                max_memory: 128 * 1024 * 1024,
            },
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["spj_id"], serde_json::Value::Null);
        assert_eq!(value["subcheck_config"], serde_json::Value::Null);
        assert_eq!(value["limit"]["max_cpu_time"], 1000);
        assert_eq!(value["limit"]["max_memory"], 134_217_728);
    }
}
