use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a submission during the judging lifecycle.
///
/// Stored and serialized as its integer code. The encoding is part of the
/// wire/storage contract and must not change:
/// Pending=-4, Judging=-3, CompileError=-2, WrongAnswer=-1, Accepted=0,
/// TimeLimitExceeded=1, MemoryLimitExceeded=2, RuntimeError=3, SystemError=4.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum SubmissionStatus {
    /// Created, waiting for a worker to pick up the judging task.
    Pending,
    /// Claimed by its judging task; the judge-server round trip is in flight.
    Judging,
    /// Failed to compile.
    CompileError,
    /// Output did not match expected output.
    WrongAnswer,
    /// All test cases passed.
    Accepted,
    /// Exceeded the CPU time limit.
    TimeLimitExceeded,
    /// Exceeded the memory limit.
    MemoryLimitExceeded,
    /// Program crashed or exited with a non-zero code.
    RuntimeError,
    /// The judge pipeline itself failed (transport, decode, internal).
    SystemError,
}

impl SubmissionStatus {
    /// All possible status values.
    pub const ALL: &'static [SubmissionStatus] = &[
        Self::Pending,
        Self::Judging,
        Self::CompileError,
        Self::WrongAnswer,
        Self::Accepted,
        Self::TimeLimitExceeded,
        Self::MemoryLimitExceeded,
        Self::RuntimeError,
        Self::SystemError,
    ];

    /// All terminal statuses. Once reached, a submission never leaves them.
    pub const TERMINAL: &'static [SubmissionStatus] = &[
        Self::CompileError,
        Self::WrongAnswer,
        Self::Accepted,
        Self::TimeLimitExceeded,
        Self::MemoryLimitExceeded,
        Self::RuntimeError,
        Self::SystemError,
    ];

    /// Returns true if judging is complete and the status is immutable.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Judging)
    }

    /// Returns true if this is the successful verdict.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Whether `next` is a legal successor of `self` in the lifecycle
    /// `Pending -> Judging -> terminal`.
    pub fn can_transition_to(&self, next: SubmissionStatus) -> bool {
        match self {
            Self::Pending => matches!(next, Self::Judging),
            Self::Judging => next.is_terminal(),
            _ => false,
        }
    }

    /// Whether test-point data downloads are blocked for this status.
    ///
    /// An explicit classification table: the integer encoding is not a
    /// severity scale, so callers must not compare codes arithmetically.
    /// Compile errors and system errors produce no per-case output, and
    /// nothing exists to download before judging finishes.
    pub fn download_blocked(&self) -> bool {
        match self {
            Self::Pending | Self::Judging => true,
            Self::CompileError | Self::SystemError => true,
            Self::WrongAnswer
            | Self::Accepted
            | Self::TimeLimitExceeded
            | Self::MemoryLimitExceeded
            | Self::RuntimeError => false,
        }
    }

    /// Human-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Judging => "Judging",
            Self::CompileError => "Compile Error",
            Self::WrongAnswer => "Wrong Answer",
            Self::Accepted => "Accepted",
            Self::TimeLimitExceeded => "Time Limit Exceeded",
            Self::MemoryLimitExceeded => "Memory Limit Exceeded",
            Self::RuntimeError => "Runtime Error",
            Self::SystemError => "System Error",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for SubmissionStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl From<SubmissionStatus> for i32 {
    fn from(status: SubmissionStatus) -> i32 {
        match status {
            SubmissionStatus::Pending => -4,
            SubmissionStatus::Judging => -3,
            SubmissionStatus::CompileError => -2,
            SubmissionStatus::WrongAnswer => -1,
            SubmissionStatus::Accepted => 0,
            SubmissionStatus::TimeLimitExceeded => 1,
            SubmissionStatus::MemoryLimitExceeded => 2,
            SubmissionStatus::RuntimeError => 3,
            SubmissionStatus::SystemError => 4,
        }
    }
}

/// Error when converting an out-of-range integer code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid submission status code {0}")]
pub struct InvalidStatusCode(pub i32);

impl TryFrom<i32> for SubmissionStatus {
    type Error = InvalidStatusCode;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            -4 => Ok(Self::Pending),
            -3 => Ok(Self::Judging),
            -2 => Ok(Self::CompileError),
            -1 => Ok(Self::WrongAnswer),
            0 => Ok(Self::Accepted),
            1 => Ok(Self::TimeLimitExceeded),
            2 => Ok(Self::MemoryLimitExceeded),
            3 => Ok(Self::RuntimeError),
            4 => Ok(Self::SystemError),
            other => Err(InvalidStatusCode(other)),
        }
    }
}
