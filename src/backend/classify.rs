//! Load report error classification.
//!
//! # Decision Table
//! ```text
//! connection closing                         → Fatal        (failures unchanged)
//! UNIMPLEMENTED                              → Ignore       (failures unchanged)
//! CANCELLED + "closing" in detail            → Fatal        (failures + 1)
//! CANCELLED | DEADLINE_EXCEEDED |
//! RESOURCE_EXHAUSTED | FAILED_PRECONDITION |
//! ABORTED                                    → Recoverable  (failures + 1)
//!                                              or Exhausted once failures >= max_failures > 0
//! anything else                              → Fatal        (failures + 1)
//! ```
//! Rows are evaluated top to bottom; the first match wins.

use tonic::Code;

/// What went wrong, reduced to the part the classifier cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The connection is permanently closing.
    Closing,
    /// The call completed with a gRPC status.
    Status(Code),
}

/// Outcome of classifying one failed load report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Backend does not report load; keep it at its current score.
    Ignore,
    /// Transient failure within the tolerated budget.
    Recoverable,
    /// Transient failure that used up the budget.
    Exhausted,
    /// Failure that disqualifies the backend immediately.
    Fatal,
}

impl Decision {
    /// Whether the backend must be evicted.
    pub fn is_fatal(self) -> bool {
        matches!(self, Decision::Exhausted | Decision::Fatal)
    }

    /// Label used for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Ignore => "ignore",
            Decision::Recoverable => "recoverable",
            Decision::Exhausted => "exhausted",
            Decision::Fatal => "fatal",
        }
    }
}

/// Classify a failed load report.
///
/// Pure: returns the decision together with the failure count the caller
/// should store. `max_failures == 0` disables count-based eviction.
pub fn classify(
    kind: ErrorKind,
    detail: &str,
    failures: u32,
    max_failures: u32,
) -> (Decision, u32) {
    let code = match kind {
        ErrorKind::Closing => return (Decision::Fatal, failures),
        ErrorKind::Status(Code::Unimplemented) => return (Decision::Ignore, failures),
        ErrorKind::Status(code) => code,
    };

    let failures = failures.saturating_add(1);

    let decision = match code {
        Code::Cancelled if detail.contains("closing") => Decision::Fatal,
        Code::Cancelled
        | Code::DeadlineExceeded
        | Code::ResourceExhausted
        | Code::FailedPrecondition
        | Code::Aborted => {
            if max_failures > 0 && failures >= max_failures {
                Decision::Exhausted
            } else {
                Decision::Recoverable
            }
        }
        _ => Decision::Fatal,
    };

    (decision, failures)
}
