//! Triage of terminal remote-call failures.

use std::fmt;

use super::policy::{RetryError, StopReason};

/// What a terminal call failure means for the work unit that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// 304: nothing new to report, treat as a successful no-op
    StaleCache,

    /// Throttled and not retried further: abandon this call only
    Throttled,

    /// 404: usually missing permission rather than a missing resource;
    /// abandon this call only
    NotFound,

    /// Abandon the enclosing work unit
    Fatal,
}

impl Disposition {
    /// Whether the work unit may continue past this failure.
    pub fn is_absorbed(self) -> bool {
        !matches!(self, Disposition::Fatal)
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Disposition::StaleCache => "stale-cache",
            Disposition::Throttled => "throttled",
            Disposition::NotFound => "not-found",
            Disposition::Fatal => "fatal",
        };
        f.write_str(s)
    }
}

/// Classifies a terminal failure by status first, then provider code.
///
/// A call that ran out of retry budget is always fatal, whatever its last
/// status was.
pub fn classify(error: &RetryError) -> Disposition {
    if error.stop != StopReason::NotRetryable {
        return Disposition::Fatal;
    }

    match (error.source.status(), error.source.code()) {
        (Some(304), _) => Disposition::StaleCache,
        (Some(429), _) => Disposition::Throttled,
        (Some(400), Some("TooManyRequests")) => Disposition::Throttled,
        (Some(404), _) => Disposition::NotFound,
        _ => Disposition::Fatal,
    }
}
