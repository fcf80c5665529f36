use std::{fmt, io, path::PathBuf};

/// Recommended next step when a summarize error occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Finish quietly; the failure does not affect the result.
    Ignore,
    Abort,
}

/// Typed summarize errors. Unparseable lines are never errors.
#[derive(Debug)]
pub enum SummaryError {
    Open {
        path: PathBuf,
        source: io::Error,
    },
    Read {
        source: io::Error,
    },
    Write {
        source: io::Error,
    },
    WorkerPanicked {
        worker: usize,
    },
}

impl fmt::Display for SummaryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // the io cause is reported through `source()`
            SummaryError::Open { path, .. } => {
                write!(f, "{}: cannot open input", path.display())
            }
            SummaryError::Read { .. } => f.write_str("failed reading input"),
            SummaryError::Write { .. } => f.write_str("failed writing report"),
            SummaryError::WorkerPanicked { worker } => {
                write!(f, "parse worker {} panicked", worker)
            }
        }
    }
}

impl std::error::Error for SummaryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SummaryError::Open { source, .. }
            | SummaryError::Read { source }
            | SummaryError::Write { source } => Some(source),
            SummaryError::WorkerPanicked { .. } => None,
        }
    }
}

pub type SummaryResult<T> = Result<T, SummaryError>;

pub trait ErrorRecovery {
    fn is_recoverable(&self) -> bool;
    fn recovery_action(&self) -> RecoveryAction;
}

impl ErrorRecovery for SummaryError {
    fn is_recoverable(&self) -> bool {
        self.recovery_action() == RecoveryAction::Ignore
    }
    fn recovery_action(&self) -> RecoveryAction {
        match self {
            // report consumer went away (e.g. `| head`)
            SummaryError::Write { source } if source.kind() == io::ErrorKind::BrokenPipe => {
                RecoveryAction::Ignore
            }
            _ => RecoveryAction::Abort,
        }
    }
}
