// Error types for Exliar Quickpass
//
// One error enum for the whole crate. Stage actions, configuration writers
// and the installer all return `Result<T>` and the TUI decides, through
// `Error::is_fatal`, whether a failure ends the run.

use std::io;
use std::path::PathBuf;

use crate::wizard::{ConfirmationKind, Stage};

/// Errors raised while isolating a device group and emitting host configuration
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("topology query failed: {0}")]
    Topology(String),

    #[error("command `{command}` failed with exit code {code:?}: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("no IOMMU group number found in \"{0}\"")]
    MissingIommuGroup(String),

    #[error("stage {stage:?} expects a {expected:?} confirmation, got {got:?}")]
    ConfirmationMismatch {
        stage: Stage,
        expected: ConfirmationKind,
        got: ConfirmationKind,
    },

    #[error("privilege elevation failed: {0}")]
    Elevation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

impl Error {
    /// Wraps an `io::Error` with the path that was being touched
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }

    /// Whether the wizard must stop instead of letting the operator retry
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Topology(_) | Error::MissingIommuGroup(_) => false,
            Error::Io { .. }
            | Error::CommandFailed { .. }
            | Error::ConfirmationMismatch { .. }
            | Error::Elevation(_)
            | Error::Serialization(_)
            | Error::Pattern(_) => true,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_failures_are_recoverable() {
        assert!(!Error::MissingIommuGroup("NVIDIA".into()).is_fatal());
        assert!(!Error::Topology("ls-iommu not found".into()).is_fatal());
    }

    #[test]
    fn write_failures_end_the_run() {
        let err = Error::io("/etc/modprobe.d/vfio.conf", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(err.is_fatal());
        assert!(err.to_string().contains("/etc/modprobe.d/vfio.conf"));
    }
}
