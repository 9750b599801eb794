use std::fmt;

use thiserror::Error;

use devpush_core::{ContainerAlias, GroupKind};

/// Failure reported by an [`ExecClient`](crate::transport::ExecClient).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    /// Exit status of the remote process, when it ran at all.
    pub exit_code: Option<i32>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            exit_code: None,
        }
    }

    pub fn exited(code: i32) -> Self {
        Self {
            message: format!("command exited with status {code}"),
            exit_code: Some(code),
        }
    }
}

/// Which step of a push a failing command belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    Build,
    Run,
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Purpose::Build => write!(f, "build"),
            Purpose::Run => write!(f, "run"),
        }
    }
}

/// One failed branch of a parallel composite.
#[derive(Debug)]
pub struct BranchFailure {
    pub command: String,
    pub error: ExecError,
}

/// Error surface for command graph execution.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("command {name:?} not found in devfile")]
    CommandNotFound { name: String },

    #[error("command {name:?} is not a {expected} command")]
    CommandGroupMismatch { name: String, expected: GroupKind },

    #[error("devfile has no default {kind} command")]
    MissingRunCommand { kind: GroupKind },

    #[error("no running container for alias {alias}")]
    ContainerNotFound { alias: ContainerAlias },

    #[error("unable to execute the {purpose} command {command}: {source}")]
    CommandFailed {
        purpose: Purpose,
        command: String,
        #[source]
        source: TransportError,
    },

    #[error("command execution failed at {command}: {source}")]
    CompositeStep {
        command: String,
        #[source]
        source: Box<ExecError>,
    },

    #[error("command execution failed: {}", describe_failures(.failures))]
    ParallelFailed { failures: Vec<BranchFailure> },

    #[error("command task join failure: {0}")]
    TaskJoin(String),
}

fn describe_failures(failures: &[BranchFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.command, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}
