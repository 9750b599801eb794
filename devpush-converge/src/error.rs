//! Error types for devpush-converge.

use thiserror::Error;

use devpush_core::{ComponentName, ContainerAlias};
use devpush_exec::ExecError;

/// Failure reported by a [`ContainerRuntime`](crate::runtime::ContainerRuntime)
/// or [`SourceSync`](crate::adapter::SourceSync) backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// All errors that can arise while pushing a component.
#[derive(Debug, Error)]
pub enum ConvergeError {
    #[error("component {component} declares no containers to run")]
    NoRunnableUnits { component: ComponentName },

    #[error("unable to {operation}: {source}")]
    Runtime {
        operation: &'static str,
        #[source]
        source: BackendError,
    },

    #[error("unable to pull image {image} for {alias}: {source}")]
    PullImage {
        image: String,
        alias: String,
        #[source]
        source: BackendError,
    },

    #[error("unable to start container for {alias}: {source}")]
    StartContainer {
        alias: String,
        #[source]
        source: BackendError,
    },

    #[error("unable to remove container {container_id} of {alias}: {source}")]
    RemoveContainer {
        alias: ContainerAlias,
        container_id: String,
        #[source]
        source: BackendError,
    },

    #[error("unable to get or create {volume} volume: {source}")]
    Volume {
        volume: String,
        #[source]
        source: BackendError,
    },

    #[error("found {count} containers labelled {alias} for component {component}")]
    DuplicateContainers {
        component: ComponentName,
        alias: ContainerAlias,
        count: usize,
    },

    #[error(
        "component {component} has no container mounting the project sources; \
         at least one devfile container must set mountSources"
    )]
    NoSourceContainer { component: ComponentName },

    #[error("failed to sync to component {component}: {source}")]
    Sync {
        component: ComponentName,
        #[source]
        source: BackendError,
    },

    #[error("failed to validate devfile build and run commands: {0}")]
    InvalidCommands(#[source] ExecError),

    #[error("failed to execute devfile commands for component {component}: {source}")]
    Exec {
        component: ComponentName,
        #[source]
        source: ExecError,
    },
}

/// Convenience constructor for [`ConvergeError::Runtime`].
pub(crate) fn runtime_err(operation: &'static str, source: BackendError) -> ConvergeError {
    ConvergeError::Runtime { operation, source }
}
