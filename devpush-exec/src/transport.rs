//! Execution transport capability.
//!
//! The backend client attaches to a container and runs an argv, streaming
//! its output into the [`OutputSink`]s it is handed.

use std::collections::HashMap;

use async_trait::async_trait;

use devpush_core::{ComponentName, ContainerAlias};

use crate::error::{ExecError, TransportError};
use crate::output::OutputSink;

/// A running container that commands can be executed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecTarget {
    pub component: ComponentName,
    pub alias: ContainerAlias,
    /// Backend handle: container id for a local runtime, pod name for a cluster.
    pub container_id: String,
}

/// Alias → running container binding for one pushed component.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    pub component: ComponentName,
    containers: HashMap<ContainerAlias, String>,
}

impl ComponentInfo {
    pub fn new(component: impl Into<ComponentName>) -> Self {
        Self {
            component: component.into(),
            containers: HashMap::new(),
        }
    }

    pub fn with_container(
        mut self,
        alias: impl Into<ContainerAlias>,
        container_id: impl Into<String>,
    ) -> Self {
        self.insert(alias, container_id);
        self
    }

    pub fn insert(&mut self, alias: impl Into<ContainerAlias>, container_id: impl Into<String>) {
        self.containers.insert(alias.into(), container_id.into());
    }

    pub fn target(&self, alias: &ContainerAlias) -> Result<ExecTarget, ExecError> {
        let container_id = self
            .containers
            .get(alias)
            .ok_or_else(|| ExecError::ContainerNotFound {
                alias: alias.clone(),
            })?;
        Ok(ExecTarget {
            component: self.component.clone(),
            alias: alias.clone(),
            container_id: container_id.clone(),
        })
    }
}

#[async_trait]
pub trait ExecClient: Send + Sync {
    /// Run `argv` in `target`, writing output to the two sinks.
    ///
    /// Must not return before the remote process has exited and every byte
    /// it produced has been written to the sinks.
    async fn exec_command(
        &self,
        target: &ExecTarget,
        argv: &[String],
        stdout: &OutputSink,
        stderr: &OutputSink,
    ) -> Result<(), TransportError>;
}
