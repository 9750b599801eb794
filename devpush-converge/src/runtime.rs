//! Container runtime capability interface.
//!
//! A local runtime client implements [`ContainerRuntime`]; this crate only
//! decides what to ask it for.

use std::collections::BTreeMap;

use async_trait::async_trait;

use devpush_core::{labels, ComponentName, ContainerAlias};

use crate::error::{runtime_err, BackendError, ConvergeError};

pub type Labels = BTreeMap<String, String>;

/// A volume mount requested for a new container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mount {
    /// Runtime volume name.
    pub source: String,
    pub target: String,
}

impl Mount {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// A mount as reported on a running container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    pub name: String,
    pub destination: String,
}

/// Runtime config of a container: what it was started with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContainerConfig {
    pub image: String,
    pub entrypoint: Vec<String>,
    pub args: Vec<String>,
    /// `NAME=VALUE` entries.
    pub env: Vec<String>,
    pub labels: Labels,
}

/// A container as listed by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedContainer {
    pub id: String,
    pub image: String,
    pub labels: Labels,
    pub mounts: Vec<MountPoint>,
}

impl ObservedContainer {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    pub fn alias(&self) -> Option<ContainerAlias> {
        self.label(labels::RUNTIME_ALIAS_LABEL).map(ContainerAlias::from)
    }

    pub fn mounts_at(&self, destination: &str) -> bool {
        self.mounts.iter().any(|m| m.destination == destination)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeVolume {
    pub name: String,
    pub labels: Labels,
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn list_containers(&self) -> Result<Vec<ObservedContainer>, BackendError>;

    async fn container_config(&self, id: &str) -> Result<ContainerConfig, BackendError>;

    async fn pull_image(&self, image: &str) -> Result<(), BackendError>;

    /// Create and start a container; returns its id.
    async fn start_container(
        &self,
        config: &ContainerConfig,
        mounts: &[Mount],
    ) -> Result<String, BackendError>;

    async fn remove_container(&self, id: &str) -> Result<(), BackendError>;

    /// Create a volume. `None` lets the runtime pick a name.
    async fn create_volume(
        &self,
        name: Option<&str>,
        labels: &Labels,
    ) -> Result<RuntimeVolume, BackendError>;

    /// Volumes carrying every label in `labels`.
    async fn volumes_by_label(&self, labels: &Labels) -> Result<Vec<RuntimeVolume>, BackendError>;
}

/// Containers labelled as belonging to `component`, in runtime order.
pub async fn component_containers(
    runtime: &dyn ContainerRuntime,
    component: &ComponentName,
) -> Result<Vec<ObservedContainer>, ConvergeError> {
    let all = runtime
        .list_containers()
        .await
        .map_err(|e| runtime_err("list containers", e))?;
    Ok(all
        .into_iter()
        .filter(|c| c.label(labels::RUNTIME_COMPONENT_LABEL) == Some(component.0.as_str()))
        .collect())
}

/// Whether any container of `component` exists.
pub async fn component_exists(
    runtime: &dyn ContainerRuntime,
    component: &ComponentName,
) -> Result<bool, ConvergeError> {
    Ok(!component_containers(runtime, component).await?.is_empty())
}

/// `{component, alias}` labels identifying one unit's container.
pub fn container_labels(component: &ComponentName, alias: &ContainerAlias) -> Labels {
    Labels::from([
        (labels::RUNTIME_COMPONENT_LABEL.to_string(), component.0.clone()),
        (labels::RUNTIME_ALIAS_LABEL.to_string(), alias.0.clone()),
    ])
}
