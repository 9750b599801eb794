//! Runtime volumes: project sources, devfile storage and the shared
//! supervisor volume.
//!
//! All three are found by label and created only when the lookup comes back
//! empty. The lookup and the create are separate runtime calls, so two
//! concurrent first pushes can both create a supervisor volume; pushes are
//! expected to be serialized by the caller.

use std::collections::{BTreeMap, BTreeSet};

use devpush_core::{labels, ComponentName, Devfile};
use devpush_exec::supervisor::SUPERVISOR_MOUNT_PATH;

use crate::error::{BackendError, ConvergeError};
use crate::runtime::{ContainerConfig, ContainerRuntime, Labels, Mount};

/// Where project sources are mounted in containers that ask for them.
pub const PROJECT_SOURCE_MOUNT: &str = "/projects";

pub const SUPERVISOR_VOLUME_NAME: &str = "devpush-supervisord-shared-data";

/// Payload directory inside the bootstrap image, copied into the supervisor volume.
pub const INIT_IMAGE_CONTENTS: &str = "/opt/devpush-init/.";

const COPY_BINARY: &str = "/usr/bin/cp";

pub fn project_volume_labels(component: &ComponentName) -> Labels {
    Labels::from([
        (labels::RUNTIME_COMPONENT_LABEL.to_string(), component.0.clone()),
        (labels::RUNTIME_TYPE_LABEL.to_string(), "projects".to_string()),
    ])
}

pub fn supervisor_volume_labels() -> Labels {
    Labels::from([
        (labels::RUNTIME_NAME_LABEL.to_string(), SUPERVISOR_VOLUME_NAME.to_string()),
        (labels::RUNTIME_TYPE_LABEL.to_string(), "supervisord".to_string()),
    ])
}

pub fn storage_volume_labels(component: &ComponentName, storage: &str) -> Labels {
    Labels::from([
        (labels::RUNTIME_COMPONENT_LABEL.to_string(), component.0.clone()),
        (labels::RUNTIME_STORAGE_LABEL.to_string(), storage.to_string()),
    ])
}

async fn get_or_create(
    runtime: &dyn ContainerRuntime,
    labels: &Labels,
) -> Result<(String, bool), BackendError> {
    let existing = runtime.volumes_by_label(labels).await?;
    if let Some(volume) = existing.into_iter().next() {
        return Ok((volume.name, false));
    }
    let created = runtime.create_volume(None, labels).await?;
    Ok((created.name, true))
}

/// Volume holding the component's project sources.
pub async fn get_or_create_project_volume(
    runtime: &dyn ContainerRuntime,
    component: &ComponentName,
) -> Result<String, ConvergeError> {
    let (name, created) = get_or_create(runtime, &project_volume_labels(component))
        .await
        .map_err(|source| ConvergeError::Volume {
            volume: "project".to_string(),
            source,
        })?;
    if created {
        tracing::info!(component = %component, volume = %name, "created project volume");
    }
    Ok(name)
}

/// Volume holding the supervisor binaries, shared by every component on the host.
///
/// On first creation a short-lived bootstrap container copies the payload of
/// `bootstrap_image` into it.
pub async fn get_or_create_supervisor_volume(
    runtime: &dyn ContainerRuntime,
    bootstrap_image: &str,
) -> Result<String, ConvergeError> {
    let labels = supervisor_volume_labels();
    let volume_err = |source| ConvergeError::Volume {
        volume: "supervisor".to_string(),
        source,
    };

    let existing = runtime.volumes_by_label(&labels).await.map_err(volume_err)?;
    if let Some(volume) = existing.into_iter().next() {
        return Ok(volume.name);
    }

    let volume = runtime
        .create_volume(None, &labels)
        .await
        .map_err(volume_err)?;
    tracing::info!(volume = %volume.name, image = %bootstrap_image, "bootstrapping supervisor volume");
    start_bootstrap_container(runtime, &volume.name, bootstrap_image).await?;
    Ok(volume.name)
}

async fn start_bootstrap_container(
    runtime: &dyn ContainerRuntime,
    volume: &str,
    image: &str,
) -> Result<(), ConvergeError> {
    const ALIAS: &str = "supervisor bootstrap";

    runtime
        .pull_image(image)
        .await
        .map_err(|source| ConvergeError::PullImage {
            image: image.to_string(),
            alias: ALIAS.to_string(),
            source,
        })?;

    let config = ContainerConfig {
        image: image.to_string(),
        entrypoint: vec![COPY_BINARY.to_string()],
        args: vec![
            "-r".to_string(),
            INIT_IMAGE_CONTENTS.to_string(),
            SUPERVISOR_MOUNT_PATH.to_string(),
        ],
        env: Vec::new(),
        labels: supervisor_volume_labels(),
    };
    runtime
        .start_container(&config, &[Mount::new(volume, SUPERVISOR_MOUNT_PATH)])
        .await
        .map_err(|source| ConvergeError::StartContainer {
            alias: ALIAS.to_string(),
            source,
        })?;
    Ok(())
}

/// Get or create one runtime volume per devfile volume used by `component`.
///
/// Returns devfile volume name → runtime volume name.
pub async fn process_volumes(
    runtime: &dyn ContainerRuntime,
    component: &ComponentName,
    devfile: &Devfile,
) -> Result<BTreeMap<String, String>, ConvergeError> {
    let names: BTreeSet<&str> = devfile
        .components
        .iter()
        .flat_map(|c| c.volumes.iter().map(|v| v.name.as_str()))
        .collect();

    let mut resolved = BTreeMap::new();
    for storage in names {
        let (volume, created) =
            get_or_create(runtime, &storage_volume_labels(component, storage))
                .await
                .map_err(|source| ConvergeError::Volume {
                    volume: storage.to_string(),
                    source,
                })?;
        if created {
            tracing::info!(component = %component, storage, volume = %volume, "created storage volume");
        }
        resolved.insert(storage.to_string(), volume);
    }
    Ok(resolved)
}
