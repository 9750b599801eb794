//! Volume mount reconciliation on a current-generation workload.
//!
//! Everything here mutates a [`Deployment`] in memory; persisting the
//! result is the caller's job.

use std::collections::BTreeMap;

use rand::{distributions::Alphanumeric, Rng};

use crate::error::ClusterError;
use crate::objects::{Deployment, PersistentVolumeClaim, Volume, VolumeMount};

const VOLUME_SUFFIX_LEN: usize = 4;

/// `<claim>-<random>-volume`, lowercase so it stays a valid DNS label.
pub fn generate_volume_name(claim: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(VOLUME_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{claim}-{suffix}-volume")
}

fn single_container_check(dep: &Deployment) -> Result<(), ClusterError> {
    let count = dep.template.containers.len();
    if count != 1 {
        return Err(ClusterError::MultiContainerUnsupported {
            name: dep.metadata.name.clone(),
            count,
        });
    }
    Ok(())
}

/// Mount `claim` at `path` in the workload's only container.
///
/// Returns the generated pod volume name.
pub fn add_claim_to_deployment(
    dep: &mut Deployment,
    claim: &str,
    path: &str,
) -> Result<String, ClusterError> {
    single_container_check(dep)?;
    let volume_name = generate_volume_name(claim);

    dep.template.volumes.push(Volume {
        name: volume_name.clone(),
        claim_name: Some(claim.to_string()),
    });
    dep.template.containers[0].volume_mounts.push(VolumeMount {
        name: volume_name.clone(),
        mount_path: path.to_string(),
    });
    Ok(volume_name)
}

/// Pod volume names backed by `claim`. Scratch volumes are skipped.
pub fn volume_names_for_claim(dep: &Deployment, claim: &str) -> Vec<String> {
    dep.template
        .volumes
        .iter()
        .filter(|v| v.claim_name.as_deref() == Some(claim))
        .map(|v| v.name.clone())
        .collect()
}

/// Drop the pod volume named `volume`. Returns whether anything was removed.
pub fn remove_volume_from_deployment(volume: &str, dep: &mut Deployment) -> bool {
    let before = dep.template.volumes.len();
    dep.template.volumes.retain(|v| v.name != volume);
    dep.template.volumes.len() != before
}

/// Drop every mount of `volume` from every container. Returns whether anything was removed.
pub fn remove_volume_mount_from_deployment(volume: &str, dep: &mut Deployment) -> bool {
    let mut found = false;
    for container in &mut dep.template.containers {
        let before = container.volume_mounts.len();
        container.volume_mounts.retain(|m| m.name != volume);
        found |= container.volume_mounts.len() != before;
    }
    found
}

/// Move the workload from its current mount set towards the desired one.
///
/// - `to_unmount`: mount path → volume name. The mount at each path is
///   removed; its pod volume goes too once no remaining mount uses it.
/// - `to_mount`: mount path → claim. Each adds a pod volume plus a mount.
///
/// Unmounts are applied before mounts so a path can be re-pointed in one call.
pub fn reconcile_volume_mounts(
    dep: &mut Deployment,
    to_mount: &BTreeMap<String, PersistentVolumeClaim>,
    to_unmount: &BTreeMap<String, String>,
) -> Result<(), ClusterError> {
    single_container_check(dep)?;

    let mounts = &mut dep.template.containers[0].volume_mounts;
    let mut released = Vec::new();
    mounts.retain(|m| {
        if to_unmount.contains_key(&m.mount_path) {
            released.push(m.name.clone());
            false
        } else {
            true
        }
    });

    for volume in released {
        let still_used = dep.template.containers[0]
            .volume_mounts
            .iter()
            .any(|m| m.name == volume);
        if !still_used {
            remove_volume_from_deployment(&volume, dep);
        }
    }

    for (path, claim) in to_mount {
        let volume = add_claim_to_deployment(dep, claim.name(), path)?;
        tracing::debug!(
            workload = %dep.metadata.name,
            claim = %claim.name(),
            volume = %volume,
            path = %path,
            "mounted claim",
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
