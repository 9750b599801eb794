//! Drift detection between a desired container and a running one.
//!
//! Local runtimes cannot patch a container in place, so any drift means
//! destroy and recreate. The check is additive: extra env vars or mounts on
//! the running container never trigger a recreate.

use crate::runtime::{ContainerConfig, Mount, MountPoint};

/// Whether the running container must be replaced to match `desired`.
pub fn needs_recreate(
    desired: &ContainerConfig,
    observed: &ContainerConfig,
    desired_mounts: &[Mount],
    observed_mounts: &[MountPoint],
) -> bool {
    if desired.image != observed.image {
        return true;
    }
    if desired_mounts
        .iter()
        .any(|m| !has_mount(m, observed_mounts))
    {
        return true;
    }
    desired.env.iter().any(|var| !observed.env.contains(var))
}

fn has_mount(wanted: &Mount, observed: &[MountPoint]) -> bool {
    observed
        .iter()
        .any(|m| m.name == wanted.source && m.destination == wanted.target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn config(image: &str, env: &[&str]) -> ContainerConfig {
        ContainerConfig {
            image: image.to_string(),
            env: env.iter().map(|e| e.to_string()).collect(),
            ..ContainerConfig::default()
        }
    }

    fn point(name: &str, destination: &str) -> MountPoint {
        MountPoint {
            name: name.to_string(),
            destination: destination.to_string(),
        }
    }

    #[rstest]
    #[case::identical("node:18", &["A=1"], &[("proj", "/projects")], "node:18", &["A=1"], &[("proj", "/projects")], false)]
    #[case::extra_observed_env("node:18", &["A=1"], &[], "node:18", &["A=1", "PATH=/bin"], &[], false)]
    #[case::extra_observed_mount("node:18", &[], &[("proj", "/projects")], "node:18", &[], &[("proj", "/projects"), ("cache", "/cache")], false)]
    #[case::image_changed("node:20", &[], &[], "node:18", &[], &[], true)]
    #[case::env_value_changed("node:18", &["A=2"], &[], "node:18", &["A=1"], &[], true)]
    #[case::env_added("node:18", &["A=1", "B=2"], &[], "node:18", &["A=1"], &[], true)]
    #[case::mount_missing("node:18", &[], &[("data", "/data")], "node:18", &[], &[], true)]
    #[case::mount_retargeted("node:18", &[], &[("data", "/data")], "node:18", &[], &[("data", "/var/data")], true)]
    #[case::mount_other_volume("node:18", &[], &[("data", "/data")], "node:18", &[], &[("other", "/data")], true)]
    fn recreate_iff_drift(
        #[case] desired_image: &str,
        #[case] desired_env: &[&str],
        #[case] desired_mounts: &[(&str, &str)],
        #[case] observed_image: &str,
        #[case] observed_env: &[&str],
        #[case] observed_mounts: &[(&str, &str)],
        #[case] expected: bool,
    ) {
        let desired_mounts: Vec<Mount> = desired_mounts
            .iter()
            .map(|(s, t)| Mount::new(*s, *t))
            .collect();
        let observed_mounts: Vec<MountPoint> =
            observed_mounts.iter().map(|(n, d)| point(n, d)).collect();

        assert_eq!(
            needs_recreate(
                &config(desired_image, desired_env),
                &config(observed_image, observed_env),
                &desired_mounts,
                &observed_mounts,
            ),
            expected
        );
    }
}
