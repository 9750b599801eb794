//! Per-component push: converge containers, sync sources, run commands.
//!
//! A component is Absent (no labelled containers) or Present. Absent
//! components get every unit created; Present ones are diffed unit by unit
//! and only drifted or missing units are touched. Nothing is rolled back on
//! failure; pushing again resumes from whatever state was reached.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use devpush_core::{ComponentName, ContainerAlias, Devfile, DevfileComponentSpec, Preferences};
use devpush_exec::{
    execute_push_commands, select_push_commands,
    supervisor::{self, SUPERVISOR_MOUNT_PATH},
    ComponentInfo, EventSink, ExecClient, ExecutionEngine, PushCommandNames, PushCommands,
    RestartPolicy,
};

use crate::diff::needs_recreate;
use crate::error::{runtime_err, BackendError, ConvergeError};
use crate::runtime::{
    component_containers, container_labels, ContainerConfig, ContainerRuntime, Mount,
    ObservedContainer,
};
use crate::volumes::{
    get_or_create_project_volume, get_or_create_supervisor_volume, process_volumes,
    PROJECT_SOURCE_MOUNT,
};

/// Local-to-container file synchronization, run between convergence and
/// command execution.
#[async_trait]
pub trait SourceSync: Send + Sync {
    async fn sync_files(
        &self,
        container_id: &str,
        component_existed: bool,
    ) -> Result<(), BackendError>;
}

#[derive(Debug, Clone, Default)]
pub struct PushParameters {
    pub commands: PushCommandNames,
    pub debug: bool,
    /// Restart the run/debug program even if the component already existed.
    pub force_restart: bool,
}

/// What happened to each unit during convergence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConvergeReport {
    pub existed: bool,
    pub created: Vec<ContainerAlias>,
    pub recreated: Vec<ContainerAlias>,
    pub unchanged: Vec<ContainerAlias>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushSummary {
    pub component: ComponentName,
    pub report: ConvergeReport,
    /// Container the project sources were synced into.
    pub source_container: String,
}

/// Volume names resolved once per push.
struct VolumeSet {
    project: Option<String>,
    supervisor: String,
    storage: BTreeMap<String, String>,
}

pub struct ComponentAdapter {
    component: ComponentName,
    devfile: Devfile,
    preferences: Preferences,
    runtime: Arc<dyn ContainerRuntime>,
    exec: Arc<dyn ExecClient>,
    events: Arc<dyn EventSink>,
    sync: Arc<dyn SourceSync>,
}

impl ComponentAdapter {
    pub fn new(
        component: impl Into<ComponentName>,
        devfile: Devfile,
        runtime: Arc<dyn ContainerRuntime>,
        exec: Arc<dyn ExecClient>,
        events: Arc<dyn EventSink>,
        sync: Arc<dyn SourceSync>,
    ) -> Self {
        Self {
            component: component.into(),
            devfile,
            preferences: Preferences::default(),
            runtime,
            exec,
            events,
            sync,
        }
    }

    pub fn with_preferences(mut self, preferences: Preferences) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn component(&self) -> &ComponentName {
        &self.component
    }

    pub async fn component_exists(&self) -> Result<bool, ConvergeError> {
        crate::runtime::component_exists(self.runtime.as_ref(), &self.component).await
    }

    /// Converge, sync, then execute the push commands.
    pub async fn push(&self, params: &PushParameters) -> Result<PushSummary, ConvergeError> {
        let commands = select_push_commands(&self.devfile, &params.commands, params.debug)
            .map_err(ConvergeError::InvalidCommands)?;

        let report = self.converge(&commands).await?;

        let containers = component_containers(self.runtime.as_ref(), &self.component).await?;
        let source_container = first_source_container(&containers)
            .ok_or_else(|| ConvergeError::NoSourceContainer {
                component: self.component.clone(),
            })?
            .to_string();

        self.sync
            .sync_files(&source_container, report.existed)
            .await
            .map_err(|source| ConvergeError::Sync {
                component: self.component.clone(),
                source,
            })?;

        let engine = ExecutionEngine::new(
            self.exec.clone(),
            self.events.clone(),
            self.component_info(&containers),
            self.devfile.commands_map(),
        )
        .with_shell(&self.preferences.shell);
        let restart = if !report.existed || params.force_restart {
            RestartPolicy::Full
        } else {
            RestartPolicy::IfNeeded
        };
        execute_push_commands(&engine, &commands, restart)
            .await
            .map_err(|source| ConvergeError::Exec {
                component: self.component.clone(),
                source,
            })?;

        tracing::info!(component = %self.component, "push complete");
        Ok(PushSummary {
            component: self.component.clone(),
            report,
            source_container,
        })
    }

    /// Bring the runtime's containers in line with the devfile.
    pub async fn converge(&self, commands: &PushCommands) -> Result<ConvergeReport, ConvergeError> {
        let observed = component_containers(self.runtime.as_ref(), &self.component).await?;
        let existed = !observed.is_empty();
        if !existed && self.devfile.components.is_empty() {
            return Err(ConvergeError::NoRunnableUnits {
                component: self.component.clone(),
            });
        }

        let volumes = self.resolve_volumes().await?;
        let mut report = ConvergeReport {
            existed,
            ..ConvergeReport::default()
        };

        for unit in &self.devfile.components {
            let (desired, mounts) = self.desired_container(unit, commands, &volumes);
            let matching: Vec<&ObservedContainer> = observed
                .iter()
                .filter(|c| c.alias().as_ref() == Some(&unit.alias))
                .collect();

            match matching.as_slice() {
                [] => {
                    self.create_unit(unit, &desired, &mounts).await?;
                    report.created.push(unit.alias.clone());
                }
                [current] => {
                    let config = self
                        .runtime
                        .container_config(&current.id)
                        .await
                        .map_err(|e| runtime_err("inspect container", e))?;
                    if needs_recreate(&desired, &config, &mounts, &current.mounts) {
                        self.remove_unit(unit, &current.id).await?;
                        self.create_unit(unit, &desired, &mounts).await?;
                        report.recreated.push(unit.alias.clone());
                    } else {
                        tracing::debug!(component = %self.component, alias = %unit.alias, "container up to date");
                        report.unchanged.push(unit.alias.clone());
                    }
                }
                many => {
                    return Err(ConvergeError::DuplicateContainers {
                        component: self.component.clone(),
                        alias: unit.alias.clone(),
                        count: many.len(),
                    })
                }
            }
        }
        Ok(report)
    }

    async fn resolve_volumes(&self) -> Result<VolumeSet, ConvergeError> {
        let runtime = self.runtime.as_ref();
        let storage = process_volumes(runtime, &self.component, &self.devfile).await?;
        let project = if self.devfile.components.iter().any(|c| c.mount_sources) {
            Some(get_or_create_project_volume(runtime, &self.component).await?)
        } else {
            None
        };
        let supervisor =
            get_or_create_supervisor_volume(runtime, &self.preferences.bootstrap_image()).await?;
        Ok(VolumeSet {
            project,
            supervisor,
            storage,
        })
    }

    fn desired_container(
        &self,
        unit: &DevfileComponentSpec,
        commands: &PushCommands,
        volumes: &VolumeSet,
    ) -> (ContainerConfig, Vec<Mount>) {
        let mut config = ContainerConfig {
            image: unit.image.clone(),
            entrypoint: unit.command.clone(),
            args: unit.args.clone(),
            env: unit.normalized_env(),
            labels: container_labels(&self.component, &unit.alias),
        };
        let mut mounts = Vec::new();

        if unit.mount_sources {
            if let Some(project) = &volumes.project {
                mounts.push(Mount::new(project, PROJECT_SOURCE_MOUNT));
            }
        }

        if let Some(exec) = commands
            .supervised_exec()
            .filter(|exec| exec.component == unit.alias)
        {
            if unit.command.is_empty() {
                let (entrypoint, args) = supervisor::supervisor_entrypoint();
                config.entrypoint = entrypoint;
                config.args = args;
            }
            let (command_var, dir_var) = commands.program.env_names();
            config.env.push(format!("{command_var}={}", exec.command_line));
            if let Some(dir) = exec.working_dir.as_deref().filter(|d| !d.is_empty()) {
                config.env.push(format!("{dir_var}={dir}"));
            }
            mounts.push(Mount::new(&volumes.supervisor, SUPERVISOR_MOUNT_PATH));
        }

        for volume in &unit.volumes {
            if let Some(runtime_name) = volumes.storage.get(&volume.name) {
                mounts.push(Mount::new(runtime_name, &volume.container_path));
            }
        }

        (config, mounts)
    }

    async fn create_unit(
        &self,
        unit: &DevfileComponentSpec,
        config: &ContainerConfig,
        mounts: &[Mount],
    ) -> Result<(), ConvergeError> {
        tracing::info!(component = %self.component, alias = %unit.alias, image = %unit.image, "pulling image");
        self.runtime
            .pull_image(&unit.image)
            .await
            .map_err(|source| ConvergeError::PullImage {
                image: unit.image.clone(),
                alias: unit.alias.to_string(),
                source,
            })?;

        let id = self
            .runtime
            .start_container(config, mounts)
            .await
            .map_err(|source| ConvergeError::StartContainer {
                alias: unit.alias.to_string(),
                source,
            })?;
        tracing::info!(component = %self.component, alias = %unit.alias, container = %id, "started container");
        Ok(())
    }

    async fn remove_unit(
        &self,
        unit: &DevfileComponentSpec,
        container_id: &str,
    ) -> Result<(), ConvergeError> {
        tracing::info!(component = %self.component, alias = %unit.alias, container = %container_id, "removing drifted container");
        self.runtime
            .remove_container(container_id)
            .await
            .map_err(|source| ConvergeError::RemoveContainer {
                alias: unit.alias.clone(),
                container_id: container_id.to_string(),
                source,
            })
    }

    fn component_info(&self, containers: &[ObservedContainer]) -> ComponentInfo {
        let mut info = ComponentInfo::new(self.component.clone());
        for container in containers {
            if let Some(alias) = container.alias() {
                info.insert(alias, container.id.clone());
            }
        }
        info
    }
}

/// First container mounting the project sources. They are shared, so one sync suffices.
pub fn first_source_container(containers: &[ObservedContainer]) -> Option<&str> {
    containers
        .iter()
        .find(|c| c.mounts_at(PROJECT_SOURCE_MOUNT))
        .map(|c| c.id.as_str())
}
