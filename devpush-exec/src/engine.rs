//! Command graph execution against a running component.
//!
//! Leaf execs go through one protocol: begin event, output capture, drain,
//! complete event, error wrap. Long-running run/debug commands are driven
//! through the supervisor instead of being executed directly.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::task::{self, JoinSet};

use devpush_core::{
    config::DEFAULT_SHELL, CommandKind, CommandMap, CompositeCommand, DevfileCommand, ExecCommand,
    GroupKind,
};

use crate::error::{BranchFailure, ExecError, Purpose};
use crate::events::{EventSink, ExecutionEvent};
use crate::supervisor::{self, RestartPolicy, SupervisorProgram};
use crate::transport::{ComponentInfo, ExecClient};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// How a top-level command is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    /// Run to completion through the shell.
    Plain,
    /// Hand to the supervisor as a long-running program.
    Supervised {
        program: SupervisorProgram,
        restart: RestartPolicy,
    },
}

/// Executes devfile commands in the containers of one component.
///
/// Cheap to clone; parallel composite branches each get their own handle.
#[derive(Clone)]
pub struct ExecutionEngine {
    client: Arc<dyn ExecClient>,
    events: Arc<dyn EventSink>,
    info: Arc<ComponentInfo>,
    commands: Arc<CommandMap>,
    shell: Arc<str>,
}

impl ExecutionEngine {
    pub fn new(
        client: Arc<dyn ExecClient>,
        events: Arc<dyn EventSink>,
        info: ComponentInfo,
        commands: CommandMap,
    ) -> Self {
        Self {
            client,
            events,
            info: Arc::new(info),
            commands: Arc::new(commands),
            shell: Arc::from(DEFAULT_SHELL),
        }
    }

    pub fn with_shell(mut self, shell: &str) -> Self {
        self.shell = Arc::from(shell);
        self
    }

    pub fn commands(&self) -> &CommandMap {
        &self.commands
    }

    /// Execute a top-level command.
    pub async fn execute(
        &self,
        command: &DevfileCommand,
        invocation: Invocation,
    ) -> Result<(), ExecError> {
        match (&command.kind, invocation) {
            (CommandKind::Composite(composite), _) => self.execute_composite(composite).await,
            (CommandKind::Exec(exec), Invocation::Plain) => {
                self.execute_build_action(&command.id, exec).await
            }
            (CommandKind::Exec(exec), Invocation::Supervised { program, restart }) => {
                self.execute_supervised(&command.id, exec, program, restart)
                    .await
            }
        }
    }

    /// Run an exec to completion: `<shell> -c "[cd <wd> && ]<command line>"`.
    pub async fn execute_build_action(
        &self,
        id: &str,
        exec: &ExecCommand,
    ) -> Result<(), ExecError> {
        let argv = self.shell_argv(exec);
        self.run_step(id, exec, argv, Purpose::Build).await
    }

    /// Bring up a long-running program through the supervisor.
    pub async fn execute_supervised(
        &self,
        id: &str,
        exec: &ExecCommand,
        program: SupervisorProgram,
        restart: RestartPolicy,
    ) -> Result<(), ExecError> {
        if restart == RestartPolicy::Full {
            self.run_step(id, exec, supervisor::stop_all_argv(), Purpose::Run)
                .await?;
        }
        self.run_step(id, exec, supervisor::start_argv(program), Purpose::Run)
            .await
    }

    /// Walk a composite. Every referenced name is resolved before anything runs.
    pub async fn execute_composite(&self, composite: &CompositeCommand) -> Result<(), ExecError> {
        let resolved = composite
            .commands
            .iter()
            .map(|name| {
                self.commands
                    .resolve(name)
                    .cloned()
                    .ok_or_else(|| ExecError::CommandNotFound { name: name.clone() })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if composite.parallel {
            self.execute_parallel(resolved).await
        } else {
            self.execute_sequential(resolved).await
        }
    }

    async fn execute_sequential(&self, commands: Vec<DevfileCommand>) -> Result<(), ExecError> {
        for command in commands {
            self.execute_in_composite(&command)
                .await
                .map_err(|source| ExecError::CompositeStep {
                    command: command.id.clone(),
                    source: Box::new(source),
                })?;
        }
        Ok(())
    }

    async fn execute_parallel(&self, commands: Vec<DevfileCommand>) -> Result<(), ExecError> {
        let mut branches = JoinSet::new();
        let mut names: HashMap<task::Id, String> = HashMap::new();
        for command in commands {
            let engine = self.clone();
            let id = command.id.clone();
            let handle = branches.spawn(async move { engine.execute_in_composite(&command).await });
            names.insert(handle.id(), id);
        }

        let mut failures = Vec::new();
        while let Some(joined) = branches.join_next_with_id().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((task_id, Err(error))) => failures.push(BranchFailure {
                    command: names.remove(&task_id).unwrap_or_default(),
                    error,
                }),
                Err(err) => failures.push(BranchFailure {
                    command: names.remove(&err.id()).unwrap_or_default(),
                    error: ExecError::TaskJoin(err.to_string()),
                }),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ExecError::ParallelFailed { failures })
        }
    }

    /// Commands reached through a composite never use the supervisor.
    fn execute_in_composite<'a>(
        &'a self,
        command: &'a DevfileCommand,
    ) -> BoxFuture<'a, Result<(), ExecError>> {
        Box::pin(async move {
            match &command.kind {
                CommandKind::Composite(composite) => self.execute_composite(composite).await,
                CommandKind::Exec(exec) if exec.group.map(|g| g.kind) == Some(GroupKind::Init) => {
                    tracing::debug!(command = %command.id, "skipping init command inside composite");
                    Ok(())
                }
                CommandKind::Exec(exec) => self.execute_build_action(&command.id, exec).await,
            }
        })
    }

    async fn run_step(
        &self,
        id: &str,
        exec: &ExecCommand,
        argv: Vec<String>,
        purpose: Purpose,
    ) -> Result<(), ExecError> {
        let target = self.info.target(&exec.component)?;

        let begin = ExecutionEvent::begin(id, exec);
        self.events.command_execution_begin(&begin);

        let writer = self.events.create_output_writer();
        let result = self
            .client
            .exec_command(&target, &argv, &writer.stdout, &writer.stderr)
            .await;
        writer.close_and_wait().await;

        let error = result.as_ref().err().map(ToString::to_string);
        self.events
            .command_execution_complete(&begin.completed(), error.as_deref());

        result.map_err(|source| ExecError::CommandFailed {
            purpose,
            command: id.to_string(),
            source,
        })
    }

    fn shell_argv(&self, exec: &ExecCommand) -> Vec<String> {
        let line = match exec.working_dir.as_deref() {
            Some(dir) if !dir.is_empty() => format!("cd {dir} && {}", exec.command_line),
            _ => exec.command_line.clone(),
        };
        vec![self.shell.to_string(), "-c".to_string(), line]
    }
}
