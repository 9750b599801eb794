//! Choosing and running the init/build/run commands of a push.

use devpush_core::{CommandMap, Devfile, DevfileCommand, ExecCommand, GroupKind};

use crate::engine::{ExecutionEngine, Invocation};
use crate::error::ExecError;
use crate::supervisor::{RestartPolicy, SupervisorProgram};

/// Command names requested by the caller. `None` picks the group's default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushCommandNames {
    pub init: Option<String>,
    pub build: Option<String>,
    pub run: Option<String>,
    pub debug: Option<String>,
}

/// Commands one push will execute, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushCommands {
    pub init: Option<DevfileCommand>,
    pub build: Option<DevfileCommand>,
    /// The run command, or the debug command in debug mode.
    pub run: DevfileCommand,
    pub program: SupervisorProgram,
}

impl PushCommands {
    /// The supervised exec, unless run/debug is a composite.
    pub fn supervised_exec(&self) -> Option<&ExecCommand> {
        self.run.as_exec()
    }
}

pub fn select_push_commands(
    devfile: &Devfile,
    names: &PushCommandNames,
    debug: bool,
) -> Result<PushCommands, ExecError> {
    let map = devfile.commands_map();
    let init = pick(devfile, &map, names.init.as_deref(), GroupKind::Init)?;
    let build = pick(devfile, &map, names.build.as_deref(), GroupKind::Build)?;

    let (requested, kind, program) = if debug {
        (names.debug.as_deref(), GroupKind::Debug, SupervisorProgram::DebugRun)
    } else {
        (names.run.as_deref(), GroupKind::Run, SupervisorProgram::DevRun)
    };
    let run = pick(devfile, &map, requested, kind)?
        .ok_or(ExecError::MissingRunCommand { kind })?;

    Ok(PushCommands {
        init,
        build,
        run,
        program,
    })
}

fn pick(
    devfile: &Devfile,
    map: &CommandMap,
    requested: Option<&str>,
    kind: GroupKind,
) -> Result<Option<DevfileCommand>, ExecError> {
    let Some(name) = requested else {
        return Ok(devfile.default_command(kind).cloned());
    };
    let command = map.resolve(name).ok_or_else(|| ExecError::CommandNotFound {
        name: name.to_string(),
    })?;
    if command.group_kind() != Some(kind) {
        return Err(ExecError::CommandGroupMismatch {
            name: name.to_string(),
            expected: kind,
        });
    }
    Ok(Some(command.clone()))
}

/// Run init and build to completion, then bring up run/debug.
///
/// `restart` is [`RestartPolicy::Full`] for freshly created components or a
/// forced restart, and [`RestartPolicy::IfNeeded`] otherwise.
pub async fn execute_push_commands(
    engine: &ExecutionEngine,
    commands: &PushCommands,
    restart: RestartPolicy,
) -> Result<(), ExecError> {
    for command in [&commands.init, &commands.build].into_iter().flatten() {
        engine.execute(command, Invocation::Plain).await?;
    }

    let invocation = Invocation::Supervised {
        program: commands.program,
        restart,
    };
    tracing::info!(
        command = %commands.run.id,
        program = commands.program.name(),
        ?restart,
        "starting long-running command",
    );
    engine.execute(&commands.run, invocation).await
}
