//! In-container supervisor control protocol.
//!
//! The supervisor binary lives on a shared volume mounted into the container
//! that hosts the run/debug command. Programs are started and stopped via
//! its control subcommand.

use devpush_core::GroupKind;

pub const SUPERVISOR_MOUNT_PATH: &str = "/opt/devpush/";
pub const SUPERVISOR_BINARY: &str = "/opt/devpush/bin/supervisord";
pub const SUPERVISOR_CONFIG: &str = "/opt/devpush/conf/devpush-supervisor.conf";
pub const SUPERVISOR_CTL: &str = "ctl";

pub const ENV_COMMAND_RUN: &str = "DEVPUSH_COMMAND_RUN";
pub const ENV_COMMAND_RUN_WORKING_DIR: &str = "DEVPUSH_COMMAND_RUN_WORKING_DIR";
pub const ENV_COMMAND_DEBUG: &str = "DEVPUSH_COMMAND_DEBUG";
pub const ENV_COMMAND_DEBUG_WORKING_DIR: &str = "DEVPUSH_COMMAND_DEBUG_WORKING_DIR";

/// A program the supervisor knows how to launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorProgram {
    DevRun,
    DebugRun,
}

impl SupervisorProgram {
    pub fn name(self) -> &'static str {
        match self {
            SupervisorProgram::DevRun => "devrun",
            SupervisorProgram::DebugRun => "debugrun",
        }
    }

    pub fn for_group(kind: GroupKind) -> Option<Self> {
        match kind {
            GroupKind::Run => Some(SupervisorProgram::DevRun),
            GroupKind::Debug => Some(SupervisorProgram::DebugRun),
            GroupKind::Init | GroupKind::Build => None,
        }
    }

    /// Env var names (command, working dir) the supervisor reads this program from.
    pub fn env_names(self) -> (&'static str, &'static str) {
        match self {
            SupervisorProgram::DevRun => (ENV_COMMAND_RUN, ENV_COMMAND_RUN_WORKING_DIR),
            SupervisorProgram::DebugRun => (ENV_COMMAND_DEBUG, ENV_COMMAND_DEBUG_WORKING_DIR),
        }
    }
}

/// How a long-running program is brought up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Stop every supervised program, then start the target.
    Full,
    /// Start the target; the supervisor no-ops if it is already running.
    IfNeeded,
}

pub fn stop_all_argv() -> Vec<String> {
    ctl(&["stop", "all"])
}

pub fn start_argv(program: SupervisorProgram) -> Vec<String> {
    ctl(&["start", program.name()])
}

/// Entrypoint for a container whose image command is replaced by the supervisor.
pub fn supervisor_entrypoint() -> (Vec<String>, Vec<String>) {
    (
        vec![SUPERVISOR_BINARY.to_string()],
        vec!["-c".to_string(), SUPERVISOR_CONFIG.to_string()],
    )
}

fn ctl(args: &[&str]) -> Vec<String> {
    let mut argv = vec![SUPERVISOR_BINARY.to_string(), SUPERVISOR_CTL.to_string()];
    argv.extend(args.iter().map(|a| a.to_string()));
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_argv_shapes() {
        assert_eq!(
            stop_all_argv(),
            vec!["/opt/devpush/bin/supervisord", "ctl", "stop", "all"]
        );
        assert_eq!(
            start_argv(SupervisorProgram::DebugRun),
            vec!["/opt/devpush/bin/supervisord", "ctl", "start", "debugrun"]
        );
    }

    #[test]
    fn only_run_and_debug_are_supervised() {
        assert_eq!(
            SupervisorProgram::for_group(GroupKind::Run),
            Some(SupervisorProgram::DevRun)
        );
        assert_eq!(SupervisorProgram::for_group(GroupKind::Build), None);
    }
}
