//! Domain types for the in-memory devfile model.
//!
//! The model is consumed already validated; serde derives exist so callers
//! can hand it over as YAML, not to re-implement devfile validation here.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DevfileError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed name for a pushed component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentName(pub String);

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ComponentName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ComponentName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// The alias of a runtime container inside a devfile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerAlias(pub String);

impl fmt::Display for ContainerAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ContainerAlias {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ContainerAlias {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Group a command belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Init,
    Build,
    Run,
    Debug,
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKind::Init => write!(f, "init"),
            GroupKind::Build => write!(f, "build"),
            GroupKind::Run => write!(f, "run"),
            GroupKind::Debug => write!(f, "debug"),
        }
    }
}

/// Where the source of a pushed component came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Local,
    Binary,
    Git,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Local => write!(f, "local"),
            SourceType::Binary => write!(f, "binary"),
            SourceType::Git => write!(f, "git"),
        }
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "binary" => Ok(Self::Binary),
            "git" => Ok(Self::Git),
            other => Err(format!("unsupported component source type {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// One environment variable of a devfile container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// `NAME=VALUE`, the form container runtimes report back.
    pub fn normalized(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

/// A devfile volume mounted into a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMountRef {
    pub name: String,
    pub container_path: String,
}

/// A top-level devfile volume declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevfileVolume {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

/// One desired runtime unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevfileComponentSpec {
    pub alias: ContainerAlias,
    pub image: String,
    /// Entrypoint override; empty keeps the image entrypoint.
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: Vec<EnvVar>,
    #[serde(default)]
    pub mount_sources: bool,
    #[serde(default)]
    pub volumes: Vec<VolumeMountRef>,
}

impl DevfileComponentSpec {
    /// Env vars in `NAME=VALUE` form, in declaration order.
    pub fn normalized_env(&self) -> Vec<String> {
        self.env.iter().map(EnvVar::normalized).collect()
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Group membership of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandGroup {
    pub kind: GroupKind,
    #[serde(default)]
    pub is_default: bool,
}

/// A shell command run inside one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecCommand {
    pub command_line: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    /// Alias of the container the command runs in.
    pub component: ContainerAlias,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<CommandGroup>,
}

/// An ordered list of references to other commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeCommand {
    pub commands: Vec<String>,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<CommandGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    Exec(ExecCommand),
    Composite(CompositeCommand),
}

/// A named devfile command.
///
/// On the wire a command is `{ id, exec: {...} }` or `{ id, composite: {...} }`;
/// exactly one of the two bodies must be present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCommand", into = "RawCommand")]
pub struct DevfileCommand {
    pub id: String,
    pub kind: CommandKind,
}

impl DevfileCommand {
    pub fn exec(id: impl Into<String>, exec: ExecCommand) -> Self {
        Self {
            id: id.into(),
            kind: CommandKind::Exec(exec),
        }
    }

    pub fn composite(id: impl Into<String>, composite: CompositeCommand) -> Self {
        Self {
            id: id.into(),
            kind: CommandKind::Composite(composite),
        }
    }

    pub fn group(&self) -> Option<CommandGroup> {
        match &self.kind {
            CommandKind::Exec(exec) => exec.group,
            CommandKind::Composite(composite) => composite.group,
        }
    }

    pub fn group_kind(&self) -> Option<GroupKind> {
        self.group().map(|g| g.kind)
    }

    pub fn as_exec(&self) -> Option<&ExecCommand> {
        match &self.kind {
            CommandKind::Exec(exec) => Some(exec),
            CommandKind::Composite(_) => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawCommand {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exec: Option<ExecCommand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    composite: Option<CompositeCommand>,
}

impl TryFrom<RawCommand> for DevfileCommand {
    type Error = String;

    fn try_from(raw: RawCommand) -> Result<Self, Self::Error> {
        match (raw.exec, raw.composite) {
            (Some(exec), None) => Ok(Self::exec(raw.id, exec)),
            (None, Some(composite)) => Ok(Self::composite(raw.id, composite)),
            (Some(_), Some(_)) => Err(format!(
                "command {} declares both exec and composite bodies",
                raw.id
            )),
            (None, None) => Err(format!("command {} declares no body", raw.id)),
        }
    }
}

impl From<DevfileCommand> for RawCommand {
    fn from(cmd: DevfileCommand) -> Self {
        let (exec, composite) = match cmd.kind {
            CommandKind::Exec(exec) => (Some(exec), None),
            CommandKind::Composite(composite) => (None, Some(composite)),
        };
        Self {
            id: cmd.id,
            exec,
            composite,
        }
    }
}

/// Case-insensitive name → command lookup.
///
/// Built once per execution and only read afterwards.
#[derive(Debug, Clone, Default)]
pub struct CommandMap(HashMap<String, DevfileCommand>);

impl CommandMap {
    pub fn resolve(&self, name: &str) -> Option<&DevfileCommand> {
        self.0.get(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<DevfileCommand> for CommandMap {
    fn from_iter<I: IntoIterator<Item = DevfileCommand>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|cmd| (cmd.id.to_lowercase(), cmd))
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Devfile
// ---------------------------------------------------------------------------

/// Root of the devfile model.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Devfile {
    #[serde(default)]
    pub components: Vec<DevfileComponentSpec>,
    #[serde(default)]
    pub commands: Vec<DevfileCommand>,
    #[serde(default)]
    pub volumes: Vec<DevfileVolume>,
}

impl Devfile {
    pub fn commands_map(&self) -> CommandMap {
        self.commands.iter().cloned().collect()
    }

    pub fn component(&self, alias: &ContainerAlias) -> Option<&DevfileComponentSpec> {
        self.components.iter().find(|c| &c.alias == alias)
    }

    pub fn commands_in_group(&self, kind: GroupKind) -> Vec<&DevfileCommand> {
        self.commands
            .iter()
            .filter(|c| c.group_kind() == Some(kind))
            .collect()
    }

    /// The command flagged `is_default` in `kind`, or the only command in it.
    pub fn default_command(&self, kind: GroupKind) -> Option<&DevfileCommand> {
        let in_group = self.commands_in_group(kind);
        if let Some(cmd) = in_group
            .iter()
            .find(|c| c.group().map(|g| g.is_default).unwrap_or(false))
        {
            return Some(cmd);
        }
        match in_group.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Read an already-validated devfile document from `path`.
    pub fn load_at(path: &Path) -> Result<Self, DevfileError> {
        if !path.exists() {
            return Err(DevfileError::DevfileNotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = std::fs::read_to_string(path)?;
        let devfile: Self = serde_yaml::from_str(&contents).map_err(|e| DevfileError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        tracing::debug!(
            path = %path.display(),
            components = devfile.components.len(),
            commands = devfile.commands.len(),
            "loaded devfile",
        );
        Ok(devfile)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
