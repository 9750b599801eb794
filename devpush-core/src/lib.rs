//! devpush core library: devfile model, label keys, preferences, errors.
//!
//! Public API surface:
//! - [`types`]: newtypes and the in-memory devfile model
//! - [`labels`]: label and annotation keys shared by every backend
//! - [`config`]: preferences load / save
//! - [`logging`]: tracing subscriber setup
//! - [`error`]: [`DevfileError`]

pub mod config;
pub mod error;
pub mod labels;
pub mod logging;
pub mod types;

pub use config::Preferences;
pub use error::DevfileError;
pub use types::{
    CommandGroup, CommandKind, CommandMap, ComponentName, CompositeCommand, ContainerAlias,
    Devfile, DevfileCommand, DevfileComponentSpec, DevfileVolume, EnvVar, ExecCommand,
    GroupKind, SourceType, VolumeMountRef,
};
