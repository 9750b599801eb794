//! # devpush-converge
//!
//! Container convergence and the push pipeline for a local container runtime.
//!
//! Call [`ComponentAdapter::push`] to converge a component's containers with
//! its devfile, sync sources into them and run the push commands.

pub mod adapter;
pub mod diff;
pub mod error;
pub mod runtime;
pub mod volumes;

pub use adapter::{
    first_source_container, ComponentAdapter, ConvergeReport, PushParameters, PushSummary,
    SourceSync,
};
pub use diff::needs_recreate;
pub use error::{BackendError, ConvergeError};
pub use runtime::{ContainerConfig, ContainerRuntime, Mount, MountPoint, ObservedContainer};
pub use volumes::process_volumes;
