//! # devpush-cluster
//!
//! Read-only views over pushed components and in-memory volume mount
//! reconciliation for cluster workloads.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use devpush_cluster::{get_pushed_components, ClusterClient, WorkloadView};
//!
//! async fn print_components(client: Arc<dyn ClusterClient>) {
//!     if let Ok(components) = get_pushed_components(&client, "shop").await {
//!         for (name, component) in &components {
//!             let urls = component.urls().await.map(|u| u.len()).unwrap_or(0);
//!             println!("{name}: {urls} url(s)");
//!         }
//!     }
//! }
//! ```

pub mod client;
pub mod error;
pub mod objects;
pub mod pushed;
pub mod volumes;

pub use client::{ClusterClient, Url, UrlKind};
pub use error::ClusterError;
pub use objects::{Deployment, DeploymentConfig, PersistentVolumeClaim};
pub use pushed::{
    get_pushed_component, get_pushed_components, ComponentSource, PushedComponent, WorkloadView,
};
pub use volumes::reconcile_volume_mounts;
