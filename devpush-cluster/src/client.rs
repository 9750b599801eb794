//! Cluster capability interface.
//!
//! devpush never talks to the API server itself; a client crate implements
//! [`ClusterClient`] and reports failures through [`ClusterError`] so the
//! NotFound class can be told apart from real faults.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClusterError;
use crate::objects::{Deployment, DeploymentConfig};

/// How an endpoint is exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlKind {
    Route,
    Ingress,
}

/// An externally routed endpoint of a pushed component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Url {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub kind: UrlKind,
}

impl Url {
    pub fn address(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{scheme}://{}", self.host)
    }
}

#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Whether route-style endpoints exist on this cluster.
    async fn is_route_supported(&self) -> Result<bool, ClusterError>;

    /// Whether the legacy workload kind exists on this cluster.
    async fn is_deployment_config_supported(&self) -> Result<bool, ClusterError>;

    async fn list_routes(&self, component: &str, application: &str)
        -> Result<Vec<Url>, ClusterError>;

    async fn list_ingresses(&self, component: &str) -> Result<Vec<Url>, ClusterError>;

    async fn list_deployment_configs(
        &self,
        selector: &str,
    ) -> Result<Vec<DeploymentConfig>, ClusterError>;

    async fn list_deployments(&self, selector: &str) -> Result<Vec<Deployment>, ClusterError>;

    async fn get_deployment(&self, name: &str) -> Result<Deployment, ClusterError>;

    async fn get_deployment_config(&self, name: &str) -> Result<DeploymentConfig, ClusterError>;
}
