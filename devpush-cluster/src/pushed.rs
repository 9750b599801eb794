//! Pushed components: one read-only view over both workload generations.
//!
//! | Workload             | Name from                  | Env / secrets from      |
//! |----------------------|----------------------------|-------------------------|
//! | `DeploymentConfig`   | component label            | first container only    |
//! | `Deployment`         | object name                | every container         |
//!
//! Projections are pure. Only [`PushedComponent::urls`] talks to the cluster,
//! and its result is memoized for the lifetime of the view.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use tokio::sync::OnceCell;

use devpush_core::{labels, EnvVar, SourceType};

use crate::client::{ClusterClient, Url};
use crate::error::ClusterError;
use crate::objects::{Container, Deployment, DeploymentConfig};

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Where a pushed component's source came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentSource {
    pub source_type: SourceType,
    /// Repository URL; only set for [`SourceType::Git`].
    pub location: Option<String>,
}

// ---------------------------------------------------------------------------
// WorkloadView
// ---------------------------------------------------------------------------

/// Read-only accessors shared by every workload generation.
pub trait WorkloadView: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;
    fn labels(&self) -> &BTreeMap<String, String>;
    fn annotations(&self) -> &BTreeMap<String, String>;
    fn env_vars(&self) -> Vec<EnvVar>;
    fn linked_secret_names(&self) -> Vec<String>;

    fn component_type(&self) -> Result<String, ClusterError> {
        self.labels()
            .get(labels::COMPONENT_TYPE_LABEL)
            .cloned()
            .ok_or_else(|| ClusterError::MissingTypeLabel {
                component: self.name().to_string(),
            })
    }

    fn source(&self) -> Result<ComponentSource, ClusterError> {
        let annotations = self.annotations();
        let raw = annotations
            .get(labels::SOURCE_TYPE_ANNOTATION)
            .ok_or_else(|| ClusterError::NoSourceAnnotation {
                component: self.name().to_string(),
            })?;
        let source_type: SourceType =
            raw.parse()
                .map_err(|_| ClusterError::UnsupportedSourceType {
                    source_type: raw.clone(),
                })?;
        let location = match source_type {
            SourceType::Git => annotations.get(labels::SOURCE_URL_ANNOTATION).cloned(),
            SourceType::Local | SourceType::Binary => None,
        };
        tracing::debug!(
            component = %self.name(),
            source_type = %source_type,
            location = ?location,
            "resolved component source",
        );
        Ok(ComponentSource {
            source_type,
            location,
        })
    }
}

fn secret_refs<'a>(containers: impl Iterator<Item = &'a Container>) -> Vec<String> {
    containers
        .flat_map(|c| c.env_from.iter())
        .filter_map(|e| e.secret_ref.clone())
        .collect()
}

impl WorkloadView for DeploymentConfig {
    fn name(&self) -> &str {
        self.metadata
            .labels
            .get(labels::COMPONENT_LABEL)
            .map(String::as_str)
            .unwrap_or_default()
    }

    fn labels(&self) -> &BTreeMap<String, String> {
        &self.metadata.labels
    }

    fn annotations(&self) -> &BTreeMap<String, String> {
        &self.metadata.annotations
    }

    fn env_vars(&self) -> Vec<EnvVar> {
        self.template
            .containers
            .first()
            .map(|c| c.env.clone())
            .unwrap_or_default()
    }

    fn linked_secret_names(&self) -> Vec<String> {
        secret_refs(self.template.containers.iter().take(1))
    }
}

impl WorkloadView for Deployment {
    fn name(&self) -> &str {
        &self.metadata.name
    }

    fn labels(&self) -> &BTreeMap<String, String> {
        &self.metadata.labels
    }

    fn annotations(&self) -> &BTreeMap<String, String> {
        &self.metadata.annotations
    }

    fn env_vars(&self) -> Vec<EnvVar> {
        self.template
            .containers
            .iter()
            .flat_map(|c| c.env.iter().cloned())
            .collect()
    }

    fn linked_secret_names(&self) -> Vec<String> {
        secret_refs(self.template.containers.iter())
    }
}

// ---------------------------------------------------------------------------
// PushedComponent
// ---------------------------------------------------------------------------

/// The cluster-side representation of a component.
pub struct PushedComponent {
    application: String,
    workload: Box<dyn WorkloadView>,
    client: Arc<dyn ClusterClient>,
    urls: OnceCell<Vec<Url>>,
}

impl fmt::Debug for PushedComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushedComponent")
            .field("application", &self.application)
            .field("workload", &self.workload)
            .field("urls", &self.urls.get())
            .finish()
    }
}

impl PushedComponent {
    pub fn new(
        application: impl Into<String>,
        workload: Box<dyn WorkloadView>,
        client: Arc<dyn ClusterClient>,
    ) -> Self {
        Self {
            application: application.into(),
            workload,
            client,
            urls: OnceCell::new(),
        }
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    /// Route and ingress endpoints, resolved on first call.
    ///
    /// Routes are only queried when the cluster supports them. NotFound-class
    /// answers count as "no endpoints"; anything else is returned and nothing
    /// is cached, so the next call retries.
    pub async fn urls(&self) -> Result<&[Url], ClusterError> {
        self.urls
            .get_or_try_init(|| self.fetch_urls())
            .await
            .map(Vec::as_slice)
    }

    async fn fetch_urls(&self) -> Result<Vec<Url>, ClusterError> {
        let name = self.name();
        let mut urls = Vec::new();

        if let Ok(true) = self.client.is_route_supported().await {
            match self.client.list_routes(name, &self.application).await {
                Ok(routes) => urls.extend(routes),
                Err(err) if err.is_ignorable() => {
                    tracing::debug!(component = %name, error = %err, "ignoring route lookup failure");
                }
                Err(err) => return Err(err),
            }
        }

        match self.client.list_ingresses(name).await {
            Ok(ingresses) => urls.extend(ingresses),
            Err(err) if err.is_ignorable() => {
                tracing::debug!(component = %name, error = %err, "ignoring ingress lookup failure");
            }
            Err(err) => return Err(err),
        }

        Ok(urls)
    }
}

impl WorkloadView for PushedComponent {
    fn name(&self) -> &str {
        self.workload.name()
    }

    fn labels(&self) -> &BTreeMap<String, String> {
        self.workload.labels()
    }

    fn annotations(&self) -> &BTreeMap<String, String> {
        self.workload.annotations()
    }

    fn env_vars(&self) -> Vec<EnvVar> {
        self.workload.env_vars()
    }

    fn linked_secret_names(&self) -> Vec<String> {
        self.workload.linked_secret_names()
    }

    fn component_type(&self) -> Result<String, ClusterError> {
        self.workload.component_type()
    }

    fn source(&self) -> Result<ComponentSource, ClusterError> {
        self.workload.source()
    }
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

fn application_selector(application: &str) -> String {
    format!("{}={}", labels::APPLICATION_LABEL, application)
}

/// Legacy workloads are named `<component>-<application>`.
pub fn namespaced_name(component: &str, application: &str) -> String {
    format!("{component}-{application}")
}

/// Every pushed component of `application`, keyed by component name.
///
/// Legacy workloads are listed first. If the cluster answers that listing
/// with a NotFound-class error, current workloads are listed instead. Later
/// entries overwrite earlier ones under the same name.
pub async fn get_pushed_components(
    client: &Arc<dyn ClusterClient>,
    application: &str,
) -> Result<HashMap<String, PushedComponent>, ClusterError> {
    let selector = application_selector(application);

    let workloads: Vec<Box<dyn WorkloadView>> =
        match client.list_deployment_configs(&selector).await {
            Ok(configs) => configs
                .into_iter()
                .map(|dc| Box::new(dc) as Box<dyn WorkloadView>)
                .collect(),
            Err(err) if err.is_ignorable() => {
                tracing::debug!(
                    application,
                    error = %err,
                    "legacy workloads unavailable, listing deployments",
                );
                client
                    .list_deployments(&selector)
                    .await
                    .map_err(|e| ClusterError::List(Box::new(e)))?
                    .into_iter()
                    .map(|d| Box::new(d) as Box<dyn WorkloadView>)
                    .collect()
            }
            Err(err) => return Err(err),
        };

    let mut result = HashMap::with_capacity(workloads.len());
    for workload in workloads {
        let component = PushedComponent::new(application, workload, client.clone());
        result.insert(component.name().to_string(), component);
    }
    Ok(result)
}

/// One pushed component, or `None` if neither workload generation has it.
///
/// The current generation is looked up by component name first; on a
/// NotFound-class answer the legacy generation is tried under
/// [`namespaced_name`].
pub async fn get_pushed_component(
    client: &Arc<dyn ClusterClient>,
    component: &str,
    application: &str,
) -> Result<Option<PushedComponent>, ClusterError> {
    match client.get_deployment(component).await {
        Ok(deployment) => {
            return Ok(Some(PushedComponent::new(
                application,
                Box::new(deployment),
                client.clone(),
            )))
        }
        Err(err) if err.is_ignorable() => {
            tracing::debug!(component, error = %err, "no deployment, trying legacy workload");
        }
        Err(err) => return Err(err),
    }

    if !client.is_deployment_config_supported().await? {
        return Ok(None);
    }

    match client
        .get_deployment_config(&namespaced_name(component, application))
        .await
    {
        Ok(dc) => Ok(Some(PushedComponent::new(
            application,
            Box::new(dc),
            client.clone(),
        ))),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
