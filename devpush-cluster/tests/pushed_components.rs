//! Pushed component lookup and URL resolution against an in-memory cluster.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rstest::rstest;

use devpush_cluster::{
    get_pushed_component, get_pushed_components,
    objects::{Deployment, DeploymentConfig, ObjectMeta},
    ClusterClient, ClusterError, Url, UrlKind, WorkloadView,
};
use devpush_core::labels;

struct FakeCluster {
    routes_supported: bool,
    dc_supported: bool,
    deployment_configs: Result<Vec<DeploymentConfig>, &'static str>,
    deployments: Vec<Deployment>,
    routes: Vec<Url>,
    ingresses: Mutex<Vec<Result<Vec<Url>, &'static str>>>,
    route_calls: AtomicUsize,
    ingress_calls: AtomicUsize,
    requested_dc: Mutex<Vec<String>>,
}

impl FakeCluster {
    fn base() -> Self {
        Self {
            routes_supported: false,
            dc_supported: false,
            deployment_configs: Ok(vec![]),
            deployments: vec![],
            routes: vec![],
            ingresses: Mutex::new(vec![]),
            route_calls: AtomicUsize::new(0),
            ingress_calls: AtomicUsize::new(0),
            requested_dc: Mutex::new(vec![]),
        }
    }
}

fn to_error(code: &str, name: &str) -> ClusterError {
    match code {
        "notfound" => ClusterError::NotFound {
            kind: "object",
            name: name.to_string(),
        },
        "forbidden" => ClusterError::Forbidden(name.to_string()),
        "unauthorized" => ClusterError::Unauthorized(name.to_string()),
        other => ClusterError::Backend(other.to_string()),
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn is_route_supported(&self) -> Result<bool, ClusterError> {
        Ok(self.routes_supported)
    }

    async fn is_deployment_config_supported(&self) -> Result<bool, ClusterError> {
        Ok(self.dc_supported)
    }

    async fn list_routes(&self, _component: &str, _app: &str) -> Result<Vec<Url>, ClusterError> {
        self.route_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.routes.clone())
    }

    async fn list_ingresses(&self, component: &str) -> Result<Vec<Url>, ClusterError> {
        self.ingress_calls.fetch_add(1, Ordering::SeqCst);
        let mut queue = self.ingresses.lock().unwrap();
        let next = if queue.len() > 1 {
            queue.remove(0)
        } else {
            queue.first().cloned().unwrap_or(Ok(vec![]))
        };
        next.map_err(|code| to_error(code, component))
    }

    async fn list_deployment_configs(
        &self,
        selector: &str,
    ) -> Result<Vec<DeploymentConfig>, ClusterError> {
        self.deployment_configs
            .clone()
            .map_err(|code| to_error(code, selector))
    }

    async fn list_deployments(&self, _selector: &str) -> Result<Vec<Deployment>, ClusterError> {
        Ok(self.deployments.clone())
    }

    async fn get_deployment(&self, name: &str) -> Result<Deployment, ClusterError> {
        self.deployments
            .iter()
            .find(|d| d.metadata.name == name)
            .cloned()
            .ok_or_else(|| to_error("notfound", name))
    }

    async fn get_deployment_config(&self, name: &str) -> Result<DeploymentConfig, ClusterError> {
        self.requested_dc.lock().unwrap().push(name.to_string());
        self.deployment_configs
            .clone()
            .map_err(|code| to_error(code, name))?
            .into_iter()
            .find(|dc| dc.metadata.name == name)
            .ok_or_else(|| to_error("notfound", name))
    }
}

fn deployment(name: &str, env_value: &str) -> Deployment {
    let mut d = Deployment {
        metadata: ObjectMeta {
            name: name.to_string(),
            ..ObjectMeta::default()
        },
        ..Deployment::default()
    };
    d.template.containers.push(devpush_cluster::objects::Container {
        env: vec![devpush_core::EnvVar::new("V", env_value)],
        ..Default::default()
    });
    d
}

fn deployment_config(component: &str, app: &str) -> DeploymentConfig {
    DeploymentConfig {
        metadata: ObjectMeta {
            name: format!("{component}-{app}"),
            labels: BTreeMap::from([(labels::COMPONENT_LABEL.to_string(), component.to_string())]),
            annotations: BTreeMap::new(),
        },
        ..DeploymentConfig::default()
    }
}

fn url(name: &str, kind: UrlKind) -> Url {
    Url {
        name: name.to_string(),
        host: format!("{name}.apps.example.com"),
        port: 8080,
        secure: false,
        kind,
    }
}

fn client(fake: FakeCluster) -> (Arc<FakeCluster>, Arc<dyn ClusterClient>) {
    let fake = Arc::new(fake);
    let dynamic: Arc<dyn ClusterClient> = fake.clone();
    (fake, dynamic)
}

// ---------------------------------------------------------------------------
// 1. Listing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn listing_uses_legacy_workloads_when_available() {
    let (_, c) = client(FakeCluster {
        deployment_configs: Ok(vec![deployment_config("front", "shop")]),
        ..FakeCluster::base()
    });
    let components = get_pushed_components(&c, "shop").await.expect("list");
    assert_eq!(components.len(), 1);
    assert_eq!(components["front"].application(), "shop");
}

#[rstest]
#[case::not_found("notfound")]
#[case::forbidden("forbidden")]
#[case::unauthorized("unauthorized")]
#[tokio::test]
async fn listing_falls_back_when_legacy_kind_unavailable(#[case] answer: &'static str) {
    let (_, c) = client(FakeCluster {
        deployment_configs: Err(answer),
        deployments: vec![deployment("front", "1"), deployment("back", "1")],
        ..FakeCluster::base()
    });
    let components = get_pushed_components(&c, "shop").await.expect("list");
    let mut names: Vec<_> = components.keys().cloned().collect();
    names.sort();
    assert_eq!(names, vec!["back", "front"]);
}

#[tokio::test]
async fn listing_surfaces_real_failures() {
    let (_, c) = client(FakeCluster {
        deployment_configs: Err("connection refused"),
        ..FakeCluster::base()
    });
    let err = get_pushed_components(&c, "shop").await.unwrap_err();
    assert!(matches!(err, ClusterError::Backend(_)), "got: {err}");
}

#[tokio::test]
async fn later_duplicates_overwrite_earlier_ones() {
    let (_, c) = client(FakeCluster {
        deployment_configs: Err("forbidden"),
        deployments: vec![deployment("front", "first"), deployment("front", "second")],
        ..FakeCluster::base()
    });
    let components = get_pushed_components(&c, "shop").await.expect("list");
    assert_eq!(components.len(), 1);
    assert_eq!(components["front"].env_vars()[0].value, "second");
}

// ---------------------------------------------------------------------------
// 2. Single lookup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn single_lookup_prefers_current_generation() {
    let (fake, c) = client(FakeCluster {
        dc_supported: true,
        deployments: vec![deployment("front", "1")],
        ..FakeCluster::base()
    });
    let found = get_pushed_component(&c, "front", "shop")
        .await
        .expect("get")
        .expect("present");
    assert_eq!(found.name(), "front");
    assert!(fake.requested_dc.lock().unwrap().is_empty());
}

#[tokio::test]
async fn single_lookup_falls_back_to_namespaced_legacy_name() {
    let (fake, c) = client(FakeCluster {
        dc_supported: true,
        deployment_configs: Ok(vec![deployment_config("front", "shop")]),
        ..FakeCluster::base()
    });
    let found = get_pushed_component(&c, "front", "shop")
        .await
        .expect("get")
        .expect("present");
    assert_eq!(found.name(), "front");
    assert_eq!(*fake.requested_dc.lock().unwrap(), vec!["front-shop".to_string()]);
}

#[tokio::test]
async fn single_lookup_returns_none_when_absent_everywhere() {
    let (_, c) = client(FakeCluster {
        dc_supported: true,
        ..FakeCluster::base()
    });
    assert!(get_pushed_component(&c, "front", "shop")
        .await
        .expect("get")
        .is_none());
}

#[tokio::test]
async fn single_lookup_skips_legacy_kind_when_unsupported() {
    let (fake, c) = client(FakeCluster {
        dc_supported: false,
        ..FakeCluster::base()
    });
    assert!(get_pushed_component(&c, "front", "shop")
        .await
        .expect("get")
        .is_none());
    assert!(fake.requested_dc.lock().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// 3. URLs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn urls_merge_routes_and_ingresses_and_are_memoized() {
    let (fake, c) = client(FakeCluster {
        routes_supported: true,
        deployment_configs: Err("notfound"),
        deployments: vec![deployment("front", "1")],
        routes: vec![url("route", UrlKind::Route)],
        ingresses: Mutex::new(vec![Ok(vec![url("ingress", UrlKind::Ingress)])]),
        ..FakeCluster::base()
    });
    let components = get_pushed_components(&c, "shop").await.expect("list");
    let front = &components["front"];

    let first = front.urls().await.expect("urls").to_vec();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].kind, UrlKind::Route);
    assert_eq!(first[1].kind, UrlKind::Ingress);

    let second = front.urls().await.expect("urls").to_vec();
    assert_eq!(first, second);
    assert_eq!(fake.route_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fake.ingress_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn routes_skipped_when_unsupported() {
    let (fake, c) = client(FakeCluster {
        deployments: vec![deployment("front", "1")],
        routes: vec![url("route", UrlKind::Route)],
        ingresses: Mutex::new(vec![Ok(vec![url("ingress", UrlKind::Ingress)])]),
        ..FakeCluster::base()
    });
    let front = get_pushed_component(&c, "front", "shop")
        .await
        .expect("get")
        .expect("present");
    let urls = front.urls().await.expect("urls");
    assert_eq!(urls.len(), 1);
    assert_eq!(fake.route_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn forbidden_ingress_reads_as_empty() {
    let (_, c) = client(FakeCluster {
        deployments: vec![deployment("front", "1")],
        ingresses: Mutex::new(vec![Err("forbidden")]),
        ..FakeCluster::base()
    });
    let front = get_pushed_component(&c, "front", "shop")
        .await
        .expect("get")
        .expect("present");
    assert!(front.urls().await.expect("urls").is_empty());
}

#[tokio::test]
async fn failed_resolution_is_not_cached() {
    let (fake, c) = client(FakeCluster {
        deployments: vec![deployment("front", "1")],
        ingresses: Mutex::new(vec![
            Err("timeout"),
            Ok(vec![url("ingress", UrlKind::Ingress)]),
        ]),
        ..FakeCluster::base()
    });
    let front = get_pushed_component(&c, "front", "shop")
        .await
        .expect("get")
        .expect("present");

    let err = front.urls().await.unwrap_err();
    assert!(matches!(err, ClusterError::Backend(_)), "got: {err}");

    let urls = front.urls().await.expect("retry");
    assert_eq!(urls.len(), 1);
    assert_eq!(fake.ingress_calls.load(Ordering::SeqCst), 2);
}
