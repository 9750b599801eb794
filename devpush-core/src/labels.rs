//! Label and annotation keys.
//!
//! Cluster objects carry the `app.kubernetes.io/*` keys; local container
//! runtimes use the short keys because the runtime has no namespace concept.

/// Cluster label holding the component name.
pub const COMPONENT_LABEL: &str = "app.kubernetes.io/instance";

/// Cluster label holding the component type (e.g. `nodejs`).
pub const COMPONENT_TYPE_LABEL: &str = "app.kubernetes.io/name";

/// Cluster label holding the owning application.
pub const APPLICATION_LABEL: &str = "app.kubernetes.io/part-of";

/// Annotation holding the [`SourceType`](crate::types::SourceType) of a component.
pub const SOURCE_TYPE_ANNOTATION: &str = "app.kubernetes.io/component-source-type";

/// Annotation holding the repository URL of a `git` sourced component.
pub const SOURCE_URL_ANNOTATION: &str = "app.openshift.io/vcs-uri";

/// Runtime label: component name.
pub const RUNTIME_COMPONENT_LABEL: &str = "component";

/// Runtime label: devfile container alias.
pub const RUNTIME_ALIAS_LABEL: &str = "alias";

/// Runtime label: volume purpose (`projects`, `supervisord`).
pub const RUNTIME_TYPE_LABEL: &str = "type";

/// Runtime label: well-known object name.
pub const RUNTIME_NAME_LABEL: &str = "name";

/// Runtime label: devfile volume name.
pub const RUNTIME_STORAGE_LABEL: &str = "storage-name";
