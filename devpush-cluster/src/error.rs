//! Error types for devpush-cluster.

use thiserror::Error;

/// All errors that can arise from reading or mutating cluster workload objects.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("{kind} {name} not found")]
    NotFound { kind: &'static str, name: String },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Any other failure reported by the cluster client.
    #[error("cluster request failed: {0}")]
    Backend(String),

    #[error("{component} component doesn't provide a source type annotation")]
    NoSourceAnnotation { component: String },

    #[error("unsupported component source type {source_type}")]
    UnsupportedSourceType { source_type: String },

    #[error("{component} component doesn't provide a type label")]
    MissingTypeLabel { component: String },

    #[error("workload {name} must declare exactly one container, found {count}")]
    MultiContainerUnsupported { name: String, count: usize },

    #[error("unable to list components: {0}")]
    List(#[source] Box<ClusterError>),
}

impl ClusterError {
    /// NotFound, Forbidden and Unauthorized read as "nothing there" on read paths.
    pub fn is_ignorable(&self) -> bool {
        match self {
            ClusterError::NotFound { .. }
            | ClusterError::Forbidden(_)
            | ClusterError::Unauthorized(_) => true,
            ClusterError::List(inner) => inner.is_ignorable(),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClusterError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_class_is_ignorable() {
        let nf = ClusterError::NotFound {
            kind: "deployment",
            name: "front".to_string(),
        };
        assert!(nf.is_ignorable());
        assert!(ClusterError::Forbidden("rbac".into()).is_ignorable());
        assert!(ClusterError::Unauthorized("token".into()).is_ignorable());
        assert!(!ClusterError::Backend("timeout".into()).is_ignorable());
        assert!(ClusterError::List(Box::new(nf)).is_ignorable());
    }
}
