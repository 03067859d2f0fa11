//! Kubernetes error types
//!
//! Every variant carries enough context (operation, object kind and name) for an
//! operator to inspect or clean up the cluster by hand. Nothing here is retried.

use thiserror::Error;

/// Kubernetes-specific errors
#[derive(Debug, Error)]
pub enum K8sError {
    /// Dataset URL could not be parsed
    #[error("Malformed dataset URL '{url}': {reason}")]
    MalformedUrl { url: String, reason: String },

    /// Dataset URL scheme has no storage driver
    #[error("Unsupported URL scheme '{scheme}' in dataset URL '{url}'")]
    UnsupportedScheme { scheme: String, url: String },

    /// A required label is absent from a managed object
    #[error("Missing label '{label}' on {object}")]
    MissingLabel { label: &'static str, object: String },

    /// A label is present but its value cannot be decoded
    #[error("Invalid value '{value}' for label '{label}' on {object}")]
    InvalidLabel {
        label: &'static str,
        value: String,
        object: String,
    },

    /// Labels were written by a schema this version does not understand
    #[error("Unsupported label schema version '{version}' on {object}")]
    UnsupportedLabelSchema { version: String, object: String },

    /// Kubernetes resource not found
    #[error("Resource not found: {kind}/{name} ({scope})")]
    ResourceNotFound {
        kind: &'static str,
        name: String,
        scope: String,
    },

    /// A control-plane call failed
    #[error("Kubernetes API error during {operation} {kind}/{name}: {source}")]
    Backend {
        operation: &'static str,
        kind: &'static str,
        name: String,
        #[source]
        source: kube::Error,
    },

    /// The volume was created but its claim was not; the volume is left in place
    #[error("Volume {volume_name} was created but claim {claim_name} failed: {source}")]
    ClaimCreateFailed {
        volume_name: String,
        claim_name: String,
        #[source]
        source: Box<K8sError>,
    },

    /// The claim delete failed; the volume delete was attempted anyway
    #[error(
        "Deleting mount {volume_name} did not complete: claim delete failed ({claim_error}); {}",
        volume_outcome(.volume_error)
    )]
    DeleteIncomplete {
        volume_name: String,
        #[source]
        claim_error: Box<K8sError>,
        volume_error: Option<Box<K8sError>>,
    },

    /// Invalid kubeconfig
    #[error("Invalid kubeconfig: {0}")]
    InvalidKubeconfig(String),
}

fn volume_outcome(volume_error: &Option<Box<K8sError>>) -> String {
    match volume_error {
        None => "volume was deleted".to_string(),
        Some(e) => format!("volume delete also failed ({})", e),
    }
}

impl K8sError {
    /// Wrap a control-plane failure with the call it came from
    pub fn backend(
        operation: &'static str,
        kind: &'static str,
        name: impl Into<String>,
        source: kube::Error,
    ) -> Self {
        K8sError::Backend {
            operation,
            kind,
            name: name.into(),
            source,
        }
    }

    /// A cluster-scoped object is missing
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        K8sError::ResourceNotFound {
            kind,
            name: name.into(),
            scope: "cluster-scoped".to_string(),
        }
    }

    /// A namespaced object is missing
    pub fn not_found_in(kind: &'static str, name: impl Into<String>, namespace: &str) -> Self {
        K8sError::ResourceNotFound {
            kind,
            name: name.into(),
            scope: format!("namespace {}", namespace),
        }
    }

    /// True if the error means the object is not on the cluster
    pub fn is_not_found(&self) -> bool {
        match self {
            K8sError::ResourceNotFound { .. } => true,
            K8sError::Backend { source, .. } => is_api_not_found(source),
            _ => false,
        }
    }

    /// True if the dataset itself is unusable (fixing it requires a catalog change)
    pub fn is_dataset_error(&self) -> bool {
        matches!(
            self,
            K8sError::MalformedUrl { .. } | K8sError::UnsupportedScheme { .. }
        )
    }
}

/// True if a kube error is an API server 404
pub fn is_api_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 404)
}

/// Result type alias for Kubernetes operations
pub type K8sResult<T> = std::result::Result<T, K8sError>;
