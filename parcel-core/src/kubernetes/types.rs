//! Mount types returned by the volume manager

use super::builders::{ATTR_CLIENT, ATTR_URL};
use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim};
use parcel_common::Dataset;
use serde::{Deserialize, Serialize};

/// A dataset exposed through a volume and its claim
///
/// Derived on every call from the cluster; never stored as its own object.
#[derive(Debug, Clone)]
pub struct DatasetMount {
    pub dataset: Dataset,
    pub volume: PersistentVolume,
    pub claim: PersistentVolumeClaim,
}

impl DatasetMount {
    pub fn volume_name(&self) -> &str {
        self.volume.metadata.name.as_deref().unwrap_or_default()
    }

    pub fn claim_name(&self) -> &str {
        self.claim.metadata.name.as_deref().unwrap_or_default()
    }

    /// Flatten into a serializable summary
    pub fn info(&self) -> MountInfo {
        let pv_spec = self.volume.spec.as_ref();
        let csi = pv_spec.and_then(|s| s.csi.as_ref());
        let attribute = |key: &str| {
            csi.and_then(|c| c.volume_attributes.as_ref())
                .and_then(|attrs| attrs.get(key).cloned())
        };

        let capacity = pv_spec
            .and_then(|s| s.capacity.as_ref())
            .and_then(|c| c.get("storage").map(|q| q.0.clone()));

        MountInfo {
            dataset_id: self.dataset.id,
            dataset_name: self.dataset.name.clone(),
            dataset_url: attribute(ATTR_URL).unwrap_or_else(|| self.dataset.url.clone()),
            volume_name: self.volume_name().to_string(),
            claim_name: self.claim_name().to_string(),
            namespace: self.claim.metadata.namespace.clone().unwrap_or_default(),
            driver: attribute(ATTR_CLIENT),
            volume_status: self
                .volume
                .status
                .as_ref()
                .and_then(|s| s.phase.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            claim_status: self
                .claim
                .status
                .as_ref()
                .and_then(|s| s.phase.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            capacity,
            created_at: self
                .volume
                .metadata
                .creation_timestamp
                .as_ref()
                .map(|t| t.0.to_rfc3339()),
        }
    }
}

/// Summary of a dataset mount for display
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MountInfo {
    pub dataset_id: i64,
    pub dataset_name: String,
    pub dataset_url: String,
    pub volume_name: String,
    pub claim_name: String,
    pub namespace: String,
    pub driver: Option<String>,
    pub volume_status: String,
    pub claim_status: String,
    pub capacity: Option<String>,
    pub created_at: Option<String>,
}
