//! Kubernetes volume lifecycle for parcel
//!
//! Provisions, discovers and reclaims dataset mounts. The cluster is the only
//! store: a mount is a PersistentVolume and a PersistentVolumeClaim tied
//! together by labels, plus one shared StorageClass.
//!
//! Per volume, the state is derived from which objects exist:
//! `absent -> bound (volume + claim) -> volume-orphaned (claim deleted) -> absent`.
//! There is no update; a changed mount is deleted and recreated.

pub mod builders;
pub mod client;
pub mod control_plane;
pub mod error;
pub mod labels;
pub mod scheme;
pub mod types;

use builders::{build_claim, build_storage_class, build_volume, CSI_DRIVER_NAME, STORAGE_CLASS_NAME};
use client::K8sClient;
use control_plane::ControlPlane;
use error::{is_api_not_found, K8sError, K8sResult};
use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim};
use labels::{claim_name_for, claim_references_volume, decode_dataset, generate_volume_name};
use parcel_common::Dataset;
use std::path::Path;
use std::sync::Arc;
use types::DatasetMount;

/// Default namespace for claims
pub const VOLUME_NAMESPACE: &str = "default";

const KIND_STORAGE_CLASS: &str = "StorageClass";
const KIND_VOLUME: &str = "PersistentVolume";
const KIND_CLAIM: &str = "PersistentVolumeClaim";

/// Manages dataset mounts on a cluster
///
/// Holds no state besides the control-plane handle and the claim namespace.
/// Multi-object sequences are not atomic and are never rolled back; partial
/// outcomes come back as `ClaimCreateFailed` or `DeleteIncomplete`.
#[derive(Clone)]
pub struct VolumeManager {
    control_plane: Arc<dyn ControlPlane>,
    namespace: String,
}

impl VolumeManager {
    /// Create a manager over any control plane
    pub fn new(control_plane: Arc<dyn ControlPlane>, namespace: impl Into<String>) -> Self {
        Self {
            control_plane,
            namespace: namespace.into(),
        }
    }

    /// Connect to a cluster using a kubeconfig file, or the inferred
    /// environment when no path is given
    pub async fn connect(kubeconfig_path: Option<&Path>, namespace: &str) -> K8sResult<Self> {
        let client = match kubeconfig_path {
            Some(path) => K8sClient::from_kubeconfig_path(path, None).await?,
            None => K8sClient::infer().await?,
        };

        tracing::info!(
            "Connected to {} (claim namespace '{}')",
            client.api_server(),
            namespace
        );

        Ok(Self::new(Arc::new(client), namespace))
    }

    /// Namespace claims are created in
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Create the parcel StorageClass unless one with the same name exists
    ///
    /// Returns true if this call created it. Safe to call before every order.
    pub async fn ensure_storage_class(&self) -> K8sResult<bool> {
        let existing = self
            .control_plane
            .list_storage_classes()
            .await
            .map_err(|e| K8sError::backend("list", KIND_STORAGE_CLASS, "*", e))?;

        if existing
            .iter()
            .any(|sc| sc.metadata.name.as_deref() == Some(STORAGE_CLASS_NAME))
        {
            tracing::debug!("StorageClass {} already exists", STORAGE_CLASS_NAME);
            return Ok(false);
        }

        match self
            .control_plane
            .create_storage_class(&build_storage_class())
            .await
        {
            Ok(_) => {
                tracing::info!(
                    "Created StorageClass {} (provisioner {})",
                    STORAGE_CLASS_NAME,
                    CSI_DRIVER_NAME
                );
                Ok(true)
            }
            // Lost a race with another client creating the same class
            Err(kube::Error::Api(resp)) if resp.code == 409 => {
                tracing::debug!("StorageClass {} was created concurrently", STORAGE_CLASS_NAME);
                Ok(false)
            }
            Err(e) => Err(K8sError::backend(
                "create",
                KIND_STORAGE_CLASS,
                STORAGE_CLASS_NAME,
                e,
            )),
        }
    }

    /// Create a volume and its claim for a dataset
    ///
    /// Every call creates a new mount under a fresh name, even for a dataset
    /// that is already mounted. Both objects are built before any API call, so
    /// an unusable dataset URL leaves the cluster untouched. If the claim
    /// create fails the volume stays behind and `ClaimCreateFailed` names it.
    pub async fn create_volume_for(&self, dataset: &Dataset) -> K8sResult<DatasetMount> {
        let volume_name = generate_volume_name(dataset);
        let claim_name = claim_name_for(&volume_name);
        let volume = build_volume(dataset, &volume_name)?;
        let claim = build_claim(dataset, &volume_name);

        let volume = self
            .control_plane
            .create_volume(&volume)
            .await
            .map_err(|e| K8sError::backend("create", KIND_VOLUME, &volume_name, e))?;

        tracing::info!(
            dataset_id = dataset.id,
            volume = %volume_name,
            "Created persistent volume"
        );

        let claim = match self.control_plane.create_claim(&self.namespace, &claim).await {
            Ok(claim) => claim,
            Err(e) => {
                tracing::warn!(
                    volume = %volume_name,
                    claim = %claim_name,
                    "Claim creation failed; volume {} is left without a claim",
                    volume_name
                );
                return Err(K8sError::ClaimCreateFailed {
                    volume_name,
                    source: Box::new(K8sError::backend("create", KIND_CLAIM, &claim_name, e)),
                    claim_name,
                });
            }
        };

        tracing::info!(
            dataset_id = dataset.id,
            claim = %claim_name,
            namespace = %self.namespace,
            "Created persistent volume claim"
        );

        Ok(DatasetMount {
            dataset: dataset.clone(),
            volume,
            claim,
        })
    }

    /// List every mount visible on the cluster
    ///
    /// Volumes without the parcel prefix, with unreadable labels, or without a
    /// claim in this namespace are left out rather than failing the listing.
    pub async fn list_mounts(&self) -> K8sResult<Vec<DatasetMount>> {
        let volumes = self
            .control_plane
            .list_volumes()
            .await
            .map_err(|e| K8sError::backend("list", KIND_VOLUME, "*", e))?;

        let claims = self
            .control_plane
            .list_claims(&self.namespace)
            .await
            .map_err(|e| K8sError::backend("list", KIND_CLAIM, "*", e))?;

        let mut mounts = Vec::new();

        for volume in volumes.into_iter().filter(labels::recognize_managed) {
            let volume_name = volume.metadata.name.clone().unwrap_or_default();

            let dataset = match rehydrate_dataset(&volume) {
                Ok(dataset) => dataset,
                Err(e) => {
                    tracing::debug!("Skipping volume {}: {}", volume_name, e);
                    continue;
                }
            };

            match claims
                .iter()
                .find(|claim| claim_references_volume(claim, &volume_name))
            {
                Some(claim) => mounts.push(DatasetMount {
                    dataset,
                    volume,
                    claim: claim.clone(),
                }),
                None => {
                    tracing::debug!(
                        "Skipping volume {}: no claim in namespace {}",
                        volume_name,
                        self.namespace
                    );
                }
            }
        }

        Ok(mounts)
    }

    /// Mounts of one dataset
    pub async fn find_mounts_for(&self, dataset_id: i64) -> K8sResult<Vec<DatasetMount>> {
        let mounts = self.list_mounts().await?;

        Ok(mounts
            .into_iter()
            .filter(|mount| mount.dataset.id == dataset_id)
            .collect())
    }

    /// Look up one mount by volume name
    pub async fn get_mount(&self, volume_name: &str) -> K8sResult<DatasetMount> {
        let volume = self.get_volume(volume_name).await?;

        if volume.metadata.name.as_deref() != Some(volume_name) {
            return Err(K8sError::not_found(KIND_VOLUME, volume_name));
        }

        let claim_name = claim_name_for(volume_name);
        let claim = self.get_claim(&claim_name).await?;

        if !claim_references_volume(&claim, volume_name) {
            return Err(K8sError::not_found_in(KIND_CLAIM, claim_name, &self.namespace));
        }

        let dataset = rehydrate_dataset(&volume)?;

        Ok(DatasetMount {
            dataset,
            volume,
            claim,
        })
    }

    /// Delete a mount: the claim first, then the volume
    ///
    /// The volume delete is attempted even when the claim delete fails; in
    /// that case `DeleteIncomplete` reports both outcomes. A claim that is
    /// already gone counts as deleted. Names without the parcel prefix are
    /// reported as not found and nothing is deleted.
    pub async fn delete_mount(&self, volume_name: &str) -> K8sResult<()> {
        if !labels::is_managed_name(volume_name) {
            return Err(K8sError::not_found(KIND_VOLUME, volume_name));
        }

        let claim_name = claim_name_for(volume_name);

        let claim_result = match self
            .control_plane
            .delete_claim(&self.namespace, &claim_name)
            .await
        {
            Ok(()) => {
                tracing::info!(claim = %claim_name, namespace = %self.namespace, "Deleted persistent volume claim");
                Ok(())
            }
            Err(e) if is_api_not_found(&e) => {
                tracing::warn!("Claim {} was already gone", claim_name);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Failed to delete claim {}: {}", claim_name, e);
                Err(K8sError::backend("delete", KIND_CLAIM, &claim_name, e))
            }
        };

        let volume_result = match self.control_plane.delete_volume(volume_name).await {
            Ok(()) => {
                tracing::info!(volume = %volume_name, "Deleted persistent volume");
                Ok(())
            }
            Err(e) if is_api_not_found(&e) => Err(K8sError::not_found(KIND_VOLUME, volume_name)),
            Err(e) => Err(K8sError::backend("delete", KIND_VOLUME, volume_name, e)),
        };

        match (claim_result, volume_result) {
            (Ok(()), volume_result) => volume_result,
            (Err(claim_error), volume_result) => Err(K8sError::DeleteIncomplete {
                volume_name: volume_name.to_string(),
                claim_error: Box::new(claim_error),
                volume_error: volume_result.err().map(Box::new),
            }),
        }
    }

    async fn get_volume(&self, name: &str) -> K8sResult<PersistentVolume> {
        self.control_plane.get_volume(name).await.map_err(|e| {
            if is_api_not_found(&e) {
                K8sError::not_found(KIND_VOLUME, name)
            } else {
                K8sError::backend("get", KIND_VOLUME, name, e)
            }
        })
    }

    async fn get_claim(&self, name: &str) -> K8sResult<PersistentVolumeClaim> {
        self.control_plane
            .get_claim(&self.namespace, name)
            .await
            .map_err(|e| {
                if is_api_not_found(&e) {
                    K8sError::not_found_in(KIND_CLAIM, name, &self.namespace)
                } else {
                    K8sError::backend("get", KIND_CLAIM, name, e)
                }
            })
    }
}

impl std::fmt::Debug for VolumeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumeManager")
            .field("namespace", &self.namespace)
            .finish()
    }
}

/// Dataset identity from a volume's labels, with the URL from its CSI attributes
fn rehydrate_dataset(volume: &PersistentVolume) -> K8sResult<Dataset> {
    let name = volume.metadata.name.as_deref().unwrap_or_default();
    let empty = Default::default();
    let labels = volume.metadata.labels.as_ref().unwrap_or(&empty);

    let mut dataset = decode_dataset(name, labels)?;

    if let Some(url) = volume
        .spec
        .as_ref()
        .and_then(|s| s.csi.as_ref())
        .and_then(|csi| csi.volume_attributes.as_ref())
        .and_then(|attrs| attrs.get(builders::ATTR_URL))
    {
        dataset.url = url.clone();
    }

    Ok(dataset)
}
