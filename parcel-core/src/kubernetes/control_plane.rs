//! The cluster operations the volume manager depends on
//!
//! Volumes and StorageClasses are cluster-scoped; claims are namespaced. Each
//! call is atomic on the API server, sequences of calls are not.

use super::client::K8sClient;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim};
use k8s_openapi::api::storage::v1::StorageClass;
use kube::api::{DeleteParams, ListParams, PostParams};

#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn list_storage_classes(&self) -> kube::Result<Vec<StorageClass>>;

    async fn create_storage_class(&self, storage_class: &StorageClass)
        -> kube::Result<StorageClass>;

    async fn list_volumes(&self) -> kube::Result<Vec<PersistentVolume>>;

    async fn get_volume(&self, name: &str) -> kube::Result<PersistentVolume>;

    async fn create_volume(&self, volume: &PersistentVolume) -> kube::Result<PersistentVolume>;

    async fn delete_volume(&self, name: &str) -> kube::Result<()>;

    async fn list_claims(&self, namespace: &str) -> kube::Result<Vec<PersistentVolumeClaim>>;

    async fn get_claim(&self, namespace: &str, name: &str)
        -> kube::Result<PersistentVolumeClaim>;

    async fn create_claim(
        &self,
        namespace: &str,
        claim: &PersistentVolumeClaim,
    ) -> kube::Result<PersistentVolumeClaim>;

    async fn delete_claim(&self, namespace: &str, name: &str) -> kube::Result<()>;
}

#[async_trait]
impl ControlPlane for K8sClient {
    async fn list_storage_classes(&self) -> kube::Result<Vec<StorageClass>> {
        Ok(self.storage_classes().list(&ListParams::default()).await?.items)
    }

    async fn create_storage_class(
        &self,
        storage_class: &StorageClass,
    ) -> kube::Result<StorageClass> {
        self.storage_classes()
            .create(&PostParams::default(), storage_class)
            .await
    }

    async fn list_volumes(&self) -> kube::Result<Vec<PersistentVolume>> {
        Ok(self.volumes().list(&ListParams::default()).await?.items)
    }

    async fn get_volume(&self, name: &str) -> kube::Result<PersistentVolume> {
        self.volumes().get(name).await
    }

    async fn create_volume(&self, volume: &PersistentVolume) -> kube::Result<PersistentVolume> {
        self.volumes().create(&PostParams::default(), volume).await
    }

    // Deletion is accepted once the API server returns; finalizers may still
    // hold the object for a while
    async fn delete_volume(&self, name: &str) -> kube::Result<()> {
        self.volumes()
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
    }

    async fn list_claims(&self, namespace: &str) -> kube::Result<Vec<PersistentVolumeClaim>> {
        Ok(self.claims(namespace).list(&ListParams::default()).await?.items)
    }

    async fn get_claim(
        &self,
        namespace: &str,
        name: &str,
    ) -> kube::Result<PersistentVolumeClaim> {
        self.claims(namespace).get(name).await
    }

    async fn create_claim(
        &self,
        namespace: &str,
        claim: &PersistentVolumeClaim,
    ) -> kube::Result<PersistentVolumeClaim> {
        self.claims(namespace)
            .create(&PostParams::default(), claim)
            .await
    }

    async fn delete_claim(&self, namespace: &str, name: &str) -> kube::Result<()> {
        self.claims(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
    }
}
