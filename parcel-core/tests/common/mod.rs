//! Common test utilities and helpers

#![allow(dead_code)]

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim};
use k8s_openapi::api::storage::v1::StorageClass;
use kube::core::ErrorResponse;
use parcel_common::Dataset;
use parcel_core::kubernetes::control_plane::ControlPlane;
use parcel_core::VolumeManager;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

pub const TEST_NAMESPACE: &str = "parcel-test";

/// Control-plane calls, for failure injection and call-order assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    ListStorageClasses,
    CreateStorageClass,
    ListVolumes,
    GetVolume,
    CreateVolume,
    DeleteVolume,
    ListClaims,
    GetClaim,
    CreateClaim,
    DeleteClaim,
}

#[derive(Default)]
struct State {
    storage_classes: BTreeMap<String, StorageClass>,
    volumes: BTreeMap<String, PersistentVolume>,
    claims: BTreeMap<(String, String), PersistentVolumeClaim>,
    failures: HashMap<Call, u16>,
    calls: Vec<Call>,
}

/// In-memory control plane with per-object atomicity and injectable failures
#[derive(Default)]
pub struct FakeControlPlane {
    state: Mutex<State>,
}

pub fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: format!("fake control plane: {}", reason),
        reason: reason.to_string(),
        code,
    })
}

fn object_name(name: &Option<String>) -> String {
    name.clone().unwrap_or_default()
}

impl FakeControlPlane {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every later call of this kind fail with the given HTTP status
    pub fn fail(&self, call: Call, code: u16) {
        self.state.lock().unwrap().failures.insert(call, code);
    }

    pub fn recover(&self, call: Call) {
        self.state.lock().unwrap().failures.remove(&call);
    }

    /// Store a volume under a key that may differ from its own name
    pub fn insert_volume_as(&self, key: &str, volume: PersistentVolume) {
        self.state
            .lock()
            .unwrap()
            .volumes
            .insert(key.to_string(), volume);
    }

    pub fn insert_volume(&self, volume: PersistentVolume) {
        let key = object_name(&volume.metadata.name);
        self.insert_volume_as(&key, volume);
    }

    pub fn insert_claim(&self, namespace: &str, mut claim: PersistentVolumeClaim) {
        claim.metadata.namespace = Some(namespace.to_string());
        let key = (namespace.to_string(), object_name(&claim.metadata.name));
        self.state.lock().unwrap().claims.insert(key, claim);
    }

    pub fn volume_names(&self) -> Vec<String> {
        self.state.lock().unwrap().volumes.keys().cloned().collect()
    }

    pub fn claim_names(&self, namespace: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .claims
            .keys()
            .filter(|(ns, _)| ns == namespace)
            .map(|(_, name)| name.clone())
            .collect()
    }

    pub fn storage_class_count(&self) -> usize {
        self.state.lock().unwrap().storage_classes.len()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }

    fn record(&self, call: Call) -> kube::Result<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);

        if let Some(code) = state.failures.get(&call).copied() {
            return Err(api_error(code, "injected failure"));
        }
        Ok(state)
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn list_storage_classes(&self) -> kube::Result<Vec<StorageClass>> {
        let state = self.record(Call::ListStorageClasses)?;
        Ok(state.storage_classes.values().cloned().collect())
    }

    async fn create_storage_class(
        &self,
        storage_class: &StorageClass,
    ) -> kube::Result<StorageClass> {
        let mut state = self.record(Call::CreateStorageClass)?;
        let name = object_name(&storage_class.metadata.name);

        if state.storage_classes.contains_key(&name) {
            return Err(api_error(409, "AlreadyExists"));
        }
        state.storage_classes.insert(name, storage_class.clone());
        Ok(storage_class.clone())
    }

    async fn list_volumes(&self) -> kube::Result<Vec<PersistentVolume>> {
        let state = self.record(Call::ListVolumes)?;
        Ok(state.volumes.values().cloned().collect())
    }

    async fn get_volume(&self, name: &str) -> kube::Result<PersistentVolume> {
        let state = self.record(Call::GetVolume)?;
        state
            .volumes
            .get(name)
            .cloned()
            .ok_or_else(|| api_error(404, "NotFound"))
    }

    async fn create_volume(&self, volume: &PersistentVolume) -> kube::Result<PersistentVolume> {
        let mut state = self.record(Call::CreateVolume)?;
        let name = object_name(&volume.metadata.name);

        if state.volumes.contains_key(&name) {
            return Err(api_error(409, "AlreadyExists"));
        }
        state.volumes.insert(name, volume.clone());
        Ok(volume.clone())
    }

    async fn delete_volume(&self, name: &str) -> kube::Result<()> {
        let mut state = self.record(Call::DeleteVolume)?;
        state
            .volumes
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| api_error(404, "NotFound"))
    }

    async fn list_claims(&self, namespace: &str) -> kube::Result<Vec<PersistentVolumeClaim>> {
        let state = self.record(Call::ListClaims)?;
        Ok(state
            .claims
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|(_, claim)| claim.clone())
            .collect())
    }

    async fn get_claim(&self, namespace: &str, name: &str) -> kube::Result<PersistentVolumeClaim> {
        let state = self.record(Call::GetClaim)?;
        state
            .claims
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| api_error(404, "NotFound"))
    }

    async fn create_claim(
        &self,
        namespace: &str,
        claim: &PersistentVolumeClaim,
    ) -> kube::Result<PersistentVolumeClaim> {
        let mut state = self.record(Call::CreateClaim)?;
        let key = (namespace.to_string(), object_name(&claim.metadata.name));

        if state.claims.contains_key(&key) {
            return Err(api_error(409, "AlreadyExists"));
        }

        let mut created = claim.clone();
        created.metadata.namespace = Some(namespace.to_string());
        state.claims.insert(key, created.clone());
        Ok(created)
    }

    async fn delete_claim(&self, namespace: &str, name: &str) -> kube::Result<()> {
        let mut state = self.record(Call::DeleteClaim)?;
        state
            .claims
            .remove(&(namespace.to_string(), name.to_string()))
            .map(|_| ())
            .ok_or_else(|| api_error(404, "NotFound"))
    }
}

/// Volume manager over a fake control plane
pub fn manager(control_plane: &Arc<FakeControlPlane>) -> VolumeManager {
    VolumeManager::new(control_plane.clone(), TEST_NAMESPACE)
}

pub fn dataset(id: i64, name: &str, url: &str) -> Dataset {
    Dataset {
        id,
        name: name.to_string(),
        url: url.to_string(),
        description: format!("{} test dataset", name),
    }
}
