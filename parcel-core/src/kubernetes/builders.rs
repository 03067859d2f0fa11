//! StorageClass, PersistentVolume and PersistentVolumeClaim specifications
//!
//! Pure constructors; nothing here talks to the cluster.

use super::error::K8sResult;
use super::labels::{claim_name_for, encode_labels, volume_handle_for};
use super::scheme::resolve_driver;
use k8s_openapi::api::core::v1::{
    CSIPersistentVolumeSource, PersistentVolume, PersistentVolumeClaim,
    PersistentVolumeClaimSpec, PersistentVolumeSpec, VolumeResourceRequirements,
};
use k8s_openapi::api::storage::v1::StorageClass;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use parcel_common::Dataset;
use std::collections::BTreeMap;

/// CSI driver that provisions parcel volumes
pub const CSI_DRIVER_NAME: &str = "parcel.csi.iychoi";

/// Name of the managed StorageClass
pub const STORAGE_CLASS_NAME: &str = "parcel-sc";

/// Capacity requested for every volume
pub const DEFAULT_STORAGE_CAPACITY: &str = "5Gi";

pub const ACCESS_MODE: &str = "ReadWriteMany";
pub const RECLAIM_POLICY: &str = "Retain";
pub const VOLUME_MODE: &str = "Filesystem";

/// Volume attribute keys read by the CSI driver
pub const ATTR_CLIENT: &str = "client";
pub const ATTR_URL: &str = "url";
pub const ATTR_USER: &str = "user";

const ANONYMOUS_USER: &str = "anonymous";

fn storage_resources() -> BTreeMap<String, Quantity> {
    BTreeMap::from([(
        "storage".to_string(),
        Quantity(DEFAULT_STORAGE_CAPACITY.to_string()),
    )])
}

/// The cluster-wide StorageClass for the parcel CSI driver
pub fn build_storage_class() -> StorageClass {
    StorageClass {
        metadata: ObjectMeta {
            name: Some(STORAGE_CLASS_NAME.to_string()),
            ..Default::default()
        },
        provisioner: CSI_DRIVER_NAME.to_string(),
        ..Default::default()
    }
}

/// PersistentVolume exposing a dataset through the CSI driver
///
/// Reclaim policy is `Retain`: removing the claim never removes the volume
/// record. Fails if the dataset URL has no supported driver.
pub fn build_volume(dataset: &Dataset, volume_name: &str) -> K8sResult<PersistentVolume> {
    let driver = resolve_driver(&dataset.url)?;

    let attributes = BTreeMap::from([
        (ATTR_CLIENT.to_string(), driver.as_str().to_string()),
        (ATTR_URL.to_string(), dataset.url.clone()),
        (ATTR_USER.to_string(), ANONYMOUS_USER.to_string()),
    ]);

    Ok(PersistentVolume {
        metadata: ObjectMeta {
            name: Some(volume_name.to_string()),
            labels: Some(encode_labels(dataset, volume_name)),
            ..Default::default()
        },
        spec: Some(PersistentVolumeSpec {
            capacity: Some(storage_resources()),
            volume_mode: Some(VOLUME_MODE.to_string()),
            access_modes: Some(vec![ACCESS_MODE.to_string()]),
            persistent_volume_reclaim_policy: Some(RECLAIM_POLICY.to_string()),
            storage_class_name: Some(STORAGE_CLASS_NAME.to_string()),
            csi: Some(CSIPersistentVolumeSource {
                driver: CSI_DRIVER_NAME.to_string(),
                volume_handle: volume_handle_for(volume_name),
                volume_attributes: Some(attributes),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// PersistentVolumeClaim bound to exactly one volume
///
/// The selector matches the claim's own label set, which is identical to the
/// volume's, so binding never falls back to capacity matching.
pub fn build_claim(dataset: &Dataset, volume_name: &str) -> PersistentVolumeClaim {
    let labels = encode_labels(dataset, volume_name);

    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(claim_name_for(volume_name)),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec![ACCESS_MODE.to_string()]),
            storage_class_name: Some(STORAGE_CLASS_NAME.to_string()),
            selector: Some(LabelSelector {
                match_labels: Some(labels),
                match_expressions: None,
            }),
            resources: Some(VolumeResourceRequirements {
                requests: Some(storage_resources()),
                limits: None,
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubernetes::error::K8sError;
    use crate::kubernetes::scheme::StorageDriver;

    fn dataset(url: &str) -> Dataset {
        Dataset {
            id: 42,
            name: "Plant Genomes!".to_string(),
            url: url.to_string(),
            description: "Genomes".to_string(),
        }
    }

    fn attributes(pv: &PersistentVolume) -> BTreeMap<String, String> {
        pv.spec
            .as_ref()
            .and_then(|s| s.csi.as_ref())
            .and_then(|csi| csi.volume_attributes.clone())
            .unwrap_or_default()
    }

    #[test]
    fn test_storage_class() {
        let sc = build_storage_class();
        assert_eq!(sc.metadata.name.as_deref(), Some(STORAGE_CLASS_NAME));
        assert_eq!(sc.provisioner, CSI_DRIVER_NAME);
        assert!(sc.parameters.is_none());
    }

    #[test]
    fn test_volume_attributes_follow_dataset() {
        for url in ["irods://host/path", "https://host/webdav/data"] {
            let ds = dataset(url);
            let pv = build_volume(&ds, "parcel-pv-PlantGenomes-abc").unwrap();
            let attrs = attributes(&pv);

            assert_eq!(attrs.get(ATTR_URL).map(String::as_str), Some(url));
            assert_eq!(
                attrs.get(ATTR_CLIENT).map(String::as_str),
                Some(resolve_driver(url).unwrap().as_str())
            );
            assert_eq!(attrs.get(ATTR_USER).map(String::as_str), Some("anonymous"));
        }
    }

    #[test]
    fn test_irods_volume_uses_fuse_driver() {
        let pv = build_volume(&dataset("irods://host/path"), "parcel-pv-PlantGenomes-abc").unwrap();
        assert_eq!(
            attributes(&pv).get(ATTR_CLIENT).map(String::as_str),
            Some(StorageDriver::IrodsFuse.as_str())
        );
    }

    #[test]
    fn test_volume_spec() {
        let pv = build_volume(&dataset("irods://host/path"), "parcel-pv-x-1").unwrap();
        let spec = pv.spec.unwrap();

        assert_eq!(pv.metadata.name.as_deref(), Some("parcel-pv-x-1"));
        assert_eq!(
            spec.capacity.unwrap().get("storage"),
            Some(&Quantity("5Gi".to_string()))
        );
        assert_eq!(spec.access_modes, Some(vec!["ReadWriteMany".to_string()]));
        assert_eq!(spec.persistent_volume_reclaim_policy.as_deref(), Some("Retain"));
        assert_eq!(spec.storage_class_name.as_deref(), Some(STORAGE_CLASS_NAME));
        assert_eq!(spec.volume_mode.as_deref(), Some("Filesystem"));

        let csi = spec.csi.unwrap();
        assert_eq!(csi.driver, CSI_DRIVER_NAME);
        assert_eq!(csi.volume_handle, "parcel-pv-x-1-handle");
    }

    #[test]
    fn test_volume_rejects_unsupported_scheme() {
        assert!(matches!(
            build_volume(&dataset("ftp://host/x"), "parcel-pv-x-1"),
            Err(K8sError::UnsupportedScheme { .. })
        ));
    }

    #[test]
    fn test_claim_selector_matches_volume_labels() {
        let ds = dataset("irods://host/path");
        let pv = build_volume(&ds, "parcel-pv-x-1").unwrap();
        let pvc = build_claim(&ds, "parcel-pv-x-1");

        assert_eq!(pvc.metadata.name.as_deref(), Some("parcel-pv-x-1-claim"));
        assert_eq!(pvc.metadata.labels, pv.metadata.labels);

        let spec = pvc.spec.unwrap();
        assert_eq!(spec.selector.unwrap().match_labels, pv.metadata.labels);
        assert_eq!(spec.access_modes, Some(vec!["ReadWriteMany".to_string()]));
        assert_eq!(spec.storage_class_name.as_deref(), Some(STORAGE_CLASS_NAME));
        assert_eq!(
            spec.resources.unwrap().requests.unwrap().get("storage"),
            Some(&Quantity("5Gi".to_string()))
        );
    }
}
