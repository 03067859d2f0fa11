//! Volume identity and label codec
//!
//! The labels written here are the only record of which volume belongs to which
//! dataset. Schema (version "1"):
//!
//! | key              | on volume | on claim | value                       |
//! |------------------|-----------|----------|-----------------------------|
//! | `volume-name`    | yes       | yes      | generated volume name       |
//! | `dataset-id`     | yes       | yes      | decimal dataset id          |
//! | `dataset-name`   | yes       | yes      | dataset name                |
//! | `schema-version` | yes       | yes      | `1`                         |
//!
//! Objects written before `schema-version` existed carry no version label and
//! are read as version 1.

use super::error::{K8sError, K8sResult};
use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim};
use parcel_common::Dataset;
use rand::Rng;
use std::collections::BTreeMap;

/// Every managed volume name starts with this prefix
pub const VOLUME_NAME_PREFIX: &str = "parcel-pv-";

pub const LABEL_VOLUME_NAME: &str = "volume-name";
pub const LABEL_DATASET_ID: &str = "dataset-id";
pub const LABEL_DATASET_NAME: &str = "dataset-name";
pub const LABEL_SCHEMA_VERSION: &str = "schema-version";

/// Label schema written by this version
pub const LABEL_SCHEMA: &str = "1";

/// Label values are limited to 63 characters and the volume name is one
const MAX_VOLUME_NAME_LEN: usize = 63;

const SUFFIX_LEN: usize = 12;
const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generate a fresh volume name for a dataset
///
/// `parcel-pv-<sanitized name>-<random suffix>`. Every call returns a different
/// name, so a failed create must not be retried expecting the same one.
pub fn generate_volume_name(dataset: &Dataset) -> String {
    let max_name_len = MAX_VOLUME_NAME_LEN - VOLUME_NAME_PREFIX.len() - SUFFIX_LEN - 1;
    let sanitized: String = sanitize_name(&dataset.name)
        .chars()
        .take(max_name_len)
        .collect();
    let suffix = random_suffix();

    if sanitized.is_empty() {
        format!("{}{}", VOLUME_NAME_PREFIX, suffix)
    } else {
        format!("{}{}-{}", VOLUME_NAME_PREFIX, sanitized, suffix)
    }
}

/// Strip every character outside `[A-Za-z0-9]`
pub fn sanitize_name(name: &str) -> String {
    name.chars().filter(char::is_ascii_alphanumeric).collect()
}

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}

/// Claim name for a volume
pub fn claim_name_for(volume_name: &str) -> String {
    format!("{}-claim", volume_name)
}

/// CSI volume handle for a volume
pub fn volume_handle_for(volume_name: &str) -> String {
    format!("{}-handle", volume_name)
}

/// Labels attached to both the volume and its claim
pub fn encode_labels(dataset: &Dataset, volume_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_VOLUME_NAME.to_string(), volume_name.to_string()),
        (LABEL_DATASET_ID.to_string(), dataset.id.to_string()),
        (LABEL_DATASET_NAME.to_string(), dataset.name.clone()),
        (LABEL_SCHEMA_VERSION.to_string(), LABEL_SCHEMA.to_string()),
    ])
}

/// Whether a name belongs to a volume created by parcel
pub fn is_managed_name(name: &str) -> bool {
    name.starts_with(VOLUME_NAME_PREFIX)
}

/// Whether a volume is managed by parcel
///
/// The name prefix is the only signal; a foreign volume sharing the prefix is
/// treated as managed.
pub fn recognize_managed(volume: &PersistentVolume) -> bool {
    volume
        .metadata
        .name
        .as_deref()
        .map(is_managed_name)
        .unwrap_or(false)
}

/// Whether a claim's labels point at the given volume
pub fn claim_references_volume(claim: &PersistentVolumeClaim, volume_name: &str) -> bool {
    claim
        .metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get(LABEL_VOLUME_NAME))
        .map(|v| v == volume_name)
        .unwrap_or(false)
}

/// Rebuild the dataset identity (id and name) from a volume's labels
///
/// `object` names the volume in error messages. Both `dataset-id` and
/// `dataset-name` must be present; the URL and description are not in labels.
pub fn decode_dataset(object: &str, labels: &BTreeMap<String, String>) -> K8sResult<Dataset> {
    if let Some(version) = labels.get(LABEL_SCHEMA_VERSION) {
        if version != LABEL_SCHEMA {
            return Err(K8sError::UnsupportedLabelSchema {
                version: version.clone(),
                object: object.to_string(),
            });
        }
    }

    let raw_id = labels
        .get(LABEL_DATASET_ID)
        .ok_or_else(|| K8sError::MissingLabel {
            label: LABEL_DATASET_ID,
            object: object.to_string(),
        })?;

    let id = raw_id.parse::<i64>().map_err(|_| K8sError::InvalidLabel {
        label: LABEL_DATASET_ID,
        value: raw_id.clone(),
        object: object.to_string(),
    })?;

    let name = labels
        .get(LABEL_DATASET_NAME)
        .ok_or_else(|| K8sError::MissingLabel {
            label: LABEL_DATASET_NAME,
            object: object.to_string(),
        })?;

    Ok(Dataset {
        id,
        name: name.clone(),
        ..Default::default()
    })
}
