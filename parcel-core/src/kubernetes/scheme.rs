//! Dataset URL scheme to storage driver mapping

use super::error::{K8sError, K8sResult};

/// Storage backend client used by the CSI driver to mount a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageDriver {
    /// Remote filesystem over WebDAV
    Webdav,
    /// iRODS over FUSE
    IrodsFuse,
}

impl StorageDriver {
    /// Identifier written into the volume's `client` attribute
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageDriver::Webdav => "webdav",
            StorageDriver::IrodsFuse => "irodsfuse",
        }
    }
}

impl std::fmt::Display for StorageDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve the storage driver for a dataset URL
///
/// The scheme is matched case-insensitively. There is no default driver.
pub fn resolve_driver(dataset_url: &str) -> K8sResult<StorageDriver> {
    let parsed = url::Url::parse(dataset_url).map_err(|e| K8sError::MalformedUrl {
        url: dataset_url.to_string(),
        reason: e.to_string(),
    })?;

    // Url::parse lowercases the scheme
    match parsed.scheme() {
        "webdav" | "davfs" | "http" | "https" => Ok(StorageDriver::Webdav),
        "irods" => Ok(StorageDriver::IrodsFuse),
        other => Err(K8sError::UnsupportedScheme {
            scheme: other.to_string(),
            url: dataset_url.to_string(),
        }),
    }
}
