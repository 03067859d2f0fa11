//! Parcel core library
//!
//! Exposes dataset catalog access and the Kubernetes volume lifecycle used by
//! the `parcel` command-line tool.

// Dataset catalog
pub mod catalog;

// Kubernetes volume lifecycle
pub mod kubernetes;

// Logging
pub mod logging;

pub use catalog::{CatalogClient, CatalogError};
pub use kubernetes::error::{K8sError, K8sResult};
pub use kubernetes::types::{DatasetMount, MountInfo};
pub use kubernetes::VolumeManager;
