//! Dataset mount commands

use crate::output::{self, or_dash, OutputFormat};
use anyhow::{bail, Result};
use parcel_core::{CatalogClient, DatasetMount, MountInfo, VolumeManager};
use tabled::Tabled;

#[derive(Tabled)]
struct MountRow {
    volume: String,
    claim: String,
    dataset_id: i64,
    dataset: String,
    driver: String,
    status: String,
}

impl From<MountInfo> for MountRow {
    fn from(info: MountInfo) -> Self {
        Self {
            volume: info.volume_name,
            claim: info.claim_name,
            dataset_id: info.dataset_id,
            dataset: info.dataset_name,
            driver: or_dash(info.driver.as_deref()),
            status: format!("{}/{}", info.volume_status, info.claim_status),
        }
    }
}

/// First existing mount of a dataset
fn existing_mount(mounts: &[DatasetMount], dataset_id: i64) -> Option<&DatasetMount> {
    mounts.iter().find(|mount| mount.dataset.id == dataset_id)
}

/// Create a mount for each selected dataset
///
/// Datasets that are already mounted are skipped unless `allow_duplicate` is
/// set. A dataset with an unusable URL is reported and the rest continue;
/// any other failure stops the order.
pub async fn handle_order(
    catalog: &CatalogClient,
    manager: &VolumeManager,
    ids: &[String],
    allow_duplicate: bool,
    format: OutputFormat,
) -> Result<()> {
    let datasets = catalog.select_datasets(ids).await?;

    for id in ids {
        if !datasets.iter().any(|ds| ds.id.to_string() == id.trim()) {
            output::warning(format!("Dataset {} not found in catalog", id));
        }
    }

    if datasets.is_empty() {
        bail!("No datasets to order");
    }

    manager.ensure_storage_class().await?;

    let existing = if allow_duplicate {
        Vec::new()
    } else {
        manager.list_mounts().await?
    };

    let mut created = Vec::new();
    let mut failed = 0;

    for dataset in &datasets {
        if let Some(mount) = existing_mount(&existing, dataset.id) {
            output::warning(format!(
                "{} is already mounted as {}; use --allow-duplicate to mount it again",
                dataset,
                mount.volume_name()
            ));
            continue;
        }

        match manager.create_volume_for(dataset).await {
            Ok(mount) => {
                if format.is_table() {
                    output::success(format!(
                        "Mounted {} as volume {} (claim {})",
                        dataset,
                        mount.volume_name(),
                        mount.claim_name()
                    ));
                }
                created.push(mount.info());
            }
            Err(e) if e.is_dataset_error() => {
                output::failure(format!("Skipping {}: {}", dataset, e));
                failed += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    if !format.is_table() {
        output::print_list::<_, MountRow>(created, format)?;
    }

    if failed > 0 {
        bail!("{} dataset(s) could not be mounted", failed);
    }

    Ok(())
}

pub async fn handle_list(manager: &VolumeManager, format: OutputFormat) -> Result<()> {
    let mounts: Vec<MountInfo> = manager.list_mounts().await?.iter().map(|m| m.info()).collect();
    output::print_list::<_, MountRow>(mounts, format)
}

pub async fn handle_show(manager: &VolumeManager, volume: &str, format: OutputFormat) -> Result<()> {
    let info = manager.get_mount(volume).await?.info();

    if output::print_serialized(&info, format)? {
        return Ok(());
    }

    println!("Mount: {}", info.volume_name);
    println!("  Claim:      {} (namespace {})", info.claim_name, info.namespace);
    println!("  Dataset:    [{}] {}", info.dataset_id, info.dataset_name);
    println!("  URL:        {}", info.dataset_url);
    println!("  Driver:     {}", or_dash(info.driver.as_deref()));
    println!("  Status:     volume {}, claim {}", info.volume_status, info.claim_status);
    println!("  Capacity:   {}", or_dash(info.capacity.as_deref()));
    println!("  Created:    {}", or_dash(info.created_at.as_deref()));

    Ok(())
}

pub async fn handle_return(manager: &VolumeManager, volume: &str) -> Result<()> {
    manager.delete_mount(volume).await?;
    output::success(format!("Returned {}", volume));
    Ok(())
}
