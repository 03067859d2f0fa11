//! Catalog browsing commands

use crate::output::{self, OutputFormat};
use anyhow::Result;
use parcel_common::{Dataset, SHORT_DESCRIPTION_LEN};
use parcel_core::CatalogClient;
use tabled::Tabled;

#[derive(Tabled)]
struct DatasetRow {
    id: i64,
    name: String,
    url: String,
    description: String,
}

impl From<Dataset> for DatasetRow {
    fn from(ds: Dataset) -> Self {
        Self {
            id: ds.id,
            name: ds.name,
            url: ds.url,
            description: ds.description,
        }
    }
}

fn shorten(datasets: Vec<Dataset>, short: bool) -> Vec<Dataset> {
    if !short {
        return datasets;
    }

    datasets
        .into_iter()
        .map(|ds| Dataset {
            description: ds.short_description(SHORT_DESCRIPTION_LEN),
            ..ds
        })
        .collect()
}

pub async fn handle_list(catalog: &CatalogClient, format: OutputFormat, short: bool) -> Result<()> {
    let datasets = catalog.list_all_datasets().await?;
    output::print_list::<_, DatasetRow>(shorten(datasets, short), format)
}

pub async fn handle_search(
    catalog: &CatalogClient,
    keywords: &[String],
    format: OutputFormat,
    short: bool,
) -> Result<()> {
    let datasets = catalog.search_datasets(keywords).await?;
    output::print_list::<_, DatasetRow>(shorten(datasets, short), format)
}
