//! Catalog service client
//!
//! The catalog has no search endpoint; every query fetches the full dataset list
//! and filters it locally.

use parcel_common::Dataset;
use std::time::Instant;
use thiserror::Error;

/// Default catalog service URL
pub const CATALOG_SERVICE_URL: &str = "http://localhost:8080";

/// Keywords shorter than this are ignored by search
pub const MIN_KEYWORD_LEN: usize = 4;

/// Catalog client errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Catalog request to {url} failed: {status} - {body}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Invalid dataset list from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Client for the parcel catalog service
pub struct CatalogClient {
    base_url: String,
    client: reqwest::Client,
    trace: bool,
}

impl CatalogClient {
    /// Create a client; an empty URL selects the default service URL
    pub fn new(base_url: &str, trace: bool) -> Self {
        let base_url = if base_url.is_empty() {
            CATALOG_SERVICE_URL
        } else {
            base_url
        };

        Self {
            base_url: base_url.to_string(),
            client: reqwest::Client::new(),
            trace,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, path: &str) -> CatalogResult<Vec<u8>> {
        let url = request_path(&self.base_url, path);
        let started = Instant::now();

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| CatalogError::Http {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| CatalogError::Http {
                url: url.clone(),
                source,
            })?;

        if self.trace {
            tracing::debug!(
                url = %url,
                status = %status,
                elapsed_ms = started.elapsed().as_millis() as u64,
                body_bytes = body.len(),
                "Catalog response"
            );
        }

        if !status.is_success() {
            return Err(CatalogError::Status {
                url,
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(body.to_vec())
    }

    /// All datasets in the catalog
    pub async fn list_all_datasets(&self) -> CatalogResult<Vec<Dataset>> {
        let body = self.get("/datasets").await?;

        serde_json::from_slice(&body).map_err(|source| CatalogError::Decode {
            url: request_path(&self.base_url, "/datasets"),
            source,
        })
    }

    /// Datasets whose name or description contains any of the keywords
    ///
    /// Keywords shorter than four characters are dropped with a warning.
    pub async fn search_datasets<S: AsRef<str>>(
        &self,
        keywords: &[S],
    ) -> CatalogResult<Vec<Dataset>> {
        let keywords = usable_keywords(keywords);
        if keywords.is_empty() {
            tracing::warn!("No usable search keywords given");
            return Ok(Vec::new());
        }

        let datasets = self.list_all_datasets().await?;
        Ok(filter_by_keywords(datasets, &keywords))
    }

    /// Datasets with the given ids, in catalog order
    pub async fn select_datasets<S: AsRef<str>>(&self, ids: &[S]) -> CatalogResult<Vec<Dataset>> {
        let datasets = self.list_all_datasets().await?;
        Ok(select_by_ids(datasets, ids))
    }
}

/// Keep keywords long enough to search for
pub fn usable_keywords<S: AsRef<str>>(keywords: &[S]) -> Vec<String> {
    keywords
        .iter()
        .map(|keyword| keyword.as_ref())
        .filter(|keyword| {
            if keyword.chars().count() < MIN_KEYWORD_LEN {
                tracing::warn!("Keyword '{}' is ignored because it is too short", keyword);
                false
            } else {
                true
            }
        })
        .map(str::to_string)
        .collect()
}

pub fn filter_by_keywords(datasets: Vec<Dataset>, keywords: &[String]) -> Vec<Dataset> {
    datasets
        .into_iter()
        .filter(|ds| ds.contains_keywords(keywords))
        .collect()
}

/// Match ids against the decimal form of each dataset id
pub fn select_by_ids<S: AsRef<str>>(datasets: Vec<Dataset>, ids: &[S]) -> Vec<Dataset> {
    datasets
        .into_iter()
        .filter(|ds| {
            let id = ds.id.to_string();
            ids.iter().any(|wanted| wanted.as_ref().trim() == id)
        })
        .collect()
}

/// Join a root URL and a path with exactly one slash between them
pub fn request_path(root: &str, path: &str) -> String {
    match (root.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", root.trim_end_matches('/'), path),
        (false, false) => format!("{}/{}", root, path),
        _ => format!("{}{}", root, path),
    }
}
