// Artifact Store
// Retrieves the exported classifier artifact once at startup

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use super::linear::LinearTextModel;
use super::ModelLoadError;

pub const DEFAULT_STORE_ENDPOINT: &str = "https://s3.amazonaws.com";
pub const DEFAULT_BUCKET: &str = "fake-review-dataset-penguining";
pub const DEFAULT_MODEL_KEY: &str = "model/model_pipeline.json";

/// Where the classifier artifact lives
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ModelSource {
    Local {
        path: PathBuf,
    },
    #[serde(rename_all = "camelCase")]
    ObjectStore {
        endpoint: String,
        bucket: String,
        key: String,
        /// Local copy of the downloaded artifact
        #[serde(default)]
        cache_path: Option<PathBuf>,
    },
}

impl Default for ModelSource {
    fn default() -> Self {
        ModelSource::ObjectStore {
            endpoint: DEFAULT_STORE_ENDPOINT.to_string(),
            bucket: DEFAULT_BUCKET.to_string(),
            key: DEFAULT_MODEL_KEY.to_string(),
            cache_path: None,
        }
    }
}

impl ModelSource {
    pub fn describe(&self) -> String {
        match self {
            ModelSource::Local { path } => format!("file {}", path.display()),
            ModelSource::ObjectStore { bucket, key, .. } => format!("bucket {} key {}", bucket, key),
        }
    }

    /// Path-style object URL: {endpoint}/{bucket}/{key}
    pub fn object_url(&self) -> Option<String> {
        match self {
            ModelSource::Local { .. } => None,
            ModelSource::ObjectStore {
                endpoint,
                bucket,
                key,
                ..
            } => Some(format!(
                "{}/{}/{}",
                endpoint.trim_end_matches('/'),
                bucket.trim_matches('/'),
                key.trim_start_matches('/')
            )),
        }
    }
}

fn default_cache_path() -> PathBuf {
    std::env::temp_dir().join("reviewtrust_model.json")
}

/// Read the raw artifact bytes. Object-store downloads are also written to
/// the local cache path.
pub async fn fetch_artifact(
    source: &ModelSource,
    client: &reqwest::Client,
) -> Result<Vec<u8>, ModelLoadError> {
    match source {
        ModelSource::Local { path } => Ok(tokio::fs::read(path).await?),
        ModelSource::ObjectStore { cache_path, .. } => {
            let url = source.object_url().unwrap_or_default();
            let response = client.get(&url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(ModelLoadError::Status {
                    status: status.as_u16(),
                    url,
                });
            }
            let bytes = response.bytes().await?.to_vec();

            let cache = cache_path.clone().unwrap_or_else(default_cache_path);
            if let Some(parent) = cache.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&cache, &bytes).await?;
            info!(
                "[MODEL] Downloaded artifact {} bytes to {}",
                bytes.len(),
                cache.display()
            );
            Ok(bytes)
        }
    }
}

/// Fetch and deserialize the classifier
pub async fn load_model(
    source: &ModelSource,
    client: &reqwest::Client,
) -> Result<LinearTextModel, ModelLoadError> {
    let bytes = fetch_artifact(source, client).await?;
    LinearTextModel::from_json_slice(&bytes)
}
