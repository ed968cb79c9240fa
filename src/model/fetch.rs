use std::time::Duration;

use crate::{error::ClassifierError, model::manifest::ModelManifest};

/// Remote origin of model artifacts. Retrieval is plain blocking GETs; the
/// registry drives it from a blocking task.
pub trait RemoteSource: Send + Sync {
    fn fetch_manifest(&self) -> Result<ModelManifest, ClassifierError>;
    fn fetch_shard(&self, path: &str) -> Result<Vec<u8>, ClassifierError>;
    fn fetch_labels(&self) -> Result<Vec<String>, ClassifierError>;
}

pub struct HttpSource {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    fn get_bytes(&self, path: &str) -> Result<Vec<u8>, ClassifierError> {
        let url = format!("{}/{path}", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| ClassifierError::ModelLoad(format!("fetch {url}: {e}")))?;
        if !response.status().is_success() {
            return Err(ClassifierError::ModelLoad(format!(
                "fetch {url}: http {}",
                response.status()
            )));
        }
        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| ClassifierError::ModelLoad(format!("fetch {url}: {e}")))
    }
}

impl RemoteSource for HttpSource {
    fn fetch_manifest(&self) -> Result<ModelManifest, ClassifierError> {
        let bytes = self.get_bytes("manifest.json")?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ClassifierError::ModelLoad(format!("invalid manifest: {e}")))
    }

    fn fetch_shard(&self, path: &str) -> Result<Vec<u8>, ClassifierError> {
        self.get_bytes(path)
    }

    fn fetch_labels(&self) -> Result<Vec<String>, ClassifierError> {
        let bytes = self.get_bytes("labels.json")?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ClassifierError::ModelLoad(format!("invalid label list: {e}")))
    }
}
