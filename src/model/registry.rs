use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    error::ClassifierError,
    model::{fetch::RemoteSource, manifest::ModelBundle, types::LabelSet},
    store::ArtifactStore,
};

pub const MODEL_KEY: &str = "model.bin";
pub const LABELS_KEY: &str = "labels.json";

/// Resolves the current model + labels: artifact store first, remote source
/// otherwise. The two cache keys are treated as one atomic unit — a partial
/// or unreadable pair counts as a full miss, so a cached model can never be
/// ranked against labels from a different fetch.
pub struct ModelRegistry {
    store: Arc<dyn ArtifactStore>,
    source: Arc<dyn RemoteSource>,
}

impl ModelRegistry {
    pub fn new(store: Arc<dyn ArtifactStore>, source: Arc<dyn RemoteSource>) -> Self {
        Self { store, source }
    }

    pub fn resolve(&self) -> Result<(ModelBundle, LabelSet), ClassifierError> {
        if let Some(cached) = self.load_cached() {
            return Ok(cached);
        }
        let (bundle, labels) = self.fetch_remote()?;
        self.cache_artifacts(&bundle, &labels);
        Ok((bundle, labels))
    }

    /// Best-effort removal of both cached artifacts.
    pub fn invalidate(&self) {
        for key in [MODEL_KEY, LABELS_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!(key, "failed to invalidate cached artifact: {e}");
            }
        }
    }

    fn load_cached(&self) -> Option<(ModelBundle, LabelSet)> {
        if !(self.store.exists(MODEL_KEY) && self.store.exists(LABELS_KEY)) {
            return None;
        }

        let model_bytes = match self.store.get(MODEL_KEY) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!("cached model unreadable, falling back to remote: {e}");
                return None;
            }
        };
        let label_bytes = match self.store.get(LABELS_KEY) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!("cached labels unreadable, falling back to remote: {e}");
                return None;
            }
        };

        let bundle = match ModelBundle::from_bytes(&model_bytes) {
            Ok(bundle) => bundle,
            Err(e) => {
                warn!("corrupt cached model, invalidating: {e}");
                self.invalidate();
                return None;
            }
        };
        let labels = match LabelSet::from_json(&label_bytes) {
            Ok(labels) => labels,
            Err(e) => {
                warn!("corrupt cached labels, invalidating: {e}");
                self.invalidate();
                return None;
            }
        };

        if labels.len() != bundle.manifest.output_dim {
            warn!(
                labels = labels.len(),
                output_dim = bundle.manifest.output_dim,
                "cached label count disagrees with model, invalidating"
            );
            self.invalidate();
            return None;
        }

        info!(model = %bundle.manifest.name, "loaded model artifacts from cache");
        Some((bundle, labels))
    }

    fn fetch_remote(&self) -> Result<(ModelBundle, LabelSet), ClassifierError> {
        let manifest = self.source.fetch_manifest()?;
        info!(model = %manifest.name, shards = manifest.shards.len(), "fetching model artifacts");

        let mut weights = Vec::new();
        for shard in &manifest.shards {
            weights.extend(self.source.fetch_shard(shard)?);
        }
        let labels = LabelSet::new(self.source.fetch_labels()?);

        if labels.len() != manifest.output_dim {
            return Err(ClassifierError::ModelLoad(format!(
                "label list has {} entries for {} model outputs",
                labels.len(),
                manifest.output_dim
            )));
        }

        Ok((ModelBundle { manifest, weights }, labels))
    }

    fn cache_artifacts(&self, bundle: &ModelBundle, labels: &LabelSet) {
        let written = bundle
            .to_bytes()
            .and_then(|bytes| self.store.put(MODEL_KEY, &bytes))
            .and_then(|_| labels.to_json())
            .and_then(|bytes| self.store.put(LABELS_KEY, &bytes));
        match written {
            Ok(()) => info!("cached model artifacts for future loads"),
            // A failed write only forgoes caching; the load itself succeeded.
            Err(e) => warn!("skipping artifact cache: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{model::manifest::ModelManifest, store::MemoryStore};

    struct StubSource {
        manifest: ModelManifest,
        labels: Vec<String>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl StubSource {
        fn new(output_dim: usize, labels: Vec<String>) -> Self {
            Self {
                manifest: ModelManifest {
                    name: "stub".into(),
                    input_height: 4,
                    input_width: 4,
                    output_dim,
                    shards: vec!["shard-a.bin".into(), "shard-b.bin".into()],
                },
                labels,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            let mut stub = Self::new(0, vec![]);
            stub.fail = true;
            stub
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn record(&self) -> Result<(), ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ClassifierError::ModelLoad("network unreachable".into()))
            } else {
                Ok(())
            }
        }
    }

    impl RemoteSource for StubSource {
        fn fetch_manifest(&self) -> Result<ModelManifest, ClassifierError> {
            self.record()?;
            Ok(self.manifest.clone())
        }

        fn fetch_shard(&self, path: &str) -> Result<Vec<u8>, ClassifierError> {
            self.record()?;
            Ok(path.as_bytes().to_vec())
        }

        fn fetch_labels(&self) -> Result<Vec<String>, ClassifierError> {
            self.record()?;
            Ok(self.labels.clone())
        }
    }

    fn labels3() -> Vec<String> {
        vec!["cat".into(), "dog".into(), "bird".into()]
    }

    #[test]
    fn cold_cache_fetches_and_populates_store() {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(StubSource::new(3, labels3()));
        let registry = ModelRegistry::new(store.clone(), source.clone());

        let (bundle, labels) = registry.resolve().unwrap();
        assert_eq!(labels.len(), bundle.manifest.output_dim);
        // shards concatenated in manifest order
        assert_eq!(bundle.weights, b"shard-a.binshard-b.bin");
        assert!(store.exists(MODEL_KEY));
        assert!(store.exists(LABELS_KEY));
    }

    #[test]
    fn warm_cache_load_is_idempotent_and_offline() {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(StubSource::new(3, labels3()));
        let registry = ModelRegistry::new(store, source.clone());

        let first = registry.resolve().unwrap();
        let fetches = source.calls();
        let second = registry.resolve().unwrap();

        assert_eq!(first, second);
        assert_eq!(source.calls(), fetches, "warm load must not touch the network");
    }

    #[test]
    fn failed_fetch_with_cold_cache_is_model_load_error() {
        let store = Arc::new(MemoryStore::new());
        let registry = ModelRegistry::new(store.clone(), Arc::new(StubSource::failing()));

        let err = registry.resolve().unwrap_err();
        assert!(matches!(err, ClassifierError::ModelLoad(_)));
        assert!(store.is_empty(), "a failed load must leave the store empty");
    }

    #[test]
    fn asymmetric_cache_is_a_full_miss() {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(StubSource::new(3, labels3()));
        let registry = ModelRegistry::new(store.clone(), source.clone());

        registry.resolve().unwrap();
        store.remove(LABELS_KEY).unwrap();
        let fetches = source.calls();

        let (_, labels) = registry.resolve().unwrap();
        assert_eq!(labels.len(), 3);
        assert!(source.calls() > fetches, "partial cache must re-fetch both");
        assert!(store.exists(LABELS_KEY));
    }

    #[test]
    fn corrupt_cached_model_is_invalidated_and_refetched() {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(StubSource::new(3, labels3()));
        let registry = ModelRegistry::new(store.clone(), source.clone());

        registry.resolve().unwrap();
        store.put(MODEL_KEY, b"garbage that is not a bundle").unwrap();
        let fetches = source.calls();

        registry.resolve().unwrap();
        assert!(source.calls() > fetches);
        // store repopulated with a valid bundle
        let bytes = store.get(MODEL_KEY).unwrap().unwrap();
        assert!(ModelBundle::from_bytes(&bytes).is_ok());
    }

    #[test]
    fn label_count_mismatch_from_remote_fails_the_load() {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(StubSource::new(5, labels3()));
        let registry = ModelRegistry::new(store.clone(), source);

        let err = registry.resolve().unwrap_err();
        assert!(matches!(err, ClassifierError::ModelLoad(_)));
        assert!(store.is_empty());
    }
}
