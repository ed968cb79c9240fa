use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use parking_lot::{Mutex, RwLock};
use tokio::task;
use tracing::{debug, warn};

use crate::{
    engine::InferenceEngine,
    error::ClassifierError,
    model::LabelSet,
    preprocess::{RawImage, prepare},
    rank::{ScoredLabel, rank},
};

/// Model plus labels, read-only once loaded and shared across any number of
/// concurrent classifications.
pub struct LoadedModel {
    pub engine: InferenceEngine,
    pub labels: LabelSet,
}

/// Load seam the session drives: resolve artifacts and hand back a ready
/// model. `invalidate` is called when ranking detects a corrupted
/// model/label pairing so the next load re-fetches.
pub trait ModelLoader: Send + Sync {
    fn load(&self) -> Result<LoadedModel, ClassifierError>;
    fn invalidate(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    AlreadyLoaded,
    /// Another load is running; this trigger was a no-op, not a queued retry.
    InFlight,
}

/// Orchestrates one user-facing classification flow: single-flight model
/// load, then per-selection inference with last-selection-wins publication.
pub struct ClassifierSession {
    loader: Arc<dyn ModelLoader>,
    loaded: RwLock<Option<Arc<LoadedModel>>>,
    load_in_flight: AtomicBool,
    selection_seq: AtomicU64,
    latest: Mutex<Option<(u64, Vec<ScoredLabel>)>>,
    top_k: usize,
}

impl ClassifierSession {
    pub fn new(loader: Arc<dyn ModelLoader>, top_k: usize) -> Self {
        Self {
            loader,
            loaded: RwLock::new(None),
            load_in_flight: AtomicBool::new(false),
            selection_seq: AtomicU64::new(0),
            latest: Mutex::new(None),
            top_k,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.read().is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.load_in_flight.load(Ordering::SeqCst)
    }

    /// Loads the model off the async thread. At most one load is in flight;
    /// concurrent triggers return [`LoadOutcome::InFlight`] immediately.
    pub async fn load_model(&self) -> Result<LoadOutcome, ClassifierError> {
        if self.is_loaded() {
            return Ok(LoadOutcome::AlreadyLoaded);
        }
        if self
            .load_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("model load already in flight, ignoring trigger");
            return Ok(LoadOutcome::InFlight);
        }

        let loader = self.loader.clone();
        let joined = task::spawn_blocking(move || loader.load()).await;
        self.load_in_flight.store(false, Ordering::SeqCst);

        let model = joined
            .map_err(|e| ClassifierError::ModelLoad(format!("load task failed: {e}")))??;
        *self.loaded.write() = Some(Arc::new(model));
        Ok(LoadOutcome::Loaded)
    }

    /// Classifies one selected image. Each call takes the next selection
    /// sequence number; a result whose selection has been superseded by the
    /// time inference finishes is discarded (`Ok(None)`) rather than
    /// overwriting a newer one.
    pub async fn classify_selection(
        &self,
        image: RawImage,
    ) -> Result<Option<Vec<ScoredLabel>>, ClassifierError> {
        let model = self
            .loaded
            .read()
            .clone()
            .ok_or_else(|| ClassifierError::ModelLoad("model not loaded".into()))?;

        let seq = self.selection_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let top_k = self.top_k;

        let joined = task::spawn_blocking(move || {
            let shape = model.engine.input_shape();
            let target = (shape[2] as u32, shape[1] as u32);
            let tensor = prepare(&image, target)?;
            let scores = model.engine.classify(&tensor)?;
            rank(&scores, &model.labels, top_k)
        })
        .await
        .map_err(|e| ClassifierError::Inference(format!("inference task failed: {e}")))?;

        let ranked = match joined {
            Ok(ranked) => ranked,
            Err(e) => {
                if matches!(e, ClassifierError::LengthMismatch { .. }) {
                    warn!("score/label count mismatch, invalidating cached artifacts");
                    self.loader.invalidate();
                    *self.loaded.write() = None;
                }
                return Err(e);
            }
        };

        let mut latest = self.latest.lock();
        let superseded = self.selection_seq.load(Ordering::SeqCst) != seq
            || latest.as_ref().is_some_and(|(published, _)| *published > seq);
        if superseded {
            debug!(seq, "discarding stale classification result");
            return Ok(None);
        }
        *latest = Some((seq, ranked.clone()));
        Ok(Some(ranked))
    }

    /// The most recently published ranking, if any.
    pub fn current_result(&self) -> Option<Vec<ScoredLabel>> {
        self.latest.lock().as_ref().map(|(_, ranked)| ranked.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use super::*;
    use crate::{engine::Module, preprocess::PreparedTensor};

    struct StubModule {
        dark_scores: Vec<f32>,
        bright_scores: Vec<f32>,
        dark_delay: Duration,
    }

    impl Module for StubModule {
        fn forward(&self, tensor: &PreparedTensor) -> Result<Vec<f32>, ClassifierError> {
            // dark selections simulate a slow forward pass
            if tensor.data()[0] < 0.5 {
                thread::sleep(self.dark_delay);
                Ok(self.dark_scores.clone())
            } else {
                Ok(self.bright_scores.clone())
            }
        }
    }

    struct StubLoader {
        labels: Vec<String>,
        load_delay: Duration,
        invalidated: AtomicBool,
    }

    impl StubLoader {
        fn new(labels: Vec<String>) -> Self {
            Self {
                labels,
                load_delay: Duration::ZERO,
                invalidated: AtomicBool::new(false),
            }
        }
    }

    impl ModelLoader for StubLoader {
        fn load(&self) -> Result<LoadedModel, ClassifierError> {
            if !self.load_delay.is_zero() {
                thread::sleep(self.load_delay);
            }
            let module = StubModule {
                dark_scores: vec![0.7, 0.2, 0.1],
                bright_scores: vec![0.1, 0.9, 0.3],
                dark_delay: Duration::from_millis(300),
            };
            Ok(LoadedModel {
                engine: InferenceEngine::new(Box::new(module), [1, 4, 4, 3], 3),
                labels: LabelSet::new(self.labels.clone()),
            })
        }

        fn invalidate(&self) {
            self.invalidated.store(true, Ordering::SeqCst);
        }
    }

    fn solid_image(value: u8) -> RawImage {
        RawImage::new(4, 4, vec![value; 4 * 4 * 3]).unwrap()
    }

    fn session(labels: &[&str]) -> Arc<ClassifierSession> {
        let loader = Arc::new(StubLoader::new(
            labels.iter().map(|s| s.to_string()).collect(),
        ));
        Arc::new(ClassifierSession::new(loader, 2))
    }

    #[tokio::test]
    async fn classify_before_load_is_a_model_load_error() {
        let session = session(&["cat", "dog", "bird"]);
        let err = session.classify_selection(solid_image(255)).await.unwrap_err();
        assert!(matches!(err, ClassifierError::ModelLoad(_)));
    }

    #[tokio::test]
    async fn classify_publishes_top_k() {
        let session = session(&["cat", "dog", "bird"]);
        assert_eq!(session.load_model().await.unwrap(), LoadOutcome::Loaded);

        let ranked = session
            .classify_selection(solid_image(255))
            .await
            .unwrap()
            .expect("latest selection must publish");
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].label, "dog");
        assert_eq!(ranked[1].label, "bird");
        assert_eq!(session.current_result().unwrap(), ranked);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn second_load_trigger_while_loading_is_a_no_op() {
        let loader = Arc::new(StubLoader {
            load_delay: Duration::from_millis(200),
            ..StubLoader::new(vec!["cat".into(), "dog".into(), "bird".into()])
        });
        let session = Arc::new(ClassifierSession::new(loader, 2));

        let first = {
            let session = session.clone();
            tokio::spawn(async move { session.load_model().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(session.is_loading());
        assert_eq!(session.load_model().await.unwrap(), LoadOutcome::InFlight);

        assert_eq!(first.await.unwrap().unwrap(), LoadOutcome::Loaded);
        assert_eq!(
            session.load_model().await.unwrap(),
            LoadOutcome::AlreadyLoaded
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn stale_inference_result_is_discarded() {
        let session = session(&["cat", "dog", "bird"]);
        session.load_model().await.unwrap();

        // selection 1: dark image, slow forward pass
        let stale = {
            let session = session.clone();
            tokio::spawn(async move { session.classify_selection(solid_image(0)).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;

        // selection 2 finishes first and wins
        let fresh = session
            .classify_selection(solid_image(255))
            .await
            .unwrap()
            .expect("newest selection must publish");
        assert_eq!(fresh[0].label, "dog");

        let stale = stale.await.unwrap().unwrap();
        assert_eq!(stale, None, "superseded result must be discarded");
        assert_eq!(session.current_result().unwrap(), fresh);
    }

    #[tokio::test]
    async fn length_mismatch_invalidates_and_drops_the_model() {
        // two labels for a three-output model
        let loader = Arc::new(StubLoader::new(vec!["cat".into(), "dog".into()]));
        let session = ClassifierSession::new(loader.clone(), 2);
        session.load_model().await.unwrap();

        let err = session.classify_selection(solid_image(255)).await.unwrap_err();
        assert!(matches!(err, ClassifierError::LengthMismatch { .. }));
        assert!(loader.invalidated.load(Ordering::SeqCst));
        assert!(!session.is_loaded(), "forced re-fetch on next load");
    }
}
