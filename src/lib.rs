pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod preprocess;
pub mod rank;
pub mod session;
pub mod store;

pub use config::AppConfig;
pub use engine::InferenceEngine;
pub use error::ClassifierError;
pub use model::{LabelSet, ModelRegistry};
pub use preprocess::{PreparedTensor, RawImage, prepare};
pub use rank::{ScoredLabel, rank};
pub use session::{ClassifierSession, LoadOutcome};
pub use store::{ArtifactStore, FsStore, MemoryStore};
