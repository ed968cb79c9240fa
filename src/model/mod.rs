mod fetch;
mod manifest;
mod registry;
mod types;

#[cfg(feature = "tch-backend")]
pub mod tch_backend;

pub use fetch::{HttpSource, RemoteSource};
pub use manifest::{ModelBundle, ModelManifest};
pub use registry::{LABELS_KEY, MODEL_KEY, ModelRegistry};
pub use types::LabelSet;
