use serde::{Deserialize, Serialize};

use crate::error::ClassifierError;

/// Ordered label list; index i names the model's output neuron i. The
/// registry enforces `len() == manifest.output_dim` on every load path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSet(Vec<String>);

impl LabelSet {
    pub fn new(labels: Vec<String>) -> Self {
        Self(labels)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, ClassifierError> {
        serde_json::from_slice(bytes)
            .map_err(|e| ClassifierError::ModelLoad(format!("invalid label list: {e}")))
    }

    pub fn to_json(&self) -> Result<Vec<u8>, ClassifierError> {
        serde_json::to_vec(self)
            .map_err(|e| ClassifierError::ModelLoad(format!("serialize label list: {e}")))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}
