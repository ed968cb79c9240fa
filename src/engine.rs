use crate::{error::ClassifierError, preprocess::PreparedTensor};

/// Backend seam: one forward pass over a prepared tensor. Implementations
/// must not mutate the underlying network and must release any transient
/// buffers before returning, on error paths included.
pub trait Module: Send + Sync {
    fn forward(&self, tensor: &PreparedTensor) -> Result<Vec<f32>, ClassifierError>;
}

/// Wraps a loaded network with its declared geometry and enforces the
/// shape contracts around the raw forward pass.
pub struct InferenceEngine {
    module: Box<dyn Module>,
    input_shape: [usize; 4],
    output_dim: usize,
}

impl InferenceEngine {
    pub fn new(module: Box<dyn Module>, input_shape: [usize; 4], output_dim: usize) -> Self {
        Self {
            module,
            input_shape,
            output_dim,
        }
    }

    pub fn input_shape(&self) -> &[usize; 4] {
        &self.input_shape
    }

    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    /// Single gradient-free forward pass; returns one score per class.
    pub fn classify(&self, tensor: &PreparedTensor) -> Result<Vec<f32>, ClassifierError> {
        if tensor.shape() != &self.input_shape {
            return Err(ClassifierError::ShapeMismatch {
                expected: self.input_shape,
                got: *tensor.shape(),
            });
        }
        let scores = self.module.forward(tensor)?;
        if scores.len() != self.output_dim {
            return Err(ClassifierError::Inference(format!(
                "backend produced {} scores for {} outputs",
                scores.len(),
                self.output_dim
            )));
        }
        Ok(scores)
    }
}
