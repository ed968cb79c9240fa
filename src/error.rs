use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("artifact store failure: {0}")]
    Storage(String),
    #[error("model load failed: {0}")]
    ModelLoad(String),
    #[error("invalid image shape: {0}")]
    Shape(String),
    #[error("input tensor shape {got:?} does not match model input {expected:?}")]
    ShapeMismatch {
        expected: [usize; 4],
        got: [usize; 4],
    },
    #[error("{scores} scores for {labels} labels")]
    LengthMismatch { scores: usize, labels: usize },
    #[error("model execution failed: {0}")]
    Inference(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
