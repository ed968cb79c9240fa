use serde::{Deserialize, Serialize};

use crate::error::ClassifierError;

/// Remote model manifest: declares the graph's input geometry, its output
/// dimensionality and the ordered weight shards that reconstruct it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub name: String,
    pub input_height: u32,
    pub input_width: u32,
    pub output_dim: usize,
    pub shards: Vec<String>,
}

impl ModelManifest {
    /// Batched NHWC input shape, always three channels.
    pub fn input_shape(&self) -> [usize; 4] {
        [1, self.input_height as usize, self.input_width as usize, 3]
    }

    /// (width, height) the preprocessor resizes to.
    pub fn target_size(&self) -> (u32, u32) {
        (self.input_width, self.input_height)
    }
}

/// Manifest plus the assembled weight bytes. Serialized as one blob under a
/// single cache key: an 8-byte little-endian manifest length, the manifest
/// JSON, then the raw weights.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelBundle {
    pub manifest: ModelManifest,
    pub weights: Vec<u8>,
}

impl ModelBundle {
    pub fn to_bytes(&self) -> Result<Vec<u8>, ClassifierError> {
        let manifest = serde_json::to_vec(&self.manifest)
            .map_err(|e| ClassifierError::ModelLoad(format!("serialize manifest: {e}")))?;
        let mut out = Vec::with_capacity(8 + manifest.len() + self.weights.len());
        out.extend_from_slice(&(manifest.len() as u64).to_le_bytes());
        out.extend_from_slice(&manifest);
        out.extend_from_slice(&self.weights);
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ClassifierError> {
        if bytes.len() < 8 {
            return Err(ClassifierError::ModelLoad("truncated model blob".into()));
        }
        let mut header = [0u8; 8];
        header.copy_from_slice(&bytes[..8]);
        let manifest_len = u64::from_le_bytes(header) as usize;
        let weights_start = 8usize
            .checked_add(manifest_len)
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| ClassifierError::ModelLoad("truncated model blob".into()))?;

        let manifest = serde_json::from_slice(&bytes[8..weights_start])
            .map_err(|e| ClassifierError::ModelLoad(format!("corrupt manifest: {e}")))?;
        Ok(Self {
            manifest,
            weights: bytes[weights_start..].to_vec(),
        })
    }
}
