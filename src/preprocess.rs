use image::{RgbImage, imageops::FilterType};

use crate::error::ClassifierError;

/// Decoded RGB8 image with non-degenerate dimensions.
#[derive(Debug, Clone)]
pub struct RawImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RawImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, ClassifierError> {
        if width == 0 || height == 0 {
            return Err(ClassifierError::Shape(format!(
                "image dimensions {width}x{height} are degenerate"
            )));
        }
        let expected = width as usize * height as usize * 3;
        if pixels.len() != expected {
            return Err(ClassifierError::Shape(format!(
                "{width}x{height} image needs {expected} bytes, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Decode any common raster format into RGB8.
    pub fn decode(bytes: &[u8]) -> Result<Self, ClassifierError> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| ClassifierError::Shape(format!("undecodable image: {e}")))?
            .to_rgb8();
        let (width, height) = (decoded.width(), decoded.height());
        Self::new(width, height, decoded.into_raw())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Batched NHWC float tensor, values in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedTensor {
    shape: [usize; 4],
    data: Vec<f32>,
}

impl PreparedTensor {
    pub fn shape(&self) -> &[usize; 4] {
        &self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[cfg(test)]
    pub(crate) fn from_parts(shape: [usize; 4], data: Vec<f32>) -> Self {
        Self { shape, data }
    }
}

/// Deterministic image-to-tensor conversion: bilinear resize to
/// (target_w, target_h), byte values mapped to [0, 1], leading batch dim.
pub fn prepare(
    image: &RawImage,
    (target_w, target_h): (u32, u32),
) -> Result<PreparedTensor, ClassifierError> {
    if target_w == 0 || target_h == 0 {
        return Err(ClassifierError::Shape(format!(
            "target size {target_w}x{target_h} is degenerate"
        )));
    }

    let buffer = RgbImage::from_raw(image.width, image.height, image.pixels.clone())
        .ok_or_else(|| ClassifierError::Shape("pixel buffer does not match dimensions".into()))?;
    let resized = image::imageops::resize(&buffer, target_w, target_h, FilterType::Triangle);

    let data: Vec<f32> = resized
        .into_raw()
        .into_iter()
        .map(|b| b as f32 / 255.0)
        .collect();
    Ok(PreparedTensor {
        shape: [1, target_h as usize, target_w as usize, 3],
        data,
    })
}
