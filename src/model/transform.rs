//! Image-to-tensor transform
//!
//! The serving contract is "image in, fixed-shape tensor out": decode, exact
//! resize to 224×224, RGB conversion, then CHW layout normalized with the
//! ImageNet channel statistics the backbone was trained against. Train-time
//! augmentation lives outside this crate; training and inference both flow
//! through this one deterministic transform.

use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array3;
use std::path::Path;

use crate::error::{Error, Result};

/// Edge length of the model input, in pixels.
pub const IMAGE_SIZE: usize = 224;

/// ImageNet per-channel mean.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet per-channel standard deviation.
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Deterministic decode → resize → normalize pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageTransform;

impl ImageTransform {
    /// Decode an image file and produce the model input tensor.
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<Array3<f32>> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|e| Error::Dataset {
            context: format!("failed to decode {}: {e}", path.display()),
        })?;
        Ok(self.apply(&img))
    }

    /// Decode raw image bytes and produce the model input tensor.
    pub fn load_bytes(&self, bytes: &[u8]) -> Result<Array3<f32>> {
        let img = image::load_from_memory(bytes).map_err(|e| Error::Dataset {
            context: format!("failed to decode image bytes: {e}"),
        })?;
        Ok(self.apply(&img))
    }

    /// Resize and normalize a decoded image into a `[3, 224, 224]` tensor.
    pub fn apply(&self, img: &DynamicImage) -> Array3<f32> {
        let size = IMAGE_SIZE as u32;
        let rgb = img.resize_exact(size, size, FilterType::Triangle).to_rgb8();

        let mut tensor = Array3::<f32>::zeros((3, IMAGE_SIZE, IMAGE_SIZE));
        for (x, y, pixel) in rgb.enumerate_pixels() {
            for c in 0..3 {
                let value = pixel.0[c] as f32 / 255.0;
                tensor[[c, y as usize, x as usize]] =
                    (value - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
            }
        }
        tensor
    }

    /// All-black input tensor, run through the same normalization. Used as
    /// the substitute when a backing asset fails to decode.
    pub fn placeholder(&self) -> Array3<f32> {
        let mut tensor = Array3::<f32>::zeros((3, IMAGE_SIZE, IMAGE_SIZE));
        for c in 0..3 {
            let value = -IMAGENET_MEAN[c] / IMAGENET_STD[c];
            tensor
                .index_axis_mut(ndarray::Axis(0), c)
                .fill(value);
        }
        tensor
    }
}
