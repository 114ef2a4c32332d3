//! Feature-extraction backbone seam
//!
//! The training and serving pipelines consume the backbone only as
//! "image tensor in, feature vector out". The backbone identity is a closed
//! enum resolved once at setup time; unknown tags fail fast. The bundled
//! extractor computes deterministic grid-pooling statistics behind the same
//! seam a pretrained network would occupy — production deployments swap in a
//! real feature extractor by implementing [`Backbone`].

use ndarray::{Array1, Array3};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Supported backbone identities and their feature dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackboneKind {
    Resnet50,
    MobilenetV3,
    EfficientnetB0,
}

impl BackboneKind {
    /// Length of the feature vector this backbone produces.
    pub fn feature_dim(self) -> usize {
        match self {
            BackboneKind::Resnet50 => 2048,
            BackboneKind::MobilenetV3 => 960,
            BackboneKind::EfficientnetB0 => 1280,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BackboneKind::Resnet50 => "resnet50",
            BackboneKind::MobilenetV3 => "mobilenet_v3",
            BackboneKind::EfficientnetB0 => "efficientnet_b0",
        }
    }
}

impl FromStr for BackboneKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "resnet50" => Ok(BackboneKind::Resnet50),
            "mobilenet_v3" => Ok(BackboneKind::MobilenetV3),
            "efficientnet_b0" => Ok(BackboneKind::EfficientnetB0),
            other => Err(Error::UnsupportedConfig {
                field: "backbone",
                value: other.to_string(),
                supported: "resnet50, mobilenet_v3, efficientnet_b0",
            }),
        }
    }
}

impl fmt::Display for BackboneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque feature extractor: image tensor in, fixed-length vector out.
pub trait Backbone: Send + Sync {
    /// Extract a feature vector of length [`Backbone::feature_dim`].
    fn features(&self, image: &Array3<f32>) -> Array1<f32>;

    /// Length of the produced feature vector.
    fn feature_dim(&self) -> usize;

    /// Backbone identity tag.
    fn kind(&self) -> BackboneKind;
}

/// Deterministic grid-pooling extractor.
///
/// Divides the image into a square grid and emits per-cell, per-channel mean
/// and standard deviation, flattened to the backbone's feature dimension.
pub struct GridPoolBackbone {
    kind: BackboneKind,
    grid: usize,
}

impl GridPoolBackbone {
    pub fn new(kind: BackboneKind) -> Self {
        // Smallest grid whose 6 stats per cell cover the feature dimension.
        let mut grid = 1;
        while 6 * grid * grid < kind.feature_dim() {
            grid += 1;
        }
        Self { kind, grid }
    }
}

impl Backbone for GridPoolBackbone {
    fn features(&self, image: &Array3<f32>) -> Array1<f32> {
        let (channels, height, width) = image.dim();
        let dim = self.feature_dim();
        let mut out = Vec::with_capacity(6 * self.grid * self.grid);

        for gy in 0..self.grid {
            let y0 = gy * height / self.grid;
            let y1 = ((gy + 1) * height / self.grid).max(y0 + 1).min(height);
            for gx in 0..self.grid {
                let x0 = gx * width / self.grid;
                let x1 = ((gx + 1) * width / self.grid).max(x0 + 1).min(width);
                for c in 0..channels {
                    let mut sum = 0.0f32;
                    let mut sum_sq = 0.0f32;
                    let mut count = 0usize;
                    for y in y0..y1 {
                        for x in x0..x1 {
                            let v = image[[c, y, x]];
                            sum += v;
                            sum_sq += v * v;
                            count += 1;
                        }
                    }
                    let mean = sum / count as f32;
                    let var = (sum_sq / count as f32 - mean * mean).max(0.0);
                    out.push(mean);
                    out.push(var.sqrt());
                }
            }
        }

        out.resize(dim, 0.0);
        Array1::from_vec(out)
    }

    fn feature_dim(&self) -> usize {
        self.kind.feature_dim()
    }

    fn kind(&self) -> BackboneKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::transform::IMAGE_SIZE;

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in [
            BackboneKind::Resnet50,
            BackboneKind::MobilenetV3,
            BackboneKind::EfficientnetB0,
        ] {
            assert_eq!(kind.as_str().parse::<BackboneKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_kind_fails_fast() {
        let err = "vgg16".parse::<BackboneKind>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedConfig { field: "backbone", .. }));
    }

    #[test]
    fn test_feature_vector_has_declared_dim() {
        for kind in [
            BackboneKind::Resnet50,
            BackboneKind::MobilenetV3,
            BackboneKind::EfficientnetB0,
        ] {
            let backbone = GridPoolBackbone::new(kind);
            let image = Array3::<f32>::zeros((3, IMAGE_SIZE, IMAGE_SIZE));
            assert_eq!(backbone.features(&image).len(), kind.feature_dim());
        }
    }

    #[test]
    fn test_features_are_deterministic() {
        let backbone = GridPoolBackbone::new(BackboneKind::Resnet50);
        let mut image = Array3::<f32>::zeros((3, IMAGE_SIZE, IMAGE_SIZE));
        image[[0, 10, 10]] = 1.0;
        image[[2, 100, 200]] = -0.5;

        let a = backbone.features(&image);
        let b = backbone.features(&image);
        assert_eq!(a, b);
    }

    #[test]
    fn test_features_depend_on_content() {
        let backbone = GridPoolBackbone::new(BackboneKind::MobilenetV3);
        let zeros = Array3::<f32>::zeros((3, IMAGE_SIZE, IMAGE_SIZE));
        let mut other = zeros.clone();
        other[[1, 50, 50]] = 3.0;

        assert_ne!(backbone.features(&zeros), backbone.features(&other));
    }
}
