//! Model seam: backbone, regression head, image transform
//!
//! Training and serving consume the model only through the [`Learner`]
//! trait. The backbone is an opaque feature extractor behind [`Backbone`];
//! the head is the only trainable piece.

mod backbone;
mod head;
mod learner;
pub mod transform;

pub use backbone::{Backbone, BackboneKind, GridPoolBackbone};
pub use head::RegressionHead;
pub use learner::{AestheticModel, Learner, ModelInfo};
pub use transform::{ImageTransform, IMAGENET_MEAN, IMAGENET_STD, IMAGE_SIZE};
