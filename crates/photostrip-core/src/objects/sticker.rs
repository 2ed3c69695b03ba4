//! Sticker payload.

use crate::assets::AssetRef;
use crate::geometry::MIN_BOX_SIZE;
use serde::{Deserialize, Serialize};

/// An image sticker. The intrinsic size fixes the aspect ratio for resizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StickerData {
    /// Image source.
    pub source: AssetRef,
    /// Intrinsic image width in pixels.
    original_width: f64,
    /// Intrinsic image height in pixels.
    original_height: f64,
}

impl StickerData {
    pub fn new(source: AssetRef, original_width: f64, original_height: f64) -> Self {
        Self {
            source,
            original_width: original_width.max(1.0),
            original_height: original_height.max(1.0),
        }
    }

    pub fn original_width(&self) -> f64 {
        self.original_width
    }

    pub fn original_height(&self) -> f64 {
        self.original_height
    }

    /// Intrinsic width / height.
    pub fn aspect_ratio(&self) -> f64 {
        self.original_width / self.original_height
    }

    /// Apply the sticker resize policy to a free-form `(width, height)`.
    ///
    /// The dimension that changed more relative to `(old_width, old_height)`
    /// drives the other through the intrinsic aspect ratio; ties go to width.
    /// Both results stay at or above [`MIN_BOX_SIZE`].
    pub fn constrain_size(
        &self,
        old_width: f64,
        old_height: f64,
        width: f64,
        height: f64,
    ) -> (f64, f64) {
        let aspect = self.aspect_ratio();
        let (mut w, mut h) = if (width - old_width).abs() >= (height - old_height).abs() {
            (width, width / aspect)
        } else {
            (height * aspect, height)
        };
        if w < MIN_BOX_SIZE {
            w = MIN_BOX_SIZE;
            h = w / aspect;
        }
        if h < MIN_BOX_SIZE {
            h = MIN_BOX_SIZE;
            w = h * aspect;
        }
        (w, h)
    }
}
