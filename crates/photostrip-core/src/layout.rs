//! Layout and session configuration.
//!
//! A layout fixes the canvas size, the photo slot rectangles, the default
//! background and the selectable frame overlays. A session config bundles the
//! layout with the sticker and font catalogs.

use crate::assets::AssetRef;
use crate::color::SerializableColor;
use crate::objects::TextStyle;
use kurbo::{Rect, Size};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Layout validation and parsing errors.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Canvas size must be non-zero, got {width}x{height}")]
    EmptyCanvas { width: u32, height: u32 },
    #[error("Layout has no photo slots")]
    NoSlots,
    #[error("Photo slot {index} has non-positive size")]
    DegenerateSlot { index: usize },
    #[error("Photo slot {index} lies outside the {width}x{height} canvas")]
    SlotOutOfBounds { index: usize, width: u32, height: u32 },
    #[error("Invalid layout JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Why an editing session cannot start. The UI shows a "go back and
/// capture" screen for all of these.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No photos were captured")]
    NoPhotos,
    #[error("Invalid layout: {0}")]
    InvalidLayout(#[from] LayoutError),
}

/// A fixed photo rectangle in canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlotRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl SlotRect {
    pub fn to_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }
}

fn default_background() -> SerializableColor {
    SerializableColor::white()
}

/// Canvas layout descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub name: String,
    /// Canvas width in device pixels.
    pub width: u32,
    /// Canvas height in device pixels.
    pub height: u32,
    /// Photo slots in capture order.
    pub slots: Vec<SlotRect>,
    #[serde(default = "default_background")]
    pub background: SerializableColor,
    /// Selectable frame overlays.
    #[serde(default)]
    pub frames: Vec<AssetRef>,
}

impl LayoutConfig {
    pub fn canvas_size(&self) -> Size {
        Size::new(self.width as f64, self.height as f64)
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.width == 0 || self.height == 0 {
            return Err(LayoutError::EmptyCanvas {
                width: self.width,
                height: self.height,
            });
        }
        if self.slots.is_empty() {
            return Err(LayoutError::NoSlots);
        }
        let canvas = Rect::new(0.0, 0.0, self.width as f64, self.height as f64);
        for (index, slot) in self.slots.iter().enumerate() {
            if slot.width <= 0.0 || slot.height <= 0.0 {
                return Err(LayoutError::DegenerateSlot { index });
            }
            let rect = slot.to_rect();
            if rect.x0 < canvas.x0 || rect.y0 < canvas.y0 || rect.x1 > canvas.x1 || rect.y1 > canvas.y1 {
                return Err(LayoutError::SlotOutOfBounds {
                    index,
                    width: self.width,
                    height: self.height,
                });
            }
        }
        Ok(())
    }
}

/// Font families offered for text, plus the style new text starts with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FontCatalog {
    #[serde(default)]
    pub families: Vec<String>,
    #[serde(default)]
    pub default_style: TextStyle,
}

/// Everything a session needs besides the photos themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub layout: LayoutConfig,
    /// Selectable sticker images.
    #[serde(default)]
    pub stickers: Vec<AssetRef>,
    #[serde(default)]
    pub fonts: FontCatalog,
}

impl SessionConfig {
    /// Parse and validate a session config.
    pub fn from_json(json: &str) -> Result<Self, LayoutError> {
        let config: Self = serde_json::from_str(json)?;
        config.layout.validate()?;
        Ok(config)
    }

    /// Check that an editing session can start with `photo_count` photos.
    pub fn check_session(&self, photo_count: usize) -> Result<(), SessionError> {
        self.layout.validate()?;
        if photo_count == 0 {
            return Err(SessionError::NoPhotos);
        }
        Ok(())
    }
}
