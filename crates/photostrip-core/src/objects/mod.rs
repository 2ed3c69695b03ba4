//! Placed objects: stickers and text sharing one geometry envelope.

mod sticker;
mod stroke;
mod text;

pub use sticker::StickerData;
pub use stroke::FreehandStroke;
pub use text::{
    ApproximateMeasurer, FontSpec, MIN_FONT_SIZE, TextAlign, TextData, TextMeasurer, TextOutline, TextProperty,
    TextShadow, TextStyle,
};

use crate::geometry::{ObjectBox, point_in_rotated_rect};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for placed objects.
pub type ObjectId = Uuid;

/// Which collection (draw layer) an object lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layer {
    Stickers,
    Texts,
}

/// Variant payload of a placed object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectKind {
    Sticker(StickerData),
    Text(TextData),
}

/// A sticker or text object on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedObject {
    pub(crate) id: ObjectId,
    /// Unrotated box and rotation.
    pub bbox: ObjectBox,
    /// Variant data.
    pub kind: ObjectKind,
}

impl PlacedObject {
    /// Create a sticker with a fresh id.
    pub fn sticker(bbox: ObjectBox, data: StickerData) -> Self {
        Self {
            id: Uuid::new_v4(),
            bbox,
            kind: ObjectKind::Sticker(data),
        }
    }

    /// Create a text object with a fresh id. The box is measured immediately.
    pub fn text(origin: Point, data: TextData, measurer: &dyn TextMeasurer) -> Self {
        let mut object = Self {
            id: Uuid::new_v4(),
            bbox: ObjectBox::new(origin.x, origin.y, 0.0, 0.0),
            kind: ObjectKind::Text(data),
        };
        object.remeasure(measurer);
        object
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn layer(&self) -> Layer {
        match self.kind {
            ObjectKind::Sticker(_) => Layer::Stickers,
            ObjectKind::Text(_) => Layer::Texts,
        }
    }

    pub fn as_sticker(&self) -> Option<&StickerData> {
        match &self.kind {
            ObjectKind::Sticker(s) => Some(s),
            ObjectKind::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextData> {
        match &self.kind {
            ObjectKind::Text(t) => Some(t),
            ObjectKind::Sticker(_) => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut TextData> {
        match &mut self.kind {
            ObjectKind::Text(t) => Some(t),
            ObjectKind::Sticker(_) => None,
        }
    }

    /// Check if a canvas point hits this object's rotated box.
    pub fn hit_test(&self, point: Point) -> bool {
        point_in_rotated_rect(point, &self.bbox)
    }

    /// Re-derive the box size of a text object from its content and font.
    /// Stickers are left unchanged.
    pub fn remeasure(&mut self, measurer: &dyn TextMeasurer) {
        if let ObjectKind::Text(text) = &self.kind {
            let (width, height) = text.measure(measurer);
            self.bbox.width = width;
            self.bbox.height = height;
        }
    }
}
