//! Scene document: photo slots, placed objects, strokes and selection.

use crate::assets::AssetRef;
use crate::color::SerializableColor;
use crate::geometry::ObjectBox;
use crate::layout::{LayoutConfig, SessionError};
use crate::objects::{
    FreehandStroke, Layer, ObjectId, PlacedObject, StickerData, TextData, TextMeasurer,
    TextProperty, TextStyle,
};
use kurbo::{Point, Rect, Size};
use thiserror::Error;

/// Width given to a newly added sticker, before clamping to the canvas.
pub const DEFAULT_STICKER_WIDTH: f64 = 120.0;

/// Scene editing errors. None of these are fatal; the scene is left unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    #[error("Nothing is selected")]
    NothingSelected,
    #[error("The selected object is not in the {expected:?} layer")]
    WrongKind { expected: Layer },
    #[error("No object with id {0}")]
    UnknownObject(ObjectId),
    #[error("Invalid value {value:?} for text property {name}")]
    InvalidProperty { name: String, value: String },
    #[error("Unknown text property: {0}")]
    UnknownProperty(String),
    #[error("No frame at index {index} ({available} available)")]
    UnknownFrame { index: usize, available: usize },
}

/// A fixed photo rectangle bound to one captured photo by index.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoSlot {
    pub index: usize,
    pub rect: Rect,
    /// `None` when fewer photos than slots were captured.
    pub photo: Option<AssetRef>,
}

/// Color and width used for new freehand strokes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brush {
    pub color: SerializableColor,
    pub width: f64,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            color: SerializableColor::black(),
            width: 5.0,
        }
    }
}

/// The editable composition.
#[derive(Debug, Clone)]
pub struct Scene {
    canvas_size: Size,
    background: SerializableColor,
    frame: Option<AssetRef>,
    frames: Vec<AssetRef>,
    slots: Vec<PhotoSlot>,
    /// Back to front.
    stickers: Vec<PlacedObject>,
    /// Back to front.
    texts: Vec<PlacedObject>,
    strokes: Vec<FreehandStroke>,
    selected: Option<(Layer, ObjectId)>,
    draw_mode: bool,
    brush: Brush,
    /// The last stroke is still receiving points.
    drawing: bool,
}

impl Scene {
    /// Create an empty scene with no photo slots.
    pub fn new(canvas_size: Size, background: SerializableColor) -> Self {
        Self {
            canvas_size,
            background,
            frame: None,
            frames: Vec::new(),
            slots: Vec::new(),
            stickers: Vec::new(),
            texts: Vec::new(),
            strokes: Vec::new(),
            selected: None,
            draw_mode: false,
            brush: Brush::default(),
            drawing: false,
        }
    }

    /// Build the scene for a layout, binding slot `i` to photo `i`.
    pub fn from_layout(layout: &LayoutConfig, photos: &[AssetRef]) -> Result<Self, SessionError> {
        layout.validate()?;
        if photos.is_empty() {
            return Err(SessionError::NoPhotos);
        }
        if photos.len() < layout.slots.len() {
            log::warn!(
                "Layout {} has {} slots but only {} photos",
                layout.name,
                layout.slots.len(),
                photos.len()
            );
        }
        let mut scene = Self::new(layout.canvas_size(), layout.background);
        scene.frames = layout.frames.clone();
        scene.slots = layout
            .slots
            .iter()
            .enumerate()
            .map(|(index, slot)| PhotoSlot {
                index,
                rect: slot.to_rect(),
                photo: photos.get(index).cloned(),
            })
            .collect();
        Ok(scene)
    }

    pub fn canvas_size(&self) -> Size {
        self.canvas_size
    }

    pub fn canvas_rect(&self) -> Rect {
        self.canvas_size.to_rect()
    }

    pub fn background(&self) -> SerializableColor {
        self.background
    }

    pub fn frame(&self) -> Option<&AssetRef> {
        self.frame.as_ref()
    }

    /// Selectable frame overlays from the layout.
    pub fn frames(&self) -> &[AssetRef] {
        &self.frames
    }

    /// Choose a frame overlay by index into [`Scene::frames`], or none.
    pub fn select_frame(&mut self, index: Option<usize>) -> Result<(), SceneError> {
        self.frame = match index {
            None => None,
            Some(index) => Some(self.frames.get(index).cloned().ok_or(SceneError::UnknownFrame {
                index,
                available: self.frames.len(),
            })?),
        };
        log::debug!("Frame set to {:?}", self.frame);
        Ok(())
    }

    pub fn slots(&self) -> &[PhotoSlot] {
        &self.slots
    }

    pub fn stickers(&self) -> &[PlacedObject] {
        &self.stickers
    }

    pub fn texts(&self) -> &[PlacedObject] {
        &self.texts
    }

    pub fn strokes(&self) -> &[FreehandStroke] {
        &self.strokes
    }

    pub fn brush(&self) -> Brush {
        self.brush
    }

    pub fn is_draw_mode(&self) -> bool {
        self.draw_mode
    }

    /// Whether a stroke is currently being drawn.
    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    fn layer(&self, layer: Layer) -> &Vec<PlacedObject> {
        match layer {
            Layer::Stickers => &self.stickers,
            Layer::Texts => &self.texts,
        }
    }

    fn layer_mut(&mut self, layer: Layer) -> &mut Vec<PlacedObject> {
        match layer {
            Layer::Stickers => &mut self.stickers,
            Layer::Texts => &mut self.texts,
        }
    }

    fn locate(&self, id: ObjectId) -> Option<(Layer, usize)> {
        [Layer::Stickers, Layer::Texts].into_iter().find_map(|layer| {
            self.layer(layer)
                .iter()
                .position(|o| o.id == id)
                .map(|index| (layer, index))
        })
    }

    pub fn object(&self, id: ObjectId) -> Option<&PlacedObject> {
        let (layer, index) = self.locate(id)?;
        self.layer(layer).get(index)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut PlacedObject> {
        let (layer, index) = self.locate(id)?;
        self.layer_mut(layer).get_mut(index)
    }

    /// Center a box of the given size on the canvas.
    fn centered_origin(&self, width: f64, height: f64) -> Point {
        Point::new(
            (self.canvas_size.width - width) / 2.0,
            (self.canvas_size.height - height) / 2.0,
        )
    }

    fn push_selected(&mut self, object: PlacedObject) -> ObjectId {
        let id = object.id;
        let layer = object.layer();
        self.layer_mut(layer).push(object);
        self.selected = Some((layer, id));
        id
    }

    /// Add a sticker centered on the canvas and select it.
    pub fn add_sticker(
        &mut self,
        source: AssetRef,
        original_width: f64,
        original_height: f64,
    ) -> ObjectId {
        let data = StickerData::new(source, original_width, original_height);
        let width = DEFAULT_STICKER_WIDTH.min(self.canvas_size.width);
        let height = width / data.aspect_ratio();
        let (width, height) = data.constrain_size(width, height, width, height);
        let origin = self.centered_origin(width, height);
        log::debug!("Adding sticker {} at {:?}", data.source, origin);
        let bbox = ObjectBox::new(origin.x, origin.y, width, height);
        self.push_selected(PlacedObject::sticker(bbox, data))
    }

    /// Add a text object centered on the canvas and select it.
    pub fn add_text(
        &mut self,
        content: impl Into<String>,
        style: TextStyle,
        measurer: &dyn TextMeasurer,
    ) -> ObjectId {
        let mut object = PlacedObject::text(Point::ORIGIN, TextData::new(content, style), measurer);
        let origin = self.centered_origin(object.bbox.width, object.bbox.height);
        object.bbox.x = origin.x;
        object.bbox.y = origin.y;
        log::debug!("Adding text at {:?}", origin);
        self.push_selected(object)
    }

    /// Select an object and move it to the end of its collection.
    pub fn select(&mut self, id: ObjectId) -> Result<(), SceneError> {
        let (layer, index) = self.locate(id).ok_or(SceneError::UnknownObject(id))?;
        let objects = self.layer_mut(layer);
        let object = objects.remove(index);
        objects.push(object);
        self.selected = Some((layer, id));
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected_id(&self) -> Option<ObjectId> {
        self.selected.map(|(_, id)| id)
    }

    pub fn selected(&self) -> Option<&PlacedObject> {
        let (layer, id) = self.selected?;
        self.layer(layer).iter().find(|o| o.id == id)
    }

    pub fn selected_mut(&mut self) -> Option<&mut PlacedObject> {
        let (layer, id) = self.selected?;
        self.layer_mut(layer).iter_mut().find(|o| o.id == id)
    }

    fn remove_selected_in(&mut self, expected: Option<Layer>) -> Result<PlacedObject, SceneError> {
        let result = match self.selected {
            None => Err(SceneError::NothingSelected),
            Some((layer, id)) => match expected {
                Some(expected) if expected != layer => Err(SceneError::WrongKind { expected }),
                _ => {
                    let objects = self.layer_mut(layer);
                    match objects.iter().position(|o| o.id == id) {
                        Some(index) => {
                            let removed = objects.remove(index);
                            self.selected = None;
                            log::debug!("Removed {:?} object {}", layer, id);
                            Ok(removed)
                        }
                        None => Err(SceneError::UnknownObject(id)),
                    }
                }
            },
        };
        if let Err(err) = &result {
            log::info!("Remove ignored: {}", err);
        }
        result
    }

    /// Remove the selected object, whatever its kind.
    pub fn remove_selected(&mut self) -> Result<PlacedObject, SceneError> {
        self.remove_selected_in(None)
    }

    /// Remove the selected object if it is a sticker.
    pub fn remove_selected_sticker(&mut self) -> Result<PlacedObject, SceneError> {
        self.remove_selected_in(Some(Layer::Stickers))
    }

    /// Remove the selected object if it is a text.
    pub fn remove_selected_text(&mut self) -> Result<PlacedObject, SceneError> {
        self.remove_selected_in(Some(Layer::Texts))
    }

    /// Edit one property of the selected text and re-measure its box.
    pub fn set_text_property(
        &mut self,
        property: TextProperty,
        measurer: &dyn TextMeasurer,
    ) -> Result<(), SceneError> {
        let object = self.selected_mut().ok_or(SceneError::NothingSelected)?;
        let text = object.as_text_mut().ok_or(SceneError::WrongKind {
            expected: Layer::Texts,
        })?;
        text.apply(property);
        object.remeasure(measurer);
        Ok(())
    }

    /// Move the selected object's unrotated top-left corner.
    pub fn set_selected_position(&mut self, origin: Point) -> Result<(), SceneError> {
        let object = self.selected_mut().ok_or(SceneError::NothingSelected)?;
        object.bbox.x = origin.x;
        object.bbox.y = origin.y;
        Ok(())
    }

    /// Set the selected object's rotation in radians.
    pub fn set_selected_angle(&mut self, angle: f64) -> Result<(), SceneError> {
        let object = self.selected_mut().ok_or(SceneError::NothingSelected)?;
        object.bbox.angle = angle;
        Ok(())
    }

    /// Topmost object under a canvas point. Texts sit above stickers.
    pub fn hit_test(&self, point: Point) -> Option<ObjectId> {
        self.texts
            .iter()
            .rev()
            .chain(self.stickers.iter().rev())
            .find(|o| o.hit_test(point))
            .map(|o| o.id)
    }

    /// Re-derive every text box from its content and font.
    pub fn remeasure_texts(&mut self, measurer: &dyn TextMeasurer) {
        for text in &mut self.texts {
            text.remeasure(measurer);
        }
    }

    pub fn set_brush(&mut self, color: SerializableColor, width: f64) {
        self.brush = Brush {
            color,
            width: width.max(1.0),
        };
    }

    /// Start a new stroke with the current brush.
    pub fn begin_stroke(&mut self, point: Point) {
        self.strokes
            .push(FreehandStroke::new(self.brush.color, self.brush.width, point));
        self.drawing = true;
    }

    /// Append a point to the stroke in progress. Returns `false` if none is.
    pub fn extend_stroke(&mut self, point: Point) -> bool {
        if !self.drawing {
            return false;
        }
        match self.strokes.last_mut() {
            Some(stroke) => {
                stroke.add_point(point);
                true
            }
            None => false,
        }
    }

    /// Finish the stroke in progress. It stays in the scene.
    pub fn end_stroke(&mut self) -> bool {
        std::mem::replace(&mut self.drawing, false)
    }

    pub fn clear_strokes(&mut self) {
        self.strokes.clear();
        self.drawing = false;
    }

    pub fn set_draw_mode(&mut self, on: bool) {
        if !on {
            self.end_stroke();
        }
        self.draw_mode = on;
        log::debug!("Draw mode {}", if on { "on" } else { "off" });
    }

    /// Flip draw mode and return the new value.
    pub fn toggle_draw_mode(&mut self) -> bool {
        self.set_draw_mode(!self.draw_mode);
        self.draw_mode
    }
}
