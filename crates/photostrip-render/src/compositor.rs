//! Scene compositing in a fixed layer order.
//!
//! Layers, bottom to top: background fill, frame overlay, photo slots,
//! stickers, texts, strokes, selection chrome. Preview and export share this
//! code; export only turns the chrome off.

use kurbo::{Affine, BezPath, Cap, Circle, Join, Line, Point, Rect, Shape, Stroke};
use peniko::Color;
use photostrip_core::assets::{AssetRef, AssetState, AssetStore};
use photostrip_core::geometry::{Corner, HANDLE_SIZE, ROTATE_HANDLE_OFFSET};
use photostrip_core::objects::{FreehandStroke, PlacedObject, TextData};
use photostrip_core::scene::Scene;

use crate::raster::RasterImage;
use crate::surface::{Surface, TextRun};

/// Selection highlight color.
const SELECTION_COLOR: Color = Color::from_rgba8(59, 130, 246, 255);
const PLACEHOLDER_FILL: Color = Color::from_rgba8(200, 200, 200, 255);
const PLACEHOLDER_GLYPH: Color = Color::from_rgba8(150, 150, 150, 255);
const PLACEHOLDER_BORDER: Color = Color::from_rgba8(100, 100, 100, 255);

/// Per-pass options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Draw selection chrome for the selected object.
    pub show_selection: bool,
}

impl RenderOptions {
    /// Live preview: chrome on.
    pub fn preview() -> Self {
        Self { show_selection: true }
    }

    /// Export: chrome off.
    pub fn export() -> Self {
        Self {
            show_selection: false,
        }
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::preview()
    }
}

/// Draws a scene using the decoded assets available so far.
pub struct Compositor<'a> {
    assets: &'a AssetStore<RasterImage>,
}

enum Resolved<'a> {
    Ready(&'a RasterImage),
    Failed,
    Missing,
}

impl<'a> Compositor<'a> {
    pub fn new(assets: &'a AssetStore<RasterImage>) -> Self {
        Self { assets }
    }

    fn resolve(&self, asset: &AssetRef) -> Resolved<'a> {
        match self.assets.state(asset) {
            Some(AssetState::Ready(image)) => Resolved::Ready(image),
            Some(AssetState::Failed(_)) => Resolved::Failed,
            Some(AssetState::Pending) | None => Resolved::Missing,
        }
    }

    /// Draw the whole scene. Reads the scene only; repeated calls give the same output.
    pub fn render(&self, scene: &Scene, surface: &mut dyn Surface, options: RenderOptions) {
        log::debug!(
            "Render pass: {} slots, {} stickers, {} texts, {} strokes",
            scene.slots().len(),
            scene.stickers().len(),
            scene.texts().len(),
            scene.strokes().len()
        );

        surface.fill_rect(scene.canvas_rect(), Affine::IDENTITY, scene.background().into());

        if let Some(frame) = scene.frame() {
            // A failed frame keeps the flat fill.
            if let Resolved::Ready(image) = self.resolve(frame) {
                surface.draw_image(image, scene.canvas_rect(), Affine::IDENTITY);
            }
        }

        for slot in scene.slots() {
            let Some(photo) = &slot.photo else {
                continue;
            };
            match self.resolve(photo) {
                Resolved::Ready(image) => surface.draw_image(image, slot.rect, Affine::IDENTITY),
                Resolved::Failed => draw_placeholder(surface, slot.rect, Affine::IDENTITY),
                Resolved::Missing => {}
            }
        }

        for sticker in scene.stickers() {
            self.draw_sticker(surface, sticker);
        }

        for text in scene.texts() {
            if let Some(data) = text.as_text() {
                draw_text(surface, text, data);
            }
        }

        for stroke in scene.strokes() {
            draw_stroke(surface, stroke);
        }

        if options.show_selection && !scene.is_draw_mode() {
            if let Some(selected) = scene.selected() {
                draw_selection(surface, selected);
            }
        }
    }

    fn draw_sticker(&self, surface: &mut dyn Surface, object: &PlacedObject) {
        let Some(sticker) = object.as_sticker() else {
            return;
        };
        let transform = object.bbox.transform();
        match self.resolve(&sticker.source) {
            Resolved::Ready(image) => surface.draw_image(image, object.bbox.rect(), transform),
            Resolved::Failed => draw_placeholder(surface, object.bbox.rect(), transform),
            Resolved::Missing => {}
        }
    }
}

/// Grey box with an X, for images that failed to load.
fn draw_placeholder(surface: &mut dyn Surface, rect: Rect, transform: Affine) {
    surface.fill_rect(rect, transform, PLACEHOLDER_FILL);

    let stroke = Stroke::new(2.0);
    let mut x_path = BezPath::new();
    x_path.move_to(Point::new(rect.x0, rect.y0));
    x_path.line_to(Point::new(rect.x1, rect.y1));
    x_path.move_to(Point::new(rect.x1, rect.y0));
    x_path.line_to(Point::new(rect.x0, rect.y1));
    surface.stroke_path(&x_path, transform, &stroke, PLACEHOLDER_GLYPH);

    surface.stroke_path(&rect.to_path(0.1), transform, &stroke, PLACEHOLDER_BORDER);
}

fn draw_text(surface: &mut dyn Surface, object: &PlacedObject, text: &TextData) {
    let style = &text.style;
    log::trace!("Drawing text {:?} in {}", text.content, text.font().css());
    let bbox = &object.bbox;
    let transform = bbox.transform();
    let run = TextRun {
        font: text.font(),
        content: text.content.clone(),
        anchor: Point::new(
            bbox.x + style.align.anchor_offset(bbox.width),
            bbox.y + bbox.height / 2.0,
        ),
        align: style.align,
    };

    if style.outline.width > 0.0 {
        surface.stroke_text(&run, transform, style.outline.color.into(), style.outline.width);
    }

    let shadow = style.shadow.is_visible().then_some(&style.shadow);
    surface.fill_text(&run, transform, style.color.into(), shadow);

    if style.underline {
        let width = surface.measure_text(&run.font, &run.content);
        let left = run.anchor.x - style.align.anchor_offset(width);
        let thickness = (style.size / 15.0).max(1.0);
        let top = run.anchor.y + style.size * 0.4;
        let line = Rect::new(left, top, left + width, top + thickness);
        surface.fill_rect(line, transform, style.color.into());
    }
}

fn draw_stroke(surface: &mut dyn Surface, stroke: &FreehandStroke) {
    let color: Color = stroke.color.into();
    match stroke.points() {
        [] => {}
        [dot] => {
            let circle = Circle::new(*dot, stroke.width / 2.0);
            surface.fill_path(&circle.to_path(0.1), Affine::IDENTITY, color);
        }
        _ => {
            let style = Stroke::new(stroke.width)
                .with_caps(Cap::Round)
                .with_join(Join::Round);
            surface.stroke_path(&stroke.to_path(), Affine::IDENTITY, &style, color);
        }
    }
}

/// Dashed outline, corner handles and the rotate handle, under the object's rotation.
fn draw_selection(surface: &mut dyn Surface, object: &PlacedObject) {
    let bbox = &object.bbox;
    let transform = bbox.transform();
    let rect = bbox.rect();

    let dashed = Stroke::new(2.0).with_dashes(0.0, [6.0, 4.0]);
    surface.stroke_path(&rect.to_path(0.1), transform, &dashed, SELECTION_COLOR);

    let border = Stroke::new(1.5);
    for corner in Corner::ALL {
        let handle = Rect::from_center_size(bbox.local_corner(corner), (HANDLE_SIZE, HANDLE_SIZE));
        surface.fill_rect(handle, transform, Color::WHITE);
        surface.stroke_path(&handle.to_path(0.1), transform, &border, SELECTION_COLOR);
    }

    let knob = bbox.local_rotate_handle();
    let radius = HANDLE_SIZE / 2.0;
    let top_mid = Point::new(knob.x, bbox.y);
    let stem = Line::new(top_mid, Point::new(knob.x, bbox.y - ROTATE_HANDLE_OFFSET + radius));
    surface.stroke_path(&stem.to_path(0.1), transform, &border, SELECTION_COLOR);
    let circle = Circle::new(knob, radius).to_path(0.1);
    surface.fill_path(&circle, transform, Color::WHITE);
    surface.stroke_path(&circle, transform, &border, SELECTION_COLOR);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::FontBook;
    use crate::raster::PixmapSurface;
    use crate::surface::recording::{rgba, DrawCall, RecordingSurface};
    use photostrip_core::assets::AssetError;
    use photostrip_core::color::SerializableColor;
    use photostrip_core::layout::{LayoutConfig, SlotRect};
    use photostrip_core::objects::{ApproximateMeasurer, TextProperty, TextStyle};
    use std::sync::Arc;

    fn solid(r: u8, g: u8, b: u8) -> RasterImage {
        RasterImage::solid(4, 4, Color::from_rgba8(r, g, b, 255)).unwrap()
    }

    fn three_slot_layout() -> LayoutConfig {
        LayoutConfig {
            name: "strip".into(),
            width: 100,
            height: 300,
            slots: (0..3)
                .map(|i| SlotRect {
                    x: 10.0,
                    y: 10.0 + i as f64 * 100.0,
                    width: 80.0,
                    height: 80.0,
                })
                .collect(),
            background: SerializableColor::new(255, 255, 255, 255),
            frames: vec![AssetRef::new("frame.png")],
        }
    }

    fn photos() -> Vec<AssetRef> {
        (0..3).map(|i| AssetRef::new(format!("p{i}.png"))).collect()
    }

    fn ready_assets() -> AssetStore<RasterImage> {
        let mut assets = AssetStore::new();
        assets.insert_ready(AssetRef::new("p0.png"), solid(255, 0, 0));
        assets.insert_ready(AssetRef::new("p1.png"), solid(0, 255, 0));
        assets.insert_ready(AssetRef::new("p2.png"), solid(0, 0, 255));
        assets
    }

    fn images(calls: &[DrawCall]) -> Vec<Rect> {
        calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::Image { dest, .. } => Some(*dest),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_layer_order() {
        let mut scene = Scene::from_layout(&three_slot_layout(), &photos()).unwrap();
        scene.select_frame(Some(0)).unwrap();
        let mut assets = ready_assets();
        assets.insert_ready(AssetRef::new("frame.png"), solid(9, 9, 9));
        assets.insert_ready(AssetRef::new("star.png"), solid(1, 2, 3));
        scene.add_sticker(AssetRef::new("star.png"), 4.0, 4.0);
        scene.add_text("Hi", TextStyle::default(), &ApproximateMeasurer);
        scene.begin_stroke(Point::new(1.0, 1.0));
        scene.extend_stroke(Point::new(5.0, 5.0));
        scene.end_stroke();

        let mut surface = RecordingSurface::new(100.0, 300.0);
        Compositor::new(&assets).render(&scene, &mut surface, RenderOptions::preview());
        let calls = &surface.calls;

        assert!(matches!(calls[0], DrawCall::FillRect { color: [255, 255, 255, 255], .. }));
        // Frame, three photos, then the sticker.
        let dests = images(calls);
        assert_eq!(dests.len(), 5);
        assert_eq!(dests[0], Rect::new(0.0, 0.0, 100.0, 300.0));
        assert_eq!(dests[1], Rect::new(10.0, 10.0, 90.0, 90.0));
        assert_eq!(dests[3], Rect::new(10.0, 210.0, 90.0, 290.0));

        let text_at = calls.iter().position(|c| matches!(c, DrawCall::FillText { .. })).unwrap();
        let sticker_at = calls.iter().rposition(|c| matches!(c, DrawCall::Image { .. })).unwrap();
        let stroke_at = calls
            .iter()
            .position(|c| matches!(c, DrawCall::StrokePath { width, .. } if *width == 5.0))
            .unwrap();
        let chrome_at = calls
            .iter()
            .position(|c| matches!(c, DrawCall::StrokePath { dashed: true, .. }))
            .unwrap();
        assert!(sticker_at < text_at);
        assert!(text_at < stroke_at);
        assert!(stroke_at < chrome_at);
    }

    #[test]
    fn test_export_options_hide_chrome() {
        let mut scene = Scene::from_layout(&three_slot_layout(), &photos()).unwrap();
        scene.add_text("Hi", TextStyle::default(), &ApproximateMeasurer);
        let assets = ready_assets();
        let mut surface = RecordingSurface::new(100.0, 300.0);
        Compositor::new(&assets).render(&scene, &mut surface, RenderOptions::export());
        assert!(!surface
            .calls
            .iter()
            .any(|c| matches!(c, DrawCall::StrokePath { dashed: true, .. })));
        assert!(scene.selected_id().is_some());
    }

    #[test]
    fn test_draw_mode_hides_chrome() {
        let mut scene = Scene::from_layout(&three_slot_layout(), &photos()).unwrap();
        scene.add_text("Hi", TextStyle::default(), &ApproximateMeasurer);
        scene.set_draw_mode(true);
        let assets = ready_assets();
        let mut surface = RecordingSurface::new(100.0, 300.0);
        Compositor::new(&assets).render(&scene, &mut surface, RenderOptions::preview());
        assert!(!surface
            .calls
            .iter()
            .any(|c| matches!(c, DrawCall::StrokePath { dashed: true, .. })));
    }

    #[test]
    fn test_pending_assets_are_skipped_and_failed_ones_get_placeholders() {
        let mut scene = Scene::from_layout(&three_slot_layout(), &photos()).unwrap();
        scene.select_frame(Some(0)).unwrap();
        let mut assets = AssetStore::new();
        assets.request(&AssetRef::new("frame.png"));
        assets.request(&AssetRef::new("p0.png"));
        assets.insert_ready(AssetRef::new("p1.png"), solid(0, 255, 0));
        assets.request(&AssetRef::new("p2.png"));
        assets.resolve(
            AssetRef::new("p2.png"),
            Err(AssetError::NotFound("p2.png".into())),
        );

        let mut surface = RecordingSurface::new(100.0, 300.0);
        Compositor::new(&assets).render(&scene, &mut surface, RenderOptions::export());
        assert_eq!(images(&surface.calls), vec![Rect::new(10.0, 110.0, 90.0, 190.0)]);
        assert!(surface.calls.contains(&DrawCall::FillRect {
            rect: Rect::new(10.0, 210.0, 90.0, 290.0),
            transform: Affine::IDENTITY,
            color: rgba(PLACEHOLDER_FILL),
        }));
    }

    #[test]
    fn test_text_draw_order() {
        let mut scene = Scene::new(kurbo::Size::new(200.0, 100.0), SerializableColor::white());
        scene.add_text("Hi", TextStyle::default(), &ApproximateMeasurer);
        for (name, value) in [
            ("outlineWidth", "3"),
            ("outlineColor", "#ff0000"),
            ("shadowColor", "#000000"),
            ("shadowBlur", "4"),
            ("underline", "true"),
            ("align", "center"),
        ] {
            let property = TextProperty::parse(name, value).unwrap();
            scene.set_text_property(property, &ApproximateMeasurer).unwrap();
        }
        let bbox = scene.selected().unwrap().bbox;

        let assets = AssetStore::new();
        let mut surface = RecordingSurface::new(200.0, 100.0);
        Compositor::new(&assets).render(&scene, &mut surface, RenderOptions::export());
        let calls = &surface.calls[1..];
        assert_eq!(
            calls[0],
            DrawCall::StrokeText {
                content: "Hi".into(),
                width: 3.0,
                color: [255, 0, 0, 255],
            }
        );
        assert_eq!(
            calls[1],
            DrawCall::FillText {
                content: "Hi".into(),
                anchor: Point::new(bbox.x + bbox.width / 2.0, bbox.y + bbox.height / 2.0),
                shadow: true,
                color: [0, 0, 0, 255],
            }
        );
        match &calls[2] {
            DrawCall::FillRect { rect, .. } => {
                assert!((rect.x0 - bbox.x).abs() < 1e-9);
                assert!((rect.width() - bbox.width).abs() < 1e-9);
                assert!(rect.y0 > bbox.y + bbox.height / 2.0);
            }
            other => panic!("expected underline, got {other:?}"),
        }
        assert_eq!(calls.len(), 3);
    }

    #[test]
    fn test_single_point_stroke_is_a_dot() {
        let mut scene = Scene::new(kurbo::Size::new(50.0, 50.0), SerializableColor::white());
        scene.begin_stroke(Point::new(10.0, 10.0));
        scene.end_stroke();
        let assets = AssetStore::new();
        let mut surface = RecordingSurface::new(50.0, 50.0);
        Compositor::new(&assets).render(&scene, &mut surface, RenderOptions::export());
        assert!(matches!(surface.calls[1], DrawCall::FillPath { color: [0, 0, 0, 255], .. }));
    }

    #[test]
    fn test_objects_drawn_with_box_rotation() {
        let mut scene = Scene::new(kurbo::Size::new(300.0, 300.0), SerializableColor::white());
        let mut assets = AssetStore::new();
        assets.insert_ready(AssetRef::new("s.png"), solid(0, 0, 0));
        scene.add_sticker(AssetRef::new("s.png"), 10.0, 10.0);
        scene.set_selected_angle(0.5).unwrap();
        let expected = scene.selected().unwrap().bbox.transform();
        let mut surface = RecordingSurface::new(300.0, 300.0);
        Compositor::new(&assets).render(&scene, &mut surface, RenderOptions::export());
        assert!(surface
            .calls
            .iter()
            .any(|c| matches!(c, DrawCall::Image { transform, .. } if *transform == expected)));
    }

    fn assert_near(actual: Option<[u8; 4]>, expected: [u8; 4]) {
        let actual = actual.unwrap();
        let close = actual.iter().zip(expected.iter()).all(|(a, e)| a.abs_diff(*e) <= 1);
        assert!(close, "{actual:?} != {expected:?}");
    }

    #[test]
    fn test_three_slot_composite_pixels() {
        let scene = Scene::from_layout(&three_slot_layout(), &photos()).unwrap();
        let assets = ready_assets();
        let mut surface = PixmapSurface::new(100, 300, Arc::new(FontBook::new())).unwrap();
        Compositor::new(&assets).render(&scene, &mut surface, RenderOptions::export());
        assert_near(surface.pixel(50, 50), [255, 0, 0, 255]);
        assert_near(surface.pixel(50, 150), [0, 255, 0, 255]);
        assert_near(surface.pixel(50, 250), [0, 0, 255, 255]);
        assert_eq!(surface.pixel(2, 2), Some([255, 255, 255, 255]));
        assert_eq!(surface.pixel(50, 95), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_render_is_idempotent() {
        let mut scene = Scene::from_layout(&three_slot_layout(), &photos()).unwrap();
        scene.add_text("Hi", TextStyle::default(), &ApproximateMeasurer);
        let assets = ready_assets();
        let compositor = Compositor::new(&assets);
        let mut first = RecordingSurface::new(100.0, 300.0);
        let mut second = RecordingSurface::new(100.0, 300.0);
        compositor.render(&scene, &mut first, RenderOptions::preview());
        compositor.render(&scene, &mut second, RenderOptions::preview());
        assert_eq!(first.calls, second.calls);
    }
}
