//! Pointer-driven manipulation: select, drag, resize, rotate and free-draw.
//!
//! The controller owns an explicit [`InteractionState`]. A gesture can only
//! start from [`InteractionState::Idle`], and every gesture records the state
//! it started from so that each move is computed from that snapshot rather
//! than accumulated step by step.

use crate::geometry::{
    angle_about, hit_test_handle, rotate_vec, Corner, HandleKind, ObjectBox, MIN_BOX_SIZE,
};
use crate::input::{CursorHint, DisplayMapping, PointerEvent, TouchEvent};
use crate::objects::{ObjectId, ObjectKind, PlacedObject, TextMeasurer, MIN_FONT_SIZE};
use crate::scene::Scene;
use kurbo::{Point, Size, Vec2};

/// Current manipulation state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    /// Moving an object; `offset` is pointer minus box origin at grab time.
    Dragging { id: ObjectId, offset: Vec2 },
    /// Dragging a corner handle.
    Resizing {
        id: ObjectId,
        corner: Corner,
        initial: ObjectBox,
        start: Point,
        /// Font size at grab time (text only).
        initial_size: f64,
    },
    /// Dragging the rotate handle.
    Rotating {
        id: ObjectId,
        initial: ObjectBox,
        start_angle: f64,
    },
    FreeDrawing,
}

impl InteractionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, InteractionState::Idle)
    }
}

/// Turns pointer events into scene mutations.
#[derive(Debug, Clone)]
pub struct InteractionController {
    state: InteractionState,
    mapping: DisplayMapping,
}

impl InteractionController {
    pub fn new(mapping: DisplayMapping) -> Self {
        Self {
            state: InteractionState::Idle,
            mapping,
        }
    }

    /// Controller whose display coincides with the canvas.
    pub fn for_canvas(canvas_size: Size) -> Self {
        Self::new(DisplayMapping::identity(canvas_size))
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn mapping(&self) -> &DisplayMapping {
        &self.mapping
    }

    /// Update where the canvas is shown, e.g. after a window resize.
    pub fn set_mapping(&mut self, mapping: DisplayMapping) {
        self.mapping = mapping;
    }

    /// Handle a pointer event in display coordinates.
    /// Returns `true` if the scene changed and needs a redraw.
    pub fn handle_pointer(
        &mut self,
        scene: &mut Scene,
        event: PointerEvent,
        measurer: &dyn TextMeasurer,
    ) -> bool {
        match event {
            PointerEvent::Down { position } => {
                self.pointer_down(scene, self.mapping.to_canvas(position))
            }
            PointerEvent::Move { position } => {
                self.pointer_move(scene, self.mapping.to_canvas(position), measurer)
            }
            PointerEvent::Up { .. } => self.pointer_up(scene),
            PointerEvent::Leave => self.pointer_leave(scene),
        }
    }

    /// Handle a touch event. Multi-touch start and move are ignored.
    pub fn handle_touch(
        &mut self,
        scene: &mut Scene,
        event: &TouchEvent,
        measurer: &dyn TextMeasurer,
    ) -> bool {
        match event.as_pointer() {
            Some(pointer) => self.handle_pointer(scene, pointer, measurer),
            None => {
                log::debug!("Ignoring {}-point touch {:?}", event.points.len(), event.phase);
                false
            }
        }
    }

    /// Pointer pressed at a canvas point.
    pub fn pointer_down(&mut self, scene: &mut Scene, point: Point) -> bool {
        if !self.state.is_idle() {
            log::debug!("Pointer down ignored in {:?}", self.state);
            return false;
        }

        if scene.is_draw_mode() {
            scene.begin_stroke(point);
            self.state = InteractionState::FreeDrawing;
            return true;
        }

        if let Some(object) = scene.selected() {
            if let Some(handle) = hit_test_handle(point, &object.bbox) {
                self.state = grab_handle(object, handle, point);
                log::debug!("Grabbed {} handle", handle.name());
                return false;
            }
        }

        match scene.hit_test(point) {
            Some(id) => {
                if scene.select(id).is_err() {
                    return false;
                }
                let Some(object) = scene.object(id) else {
                    return false;
                };
                self.state = InteractionState::Dragging {
                    id,
                    offset: point - object.bbox.origin(),
                };
                true
            }
            None => {
                let had_selection = scene.selected_id().is_some();
                scene.clear_selection();
                had_selection
            }
        }
    }

    /// Pointer moved to a canvas point.
    pub fn pointer_move(
        &mut self,
        scene: &mut Scene,
        point: Point,
        measurer: &dyn TextMeasurer,
    ) -> bool {
        match self.state {
            InteractionState::Idle => false,
            InteractionState::FreeDrawing => scene.extend_stroke(point),
            InteractionState::Dragging { id, offset } => {
                let Some(object) = scene.object_mut(id) else {
                    return false;
                };
                let origin = point - offset;
                object.bbox.x = origin.x;
                object.bbox.y = origin.y;
                true
            }
            InteractionState::Resizing {
                id,
                corner,
                initial,
                start,
                initial_size,
            } => {
                let Some(object) = scene.object_mut(id) else {
                    return false;
                };
                let local = rotate_vec(point - start, -initial.angle);
                resize_object(object, corner, &initial, local, initial_size, measurer);
                true
            }
            InteractionState::Rotating {
                id,
                initial,
                start_angle,
            } => {
                let Some(object) = scene.object_mut(id) else {
                    return false;
                };
                object.bbox.angle = initial.angle + angle_about(initial.center(), point) - start_angle;
                true
            }
        }
    }

    /// Pointer released. Any gesture ends; a stroke in progress is kept.
    pub fn pointer_up(&mut self, scene: &mut Scene) -> bool {
        let previous = std::mem::take(&mut self.state);
        match previous {
            InteractionState::FreeDrawing => scene.end_stroke(),
            InteractionState::Idle => false,
            _ => {
                log::debug!("Gesture finished: {:?}", previous);
                false
            }
        }
    }

    /// Pointer left the surface. Resolves to `Idle` like pointer-up.
    pub fn pointer_leave(&mut self, scene: &mut Scene) -> bool {
        self.pointer_up(scene)
    }

    /// Hover cursor for a display point. Only meaningful while idle.
    pub fn cursor_at(&self, scene: &Scene, position: Point) -> CursorHint {
        if !self.state.is_idle() || scene.is_draw_mode() {
            return CursorHint::Default;
        }
        let point = self.mapping.to_canvas(position);
        let Some(object) = scene.selected() else {
            return CursorHint::Default;
        };
        match hit_test_handle(point, &object.bbox) {
            Some(HandleKind::Resize(corner)) => CursorHint::Resize(corner),
            Some(HandleKind::Rotate) => CursorHint::Rotate,
            None if object.hit_test(point) => CursorHint::Move,
            None => CursorHint::Default,
        }
    }
}

fn grab_handle(object: &PlacedObject, handle: HandleKind, point: Point) -> InteractionState {
    let initial = object.bbox;
    match handle {
        HandleKind::Resize(corner) => InteractionState::Resizing {
            id: object.id(),
            corner,
            initial,
            start: point,
            initial_size: object.as_text().map_or(0.0, |t| t.style.size),
        },
        HandleKind::Rotate => InteractionState::Rotating {
            id: object.id(),
            initial,
            start_angle: angle_about(initial.center(), point),
        },
    }
}

/// Free-form size after dragging `corner` by `local` (in the box's frame).
fn corner_drag_size(corner: Corner, initial: &ObjectBox, local: Vec2) -> (f64, f64) {
    let (w0, h0) = (initial.width, initial.height);
    let (w, h) = match corner {
        Corner::BottomRight => (w0 + local.x, h0 + local.y),
        Corner::TopLeft => (w0 - local.x, h0 - local.y),
        Corner::TopRight => (w0 + local.x, h0 - local.y),
        Corner::BottomLeft => (w0 - local.x, h0 + local.y),
    };
    (w.max(MIN_BOX_SIZE), h.max(MIN_BOX_SIZE))
}

/// Resize from the `initial` box, keeping the corner opposite `corner` fixed
/// in canvas space under the initial rotation.
fn resize_object(
    object: &mut PlacedObject,
    corner: Corner,
    initial: &ObjectBox,
    local: Vec2,
    initial_size: f64,
    measurer: &dyn TextMeasurer,
) {
    let (w, h) = corner_drag_size(corner, initial, local);
    let (width, height) = match &mut object.kind {
        ObjectKind::Sticker(sticker) => sticker.constrain_size(initial.width, initial.height, w, h),
        ObjectKind::Text(text) => {
            let ratio = h / initial.height.max(f64::EPSILON);
            text.set_size((initial_size * ratio).max(MIN_FONT_SIZE));
            text.measure(measurer)
        }
    };

    let anchor = corner.opposite().signs();
    let half = |w: f64, h: f64| Vec2::new(anchor.x * w / 2.0, anchor.y * h / 2.0);
    let fixed = initial.center() + rotate_vec(half(initial.width, initial.height), initial.angle);
    let center = fixed - rotate_vec(half(width, height), initial.angle);

    object.bbox = ObjectBox {
        x: center.x - width / 2.0,
        y: center.y - height / 2.0,
        width,
        height,
        angle: initial.angle,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetRef;
    use crate::color::SerializableColor;
    use crate::input::TouchPhase;
    use crate::objects::{ApproximateMeasurer, TextStyle};
    use kurbo::Rect;
    use std::f64::consts::FRAC_PI_2;

    const EPS: f64 = 1e-9;

    fn setup() -> (Scene, InteractionController) {
        let size = Size::new(600.0, 400.0);
        (
            Scene::new(size, SerializableColor::white()),
            InteractionController::for_canvas(size),
        )
    }

    fn corner_of(scene: &Scene, corner: Corner) -> Point {
        let bbox = scene.selected().unwrap().bbox;
        bbox.to_canvas(bbox.local_corner(corner))
    }

    fn drag(
        ctl: &mut InteractionController,
        scene: &mut Scene,
        from: Point,
        to: Point,
    ) {
        ctl.pointer_down(scene, from);
        ctl.pointer_move(scene, to, &ApproximateMeasurer);
        ctl.pointer_up(scene);
    }

    #[test]
    fn test_drag_translates_exactly() {
        let (mut scene, mut ctl) = setup();
        scene.add_sticker(AssetRef::new("a.png"), 100.0, 100.0);
        let before = scene.selected().unwrap().bbox;
        drag(&mut ctl, &mut scene, Point::new(300.0, 200.0), Point::new(337.5, 180.25));
        let after = scene.selected().unwrap().bbox;
        assert!((after.x - before.x - 37.5).abs() < EPS);
        assert!((after.y - before.y + 19.75).abs() < EPS);
        assert_eq!(after.width, before.width);
        assert!(ctl.state().is_idle());
    }

    #[test]
    fn test_bottom_right_resize_keeps_origin() {
        let (mut scene, mut ctl) = setup();
        scene.add_sticker(AssetRef::new("a.png"), 200.0, 100.0);
        let before = scene.selected().unwrap().bbox;
        let br = corner_of(&scene, Corner::BottomRight);
        drag(&mut ctl, &mut scene, br, br + Vec2::new(20.0, 20.0));
        let after = scene.selected().unwrap().bbox;
        assert!((after.width - (before.width + 20.0)).abs() < EPS);
        assert!((after.height - after.width / 2.0).abs() < EPS);
        assert!((after.x - before.x).abs() < EPS);
        assert!((after.y - before.y).abs() < EPS);
    }

    #[test]
    fn test_top_left_resize_keeps_bottom_right() {
        let (mut scene, mut ctl) = setup();
        scene.add_sticker(AssetRef::new("a.png"), 100.0, 100.0);
        scene.set_selected_angle(0.6).unwrap();
        let br_before = corner_of(&scene, Corner::BottomRight);
        let tl = corner_of(&scene, Corner::TopLeft);
        drag(&mut ctl, &mut scene, tl, tl + Vec2::new(-15.0, 5.0));
        let br_after = corner_of(&scene, Corner::BottomRight);
        assert!((br_after - br_before).hypot() < 1e-6);
        let bbox = scene.selected().unwrap().bbox;
        assert!((bbox.angle - 0.6).abs() < EPS);
        assert!((bbox.width - bbox.height).abs() < 1e-6);
    }

    #[test]
    fn test_resize_is_computed_from_initial_state() {
        let (mut scene, mut ctl) = setup();
        scene.add_sticker(AssetRef::new("a.png"), 100.0, 50.0);
        let br = corner_of(&scene, Corner::BottomRight);
        ctl.pointer_down(&mut scene, br);
        for step in 1..=10 {
            ctl.pointer_move(&mut scene, br + Vec2::new(step as f64 * 3.0, 0.0), &ApproximateMeasurer);
        }
        let stepped = scene.selected().unwrap().bbox;
        ctl.pointer_up(&mut scene);

        let (mut direct_scene, mut direct) = setup();
        direct_scene.add_sticker(AssetRef::new("a.png"), 100.0, 50.0);
        drag(&mut direct, &mut direct_scene, br, br + Vec2::new(30.0, 0.0));
        let jumped = direct_scene.selected().unwrap().bbox;
        assert!((stepped.width - jumped.width).abs() < EPS);
        assert!((stepped.x - jumped.x).abs() < EPS);
    }

    #[test]
    fn test_resize_clamps_to_minimum() {
        let (mut scene, mut ctl) = setup();
        scene.add_sticker(AssetRef::new("a.png"), 100.0, 100.0);
        let br = corner_of(&scene, Corner::BottomRight);
        drag(&mut ctl, &mut scene, br, br - Vec2::new(500.0, 500.0));
        let bbox = scene.selected().unwrap().bbox;
        assert!(bbox.width >= MIN_BOX_SIZE - EPS);
        assert!(bbox.height >= MIN_BOX_SIZE - EPS);
    }

    #[test]
    fn test_text_resize_scales_font() {
        let (mut scene, mut ctl) = setup();
        scene.add_text("Hi", TextStyle { size: 30.0, ..TextStyle::default() }, &ApproximateMeasurer);
        let br = corner_of(&scene, Corner::BottomRight);
        drag(&mut ctl, &mut scene, br, br + Vec2::new(0.0, 30.0));
        let object = scene.selected().unwrap();
        assert!((object.as_text().unwrap().style.size - 60.0).abs() < EPS);
        assert!((object.bbox.height - 60.0).abs() < EPS);
        assert!((object.bbox.width - 72.0).abs() < EPS);
    }

    #[test]
    fn test_text_font_size_minimum() {
        let (mut scene, mut ctl) = setup();
        scene.add_text("Hi", TextStyle::default(), &ApproximateMeasurer);
        let br = corner_of(&scene, Corner::BottomRight);
        drag(&mut ctl, &mut scene, br, br - Vec2::new(0.0, 200.0));
        let size = scene.selected().unwrap().as_text().unwrap().style.size;
        assert!((size - MIN_FONT_SIZE).abs() < EPS);
    }

    #[test]
    fn test_rotate_follows_pointer_angle() {
        let (mut scene, mut ctl) = setup();
        scene.add_sticker(AssetRef::new("a.png"), 100.0, 100.0);
        let bbox = scene.selected().unwrap().bbox;
        let c = bbox.center();
        let handle = Point::new(c.x, bbox.y - 20.0);
        ctl.pointer_down(&mut scene, handle);
        assert!(matches!(ctl.state(), InteractionState::Rotating { .. }));
        // Quarter turn clockwise: from straight up to straight right.
        ctl.pointer_move(&mut scene, Point::new(c.x + 80.0, c.y), &ApproximateMeasurer);
        let rotated = scene.selected().unwrap().bbox;
        assert!((rotated.angle - FRAC_PI_2).abs() < EPS);
        assert_eq!(rotated.center(), c);
    }

    #[test]
    fn test_click_empty_clears_selection() {
        let (mut scene, mut ctl) = setup();
        scene.add_sticker(AssetRef::new("a.png"), 100.0, 100.0);
        assert!(ctl.pointer_down(&mut scene, Point::new(2.0, 2.0)));
        assert_eq!(scene.selected_id(), None);
        assert!(ctl.state().is_idle());
    }

    #[test]
    fn test_click_selects_and_promotes() {
        let (mut scene, mut ctl) = setup();
        let a = scene.add_sticker(AssetRef::new("a.png"), 100.0, 100.0);
        scene.add_sticker(AssetRef::new("b.png"), 100.0, 100.0);
        scene.set_selected_position(Point::new(0.0, 0.0)).unwrap();
        ctl.pointer_down(&mut scene, Point::new(300.0, 200.0));
        assert_eq!(scene.selected_id(), Some(a));
        assert_eq!(scene.stickers().last().unwrap().id(), a);
    }

    #[test]
    fn test_pointer_down_ignored_while_busy() {
        let (mut scene, mut ctl) = setup();
        scene.add_sticker(AssetRef::new("a.png"), 100.0, 100.0);
        ctl.pointer_down(&mut scene, Point::new(300.0, 200.0));
        let state = *ctl.state();
        assert!(!ctl.pointer_down(&mut scene, Point::new(1.0, 1.0)));
        assert_eq!(*ctl.state(), state);
        assert!(scene.selected_id().is_some());
    }

    #[test]
    fn test_leave_resolves_to_idle() {
        let (mut scene, mut ctl) = setup();
        scene.add_sticker(AssetRef::new("a.png"), 100.0, 100.0);
        ctl.pointer_down(&mut scene, Point::new(300.0, 200.0));
        ctl.handle_pointer(&mut scene, PointerEvent::Leave, &ApproximateMeasurer);
        assert!(ctl.state().is_idle());
        assert!(!ctl.pointer_move(&mut scene, Point::new(0.0, 0.0), &ApproximateMeasurer));
    }

    #[test]
    fn test_free_draw_gesture() {
        let (mut scene, mut ctl) = setup();
        let id = scene.add_sticker(AssetRef::new("a.png"), 100.0, 100.0);
        scene.set_draw_mode(true);
        let before = scene.selected().unwrap().bbox;
        ctl.pointer_down(&mut scene, Point::new(300.0, 200.0));
        assert_eq!(*ctl.state(), InteractionState::FreeDrawing);
        ctl.pointer_move(&mut scene, Point::new(310.0, 205.0), &ApproximateMeasurer);
        ctl.pointer_leave(&mut scene);
        assert_eq!(scene.strokes().len(), 1);
        assert_eq!(scene.strokes()[0].len(), 2);
        assert!(!scene.is_drawing());
        assert_eq!(scene.selected_id(), Some(id));
        assert_eq!(scene.selected().unwrap().bbox, before);
    }

    #[test]
    fn test_touch_multi_point_ignored() {
        let (mut scene, mut ctl) = setup();
        scene.add_sticker(AssetRef::new("a.png"), 100.0, 100.0);
        let two = TouchEvent::new(
            TouchPhase::Start,
            vec![Point::new(300.0, 200.0), Point::new(310.0, 210.0)],
        );
        assert!(!ctl.handle_touch(&mut scene, &two, &ApproximateMeasurer));
        assert!(ctl.state().is_idle());

        let one = TouchEvent::new(TouchPhase::Start, vec![Point::new(300.0, 200.0)]);
        ctl.handle_touch(&mut scene, &one, &ApproximateMeasurer);
        assert!(matches!(ctl.state(), InteractionState::Dragging { .. }));
        let cancel = TouchEvent::new(TouchPhase::Cancel, vec![]);
        ctl.handle_touch(&mut scene, &cancel, &ApproximateMeasurer);
        assert!(ctl.state().is_idle());
    }

    #[test]
    fn test_display_mapping_applies_to_pointer() {
        let mut scene = Scene::new(Size::new(600.0, 400.0), SerializableColor::white());
        let mut ctl = InteractionController::new(DisplayMapping::new(
            Rect::new(10.0, 10.0, 310.0, 210.0),
            Size::new(600.0, 400.0),
        ));
        let id = scene.add_sticker(AssetRef::new("a.png"), 100.0, 100.0);
        scene.clear_selection();
        ctl.handle_pointer(
            &mut scene,
            PointerEvent::Down { position: Point::new(160.0, 110.0) },
            &ApproximateMeasurer,
        );
        assert_eq!(scene.selected_id(), Some(id));
    }

    #[test]
    fn test_cursor_feedback() {
        let (mut scene, ctl) = setup();
        assert_eq!(ctl.cursor_at(&scene, Point::new(300.0, 200.0)), CursorHint::Default);
        scene.add_sticker(AssetRef::new("a.png"), 100.0, 100.0);
        assert_eq!(ctl.cursor_at(&scene, Point::new(300.0, 200.0)), CursorHint::Move);
        let tl = corner_of(&scene, Corner::TopLeft);
        assert_eq!(ctl.cursor_at(&scene, tl), CursorHint::Resize(Corner::TopLeft));
        let bbox = scene.selected().unwrap().bbox;
        let rotate = Point::new(bbox.center().x, bbox.y - 20.0);
        assert_eq!(ctl.cursor_at(&scene, rotate), CursorHint::Rotate);
        scene.set_draw_mode(true);
        assert_eq!(ctl.cursor_at(&scene, Point::new(300.0, 200.0)), CursorHint::Default);
    }
}
