//! Pointer and touch events, display-to-canvas mapping and cursor hints.

use crate::geometry::Corner;
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// Pointer event in display coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { position: Point },
    Move { position: Point },
    Up { position: Point },
    /// The pointer left the surface mid-gesture.
    Leave,
}

/// Touch gesture phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TouchPhase {
    Start,
    Move,
    End,
    Cancel,
}

/// A touch event with all active touch points, in display coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchEvent {
    pub phase: TouchPhase,
    pub points: Vec<Point>,
}

impl TouchEvent {
    pub fn new(phase: TouchPhase, points: Vec<Point>) -> Self {
        Self { phase, points }
    }

    /// The equivalent single-pointer event, if any.
    ///
    /// Start and Move alias pointer down/move only with exactly one point.
    /// End aliases pointer-up with at most one point; Cancel aliases leave.
    pub fn as_pointer(&self) -> Option<PointerEvent> {
        match (self.phase, self.points.as_slice()) {
            (TouchPhase::Start, [p]) => Some(PointerEvent::Down { position: *p }),
            (TouchPhase::Move, [p]) => Some(PointerEvent::Move { position: *p }),
            (TouchPhase::End, [p]) => Some(PointerEvent::Up { position: *p }),
            (TouchPhase::End, []) | (TouchPhase::Cancel, _) => Some(PointerEvent::Leave),
            _ => None,
        }
    }
}

/// Maps display pixels (where the canvas is shown, possibly scaled) to canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayMapping {
    /// Where the canvas appears on the display.
    pub display_rect: Rect,
    /// Canvas size in device pixels.
    pub canvas_size: Size,
}

impl DisplayMapping {
    pub fn new(display_rect: Rect, canvas_size: Size) -> Self {
        Self {
            display_rect,
            canvas_size,
        }
    }

    /// Display and canvas coincide.
    pub fn identity(canvas_size: Size) -> Self {
        Self::new(canvas_size.to_rect(), canvas_size)
    }

    pub fn to_canvas(&self, point: Point) -> Point {
        let sx = ratio(self.canvas_size.width, self.display_rect.width());
        let sy = ratio(self.canvas_size.height, self.display_rect.height());
        Point::new(
            (point.x - self.display_rect.x0) * sx,
            (point.y - self.display_rect.y0) * sy,
        )
    }
}

fn ratio(canvas: f64, display: f64) -> f64 {
    if display.abs() < f64::EPSILON {
        1.0
    } else {
        canvas / display
    }
}

/// Hover cursor feedback. Presentation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CursorHint {
    #[default]
    Default,
    Move,
    Resize(Corner),
    Rotate,
}

impl CursorHint {
    /// CSS cursor name.
    pub fn css_name(self) -> &'static str {
        match self {
            CursorHint::Default => "default",
            CursorHint::Move => "move",
            CursorHint::Resize(Corner::TopLeft | Corner::BottomRight) => "nwse-resize",
            CursorHint::Resize(Corner::TopRight | Corner::BottomLeft) => "nesw-resize",
            CursorHint::Rotate => "crosshair",
        }
    }
}
