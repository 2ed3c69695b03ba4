//! Rotated-box math: containment, handle hit-testing and angles.
//!
//! All functions are pure. "Local space" is canvas space rotated by `-angle`
//! about the box center, so a rotated box becomes axis-aligned again.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Side length of the square corner and rotate handles, in canvas units.
pub const HANDLE_SIZE: f64 = 12.0;
/// Distance from the top edge to the rotate handle center, in canvas units.
pub const ROTATE_HANDLE_OFFSET: f64 = 20.0;
/// Minimum width/height of a resized box.
pub const MIN_BOX_SIZE: f64 = 10.0;

/// The unrotated bounding box of a placed object plus its rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectBox {
    /// Left edge of the unrotated box.
    pub x: f64,
    /// Top edge of the unrotated box.
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Rotation in radians about the box center.
    #[serde(default)]
    pub angle: f64,
}

impl ObjectBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            angle: 0.0,
        }
    }

    /// Builder-style rotation setter.
    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = angle;
        self
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// The unrotated rectangle.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    /// Local-to-canvas transform: rotation by `angle` about the center.
    ///
    /// The compositor draws every object under this transform, so anything
    /// hit-tested through [`ObjectBox::to_local`] matches what is on screen.
    pub fn transform(&self) -> Affine {
        Affine::rotate_about(self.angle, self.center())
    }

    /// Map a canvas-space point into this box's local (unrotated) frame.
    pub fn to_local(&self, point: Point) -> Point {
        rotate_point(point, self.center(), -self.angle)
    }

    /// Map a local-frame point back to canvas space.
    pub fn to_canvas(&self, point: Point) -> Point {
        rotate_point(point, self.center(), self.angle)
    }

    /// Corner position in local space.
    pub fn local_corner(&self, corner: Corner) -> Point {
        let r = self.rect();
        match corner {
            Corner::TopLeft => Point::new(r.x0, r.y0),
            Corner::TopRight => Point::new(r.x1, r.y0),
            Corner::BottomLeft => Point::new(r.x0, r.y1),
            Corner::BottomRight => Point::new(r.x1, r.y1),
        }
    }

    /// Rotate handle center in local space.
    pub fn local_rotate_handle(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y - ROTATE_HANDLE_OFFSET)
    }
}

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    /// All corners in hit-test priority order.
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    /// The diagonally opposite corner (stays fixed while this one is dragged).
    pub fn opposite(self) -> Corner {
        match self {
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomLeft => Corner::TopRight,
            Corner::BottomRight => Corner::TopLeft,
        }
    }

    /// Unit offset of this corner from the box center: `(+-1, +-1)`.
    pub fn signs(self) -> Vec2 {
        match self {
            Corner::TopLeft => Vec2::new(-1.0, -1.0),
            Corner::TopRight => Vec2::new(1.0, -1.0),
            Corner::BottomLeft => Vec2::new(-1.0, 1.0),
            Corner::BottomRight => Vec2::new(1.0, 1.0),
        }
    }

    /// Short name as used by UI layers (`tl`, `tr`, `bl`, `br`).
    pub fn short_name(self) -> &'static str {
        match self {
            Corner::TopLeft => "tl",
            Corner::TopRight => "tr",
            Corner::BottomLeft => "bl",
            Corner::BottomRight => "br",
        }
    }
}

/// Type of manipulation handle on a selected object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    /// Corner resize handle.
    Resize(Corner),
    /// Rotation handle above the top edge.
    Rotate,
}

impl HandleKind {
    /// Handle name: `resize-tl`, `resize-tr`, `resize-bl`, `resize-br` or `rotate`.
    pub fn name(self) -> &'static str {
        match self {
            HandleKind::Resize(Corner::TopLeft) => "resize-tl",
            HandleKind::Resize(Corner::TopRight) => "resize-tr",
            HandleKind::Resize(Corner::BottomLeft) => "resize-bl",
            HandleKind::Resize(Corner::BottomRight) => "resize-br",
            HandleKind::Rotate => "rotate",
        }
    }
}

/// Rotate `point` by `angle` radians about `center`.
pub fn rotate_point(point: Point, center: Point, angle: f64) -> Point {
    let (sin, cos) = angle.sin_cos();
    let dx = point.x - center.x;
    let dy = point.y - center.y;
    Point::new(
        center.x + dx * cos - dy * sin,
        center.y + dx * sin + dy * cos,
    )
}

/// Rotate a vector by `angle` radians.
pub fn rotate_vec(v: Vec2, angle: f64) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// Angle of the vector from `center` to `point`.
pub fn angle_about(center: Point, point: Point) -> f64 {
    (point.y - center.y).atan2(point.x - center.x)
}

/// Closed containment test of a canvas point against a rotated box.
pub fn point_in_rotated_rect(point: Point, bx: &ObjectBox) -> bool {
    let local = bx.to_local(point);
    local.x >= bx.x
        && local.x <= bx.x + bx.width
        && local.y >= bx.y
        && local.y <= bx.y + bx.height
}

/// Square handle area centered on `center`, in local space.
fn handle_rect(center: Point) -> Rect {
    Rect::from_center_size(center, (HANDLE_SIZE, HANDLE_SIZE))
}

fn in_closed_rect(rect: Rect, p: Point) -> bool {
    p.x >= rect.x0 && p.x <= rect.x1 && p.y >= rect.y0 && p.y <= rect.y1
}

/// Handle areas of a box in local space, in hit-test priority order.
pub fn local_handles(bx: &ObjectBox) -> [(HandleKind, Rect); 5] {
    let corner = |c: Corner| (HandleKind::Resize(c), handle_rect(bx.local_corner(c)));
    [
        corner(Corner::TopLeft),
        corner(Corner::TopRight),
        corner(Corner::BottomLeft),
        corner(Corner::BottomRight),
        (HandleKind::Rotate, handle_rect(bx.local_rotate_handle())),
    ]
}

/// Find which handle (if any) of a box is hit at the given canvas point.
pub fn hit_test_handle(point: Point, bx: &ObjectBox) -> Option<HandleKind> {
    let local = bx.to_local(point);
    local_handles(bx)
        .into_iter()
        .find(|(_, rect)| in_closed_rect(*rect, local))
        .map(|(kind, _)| kind)
}
