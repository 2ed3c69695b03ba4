//! Freehand pen strokes.

use crate::color::SerializableColor;
use kurbo::{BezPath, Point};
use serde::{Deserialize, Serialize};

/// A freehand stroke (one pointer-down-to-up gesture).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreehandStroke {
    pub color: SerializableColor,
    pub width: f64,
    /// Canvas-space points, in drawing order.
    points: Vec<Point>,
}

impl FreehandStroke {
    /// Start a stroke at `start`.
    pub fn new(color: SerializableColor, width: f64, start: Point) -> Self {
        Self {
            color,
            width,
            points: vec![start],
        }
    }

    /// Append a point to the path.
    pub fn add_point(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Polyline path through all points.
    pub fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        if let Some((first, rest)) = self.points.split_first() {
            path.move_to(*first);
            for p in rest {
                path.line_to(*p);
            }
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_are_append_only() {
        let mut stroke = FreehandStroke::new(SerializableColor::black(), 4.0, Point::new(1.0, 1.0));
        stroke.add_point(Point::new(5.0, 1.0));
        stroke.add_point(Point::new(5.0, 9.0));
        assert_eq!(stroke.len(), 3);
        assert_eq!(stroke.points()[0], Point::new(1.0, 1.0));
        assert_eq!(stroke.points()[2], Point::new(5.0, 9.0));
    }

    #[test]
    fn test_path_follows_points() {
        let mut stroke = FreehandStroke::new(SerializableColor::black(), 4.0, Point::new(0.0, 0.0));
        stroke.add_point(Point::new(10.0, 20.0));
        let path = stroke.to_path();
        assert_eq!(path.elements().len(), 2);
        assert_eq!(path.elements()[1], kurbo::PathEl::LineTo(Point::new(10.0, 20.0)));
    }
}
