//! Render target abstraction.
//!
//! The compositor never touches pixels directly; it issues draw calls against
//! a [`Surface`]. [`crate::PixmapSurface`] is the tiny-skia implementation
//! used for both preview and export.

use kurbo::{Affine, BezPath, Point, Rect, Size, Stroke};
use peniko::Color;
use photostrip_core::objects::{FontSpec, TextAlign, TextMeasurer, TextShadow};

use crate::raster::RasterImage;

/// A single line of text positioned by its alignment anchor.
///
/// `anchor.x` is the left edge, center or right edge of the line depending on
/// `align`; `anchor.y` is the vertical middle of the em box.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub font: FontSpec,
    pub content: String,
    pub anchor: Point,
    pub align: TextAlign,
}

/// Drawing operations the compositor needs.
///
/// All geometry is in canvas space and mapped through `transform` first.
pub trait Surface: TextMeasurer {
    /// Size of the target in canvas units.
    fn size(&self) -> Size;

    fn fill_rect(&mut self, rect: Rect, transform: Affine, color: Color);

    fn fill_path(&mut self, path: &BezPath, transform: Affine, color: Color);

    fn stroke_path(&mut self, path: &BezPath, transform: Affine, stroke: &Stroke, color: Color);

    /// Draw `image` stretched into `dest`.
    fn draw_image(&mut self, image: &RasterImage, dest: Rect, transform: Affine);

    /// Fill glyphs, optionally with a drop shadow underneath the fill.
    fn fill_text(
        &mut self,
        run: &TextRun,
        transform: Affine,
        color: Color,
        shadow: Option<&TextShadow>,
    );

    /// Stroke glyph outlines.
    fn stroke_text(&mut self, run: &TextRun, transform: Affine, color: Color, width: f64);
}
