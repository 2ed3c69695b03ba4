//! CPU raster surface built on tiny-skia.

use image::RgbaImage;
use kurbo::{Affine, BezPath, Cap, Join, PathEl, Rect, Shape, Size, Stroke};
use peniko::Color;
use photostrip_core::objects::{FontSpec, TextMeasurer, TextShadow};
use std::sync::Arc;
use tiny_skia::{
    FillRule, FilterQuality, IntSize, LineCap, LineJoin, Paint, PathBuilder, Pixmap, PixmapPaint,
    StrokeDash, Transform,
};

use crate::fonts::FontBook;
use crate::surface::{Surface, TextRun};
use crate::RenderError;

/// A decoded image, stored premultiplied and ready to draw.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pixmap: Arc<Pixmap>,
}

impl RasterImage {
    /// Convert a straight-alpha RGBA image.
    pub fn from_rgba(image: &RgbaImage) -> Result<Self, RenderError> {
        let (width, height) = image.dimensions();
        let size = IntSize::from_wh(width, height).ok_or(RenderError::InvalidSize { width, height })?;
        let mut data = Vec::with_capacity(image.as_raw().len());
        for px in image.pixels() {
            let [r, g, b, a] = px.0;
            let c = tiny_skia::ColorU8::from_rgba(r, g, b, a).premultiply();
            data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        let pixmap = Pixmap::from_vec(data, size).ok_or(RenderError::InvalidSize { width, height })?;
        Ok(Self {
            pixmap: Arc::new(pixmap),
        })
    }

    /// Decode PNG or JPEG bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, RenderError> {
        let decoded = image::load_from_memory(bytes)?;
        Self::from_rgba(&decoded.to_rgba8())
    }

    /// A single-color image, mostly useful for tests and placeholders.
    pub fn solid(width: u32, height: u32, color: Color) -> Result<Self, RenderError> {
        let c = color.to_rgba8();
        let image = RgbaImage::from_pixel(width, height, image::Rgba([c.r, c.g, c.b, c.a]));
        Self::from_rgba(&image)
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }
}

/// A [`Surface`] that rasterizes into an owned tiny-skia pixmap.
pub struct PixmapSurface {
    pixmap: Pixmap,
    fonts: Arc<FontBook>,
}

impl std::fmt::Debug for PixmapSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixmapSurface")
            .field("width", &self.pixmap.width())
            .field("height", &self.pixmap.height())
            .finish()
    }
}

impl PixmapSurface {
    /// Allocate a transparent surface.
    pub fn new(width: u32, height: u32, fonts: Arc<FontBook>) -> Result<Self, RenderError> {
        let pixmap = Pixmap::new(width, height).ok_or(RenderError::InvalidSize { width, height })?;
        Ok(Self { pixmap, fonts })
    }

    /// Allocate a surface matching a canvas size, rounded up to whole pixels.
    pub fn for_canvas(size: Size, fonts: Arc<FontBook>) -> Result<Self, RenderError> {
        Self::new(size.width.ceil() as u32, size.height.ceil() as u32, fonts)
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Straight-alpha RGBA of one pixel, or `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let c = self.pixmap.pixel(x, y)?.demultiply();
        Some([c.red(), c.green(), c.blue(), c.alpha()])
    }

    /// Straight-alpha RGBA bytes of the whole surface.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixmap.data().len());
        for px in self.pixmap.pixels() {
            let c = px.demultiply();
            out.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        out
    }

    /// Draw the text placeholder box used when no font is available.
    fn text_placeholder(&mut self, run: &TextRun, transform: Affine, color: Color) {
        let width = self.fonts.measure_text(&run.font, &run.content);
        let left = run.anchor.x - run.align.anchor_offset(width);
        let half = run.font.size / 2.0;
        let rect = Rect::new(left, run.anchor.y - half, left + width, run.anchor.y + half);
        self.stroke_path(&rect.to_path(0.1), transform, &Stroke::new(2.0), color);
    }

    fn draw_shadow(&mut self, path: &BezPath, transform: Affine, shadow: &TextShadow) {
        let sigma = (shadow.blur / 2.0).max(0.0);
        let offset = Affine::translate((shadow.offset_x, shadow.offset_y));
        let device = offset * transform;
        let pad = (sigma * 3.0).ceil() + 1.0;
        let bounds = (device * path.clone()).bounding_box().inflate(pad, pad);
        let canvas = Rect::new(0.0, 0.0, self.pixmap.width() as f64, self.pixmap.height() as f64);
        let region = bounds.intersect(canvas).expand();
        if region.width() < 1.0 || region.height() < 1.0 {
            return;
        }

        let (w, h) = (region.width() as u32, region.height() as u32);
        let Some(mut layer) = Pixmap::new(w, h) else {
            return;
        };
        let local = Affine::translate((-region.x0, -region.y0)) * device;
        if let Some(sk_path) = to_skia_path(path) {
            layer.fill_path(
                &sk_path,
                &solid_paint(shadow.color.into()),
                FillRule::Winding,
                to_skia_transform(local),
                None,
            );
        }

        if sigma > 0.0 {
            let Some(buffer) = RgbaImage::from_raw(w, h, layer.data().to_vec()) else {
                return;
            };
            let mut blurred = image::imageops::blur(&buffer, sigma as f32).into_raw();
            // Blurring can round a color channel above its alpha.
            for px in blurred.chunks_exact_mut(4) {
                let a = px[3];
                px[0] = px[0].min(a);
                px[1] = px[1].min(a);
                px[2] = px[2].min(a);
            }
            let Some(size) = IntSize::from_wh(w, h) else {
                return;
            };
            match Pixmap::from_vec(blurred, size) {
                Some(blurred) => layer = blurred,
                None => return,
            }
        }

        self.pixmap.draw_pixmap(
            region.x0 as i32,
            region.y0 as i32,
            layer.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }
}

impl TextMeasurer for PixmapSurface {
    fn measure_text(&self, font: &FontSpec, content: &str) -> f64 {
        self.fonts.measure_text(font, content)
    }
}

impl Surface for PixmapSurface {
    fn size(&self) -> Size {
        Size::new(self.pixmap.width() as f64, self.pixmap.height() as f64)
    }

    fn fill_rect(&mut self, rect: Rect, transform: Affine, color: Color) {
        self.fill_path(&rect.to_path(0.1), transform, color);
    }

    fn fill_path(&mut self, path: &BezPath, transform: Affine, color: Color) {
        let Some(sk_path) = to_skia_path(path) else {
            return;
        };
        self.pixmap.fill_path(
            &sk_path,
            &solid_paint(color),
            FillRule::Winding,
            to_skia_transform(transform),
            None,
        );
    }

    fn stroke_path(&mut self, path: &BezPath, transform: Affine, stroke: &Stroke, color: Color) {
        let Some(sk_path) = to_skia_path(path) else {
            return;
        };
        self.pixmap.stroke_path(
            &sk_path,
            &solid_paint(color),
            &to_skia_stroke(stroke),
            to_skia_transform(transform),
            None,
        );
    }

    fn draw_image(&mut self, image: &RasterImage, dest: Rect, transform: Affine) {
        let sx = dest.width() / image.width() as f64;
        let sy = dest.height() / image.height() as f64;
        let placement = transform
            * Affine::translate((dest.x0, dest.y0))
            * Affine::scale_non_uniform(sx, sy);
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        self.pixmap.draw_pixmap(
            0,
            0,
            image.pixmap().as_ref(),
            &paint,
            to_skia_transform(placement),
            None,
        );
    }

    fn fill_text(
        &mut self,
        run: &TextRun,
        transform: Affine,
        color: Color,
        shadow: Option<&TextShadow>,
    ) {
        let fonts = Arc::clone(&self.fonts);
        let Some(shaped) = fonts.shape(&run.font, &run.content, run.anchor, run.align) else {
            self.text_placeholder(run, transform, color);
            return;
        };
        if let Some(shadow) = shadow {
            self.draw_shadow(&shaped.path, transform, shadow);
        }
        self.fill_path(&shaped.path, transform, color);
        if shaped.synthetic_bold {
            let stroke = Stroke::new(run.font.size / 24.0).with_join(Join::Round);
            self.stroke_path(&shaped.path, transform, &stroke, color);
        }
    }

    fn stroke_text(&mut self, run: &TextRun, transform: Affine, color: Color, width: f64) {
        let fonts = Arc::clone(&self.fonts);
        // Without a font the fill pass draws the placeholder.
        let Some(shaped) = fonts.shape(&run.font, &run.content, run.anchor, run.align) else {
            return;
        };
        let stroke = Stroke::new(width).with_join(Join::Round).with_caps(Cap::Round);
        self.stroke_path(&shaped.path, transform, &stroke, color);
    }
}

fn solid_paint(color: Color) -> Paint<'static> {
    let c = color.to_rgba8();
    let mut paint = Paint::default();
    paint.set_color_rgba8(c.r, c.g, c.b, c.a);
    paint.anti_alias = true;
    paint
}

/// kurbo `[a b c d e f]` maps to tiny-skia `(sx, ky, kx, sy, tx, ty)` in the same order.
fn to_skia_transform(affine: Affine) -> Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

fn to_skia_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(p1, p2) => pb.quad_to(p1.x as f32, p1.y as f32, p2.x as f32, p2.y as f32),
            PathEl::CurveTo(p1, p2, p3) => pb.cubic_to(
                p1.x as f32,
                p1.y as f32,
                p2.x as f32,
                p2.y as f32,
                p3.x as f32,
                p3.y as f32,
            ),
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

fn to_skia_stroke(stroke: &Stroke) -> tiny_skia::Stroke {
    let dash = if stroke.dash_pattern.is_empty() {
        None
    } else {
        StrokeDash::new(
            stroke.dash_pattern.iter().map(|d| *d as f32).collect(),
            stroke.dash_offset as f32,
        )
    };
    tiny_skia::Stroke {
        width: stroke.width as f32,
        line_cap: match stroke.start_cap {
            Cap::Butt => LineCap::Butt,
            Cap::Round => LineCap::Round,
            Cap::Square => LineCap::Square,
        },
        line_join: match stroke.join {
            Join::Bevel => LineJoin::Bevel,
            Join::Miter => LineJoin::Miter,
            Join::Round => LineJoin::Round,
        },
        dash,
        ..tiny_skia::Stroke::default()
    }
}

/// Premultiplied pixel from straight RGBA, for tests that poke pixels directly.
#[cfg(test)]
pub(crate) fn premultiplied(r: u8, g: u8, b: u8, a: u8) -> tiny_skia::PremultipliedColorU8 {
    tiny_skia::ColorU8::from_rgba(r, g, b, a).premultiply()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;
    use photostrip_core::objects::TextAlign;

    const DEJAVU_SANS: &[u8] = include_bytes!("../tests/fixtures/DejaVuSans.ttf");

    fn surface(w: u32, h: u32) -> PixmapSurface {
        PixmapSurface::new(w, h, Arc::new(FontBook::new())).unwrap()
    }

    #[test]
    fn test_zero_size_surface_fails() {
        assert!(matches!(
            PixmapSurface::new(0, 10, Arc::new(FontBook::new())),
            Err(RenderError::InvalidSize { width: 0, height: 10 })
        ));
    }

    #[test]
    fn test_fill_rect_under_identity() {
        let mut s = surface(20, 20);
        s.fill_rect(Rect::new(5.0, 5.0, 15.0, 15.0), Affine::IDENTITY, Color::from_rgba8(255, 0, 0, 255));
        assert_eq!(s.pixel(10, 10), Some([255, 0, 0, 255]));
        assert_eq!(s.pixel(2, 2), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_fill_rect_rotated_about_center() {
        let mut s = surface(40, 40);
        // A 30x4 bar through the center, rotated a quarter turn, becomes vertical.
        let rect = Rect::new(5.0, 18.0, 35.0, 22.0);
        let transform = Affine::rotate_about(std::f64::consts::FRAC_PI_2, Point::new(20.0, 20.0));
        s.fill_rect(rect, transform, Color::from_rgba8(0, 0, 255, 255));
        assert_eq!(s.pixel(20, 8), Some([0, 0, 255, 255]));
        assert_eq!(s.pixel(8, 20), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_draw_image_is_stretched_into_dest() {
        let mut s = surface(30, 30);
        let img = RasterImage::solid(2, 2, Color::from_rgba8(0, 255, 0, 255)).unwrap();
        s.draw_image(&img, Rect::new(10.0, 10.0, 30.0, 30.0), Affine::IDENTITY);
        assert_eq!(s.pixel(20, 20), Some([0, 255, 0, 255]));
        assert_eq!(s.pixel(5, 5), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_decode_png_round_trip() {
        let image = RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let decoded = RasterImage::decode(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
        assert_eq!(decoded.pixmap().pixel(1, 1), Some(premultiplied(10, 20, 30, 255)));
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(RasterImage::decode(b"not an image"), Err(RenderError::Image(_))));
    }

    #[test]
    fn test_text_without_fonts_draws_placeholder() {
        let mut s = surface(100, 40);
        let run = TextRun {
            font: FontSpec {
                family: "sans-serif".into(),
                size: 20.0,
                bold: false,
                italic: false,
            },
            content: "Hello".into(),
            anchor: Point::new(50.0, 20.0),
            align: TextAlign::Center,
        };
        s.fill_text(&run, Affine::IDENTITY, Color::from_rgba8(0, 0, 0, 255), None);
        // 5 chars * 20 * 0.6 = 60 wide, centered: left edge at x = 20.
        assert_eq!(s.pixel(50, 20), Some([0, 0, 0, 0]));
        assert!(s.pixel(20, 20).is_some_and(|p| p[3] > 0));
    }

    fn run(content: &str, family: &str, size: f64, anchor: Point) -> TextRun {
        TextRun {
            font: FontSpec {
                family: family.into(),
                size,
                bold: false,
                italic: false,
            },
            content: content.into(),
            anchor,
            align: TextAlign::Center,
        }
    }

    #[test]
    fn test_outline_without_fonts_draws_nothing() {
        let mut s = surface(100, 40);
        let run = run("Hello", "sans-serif", 20.0, Point::new(50.0, 20.0));
        s.stroke_text(&run, Affine::IDENTITY, Color::from_rgba8(255, 0, 0, 255), 3.0);
        assert!(s.pixmap().pixels().iter().all(|p| p.alpha() == 0));
    }

    #[test]
    fn test_real_font_draws_glyph_ink() {
        let mut book = FontBook::new();
        book.register("DejaVu Sans", false, false, DEJAVU_SANS.to_vec()).unwrap();
        let mut s = PixmapSurface::new(120, 60, Arc::new(book)).unwrap();
        let run = run("HH", "DejaVu Sans", 40.0, Point::new(60.0, 30.0));
        s.fill_text(&run, Affine::IDENTITY, Color::from_rgba8(0, 0, 0, 255), None);

        let width = s.measure_text(&run.font, &run.content);
        let (left, right) = (60.0 - width / 2.0, 60.0 + width / 2.0);
        let mut inked = 0;
        for y in 0..60 {
            for x in 0..120 {
                if s.pixel(x, y).is_some_and(|p| p[3] > 0) {
                    inked += 1;
                    assert!((x as f64) >= left - 1.0 && (x as f64) <= right + 1.0);
                    assert!((9..=51).contains(&y), "ink at y={y}");
                }
            }
        }
        assert!(inked > 100);
        // Above the crossbars only the four stems are solid.
        let solid = (0..120).filter(|&x| s.pixel(x, 20).is_some_and(|p| p[3] == 255)).count();
        assert!(solid >= 8);
    }

    #[test]
    fn test_dashed_stroke_leaves_gaps() {
        let mut s = surface(40, 10);
        let mut path = BezPath::new();
        path.move_to((0.0, 5.0));
        path.line_to((40.0, 5.0));
        let stroke = Stroke::new(2.0).with_dashes(0.0, [10.0, 10.0]);
        s.stroke_path(&path, Affine::IDENTITY, &stroke, Color::from_rgba8(0, 0, 0, 255));
        assert!(s.pixel(5, 5).is_some_and(|p| p[3] > 0));
        assert_eq!(s.pixel(15, 5), Some([0, 0, 0, 0]));
    }
}
