//! Font registry, text measurement and glyph outlines.
//!
//! Faces are registered per family and style. Lookup falls back from the
//! requested style to the family's regular face, then to the book's default
//! font. Missing bold or italic faces are synthesized (extra stroke, slant).
//! With no usable font at all, measurement uses the approximate 0.6 em per
//! character ratio and drawing shows a placeholder box.

use ab_glyph::{Font, FontArc, GlyphId, OutlineCurve, PxScale, PxScaleFont, ScaleFont};
use kurbo::{BezPath, Point};
use photostrip_core::objects::{ApproximateMeasurer, FontSpec, TextAlign, TextMeasurer};
use std::collections::HashMap;
use std::path::Path;

use crate::RenderError;

/// Horizontal shear applied for synthetic italics.
const SYNTHETIC_SLANT: f64 = 0.2;

/// Faces registered for one family, indexed by `bold as usize * 2 + italic as usize`.
#[derive(Clone, Default)]
struct FamilyFaces {
    faces: [Option<FontArc>; 4],
}

impl FamilyFaces {
    fn slot(bold: bool, italic: bool) -> usize {
        (bold as usize) * 2 + italic as usize
    }
}

/// A face chosen for a [`FontSpec`], plus what has to be synthesized.
pub struct ResolvedFace<'a> {
    pub font: &'a FontArc,
    pub synthetic_bold: bool,
    pub synthetic_italic: bool,
}

/// Text converted to canvas-space glyph outlines.
#[derive(Debug, Clone)]
pub struct ShapedText {
    pub path: BezPath,
    /// Horizontal advance of the whole line.
    pub advance: f64,
    /// The face had no bold variant; draw with an extra stroke.
    pub synthetic_bold: bool,
}

/// Registered fonts, keyed by lowercase family name.
#[derive(Clone, Default)]
pub struct FontBook {
    families: HashMap<String, FamilyFaces>,
    default_font: Option<FontArc>,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook")
            .field("families", &self.families.keys().collect::<Vec<_>>())
            .field("has_default", &self.default_font.is_some())
            .finish()
    }
}

fn parse_font(family: &str, bytes: Vec<u8>) -> Result<FontArc, RenderError> {
    FontArc::try_from_vec(bytes).map_err(|_| RenderError::InvalidFont {
        family: family.to_string(),
    })
}

impl FontBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a TrueType/OpenType face for `family` in the given style.
    /// The first face registered also becomes the default font.
    pub fn register(
        &mut self,
        family: &str,
        bold: bool,
        italic: bool,
        bytes: Vec<u8>,
    ) -> Result<(), RenderError> {
        let font = parse_font(family, bytes)?;
        if self.default_font.is_none() {
            self.default_font = Some(font.clone());
        }
        let faces = self.families.entry(family.to_lowercase()).or_default();
        faces.faces[FamilyFaces::slot(bold, italic)] = Some(font);
        log::debug!("Registered font {} (bold={}, italic={})", family, bold, italic);
        Ok(())
    }

    /// Register a face from a font file.
    pub fn register_file(
        &mut self,
        family: &str,
        bold: bool,
        italic: bool,
        path: &Path,
    ) -> Result<(), RenderError> {
        let bytes = std::fs::read(path)?;
        self.register(family, bold, italic, bytes)
    }

    pub fn has_family(&self, family: &str) -> bool {
        self.families.contains_key(&family.to_lowercase())
    }

    /// Whether any font is available for drawing.
    pub fn is_empty(&self) -> bool {
        self.default_font.is_none()
    }

    /// Pick the face to draw `spec` with.
    pub fn resolve(&self, spec: &FontSpec) -> Option<ResolvedFace<'_>> {
        if let Some(family) = self.families.get(&spec.family.to_lowercase()) {
            let wanted = FamilyFaces::slot(spec.bold, spec.italic);
            if let Some(font) = &family.faces[wanted] {
                return Some(ResolvedFace {
                    font,
                    synthetic_bold: false,
                    synthetic_italic: false,
                });
            }
            // Keep whichever half of the style the family does provide.
            let fallbacks = [
                (FamilyFaces::slot(spec.bold, false), false, spec.italic),
                (FamilyFaces::slot(false, spec.italic), spec.bold, false),
                (FamilyFaces::slot(false, false), spec.bold, spec.italic),
            ];
            for (slot, synthetic_bold, synthetic_italic) in fallbacks {
                if let Some(font) = &family.faces[slot] {
                    return Some(ResolvedFace {
                        font,
                        synthetic_bold,
                        synthetic_italic,
                    });
                }
            }
        }
        self.default_font.as_ref().map(|font| ResolvedFace {
            font,
            synthetic_bold: spec.bold,
            synthetic_italic: spec.italic,
        })
    }

    /// Lay out one line of text and return its glyph outlines.
    ///
    /// Returns `None` when no font is available.
    pub fn shape(
        &self,
        spec: &FontSpec,
        content: &str,
        anchor: Point,
        align: TextAlign,
    ) -> Option<ShapedText> {
        let face = self.resolve(spec)?;
        let font = face.font;
        let scaled = font.as_scaled(em_scale(font, spec.size)?);
        let advance = line_advance(&scaled, content);

        let (h, v) = (scaled.h_scale_factor() as f64, scaled.v_scale_factor() as f64);
        let baseline = anchor.y + (scaled.ascent() + scaled.descent()) as f64 / 2.0;
        let slant = if face.synthetic_italic { SYNTHETIC_SLANT } else { 0.0 };

        let mut path = BezPath::new();
        let mut pen = anchor.x - align.anchor_offset(advance);
        let mut prev: Option<GlyphId> = None;
        for ch in content.chars() {
            let id = font.glyph_id(ch);
            if let Some(prev) = prev {
                pen += scaled.kern(prev, id) as f64;
            }
            if let Some(outline) = font.outline(id) {
                let origin = Point::new(pen, baseline);
                let map = |p: ab_glyph::Point| {
                    let (x, y) = (p.x as f64, p.y as f64);
                    Point::new(origin.x + x * h + slant * y * v, origin.y - y * v)
                };
                append_curves(&mut path, &outline.curves, map);
            }
            pen += scaled.h_advance(id) as f64;
            prev = Some(id);
        }

        Some(ShapedText {
            path,
            advance,
            synthetic_bold: face.synthetic_bold,
        })
    }
}

impl TextMeasurer for FontBook {
    fn measure_text(&self, font: &FontSpec, content: &str) -> f64 {
        let Some(face) = self.resolve(font) else {
            return ApproximateMeasurer.measure_text(font, content);
        };
        match em_scale(face.font, font.size) {
            Some(scale) => line_advance(&face.font.as_scaled(scale), content),
            None => ApproximateMeasurer.measure_text(font, content),
        }
    }
}

/// Scale at which one em equals `size` pixels.
fn em_scale(font: &FontArc, size: f64) -> Option<PxScale> {
    let units_per_em = font.units_per_em()?;
    Some(PxScale::from(size as f32 * font.height_unscaled() / units_per_em))
}

fn line_advance(scaled: &PxScaleFont<&FontArc>, content: &str) -> f64 {
    let mut width = 0.0f32;
    let mut prev: Option<GlyphId> = None;
    for ch in content.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(prev) = prev {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }
    width as f64
}

/// Append outline curves, starting a new closed contour whenever a curve does
/// not continue from the previous one.
fn append_curves(path: &mut BezPath, curves: &[OutlineCurve], map: impl Fn(ab_glyph::Point) -> Point) {
    let mut last: Option<ab_glyph::Point> = None;
    for curve in curves {
        let (start, end) = match curve {
            OutlineCurve::Line(a, b) => (*a, *b),
            OutlineCurve::Quad(a, _, c) => (*a, *c),
            OutlineCurve::Cubic(a, _, _, d) => (*a, *d),
        };
        if last != Some(start) {
            if last.is_some() {
                path.close_path();
            }
            path.move_to(map(start));
        }
        match curve {
            OutlineCurve::Line(_, b) => path.line_to(map(*b)),
            OutlineCurve::Quad(_, b, c) => path.quad_to(map(*b), map(*c)),
            OutlineCurve::Cubic(_, b, c, d) => path.curve_to(map(*b), map(*c), map(*d)),
        }
        last = Some(end);
    }
    if last.is_some() {
        path.close_path();
    }
}
