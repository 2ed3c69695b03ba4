//! Export of the final composite as PNG or JPEG bytes.

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};
use photostrip_core::assets::AssetStore;
use photostrip_core::scene::Scene;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::compositor::{Compositor, RenderOptions};
use crate::fonts::FontBook;
use crate::raster::{PixmapSurface, RasterImage};
use crate::RenderError;

/// Output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
}

impl ExportFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "png" => Some(ExportFormat::Png),
            "jpg" | "jpeg" => Some(ExportFormat::Jpeg),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
        }
    }
}

/// What to encode. `quality` only applies to JPEG and is clamped to 1-100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportRequest {
    pub format: ExportFormat,
    pub quality: u8,
}

impl ExportRequest {
    pub const DEFAULT_QUALITY: u8 = 92;

    pub fn png() -> Self {
        Self {
            format: ExportFormat::Png,
            quality: Self::DEFAULT_QUALITY,
        }
    }

    pub fn jpeg(quality: u8) -> Self {
        Self {
            format: ExportFormat::Jpeg,
            quality,
        }
    }
}

impl Default for ExportRequest {
    fn default() -> Self {
        Self::png()
    }
}

/// Export errors. No bytes are produced when one of these is returned.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("An export is already in progress")]
    Busy,
    #[error("Render failed: {0}")]
    Render(#[from] RenderError),
    #[error("PNG encoding failed: {0}")]
    Png(#[from] png::EncodingError),
    #[error("JPEG encoding failed: {0}")]
    Jpeg(#[source] image::ImageError),
}

/// Marks an export as in flight until dropped.
#[derive(Debug)]
pub struct ExportGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for ExportGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Renders and encodes the composite. One export at a time.
#[derive(Debug, Default)]
pub struct Exporter {
    in_flight: AtomicBool,
}

impl Exporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Claim the exporter, or fail with [`ExportError::Busy`].
    pub fn try_begin(&self) -> Result<ExportGuard<'_>, ExportError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ExportError::Busy)?;
        Ok(ExportGuard {
            flag: &self.in_flight,
        })
    }

    /// Render `scene` without selection chrome and encode it.
    pub fn export(
        &self,
        scene: &Scene,
        assets: &AssetStore<RasterImage>,
        fonts: Arc<FontBook>,
        request: ExportRequest,
    ) -> Result<Vec<u8>, ExportError> {
        let _guard = self.try_begin()?;
        let surface = render_scene(scene, assets, fonts)?;
        let bytes = match request.format {
            ExportFormat::Png => encode_png(&surface)?,
            ExportFormat::Jpeg => encode_jpeg(&surface, request.quality)?,
        };
        log::info!(
            "Exported {}x{} {} ({} bytes)",
            surface.width(),
            surface.height(),
            request.format.extension(),
            bytes.len()
        );
        Ok(bytes)
    }
}

/// Render the scene at full canvas resolution as it will be exported.
pub fn render_scene(
    scene: &Scene,
    assets: &AssetStore<RasterImage>,
    fonts: Arc<FontBook>,
) -> Result<PixmapSurface, RenderError> {
    let mut surface = PixmapSurface::for_canvas(scene.canvas_size(), fonts)?;
    Compositor::new(assets).render(scene, &mut surface, RenderOptions::export());
    Ok(surface)
}

fn encode_png(surface: &PixmapSurface) -> Result<Vec<u8>, ExportError> {
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, surface.width(), surface.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&surface.to_rgba())?;
        writer.finish()?;
    }
    Ok(png_data)
}

fn encode_jpeg(surface: &PixmapSurface, quality: u8) -> Result<Vec<u8>, ExportError> {
    let quality = quality.clamp(1, 100);
    let rgb = flatten_on_white(surface);
    let mut jpeg_data = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg_data, quality);
    encoder
        .write_image(&rgb, surface.width(), surface.height(), ExtendedColorType::Rgb8)
        .map_err(ExportError::Jpeg)?;
    Ok(jpeg_data)
}

/// Composite over white and drop alpha. Works on premultiplied data, so
/// each channel is `c + (255 - a)`.
fn flatten_on_white(surface: &PixmapSurface) -> Vec<u8> {
    let pixels = surface.pixmap().pixels();
    let mut rgb = Vec::with_capacity(pixels.len() * 3);
    for px in pixels {
        let cover = 255 - px.alpha();
        rgb.extend_from_slice(&[
            px.red().saturating_add(cover),
            px.green().saturating_add(cover),
            px.blue().saturating_add(cover),
        ]);
    }
    rgb
}
