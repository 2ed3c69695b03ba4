//! PhotoStrip Render Library
//!
//! Compositing, CPU rasterization, asset loading and export for PhotoStrip.
//! The compositor draws against the [`Surface`] trait; [`PixmapSurface`] is
//! the tiny-skia implementation shared by preview and export.

pub mod compositor;
pub mod editor;
pub mod export;
pub mod fonts;
pub mod loader;
pub mod raster;
mod surface;

use thiserror::Error;

pub use compositor::{Compositor, RenderOptions};
pub use editor::{Editor, EditorState, StickerAdd};
pub use export::{ExportError, ExportFormat, ExportRequest, Exporter};
pub use fonts::FontBook;
pub use loader::{AssetLoader, FileLoader, MemoryLoader, ThreadedLoader};
pub use raster::{PixmapSurface, RasterImage};
pub use surface::{Surface, TextRun};

/// Rendering and resource errors.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Cannot allocate a {width}x{height} surface")]
    InvalidSize { width: u32, height: u32 },
    #[error("Invalid font data for {family}")]
    InvalidFont { family: String },
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
