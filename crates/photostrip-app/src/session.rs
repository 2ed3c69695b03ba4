//! Session files: a session config plus the photos, fonts and objects to
//! place before exporting.

use photostrip_core::{
    AssetRef, LayoutError, SceneError, SerializableColor, SessionConfig, SessionError, TextStyle,
};
use photostrip_render::{
    Editor, ExportError, ExportFormat, ExportRequest, FileLoader, FontBook, RenderError,
    StickerAdd,
};
use kurbo::Point;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// How long to wait for photos and stickers before exporting anyway.
pub const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid session file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid layout: {0}")]
    Layout(#[from] LayoutError),
    #[error("Cannot start editing: {0}")]
    Session(#[from] SessionError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("Font error: {0}")]
    Font(#[from] RenderError),
    #[error("Export failed: {0}")]
    Export(#[from] ExportError),
    #[error("Unknown output format: {0}")]
    Format(String),
}

/// A font face to register, relative to the session file.
#[derive(Debug, Clone, Deserialize)]
pub struct FontFile {
    pub family: String,
    pub path: PathBuf,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
}

/// A sticker to place. Without a position it stays centered.
#[derive(Debug, Clone, Deserialize)]
pub struct StickerPlacement {
    pub asset: AssetRef,
    pub x: Option<f64>,
    pub y: Option<f64>,
    /// Degrees, clockwise.
    #[serde(default)]
    pub rotation: f64,
}

/// A text object to place.
#[derive(Debug, Clone, Deserialize)]
pub struct TextPlacement {
    pub content: String,
    /// Falls back to the font catalog's default style.
    pub style: Option<TextStyle>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    #[serde(default)]
    pub rotation: f64,
}

/// A freehand stroke, as a list of canvas points.
#[derive(Debug, Clone, Deserialize)]
pub struct StrokePlacement {
    pub points: Vec<Point>,
    #[serde(default = "SerializableColor::black")]
    pub color: SerializableColor,
    #[serde(default = "default_brush_width")]
    pub width: f64,
}

fn default_brush_width() -> f64 {
    5.0
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputSettings {
    pub format: Option<String>,
    pub quality: Option<u8>,
}

/// The on-disk session description.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionFile {
    pub session: SessionConfig,
    /// Captured photos in slot order.
    pub photos: Vec<AssetRef>,
    #[serde(default)]
    pub fonts: Vec<FontFile>,
    pub frame: Option<usize>,
    #[serde(default)]
    pub stickers: Vec<StickerPlacement>,
    #[serde(default)]
    pub texts: Vec<TextPlacement>,
    #[serde(default)]
    pub strokes: Vec<StrokePlacement>,
    #[serde(default)]
    pub output: OutputSettings,
}

impl SessionFile {
    pub fn from_json(json: &str) -> Result<Self, AppError> {
        let file: Self = serde_json::from_str(json)?;
        file.session.layout.validate()?;
        Ok(file)
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let json = std::fs::read_to_string(path).map_err(|source| AppError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Pick the export request. Command-line values win over the session file,
    /// which wins over the output extension.
    pub fn export_request(
        &self,
        format: Option<ExportFormat>,
        quality: Option<u8>,
        output: &Path,
    ) -> Result<ExportRequest, AppError> {
        let format = match (format, &self.output.format) {
            (Some(format), _) => format,
            (None, Some(name)) => ExportFormat::parse(name).ok_or_else(|| AppError::Format(name.clone()))?,
            (None, None) => output
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(ExportFormat::parse)
                .unwrap_or_default(),
        };
        let quality = quality
            .or(self.output.quality)
            .unwrap_or(ExportRequest::DEFAULT_QUALITY);
        Ok(ExportRequest { format, quality })
    }

    /// Open an editor over the session with assets resolved under `base`, and
    /// place every configured object.
    pub fn build_editor(&self, base: &Path) -> Result<Editor, AppError> {
        let mut fonts = FontBook::new();
        for font in &self.fonts {
            fonts.register_file(&font.family, font.bold, font.italic, &base.join(&font.path))?;
        }

        let loader = Arc::new(FileLoader::new(base));
        let mut editor =
            Editor::open(self.session.clone(), self.photos.clone(), loader, fonts).into_editor()?;

        editor.select_frame(self.frame)?;
        let stickers: Vec<AssetRef> = self.stickers.iter().map(|s| s.asset.clone()).collect();
        editor.preload(&stickers);
        editor.settle_assets(LOAD_TIMEOUT);

        for placement in &self.stickers {
            match editor.add_sticker(placement.asset.clone()) {
                StickerAdd::Added(_) => {
                    place_selected(&mut editor, placement.x, placement.y, placement.rotation)?
                }
                StickerAdd::Queued => {
                    log::warn!("Sticker {} not loaded in time, skipped", placement.asset)
                }
            }
        }

        for placement in &self.texts {
            let style = placement
                .style
                .clone()
                .unwrap_or_else(|| editor.default_text_style());
            editor.add_text(&placement.content, style);
            place_selected(&mut editor, placement.x, placement.y, placement.rotation)?;
        }

        for stroke in &self.strokes {
            let Some((first, rest)) = stroke.points.split_first() else {
                continue;
            };
            let scene = editor.scene_mut();
            scene.set_brush(stroke.color, stroke.width);
            scene.begin_stroke(*first);
            for point in rest {
                scene.extend_stroke(*point);
            }
            scene.end_stroke();
        }

        editor.scene_mut().clear_selection();
        log::info!(
            "Placed {} stickers, {} texts, {} strokes",
            editor.scene().stickers().len(),
            editor.scene().texts().len(),
            editor.scene().strokes().len()
        );
        Ok(editor)
    }
}

fn place_selected(
    editor: &mut Editor,
    x: Option<f64>,
    y: Option<f64>,
    rotation: f64,
) -> Result<(), SceneError> {
    let scene = editor.scene_mut();
    if let Some(object) = scene.selected() {
        let origin = Point::new(x.unwrap_or(object.bbox.x), y.unwrap_or(object.bbox.y));
        scene.set_selected_position(origin)?;
    }
    scene.set_selected_angle(rotation.to_radians())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SESSION: &str = r##"{
        "session": {
            "layout": {
                "name": "duo",
                "width": 200,
                "height": 100,
                "slots": [
                    { "x": 0, "y": 0, "width": 100, "height": 100 },
                    { "x": 100, "y": 0, "width": 100, "height": 100 }
                ],
                "background": "#ffffff",
                "frames": []
            }
        },
        "photos": ["a.png", "b.png"],
        "stickers": [{ "asset": "star.png", "x": 5, "y": 6, "rotation": 90 }],
        "texts": [{ "content": "Hi", "x": 10, "y": 20 }],
        "strokes": [{ "points": [{ "x": 1, "y": 1 }, { "x": 9, "y": 9 }], "width": 3 }],
        "output": { "format": "jpeg", "quality": 80 }
    }"##;

    fn write_png(dir: &Path, name: &str, w: u32, h: u32, rgb: [u8; 3]) {
        image::RgbaImage::from_pixel(w, h, image::Rgba([rgb[0], rgb[1], rgb[2], 255]))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn test_parse_session_file() {
        let file = SessionFile::from_json(SESSION).unwrap();
        assert_eq!(file.photos.len(), 2);
        assert_eq!(file.stickers[0].rotation, 90.0);
        assert!(file.texts[0].style.is_none());
        assert!(file.frame.is_none());
        assert!((file.strokes[0].width - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_export_request_precedence() {
        let file = SessionFile::from_json(SESSION).unwrap();
        let out = Path::new("strip.png");
        let from_file = file.export_request(None, None, out).unwrap();
        assert_eq!(from_file, ExportRequest::jpeg(80));

        let from_cli = file.export_request(Some(ExportFormat::Png), Some(50), out).unwrap();
        assert_eq!(from_cli.format, ExportFormat::Png);
        assert_eq!(from_cli.quality, 50);

        let mut bare = file.clone();
        bare.output = OutputSettings::default();
        let from_ext = bare.export_request(None, None, Path::new("strip.JPG")).unwrap();
        assert_eq!(from_ext.format, ExportFormat::Jpeg);
        assert_eq!(from_ext.quality, ExportRequest::DEFAULT_QUALITY);

        bare.output.format = Some("bmp".into());
        assert!(matches!(
            bare.export_request(None, None, out),
            Err(AppError::Format(_))
        ));
    }

    #[test]
    fn test_build_editor_places_objects() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png", 4, 4, [255, 0, 0]);
        write_png(dir.path(), "b.png", 4, 4, [0, 0, 255]);
        write_png(dir.path(), "star.png", 10, 10, [0, 255, 0]);

        let file = SessionFile::from_json(SESSION).unwrap();
        let editor = file.build_editor(dir.path()).unwrap();
        let scene = editor.scene();

        let sticker = &scene.stickers()[0];
        assert!((sticker.bbox.x - 5.0).abs() < 1e-9);
        assert!((sticker.bbox.y - 6.0).abs() < 1e-9);
        assert!((sticker.bbox.angle - std::f64::consts::FRAC_PI_2).abs() < 1e-9);

        let text = &scene.texts()[0];
        assert!((text.bbox.x - 10.0).abs() < 1e-9);
        assert_eq!(scene.strokes().len(), 1);
        assert!(scene.selected_id().is_none());
    }

    #[test]
    fn test_no_photos_cannot_start() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = SessionFile::from_json(SESSION).unwrap();
        file.photos.clear();
        file.stickers.clear();
        assert!(matches!(
            file.build_editor(dir.path()),
            Err(AppError::Session(SessionError::NoPhotos))
        ));
    }
}
