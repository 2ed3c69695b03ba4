//! The editing session: scene, interaction, assets and export behind one API.
//!
//! An [`Editor`] is a single logical actor. Callers feed it UI events in
//! order, drain asset completions with [`Editor::poll_assets`] and redraw
//! whenever something reports a change.

use kurbo::{Point, Rect};
use photostrip_core::assets::{AssetRef, AssetState, AssetStore, RenderRequest};
use photostrip_core::color::SerializableColor;
use photostrip_core::input::{CursorHint, DisplayMapping, PointerEvent, TouchEvent};
use photostrip_core::interaction::{InteractionController, InteractionState};
use photostrip_core::layout::{SessionConfig, SessionError};
use photostrip_core::objects::{ObjectId, PlacedObject, TextProperty, TextStyle};
use photostrip_core::scene::{Scene, SceneError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::compositor::{Compositor, RenderOptions};
use crate::export::{ExportError, ExportRequest, Exporter};
use crate::fonts::FontBook;
use crate::loader::{AssetLoader, Completion, ThreadedLoader};
use crate::raster::{PixmapSurface, RasterImage};
use crate::surface::Surface;
use crate::RenderError;

/// Result of opening a session.
#[derive(Debug)]
pub enum EditorState {
    Ready(Box<Editor>),
    /// The session cannot start; the user has to go back and capture photos.
    NeedsCapture(SessionError),
}

impl EditorState {
    pub fn into_editor(self) -> Result<Editor, SessionError> {
        match self {
            EditorState::Ready(editor) => Ok(*editor),
            EditorState::NeedsCapture(err) => Err(err),
        }
    }
}

/// Outcome of [`Editor::add_sticker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StickerAdd {
    Added(ObjectId),
    /// The image is still loading; the sticker is placed when it arrives.
    Queued,
}

pub struct Editor {
    config: SessionConfig,
    scene: Scene,
    controller: InteractionController,
    assets: AssetStore<RasterImage>,
    loader: ThreadedLoader,
    fonts: Arc<FontBook>,
    pending_stickers: Vec<AssetRef>,
    exporter: Exporter,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("layout", &self.config.layout.name)
            .field("state", self.controller.state())
            .field("pending_assets", &self.assets.pending_count())
            .field("pending_stickers", &self.pending_stickers.len())
            .finish()
    }
}

impl Editor {
    /// Start a session over the captured `photos`. Photo loads begin immediately.
    pub fn open(
        config: SessionConfig,
        photos: Vec<AssetRef>,
        loader: Arc<dyn AssetLoader>,
        fonts: FontBook,
    ) -> EditorState {
        if let Err(err) = config.check_session(photos.len()) {
            log::info!("Session cannot start: {}", err);
            return EditorState::NeedsCapture(err);
        }
        let scene = match Scene::from_layout(&config.layout, &photos) {
            Ok(scene) => scene,
            Err(err) => return EditorState::NeedsCapture(err),
        };

        let mut editor = Editor {
            controller: InteractionController::for_canvas(scene.canvas_size()),
            scene,
            config,
            assets: AssetStore::new(),
            loader: ThreadedLoader::new(loader),
            fonts: Arc::new(fonts),
            pending_stickers: Vec::new(),
            exporter: Exporter::new(),
        };
        let bound: Vec<AssetRef> = editor
            .scene
            .slots()
            .iter()
            .filter_map(|slot| slot.photo.clone())
            .collect();
        for photo in &bound {
            editor.request_asset(photo);
        }
        log::debug!("Opened session for layout {}", editor.config.layout.name);
        EditorState::Ready(Box::new(editor))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn assets(&self) -> &AssetStore<RasterImage> {
        &self.assets
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    pub fn interaction_state(&self) -> &InteractionState {
        self.controller.state()
    }

    /// Register a font face and re-measure existing text.
    pub fn register_font(
        &mut self,
        family: &str,
        bold: bool,
        italic: bool,
        bytes: Vec<u8>,
    ) -> Result<(), RenderError> {
        Arc::make_mut(&mut self.fonts).register(family, bold, italic, bytes)?;
        self.scene.remeasure_texts(self.fonts.as_ref());
        Ok(())
    }

    fn request_asset(&mut self, asset: &AssetRef) {
        if self.assets.request(asset) {
            log::debug!("Loading {}", asset);
            self.loader.spawn(asset.clone());
        }
    }

    /// Start loading assets ahead of use. Known assets are not reloaded.
    pub fn preload(&mut self, assets: &[AssetRef]) {
        for asset in assets {
            self.request_asset(asset);
        }
    }

    /// Load a failed asset again. Returns `false` if it had not failed.
    pub fn retry_failed(&mut self, asset: &AssetRef) -> bool {
        if !self.assets.forget_failed(asset) {
            return false;
        }
        log::info!("Retrying {}", asset);
        self.request_asset(asset);
        true
    }

    /// Start loading every sticker in the session's catalog.
    pub fn preload_stickers(&mut self) {
        let catalog = self.config.stickers.clone();
        self.preload(&catalog);
    }

    /// Place a sticker, or queue it until its image has loaded.
    pub fn add_sticker(&mut self, asset: AssetRef) -> StickerAdd {
        let size = match self.assets.state(&asset) {
            Some(AssetState::Ready(image)) => Some((image.width() as f64, image.height() as f64)),
            Some(AssetState::Failed(err)) => {
                log::warn!("Adding sticker with a failed image: {}", err);
                Some((1.0, 1.0))
            }
            Some(AssetState::Pending) | None => None,
        };
        match size {
            Some((width, height)) => StickerAdd::Added(self.scene.add_sticker(asset, width, height)),
            None => {
                self.request_asset(&asset);
                self.pending_stickers.push(asset);
                StickerAdd::Queued
            }
        }
    }

    /// The style new text starts with.
    pub fn default_text_style(&self) -> TextStyle {
        self.config.fonts.default_style.clone()
    }

    pub fn add_text(&mut self, content: &str, style: TextStyle) -> ObjectId {
        self.scene.add_text(content, style, self.fonts.as_ref())
    }

    pub fn remove_selected(&mut self) -> Result<PlacedObject, SceneError> {
        self.scene.remove_selected()
    }

    pub fn remove_selected_sticker(&mut self) -> Result<PlacedObject, SceneError> {
        self.scene.remove_selected_sticker()
    }

    pub fn remove_selected_text(&mut self) -> Result<PlacedObject, SceneError> {
        self.scene.remove_selected_text()
    }

    /// Edit the selected text by control name, e.g. `("shadowBlur", "4")`.
    pub fn set_text_property(&mut self, name: &str, value: &str) -> Result<(), SceneError> {
        let property = TextProperty::parse(name, value)?;
        if let TextProperty::FontFamily(family) = &property {
            if !self.fonts.has_family(family) {
                log::info!("Font {} is not registered, drawing with the default font", family);
            }
        }
        self.scene.set_text_property(property, self.fonts.as_ref())
    }

    /// Flip draw mode and return the new value. A drag, resize, rotate or
    /// stroke in progress ends first.
    pub fn toggle_draw_mode(&mut self) -> bool {
        self.controller.pointer_leave(&mut self.scene);
        self.scene.toggle_draw_mode()
    }

    pub fn clear_strokes(&mut self) {
        self.scene.clear_strokes();
    }

    pub fn set_brush(&mut self, color: SerializableColor, width: f64) {
        self.scene.set_brush(color, width);
    }

    /// Choose a frame overlay by index, or `None` for no frame.
    pub fn select_frame(&mut self, index: Option<usize>) -> Result<(), SceneError> {
        self.scene.select_frame(index)?;
        if let Some(frame) = self.scene.frame().cloned() {
            self.request_asset(&frame);
        }
        Ok(())
    }

    /// Returns `true` if the scene changed.
    pub fn pointer(&mut self, event: PointerEvent) -> bool {
        self.controller
            .handle_pointer(&mut self.scene, event, self.fonts.as_ref())
    }

    pub fn touch(&mut self, event: &TouchEvent) -> bool {
        self.controller
            .handle_touch(&mut self.scene, event, self.fonts.as_ref())
    }

    pub fn cursor_at(&self, position: Point) -> CursorHint {
        self.controller.cursor_at(&self.scene, position)
    }

    /// Where the canvas is shown, in display coordinates.
    pub fn set_display_rect(&mut self, display_rect: Rect) {
        let mapping = DisplayMapping::new(display_rect, self.scene.canvas_size());
        self.controller.set_mapping(mapping);
    }

    /// Draw the scene with selection chrome. Safe to call repeatedly.
    pub fn render_preview(&self, surface: &mut dyn Surface) {
        Compositor::new(&self.assets).render(&self.scene, surface, RenderOptions::preview());
    }

    /// Render a preview into a new canvas-sized pixmap.
    pub fn preview_surface(&self) -> Result<PixmapSurface, RenderError> {
        let mut surface = PixmapSurface::for_canvas(self.scene.canvas_size(), Arc::clone(&self.fonts))?;
        self.render_preview(&mut surface);
        Ok(surface)
    }

    /// Apply finished loads. Each completion asks for a redraw or a fallback.
    pub fn poll_assets(&mut self) -> Vec<RenderRequest> {
        let mut requests = Vec::new();
        while let Some(completion) = self.loader.try_recv() {
            requests.push(self.complete(completion));
        }
        requests
    }

    /// Wait until no load is pending or `timeout` elapses.
    pub fn settle_assets(&mut self, timeout: Duration) -> Vec<RenderRequest> {
        let deadline = Instant::now() + timeout;
        let mut requests = self.poll_assets();
        while self.assets.pending_count() > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.loader.recv_timeout(remaining) {
                Some(completion) => requests.push(self.complete(completion)),
                None => {
                    log::warn!("{} assets still loading after {:?}", self.assets.pending_count(), timeout);
                    break;
                }
            }
        }
        requests
    }

    fn complete(&mut self, completion: Completion) -> RenderRequest {
        let Completion { asset, result } = completion;
        let request = self.assets.resolve(asset.clone(), result);
        let queued = self.pending_stickers.iter().filter(|s| **s == asset).count();
        if queued > 0 {
            self.pending_stickers.retain(|s| *s != asset);
            for _ in 0..queued {
                self.add_sticker(asset.clone());
            }
        }
        request
    }

    /// Export the composite without selection chrome.
    pub fn export(&self, request: ExportRequest) -> Result<Vec<u8>, ExportError> {
        self.exporter
            .export(&self.scene, &self.assets, Arc::clone(&self.fonts), request)
    }
}
