//! PhotoStrip Core Library
//!
//! Platform-agnostic scene model and interaction logic for the PhotoStrip
//! compositing editor: rotated-box geometry, placed objects, the pointer
//! state machine and layout/session configuration.

pub mod assets;
pub mod color;
pub mod geometry;
pub mod input;
pub mod interaction;
pub mod layout;
pub mod objects;
pub mod scene;

pub use assets::{AssetError, AssetRef, AssetState, AssetStore, RenderRequest};
pub use color::SerializableColor;
pub use geometry::{Corner, HandleKind, ObjectBox};
pub use input::{CursorHint, DisplayMapping, PointerEvent, TouchEvent, TouchPhase};
pub use interaction::{InteractionController, InteractionState};
pub use layout::{FontCatalog, LayoutConfig, LayoutError, SessionConfig, SessionError, SlotRect};
pub use objects::{
    ApproximateMeasurer, FontSpec, Layer, ObjectId, ObjectKind, PlacedObject, TextAlign,
    TextData, TextMeasurer, TextProperty, TextStyle,
};
pub use scene::{Brush, PhotoSlot, Scene, SceneError};
