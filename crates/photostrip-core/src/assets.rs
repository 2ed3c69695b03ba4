//! Asset references and load-state tracking.
//!
//! Loading itself happens elsewhere; this module only records which assets
//! were requested, which resolved and which failed, and tells the caller what
//! kind of re-render a completion calls for.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Opaque reference to an image asset (a path, catalog key or URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetRef(String);

impl AssetRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Asset loading errors.
#[derive(Debug, Clone, Error)]
pub enum AssetError {
    #[error("Asset not found: {0}")]
    NotFound(String),
    #[error("Failed to read {asset}: {reason}")]
    Io { asset: String, reason: String },
    #[error("Failed to decode {asset}: {reason}")]
    Decode { asset: String, reason: String },
    #[error("Loader shut down before {0} completed")]
    Disconnected(String),
}

/// Load state of a single asset.
#[derive(Debug, Clone)]
pub enum AssetState<I> {
    Pending,
    Ready(I),
    Failed(AssetError),
}

/// Re-render requested by an asset completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderRequest {
    /// The asset is ready; draw it.
    Redraw(AssetRef),
    /// The asset failed; draw its fallback.
    Fallback(AssetRef),
}

/// Per-asset load states, keyed by reference.
#[derive(Debug, Clone)]
pub struct AssetStore<I> {
    entries: HashMap<AssetRef, AssetState<I>>,
}

impl<I> Default for AssetStore<I> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<I> AssetStore<I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an asset as requested.
    ///
    /// Returns `true` if the caller should start a load, i.e. the asset was
    /// unknown before. Pending, ready and failed assets are not reloaded.
    pub fn request(&mut self, asset: &AssetRef) -> bool {
        if self.entries.contains_key(asset) {
            return false;
        }
        self.entries.insert(asset.clone(), AssetState::Pending);
        true
    }

    /// Insert an already-decoded asset.
    pub fn insert_ready(&mut self, asset: AssetRef, image: I) {
        self.entries.insert(asset, AssetState::Ready(image));
    }

    /// Record a load completion and report which re-render it calls for.
    pub fn resolve(&mut self, asset: AssetRef, result: Result<I, AssetError>) -> RenderRequest {
        match result {
            Ok(image) => {
                log::debug!("Asset ready: {}", asset);
                self.entries.insert(asset.clone(), AssetState::Ready(image));
                RenderRequest::Redraw(asset)
            }
            Err(err) => {
                log::warn!("Asset failed to load: {}", err);
                self.entries.insert(asset.clone(), AssetState::Failed(err));
                RenderRequest::Fallback(asset)
            }
        }
    }

    /// Forget a failed asset so that the next [`AssetStore::request`] retries it.
    pub fn forget_failed(&mut self, asset: &AssetRef) -> bool {
        if matches!(self.entries.get(asset), Some(AssetState::Failed(_))) {
            self.entries.remove(asset);
            true
        } else {
            false
        }
    }

    pub fn state(&self, asset: &AssetRef) -> Option<&AssetState<I>> {
        self.entries.get(asset)
    }

    /// The decoded asset, if it is ready.
    pub fn get(&self, asset: &AssetRef) -> Option<&I> {
        match self.entries.get(asset) {
            Some(AssetState::Ready(image)) => Some(image),
            _ => None,
        }
    }

    pub fn is_failed(&self, asset: &AssetRef) -> bool {
        matches!(self.entries.get(asset), Some(AssetState::Failed(_)))
    }

    /// Number of assets still loading.
    pub fn pending_count(&self) -> usize {
        self.entries
            .values()
            .filter(|s| matches!(s, AssetState::Pending))
            .count()
    }
}
