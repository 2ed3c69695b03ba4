//! Asset loading: the [`AssetLoader`] trait, file and in-memory loaders, and
//! a background loader that reports completions over a channel.

use crossbeam_channel::{unbounded, Receiver, Sender};
use photostrip_core::assets::{AssetError, AssetRef};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::raster::RasterImage;

/// Turns an asset reference into a decoded image.
pub trait AssetLoader: Send + Sync {
    fn load(&self, asset: &AssetRef) -> Result<RasterImage, AssetError>;
}

/// Resolves references as paths relative to a base directory.
#[derive(Debug, Clone)]
pub struct FileLoader {
    base: PathBuf,
}

impl FileLoader {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Absolute references are used as-is.
    pub fn resolve_path(&self, asset: &AssetRef) -> PathBuf {
        self.base.join(asset.as_str())
    }
}

impl AssetLoader for FileLoader {
    fn load(&self, asset: &AssetRef) -> Result<RasterImage, AssetError> {
        let path = self.resolve_path(asset);
        let bytes = std::fs::read(&path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => AssetError::NotFound(path.display().to_string()),
            _ => AssetError::Io {
                asset: asset.to_string(),
                reason: err.to_string(),
            },
        })?;
        RasterImage::decode(&bytes).map_err(|err| AssetError::Decode {
            asset: asset.to_string(),
            reason: err.to_string(),
        })
    }
}

/// Serves pre-decoded images by reference.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    images: HashMap<AssetRef, RasterImage>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asset: AssetRef, image: RasterImage) {
        self.images.insert(asset, image);
    }

    pub fn with(mut self, asset: impl Into<AssetRef>, image: RasterImage) -> Self {
        self.insert(asset.into(), image);
        self
    }
}

impl AssetLoader for MemoryLoader {
    fn load(&self, asset: &AssetRef) -> Result<RasterImage, AssetError> {
        self.images
            .get(asset)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(asset.to_string()))
    }
}

/// A finished load.
#[derive(Debug)]
pub struct Completion {
    pub asset: AssetRef,
    pub result: Result<RasterImage, AssetError>,
}

/// Runs loads on a fixed set of worker threads and queues their completions.
pub struct ThreadedLoader {
    loader: Arc<dyn AssetLoader>,
    /// `None` when no worker could be started; jobs then run inline.
    jobs: Option<Sender<AssetRef>>,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
}

impl std::fmt::Debug for ThreadedLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadedLoader")
            .field("pending", &self.jobs.as_ref().map_or(0, |jobs| jobs.len()))
            .field("queued", &self.rx.len())
            .finish()
    }
}

impl ThreadedLoader {
    pub const DEFAULT_WORKERS: usize = 2;

    pub fn new(loader: Arc<dyn AssetLoader>) -> Self {
        Self::with_workers(loader, Self::DEFAULT_WORKERS)
    }

    /// Start `workers` loader threads (at least one). Workers exit once the
    /// loader is dropped and the job queue drains.
    pub fn with_workers(loader: Arc<dyn AssetLoader>, workers: usize) -> Self {
        let (tx, rx) = unbounded();
        let (jobs_tx, jobs_rx) = unbounded::<AssetRef>();

        let mut started = 0;
        for i in 0..workers.max(1) {
            let loader = Arc::clone(&loader);
            let jobs = jobs_rx.clone();
            let done = tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("asset-loader-{i}"))
                .spawn(move || {
                    while let Ok(asset) = jobs.recv() {
                        let result = loader.load(&asset);
                        if done.send(Completion { asset, result }).is_err() {
                            break;
                        }
                    }
                });
            match spawned {
                Ok(_) => started += 1,
                Err(err) => log::warn!("Could not start asset loader thread: {}", err),
            }
        }
        if started == 0 {
            log::warn!("No asset loader threads, loading inline");
        } else {
            log::debug!("Started {} asset loader threads", started);
        }

        Self {
            loader,
            jobs: (started > 0).then_some(jobs_tx),
            tx,
            rx,
        }
    }

    /// Queue `asset` for loading. Its completion arrives through
    /// [`ThreadedLoader::try_recv`] or [`ThreadedLoader::recv_timeout`].
    pub fn spawn(&self, asset: AssetRef) {
        let asset = match &self.jobs {
            Some(jobs) => match jobs.send(asset) {
                Ok(()) => return,
                Err(err) => err.into_inner(),
            },
            None => asset,
        };
        let result = self.loader.load(&asset);
        let _ = self.tx.send(Completion { asset, result });
    }

    pub fn try_recv(&self) -> Option<Completion> {
        self.rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<Completion> {
        self.rx.recv_timeout(timeout).ok()
    }
}
