//! Image decoding engine.
//!
//! Loads run on detached worker threads and report back over a channel, so the
//! UI thread never blocks on disk or decode. Results carry the generation they
//! were requested with; deciding whether a result is still wanted is up to the
//! caller.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use anyhow::Context as _;
use plotshelf_core::LoadRequest;

pub struct LoadedImage {
    pub generation: u64,
    pub path: PathBuf,
    pub result: anyhow::Result<image::DynamicImage>,
}

impl std::fmt::Debug for LoadedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedImage")
            .field("generation", &self.generation)
            .field("path", &self.path)
            .field("ok", &self.result.is_ok())
            .finish()
    }
}

#[derive(Debug)]
pub struct ImageLoader {
    tx: Sender<LoadedImage>,
    rx: Receiver<LoadedImage>,
    in_flight: usize,
}

impl Default for ImageLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageLoader {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// Decodes `path`, the resolved location of `request.path`, in the
    /// background. Fire-and-forget: there is no cancellation.
    pub fn request(&mut self, request: &LoadRequest, path: PathBuf) {
        let generation = request.generation;
        self.in_flight += 1;
        let tx = self.tx.clone();
        let worker_path = path.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("image-load-{generation}"))
            .spawn(move || {
                let started = Instant::now();
                let result = decode_image(&worker_path);
                tracing::debug!(
                    generation,
                    path = %worker_path.display(),
                    ok = result.is_ok(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "image decode finished"
                );
                // The receiver only goes away on shutdown.
                let _ = tx.send(LoadedImage {
                    generation,
                    path: worker_path,
                    result,
                });
            });

        if let Err(err) = spawned {
            let _ = self.tx.send(LoadedImage {
                generation,
                path,
                result: Err(anyhow::Error::new(err).context("spawn image loader thread")),
            });
        }
    }

    /// Drains every load that has finished since the last call.
    pub fn poll(&mut self) -> Vec<LoadedImage> {
        let done: Vec<LoadedImage> = self.rx.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(done.len());
        done
    }

    /// Blocks until one load finishes or `timeout` elapses.
    pub fn wait(&mut self, timeout: Duration) -> Option<LoadedImage> {
        let loaded = self.rx.recv_timeout(timeout).ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(loaded)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

pub fn decode_image(path: &Path) -> anyhow::Result<image::DynamicImage> {
    let reader = image::ImageReader::open(path)
        .with_context(|| format!("open image {}", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("detect image format {}", path.display()))?;
    reader
        .decode()
        .with_context(|| format!("decode image {}", path.display()))
}
