//! Background thumbnail scan of a directory.
//!
//! The worker owns its own thread and talks to the UI only through the event
//! channel; the UI drains it without blocking. Cancellation is a shared flag
//! the worker polls before starting and before each file.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::JoinHandle;

use rayon::prelude::*;

use crate::navigator;
use crate::raster::RasterImage;
use crate::thumbnail::ThumbnailCache;

#[derive(Debug, Clone)]
pub enum ScanEvent {
    Progress(String),
    ThumbnailReady { path: PathBuf, image: RasterImage },
    Finished,
    Error(String),
}

#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub directory: PathBuf,
    pub recursive: bool,
    pub max_depth: usize,
    /// Files decoded in parallel between cancellation checkpoints on the event stream.
    pub batch_size: usize,
}

pub struct ThumbnailScan {
    cancel: Arc<AtomicBool>,
    events: mpsc::Receiver<ScanEvent>,
    handle: Option<JoinHandle<()>>,
}

impl ThumbnailScan {
    pub fn start(request: ScanRequest, cache: Arc<ThumbnailCache>) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();
        let spawn_tx = tx.clone();

        let worker_cancel = Arc::clone(&cancel);
        let handle = std::thread::Builder::new()
            .name("qiv-thumbnails".into())
            .spawn(move || {
                let panic_tx = tx.clone();
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    run(&request, &cache, &worker_cancel, &tx)
                }));
                if let Err(payload) = outcome {
                    let message = payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "thumbnail worker crashed".into());
                    log::error!("Thumbnail scan failed: {}", message);
                    let _ = panic_tx.send(ScanEvent::Error(message));
                }
            });

        let handle = worker_or_error(handle, &spawn_tx);
        Self {
            cancel,
            events: rx,
            handle,
        }
    }

    /// Ask the worker to stop. Work already in flight for one file still completes.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Events emitted since the last call, without blocking.
    pub fn drain(&self) -> Vec<ScanEvent> {
        self.events.try_iter().collect()
    }

    /// Block until the worker exits and return everything it emitted.
    pub fn wait(mut self) -> Vec<ScanEvent> {
        let events: Vec<ScanEvent> = self.events.iter().collect();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        events
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

/// A worker that never started still owes the UI a terminal event.
fn worker_or_error(
    spawned: std::io::Result<JoinHandle<()>>,
    tx: &mpsc::Sender<ScanEvent>,
) -> Option<JoinHandle<()>> {
    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            log::error!("Cannot spawn thumbnail worker: {}", e);
            let _ = tx.send(ScanEvent::Error(format!("cannot start worker: {}", e)));
            None
        }
    }
}

impl Drop for ThumbnailScan {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn run(
    request: &ScanRequest,
    cache: &ThumbnailCache,
    cancel: &AtomicBool,
    tx: &mpsc::Sender<ScanEvent>,
) {
    let cancelled = || cancel.load(Ordering::Relaxed);
    if cancelled() {
        return;
    }

    let paths = if request.recursive {
        navigator::list_images_recursive(&request.directory, request.max_depth, |dir| {
            log::debug!("Scanning {}", dir.display())
        })
    } else {
        navigator::list_images_flat(&request.directory)
    };
    if cancelled() {
        return;
    }

    let total = paths.len();
    log::info!(
        "Scanning {} ({} images)",
        request.directory.display(),
        total
    );
    if tx
        .send(ScanEvent::Progress(format!(
            "Found {} images. Loading thumbnails...",
            total
        )))
        .is_err()
    {
        return;
    }

    let mut done = 0;
    for batch in paths.chunks(request.batch_size.max(1)) {
        if cancelled() {
            log::debug!("Thumbnail scan cancelled after {}/{}", done, total);
            return;
        }
        let results: Vec<Option<RasterImage>> = batch
            .par_iter()
            .map(|path| {
                if cancelled() {
                    None
                } else {
                    cache.load_or_create(path)
                }
            })
            .collect();

        for (path, thumb) in batch.iter().zip(results) {
            done += 1;
            if cancelled() {
                return;
            }
            let progress = ScanEvent::Progress(format!("Loading thumbnails... {}/{}", done, total));
            if tx.send(progress).is_err() {
                return;
            }
            if let Some(image) = thumb {
                let ready = ScanEvent::ThumbnailReady {
                    path: path.clone(),
                    image,
                };
                if tx.send(ready).is_err() {
                    return;
                }
            }
        }
    }
    let _ = tx.send(ScanEvent::Finished);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Codec, ImageCodec, SaveFormat};
    use crate::error::{Error, Result};
    use image::{DynamicImage, Rgb, RgbImage};
    use std::path::Path;
    use tempfile::TempDir;

    fn write_png(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let img = RgbImage::from_pixel(20, 10, Rgb([10, 200, 30]));
        DynamicImage::ImageRgb8(img).save(path).unwrap();
    }

    fn cache_in(dir: &TempDir, codec: Arc<dyn Codec>) -> Arc<ThumbnailCache> {
        Arc::new(ThumbnailCache::new(dir.path().join("cache"), 16, codec))
    }

    fn request(dir: &Path, recursive: bool) -> ScanRequest {
        ScanRequest {
            directory: dir.to_path_buf(),
            recursive,
            max_depth: 2,
            batch_size: 2,
        }
    }

    fn ready_names(events: &[ScanEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                ScanEvent::ThumbnailReady { path, .. } => {
                    Some(path.file_name().unwrap().to_string_lossy().into_owned())
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn emits_found_then_thumbnails_in_order_then_finished() {
        let dir = TempDir::new().unwrap();
        let photos = dir.path().join("photos");
        for name in ["c.png", "a.png", "b.png"] {
            write_png(&photos.join(name));
        }
        std::fs::write(photos.join("broken.png"), b"nope").unwrap();

        let cache = cache_in(&dir, Arc::new(ImageCodec));
        let events = ThumbnailScan::start(request(&photos, false), cache).wait();

        assert!(
            matches!(
                &events[0],
                ScanEvent::Progress(m) if m == "Found 4 images. Loading thumbnails..."
            )
        );
        assert_eq!(ready_names(&events), ["a.png", "b.png", "c.png"]);
        assert!(matches!(events.last(), Some(ScanEvent::Finished)));
        assert!(!events.iter().any(|e| matches!(e, ScanEvent::Error(_))));
        assert!(events.iter().any(
            |e| matches!(e, ScanEvent::Progress(m) if m == "Loading thumbnails... 4/4")
        ));
    }

    #[test]
    fn recursive_scan_respects_depth() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("root");
        write_png(&root.join("l0.png"));
        write_png(&root.join("a/l1.png"));
        write_png(&root.join("a/b/l2.png"));
        write_png(&root.join("a/b/c/l3.png"));

        let cache = cache_in(&dir, Arc::new(ImageCodec));
        let events = ThumbnailScan::start(request(&root, true), cache).wait();
        let mut names = ready_names(&events);
        names.sort();
        assert_eq!(names, ["l0.png", "l1.png", "l2.png"]);
    }

    #[test]
    fn missing_directory_finishes_empty() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir, Arc::new(ImageCodec));
        let events = ThumbnailScan::start(request(&dir.path().join("gone"), true), cache).wait();
        assert!(ready_names(&events).is_empty());
        assert!(matches!(events.last(), Some(ScanEvent::Finished)));
    }

    /// Blocks every decode until released, so cancellation can be observed mid-scan.
    struct GatedCodec {
        gate: std::sync::Mutex<mpsc::Receiver<()>>,
    }

    impl Codec for GatedCodec {
        fn decode(&self, path: &Path) -> Result<RasterImage> {
            ImageCodec.decode(path)
        }

        fn decode_thumbnail(&self, path: &Path, max_size: u32) -> Result<RasterImage> {
            let _ = self.gate.lock().unwrap().recv();
            ImageCodec.decode_thumbnail(path, max_size)
        }

        fn encode(&self, image: &RasterImage, format: SaveFormat, quality: u8) -> Result<Vec<u8>> {
            ImageCodec.encode(image, format, quality)
        }
    }

    #[test]
    fn cancel_stops_without_finished_or_error() {
        let dir = TempDir::new().unwrap();
        let photos = dir.path().join("photos");
        for i in 0..10 {
            write_png(&photos.join(format!("{i:02}.png")));
        }
        let (release, gate) = mpsc::channel();
        let codec = Arc::new(GatedCodec {
            gate: std::sync::Mutex::new(gate),
        });
        let mut req = request(&photos, false);
        req.batch_size = 1;
        let scan = ThumbnailScan::start(req, cache_in(&dir, codec));

        release.send(()).unwrap();
        scan.cancel();
        // Unblock anything still waiting; the sender going away ends every recv.
        drop(release);

        let events = scan.wait();
        assert!(ready_names(&events).len() <= 1);
        assert!(!events.iter().any(|e| matches!(e, ScanEvent::Finished)));
        assert!(!events.iter().any(|e| matches!(e, ScanEvent::Error(_))));
    }

    #[test]
    fn cancelled_before_start_emits_nothing() {
        let dir = TempDir::new().unwrap();
        let photos = dir.path().join("photos");
        write_png(&photos.join("a.png"));
        let cache = cache_in(&dir, Arc::new(ImageCodec));
        let (tx, rx) = mpsc::channel();
        run(&request(&photos, false), &cache, &AtomicBool::new(true), &tx);
        drop(tx);
        assert_eq!(rx.iter().count(), 0);
    }

    struct PanickingCodec;

    impl Codec for PanickingCodec {
        fn decode(&self, _: &Path) -> Result<RasterImage> {
            Err(Error::NoImage)
        }

        fn decode_thumbnail(&self, _: &Path, _: u32) -> Result<RasterImage> {
            panic!("decoder exploded")
        }

        fn encode(&self, _: &RasterImage, _: SaveFormat, _: u8) -> Result<Vec<u8>> {
            Err(Error::NoImage)
        }
    }

    #[test]
    fn worker_panic_becomes_error_event() {
        let dir = TempDir::new().unwrap();
        let photos = dir.path().join("photos");
        write_png(&photos.join("a.png"));
        let events =
            ThumbnailScan::start(request(&photos, false), cache_in(&dir, Arc::new(PanickingCodec)))
                .wait();
        assert!(
            matches!(events.last(), Some(ScanEvent::Error(m)) if m.contains("decoder exploded"))
        );
    }

    #[test]
    fn failed_spawn_reports_error() {
        let (tx, rx) = mpsc::channel();
        let handle = worker_or_error(Err(std::io::Error::other("no threads left")), &tx);
        assert!(handle.is_none());
        drop(tx);
        let events: Vec<ScanEvent> = rx.iter().collect();
        assert!(matches!(
            events.as_slice(),
            [ScanEvent::Error(message)] if message.contains("no threads left")
        ));
    }
}
