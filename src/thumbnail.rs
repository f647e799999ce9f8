use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use md5::{Digest, Md5};

use crate::codec::{Codec, SaveFormat};
use crate::raster::RasterImage;

pub const DEFAULT_THUMBNAIL_SIZE: u32 = 256;
pub const DEFAULT_THUMBNAIL_QUALITY: u8 = 80;

/// Default cache root: `<user cache dir>/qiv/thumbnails`.
pub fn default_cache_dir() -> Option<PathBuf> {
    dirs_next::cache_dir().map(|d| d.join("qiv").join("thumbnails"))
}

/// Disk cache of downscaled previews, one JPEG per (path, mtime).
///
/// Editing a file bumps its mtime, which changes the key, so stale entries
/// are simply never looked up again.
pub struct ThumbnailCache {
    root: PathBuf,
    max_size: u32,
    quality: u8,
    codec: Arc<dyn Codec>,
}

impl ThumbnailCache {
    pub fn new(root: PathBuf, max_size: u32, codec: Arc<dyn Codec>) -> Self {
        Self {
            root,
            max_size,
            quality: DEFAULT_THUMBNAIL_QUALITY,
            codec,
        }
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    /// Hex MD5 of `"<path>_<mtime seconds>"`. `None` when the file can't be stat'ed.
    pub fn cache_key(path: &Path) -> Option<String> {
        let mtime = std::fs::metadata(path)
            .ok()?
            .modified()
            .ok()?
            .duration_since(UNIX_EPOCH)
            .ok()?
            .as_secs_f64();
        let mut hasher = Md5::new();
        hasher.update(format!("{}_{}", path.display(), mtime).as_bytes());
        Some(hex_encode(hasher.finalize()))
    }

    pub fn cache_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.jpg", key))
    }

    /// Cached thumbnail for `path`, generating and storing it on a miss.
    /// Any failure yields `None`; cache write errors only cost a regeneration
    /// next time.
    pub fn load_or_create(&self, path: &Path) -> Option<RasterImage> {
        let key = Self::cache_key(path)?;
        let cache_path = self.cache_path(&key);

        if cache_path.is_file() {
            match self.codec.decode(&cache_path) {
                Ok(thumb) => return Some(thumb),
                Err(e) => log::debug!("Discarding unreadable cache entry: {}", e),
            }
        }

        let thumb = match self.codec.decode_thumbnail(path, self.max_size) {
            Ok(thumb) => thumb,
            Err(e) => {
                log::warn!("No thumbnail for {}: {}", path.display(), e);
                return None;
            }
        };
        self.store(&cache_path, &thumb);
        Some(thumb)
    }

    fn store(&self, cache_path: &Path, thumb: &RasterImage) {
        if let Err(e) = std::fs::create_dir_all(&self.root) {
            log::warn!("Cannot create thumbnail cache {}: {}", self.root.display(), e);
            return;
        }
        match self.codec.encode(thumb, SaveFormat::Jpeg, self.quality) {
            Ok(bytes) => {
                if let Err(e) = std::fs::write(cache_path, bytes) {
                    log::warn!("Cannot write {}: {}", cache_path.display(), e);
                }
            }
            Err(e) => log::warn!("Cannot encode thumbnail: {}", e),
        }
    }
}

fn hex_encode(bytes: impl AsRef<[u8]>) -> String {
    bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
}
