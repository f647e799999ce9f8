//! Browsing the images of one directory, plus the directory walkers shared
//! with the thumbnail scan.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

/// Longest path shown in the window title before it gets shortened.
pub const DISPLAY_PATH_MAX: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_lowercase();
            SUPPORTED_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

fn sort_key(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Supported images directly inside `dir`, sorted case-insensitively by file
/// name. Unreadable directories produce an empty list.
pub fn list_images_flat(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Cannot list {}: {}", dir.display(), e);
            return Vec::new();
        }
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_supported(p))
        .collect();
    paths.sort_by_key(|p| sort_key(p));
    paths
}

/// Supported images under `root`, descending at most `max_depth` directory
/// levels below it. Deeper directories are never entered; `on_dir` sees
/// every directory that is.
pub fn list_images_recursive(
    root: &Path,
    max_depth: usize,
    mut on_dir: impl FnMut(&Path),
) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let walker = WalkDir::new(root)
        .max_depth(max_depth + 1)
        .sort_by(|a, b| {
            a.file_name()
                .to_string_lossy()
                .to_lowercase()
                .cmp(&b.file_name().to_string_lossy().to_lowercase())
        })
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && e.depth() > max_depth));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if entry.file_type().is_dir() {
            on_dir(entry.path());
        } else if entry.file_type().is_file() && is_supported(entry.path()) {
            paths.push(entry.into_path());
        }
    }
    paths
}

/// The full path, or just the file name when the path is longer than `max_len` characters.
pub fn format_path_for_display(path: &Path, max_len: usize) -> String {
    let text = path.display().to_string();
    if text.chars().count() <= max_len {
        return text;
    }
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or(text)
}

/// Position of the current image inside its directory listing.
#[derive(Debug, Default)]
pub struct Navigator {
    directory: Option<PathBuf>,
    paths: Vec<PathBuf>,
    current_index: Option<usize>,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point at `path`, rescanning only when its directory differs from the
    /// last one. Falls back to matching by file name when the exact path is
    /// not in the listing (e.g. a different spelling of the same directory).
    pub fn set_current_path(&mut self, path: &Path) {
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        if self.directory.as_ref() != Some(&dir) {
            self.paths = list_images_flat(&dir);
            self.directory = Some(dir);
        }

        self.current_index = self.paths.iter().position(|p| p == path).or_else(|| {
            let name = path.file_name()?;
            self.paths.iter().position(|p| p.file_name() == Some(name))
        });
    }

    /// Move one step with wrap-around and return the new current path.
    pub fn navigate(&mut self, direction: Direction) -> Option<PathBuf> {
        let len = self.paths.len();
        let index = self.current_index?;
        if len == 0 {
            return None;
        }
        let next = match direction {
            Direction::Next => (index + 1) % len,
            Direction::Previous => (index + len - 1) % len,
        };
        self.current_index = Some(next);
        Some(self.paths[next].clone())
    }

    /// Rescan the directory, keeping the current file selected if it still exists.
    pub fn refresh(&mut self) {
        let Some(dir) = self.directory.clone() else {
            return;
        };
        let current = self.current_path().map(Path::to_path_buf);
        self.paths = list_images_flat(&dir);
        self.current_index = current.and_then(|c| self.paths.iter().position(|p| *p == c));
    }

    /// Forget the current file, keeping the listing.
    pub fn clear_current(&mut self) {
        self.current_index = None;
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current_index
            .and_then(|i| self.paths.get(i))
            .map(PathBuf::as_path)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current_filename(&self) -> Option<String> {
        self.current_path()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
    }

    pub fn total_count(&self) -> usize {
        self.paths.len()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// `"i/N - name"` for the status bar.
    pub fn position_label(&self) -> Option<String> {
        let index = self.current_index?;
        Some(format!(
            "{}/{} - {}",
            index + 1,
            self.paths.len(),
            self.current_filename().unwrap_or_default()
        ))
    }
}
