//! Desktop integrations: clipboard, trash and file-manager reveal.

use std::borrow::Cow;
use std::path::Path;
use std::process::Command;

use crate::error::{Error, Result};
use crate::raster::RasterImage;

pub trait Clipboard {
    /// `Ok(None)` when the clipboard holds no image.
    fn get_image(&mut self) -> Result<Option<RasterImage>>;
    fn set_image(&mut self, image: &RasterImage) -> Result<()>;
}

/// System clipboard via `arboard`. The handle is kept alive so images we set
/// stay available on X11/Wayland after the call returns.
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        let inner = match arboard::Clipboard::new() {
            Ok(c) => Some(c),
            Err(e) => {
                log::warn!("Clipboard unavailable: {}", e);
                None
            }
        };
        Self { inner }
    }

    fn handle(&mut self) -> Result<&mut arboard::Clipboard> {
        self.inner
            .as_mut()
            .ok_or_else(|| Error::Clipboard("clipboard unavailable".into()))
    }
}

impl Clipboard for SystemClipboard {
    fn get_image(&mut self) -> Result<Option<RasterImage>> {
        match self.handle()?.get_image() {
            Ok(data) => Ok(RasterImage::from_rgba(
                data.width as u32,
                data.height as u32,
                data.bytes.into_owned(),
            )),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(Error::Clipboard(e.to_string())),
        }
    }

    fn set_image(&mut self, image: &RasterImage) -> Result<()> {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        let data = arboard::ImageData {
            width: width as usize,
            height: height as usize,
            bytes: Cow::Owned(rgba.into_raw()),
        };
        self.handle()?
            .set_image(data)
            .map_err(|e| Error::Clipboard(e.to_string()))
    }
}

pub trait Trash {
    fn move_to_trash(&self, path: &Path) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTrash;

impl Trash for SystemTrash {
    fn move_to_trash(&self, path: &Path) -> Result<()> {
        trash::delete(path).map_err(|e| Error::Trash(format!("{}: {}", path.display(), e)))?;
        log::info!("Moved to trash: {}", path.display());
        Ok(())
    }
}

/// Show `path` in the platform file manager. Best effort; failures are logged only.
pub fn reveal(path: &Path) {
    let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let folder = path.parent().unwrap_or(&path).to_path_buf();

    let attempts: Vec<Command> = if cfg!(target_os = "windows") {
        let mut select = Command::new("explorer");
        select.arg(format!("/select,{}", path.display()));
        vec![select]
    } else if cfg!(target_os = "macos") {
        let mut select = Command::new("open");
        select.arg("-R").arg(&path);
        vec![select]
    } else {
        let mut show_items = Command::new("dbus-send");
        show_items.args([
            "--print-reply",
            "--dest=org.freedesktop.FileManager1",
            "/org/freedesktop/FileManager1",
            "org.freedesktop.FileManager1.ShowItems",
        ]);
        show_items.arg(format!("array:string:file://{}", path.display()));
        show_items.arg("string:");
        let mut open_folder = Command::new("xdg-open");
        open_folder.arg(&folder);
        vec![show_items, open_folder]
    };

    for mut cmd in attempts {
        match cmd.status() {
            Ok(status) if status.success() => return,
            Ok(status) => log::debug!("Reveal command {:?} exited with {}", cmd, status),
            Err(e) => log::debug!("Reveal command {:?} failed: {}", cmd, e),
        }
    }
    log::warn!("Could not reveal {} in a file manager", path.display());
}
