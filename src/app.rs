use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use iced::keyboard::{self, Key, Modifiers, key::Named};
use iced::mouse::{self, ScrollDelta};
use iced::widget::{
    button, column, container, image, mouse_area, row, rule, scrollable, slider, text,
    text_input, Space,
};
use iced::{Color, ContentFit, Element, Length, Subscription, Task, Theme};

use crate::codec::{self, Codec, ImageCodec, SaveFormat};
use crate::config::Settings;
use crate::geometry;
use crate::metadata::{self, ExifEntry, FileInfo};
use crate::model::{self, Dimension, ImageModel};
use crate::navigator::{self, Direction, Navigator, DISPLAY_PATH_MAX};
use crate::platform::{self, Clipboard, SystemClipboard, SystemTrash, Trash};
use crate::raster::RasterImage;
use crate::render::{FrameInput, FrameRenderer};
use crate::scan::{ScanEvent, ScanRequest, ThumbnailScan};
use crate::thumbnail::ThumbnailCache;
use crate::viewport::{
    CursorGlyph, Effects, InputEvent, MouseButton, ToolMode, Viewport, ViewportEffect,
};

const INITIAL_WINDOW: iced::Size = iced::Size::new(1280.0, 800.0);
const TOOLBAR_HEIGHT: f32 = 48.0;
const STATUS_HEIGHT: f32 = 28.0;
const INFO_WIDTH: f32 = 281.0;
/// Pixel scroll deltas per wheel notch.
const PIXELS_PER_NOTCH: f32 = 50.0;
const OPEN_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp"];

const SHORTCUTS: &[(&str, &str)] = &[
    ("Ctrl+O", "Open image"),
    ("Ctrl+S", "Save as"),
    ("Ctrl+R", "Reload from disk"),
    ("Ctrl+N", "New window"),
    ("Ctrl+C", "Copy selection or image"),
    ("Ctrl+V", "Paste image"),
    ("Ctrl+X / C", "Crop mode, apply crop"),
    ("Ctrl+T", "Resize"),
    ("Ctrl+Z / Ctrl+Y", "Undo / redo"),
    ("R / L", "Rotate 90\u{b0} right / left"),
    ("] / [", "Rotate 1\u{b0} right / left"),
    ("H / V", "Flip horizontal / vertical"),
    ("E / Shift+E", "Exposure up / down"),
    ("B", "White balance picker"),
    ("M", "Loupe"),
    ("N / Shift+N", "Next / previous image"),
    ("+ / -", "Zoom in / out"),
    ("=", "Original size"),
    ("W", "Fit to window"),
    ("I", "Image info"),
    ("T", "Thumbnails"),
    ("Delete", "Move to trash"),
    ("Esc", "Cancel tool"),
    ("Q", "Quit"),
    ("F1", "This help"),
];

pub fn run(settings: Settings) -> iced::Result {
    iced::application(move || boot(settings.clone()), update, view)
        .title(title)
        .theme(theme)
        .subscription(subscription)
        .window_size(INITIAL_WINDOW)
        .centered()
        .run()
}

fn boot(settings: Settings) -> (Qiv, Task<Message>) {
    let mut state = Qiv::new(settings);

    let task = match state.settings.initial_path.clone() {
        Some(path) if path.is_dir() => {
            state.screen = Screen::Thumbnails;
            start_scan(&mut state, path);
            Task::none()
        }
        Some(path) if path.is_file() => load_image(&mut state, path),
        Some(path) => {
            log::warn!("Not found: {}", path.display());
            state.status = format!("File not found: {}", path.display());
            Task::none()
        }
        None => Task::none(),
    };
    (state, task)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Viewer,
    Thumbnails,
}

#[derive(Debug, Clone)]
struct ResizePanel {
    original: (u32, u32),
    width: String,
    height: String,
    keep_aspect: bool,
}

#[derive(Debug, Clone)]
struct PendingSave {
    path: PathBuf,
    format: SaveFormat,
    quality: u8,
}

#[derive(Default)]
struct ThumbnailGrid {
    directory: Option<PathBuf>,
    recursive: bool,
    thumbs: Vec<(PathBuf, image::Handle)>,
    scan: Option<ThumbnailScan>,
    status: String,
    selected: Option<usize>,
}

struct Qiv {
    settings: Settings,
    codec: Arc<dyn Codec>,
    cache: Arc<ThumbnailCache>,
    model: ImageModel,
    navigator: Navigator,
    viewport: Viewport,
    renderer: FrameRenderer,
    frame: Option<image::Handle>,
    // Bumped on every pixel change so the renderer knows its cache is stale.
    generation: u64,
    clipboard: SystemClipboard,
    trash: SystemTrash,
    pointer: geometry::Point,
    cursor: CursorGlyph,
    zoom_percent: u32,
    status: String,
    screen: Screen,
    window: iced::Size,
    show_info: bool,
    show_help: bool,
    cached_info: Option<(PathBuf, FileInfo, Option<Vec<ExifEntry>>)>,
    resize_panel: Option<ResizePanel>,
    pending_save: Option<PendingSave>,
    grid: ThumbnailGrid,
}

impl Qiv {
    fn new(settings: Settings) -> Self {
        let codec: Arc<dyn Codec> = Arc::new(ImageCodec);
        let cache = Arc::new(
            ThumbnailCache::new(
                settings.cache_dir.clone(),
                settings.thumbnail_size,
                Arc::clone(&codec),
            )
            .with_quality(settings.thumbnail_quality),
        );
        log::info!(
            "Thumbnail cache at {} ({} px)",
            cache.root().display(),
            cache.max_size()
        );
        let mut state = Self {
            model: ImageModel::new(settings.edit),
            viewport: Viewport::new(settings.viewport.clone()),
            settings,
            codec,
            cache,
            navigator: Navigator::new(),
            renderer: FrameRenderer::new(),
            frame: None,
            generation: 0,
            clipboard: SystemClipboard::new(),
            trash: SystemTrash,
            pointer: geometry::Point::default(),
            cursor: CursorGlyph::Arrow,
            zoom_percent: 100,
            status: String::from("Ready"),
            screen: Screen::Viewer,
            window: INITIAL_WINDOW,
            show_info: false,
            show_help: false,
            cached_info: None,
            resize_panel: None,
            pending_save: None,
            grid: ThumbnailGrid::default(),
        };
        sync_view_size(&mut state);
        state
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Open,
    Save,
    Reload,
    NewWindow,
    Copy,
    Paste,
    Crop,
    Resize,
    Undo,
    Redo,
    RotateClockwise,
    RotateCounterclockwise,
    RotateFineClockwise,
    RotateFineCounterclockwise,
    FlipHorizontal,
    FlipVertical,
    ExposureUp,
    ExposureDown,
    WhiteBalance,
    Loupe,
    Next,
    Previous,
    ZoomIn,
    ZoomOut,
    OriginalSize,
    FitWindow,
    Delete,
    Info,
    Thumbnails,
    Help,
    Quit,
    Escape,
    Enter,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PointerInput {
    Moved(iced::Point),
    Pressed(MouseButton),
    Released(MouseButton),
    DoubleClicked,
    Scrolled(f32),
}

#[derive(Debug, Clone)]
enum Message {
    Action(Action),
    Pointer(PointerInput),
    WindowResized(iced::Size),
    ImageChosen(Option<PathBuf>),
    Decoded(PathBuf, Result<RasterImage, String>),
    SavePathChosen(Option<PathBuf>),
    SaveQualityChanged(u8),
    SaveConfirmed,
    SaveCancelled,
    ResizeWidthChanged(String),
    ResizeHeightChanged(String),
    ResizeAspectToggled,
    ResizeApply,
    ResizeConfirmed(Option<(u32, u32)>),
    ResizeCancelled,
    TrashConfirmed(PathBuf, bool),
    PickThumbnailFolder,
    ThumbnailFolderChosen(Option<PathBuf>),
    ToggleRecursive,
    OpenThumbnail(usize),
    SelectThumbnail(usize),
    RevealSelected,
    TrashSelected,
    BackToViewer,
    Tick,
}

fn subscription(state: &Qiv) -> Subscription<Message> {
    let events = iced::event::listen_with(|event, status, _window| match event {
        iced::Event::Keyboard(keyboard::Event::KeyPressed { key, modifiers, .. }) => {
            if status == iced::event::Status::Captured {
                return None;
            }
            shortcut(&key, modifiers).map(Message::Action)
        }
        iced::Event::Window(iced::window::Event::Resized(size)) => {
            Some(Message::WindowResized(size))
        }
        _ => None,
    });

    if state.grid.scan.is_some() {
        Subscription::batch([
            events,
            iced::time::every(Duration::from_millis(16)).map(|_| Message::Tick),
        ])
    } else {
        events
    }
}

fn shortcut(key: &Key, modifiers: Modifiers) -> Option<Action> {
    let command = modifiers.command();
    let shift = modifiers.shift();
    match key {
        Key::Named(Named::Escape) => Some(Action::Escape),
        Key::Named(Named::Enter) => Some(Action::Enter),
        Key::Named(Named::Delete) => Some(Action::Delete),
        Key::Named(Named::F1) => Some(Action::Help),
        Key::Named(Named::ArrowRight) => Some(Action::Next),
        Key::Named(Named::ArrowLeft) => Some(Action::Previous),
        Key::Named(Named::ArrowUp) => Some(Action::Up),
        Key::Named(Named::ArrowDown) => Some(Action::Down),
        Key::Character(c) => {
            let c = c.to_lowercase();
            let action = match (command, c.as_str()) {
                (true, "o") => Action::Open,
                (true, "s") => Action::Save,
                (true, "r") => Action::Reload,
                (true, "n") => Action::NewWindow,
                (true, "c") => Action::Copy,
                (true, "v") => Action::Paste,
                (true, "x") => Action::Crop,
                (true, "t") => Action::Resize,
                (true, "z") if shift => Action::Redo,
                (true, "z") => Action::Undo,
                (true, "y") => Action::Redo,
                (true, _) => return None,
                (false, "r") => Action::RotateClockwise,
                (false, "l") => Action::RotateCounterclockwise,
                (false, "]") => Action::RotateFineClockwise,
                (false, "[") => Action::RotateFineCounterclockwise,
                (false, "h") => Action::FlipHorizontal,
                (false, "v") => Action::FlipVertical,
                (false, "e") if shift => Action::ExposureDown,
                (false, "e") => Action::ExposureUp,
                (false, "c") => Action::Crop,
                (false, "b") => Action::WhiteBalance,
                (false, "m") => Action::Loupe,
                (false, "n") if shift => Action::Previous,
                (false, "n") => Action::Next,
                (false, "+") => Action::ZoomIn,
                (false, "-") => Action::ZoomOut,
                (false, "=") => Action::OriginalSize,
                (false, "w") => Action::FitWindow,
                (false, "i") => Action::Info,
                (false, "t") => Action::Thumbnails,
                (false, "q") => Action::Quit,
                _ => return None,
            };
            Some(action)
        }
        _ => None,
    }
}

fn update(state: &mut Qiv, message: Message) -> Task<Message> {
    let task = match message {
        Message::Action(action) => match state.screen {
            Screen::Viewer => viewer_action(state, action),
            Screen::Thumbnails => grid_action(state, action),
        },
        Message::Pointer(input) => {
            pointer(state, input);
            Task::none()
        }
        Message::WindowResized(size) => {
            state.window = size;
            sync_view_size(state);
            Task::none()
        }
        Message::ImageChosen(Some(path)) => load_image(state, path),
        Message::ImageChosen(None) => Task::none(),
        Message::Decoded(path, Ok(image)) => {
            opened(state, path, image);
            Task::none()
        }
        Message::Decoded(path, Err(e)) => {
            log::warn!("Failed to open {}: {}", path.display(), e);
            state.status = format!("Cannot open {}: {}", path.display(), e);
            Task::none()
        }
        Message::SavePathChosen(Some(path)) => {
            choose_save_format(state, path);
            Task::none()
        }
        Message::SavePathChosen(None) => Task::none(),
        Message::SaveQualityChanged(q) => {
            if let Some(pending) = state.pending_save.as_mut() {
                pending.quality = q;
            }
            Task::none()
        }
        Message::SaveConfirmed => {
            if let Some(pending) = state.pending_save.take() {
                save_now(state, &pending.path, pending.format, pending.quality);
            }
            Task::none()
        }
        Message::SaveCancelled => {
            state.pending_save = None;
            Task::none()
        }
        Message::ResizeWidthChanged(value) => {
            if let Some(panel) = state.resize_panel.as_mut() {
                if panel.keep_aspect {
                    if let Ok(w) = value.trim().parse::<u32>() {
                        let (ow, oh) = panel.original;
                        let (_, h) = model::aspect_dimensions(ow, oh, Dimension::Width(w));
                        panel.height = h.to_string();
                    }
                }
                panel.width = value;
            }
            Task::none()
        }
        Message::ResizeHeightChanged(value) => {
            if let Some(panel) = state.resize_panel.as_mut() {
                if panel.keep_aspect {
                    if let Ok(h) = value.trim().parse::<u32>() {
                        let (ow, oh) = panel.original;
                        let (w, _) = model::aspect_dimensions(ow, oh, Dimension::Height(h));
                        panel.width = w.to_string();
                    }
                }
                panel.height = value;
            }
            Task::none()
        }
        Message::ResizeAspectToggled => {
            if let Some(panel) = state.resize_panel.as_mut() {
                panel.keep_aspect = !panel.keep_aspect;
            }
            Task::none()
        }
        Message::ResizeApply => {
            let parsed = state.resize_panel.as_ref().and_then(|p| {
                let w = p.width.trim().parse::<u32>().ok().filter(|w| *w > 0)?;
                let h = p.height.trim().parse::<u32>().ok().filter(|h| *h > 0)?;
                Some((w, h))
            });
            match parsed {
                Some((w, h)) => Task::perform(
                    confirm(
                        "Resize image".into(),
                        format!("Resize the image to {}\u{d7}{}?", w, h),
                    ),
                    move |yes| Message::ResizeConfirmed(yes.then_some((w, h))),
                ),
                None => {
                    state.status = "Width and height must be positive whole numbers".into();
                    Task::none()
                }
            }
        }
        Message::ResizeConfirmed(Some((w, h))) => {
            state.resize_panel = None;
            edit(state, |m| m.resize(w, h));
            state.status = format!("Resized to {}\u{d7}{}", w, h);
            Task::none()
        }
        Message::ResizeConfirmed(None) => Task::none(),
        Message::ResizeCancelled => {
            state.resize_panel = None;
            Task::none()
        }
        Message::TrashConfirmed(path, true) => match state.trash.move_to_trash(&path) {
            Ok(()) => after_trash(state, &path),
            Err(e) => {
                log::warn!("{}", e);
                state.status = format!("Cannot move to trash: {}", e);
                Task::none()
            }
        },
        Message::TrashConfirmed(_, false) => Task::none(),
        Message::PickThumbnailFolder => {
            Task::perform(pick_folder(), Message::ThumbnailFolderChosen)
        }
        Message::ThumbnailFolderChosen(Some(dir)) => {
            start_scan(state, dir);
            Task::none()
        }
        Message::ThumbnailFolderChosen(None) => Task::none(),
        Message::ToggleRecursive => {
            state.grid.recursive = !state.grid.recursive;
            if let Some(dir) = state.grid.directory.clone() {
                start_scan(state, dir);
            }
            Task::none()
        }
        Message::OpenThumbnail(index) => open_thumbnail(state, index),
        Message::SelectThumbnail(index) => {
            state.grid.selected = Some(index);
            Task::none()
        }
        Message::RevealSelected => {
            if let Some(path) = selected_thumb_path(state) {
                return Task::perform(async move { platform::reveal(&path) }, |_| {
                    Message::Tick
                });
            }
            Task::none()
        }
        Message::TrashSelected => match selected_thumb_path(state) {
            Some(path) => confirm_trash(path),
            None => Task::none(),
        },
        Message::BackToViewer => {
            state.screen = Screen::Viewer;
            Task::none()
        }
        Message::Tick => {
            drain_scan(state);
            return Task::none();
        }
    };

    refresh_frame(state);
    task
}

fn viewer_action(state: &mut Qiv, action: Action) -> Task<Message> {
    match action {
        Action::Open => return Task::perform(pick_image(), Message::ImageChosen),
        Action::Save => {
            if !state.model.is_loaded() {
                state.status = "No image to save".into();
                return Task::none();
            }
            let name = state
                .model
                .path()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "untitled.png".into());
            let folder = state.model.path().and_then(|p| p.parent()).map(Path::to_path_buf);
            return Task::perform(pick_save_path(name, folder), Message::SavePathChosen);
        }
        Action::Reload => match state.model.reload(&*state.codec) {
            Ok(()) => {
                image_replaced(state);
                if let Some(path) = state.model.path() {
                    state.status = format!("Reloaded: {}", display(path));
                }
            }
            Err(crate::error::Error::NoImage) => state.status = "No file to reload".into(),
            Err(e) => state.status = format!("Reload failed: {}", e),
        },
        Action::NewWindow => {
            let spawned = std::env::current_exe()
                .and_then(|exe| std::process::Command::new(exe).spawn());
            if let Err(e) = spawned {
                log::warn!("Cannot start a new window: {}", e);
                state.status = format!("Cannot open a new window: {}", e);
            }
        }
        Action::Copy => copy_to_clipboard(state, false),
        Action::Paste => match state.model.load_from_clipboard(&mut state.clipboard) {
            Ok(true) => {
                state.navigator.clear_current();
                image_replaced(state);
                state.status = "Pasted image from clipboard".into();
            }
            Ok(false) => state.status = "No image in clipboard".into(),
            Err(e) => state.status = e.to_string(),
        },
        Action::Crop => {
            if state.viewport.mode() == ToolMode::Crop {
                viewport_input(state, InputEvent::Key(crate::viewport::Key::Enter));
            } else {
                set_mode(state, ToolMode::Crop);
            }
        }
        Action::Resize => {
            if let Some((w, h)) = state.model.dimensions() {
                state.resize_panel = Some(ResizePanel {
                    original: (w, h),
                    width: w.to_string(),
                    height: h.to_string(),
                    keep_aspect: true,
                });
            }
        }
        Action::Undo => {
            if state.model.undo() {
                pixels_changed(state);
                state.status = "Undone".into();
            }
        }
        Action::Redo => {
            if state.model.redo() {
                pixels_changed(state);
                state.status = "Redone".into();
            }
        }
        Action::RotateClockwise => edit(state, ImageModel::rotate_90_clockwise),
        Action::RotateCounterclockwise => edit(state, ImageModel::rotate_90_counterclockwise),
        Action::RotateFineClockwise => {
            let step = state.settings.rotate_step_degrees;
            edit(state, |m| m.rotate_arbitrary(step));
        }
        Action::RotateFineCounterclockwise => {
            let step = state.settings.rotate_step_degrees;
            edit(state, |m| m.rotate_arbitrary(-step));
        }
        Action::FlipHorizontal => edit(state, ImageModel::flip_horizontal),
        Action::FlipVertical => edit(state, ImageModel::flip_vertical),
        Action::ExposureUp => {
            let step = state.settings.exposure_step_ev;
            edit(state, |m| m.adjust_exposure(step));
        }
        Action::ExposureDown => {
            let step = state.settings.exposure_step_ev;
            edit(state, |m| m.adjust_exposure(-step));
        }
        Action::WhiteBalance => toggle_mode(state, ToolMode::WhiteBalance),
        Action::Loupe => toggle_mode(state, ToolMode::Loupe),
        Action::Next => return navigate(state, Direction::Next),
        Action::Previous => return navigate(state, Direction::Previous),
        Action::ZoomIn => with_viewport(state, |vp, fx| vp.zoom_in(fx)),
        Action::ZoomOut => with_viewport(state, |vp, fx| vp.zoom_out(fx)),
        Action::OriginalSize => with_viewport(state, |vp, fx| vp.reset_zoom(fx)),
        Action::FitWindow => with_viewport(state, |vp, fx| vp.fit_to_window(fx)),
        Action::Delete => {
            return match state.model.path().filter(|p| p.is_file()) {
                Some(path) => confirm_trash(path.to_path_buf()),
                None => Task::none(),
            };
        }
        Action::Info => {
            state.show_info = !state.show_info;
            refresh_info(state);
            sync_view_size(state);
        }
        Action::Thumbnails => {
            state.screen = Screen::Thumbnails;
            let dir = state
                .navigator
                .directory()
                .map(Path::to_path_buf)
                .or_else(|| state.model.path().and_then(|p| p.parent()).map(Path::to_path_buf));
            if let Some(dir) = dir {
                if state.grid.directory.as_deref() != Some(dir.as_path()) {
                    start_scan(state, dir);
                }
            }
        }
        Action::Help => state.show_help = !state.show_help,
        Action::Quit => return iced::exit(),
        Action::Escape => {
            if state.show_help {
                state.show_help = false;
            } else if state.resize_panel.is_some() {
                state.resize_panel = None;
            } else if state.pending_save.is_some() {
                state.pending_save = None;
            } else {
                viewport_input(state, InputEvent::Key(crate::viewport::Key::Escape));
            }
        }
        Action::Enter => viewport_input(state, InputEvent::Key(crate::viewport::Key::Enter)),
        Action::Up | Action::Down => {}
    }
    Task::none()
}

fn grid_action(state: &mut Qiv, action: Action) -> Task<Message> {
    let cols = grid_columns(state.window.width);
    match action {
        Action::Next => move_grid_selection(state, 1),
        Action::Previous => move_grid_selection(state, -1),
        Action::Down => move_grid_selection(state, cols as i32),
        Action::Up => move_grid_selection(state, -(cols as i32)),
        Action::Enter => {
            if let Some(index) = state.grid.selected {
                return open_thumbnail(state, index);
            }
        }
        Action::Delete => {
            if let Some(path) = selected_thumb_path(state) {
                return confirm_trash(path);
            }
        }
        Action::Escape | Action::Thumbnails => state.screen = Screen::Viewer,
        Action::Open => return Task::perform(pick_folder(), Message::ThumbnailFolderChosen),
        Action::Quit => return iced::exit(),
        _ => {}
    }
    Task::none()
}

fn move_grid_selection(state: &mut Qiv, delta: i32) {
    let count = state.grid.thumbs.len();
    if count == 0 {
        return;
    }
    let current = state.grid.selected.unwrap_or(0) as i32;
    let next = (current + delta).clamp(0, count as i32 - 1) as usize;
    state.grid.selected = Some(next);
}

fn pointer(state: &mut Qiv, input: PointerInput) {
    let pos = state.pointer;
    let event = match input {
        PointerInput::Moved(p) => {
            state.pointer = geometry::Point::new(p.x as f64, p.y as f64);
            InputEvent::Moved(state.pointer)
        }
        PointerInput::Pressed(button) => InputEvent::Pressed { button, pos },
        PointerInput::Released(button) => InputEvent::Released { button, pos },
        PointerInput::DoubleClicked => InputEvent::DoubleClicked(pos),
        PointerInput::Scrolled(delta) => InputEvent::Wheel {
            delta: delta as f64,
            pos,
        },
    };
    viewport_input(state, event);
}

fn viewport_input(state: &mut Qiv, event: InputEvent) {
    with_viewport(state, |vp, fx| {
        vp.handle(event, fx);
    });
}

fn set_mode(state: &mut Qiv, mode: ToolMode) {
    with_viewport(state, |vp, fx| vp.set_mode(mode, fx));
}

fn toggle_mode(state: &mut Qiv, mode: ToolMode) {
    let next = if state.viewport.mode() == mode {
        ToolMode::None
    } else {
        mode
    };
    set_mode(state, next);
}

fn with_viewport(state: &mut Qiv, f: impl FnOnce(&mut Viewport, &mut Effects)) {
    let mut effects = Effects::default();
    f(&mut state.viewport, &mut effects);
    apply_effects(state, effects);
}

fn apply_effects(state: &mut Qiv, effects: Effects) {
    for effect in effects.0 {
        match effect {
            ViewportEffect::Status(message) => state.status = message,
            ViewportEffect::ZoomChanged(percent) => state.zoom_percent = percent,
            ViewportEffect::CursorChanged(glyph) => state.cursor = glyph,
            ViewportEffect::CropCommitted(rect) => {
                if state.model.apply_crop(rect) {
                    pixels_changed(state);
                    copy_to_clipboard(state, true);
                }
            }
            ViewportEffect::WhiteBalancePicked { x, y } => {
                match state.model.apply_white_balance_from_point(x, y) {
                    Some((r, b)) => {
                        pixels_changed(state);
                        state.status = format!(
                            "White balance applied (red \u{d7}{:.2}, blue \u{d7}{:.2})",
                            r, b
                        );
                    }
                    None => state.status = "White balance: no usable colour at that point".into(),
                }
            }
        }
    }
}

/// Edit the current image in place, if there is one.
fn edit(state: &mut Qiv, f: impl FnOnce(&mut ImageModel)) {
    if !state.model.is_loaded() {
        return;
    }
    f(&mut state.model);
    pixels_changed(state);
}

fn pixels_changed(state: &mut Qiv) {
    state.generation += 1;
    if let Some(size) = state.model.dimensions() {
        with_viewport(state, |vp, fx| vp.update_image(size, fx));
    }
}

/// A different image (or none) is now current.
fn image_replaced(state: &mut Qiv) {
    state.generation += 1;
    state.cached_info = None;
    let size = state.model.dimensions();
    with_viewport(state, |vp, fx| vp.load_image(size, fx));
    refresh_info(state);
}

fn load_image(state: &mut Qiv, path: PathBuf) -> Task<Message> {
    state.status = format!("Loading {}...", display(&path));
    let codec = Arc::clone(&state.codec);
    Task::perform(
        async move {
            let result = codec.decode(&path).map_err(|e| e.to_string());
            (path, result)
        },
        |(path, result)| Message::Decoded(path, result),
    )
}

fn opened(state: &mut Qiv, path: PathBuf, image: RasterImage) {
    log::info!("Opened {} ({}x{})", path.display(), image.width(), image.height());
    state.model.set_image(image, Some(path.clone()));
    state.navigator.set_current_path(&path);
    state.screen = Screen::Viewer;
    image_replaced(state);
    state.status = format!("Opened: {}", display(&path));
}

fn navigate(state: &mut Qiv, direction: Direction) -> Task<Message> {
    match state.navigator.navigate(direction) {
        Some(path) => load_image(state, path),
        None => {
            state.status = match direction {
                Direction::Next => "No next image".into(),
                Direction::Previous => "No previous image".into(),
            };
            Task::none()
        }
    }
}

fn copy_to_clipboard(state: &mut Qiv, cropped: bool) {
    let selection = state.viewport.clamped_selection();
    let Some(region) = state.model.region(selection) else {
        state.status = "No image to copy".into();
        return;
    };
    let result = state.clipboard.set_image(&region);
    if let Err(e) = &result {
        log::warn!("Clipboard copy failed: {}", e);
    }
    state.status = copy_status(&result, selection.is_some(), cropped);
}

fn copy_status(result: &crate::error::Result<()>, selection: bool, cropped: bool) -> String {
    match result {
        Ok(()) if cropped => "Cropped image copied to clipboard".into(),
        Ok(()) if selection => "Selected area copied to clipboard".into(),
        Ok(()) => "Image copied to clipboard".into(),
        Err(e) if cropped => format!("Cropped, not copied: {}", e),
        Err(e) => e.to_string(),
    }
}

fn choose_save_format(state: &mut Qiv, path: PathBuf) {
    let path = codec::ensure_extension(path, None);
    let Some(format) = SaveFormat::from_extension(&path) else {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        state.status = crate::error::Error::UnsupportedFormat(ext).to_string();
        return;
    };
    match format.default_quality() {
        Some(quality) => {
            state.pending_save = Some(PendingSave {
                path,
                format,
                quality,
            })
        }
        None => save_now(state, &path, format, 0),
    }
}

fn save_now(state: &mut Qiv, path: &Path, format: SaveFormat, quality: u8) {
    match state.model.save(path, format, quality, &*state.codec) {
        Ok(()) => {
            state.status = format!("Saved: {}", display(path));
            if state.navigator.directory() == path.parent() {
                state.navigator.refresh();
            }
        }
        Err(e) => {
            log::warn!("Save failed: {}", e);
            state.status = format!("Save failed: {}", e);
        }
    }
}

fn confirm_trash(path: PathBuf) -> Task<Message> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    Task::perform(
        confirm("Move to trash".into(), format!("Move {} to the trash?", name)),
        move |yes| Message::TrashConfirmed(path.clone(), yes),
    )
}

fn after_trash(state: &mut Qiv, path: &Path) -> Task<Message> {
    if let Some(pos) = state.grid.thumbs.iter().position(|(p, _)| p == path) {
        state.grid.thumbs.remove(pos);
        state.grid.selected = state
            .grid
            .selected
            .filter(|_| !state.grid.thumbs.is_empty())
            .map(|i| i.min(state.grid.thumbs.len() - 1));
    }
    state.status = format!("Moved to trash: {}", display(path));

    if state.model.path() != Some(path) {
        if state.navigator.directory() == path.parent() {
            state.navigator.refresh();
        }
        return Task::none();
    }

    let index = state.navigator.current_index().unwrap_or(0);
    state.navigator.refresh();
    let total = state.navigator.total_count();
    if total == 0 {
        state.model.clear();
        image_replaced(state);
        return Task::none();
    }
    let next = state.navigator.paths()[index.min(total - 1)].clone();
    load_image(state, next)
}

fn start_scan(state: &mut Qiv, directory: PathBuf) {
    if let Some(scan) = state.grid.scan.take() {
        scan.cancel();
    }
    state.grid.thumbs.clear();
    state.grid.selected = None;
    state.grid.directory = Some(directory.clone());
    state.grid.status = "Scanning...".into();
    let request = ScanRequest {
        directory,
        recursive: state.grid.recursive,
        max_depth: state.settings.recursive_depth,
        batch_size: state.settings.scan_batch_size,
    };
    state.grid.scan = Some(ThumbnailScan::start(request, Arc::clone(&state.cache)));
}

fn drain_scan(state: &mut Qiv) {
    let Some(scan) = state.grid.scan.as_ref() else {
        return;
    };
    // Checked before draining so a worker that just exited has flushed everything.
    let exited = !scan.is_running();
    let mut done = exited;
    for event in scan.drain() {
        match event {
            ScanEvent::Progress(message) => state.grid.status = message,
            ScanEvent::ThumbnailReady { path, image } => {
                let rgba = image.to_rgba8();
                let (w, h) = rgba.dimensions();
                let handle = image::Handle::from_rgba(w, h, rgba.into_raw());
                state.grid.thumbs.push((path, handle));
            }
            ScanEvent::Finished => {
                state.grid.status = format!("{} images", state.grid.thumbs.len());
                done = true;
            }
            ScanEvent::Error(message) => {
                state.grid.status = format!("Thumbnail scan failed: {}", message);
                done = true;
            }
        }
    }
    if done {
        state.grid.scan = None;
    }
}

fn open_thumbnail(state: &mut Qiv, index: usize) -> Task<Message> {
    let Some((path, _)) = state.grid.thumbs.get(index) else {
        return Task::none();
    };
    let path = path.clone();
    state.grid.selected = Some(index);
    if let Some(scan) = state.grid.scan.take() {
        scan.cancel();
        state.grid.status = format!("{} images (scan stopped)", state.grid.thumbs.len());
    }
    load_image(state, path)
}

fn selected_thumb_path(state: &Qiv) -> Option<PathBuf> {
    let index = state.grid.selected?;
    state.grid.thumbs.get(index).map(|(p, _)| p.clone())
}

fn sync_view_size(state: &mut Qiv) {
    let info = if state.show_info { INFO_WIDTH } else { 0.0 };
    let width = (state.window.width - info).max(1.0);
    let height = (state.window.height - TOOLBAR_HEIGHT - STATUS_HEIGHT).max(1.0);
    let size = geometry::Size::new(width.floor() as f64, height.floor() as f64);
    with_viewport(state, |vp, fx| vp.resize(size, fx));
}

fn refresh_info(state: &mut Qiv) {
    if !state.show_info {
        return;
    }
    let Some(path) = state.model.path() else {
        state.cached_info = None;
        return;
    };
    if state.cached_info.as_ref().is_some_and(|(p, _, _)| p == path) {
        return;
    }
    let info = metadata::read_file_info(path);
    let exif = metadata::read_exif_entries(path);
    state.cached_info = Some((path.to_path_buf(), info, exif));
}

fn refresh_frame(state: &mut Qiv) {
    let Some(image) = state.model.current() else {
        state.frame = None;
        return;
    };
    let selection = state.viewport.selection();
    let input = FrameInput {
        image,
        generation: state.generation,
        transform: state.viewport.transform(),
        view_size: state.viewport.view_size(),
        selection: selection.active.then_some(selection.rect),
        overlay: state.viewport.overlay(),
    };
    let frame = state.renderer.render(&input);
    let (w, h) = frame.dimensions();
    state.frame = Some(image::Handle::from_rgba(w, h, frame.into_raw()));
}

fn display(path: &Path) -> String {
    navigator::format_path_for_display(path, DISPLAY_PATH_MAX)
}

fn title(state: &Qiv) -> String {
    match state.model.path() {
        Some(path) => format!("qiv - {}", display(path)),
        None if state.model.is_loaded() => "qiv - clipboard image".into(),
        None => "qiv".into(),
    }
}

fn theme(_state: &Qiv) -> Theme {
    Theme::Dark
}

fn view(state: &Qiv) -> Element<'_, Message> {
    match state.screen {
        Screen::Viewer => viewer_view(state),
        Screen::Thumbnails => thumbnails_view(state),
    }
}

fn tool_button(label: &str, action: Action) -> Element<'_, Message> {
    button(text(label.to_string()).size(13))
        .on_press(Message::Action(action))
        .padding([6, 10])
        .into()
}

fn mode_button(
    label: &str,
    mode: ToolMode,
    current: ToolMode,
    action: Action,
) -> Element<'_, Message> {
    let btn = button(text(label.to_string()).size(13))
        .on_press(Message::Action(action))
        .padding([6, 10]);
    if mode == current {
        btn.style(button::success).into()
    } else {
        btn.into()
    }
}

fn history_button(label: &str, enabled: bool, action: Action) -> Element<'_, Message> {
    button(text(label.to_string()).size(13))
        .on_press_maybe(enabled.then_some(Message::Action(action)))
        .padding([6, 10])
        .into()
}

fn viewer_view(state: &Qiv) -> Element<'_, Message> {
    let mode = state.viewport.mode();
    let toolbar = container(
        row![
            tool_button("Open", Action::Open),
            tool_button("Save", Action::Save),
            tool_button("Thumbnails", Action::Thumbnails),
            rule::vertical(1),
            tool_button("\u{2039}", Action::Previous),
            tool_button("\u{203A}", Action::Next),
            rule::vertical(1),
            tool_button("\u{21BA}", Action::RotateCounterclockwise),
            tool_button("\u{21BB}", Action::RotateClockwise),
            tool_button("Flip H", Action::FlipHorizontal),
            tool_button("Flip V", Action::FlipVertical),
            mode_button("Crop", ToolMode::Crop, mode, Action::Crop),
            mode_button("WB", ToolMode::WhiteBalance, mode, Action::WhiteBalance),
            mode_button("Loupe", ToolMode::Loupe, mode, Action::Loupe),
            history_button("Undo", state.model.can_undo(), Action::Undo),
            history_button("Redo", state.model.can_redo(), Action::Redo),
            rule::vertical(1),
            tool_button("Fit", Action::FitWindow),
            tool_button("1:1", Action::OriginalSize),
            Space::new().width(Length::Fill),
            tool_button("Info", Action::Info),
            tool_button("?", Action::Help),
        ]
        .spacing(6)
        .align_y(iced::Alignment::Center),
    )
    .padding([0, 8])
    .center_y(TOOLBAR_HEIGHT)
    .width(Length::Fill);

    let view_size = state.viewport.view_size();
    let (vw, vh) = (view_size.width as f32, view_size.height as f32);
    let picture: Element<'_, Message> = match &state.frame {
        Some(handle) => image(handle.clone())
            .width(Length::Fixed(vw))
            .height(Length::Fixed(vh))
            .content_fit(ContentFit::None)
            .filter_method(image::FilterMethod::Nearest)
            .into(),
        None => container(
            text("Open an image (Ctrl+O), paste one (Ctrl+V) or browse thumbnails (T)")
                .size(14)
                .color(LABEL_COLOR),
        )
        .center(Length::Fill)
        .into(),
    };

    let area = mouse_area(container(picture).width(Length::Fixed(vw)).height(Length::Fixed(vh)))
        .on_move(|p| Message::Pointer(PointerInput::Moved(p)))
        .on_press(Message::Pointer(PointerInput::Pressed(MouseButton::Left)))
        .on_release(Message::Pointer(PointerInput::Released(MouseButton::Left)))
        .on_middle_press(Message::Pointer(PointerInput::Pressed(MouseButton::Middle)))
        .on_middle_release(Message::Pointer(PointerInput::Released(MouseButton::Middle)))
        .on_right_press(Message::Pointer(PointerInput::Pressed(MouseButton::Right)))
        .on_right_release(Message::Pointer(PointerInput::Released(MouseButton::Right)))
        .on_double_click(Message::Pointer(PointerInput::DoubleClicked))
        .on_scroll(|delta| Message::Pointer(PointerInput::Scrolled(scroll_notches(delta))))
        .interaction(interaction(state.cursor));

    let mut layers: Vec<Element<'_, Message>> = vec![area.into()];
    if let Some(panel) = &state.resize_panel {
        layers.push(container(resize_dialog(panel)).center(Length::Fill).into());
    }
    if let Some(pending) = &state.pending_save {
        layers.push(container(save_dialog(pending)).center(Length::Fill).into());
    }
    if state.show_help {
        layers.push(container(help_panel()).center(Length::Fill).into());
    }
    let stage = iced::widget::Stack::with_children(layers)
        .width(Length::Fill)
        .height(Length::Fill);

    let body: Element<'_, Message> = match (&state.cached_info, state.show_info) {
        (Some((_, info, exif)), true) => {
            row![info_panel(state, info, exif.as_deref()), stage].into()
        }
        (None, true) => row![empty_info_panel(), stage].into(),
        _ => stage.into(),
    };

    column![toolbar, rule::horizontal(1), body, status_bar(state)].into()
}

fn status_bar(state: &Qiv) -> Element<'_, Message> {
    let mut right: Vec<String> = Vec::new();
    if let Some(label) = state.navigator.position_label() {
        right.push(label);
    }
    if let Some((w, h)) = state.model.dimensions() {
        right.push(format!("{}\u{d7}{}", w, h));
        if state.model.rotation_angle() != 0.0 {
            right.push(format!("{:.0}\u{b0}", state.model.rotation_angle()));
        }
        if state.model.exposure_ev() != 0.0 {
            right.push(format!("{:+.2} EV", state.model.exposure_ev()));
        }
        right.push(format!("{}%", state.zoom_percent));
    }

    container(
        row![
            text(state.status.as_str()).size(12),
            Space::new().width(Length::Fill),
            text(right.join("   ")).size(12).color(LABEL_COLOR),
        ]
        .align_y(iced::Alignment::Center),
    )
    .padding([0, 10])
    .center_y(STATUS_HEIGHT)
    .width(Length::Fill)
    .style(container::dark)
    .into()
}

fn scroll_notches(delta: ScrollDelta) -> f32 {
    match delta {
        ScrollDelta::Lines { y, .. } => y,
        ScrollDelta::Pixels { y, .. } => y / PIXELS_PER_NOTCH,
    }
}

fn interaction(glyph: CursorGlyph) -> mouse::Interaction {
    match glyph {
        CursorGlyph::Arrow => mouse::Interaction::Idle,
        CursorGlyph::Crosshair => mouse::Interaction::Crosshair,
        CursorGlyph::Grabbing => mouse::Interaction::Grabbing,
    }
}

fn dialog<'a>(content: impl Into<Element<'a, Message>>) -> Element<'a, Message> {
    container(content)
        .padding(16)
        .width(320)
        .style(container::dark)
        .into()
}

fn resize_dialog(panel: &ResizePanel) -> Element<'_, Message> {
    let aspect = if panel.keep_aspect {
        "Keep aspect: on"
    } else {
        "Keep aspect: off"
    };
    dialog(
        column![
            text("Resize").size(15),
            text(format!("Current size {}\u{d7}{}", panel.original.0, panel.original.1))
                .size(12)
                .color(LABEL_COLOR),
            row![
                text("Width").size(12).color(LABEL_COLOR).width(60),
                text_input("width", &panel.width)
                    .on_input(Message::ResizeWidthChanged)
                    .on_submit(Message::ResizeApply)
                    .width(100),
            ]
            .spacing(8)
            .align_y(iced::Alignment::Center),
            row![
                text("Height").size(12).color(LABEL_COLOR).width(60),
                text_input("height", &panel.height)
                    .on_input(Message::ResizeHeightChanged)
                    .on_submit(Message::ResizeApply)
                    .width(100),
            ]
            .spacing(8)
            .align_y(iced::Alignment::Center),
            button(text(aspect).size(12))
                .on_press(Message::ResizeAspectToggled)
                .style(button::text),
            row![
                Space::new().width(Length::Fill),
                button("Cancel").on_press(Message::ResizeCancelled),
                button("Resize").on_press(Message::ResizeApply),
            ]
            .spacing(8),
        ]
        .spacing(10),
    )
}

fn save_dialog(pending: &PendingSave) -> Element<'_, Message> {
    let name = pending
        .path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    dialog(
        column![
            text(format!("Save {} as {}", name, pending.format)).size(15),
            row![
                text("Quality").size(12).color(LABEL_COLOR).width(60),
                slider(
                    codec::MIN_QUALITY..=codec::MAX_QUALITY,
                    pending.quality,
                    Message::SaveQualityChanged,
                ),
                text(pending.quality.to_string()).size(12).width(30),
            ]
            .spacing(8)
            .align_y(iced::Alignment::Center),
            row![
                Space::new().width(Length::Fill),
                button("Cancel").on_press(Message::SaveCancelled),
                button("Save").on_press(Message::SaveConfirmed),
            ]
            .spacing(8),
        ]
        .spacing(10),
    )
}

fn help_panel<'a>() -> Element<'a, Message> {
    let mut items: Vec<Element<'a, Message>> = vec![
        text("Keyboard shortcuts").size(15).into(),
        section_divider(),
    ];
    items.extend(
        SHORTCUTS
            .iter()
            .map(|(keys, what)| info_field(keys, what.to_string())),
    );
    dialog(scrollable(column(items).spacing(4)).height(Length::Shrink))
}

const LABEL_COLOR: Color = Color::from_rgb(0.5, 0.5, 0.55);

fn info_panel<'a>(
    state: &'a Qiv,
    info: &'a FileInfo,
    exif: Option<&'a [ExifEntry]>,
) -> Element<'a, Message> {
    let mut items: Vec<Element<'a, Message>> = Vec::new();

    items.push(text(&info.filename).size(15).into());
    items.push(
        text(metadata::format_file_size(info.file_size))
            .size(12)
            .color(LABEL_COLOR)
            .into(),
    );

    items.push(section_divider());
    if let Some((w, h)) = info.dimensions {
        items.push(info_field("On disk", format!("{} \u{d7} {}", w, h)));
    }
    if let Some(current) = state.model.current() {
        let (w, h) = current.dimensions();
        items.push(info_field("Current", format!("{} \u{d7} {}", w, h)));
        let channels = if current.has_alpha() { "RGBA" } else { "RGB" };
        items.push(info_field("Channels", channels.to_string()));
    }
    if let Some(ref date) = info.date_modified {
        items.push(info_field("Modified", date.clone()));
    }
    items.push(info_field(
        "Rotation",
        format!("{:.0}\u{b0}", state.model.rotation_angle()),
    ));
    items.push(info_field(
        "Exposure",
        format!("{:+.2} EV", state.model.exposure_ev()),
    ));

    items.push(section_divider());
    items.push(section_header("EXIF"));
    match exif {
        Some(entries) => {
            items.extend(entries.iter().map(|e| info_field(&e.tag, e.value.clone())));
        }
        None => items.push(
            text("No EXIF data or failed to read")
                .size(12)
                .color(LABEL_COLOR)
                .into(),
        ),
    }

    side_panel(column(items).spacing(6).padding(16))
}

fn empty_info_panel<'a>() -> Element<'a, Message> {
    side_panel(
        column![text("No file").size(12).color(LABEL_COLOR)]
            .padding(16),
    )
}

fn side_panel<'a>(content: iced::widget::Column<'a, Message>) -> Element<'a, Message> {
    row![
        container(scrollable(content).height(Length::Fill))
            .width(INFO_WIDTH - 1.0)
            .height(Length::Fill)
            .style(container::dark),
        rule::vertical(1),
    ]
    .into()
}

fn section_header(label: &str) -> Element<'_, Message> {
    text(label.to_string())
        .size(11)
        .color(LABEL_COLOR)
        .into()
}

fn section_divider<'a>() -> Element<'a, Message> {
    container(rule::horizontal(1))
        .padding([4, 0])
        .into()
}

fn info_field(label: &str, value: String) -> Element<'_, Message> {
    row![
        text(label.to_string()).size(12).color(LABEL_COLOR).width(110),
        text(value).size(12),
    ]
    .spacing(8)
    .into()
}

fn thumbnails_view(state: &Qiv) -> Element<'_, Message> {
    let recursive_label = if state.grid.recursive {
        "Subfolders: on"
    } else {
        "Subfolders: off"
    };
    let selected = state.grid.selected.is_some();
    let toolbar = row![
        button("Back").on_press(Message::BackToViewer),
        button("Folder").on_press(Message::PickThumbnailFolder),
        button(recursive_label).on_press(Message::ToggleRecursive),
        button("Reveal").on_press_maybe(selected.then_some(Message::RevealSelected)),
        button("Trash").on_press_maybe(selected.then_some(Message::TrashSelected)),
        text(state.grid.status.as_str()).size(13).color(LABEL_COLOR),
        Space::new().width(Length::Fill),
        text(match &state.grid.directory {
            Some(p) => display(p),
            None => "No folder selected".into(),
        })
        .size(14),
    ]
    .spacing(10)
    .padding(10)
    .align_y(iced::Alignment::Center);

    let content: Element<'_, Message> = if state.grid.thumbs.is_empty() {
        let hint = if state.grid.scan.is_some() {
            "Loading..."
        } else {
            "No images here. Pick a folder to browse."
        };
        container(text(hint)).center(Length::Fill).into()
    } else {
        scrollable(thumbnail_grid(state)).height(Length::Fill).into()
    };

    column![toolbar, content].into()
}

const THUMB_SIZE: f32 = 160.0;
const THUMB_CELL: f32 = THUMB_SIZE + 8.0 + 8.0; // image + button padding + spacing
const GRID_PADDING: f32 = 10.0;

fn grid_columns(width: f32) -> usize {
    let available = width - GRID_PADDING * 2.0;
    ((available + 8.0) / THUMB_CELL).max(1.0) as usize
}

fn thumbnail_grid(state: &Qiv) -> Element<'_, Message> {
    let thumbnails = &state.grid.thumbs;
    let selected = state.grid.selected;

    iced::widget::responsive(move |size| {
        let per_row = grid_columns(size.width);

        let rows: Vec<Element<Message>> = thumbnails
            .chunks(per_row)
            .enumerate()
            .map(|(row_idx, chunk)| {
                let items: Vec<Element<Message>> = chunk
                    .iter()
                    .enumerate()
                    .map(|(col_idx, (_path, handle))| {
                        let index = row_idx * per_row + col_idx;
                        let img = image(handle.clone())
                            .width(THUMB_SIZE)
                            .height(THUMB_SIZE)
                            .content_fit(ContentFit::Contain);

                        let btn = button(img)
                            .on_press(Message::OpenThumbnail(index))
                            .padding(4);
                        let btn: Element<'_, Message> = if selected == Some(index) {
                            container(btn.style(button::primary))
                                .style(selected_thumb_style)
                                .into()
                        } else {
                            btn.into()
                        };
                        mouse_area(btn)
                            .on_right_press(Message::SelectThumbnail(index))
                            .into()
                    })
                    .collect();
                row(items).spacing(8).into()
            })
            .collect();

        column(rows).spacing(8).padding(GRID_PADDING).into()
    })
    .into()
}

fn selected_thumb_style(theme: &Theme) -> container::Style {
    let palette = theme.palette();
    container::Style {
        border: iced::Border {
            color: palette.primary,
            width: 2.0,
            radius: 4.0.into(),
        },
        ..Default::default()
    }
}

async fn pick_image() -> Option<PathBuf> {
    rfd::AsyncFileDialog::new()
        .set_title("Open image")
        .add_filter("Images", OPEN_EXTENSIONS)
        .pick_file()
        .await
        .map(|handle| handle.path().to_path_buf())
}

async fn pick_save_path(file_name: String, folder: Option<PathBuf>) -> Option<PathBuf> {
    let mut dialog = rfd::AsyncFileDialog::new()
        .set_title("Save image as")
        .set_file_name(file_name);
    for format in SaveFormat::ALL {
        dialog = dialog.add_filter(format.to_string(), &[format.extension()]);
    }
    if let Some(folder) = folder {
        dialog = dialog.set_directory(folder);
    }
    dialog.save_file().await.map(|handle| handle.path().to_path_buf())
}

async fn pick_folder() -> Option<PathBuf> {
    rfd::AsyncFileDialog::new()
        .set_title("Select a folder to browse")
        .pick_folder()
        .await
        .map(|handle| handle.path().to_path_buf())
}

async fn confirm(title: String, description: String) -> bool {
    rfd::AsyncMessageDialog::new()
        .set_title(title)
        .set_description(description)
        .set_level(rfd::MessageLevel::Warning)
        .set_buttons(rfd::MessageButtons::YesNo)
        .show()
        .await
        == rfd::MessageDialogResult::Yes
}
