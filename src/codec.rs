use std::fmt;
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};

use crate::error::{Error, Result};
use crate::raster::RasterImage;

/// Lossy quality is always kept inside this range.
pub const MIN_QUALITY: u8 = 75;
pub const MAX_QUALITY: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    Jpeg,
    Png,
    WebP,
    Bmp,
}

impl fmt::Display for SaveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveFormat::Jpeg => write!(f, "JPEG"),
            SaveFormat::Png => write!(f, "PNG"),
            SaveFormat::WebP => write!(f, "WEBP"),
            SaveFormat::Bmp => write!(f, "BMP"),
        }
    }
}

impl SaveFormat {
    pub const ALL: [SaveFormat; 4] = [
        SaveFormat::Jpeg,
        SaveFormat::Png,
        SaveFormat::WebP,
        SaveFormat::Bmp,
    ];

    pub fn from_extension(path: &Path) -> Option<SaveFormat> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(SaveFormat::Jpeg),
            "png" => Some(SaveFormat::Png),
            "webp" => Some(SaveFormat::WebP),
            "bmp" => Some(SaveFormat::Bmp),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Jpeg => "jpg",
            SaveFormat::Png => "png",
            SaveFormat::WebP => "webp",
            SaveFormat::Bmp => "bmp",
        }
    }

    pub fn is_lossy(&self) -> bool {
        matches!(self, SaveFormat::Jpeg | SaveFormat::WebP)
    }

    pub fn default_quality(&self) -> Option<u8> {
        match self {
            SaveFormat::Jpeg => Some(95),
            SaveFormat::WebP => Some(90),
            SaveFormat::Png | SaveFormat::Bmp => None,
        }
    }
}

pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_QUALITY, MAX_QUALITY)
}

/// Append the extension for `format` (PNG when unknown) if the file name has none.
pub fn ensure_extension(path: PathBuf, format: Option<SaveFormat>) -> PathBuf {
    if path.extension().is_some() {
        return path;
    }
    let format = format.unwrap_or(SaveFormat::Png);
    path.with_extension(format.extension())
}

/// Decoding and encoding of raster files.
pub trait Codec: Send + Sync {
    fn decode(&self, path: &Path) -> Result<RasterImage>;

    /// Decode at reduced size for a thumbnail no larger than `max_size`.
    fn decode_thumbnail(&self, path: &Path, max_size: u32) -> Result<RasterImage> {
        Ok(self.decode(path)?.thumbnail(max_size))
    }

    fn encode(&self, image: &RasterImage, format: SaveFormat, quality: u8) -> Result<Vec<u8>>;
}

/// [`Codec`] backed by the `image` crate, with EXIF orientation applied on decode.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCodec;

impl Codec for ImageCodec {
    fn decode(&self, path: &Path) -> Result<RasterImage> {
        let img = image::open(path).map_err(|source| Error::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(RasterImage::from(apply_orientation(img, read_orientation(path))))
    }

    fn decode_thumbnail(&self, path: &Path, max_size: u32) -> Result<RasterImage> {
        if let Some(img) = decode_jpeg_scaled(path, max_size) {
            let oriented = apply_orientation(img, read_orientation(path));
            return Ok(RasterImage::from(oriented).thumbnail(max_size));
        }
        Ok(self.decode(path)?.thumbnail(max_size))
    }

    fn encode(&self, image: &RasterImage, format: SaveFormat, quality: u8) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        let encode_err = |source| Error::Encode { format, source };
        match format {
            SaveFormat::Jpeg => {
                let rgb = image.as_dynamic().to_rgb8();
                JpegEncoder::new_with_quality(&mut bytes, clamp_quality(quality))
                    .encode_image(&rgb)
                    .map_err(encode_err)?;
            }
            // The bundled WebP encoder is lossless only, so quality has no effect.
            SaveFormat::WebP => image
                .as_dynamic()
                .write_to(&mut Cursor::new(&mut bytes), ImageFormat::WebP)
                .map_err(encode_err)?,
            SaveFormat::Png => image
                .as_dynamic()
                .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
                .map_err(encode_err)?,
            SaveFormat::Bmp => image
                .as_dynamic()
                .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Bmp)
                .map_err(encode_err)?,
        }
        Ok(bytes)
    }
}

/// Decode a JPEG at reduced resolution using DCT scaling.
/// Returns None for non-JPEG files, images already small enough, or on failure.
fn decode_jpeg_scaled(path: &Path, max_size: u32) -> Option<DynamicImage> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    if ext != "jpg" && ext != "jpeg" {
        return None;
    }

    let file = std::fs::File::open(path).ok()?;
    let mut decoder = jpeg_decoder::Decoder::new(BufReader::new(file));
    let target = max_size.min(u16::MAX as u32) as u16;
    let (actual_w, actual_h) = decoder.scale(target, target).ok()?;

    let info = decoder.info()?;
    if actual_w == info.width && actual_h == info.height {
        return None;
    }

    let pixels = decoder.decode().ok()?;
    match info.pixel_format {
        jpeg_decoder::PixelFormat::RGB24 => {
            image::RgbImage::from_raw(actual_w as u32, actual_h as u32, pixels)
                .map(DynamicImage::ImageRgb8)
        }
        jpeg_decoder::PixelFormat::L8 => {
            image::GrayImage::from_raw(actual_w as u32, actual_h as u32, pixels)
                .map(DynamicImage::ImageLuma8)
        }
        _ => None,
    }
}

/// EXIF orientation tag, 1 (normal) when absent or unreadable.
pub fn read_orientation(path: &Path) -> u32 {
    let Ok(file) = std::fs::File::open(path) else {
        return 1;
    };
    let mut reader = BufReader::new(file);
    let Ok(exif) = exif::Reader::new().read_from_container(&mut reader) else {
        return 1;
    };
    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}
