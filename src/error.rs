use std::path::PathBuf;

use thiserror::Error;

use crate::codec::SaveFormat;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("cannot encode {format}: {source}")]
    Encode {
        format: SaveFormat,
        #[source]
        source: image::ImageError,
    },

    #[error("clipboard: {0}")]
    Clipboard(String),

    #[error("trash: {0}")]
    Trash(String),

    #[error("no image loaded")]
    NoImage,

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
