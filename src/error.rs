use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// The root is missing, not a directory, or cannot be listed.
    #[error("image root {} is missing or unreadable", .root.display())]
    NotFound {
        root: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A pick was attempted on a catalog without entries.
    #[error("no images in catalog")]
    Empty,

    #[error("index {index} is out of range for a catalog of {count} images")]
    IndexOutOfRange { index: usize, count: usize },
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot decode {}: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("cannot upload {} to the GPU: {reason}", .path.display())]
    Upload { path: PathBuf, reason: String },
}
