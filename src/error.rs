use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MnistError {
    #[error("can't find data directory {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("bad magic number in input stream: {0}")]
    BadMagic(u32),

    #[error("input stream ended inside the header")]
    TruncatedHeader,

    #[error("payload holds {actual} bytes but the header declares {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("header dimensions {count} x {rows} x {cols} overflow the address space")]
    DimensionOverflow { count: u32, rows: u32, cols: u32 },

    #[error("{data} images but {labels} labels")]
    RowCountMismatch { data: usize, labels: usize },

    #[error("label {value} of record {index} is not a digit class")]
    LabelOutOfRange { index: usize, value: u8 },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed cache file {}: {reason}", .path.display())]
    BadCache { path: PathBuf, reason: String },

    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

pub type Result<T> = std::result::Result<T, MnistError>;

impl MnistError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }

    /// True for an I/O failure caused by a file that does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}
