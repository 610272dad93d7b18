use std::fmt;

use thiserror::Error;

/// Coarse failure category, stable enough for callers to branch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input type or size rejected before conversion starts.
    Validation,
    /// Content could not be rasterised.
    Render,
    /// Degenerate geometry, e.g. zero content height.
    Layout,
    /// Archive assembly failed.
    Packaging,
    /// Anything else.
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Render => "render",
            ErrorKind::Layout => "layout",
            ErrorKind::Packaging => "packaging",
            ErrorKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),
    #[error("render error: {0}")]
    Render(String),
    #[error("layout error: {0}")]
    Layout(String),
    #[error("DOCX packaging failed: {0}")]
    Packaging(#[source] zip::result::ZipError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Unknown(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Render(_) => ErrorKind::Render,
            Error::Layout(_) => ErrorKind::Layout,
            Error::Packaging(_) => ErrorKind::Packaging,
            Error::Io(_) | Error::Unknown(_) => ErrorKind::Unknown,
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Packaging(e)
    }
}
