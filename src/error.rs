use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::ast::Location;

pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Errors raised while parsing a header or writing bindings.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("{message} at {location}")]
    Parse { message: String, location: Location },

    #[error("input file doesn't exist: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("bad batch file {}: {}", path.display(), source)]
    Batch {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("bad pointer expansion pattern: {0}")]
    BadPattern(#[from] regex::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ProcessingError {
    /// Build a parse error pinned to `location`.
    pub fn parse(message: impl Into<String>, location: Location) -> Self {
        ProcessingError::Parse {
            message: message.into(),
            location,
        }
    }
}
