use std::path::PathBuf;

use thiserror::Error;

/// Everything that can abort a merge run.
///
/// `Parse` and `Malformed` together form the parse-error class: the input is
/// not well-formed XML and the run stops where it is. Files with another
/// root tag, hosts without a `name` and a missing policy block are not errors.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: quick_xml::Error,
    },

    #[error("malformed document {}: {message}", path.display())]
    Malformed { path: PathBuf, message: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot {action} while output is {from}")]
    InvalidTransition { from: &'static str, action: &'static str },

    /// Raised while serializing a subtree into memory, before any path is involved
    #[error(transparent)]
    Write(#[from] std::io::Error),
}

impl MergeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MergeError::Io { path: path.into(), source }
    }

    pub fn malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        MergeError::Malformed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// True for errors caused by the input bytes rather than the environment.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, MergeError::Parse { .. } | MergeError::Malformed { .. })
    }
}

pub type Result<T> = std::result::Result<T, MergeError>;
