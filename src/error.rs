//! Per-root failures recorded by the resolver.

use crate::document::XmlError;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A failure while processing one candidate root.
///
/// These never abort a batch; the resolver records them in the report and moves on.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The resource document exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The resource document is not well-formed XML.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: XmlError,
    },

    /// The rewritten document could not be written back.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ResolveError {
    /// Path of the document the failure refers to
    pub fn path(&self) -> &Path {
        match self {
            ResolveError::Read { path, .. }
            | ResolveError::Parse { path, .. }
            | ResolveError::Write { path, .. } => path,
        }
    }
}
