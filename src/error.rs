use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors, surfaced synchronously at build time.
///
/// These are the only hard failures compath produces. Once a
/// [`PathCompleter`](crate::PathCompleter) exists, every runtime failure
/// (missing backend, spawn failure, stream error) collapses into an empty
/// delivery plus an optional [`Advisory`](crate::Advisory), so a broken
/// search can never crash or block the host.
#[derive(Error, Debug)]
pub enum CompathError {
    #[error("max results must be at least 1")]
    InvalidMaxResults(usize),

    #[error("search root is not a directory")]
    InvalidSearchRoot(PathBuf),
}

impl CompathError {
    /// The path this error occurred at, if applicable.
    /// Callers use this to present "Invalid: <path>" without pattern matching on variants.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::InvalidSearchRoot(p) => Some(p),
            _ => None,
        }
    }
}
