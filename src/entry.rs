use std::path::PathBuf;

/// A single completion candidate delivered to the caller.
///
/// `path` is the display/insert form: relative to the caller's base when
/// relative paths are enabled, absolute otherwise. Directory entries carry a
/// trailing path separator so consumers can distinguish them without a
/// second `stat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionEntry {
    /// Path in display/insert form.
    pub path: String,

    /// Whether the entry names a directory.
    pub is_dir: bool,
}

/// Per-request base-directory context, supplied by the caller.
///
/// Derived from the currently active editable document and any configured
/// search root. Passed by value per call and never stored; the completer
/// holds no hidden shared state between searches.
#[derive(Debug, Clone, Default)]
pub struct SearchContext {
    /// Path of the document the completion is being typed into, if any.
    /// Its parent directory is the preferred relativization base.
    pub reference_file: Option<PathBuf>,

    /// Per-call override of the enumeration root. When unset, the
    /// completer's configured root (or the process working directory)
    /// applies.
    pub search_root: Option<PathBuf>,
}

impl SearchContext {
    /// Context for a completion typed into `document`.
    pub fn for_file(document: impl Into<PathBuf>) -> Self {
        Self {
            reference_file: Some(document.into()),
            search_root: None,
        }
    }
}
