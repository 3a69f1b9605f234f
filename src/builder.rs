use std::path::PathBuf;
use std::sync::Arc;

use crate::backend::{Tool, ToolSet};
use crate::completer::{PathCompleter, SearchConfig};
use crate::error::CompathError;
use crate::notify::{Advisory, Notifier, NotifyFn};

// ---------------------------------------------------------------------------
// CompleterBuilder
// ---------------------------------------------------------------------------

/// Entry point for configuring a [`PathCompleter`].
///
/// Created via [`compath::completer()`](crate::completer()). Configure with
/// chained builder methods, then call [`build()`](CompleterBuilder::build)
/// to validate the snapshot and obtain the completer.
///
/// # Example
///
/// ```rust,ignore
/// let completer = compath::completer()
///     .max_results(10)
///     .include_dirs(true)
///     .search_root("/home/me/project")
///     .on_notify(|advisory| eprintln!("{advisory}"))
///     .build()?;
/// ```
pub struct CompleterBuilder {
    max_results:    usize,
    tool:           Tool,
    include_hidden: bool,
    respect_ignore: bool,
    include_dirs:   bool,
    relative_paths: bool,
    search_root:    Option<PathBuf>,
    fd_program:     String,
    rg_program:     String,
    on_notify:      Option<Arc<NotifyFn>>,
}

impl Default for CompleterBuilder {
    fn default() -> Self {
        Self {
            max_results:    20,
            tool:           Tool::Auto,
            include_hidden: false,
            respect_ignore: true,
            include_dirs:   false,
            relative_paths: true,
            search_root:    None,
            fd_program:     "fd".to_string(),
            rg_program:     "rg".to_string(),
            on_notify:      None,
        }
    }
}

impl CompleterBuilder {
    // ── Result shaping ────────────────────────────────────────────────────

    /// Deliver at most `n` entries per search. Must be at least 1.
    ///
    /// The cap is passed to pattern-native enumerators, enforced while
    /// streaming, and re-applied after merging, so it holds regardless of
    /// backend.
    pub fn max_results(mut self, n: usize) -> Self {
        self.max_results = n;
        self
    }

    /// Include directory entries alongside files.
    ///
    /// Directories are delivered before files and carry a trailing path
    /// separator.
    pub fn include_dirs(mut self, yes: bool) -> Self {
        self.include_dirs = yes;
        self
    }

    /// Deliver paths relative to the caller's base (the reference file's
    /// directory, else the search root). Disabled, paths come back absolute.
    pub fn relative_paths(mut self, yes: bool) -> Self {
        self.relative_paths = yes;
        self
    }

    // ── Enumeration ───────────────────────────────────────────────────────

    /// Pin the enumerator instead of probing.
    ///
    /// A pinned tool whose binary is missing falls back to the probe order,
    /// so a stale configuration degrades instead of breaking.
    pub fn tool(mut self, tool: Tool) -> Self {
        self.tool = tool;
        self
    }

    /// Include hidden entries (dotfiles) in the enumeration.
    pub fn include_hidden(mut self, yes: bool) -> Self {
        self.include_hidden = yes;
        self
    }

    /// Honor ignore files (`.gitignore` and friends). Enabled by default;
    /// disabling passes the enumerator its no-ignore flag.
    pub fn respect_ignore(mut self, yes: bool) -> Self {
        self.respect_ignore = yes;
        self
    }

    /// Default root directory for searches that do not carry one in their
    /// [`SearchContext`](crate::SearchContext). Validated at build time.
    pub fn search_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_root = Some(path.into());
        self
    }

    /// Program name or path for the `fd` enumerator.
    ///
    /// Useful for Debian-style `fdfind` installs, or for pointing tests at
    /// a stand-in executable.
    pub fn fd_program(mut self, program: impl Into<String>) -> Self {
        self.fd_program = program.into();
        self
    }

    /// Program name or path for the `rg` enumerator.
    pub fn rg_program(mut self, program: impl Into<String>) -> Self {
        self.rg_program = program.into();
        self
    }

    // ── Notifications ─────────────────────────────────────────────────────

    /// Receive advisory notifications (missing backend, rejected search
    /// root, ...) instead of the default `log::warn!`.
    ///
    /// Each distinct advisory is delivered at most once per completer.
    pub fn on_notify<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Advisory) + Send + Sync + 'static,
    {
        self.on_notify = Some(Arc::new(callback));
        self
    }

    // ── Build ─────────────────────────────────────────────────────────────

    /// Validate the configuration and build the completer.
    ///
    /// # Errors
    ///
    /// Returns `Err` for configuration errors only: a zero result cap, or a
    /// search root that does not name an existing directory. Availability
    /// of the enumerator binaries is deliberately not checked here; that is
    /// probed per search and degrades to an empty delivery plus an
    /// advisory.
    pub fn build(self) -> Result<PathCompleter, CompathError> {
        if self.max_results == 0 {
            return Err(CompathError::InvalidMaxResults(self.max_results));
        }

        let search_root = match self.search_root {
            Some(path) => match std::fs::canonicalize(&path) {
                Ok(absolute) if absolute.is_dir() => Some(absolute),
                _ => return Err(CompathError::InvalidSearchRoot(path)),
            },
            None => None,
        };

        let config = SearchConfig {
            max_results:    self.max_results,
            tool:           self.tool,
            include_hidden: self.include_hidden,
            respect_ignore: self.respect_ignore,
            include_dirs:   self.include_dirs,
            relative_paths: self.relative_paths,
        };
        let tools = ToolSet::new(self.fd_program, self.rg_program);
        let notifier = Notifier::new(self.on_notify);

        Ok(PathCompleter::new(config, tools, notifier, search_root))
    }
}
