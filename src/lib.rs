//! # compath
//!
//! Async fuzzy path completion engine, driven by external enumerators, with
//! streaming and cancellation.
//!
//! compath is the search-and-cancel pipeline behind an interactive path
//! completer. It owns spawning an enumerator process (`fd`, or `rg --files`
//! as a fallback), streaming and reassembling its output, capping and
//! deduplicating the matches, relativizing them against the caller's base
//! directory, and handing the caller a cancellation handle so a fast-typing
//! user can abandon stale searches without leaking processes. It does
//! **not** own the completion UI, trigger detection, configuration files,
//! or the installation of the enumerator binaries; those belong to the
//! host.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use compath::SearchContext;
//!
//! let completer = compath::completer()
//!     .max_results(10)
//!     .include_dirs(true)
//!     .build()
//!     .expect("valid configuration");
//!
//! let context = SearchContext::for_file("/home/me/project/docs/readme.md");
//! let handle = completer.search("not", &context, |entries| {
//!     for entry in &entries {
//!         println!("{}", entry.path); // e.g. "notes/a.md"
//!     }
//! });
//!
//! // A newer keystroke supersedes this search:
//! handle.cancel();
//! ```
//!
//! `search()` returns immediately; the callback fires at most once, from the
//! search's own reader thread, and never after `cancel()` won the race.
//!
//! # Failure is quiet
//!
//! A missing backend, a spawn failure, or an enumerator crash all look like
//! a search with zero matches. The host learns why through a one-time
//! [`Advisory`], never through an error it has to route around mid-keystroke:
//!
//! ```rust
//! use std::sync::mpsc;
//! use compath::SearchContext;
//!
//! let completer = compath::completer()
//!     .fd_program("fd-not-installed")
//!     .rg_program("rg-not-installed")
//!     .on_notify(|advisory| eprintln!("{advisory}"))
//!     .build()
//!     .unwrap();
//!
//! let (tx, rx) = mpsc::channel();
//! let handle = completer.search("src", &SearchContext::default(), move |entries| {
//!     let _ = tx.send(entries);
//! });
//!
//! assert!(rx.recv().unwrap().is_empty());
//! handle.cancel(); // no-op after completion
//! ```

#![forbid(unsafe_code)]

mod backend;
mod builder;
mod completer;
mod entry;
mod error;
mod notify;
mod relpath;

// ── Public re-exports ─────────────────────────────────────────────────────────

pub use backend::Tool;
pub use builder::CompleterBuilder;
pub use completer::{PathCompleter, SearchHandle};
pub use entry::{CompletionEntry, SearchContext};
pub use error::CompathError;
pub use notify::{Advisory, NotifyFn};

// ── Entry point ───────────────────────────────────────────────────────────────

/// Create a new [`CompleterBuilder`] to configure a [`PathCompleter`].
///
/// # Example
///
/// ```rust,no_run
/// let completer = compath::completer()
///     .max_results(25)
///     .respect_ignore(false)
///     .build()
///     .expect("valid configuration");
/// ```
pub fn completer() -> CompleterBuilder {
    CompleterBuilder::default()
}
