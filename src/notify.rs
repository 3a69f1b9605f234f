use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// Advisory
// ---------------------------------------------------------------------------

/// Non-fatal, user-facing conditions reported outside the result path.
///
/// Advisories never alter control flow: the search that raised one still
/// delivers a (possibly empty) result list. Each distinct advisory is
/// reported at most once per [`PathCompleter`](crate::PathCompleter), so a
/// missing binary does not spam the host on every keystroke.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Advisory {
    /// Neither enumerator binary could be found.
    NoBackend,

    /// An enumerator binary probed as available but could not be started.
    SpawnFailed(String),

    /// The active backend cannot list directories and no directory-capable
    /// enumerator exists; the search proceeds with files only.
    DirectoriesUnavailable,

    /// A runtime search-root override named a missing or non-directory
    /// path; the previous root stays in effect.
    InvalidSearchRoot(PathBuf),
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoBackend => {
                write!(f, "path completion needs fd or rg on PATH; showing no results")
            }
            Self::SpawnFailed(program) => {
                write!(f, "could not start '{program}'; treating the search as empty")
            }
            Self::DirectoriesUnavailable => {
                write!(f, "directory completion needs fd; showing files only")
            }
            Self::InvalidSearchRoot(path) => {
                write!(f, "search root is not a directory: {}", path.display())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Callback type for advisory notifications.
pub type NotifyFn = dyn Fn(&Advisory) + Send + Sync;

/// Dispatches advisories to the host, once per distinct condition.
///
/// With no callback installed, advisories go to `log::warn!` so embedders
/// that only wire up a logger still see them.
pub(crate) struct Notifier {
    callback: Option<Arc<NotifyFn>>,
    seen: Mutex<HashSet<Advisory>>,
}

impl Notifier {
    pub(crate) fn new(callback: Option<Arc<NotifyFn>>) -> Self {
        Self {
            callback,
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Report `advisory` unless an identical one was already reported.
    pub(crate) fn advise(&self, advisory: Advisory) {
        {
            let mut seen = match self.seen.lock() {
                Ok(guard) => guard,
                Err(_) => return,
            };
            if !seen.insert(advisory.clone()) {
                return;
            }
        }
        match &self.callback {
            Some(callback) => callback(&advisory),
            None => log::warn!("{advisory}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_advisories_are_reported_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let notifier = Notifier::new(Some(Arc::new(move |a: &Advisory| {
            sink.lock().unwrap().push(a.clone());
        })));

        notifier.advise(Advisory::NoBackend);
        notifier.advise(Advisory::NoBackend);
        notifier.advise(Advisory::DirectoriesUnavailable);

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![Advisory::NoBackend, Advisory::DirectoriesUnavailable],
            "each distinct advisory should be delivered exactly once"
        );
    }

    #[test]
    fn distinct_payloads_are_distinct_conditions() {
        let count = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&count);
        let notifier = Notifier::new(Some(Arc::new(move |_: &Advisory| {
            *sink.lock().unwrap() += 1;
        })));

        notifier.advise(Advisory::SpawnFailed("fd".into()));
        notifier.advise(Advisory::SpawnFailed("rg".into()));

        assert_eq!(*count.lock().unwrap(), 2);
    }
}
