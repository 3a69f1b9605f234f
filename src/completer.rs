use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::backend::{
    self, fd_command, rg_files_command, ChildSlot, RawSink, SearchRequest, Tool, ToolSet,
};
use crate::entry::{CompletionEntry, SearchContext};
use crate::notify::{Advisory, Notifier};
use crate::relpath::relativize;

// ---------------------------------------------------------------------------
// SearchConfig
// ---------------------------------------------------------------------------

/// Immutable configuration snapshot taken at build time.
///
/// `pub(crate)`, not part of the public API. Callers configure these via the
/// builder methods (`.max_results()`, `.tool()`, ...).
pub(crate) struct SearchConfig {
    pub max_results:    usize,
    pub tool:           Tool,
    pub include_hidden: bool,
    pub respect_ignore: bool,
    pub include_dirs:   bool,
    pub relative_paths: bool,
}

// ---------------------------------------------------------------------------
// SearchHandle
// ---------------------------------------------------------------------------

/// Cancellation token for one in-flight search.
///
/// Returned by [`PathCompleter::search`]. Cancelling terminates any live
/// enumerator processes and suppresses the pending delivery; whichever of
/// {natural completion, cancellation} comes first wins, and the callback
/// fires at most once. Cancelling twice, or after the search completed, has
/// no further effect.
#[derive(Clone)]
pub struct SearchHandle {
    consumed: Arc<AtomicBool>,
    children: Vec<ChildSlot>,
}

impl SearchHandle {
    /// Abandon the search: kill live children and suppress the callback.
    pub fn cancel(&self) {
        if self.consumed.swap(true, Ordering::SeqCst) {
            return;
        }
        for slot in &self.children {
            let taken = match slot.lock() {
                Ok(mut guard) => guard.take(),
                Err(_) => None,
            };
            if let Some(mut child) = taken {
                let _ = child.kill();
                let _ = child.wait();
            }
        }
    }

    /// Handle for a search that completed before any process was spawned.
    fn inert() -> Self {
        Self {
            consumed: Arc::new(AtomicBool::new(true)),
            children: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// PathCompleter
// ---------------------------------------------------------------------------

/// Which concrete backend a search will drive, after probing.
enum ActiveTool {
    Fd,
    Rg,
}

/// The search coordinator.
///
/// Owns the configuration snapshot, the probed tool set, the advisory
/// channel, and the default search root. Each [`search`](Self::search) call
/// is fully isolated: its child processes, stream buffers, and delivery
/// state belong to that invocation alone, so overlapping searches never
/// share mutable structure.
pub struct PathCompleter {
    config:      SearchConfig,
    tools:       ToolSet,
    notifier:    Notifier,
    search_root: Option<PathBuf>,
}

impl PathCompleter {
    pub(crate) fn new(
        config: SearchConfig,
        tools: ToolSet,
        notifier: Notifier,
        search_root: Option<PathBuf>,
    ) -> Self {
        Self {
            config,
            tools,
            notifier,
            search_root,
        }
    }

    /// Start an asynchronous search for `query` and return immediately.
    ///
    /// `on_results` fires exactly once with the final ordered entries unless
    /// the returned handle is cancelled first. It is invoked from the
    /// invocation's reader thread (or synchronously, when no process could
    /// be spawned at all), so it must be `Send`; callers on an event loop
    /// marshal from there.
    ///
    /// Every failure mode at this layer (no backend, spawn failure, stream
    /// error, non-zero exit) looks like a search with zero matches, plus at
    /// most one [`Advisory`] on the notification channel.
    pub fn search<F>(&self, query: &str, context: &SearchContext, on_results: F) -> SearchHandle
    where
        F: FnOnce(Vec<CompletionEntry>) + Send + 'static,
    {
        let root = self.effective_root(context);
        let Some(tool) = self.resolve_tool() else {
            self.notifier.advise(Advisory::NoBackend);
            on_results(Vec::new());
            return SearchHandle::inert();
        };

        let request = SearchRequest {
            query:          query.to_string(),
            max_results:    self.config.max_results,
            include_hidden: self.config.include_hidden,
            respect_ignore: self.config.respect_ignore,
            include_dirs:   self.config.include_dirs,
            root:           root.clone(),
        };

        let plans = self.plan(tool, &request);

        let consumed = Arc::new(AtomicBool::new(false));
        let kinds: Vec<PartKind> = plans.iter().map(|p| p.kind).collect();
        let count = plans.len();
        let delivery = Arc::new(Delivery {
            consumed: Arc::clone(&consumed),
            kinds,
            finish: FinishSpec {
                root,
                reference_file: context.reference_file.clone(),
                include_dirs:   self.config.include_dirs,
                relative_paths: self.config.relative_paths,
                max_results:    self.config.max_results,
            },
            pending: Mutex::new(Pending {
                parts: (0..count).map(|_| None).collect(),
                remaining: count,
                on_results: Some(Box::new(on_results)),
            }),
        });

        let mut children = Vec::new();
        for (index, plan) in plans.into_iter().enumerate() {
            let part_delivery = Arc::clone(&delivery);
            let sink: RawSink = Box::new(move |lines| part_delivery.complete(index, lines));
            match backend::spawn_enumeration(plan.command, plan.filter, request.max_results, sink) {
                Ok(slot) => children.push(slot),
                Err(err) => {
                    log::debug!("failed to spawn '{}': {err}", plan.program);
                    self.notifier.advise(Advisory::SpawnFailed(plan.program));
                    delivery.complete(index, Vec::new());
                }
            }
        }

        SearchHandle { consumed, children }
    }

    /// Override the default search root for subsequent searches.
    ///
    /// The path must name an existing directory; it is canonicalized before
    /// use. `None` (or an empty path) clears the override back to the
    /// process working directory. An invalid path keeps the previous root
    /// and reports [`Advisory::InvalidSearchRoot`], never a hard error.
    pub fn set_search_root(&mut self, path: Option<&Path>) {
        let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) else {
            self.search_root = None;
            return;
        };
        match fs::canonicalize(path) {
            Ok(absolute) if absolute.is_dir() => self.search_root = Some(absolute),
            _ => self
                .notifier
                .advise(Advisory::InvalidSearchRoot(path.to_path_buf())),
        }
    }

    /// Explicit tool if its binary is available, else fd then rg.
    fn resolve_tool(&self) -> Option<ActiveTool> {
        match self.config.tool {
            Tool::Fd if self.tools.fd_available() => return Some(ActiveTool::Fd),
            Tool::Rg if self.tools.rg_available() => return Some(ActiveTool::Rg),
            _ => {}
        }
        if self.tools.fd_available() {
            Some(ActiveTool::Fd)
        } else if self.tools.rg_available() {
            Some(ActiveTool::Rg)
        } else {
            None
        }
    }

    /// Per-call context root, else the configured override, else the
    /// process working directory.
    fn effective_root(&self, context: &SearchContext) -> PathBuf {
        let chosen = context.search_root.as_ref().or(self.search_root.as_ref());
        match chosen {
            Some(root) if root.is_absolute() => root.clone(),
            Some(root) => env::current_dir()
                .map(|cwd| cwd.join(root))
                .unwrap_or_else(|_| root.clone()),
            None => env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// One enumeration plan per child process this search needs.
    ///
    /// fd needs a single mixed stream. rg lists files only, so when
    /// directories are requested a second, directory-capable enumeration is
    /// merged in; without one the search degrades to files only behind a
    /// one-time advisory.
    fn plan(&self, tool: ActiveTool, request: &SearchRequest) -> Vec<Plan> {
        let mut plans = Vec::new();
        match tool {
            ActiveTool::Fd => {
                plans.push(Plan {
                    kind:    PartKind::Mixed,
                    program: self.tools.fd_program.clone(),
                    command: fd_command(&self.tools.fd_program, request, false),
                    filter:  None,
                });
            }
            ActiveTool::Rg => {
                plans.push(Plan {
                    kind:    PartKind::Files,
                    program: self.tools.rg_program.clone(),
                    command: rg_files_command(&self.tools.rg_program, request),
                    filter:  Some(request.query.to_lowercase()),
                });
                if request.include_dirs {
                    if self.tools.fd_available() {
                        plans.push(Plan {
                            kind:    PartKind::Dirs,
                            program: self.tools.fd_program.clone(),
                            command: fd_command(&self.tools.fd_program, request, true),
                            filter:  None,
                        });
                    } else {
                        self.notifier.advise(Advisory::DirectoriesUnavailable);
                    }
                }
            }
        }
        plans
    }
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

/// What a raw line from a given enumeration is known to be.
#[derive(Debug, Clone, Copy)]
enum PartKind {
    /// Files and possibly directories interleaved; classify per entry.
    Mixed,
    /// Files only.
    Files,
    /// Directories only.
    Dirs,
}

struct Plan {
    kind:    PartKind,
    program: String,
    command: Command,
    filter:  Option<String>,
}

type ResultSink = Box<dyn FnOnce(Vec<CompletionEntry>) + Send>;

/// Collects the raw sequences of every enumeration in a search and performs
/// the single guarded delivery once the last one lands.
struct Delivery {
    consumed: Arc<AtomicBool>,
    kinds:    Vec<PartKind>,
    finish:   FinishSpec,
    pending:  Mutex<Pending>,
}

struct Pending {
    parts:      Vec<Option<Vec<String>>>,
    remaining:  usize,
    on_results: Option<ResultSink>,
}

/// Parameters for turning raw enumerator paths into delivered entries.
struct FinishSpec {
    root:           PathBuf,
    reference_file: Option<PathBuf>,
    include_dirs:   bool,
    relative_paths: bool,
    max_results:    usize,
}

impl Delivery {
    /// Record one enumeration's raw result; the last arrival finalizes and
    /// delivers, unless cancellation consumed the delivery first.
    fn complete(&self, index: usize, lines: Vec<String>) {
        let finished = {
            let mut pending = match self.pending.lock() {
                Ok(guard) => guard,
                Err(_) => return,
            };
            if pending.parts[index].is_none() {
                pending.remaining -= 1;
            }
            pending.parts[index] = Some(lines);
            if pending.remaining > 0 {
                return;
            }
            let parts = std::mem::take(&mut pending.parts);
            pending.on_results.take().map(|sink| (parts, sink))
        };
        let Some((parts, sink)) = finished else { return };
        if self.consumed.swap(true, Ordering::SeqCst) {
            return;
        }
        let entries = finalize(parts, &self.kinds, &self.finish);
        log::debug!("delivering {} completion entries", entries.len());
        sink(entries);
    }
}

/// Relativize, classify, partition directories-first, and re-apply the cap.
///
/// The cap is enforced again here because merging a directory enumeration
/// into rg's file stream can exceed what each child was capped at.
fn finalize(parts: Vec<Option<Vec<String>>>, kinds: &[PartKind], spec: &FinishSpec) -> Vec<CompletionEntry> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    let mut seen = HashSet::new();

    for (kind, part) in kinds.iter().zip(parts) {
        for raw in part.unwrap_or_default() {
            let entry = resolve_entry(&raw, *kind, spec);
            if !seen.insert(entry.path.clone()) {
                continue;
            }
            if entry.is_dir {
                dirs.push(entry);
            } else {
                files.push(entry);
            }
        }
    }

    // Stable partition: each side keeps the enumerator's emission order.
    let mut entries = dirs;
    entries.append(&mut files);
    entries.truncate(spec.max_results);
    entries
}

fn resolve_entry(raw: &str, kind: PartKind, spec: &FinishSpec) -> CompletionEntry {
    let trimmed = raw.trim_end_matches(['/', '\\']);
    let is_dir = match kind {
        PartKind::Files => false,
        PartKind::Dirs => true,
        PartKind::Mixed => {
            if !spec.include_dirs {
                false
            } else if trimmed.len() != raw.len() {
                true
            } else {
                fs::metadata(absolute_under(trimmed, &spec.root))
                    .map(|m| m.is_dir())
                    .unwrap_or(false)
            }
        }
    };

    let mut path = if spec.relative_paths {
        relativize(trimmed, spec.reference_file.as_deref(), &spec.root)
    } else {
        absolute_under(trimmed, &spec.root).display().to_string()
    };
    if is_dir && !path.ends_with(MAIN_SEPARATOR) {
        path.push(MAIN_SEPARATOR);
    }

    CompletionEntry { path, is_dir }
}

fn absolute_under(raw: &str, root: &Path) -> PathBuf {
    let path = Path::new(raw);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
