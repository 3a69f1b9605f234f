use std::collections::HashSet;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;

// ---------------------------------------------------------------------------
// Tool selection
// ---------------------------------------------------------------------------

/// Which external enumerator to drive.
///
/// A closed set: `fd` is pattern-native (the child process does the
/// matching), `rg --files` enumerates everything and the adapter filters
/// client-side. `Auto` probes for `fd` first, then `rg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// Probe for `fd`, then `rg`, and use the first one available.
    Auto,
    /// The `fd` enumerator (pattern-native).
    Fd,
    /// The `rg --files` enumerator (enumerate-then-filter).
    Rg,
}

/// Resolved program names plus cached availability probes.
///
/// Probing spawns `<program> --version` once per completer; a binary
/// installed afterwards is picked up by building a new completer.
pub(crate) struct ToolSet {
    pub fd_program: String,
    pub rg_program: String,
    fd_available:   OnceLock<bool>,
    rg_available:   OnceLock<bool>,
}

impl ToolSet {
    pub(crate) fn new(fd_program: String, rg_program: String) -> Self {
        Self {
            fd_program,
            rg_program,
            fd_available: OnceLock::new(),
            rg_available: OnceLock::new(),
        }
    }

    pub(crate) fn fd_available(&self) -> bool {
        *self.fd_available.get_or_init(|| probe(&self.fd_program))
    }

    pub(crate) fn rg_available(&self) -> bool {
        *self.rg_available.get_or_init(|| probe(&self.rg_program))
    }
}

/// True when `program --version` can be executed at all.
fn probe(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .is_ok()
}

// ---------------------------------------------------------------------------
// SearchRequest
// ---------------------------------------------------------------------------

/// Immutable per-search parameters, built by the completer from the caller's
/// query and the configuration snapshot.
pub(crate) struct SearchRequest {
    pub query:          String,
    pub max_results:    usize,
    pub include_hidden: bool,
    pub respect_ignore: bool,
    pub include_dirs:   bool,
    pub root:           PathBuf,
}

/// `fd` argument contract: type restriction, hidden/ignore flags, result
/// cap, optional trailing pattern, working directory. An empty pattern means
/// "list up to the cap, unfiltered"; no client-side filtering is applied.
pub(crate) fn fd_command(program: &str, request: &SearchRequest, dirs_only: bool) -> Command {
    let mut cmd = Command::new(program);
    if dirs_only {
        cmd.arg("--type").arg("directory");
    } else {
        cmd.arg("--type").arg("file");
        if request.include_dirs {
            cmd.arg("--type").arg("directory");
        }
    }
    if request.include_hidden {
        cmd.arg("--hidden");
    }
    if !request.respect_ignore {
        cmd.arg("--no-ignore");
    }
    cmd.arg("--max-results").arg(request.max_results.to_string());
    if !request.query.is_empty() {
        cmd.arg(&request.query);
    }
    cmd.current_dir(&request.root);
    cmd
}

/// `rg --files` argument contract: hidden/ignore flags and working directory
/// only. Matching and capping happen client-side as the output streams in.
pub(crate) fn rg_files_command(program: &str, request: &SearchRequest) -> Command {
    let mut cmd = Command::new(program);
    cmd.arg("--files");
    if request.include_hidden {
        cmd.arg("--hidden");
    }
    if !request.respect_ignore {
        cmd.arg("--no-ignore");
    }
    cmd.current_dir(&request.root);
    cmd
}

// ---------------------------------------------------------------------------
// Enumeration
// ---------------------------------------------------------------------------

/// Shared slot holding a live child process.
///
/// Exactly one of {reader thread at stream end, cancellation} takes the
/// child out and reaps it; `Option::take` under the lock guards the
/// double-release.
pub(crate) type ChildSlot = Arc<Mutex<Option<Child>>>;

/// Callback receiving one enumeration's finite raw path sequence.
pub(crate) type RawSink = Box<dyn FnOnce(Vec<String>) + Send>;

/// Spawn `cmd` and stream its stdout on a dedicated reader thread.
///
/// `on_lines` always fires exactly once with the ordered, deduplicated,
/// capped sequence (empty on stream or exit failure); suppressing a
/// cancelled delivery is the caller's concern. When `filter` is set, each
/// path must contain it case-insensitively; once `max_results` entries are
/// retained the child is terminated early.
///
/// A spawn failure is returned synchronously; the caller treats it as an
/// empty result, not an error.
pub(crate) fn spawn_enumeration(
    mut cmd: Command,
    filter: Option<String>,
    max_results: usize,
    on_lines: RawSink,
) -> std::io::Result<ChildSlot> {
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::null());
    log::debug!("spawning enumerator: {cmd:?}");

    let mut child = cmd.spawn()?;
    let stdout = child.stdout.take();
    let slot: ChildSlot = Arc::new(Mutex::new(Some(child)));

    let reader_slot = Arc::clone(&slot);
    thread::spawn(move || {
        let (mut lines, end) = match stdout {
            Some(out) => stream_lines(out, filter.as_deref(), max_results),
            None => (Vec::new(), StreamEnd::Eof),
        };
        release(&reader_slot, &mut lines, end);
        on_lines(lines);
    });

    Ok(slot)
}

/// How a stream stopped.
enum StreamEnd {
    /// The child closed stdout on its own.
    Eof,
    /// The result cap was reached mid-stream.
    Capped,
    /// A read failed mid-stream.
    Failed,
}

/// Read stdout in arbitrary-size chunks, reassembling lines across chunk
/// boundaries, until EOF, the cap, or a read error.
fn stream_lines(mut reader: impl Read, filter: Option<&str>, max: usize) -> (Vec<String>, StreamEnd) {
    let mut assembler = LineAssembler::new();
    let mut seen = HashSet::new();
    let mut lines = Vec::new();
    let mut buf = [0u8; 8192];

    loop {
        match reader.read(&mut buf) {
            Ok(0) => {
                if let Some(last) = assembler.finish() {
                    accept(&mut lines, &mut seen, filter, last, max);
                }
                return (lines, StreamEnd::Eof);
            }
            Ok(n) => {
                for line in assembler.push(&buf[..n]) {
                    accept(&mut lines, &mut seen, filter, line, max);
                    if lines.len() == max {
                        return (lines, StreamEnd::Capped);
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => {
                // all-or-nothing: partial results are never delivered
                lines.clear();
                return (lines, StreamEnd::Failed);
            }
        }
    }
}

/// Retain `line` if it is non-empty, passes the filter, is not a duplicate,
/// and the cap has room.
fn accept(
    lines: &mut Vec<String>,
    seen: &mut HashSet<String>,
    filter: Option<&str>,
    line: String,
    max: usize,
) {
    if lines.len() >= max || line.is_empty() {
        return;
    }
    if let Some(needle) = filter {
        if !needle.is_empty() && !line.to_lowercase().contains(needle) {
            return;
        }
    }
    if seen.insert(line.clone()) {
        lines.push(line);
    }
}

/// Reap the child exactly once and apply the exit policy: a non-zero exit
/// without a cap-triggered early stop means "no results". Cancellation may
/// already have emptied the slot, in which case there is nothing to release.
fn release(slot: &ChildSlot, lines: &mut Vec<String>, end: StreamEnd) {
    let taken = match slot.lock() {
        Ok(mut guard) => guard.take(),
        Err(_) => None,
    };
    if let Some(mut child) = taken {
        if !matches!(end, StreamEnd::Eof) {
            let _ = child.kill();
        }
        match child.wait() {
            Ok(status) if !status.success() && matches!(end, StreamEnd::Eof) => lines.clear(),
            Ok(_) => {}
            Err(_) => lines.clear(),
        }
    }
    if matches!(end, StreamEnd::Failed) {
        lines.clear();
    }
}

// ---------------------------------------------------------------------------
// LineAssembler
// ---------------------------------------------------------------------------

/// Buffers partial lines across arbitrarily split output chunks.
///
/// Only complete, newline-terminated entries are yielded from `push`; a
/// trailing unterminated line is held back until `finish`. CRLF endings are
/// tolerated, and bytes are decoded lossily so one stray byte never drops a
/// whole delivery.
pub(crate) struct LineAssembler {
    buf: Vec<u8>,
}

impl LineAssembler {
    pub(crate) fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Feed one chunk; returns the complete lines it terminated.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let rest = self.buf.split_off(pos + 1);
            let mut line = std::mem::replace(&mut self.buf, rest);
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Flush the trailing unterminated line present at stream end, if any.
    pub(crate) fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let mut line = std::mem::take(&mut self.buf);
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn split_mid_line_yields_exactly_two_entries() {
        let mut assembler = LineAssembler::new();
        let mut lines = assembler.push(b"a/b.txt\nc/d");
        assert_eq!(lines, vec!["a/b.txt"]);

        lines = assembler.push(b"txt\n");
        assert_eq!(lines, vec!["c/dtxt"]);
        assert!(assembler.finish().is_none());
    }

    #[test]
    fn trailing_partial_line_is_flushed_at_stream_end() {
        let mut assembler = LineAssembler::new();
        assert_eq!(assembler.push(b"one\ntwo"), vec!["one"]);
        assert_eq!(assembler.finish(), Some("two".to_string()));
    }

    #[test]
    fn crlf_endings_are_stripped() {
        let mut assembler = LineAssembler::new();
        assert_eq!(assembler.push(b"a\r\nb\r\n"), vec!["a", "b"]);
    }

    #[test]
    fn chunk_with_many_lines_preserves_order() {
        let mut assembler = LineAssembler::new();
        assert_eq!(assembler.push(b"x\ny\nz\n"), vec!["x", "y", "z"]);
    }

    #[test]
    fn stream_is_capped_and_deduplicated() {
        let input = b"a\nb\na\nc\nd\n";
        let (lines, end) = stream_lines(Cursor::new(&input[..]), None, 3);
        assert_eq!(lines, vec!["a", "b", "c"], "duplicates must not count toward the cap");
        assert!(matches!(end, StreamEnd::Capped));
    }

    #[test]
    fn filter_is_case_insensitive_substring() {
        let input = b"src/Invoice.txt\nnotes.md\ndocs/INVOICES/q1.txt\n";
        let (lines, end) = stream_lines(Cursor::new(&input[..]), Some("invoice"), 10);
        assert_eq!(lines, vec!["src/Invoice.txt", "docs/INVOICES/q1.txt"]);
        assert!(matches!(end, StreamEnd::Eof));
    }

    #[test]
    fn empty_filter_retains_everything_in_order() {
        let input = b"b\na\nc\n";
        let (lines, _) = stream_lines(Cursor::new(&input[..]), Some(""), 10);
        assert_eq!(lines, vec!["b", "a", "c"]);
    }

    #[test]
    fn unterminated_final_entry_is_kept() {
        let input = b"a/b.txt\nc/d.txt";
        let (lines, _) = stream_lines(Cursor::new(&input[..]), None, 10);
        assert_eq!(lines, vec!["a/b.txt", "c/d.txt"]);
    }
}
