use std::env;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

// ---------------------------------------------------------------------------
// relativize()
// ---------------------------------------------------------------------------

/// Convert an enumerator-emitted path into its display/insert form.
///
/// Pure path arithmetic, no I/O. The comparison bases are tried in order:
///
/// 1. the directory of `reference_file` (the document the completion is
///    typed into), when one is supplied;
/// 2. `search_root`;
/// 3. the process working directory, abbreviating `~/` for paths under the
///    home directory.
///
/// Prefix tests compare whole path components, so `/foo-bar` is never
/// treated as lying under `/foo`. Relative inputs are resolved against
/// `search_root` first. In pathological cases (empty bases, unobtainable
/// working directory) the input comes back unchanged rather than failing.
pub(crate) fn relativize(raw: &str, reference_file: Option<&Path>, search_root: &Path) -> String {
    let root = absolutize(search_root, None);
    let input = Path::new(raw);
    let absolute = absolutize(input, Some(&root));

    // Base 1: the reference file's directory.
    if let Some(reference) = reference_file.and_then(Path::parent) {
        if !reference.as_os_str().is_empty() {
            let reference = absolutize(reference, Some(&root));
            if let Ok(rel) = absolute.strip_prefix(&reference) {
                return display(rel);
            }
        }
    }

    // Base 2: the search root.
    if let Ok(rel) = absolute.strip_prefix(&root) {
        return display(rel);
    }

    // Base 3: the process working directory, then `~/` abbreviation.
    if let Ok(cwd) = env::current_dir() {
        if let Ok(rel) = absolute.strip_prefix(&cwd) {
            return display(rel);
        }
    }
    if let Some(home) = dirs::home_dir() {
        if let Ok(rel) = absolute.strip_prefix(&home) {
            return if rel.as_os_str().is_empty() {
                "~".to_string()
            } else {
                format!("~{}{}", MAIN_SEPARATOR, display(rel))
            };
        }
    }

    display(&absolute)
}

/// Resolve `path` to an absolute, `.`-free form with no trailing separator.
///
/// Relative paths are joined onto `base` when one is given, else onto the
/// process working directory; if neither is obtainable the path is cleaned
/// but left relative.
fn absolutize(path: &Path, base: Option<&Path>) -> PathBuf {
    if path.is_absolute() {
        return clean(path);
    }
    match base {
        Some(base) => clean(&base.join(path)),
        None => match env::current_dir() {
            Ok(cwd) => clean(&cwd.join(path)),
            Err(_) => clean(path),
        },
    }
}

/// Drop `.` components. Collecting components also normalizes away any
/// trailing separator.
fn clean(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Render a relativized path, mapping the empty remainder (the base itself)
/// to `.`.
fn display(path: &Path) -> String {
    if path.as_os_str().is_empty() {
        ".".to_string()
    } else {
        path.display().to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;

    #[test]
    fn match_under_reference_directory_is_reference_relative() {
        let out = relativize(
            "/proj/docs/notes/a.md",
            Some(Path::new("/proj/docs/readme.md")),
            Path::new("/proj"),
        );
        assert_eq!(out, "notes/a.md");
    }

    #[test]
    fn match_outside_reference_directory_is_root_relative() {
        let out = relativize(
            "/proj/src/b.lua",
            Some(Path::new("/proj/docs/readme.md")),
            Path::new("/proj"),
        );
        assert_eq!(out, "src/b.lua");
    }

    #[test]
    fn no_reference_file_uses_root() {
        let out = relativize("/proj/src/b.lua", None, Path::new("/proj"));
        assert_eq!(out, "src/b.lua");
    }

    #[test]
    fn component_prefixes_do_not_match_raw_string_prefixes() {
        let out = relativize("/foo-bar/x.txt", None, Path::new("/foo"));
        assert_eq!(out, "/foo-bar/x.txt", "/foo-bar must not count as under /foo");
    }

    #[test]
    fn relative_input_resolves_against_root() {
        let out = relativize("src/b.lua", None, Path::new("/proj"));
        assert_eq!(out, "src/b.lua");
    }

    #[test]
    fn trailing_separator_on_root_is_ignored() {
        let out = relativize("/proj/src/b.lua", None, Path::new("/proj/"));
        assert_eq!(out, "src/b.lua");
    }

    #[test]
    fn dot_segments_are_normalized_away() {
        let out = relativize("./src/./b.lua", None, Path::new("/proj"));
        assert_eq!(out, "src/b.lua");
    }

    #[test]
    fn reference_directory_without_parent_is_skipped() {
        let out = relativize("/proj/a.md", Some(Path::new("readme.md")), Path::new("/proj"));
        assert_eq!(out, "a.md");
    }

    #[test]
    fn path_outside_all_bases_falls_back_to_cwd() {
        let cwd = env::current_dir().unwrap();
        let input = cwd.join("foo/bar.txt");
        let out = relativize(input.to_str().unwrap(), None, Path::new("/compath-elsewhere"));
        assert_eq!(out, "foo/bar.txt");
    }

    #[test]
    fn root_itself_renders_as_dot() {
        let out = relativize("/proj", None, Path::new("/proj"));
        assert_eq!(out, ".");
    }
}
