//! Locating the real compiler on the search path.
//!
//! The wrapper is usually installed under the compiler's own name in a
//! directory that precedes the real compiler on `PATH`, so a plain lookup would
//! find the wrapper first. The selected compiler is the first match, in path
//! order, that is not the running executable.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::LocateError;

/// Returns every executable named `tool` in the directories of `search_path`,
/// in path order.
///
/// `search_path` uses the platform's separator (`:` or `;`). Empty entries are
/// skipped. On Windows a name without an extension also matches `<tool>.exe`.
pub fn find_all(tool: &str, search_path: &OsStr) -> Vec<PathBuf> {
    let names = candidate_names(tool);
    std::env::split_paths(search_path)
        .filter(|dir| !dir.as_os_str().is_empty())
        .flat_map(|dir| {
            names
                .iter()
                .map(|name| dir.join(name))
                .filter(|path| is_executable(path))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Picks the first candidate that is not `this_exe`.
///
/// Paths are compared after canonicalization, so a symlink to the wrapper is
/// recognized as the wrapper.
pub fn select_compiler(
    tool: &str,
    candidates: &[PathBuf],
    this_exe: Option<&Path>,
) -> Result<PathBuf, LocateError> {
    if candidates.is_empty() {
        return Err(LocateError::NotFound {
            tool: tool.to_string(),
        });
    }
    let this_exe = this_exe.map(canonical);
    candidates
        .iter()
        .find(|candidate| Some(canonical(candidate)) != this_exe)
        .cloned()
        .ok_or_else(|| LocateError::OnlySelf {
            tool: tool.to_string(),
        })
}

/// Resolves `tool` against `$PATH`, skipping this wrapper.
pub fn locate_compiler(tool: &str) -> Result<PathBuf, LocateError> {
    let search_path = std::env::var_os("PATH").ok_or(LocateError::NoSearchPath)?;
    let candidates = find_all(tool, &search_path);
    debug!(tool, ?candidates, "search-path matches");
    let this_exe = std::env::current_exe().ok();
    select_compiler(tool, &candidates, this_exe.as_deref())
}

fn candidate_names(tool: &str) -> Vec<String> {
    let mut names = vec![tool.to_string()];
    if cfg!(windows) && Path::new(tool).extension().is_none() {
        names.push(format!("{tool}.exe"));
    }
    names
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    fn make_tool(dir: &Path, name: &str) -> PathBuf {
        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        path
    }

    fn search_path<P: AsRef<Path>>(dirs: &[P]) -> OsString {
        std::env::join_paths(dirs.iter().map(|d| d.as_ref())).unwrap()
    }

    #[test]
    fn finds_all_matches_in_path_order() {
        let root = tempfile::tempdir().unwrap();
        let first = root.path().join("first");
        let empty = root.path().join("empty");
        let second = root.path().join("second");
        std::fs::create_dir_all(&empty).unwrap();
        let a = make_tool(&first, "glslc");
        let b = make_tool(&second, "glslc");

        let found = find_all("glslc", &search_path(&[&first, &empty, &second]));
        assert_eq!(found, vec![a, b]);
    }

    #[test]
    fn no_matches_is_empty() {
        let root = tempfile::tempdir().unwrap();
        let found = find_all("glslc", &search_path(&[root.path()]));
        assert!(found.is_empty());
    }

    #[test]
    fn skips_directories_named_like_the_tool() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("glslc")).unwrap();
        assert!(find_all("glslc", &search_path(&[root.path()])).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn skips_non_executable_files() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("glslc"), "data").unwrap();
        assert!(find_all("glslc", &search_path(&[root.path()])).is_empty());
    }

    #[test]
    fn select_skips_this_wrapper() {
        let root = tempfile::tempdir().unwrap();
        let wrapper = make_tool(&root.path().join("wrap"), "glslc");
        let real = make_tool(&root.path().join("real"), "glslc");

        let chosen =
            select_compiler("glslc", &[wrapper.clone(), real.clone()], Some(wrapper.as_path())).unwrap();
        assert_eq!(chosen, real);
    }

    #[test]
    fn select_first_when_wrapper_not_listed() {
        let root = tempfile::tempdir().unwrap();
        let a = make_tool(&root.path().join("a"), "glslc");
        let b = make_tool(&root.path().join("b"), "glslc");
        let other = make_tool(&root.path().join("c"), "memocc");

        let chosen = select_compiler("glslc", &[a.clone(), b], Some(other.as_path())).unwrap();
        assert_eq!(chosen, a);
    }

    #[cfg(unix)]
    #[test]
    fn select_recognizes_symlinked_wrapper() {
        let root = tempfile::tempdir().unwrap();
        let wrapper = make_tool(&root.path().join("bin"), "memocc");
        let link_dir = root.path().join("shims");
        std::fs::create_dir_all(&link_dir).unwrap();
        let link = link_dir.join("glslc");
        std::os::unix::fs::symlink(&wrapper, &link).unwrap();
        let real = make_tool(&root.path().join("real"), "glslc");

        let chosen = select_compiler("glslc", &[link, real.clone()], Some(wrapper.as_path())).unwrap();
        assert_eq!(chosen, real);
    }

    #[test]
    fn select_empty_is_not_found() {
        let err = select_compiler("glslc", &[], None).unwrap_err();
        assert!(matches!(err, LocateError::NotFound { .. }));
    }

    #[test]
    fn select_only_self_errors() {
        let root = tempfile::tempdir().unwrap();
        let wrapper = make_tool(root.path(), "glslc");
        let err = select_compiler("glslc", &[wrapper.clone()], Some(wrapper.as_path())).unwrap_err();
        assert!(matches!(err, LocateError::OnlySelf { .. }));
    }
}
