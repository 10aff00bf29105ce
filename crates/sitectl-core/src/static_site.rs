// ── Static site folder layout ──
//
// The server keeps static files of a site under `static/`, with every file
// sitting in a `_files` (or `_mobilefiles`) folder next to the folder it
// belongs to. Locally, files live directly in their folder. `wrap` builds
// the server layout from a local tree; `unwrap` reverses it in place.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::CoreError;

pub const STATIC_FOLDER: &str = "static";
pub const FILES_FOLDER: &str = "_files";
pub const MOBILE_FILES_FOLDER: &str = "_mobilefiles";

fn is_wrapper(name: &str) -> bool {
    name == FILES_FOLDER || name == MOBILE_FILES_FOLDER
}

/// Mirror `src` into `dest` in the server layout.
///
/// Every directory is recreated, empty ones included. A file moves into
/// `_files` under its directory unless that directory already is a
/// `_files` or `_mobilefiles` folder. Returns the number of entries seen;
/// an empty `src` is an error.
pub fn wrap(src: &Path, dest: &Path) -> Result<usize, CoreError> {
    fs::create_dir_all(dest)?;
    let mut entries = 0;

    for entry in WalkDir::new(src).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| CoreError::Io(e.into()))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| CoreError::Internal(e.to_string()))?;
        entries += 1;

        if entry.file_type().is_dir() {
            fs::create_dir_all(dest.join(rel))?;
            continue;
        }

        let parent = rel.parent().unwrap_or_else(|| Path::new(""));
        let already_wrapped = parent
            .file_name()
            .is_some_and(|n| is_wrapper(&n.to_string_lossy()));
        let target_dir = if already_wrapped {
            dest.join(parent)
        } else {
            dest.join(parent).join(FILES_FOLDER)
        };
        fs::create_dir_all(&target_dir)?;
        fs::copy(entry.path(), target_dir.join(entry.file_name()))?;
    }

    if entries == 0 {
        return Err(CoreError::validation(format!(
            "no file nor folder under {}",
            src.display()
        )));
    }
    debug!(src = %src.display(), dest = %dest.display(), entries, "wrapped static files");
    Ok(entries)
}

/// Hoist the contents of every `_files` folder under `dir` into its parent
/// and remove the emptied folder. `_mobilefiles` folders stay as they are.
/// Only the exact name `_files` counts, so a folder like `page_files` is
/// left untouched.
pub fn unwrap(dir: &Path) -> Result<(), CoreError> {
    let mut wrappers: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_dir() && e.file_name() == FILES_FOLDER)
        .map(walkdir::DirEntry::into_path)
        .collect();
    // Deepest first, so hoisting never moves a folder still to be visited.
    wrappers.sort_by_key(|p| std::cmp::Reverse(depth(p)));

    for wrapper in wrappers {
        let Some(parent) = wrapper.parent() else {
            continue;
        };
        for entry in fs::read_dir(&wrapper)? {
            let entry = entry?;
            fs::rename(entry.path(), parent.join(entry.file_name()))?;
        }
        fs::remove_dir(&wrapper)?;
    }
    Ok(())
}

fn depth(path: &Path) -> usize {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    /// Relative path -> file contents (`None` for directories).
    fn snapshot(root: &Path) -> BTreeMap<String, Option<String>> {
        WalkDir::new(root)
            .min_depth(1)
            .into_iter()
            .map(Result::unwrap)
            .map(|e| {
                let rel = e
                    .path()
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/");
                let contents = e
                    .file_type()
                    .is_file()
                    .then(|| fs::read_to_string(e.path()).unwrap());
                (rel, contents)
            })
            .collect()
    }

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn wrap_moves_files_into_files_folders() {
        let src = TempDir::new().unwrap();
        write(src.path(), "index.html", "home");
        write(src.path(), "css/site.css", "body{}");
        write(src.path(), "img/_mobilefiles/logo.png", "m");
        fs::create_dir_all(src.path().join("empty")).unwrap();

        let out = TempDir::new().unwrap();
        let dest = out.path().join(STATIC_FOLDER);
        wrap(src.path(), &dest).unwrap();

        let tree = snapshot(&dest);
        let files: Vec<&str> = tree
            .iter()
            .filter(|(_, c)| c.is_some())
            .map(|(p, _)| p.as_str())
            .collect();
        assert_eq!(
            files,
            vec![
                "_files/index.html",
                "css/_files/site.css",
                "img/_mobilefiles/logo.png"
            ]
        );
        assert!(tree.contains_key("empty"));
    }

    #[test]
    fn wrap_then_unwrap_restores_the_tree() {
        let src = TempDir::new().unwrap();
        write(src.path(), "index.html", "home");
        write(src.path(), "a/b/page.html", "deep");
        write(src.path(), "a/notes.txt", "n");
        fs::create_dir_all(src.path().join("a/empty")).unwrap();

        let out = TempDir::new().unwrap();
        let dest = out.path().join(STATIC_FOLDER);
        wrap(src.path(), &dest).unwrap();
        unwrap(&dest).unwrap();

        assert_eq!(snapshot(&dest), snapshot(src.path()));
    }

    #[test]
    fn unwrap_leaves_mobile_files_alone() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "_files/a.txt", "a");
        write(dir.path(), "x/_mobilefiles/m.txt", "m");

        unwrap(dir.path()).unwrap();

        let tree = snapshot(dir.path());
        assert!(tree.contains_key("a.txt"));
        assert!(!tree.contains_key("_files"));
        assert!(tree.contains_key("x/_mobilefiles/m.txt"));
    }

    #[test]
    fn unwrap_ignores_folders_that_only_end_in_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "page_files/img.png", "p");
        write(dir.path(), "page/_files/index.html", "i");

        unwrap(dir.path()).unwrap();

        let tree = snapshot(dir.path());
        assert!(tree.contains_key("page_files/img.png"));
        assert!(!tree.contains_key("img.png"));
        assert!(tree.contains_key("page/index.html"));
    }

    #[test]
    fn empty_source_is_rejected() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let err = wrap(src.path(), &out.path().join(STATIC_FOLDER)).unwrap_err();
        assert!(err.to_string().contains("no file nor folder under"));
    }
}
