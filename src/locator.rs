//! Discovery of per-variant resource roots inside the exploded archive directory.

use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Find every directory under `root` named exactly `variant`.
///
/// Symlinks are neither followed nor reported.
/// A matching directory is a terminal match: it is reported and never searched for
/// nested matches. `root` itself is never reported. Entries are visited depth-first in
/// file-name order, so the result is deterministic. A missing root or an unreadable
/// subtree yields nothing for that part of the tree instead of failing the scan.
pub fn locate(root: &Path, variant: &str) -> Vec<PathBuf> {
    if variant.is_empty() {
        return Vec::new();
    }
    if !root.is_dir() {
        debug!(root = %root.display(), "exploded archive directory does not exist");
        return Vec::new();
    }

    let variant_owned = variant.to_string();

    let walker = WalkBuilder::new(root)
        .hidden(false)
        // Exploded archives carry no ignore files worth honouring
        .git_ignore(false)
        .ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            if entry.path_is_symlink() {
                debug!(path = %entry.path().display(), "skipping symlink");
                return false;
            }

            // Files never match
            if !entry.file_type().is_some_and(|ft| ft.is_dir()) {
                return false;
            }

            // Don't descend into a directory that was itself a match
            if entry.depth() >= 2 {
                let parent_name = entry
                    .path()
                    .parent()
                    .and_then(|p| p.file_name())
                    .and_then(|n| n.to_str());
                if parent_name == Some(variant_owned.as_str()) {
                    return false;
                }
            }

            true
        })
        .build();

    let mut matches = Vec::new();

    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                debug!(root = %root.display(), error = %err, "skipping unreadable entry");
                continue;
            }
        };

        if entry.depth() == 0 {
            continue;
        }

        if is_variant_dir(entry.path(), variant) {
            debug!(path = %entry.path().display(), "found variant resource root");
            matches.push(entry.into_path());
        }
    }

    matches
}

fn is_variant_dir(path: &Path, variant: &str) -> bool {
    path.file_name().and_then(|n| n.to_str()) == Some(variant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn relative(root: &Path, found: &[PathBuf]) -> Vec<String> {
        found
            .iter()
            .map(|p| {
                p.strip_prefix(root)
                    .unwrap()
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .collect()
    }

    #[test]
    fn test_missing_root_is_empty() {
        let dir = tempdir().unwrap();
        assert!(locate(&dir.path().join("exploded-aar"), "debug").is_empty());
    }

    #[test]
    fn test_finds_nested_matches_in_name_order() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("com.example/libfoo/debug/res/values")).unwrap();
        fs::create_dir_all(root.join("com.example/libbar/debug")).unwrap();
        fs::create_dir_all(root.join("androidx.core/core/1.9.0/debug")).unwrap();
        fs::create_dir_all(root.join("com.example/libbar/release")).unwrap();

        let found = locate(root, "debug");
        assert_eq!(
            relative(root, &found),
            vec![
                "androidx.core/core/1.9.0/debug",
                "com.example/libbar/debug",
                "com.example/libfoo/debug",
            ]
        );
    }

    #[test]
    fn test_match_is_terminal() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("lib/debug/nested/debug")).unwrap();
        fs::create_dir_all(root.join("lib/debug/debug")).unwrap();

        let found = locate(root, "debug");
        assert_eq!(relative(root, &found), vec!["lib/debug"]);

        for a in &found {
            for b in &found {
                assert!(a == b || !a.starts_with(b));
            }
        }
    }

    #[test]
    fn test_files_are_ignored() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("lib")).unwrap();
        fs::write(root.join("lib/debug"), "not a directory").unwrap();

        assert!(locate(root, "debug").is_empty());
    }

    #[test]
    fn test_root_itself_is_not_a_candidate() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("debug");
        fs::create_dir_all(root.join("lib/debug")).unwrap();

        let found = locate(&root, "debug");
        assert_eq!(relative(&root, &found), vec!["lib/debug"]);
    }

    #[test]
    fn test_empty_variant_matches_nothing() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("lib/debug")).unwrap();
        assert!(locate(dir.path(), "").is_empty());
    }

    #[test]
    fn test_name_must_match_exactly() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("lib/Debug")).unwrap();
        fs::create_dir_all(root.join("lib/debugAndroidTest")).unwrap();

        assert!(locate(root, "debug").is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_variant_dir_is_skipped() {
        use std::os::unix::fs::symlink;

        let dir = tempdir().unwrap();
        let root = dir.path().join("exploded-aar");
        let outside = dir.path().join("outside/debug");
        fs::create_dir_all(&outside).unwrap();
        fs::create_dir_all(root.join("real/debug")).unwrap();
        fs::create_dir_all(root.join("linked")).unwrap();
        symlink(&outside, root.join("linked/debug")).unwrap();
        symlink(dir.path().join("outside"), root.join("alias")).unwrap();

        let found = locate(&root, "debug");
        assert_eq!(relative(&root, &found), vec!["real/debug"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subtree_does_not_abort_scan() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("a_locked/inner/debug")).unwrap();
        fs::create_dir_all(root.join("b_open/debug")).unwrap();
        fs::set_permissions(root.join("a_locked"), fs::Permissions::from_mode(0o000)).unwrap();

        let found = locate(root, "debug");

        fs::set_permissions(root.join("a_locked"), fs::Permissions::from_mode(0o755)).unwrap();
        assert!(relative(root, &found).contains(&"b_open/debug".to_string()));
    }
}
