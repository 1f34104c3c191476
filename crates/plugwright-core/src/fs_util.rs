//! Filesystem primitives used by the materializer and platform mutators.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Version-control artifacts removed from synced web assets
pub const VCS_ARTIFACTS: &[&str] = &[".git", ".svn", "CVS", ".gitignore", ".hg"];

/// Copy a directory tree. `.git` directories are skipped.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            if entry.file_name() == ".git" {
                continue;
            }
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }

    Ok(())
}

/// Copy the contents of `src` over `dst`, overwriting files that exist in
/// both. Returns the number of files written.
pub fn merge_dir(src: &Path, dst: &Path) -> io::Result<usize> {
    let mut written = 0;
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            written += 1;
        }
    }
    Ok(written)
}

/// Create a directory symlink at `link` pointing to `target`
pub fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    #[cfg(unix)]
    std::os::unix::fs::symlink(target, link)?;

    #[cfg(windows)]
    std::os::windows::fs::symlink_dir(target, link)?;

    Ok(())
}

/// Create a file symlink at `link` pointing to `target`
pub fn symlink_file(target: &Path, link: &Path) -> io::Result<()> {
    #[cfg(unix)]
    std::os::unix::fs::symlink(target, link)?;

    #[cfg(windows)]
    std::os::windows::fs::symlink_file(target, link)?;

    Ok(())
}

/// Remove whatever is at `path` (file, symlink or directory tree).
/// A missing path is not an error.
pub fn remove_path(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path).or_else(|e| {
            // Windows directory symlinks need remove_dir
            if path.is_dir() {
                fs::remove_dir(path)
            } else {
                Err(e)
            }
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Ancestors of `path` below `root` that do not exist yet, outermost first
pub fn missing_ancestors(path: &Path, root: &Path) -> Vec<PathBuf> {
    let mut missing: Vec<PathBuf> = path
        .ancestors()
        .skip(1)
        .take_while(|p| p.starts_with(root) && *p != root)
        .filter(|p| !p.exists())
        .map(Path::to_path_buf)
        .collect();
    missing.reverse();
    missing
}

/// Walk upward from `dir`, removing each directory that is empty. Stops at
/// the first non-empty directory, at anything outside `root`, and at any of
/// `protected` (which are never removed). Returns the removed directories.
pub fn remove_empty_ancestors(dir: &Path, root: &Path, protected: &[PathBuf]) -> Vec<PathBuf> {
    let mut removed = Vec::new();
    let mut current = Some(dir);

    while let Some(d) = current {
        if !d.starts_with(root) || d == root || protected.iter().any(|p| p == d) {
            break;
        }
        let is_empty = fs::read_dir(d).map(|mut it| it.next().is_none()).unwrap_or(false);
        if !is_empty || fs::remove_dir(d).is_err() {
            break;
        }
        removed.push(d.to_path_buf());
        current = d.parent();
    }

    removed
}

/// Remove version-control artifacts anywhere under `dir`.
/// Returns the number of entries removed.
pub fn remove_vcs_artifacts(dir: &Path) -> io::Result<usize> {
    let mut doomed = Vec::new();
    let mut walker = WalkDir::new(dir).min_depth(1).into_iter();
    while let Some(entry) = walker.next() {
        let entry = entry?;
        if is_vcs_artifact(entry.path()) {
            if entry.file_type().is_dir() {
                walker.skip_current_dir();
            }
            doomed.push(entry.into_path());
        }
    }

    for path in &doomed {
        remove_path(path)?;
    }
    Ok(doomed.len())
}

fn is_vcs_artifact(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| VCS_ARTIFACTS.contains(&n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_dir_recursive() {
        let temp = TempDir::new().unwrap();

        let src = temp.path().join("src");
        fs::create_dir_all(src.join("subdir")).unwrap();
        fs::write(src.join("file1.txt"), "content1").unwrap();
        fs::write(src.join("subdir/file2.txt"), "content2").unwrap();

        let dst = temp.path().join("dst");
        copy_dir_recursive(&src, &dst).unwrap();

        assert!(dst.join("file1.txt").exists());
        assert!(dst.join("subdir/file2.txt").exists());
        assert_eq!(
            fs::read_to_string(dst.join("file1.txt")).unwrap(),
            "content1"
        );
    }

    #[test]
    fn test_copy_dir_skips_git() {
        let temp = TempDir::new().unwrap();

        let src = temp.path().join("src");
        fs::create_dir_all(src.join(".git")).unwrap();
        fs::write(src.join(".git/config"), "git config").unwrap();
        fs::write(src.join("file.txt"), "content").unwrap();

        let dst = temp.path().join("dst");
        copy_dir_recursive(&src, &dst).unwrap();

        assert!(!dst.join(".git").exists());
        assert!(dst.join("file.txt").exists());
    }

    #[test]
    fn test_merge_dir_overwrites() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        fs::create_dir_all(src.join("css")).unwrap();
        fs::create_dir_all(&dst).unwrap();
        fs::write(src.join("css/app.css"), "override").unwrap();
        fs::write(dst.join("index.html"), "keep").unwrap();

        assert_eq!(merge_dir(&src, &dst).unwrap(), 1);
        assert_eq!(fs::read_to_string(dst.join("css/app.css")).unwrap(), "override");
        assert_eq!(fs::read_to_string(dst.join("index.html")).unwrap(), "keep");
    }

    #[test]
    fn test_missing_ancestors() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("src")).unwrap();

        let file = root.join("src/org/example/Foo.java");
        let missing = missing_ancestors(&file, root);
        assert_eq!(
            missing,
            vec![root.join("src/org"), root.join("src/org/example")]
        );
    }

    #[test]
    fn test_remove_empty_ancestors_stops_at_protected() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("src/org/example")).unwrap();
        fs::create_dir_all(root.join("src/com")).unwrap();

        let removed =
            remove_empty_ancestors(&root.join("src/org/example"), root, &[root.join("src")]);
        assert_eq!(
            removed,
            vec![root.join("src/org/example"), root.join("src/org")]
        );
        assert!(root.join("src").exists());
        assert!(root.join("src/com").exists());
    }

    #[test]
    fn test_remove_empty_ancestors_keeps_non_empty() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::write(root.join("a/sibling.txt"), "x").unwrap();

        let removed = remove_empty_ancestors(&root.join("a/b"), root, &[]);
        assert_eq!(removed, vec![root.join("a/b")]);
        assert!(root.join("a").exists());
    }

    #[test]
    fn test_remove_vcs_artifacts() {
        let temp = TempDir::new().unwrap();
        let www = temp.path();
        fs::create_dir_all(www.join(".git/objects")).unwrap();
        fs::create_dir_all(www.join("js/.svn")).unwrap();
        fs::write(www.join("js/.gitignore"), "*").unwrap();
        fs::write(www.join("js/app.js"), "x").unwrap();

        assert_eq!(remove_vcs_artifacts(www).unwrap(), 3);
        assert!(!www.join(".git").exists());
        assert!(!www.join("js/.svn").exists());
        assert!(!www.join("js/.gitignore").exists());
        assert!(www.join("js/app.js").exists());
    }

    #[test]
    fn test_remove_path_missing_is_ok() {
        let temp = TempDir::new().unwrap();
        remove_path(&temp.path().join("nothing")).unwrap();
    }
}
