use super::FileEntry;
use crate::engine::CancelToken;
use crate::error::{Error, Result};
use glob::Pattern;
use std::path::Path;
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Compiled glob ignore patterns, matched against full paths.
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    patterns: Vec<Pattern>,
}

impl IgnoreSet {
    pub fn new(globs: &[String]) -> Result<Self> {
        let patterns = globs
            .iter()
            .map(|glob| Pattern::new(glob))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches_path(path))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// List the regular files under `dir`.
///
/// Non-recursive scans return only immediate children. Recursive scans walk
/// depth-first with entries sorted by name, so scan order is stable between
/// runs. Directories and symlinks are never returned and symlinked
/// directories are not descended into. Any unreadable directory or entry
/// aborts the whole scan.
pub fn scan(
    dir: &Path,
    recursive: bool,
    ignore: &IgnoreSet,
    cancel: &CancelToken,
) -> Result<Vec<FileEntry>> {
    let mut walker = WalkDir::new(dir)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    let mut iter = walker.into_iter();
    while let Some(entry) = iter.next() {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let entry = entry?;
        let path = entry.path();

        if !ignore.is_empty() && ignore.matches(path) {
            trace!("Ignoring {}", path.display());
            if entry.file_type().is_dir() {
                iter.skip_current_dir();
            }
            continue;
        }

        if !entry.file_type().is_file() {
            continue;
        }

        let metadata = entry.metadata()?;
        files.push(FileEntry::from_metadata(path, &metadata));
    }

    debug!(
        "Scanned {} files under {} (recursive: {})",
        files.len(),
        dir.display(),
        recursive
    );
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn names(files: &[FileEntry]) -> Vec<String> {
        files.iter().map(|f| f.name.clone()).collect()
    }

    #[test]
    fn test_non_recursive_lists_immediate_files_only() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("a.txt"), "a").unwrap();
        fs::write(tmp.path().join("b.md"), "bb").unwrap();
        fs::create_dir_all(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub").join("c.txt"), "c").unwrap();

        let files = scan(tmp.path(), false, &IgnoreSet::default(), &CancelToken::new()).unwrap();
        assert_eq!(names(&files), vec!["a.txt", "b.md"]);
    }

    #[test]
    fn test_recursive_flattens_all_levels() {
        let tmp = tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("x").join("y")).unwrap();
        fs::write(tmp.path().join("top.txt"), "t").unwrap();
        fs::write(tmp.path().join("x").join("mid.txt"), "m").unwrap();
        fs::write(tmp.path().join("x").join("y").join("deep.txt"), "d").unwrap();

        let files = scan(tmp.path(), true, &IgnoreSet::default(), &CancelToken::new()).unwrap();
        assert_eq!(files.len(), 3);
        assert!(files.iter().all(|f| f.path.is_file()));
        assert_eq!(names(&files), vec!["top.txt", "mid.txt", "deep.txt"]);
    }

    #[test]
    fn test_metadata_is_captured() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("Photo.JPG"), vec![0u8; 42]).unwrap();
        fs::write(tmp.path().join("README"), "r").unwrap();

        let files = scan(tmp.path(), false, &IgnoreSet::default(), &CancelToken::new()).unwrap();
        let photo = files.iter().find(|f| f.name == "Photo.JPG").unwrap();
        assert_eq!(photo.size, 42);
        assert_eq!(photo.extension, "jpg");
        assert!(photo.modified_at.is_some());
        let readme = files.iter().find(|f| f.name == "README").unwrap();
        assert_eq!(readme.extension, "");
    }

    #[test]
    fn test_ignore_patterns_prune_directories() {
        let tmp = tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("node_modules")).unwrap();
        fs::write(tmp.path().join("node_modules").join("dep.js"), "x").unwrap();
        fs::write(tmp.path().join("keep.js"), "y").unwrap();

        let ignore = IgnoreSet::new(&["**/node_modules".to_string()]).unwrap();
        let files = scan(tmp.path(), true, &ignore, &CancelToken::new()).unwrap();
        assert_eq!(names(&files), vec!["keep.js"]);
    }

    #[test]
    fn test_missing_directory_aborts() {
        let tmp = tempdir().unwrap();
        let result = scan(
            &tmp.path().join("gone"),
            true,
            &IgnoreSet::default(),
            &CancelToken::new(),
        );
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_cancelled_scan_stops() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("a.txt"), "a").unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = scan(tmp.path(), false, &IgnoreSet::default(), &cancel);
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_skipped() {
        let tmp = tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("real")).unwrap();
        fs::write(tmp.path().join("real").join("f.txt"), "f").unwrap();
        std::os::unix::fs::symlink(tmp.path().join("real"), tmp.path().join("link")).unwrap();
        std::os::unix::fs::symlink(
            tmp.path().join("real").join("f.txt"),
            tmp.path().join("flink.txt"),
        )
        .unwrap();

        let files = scan(tmp.path(), true, &IgnoreSet::default(), &CancelToken::new()).unwrap();
        assert_eq!(names(&files), vec!["f.txt"]);
    }
}
