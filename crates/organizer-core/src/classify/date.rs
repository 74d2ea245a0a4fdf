//! Date organizing runs as two named stages.
//!
//! `Flatten` (recursive runs only) pulls every file below the root up into
//! the root and removes the emptied folders. This destroys the original
//! folder structure. `Bucket` then moves each top-level file into a
//! `YYYY-MM` folder.

use super::{plan_moves, DestinationAllocator};
use crate::actions::{ActionDescriptor, OrganizePlan};
use crate::sandbox::Sandbox;
use crate::scanner::FileEntry;
use chrono::{DateTime, Local, Utc};
use std::fs;
use std::path::Path;
use tracing::{debug, trace};
use walkdir::WalkDir;

pub const UNKNOWN_DATE_DIR: &str = "unknown_date";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStage {
    Flatten,
    Bucket,
}

impl DateStage {
    pub fn name(self) -> &'static str {
        match self {
            DateStage::Flatten => "flatten",
            DateStage::Bucket => "bucket",
        }
    }
}

/// `YYYY-MM` in local time, from the modify time or else the create time.
pub fn month_bucket(file: &FileEntry) -> String {
    file.modified_at
        .or(file.created_at)
        .map(|ts: DateTime<Utc>| ts.with_timezone(&Local).format("%Y-%m").to_string())
        .unwrap_or_else(|| UNKNOWN_DATE_DIR.to_string())
}

/// Stage one: move every nested file up to the root, suffixing on collision.
pub fn flatten_plan(files: &[FileEntry], sandbox: &Sandbox) -> OrganizePlan {
    let root = sandbox.root();
    let mut allocator = DestinationAllocator::new();

    files
        .iter()
        .filter(|file| file.parent() != Some(root))
        .map(|file| ActionDescriptor::move_to(&file.path, allocator.allocate(root, &file.name)))
        .collect()
}

/// Remove empty directories under `root`, deepest first. Directories that
/// are not empty, or cannot be removed, are left in place. Returns how many
/// were removed.
pub fn remove_empty_dirs(root: &Path) -> usize {
    let mut removed = 0;
    let dirs = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .contents_first(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .collect::<Vec<_>>();

    for dir in dirs {
        match fs::remove_dir(dir.path()) {
            Ok(()) => {
                trace!("Removed empty directory {}", dir.path().display());
                removed += 1;
            }
            Err(e) => trace!("Keeping {}: {}", dir.path().display(), e),
        }
    }

    debug!("Removed {} empty directories under {}", removed, root.display());
    removed
}

/// Stage two: `<root>/<YYYY-MM>/<name>` for each file.
pub fn bucket_plan(files: &[FileEntry], sandbox: &Sandbox) -> OrganizePlan {
    plan_moves(files, |file| Some(sandbox.root().join(month_bucket(file))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn entry(
        path: PathBuf,
        modified: Option<DateTime<Utc>>,
        created: Option<DateTime<Utc>>,
    ) -> FileEntry {
        FileEntry {
            name: path.file_name().unwrap().to_string_lossy().into_owned(),
            path,
            size: 1,
            modified_at: modified,
            created_at: created,
            extension: String::new(),
        }
    }

    #[test]
    fn test_month_bucket_prefers_modified() {
        // Mid-month so no time zone can push it into a neighbouring month
        let modified = Utc.with_ymd_and_hms(2023, 4, 15, 12, 0, 0).unwrap();
        let created = Utc.with_ymd_and_hms(2020, 1, 15, 12, 0, 0).unwrap();
        let file = entry(PathBuf::from("/r/a"), Some(modified), Some(created));
        assert_eq!(month_bucket(&file), "2023-04");

        let file = entry(PathBuf::from("/r/a"), None, Some(created));
        assert_eq!(month_bucket(&file), "2020-01");

        let file = entry(PathBuf::from("/r/a"), None, None);
        assert_eq!(month_bucket(&file), UNKNOWN_DATE_DIR);
    }

    #[test]
    fn test_flatten_suffixes_collisions_and_keeps_top_level() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("a.txt"), "top").unwrap();
        let sandbox = Sandbox::new(tmp.path()).unwrap();
        let root = sandbox.root();
        let files = vec![
            entry(root.join("a.txt"), None, None),
            entry(root.join("x").join("a.txt"), None, None),
            entry(root.join("y").join("z").join("a.txt"), None, None),
        ];

        let plan = flatten_plan(&files, &sandbox);
        assert_eq!(
            plan,
            vec![
                ActionDescriptor::move_to(root.join("x").join("a.txt"), root.join("a_1.txt")),
                ActionDescriptor::move_to(
                    root.join("y").join("z").join("a.txt"),
                    root.join("a_2.txt")
                ),
            ]
        );
    }

    #[test]
    fn test_remove_empty_dirs_bottom_up() {
        let tmp = tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("a").join("b").join("c")).unwrap();
        fs::create_dir_all(tmp.path().join("keep")).unwrap();
        fs::write(tmp.path().join("keep").join("file"), "x").unwrap();

        let removed = remove_empty_dirs(tmp.path());
        assert_eq!(removed, 3);
        assert!(!tmp.path().join("a").exists());
        assert!(tmp.path().join("keep").join("file").exists());
        assert!(tmp.path().exists());
    }
}
