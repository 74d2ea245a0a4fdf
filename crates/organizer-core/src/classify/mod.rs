pub mod date;
pub mod extension;
pub mod naming;
pub mod size;
pub mod temp;

pub use naming::DestinationAllocator;

use crate::actions::{ActionDescriptor, OrganizePlan};
use crate::scanner::FileEntry;
use std::path::PathBuf;

pub const TEMP_REVIEW_DIR: &str = "_temp_files_to_review";
pub const LARGE_REVIEW_DIR: &str = "_large_files_to_review";
pub const DUPLICATE_REVIEW_DIR: &str = "_duplicates_to_review";

/// Build a move plan from a per-file target directory.
///
/// Files mapped to `None`, or already sitting in their target directory,
/// are left alone, which keeps re-runs from shuffling organized files.
pub(crate) fn plan_moves<F>(files: &[FileEntry], mut target_dir: F) -> OrganizePlan
where
    F: FnMut(&FileEntry) -> Option<PathBuf>,
{
    let mut allocator = DestinationAllocator::new();
    let mut plan = OrganizePlan::new();

    for file in files {
        let Some(dir) = target_dir(file) else {
            continue;
        };
        if file.parent() == Some(dir.as_path()) {
            continue;
        }
        let dest = allocator.allocate(&dir, &file.name);
        plan.push(ActionDescriptor::move_to(&file.path, dest));
    }

    plan
}
