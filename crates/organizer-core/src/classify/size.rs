use super::{plan_moves, LARGE_REVIEW_DIR};
use crate::actions::OrganizePlan;
use crate::sandbox::Sandbox;
use crate::scanner::FileEntry;

/// Files strictly larger than `threshold` bytes go to
/// `<root>/_large_files_to_review/<name>`.
pub fn plan(files: &[FileEntry], sandbox: &Sandbox, threshold: u64) -> OrganizePlan {
    let review = sandbox.root().join(LARGE_REVIEW_DIR);
    plan_moves(files, |file| (file.size > threshold).then(|| review.clone()))
}
