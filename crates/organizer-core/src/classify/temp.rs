use super::{plan_moves, TEMP_REVIEW_DIR};
use crate::actions::OrganizePlan;
use crate::sandbox::Sandbox;
use crate::scanner::FileEntry;

const TEMP_EXTENSIONS: &[&str] = &[
    "tmp",
    "temp",
    "bak",
    "old",
    "log",
    "swp",
    "swo",
    "dmp",
    "cache",
    "ds_store",
    "thumbs.db",
    "crdownload",
    "part",
    "tempfile",
];

const TEMP_PREFIXES: &[&str] = &["~$", "~"];

/// A name is temporary when, lowercased, it ends with `.<ext>` or is exactly
/// `<ext>` for a known temp extension, or starts with a lock-file prefix.
pub fn is_temp_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    let by_extension = TEMP_EXTENSIONS.iter().any(|ext| {
        lower == *ext
            || lower
                .strip_suffix(ext)
                .is_some_and(|rest| rest.ends_with('.'))
    });
    by_extension || TEMP_PREFIXES.iter().any(|prefix| lower.starts_with(prefix))
}

/// Temp files go to `<root>/_temp_files_to_review/<name>`.
pub fn plan(files: &[FileEntry], sandbox: &Sandbox) -> OrganizePlan {
    let review = sandbox.root().join(TEMP_REVIEW_DIR);
    plan_moves(files, |file| is_temp_name(&file.name).then(|| review.clone()))
}
