use super::plan_moves;
use crate::actions::OrganizePlan;
use crate::sandbox::Sandbox;
use crate::scanner::FileEntry;

pub const NO_EXTENSION_DIR: &str = "no_extension";

/// `<root>/<extension>/<name>`, or `<root>/no_extension/<name>`.
pub fn plan(files: &[FileEntry], sandbox: &Sandbox) -> OrganizePlan {
    plan_moves(files, |file| {
        let folder = if file.extension.is_empty() {
            NO_EXTENSION_DIR
        } else {
            file.extension.as_str()
        };
        Some(sandbox.root().join(folder))
    })
}
