use crate::error::{Error, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// A directory boundary that no resolved path may leave.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Canonicalizes `root`, which must be an existing directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if root.as_os_str().is_empty() {
            return Err(Error::Validation("root path is empty".to_string()));
        }
        let root = fs::canonicalize(root).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Error resolving root {}: {}", root.display(), e),
            ))
        })?;
        if !root.is_dir() {
            return Err(Error::Validation(format!(
                "root is not a directory: {}",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `candidate` against the root and reject anything outside it.
    ///
    /// Relative candidates are joined to the root, absolute ones are taken as-is.
    /// Both are lexically normalized before the containment check, so `..`
    /// segments cannot climb out.
    pub fn resolve(&self, candidate: &str) -> Result<PathBuf> {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return Err(Error::Validation("path is empty".to_string()));
        }
        if candidate.contains('\0') {
            return Err(Error::Validation("path contains NUL byte".to_string()));
        }

        let unified = candidate.replace('\\', "/");
        let raw = Path::new(&unified);
        let joined = if raw.is_absolute() {
            raw.to_path_buf()
        } else {
            self.root.join(raw)
        };

        let resolved = normalize_lexically(&joined).ok_or_else(|| Error::PathViolation {
            path: joined.clone(),
            root: self.root.clone(),
        })?;

        if !self.contains(&resolved) || !self.links_stay_inside(&resolved) {
            return Err(Error::PathViolation {
                path: resolved,
                root: self.root.clone(),
            });
        }
        Ok(resolved)
    }

    /// The deepest part of `path` that exists must canonicalize inside the
    /// root, so a symlink under the root cannot carry writes out of it.
    /// Dangling links count as escapes.
    fn links_stay_inside(&self, path: &Path) -> bool {
        match path
            .ancestors()
            .find(|ancestor| fs::symlink_metadata(ancestor).is_ok())
        {
            Some(existing) => fs::canonicalize(existing)
                .map(|real| self.contains(&real))
                .unwrap_or(false),
            None => false,
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }

    /// Path of `path` relative to the root, if it lies inside.
    pub fn relative<'a>(&self, path: &'a Path) -> Option<&'a Path> {
        path.strip_prefix(&self.root).ok()
    }
}

/// Collapse `.` and `..` without touching the filesystem.
/// Returns `None` when `..` would climb above the filesystem root.
pub fn normalize_lexically(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let has_normal = out
                    .components()
                    .next_back()
                    .is_some_and(|c| matches!(c, Component::Normal(_)));
                if !has_normal {
                    return None;
                }
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    Some(out)
}
