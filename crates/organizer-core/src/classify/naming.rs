use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Hands out destinations that collide neither with each other nor with
/// anything already on disk. Collisions get `_1`, `_2`, ... before the
/// extension.
#[derive(Debug, Default)]
pub struct DestinationAllocator {
    reserved: HashSet<PathBuf>,
}

impl DestinationAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, dir: &Path, name: &str) -> PathBuf {
        let mut candidate = dir.join(name);
        let mut n = 0;
        while self.is_taken(&candidate) {
            n += 1;
            candidate = dir.join(suffixed_name(name, n));
        }
        self.reserved.insert(candidate.clone());
        candidate
    }

    fn is_taken(&self, path: &Path) -> bool {
        self.reserved.contains(path) || fs::symlink_metadata(path).is_ok()
    }
}

/// `report.pdf` + 2 -> `report_2.pdf`; `README` + 1 -> `README_1`.
pub fn suffixed_name(name: &str, n: usize) -> String {
    let (stem, extension) = split_name(name);
    match extension {
        Some(ext) => format!("{stem}_{n}.{ext}"),
        None => format!("{stem}_{n}"),
    }
}

/// Split on the last dot, keeping dotfiles like `.bashrc` whole.
pub fn split_name(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(0) | None => (name, None),
        Some(idx) if idx == name.len() - 1 => (name, None),
        Some(idx) => (&name[..idx], Some(&name[idx + 1..])),
    }
}
