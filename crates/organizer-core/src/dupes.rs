use crate::actions::{ActionDescriptor, OrganizePlan};
use crate::classify::naming::{split_name, DestinationAllocator};
use crate::classify::DUPLICATE_REVIEW_DIR;
use crate::engine::CancelToken;
use crate::error::{Error, Result};
use crate::hasher;
use crate::progress::ProgressReporter;
use crate::sandbox::Sandbox;
use crate::scanner::FileEntry;
use dashmap::DashMap;
use rayon::prelude::*;
use rayon::ThreadPool;
use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;
use std::io;
use std::path::{Component, Path};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

/// Files with identical size and content. `original` is the member seen
/// first in scan order.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup {
    pub original: FileEntry,
    pub duplicates: Vec<FileEntry>,
    pub size: u64,
    pub digest: String,
}

impl DuplicateGroup {
    pub fn file_count(&self) -> usize {
        self.duplicates.len() + 1
    }

    pub fn wasted_bytes(&self) -> u64 {
        self.size * self.duplicates.len() as u64
    }
}

/// Bounded rayon pool for hashing. `workers == 0` lets rayon decide.
pub fn build_pool(workers: usize) -> Result<ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("organizer-hash-{}", i))
        .build()
        .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::Other, e.to_string())))
}

/// Two-phase duplicate search.
///
/// 1. Bucket by exact byte size and drop buckets of one (and empty files).
/// 2. Within each bucket, split on a 1KB pre-hash, then group the survivors
///    by full BLAKE3 digest.
///
/// Files that cannot be read are dropped with a warning. Group order and
/// member order follow scan order regardless of how the pool schedules work.
pub fn find_duplicates(
    files: &[FileEntry],
    pool: &ThreadPool,
    cancel: &CancelToken,
    reporter: &dyn ProgressReporter,
) -> Result<Vec<DuplicateGroup>> {
    let groups = pool.install(|| {
        let buckets = size_buckets(files);
        let candidates: usize = buckets.iter().map(Vec::len).sum();
        debug!(
            "{} size buckets with {} candidate files",
            buckets.len(),
            candidates
        );
        reporter.on_hash_start(candidates);

        let hashed = AtomicUsize::new(0);
        buckets
            .par_iter()
            .map(|bucket| hash_bucket(files, bucket, cancel, reporter, &hashed, candidates))
            .collect::<Vec<_>>()
    });

    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    Ok(groups
        .into_iter()
        .flatten()
        .filter_map(|(digest, members)| {
            let (&first, rest) = members.split_first()?;
            Some(DuplicateGroup {
                original: files[first].clone(),
                duplicates: rest.iter().map(|&i| files[i].clone()).collect(),
                size: files[first].size,
                digest,
            })
        })
        .collect())
}

/// Indices of same-size files, buckets ordered by their first member.
fn size_buckets(files: &[FileEntry]) -> Vec<Vec<usize>> {
    let map: DashMap<u64, Vec<usize>> = DashMap::new();
    files
        .par_iter()
        .enumerate()
        .filter(|(_, file)| file.size > 0)
        .for_each(|(i, file)| map.entry(file.size).or_default().push(i));

    let mut buckets: Vec<Vec<usize>> = map
        .into_iter()
        .map(|(_, mut members)| {
            members.sort_unstable();
            members
        })
        .filter(|members| members.len() > 1)
        .collect();
    buckets.sort_unstable_by_key(|members| members[0]);
    buckets
}

fn hash_bucket(
    files: &[FileEntry],
    bucket: &[usize],
    cancel: &CancelToken,
    reporter: &dyn ProgressReporter,
    hashed: &AtomicUsize,
    total: usize,
) -> Vec<(String, Vec<usize>)> {
    let partials = bucket
        .par_iter()
        .filter_map(|&i| {
            if cancel.is_cancelled() {
                return None;
            }
            keyed(i, hasher::partial_hash(&files[i].path), &files[i])
        })
        .collect::<Vec<_>>();

    let survivors: Vec<usize> = group_in_order(partials)
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .flat_map(|(_, members)| members)
        .collect();

    // Files settled by the pre-hash still count toward the candidate total
    let settled = bucket.len() - survivors.len();
    if settled > 0 {
        let done = hashed.fetch_add(settled, Ordering::Relaxed) + settled;
        reporter.on_hash_progress(done, total);
    }

    let digests = survivors
        .par_iter()
        .filter_map(|&i| {
            if cancel.is_cancelled() {
                return None;
            }
            let digest = keyed(i, hasher::content_digest(&files[i].path), &files[i]);
            let done = hashed.fetch_add(1, Ordering::Relaxed) + 1;
            reporter.on_hash_progress(done, total);
            digest
        })
        .collect::<Vec<_>>();

    group_in_order(digests)
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .collect()
}

fn keyed<K>(index: usize, hash: io::Result<K>, file: &FileEntry) -> Option<(usize, K)> {
    match hash {
        Ok(key) => Some((index, key)),
        Err(e) => {
            warn!("Skipping unreadable file '{}': {}", file.path.display(), e);
            None
        }
    }
}

/// Group `(index, key)` pairs by key, keeping first-seen order for both
/// groups and members.
fn group_in_order<K: Eq + Hash + Clone>(items: Vec<(usize, K)>) -> Vec<(K, Vec<usize>)> {
    let mut positions: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<usize>)> = Vec::new();
    for (index, key) in items {
        match positions.get(&key) {
            Some(&pos) => groups[pos].1.push(index),
            None => {
                positions.insert(key.clone(), groups.len());
                groups.push((key, vec![index]));
            }
        }
    }
    groups
}

/// Keep each original in place and move the rest into
/// `<root>/_duplicates_to_review/`.
///
/// Names become `<stem>_duplicate<N>.<ext>`. Recursive runs prefix the
/// duplicate's folder relative to the root with separators turned into `_`,
/// so same-named files from different folders stay apart.
pub fn disposition_plan(
    groups: &[DuplicateGroup],
    sandbox: &Sandbox,
    recursive: bool,
) -> OrganizePlan {
    let review = sandbox.root().join(DUPLICATE_REVIEW_DIR);
    let mut allocator = DestinationAllocator::new();
    let mut plan = OrganizePlan::new();

    for group in groups {
        for (n, duplicate) in group.duplicates.iter().enumerate() {
            let mut name = duplicate_name(&duplicate.name, n + 1);
            if recursive {
                if let Some(prefix) = folder_prefix(sandbox, &duplicate.path) {
                    name = format!("{prefix}_{name}");
                }
            }
            let dest = allocator.allocate(&review, &name);
            plan.push(ActionDescriptor::move_to(&duplicate.path, dest));
        }
    }

    plan
}

/// True for files already parked in the duplicates review folder.
pub fn in_review_dir(sandbox: &Sandbox, path: &Path) -> bool {
    path.starts_with(sandbox.root().join(DUPLICATE_REVIEW_DIR))
}

fn duplicate_name(name: &str, n: usize) -> String {
    match split_name(name) {
        (stem, Some(ext)) => format!("{stem}_duplicate{n}.{ext}"),
        (stem, None) => format!("{stem}_duplicate{n}"),
    }
}

fn folder_prefix(sandbox: &Sandbox, path: &Path) -> Option<String> {
    let parent = sandbox.relative(path.parent()?)?;
    let parts: Vec<String> = parent
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    (!parts.is_empty()).then(|| parts.join("_"))
}
