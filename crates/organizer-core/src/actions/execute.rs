use super::{ActionDescriptor, ActionResult};
use crate::engine::CancelToken;
use crate::error::{Error, Result};
use crate::progress::{ProgressReporter, SilentReporter};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info};

/// Runs plans one action at a time, in order.
///
/// A failing action is recorded in its own `ActionResult` and never stops the
/// batch: `execute` always returns exactly one result per input action.
pub struct Executor<'a> {
    cancel: &'a CancelToken,
    reporter: &'a dyn ProgressReporter,
}

impl<'a> Executor<'a> {
    pub fn new(cancel: &'a CancelToken, reporter: &'a dyn ProgressReporter) -> Self {
        Self { cancel, reporter }
    }

    pub fn execute(&self, actions: &[ActionDescriptor]) -> Vec<ActionResult> {
        let start = Instant::now();
        self.reporter.on_execute_start(actions.len());

        let mut results = Vec::with_capacity(actions.len());
        let mut succeeded = 0;
        let mut failed = 0;

        for (index, action) in actions.iter().enumerate() {
            let result = if self.cancel.is_cancelled() {
                ActionResult::failed(action.clone(), "cancelled")
            } else {
                match apply(action) {
                    Ok(()) => {
                        debug!("{}", action);
                        ActionResult::ok(action.clone())
                    }
                    Err(e) => {
                        error!("Failed to {}: {}", action, e);
                        ActionResult::failed(action.clone(), e.to_string())
                    }
                }
            };

            if result.success {
                succeeded += 1;
            } else {
                failed += 1;
            }
            self.reporter.on_action_complete(index, &result);
            results.push(result);
        }

        let duration = start.elapsed().as_secs_f64();
        self.reporter.on_execute_complete(succeeded, failed, duration);
        if !actions.is_empty() {
            info!(
                "Plan executed: {} succeeded, {} failed in {:.2}s",
                succeeded, failed, duration
            );
        }
        results
    }
}

/// Execute with no cancellation and no progress reporting.
pub fn execute(actions: &[ActionDescriptor]) -> Vec<ActionResult> {
    let cancel = CancelToken::new();
    Executor::new(&cancel, &SilentReporter).execute(actions)
}

/// Apply a single action to the filesystem.
pub fn apply(action: &ActionDescriptor) -> Result<()> {
    match action {
        ActionDescriptor::Move { src, dest } => {
            let target = dest.target_for(src)?;
            ensure_parent(&target)?;
            refuse_existing(&target)?;
            move_file(src, &target)?;
        }
        ActionDescriptor::Copy { src, dest } => {
            let target = dest.target_for(src)?;
            ensure_parent(&target)?;
            refuse_existing(&target)?;
            fs::copy(src, &target)?;
        }
        ActionDescriptor::Rename { src, new_name } => {
            let parent = src.parent().ok_or_else(|| {
                Error::Validation(format!("source has no parent: {}", src.display()))
            })?;
            let target = parent.join(new_name);
            refuse_existing(&target)?;
            fs::rename(src, &target)?;
        }
        ActionDescriptor::Write { dest, content } => {
            ensure_parent(dest)?;
            fs::write(dest, content)?;
        }
        ActionDescriptor::Modify { src, content } => {
            if !src.is_file() {
                return Err(Error::Io(io::Error::new(
                    ErrorKind::NotFound,
                    format!("file to modify does not exist: {}", src.display()),
                )));
            }
            fs::write(src, content)?;
        }
        ActionDescriptor::Mkdir { dest } => {
            fs::create_dir_all(dest)?;
        }
    }
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn refuse_existing(target: &Path) -> Result<()> {
    if fs::symlink_metadata(target).is_ok() {
        return Err(Error::Io(io::Error::new(
            ErrorKind::AlreadyExists,
            format!("destination already exists: {}", target.display()),
        )));
    }
    Ok(())
}

/// Rename, falling back to copy-then-remove when crossing filesystems.
fn move_file(src: &Path, dest: &Path) -> io::Result<()> {
    match fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(err) if is_cross_device(&err) => {
            debug!(
                "Cross-device move of {}, copying instead",
                src.display()
            );
            copy_then_remove(src, dest, |path| fs::remove_file(path))
        }
        Err(err) => Err(err),
    }
}

/// Copy `src` to `dest`, then remove `src` with `remove`. If the source
/// cannot be removed the copy is deleted again, so a failed move leaves
/// only the source behind.
fn copy_then_remove<F>(src: &Path, dest: &Path, remove: F) -> io::Result<()>
where
    F: FnOnce(&Path) -> io::Result<()>,
{
    fs::copy(src, dest)?;
    if let Err(err) = remove(src) {
        if let Err(cleanup) = fs::remove_file(dest) {
            error!(
                "Failed to roll back copy at {}: {}",
                dest.display(),
                cleanup
            );
        }
        return Err(err);
    }
    Ok(())
}

#[cfg(unix)]
fn is_cross_device(err: &io::Error) -> bool {
    // EXDEV
    err.raw_os_error() == Some(18)
}

#[cfg(windows)]
fn is_cross_device(err: &io::Error) -> bool {
    // ERROR_NOT_SAME_DEVICE
    err.raw_os_error() == Some(17)
}

#[cfg(not(any(unix, windows)))]
fn is_cross_device(_err: &io::Error) -> bool {
    false
}
