pub mod execute;
pub mod validate;

pub use execute::{execute, Executor};
pub use validate::{validate, RejectReason, Rejection, Validation};

use crate::error::{Error, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};

/// An ordered list of actions; executed in sequence order, never reordered.
pub type OrganizePlan = Vec<ActionDescriptor>;

/// Where a move or copy lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// The exact target path.
    Path(PathBuf),
    /// A directory; the source's base name is appended at execution time.
    Into(PathBuf),
}

impl Destination {
    pub fn target_for(&self, src: &Path) -> Result<PathBuf> {
        match self {
            Destination::Path(path) => Ok(path.clone()),
            Destination::Into(dir) => {
                let name = src.file_name().ok_or_else(|| {
                    Error::Validation(format!("source has no file name: {}", src.display()))
                })?;
                Ok(dir.join(name))
            }
        }
    }
}

impl Serialize for Destination {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Destination::Path(path) => serializer.collect_str(&path.display()),
            Destination::Into(dir) => serializer.collect_str(&format_args!(
                "{}{}",
                dir.display(),
                std::path::MAIN_SEPARATOR
            )),
        }
    }
}

/// One unit of filesystem mutation. All paths are absolute and sandboxed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ActionDescriptor {
    Move {
        src: PathBuf,
        dest: Destination,
    },
    Copy {
        src: PathBuf,
        dest: Destination,
    },
    Rename {
        src: PathBuf,
        #[serde(rename = "newName")]
        new_name: String,
    },
    Write {
        dest: PathBuf,
        content: String,
    },
    Modify {
        src: PathBuf,
        content: String,
    },
    Mkdir {
        dest: PathBuf,
    },
}

impl ActionDescriptor {
    pub fn move_to(src: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        ActionDescriptor::Move {
            src: src.into(),
            dest: Destination::Path(dest.into()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ActionDescriptor::Move { .. } => "move",
            ActionDescriptor::Copy { .. } => "copy",
            ActionDescriptor::Rename { .. } => "rename",
            ActionDescriptor::Write { .. } => "write",
            ActionDescriptor::Modify { .. } => "modify",
            ActionDescriptor::Mkdir { .. } => "mkdir",
        }
    }
}

impl fmt::Display for ActionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionDescriptor::Move { src, dest } | ActionDescriptor::Copy { src, dest } => {
                let dest = match dest {
                    Destination::Path(p) | Destination::Into(p) => p,
                };
                write!(f, "{} {} -> {}", self.kind(), src.display(), dest.display())
            }
            ActionDescriptor::Rename { src, new_name } => {
                write!(f, "rename {} -> {}", src.display(), new_name)
            }
            ActionDescriptor::Write { dest, content } => {
                write!(f, "write {} ({} bytes)", dest.display(), content.len())
            }
            ActionDescriptor::Modify { src, content } => {
                write!(f, "modify {} ({} bytes)", src.display(), content.len())
            }
            ActionDescriptor::Mkdir { dest } => write!(f, "mkdir {}", dest.display()),
        }
    }
}

/// Outcome of one executed action, in plan order.
#[derive(Debug, Clone, Serialize)]
pub struct ActionResult {
    pub action: ActionDescriptor,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    pub fn ok(action: ActionDescriptor) -> Self {
        Self {
            action,
            success: true,
            error: None,
        }
    }

    pub fn failed(action: ActionDescriptor, error: impl Into<String>) -> Self {
        Self {
            action,
            success: false,
            error: Some(error.into()),
        }
    }
}
