use super::{ActionDescriptor, Destination};
use crate::error::Error;
use crate::sandbox::Sandbox;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const MIN_DEST_LEN: usize = 3;

/// Wire shape of an advisor action. Only these kinds decode; everything
/// else, `delete` included, is rejected before this type is reached.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RawAction {
    Move {
        src: String,
        dest: String,
    },
    Copy {
        src: String,
        dest: String,
    },
    Rename {
        src: String,
        #[serde(rename = "newName", alias = "new_name")]
        new_name: String,
    },
    Write {
        dest: String,
        #[serde(default)]
        content: String,
    },
    Modify {
        src: String,
        content: String,
    },
    Mkdir {
        dest: String,
    },
}

const SUPPORTED_KINDS: &[&str] = &["move", "copy", "rename", "write", "modify", "mkdir"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("policy forbids '{0}' actions")]
    PolicyRejection(String),
    #[error("unsupported type: {0}")]
    UnsupportedType(String),
    #[error("malformed action: {0}")]
    Malformed(String),
    #[error("{0}")]
    PathViolation(String),
    #[error("source is not a known file: {}", .0.display())]
    UnknownSource(PathBuf),
    #[error("destination is too short: {0}")]
    DestinationTooShort(String),
    #[error("invalid new name: {0}")]
    InvalidName(String),
}

impl Serialize for RejectReason {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// A dropped action: its position in the raw list and why.
#[derive(Debug, Clone, Serialize)]
pub struct Rejection {
    pub index: usize,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Validation {
    pub accepted: Vec<ActionDescriptor>,
    pub rejected: Vec<Rejection>,
}

impl Validation {
    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }

    pub fn nothing_to_execute(&self) -> bool {
        self.accepted.is_empty()
    }
}

/// Filter an untrusted action list down to well-formed, sandboxed actions
/// whose sources are in `known`.
///
/// Never fails as a whole: each bad action is dropped and recorded in
/// `rejected`, and order of the accepted subset follows the input.
pub fn validate(raw: &[Value], known: &HashSet<PathBuf>, sandbox: &Sandbox) -> Validation {
    let mut validation = Validation::default();

    for (index, value) in raw.iter().enumerate() {
        match validate_one(value, known, sandbox) {
            Ok(action) => {
                debug!("Accepted action #{}: {}", index, action);
                validation.accepted.push(action);
            }
            Err(reason) => {
                warn!("Rejected action #{}: {}", index, reason);
                validation.rejected.push(Rejection { index, reason });
            }
        }
    }

    validation
}

fn validate_one(
    value: &Value,
    known: &HashSet<PathBuf>,
    sandbox: &Sandbox,
) -> Result<ActionDescriptor, RejectReason> {
    let object = value
        .as_object()
        .ok_or_else(|| RejectReason::Malformed("action is not an object".to_string()))?;

    let kind = match object.get("type") {
        Some(Value::String(kind)) => kind.as_str(),
        Some(_) => return Err(RejectReason::Malformed("type is not a string".to_string())),
        None => return Err(RejectReason::UnsupportedType("<missing>".to_string())),
    };

    if kind.trim().eq_ignore_ascii_case("delete") {
        return Err(RejectReason::PolicyRejection(kind.to_string()));
    }
    if !SUPPORTED_KINDS.contains(&kind) {
        return Err(RejectReason::UnsupportedType(kind.to_string()));
    }

    let action: RawAction = serde_json::from_value(value.clone())
        .map_err(|e| RejectReason::Malformed(e.to_string()))?;

    match action {
        RawAction::Move { src, dest } => Ok(ActionDescriptor::Move {
            src: known_source(&src, known, sandbox)?,
            dest: destination(&dest, sandbox)?,
        }),
        RawAction::Copy { src, dest } => Ok(ActionDescriptor::Copy {
            src: known_source(&src, known, sandbox)?,
            dest: destination(&dest, sandbox)?,
        }),
        RawAction::Rename { src, new_name } => {
            let src = known_source(&src, known, sandbox)?;
            let new_name = single_component(&new_name)?;
            Ok(ActionDescriptor::Rename { src, new_name })
        }
        RawAction::Write { dest, content } => Ok(ActionDescriptor::Write {
            dest: dest_path(&dest, sandbox)?,
            content,
        }),
        RawAction::Modify { src, content } => Ok(ActionDescriptor::Modify {
            src: known_source(&src, known, sandbox)?,
            content,
        }),
        RawAction::Mkdir { dest } => Ok(ActionDescriptor::Mkdir {
            dest: dest_path(&dest, sandbox)?,
        }),
    }
}

fn resolve(candidate: &str, sandbox: &Sandbox) -> Result<PathBuf, RejectReason> {
    sandbox.resolve(candidate).map_err(|e| match e {
        Error::PathViolation { .. } => RejectReason::PathViolation(e.to_string()),
        other => RejectReason::Malformed(other.to_string()),
    })
}

fn known_source(
    src: &str,
    known: &HashSet<PathBuf>,
    sandbox: &Sandbox,
) -> Result<PathBuf, RejectReason> {
    let path = resolve(src, sandbox)?;
    if !known.contains(&path) {
        return Err(RejectReason::UnknownSource(path));
    }
    Ok(path)
}

fn dest_path(dest: &str, sandbox: &Sandbox) -> Result<PathBuf, RejectReason> {
    let path = resolve(dest, sandbox)?;
    if path.as_os_str().len() < MIN_DEST_LEN {
        return Err(RejectReason::DestinationTooShort(dest.to_string()));
    }
    Ok(path)
}

fn destination(dest: &str, sandbox: &Sandbox) -> Result<Destination, RejectReason> {
    let path = dest_path(dest, sandbox)?;
    if dest.trim_end().ends_with(['/', '\\']) {
        Ok(Destination::Into(path))
    } else {
        Ok(Destination::Path(path))
    }
}

fn single_component(name: &str) -> Result<String, RejectReason> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(['/', '\\', '\0'])
        || Path::new(trimmed).is_absolute()
    {
        return Err(RejectReason::InvalidName(name.to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, Sandbox, HashSet<PathBuf>) {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("a.txt"), "a").unwrap();
        let sandbox = Sandbox::new(tmp.path()).unwrap();
        let known = HashSet::from([sandbox.root().join("a.txt")]);
        (tmp, sandbox, known)
    }

    #[test]
    fn test_delete_is_never_accepted() {
        let (_tmp, sandbox, known) = setup();
        let raw = vec![
            json!({"type": "delete", "src": "a.txt"}),
            json!({"type": "DELETE", "src": "a.txt"}),
            json!({"type": "delete"}),
            json!({"type": "delete", "src": 42, "extra": [1, 2]}),
        ];
        let validation = validate(&raw, &known, &sandbox);
        assert!(validation.accepted.is_empty());
        assert!(validation.nothing_to_execute());
        assert_eq!(validation.rejected_count(), 4);
        assert!(validation
            .rejected
            .iter()
            .all(|r| matches!(r.reason, RejectReason::PolicyRejection(_))));
    }

    #[test]
    fn test_relative_paths_are_resolved_against_root() {
        let (_tmp, sandbox, known) = setup();
        let raw = vec![json!({"type": "move", "src": "a.txt", "dest": "docs/"})];
        let validation = validate(&raw, &known, &sandbox);
        assert_eq!(
            validation.accepted,
            vec![ActionDescriptor::Move {
                src: sandbox.root().join("a.txt"),
                dest: Destination::Into(sandbox.root().join("docs")),
            }]
        );
    }

    #[test]
    fn test_unknown_source_is_rejected() {
        let (_tmp, sandbox, known) = setup();
        let raw = vec![json!({"type": "copy", "src": "b.txt", "dest": "c.txt"})];
        let validation = validate(&raw, &known, &sandbox);
        assert!(validation.accepted.is_empty());
        assert!(matches!(
            validation.rejected[0].reason,
            RejectReason::UnknownSource(_)
        ));
    }

    #[test]
    fn test_escaping_destination_is_rejected() {
        let (_tmp, sandbox, known) = setup();
        let raw = vec![
            json!({"type": "move", "src": "a.txt", "dest": "../../etc/a.txt"}),
            json!({"type": "write", "dest": "/etc/cron.d/evil", "content": "x"}),
            json!({"type": "mkdir", "dest": "../outside"}),
        ];
        let validation = validate(&raw, &known, &sandbox);
        assert!(validation.accepted.is_empty());
        assert!(validation
            .rejected
            .iter()
            .all(|r| matches!(r.reason, RejectReason::PathViolation(_))));
    }

    #[test]
    fn test_missing_fields_and_wrong_types_are_malformed() {
        let (_tmp, sandbox, known) = setup();
        let raw = vec![
            json!({"type": "move", "src": "a.txt"}),
            json!({"type": "modify", "src": "a.txt"}),
            json!({"type": "modify", "src": "a.txt", "content": 7}),
            json!({"type": "rename", "src": "a.txt"}),
            json!("move a.txt somewhere"),
            json!({"type": 3}),
        ];
        let validation = validate(&raw, &known, &sandbox);
        assert!(validation.accepted.is_empty());
        assert!(validation
            .rejected
            .iter()
            .all(|r| matches!(r.reason, RejectReason::Malformed(_))));
    }

    #[test]
    fn test_unsupported_type() {
        let (_tmp, sandbox, known) = setup();
        let raw = vec![
            json!({"type": "chmod", "src": "a.txt"}),
            json!({"src": "a.txt", "dest": "b.txt"}),
        ];
        let validation = validate(&raw, &known, &sandbox);
        assert_eq!(validation.rejected_count(), 2);
        assert_eq!(
            validation.rejected[0].reason.to_string(),
            "unsupported type: chmod"
        );
    }

    #[test]
    fn test_rename_requires_single_component() {
        let (_tmp, sandbox, known) = setup();
        let raw = vec![
            json!({"type": "rename", "src": "a.txt", "newName": "../escape.txt"}),
            json!({"type": "rename", "src": "a.txt", "newName": ""}),
            json!({"type": "rename", "src": "a.txt", "newName": ".."}),
            json!({"type": "rename", "src": "a.txt", "new_name": "b.txt"}),
        ];
        let validation = validate(&raw, &known, &sandbox);
        assert_eq!(validation.rejected_count(), 3);
        assert_eq!(
            validation.accepted,
            vec![ActionDescriptor::Rename {
                src: sandbox.root().join("a.txt"),
                new_name: "b.txt".to_string(),
            }]
        );
    }

    #[test]
    fn test_write_content_defaults_to_empty() {
        let (_tmp, sandbox, known) = setup();
        let raw = vec![json!({"type": "write", "dest": "notes/readme.md"})];
        let validation = validate(&raw, &known, &sandbox);
        assert_eq!(
            validation.accepted,
            vec![ActionDescriptor::Write {
                dest: sandbox.root().join("notes").join("readme.md"),
                content: String::new(),
            }]
        );
    }

    #[test]
    fn test_extra_fields_are_tolerated() {
        let (_tmp, sandbox, known) = setup();
        let raw = vec![json!({
            "type": "mkdir",
            "dest": "archive",
            "reason": "group old files"
        })];
        let validation = validate(&raw, &known, &sandbox);
        assert_eq!(validation.accepted.len(), 1);
    }

    #[test]
    fn test_mixed_batch_keeps_only_valid_move() {
        let (_tmp, sandbox, known) = setup();
        let raw = vec![
            json!({"type": "move", "src": "a.txt", "dest": "text/a.txt"}),
            json!({"type": "delete", "src": "a.txt"}),
            json!({"type": "move", "src": "nope.txt", "dest": "text/nope.txt"}),
        ];
        let validation = validate(&raw, &known, &sandbox);
        assert_eq!(validation.accepted.len(), 1);
        assert_eq!(validation.rejected_count(), 2);
        assert_eq!(validation.rejected[0].index, 1);
        assert_eq!(validation.rejected[1].index, 2);
    }
}
