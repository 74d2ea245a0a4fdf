use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid ignore pattern: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("Validation error: {0}")]
    Validation(String),

    /// A resolved path left the sandbox root. Never clamped.
    #[error("Path violation: {} escapes {}", path.display(), root.display())]
    PathViolation { path: PathBuf, root: PathBuf },

    #[error("Advisor error: {0}")]
    Advisor(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(|p| p.display().to_string());
        match err.into_io_error() {
            Some(io) => match path {
                Some(path) => Error::Io(std::io::Error::new(
                    io.kind(),
                    format!("Error reading {}: {}", path, io),
                )),
                None => Error::Io(io),
            },
            // walkdir only produces non-IO errors for symlink loops, which we never follow
            None => Error::Validation(format!(
                "Filesystem loop detected at {}",
                path.unwrap_or_default()
            )),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
