pub mod actions;
pub mod advisor;
pub mod classify;
pub mod config;
pub mod dupes;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod progress;
pub mod sandbox;
pub mod scanner;

pub use config::OrganizerConfig;
pub use engine::{CancelToken, OrganizeMode, OrganizeOptions, OrganizeReport, Organizer};
pub use error::Error;
pub use progress::{ProgressReporter, SilentReporter};
