use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganizerConfig {
    /// Glob patterns for files and directories the scanner never reports.
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    /// Worker threads for duplicate hashing. 0 lets rayon pick.
    #[serde(default)]
    pub hash_workers: usize,
    /// Default byte threshold for the size strategy when the caller gives none.
    #[serde(default)]
    pub size_threshold: Option<u64>,
}

pub fn load_configuration() -> Result<OrganizerConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Organizer").required(false))
        .add_source(Environment::with_prefix("ORGANIZER").separator("__"))
        .build()?;
    builder.try_deserialize::<OrganizerConfig>()
}
