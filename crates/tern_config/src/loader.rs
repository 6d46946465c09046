//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::Path;

/// Name of the configuration file at the project root.
pub const CONFIG_FILE: &str = "tern.toml";

/// Loads and validates a `tern.toml` configuration from a project directory.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    let content = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
        path: config_path.clone(),
        source,
    })?;
    load_config_from_str(&content)
}

/// Parses and validates a `tern.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name"));
    }
    if config.build.backend.is_empty() {
        return Err(ConfigError::MissingField("build.backend"));
    }
    if config.build.sources.is_empty() {
        return Err(ConfigError::Invalid(
            "build.sources must name at least one source root".to_string(),
        ));
    }
    if config.build.sources.iter().any(|s| s == &config.build.output) {
        return Err(ConfigError::Invalid(format!(
            "output directory '{}' is also a source root",
            config.build.output
        )));
    }
    Ok(())
}
