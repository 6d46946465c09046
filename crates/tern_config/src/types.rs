//! Configuration types deserialized from `tern.toml`.

use serde::Deserialize;

/// The top-level project configuration parsed from `tern.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata.
    pub project: ProjectMeta,
    /// Where sources are, where outputs and build state go, and which backend compiles.
    #[serde(default)]
    pub build: BuildConfig,
    /// Ordered classpath entries the sources compile against.
    #[serde(default)]
    pub classpath: ClasspathConfig,
}

/// Core project metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// The project version string.
    #[serde(default = "default_version")]
    pub version: String,
}

/// Build layout and backend selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Source root directories, relative to the project directory.
    pub sources: Vec<String>,
    /// Output directory for compiled type files.
    pub output: String,
    /// Directory holding the persisted build state.
    pub state_dir: String,
    /// Name of the compiler backend in the backend registry.
    pub backend: String,
    /// Whether to write a type index into the output directory on commit.
    pub write_output_index: bool,
    /// Whether the backend warns about uses of deprecated types.
    pub deprecation_warnings: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            sources: vec!["src".to_string()],
            output: "target/types".to_string(),
            state_dir: "target/tern".to_string(),
            backend: "decl".to_string(),
            write_output_index: true,
            deprecation_warnings: true,
        }
    }
}

/// The ordered list of classpath entries.
///
/// Order matters: when two entries define the same type, the earlier one wins.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClasspathConfig {
    /// Archive files or directories, relative to the project directory.
    #[serde(default)]
    pub entries: Vec<String>,
}

fn default_version() -> String {
    "0.1.0".to_string()
}
