//! Inputs of one build.

use std::path::PathBuf;

/// Where a build reads from and writes to.
#[derive(Clone, Debug)]
pub struct BuildSettings {
    /// Source files to compile, one unit each.
    pub sources: Vec<PathBuf>,
    /// Ordered classpath entries.
    pub classpath: Vec<PathBuf>,
    /// Output directory for type files.
    pub output_dir: PathBuf,
    /// Directory holding the build state.
    pub state_dir: PathBuf,
    /// Whether to write a type index into the output directory.
    pub write_output_index: bool,
}

impl BuildSettings {
    /// Settings with no sources or classpath.
    pub fn new(output_dir: impl Into<PathBuf>, state_dir: impl Into<PathBuf>) -> Self {
        Self {
            sources: Vec::new(),
            classpath: Vec::new(),
            output_dir: output_dir.into(),
            state_dir: state_dir.into(),
            write_output_index: true,
        }
    }
}
