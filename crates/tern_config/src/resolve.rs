//! Resolution of configured relative paths against the project directory.

use std::path::{Path, PathBuf};

use crate::types::ProjectConfig;

/// Absolute (project-relative, joined) locations used by a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    /// The project directory all other paths were resolved against.
    pub project_dir: PathBuf,
    /// Source roots, in configuration order.
    pub sources: Vec<PathBuf>,
    /// Output directory for compiled type files.
    pub output: PathBuf,
    /// Directory holding the persisted build state.
    pub state_dir: PathBuf,
    /// Classpath entries, in configuration order.
    pub classpath: Vec<PathBuf>,
}

impl ProjectConfig {
    /// Joins every configured path onto `project_dir`.
    ///
    /// Absolute paths in the configuration are kept as they are.
    pub fn resolve_paths(&self, project_dir: &Path) -> ResolvedPaths {
        let join = |p: &String| project_dir.join(p);
        ResolvedPaths {
            project_dir: project_dir.to_path_buf(),
            sources: self.build.sources.iter().map(join).collect(),
            output: join(&self.build.output),
            state_dir: join(&self.build.state_dir),
            classpath: self.classpath.entries.iter().map(join).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::loader::load_config_from_str;
    use std::path::{Path, PathBuf};

    #[test]
    fn joins_relative_paths() {
        let config = load_config_from_str(
            "[project]\nname = \"x\"\n[classpath]\nentries = [\"lib/a.tar\"]\n",
        )
        .unwrap();
        let root = Path::new("/work/x");
        let paths = config.resolve_paths(root);
        assert_eq!(paths.sources, vec![PathBuf::from("/work/x/src")]);
        assert_eq!(paths.output, PathBuf::from("/work/x/target/types"));
        assert_eq!(paths.state_dir, PathBuf::from("/work/x/target/tern"));
        assert_eq!(paths.classpath, vec![PathBuf::from("/work/x/lib/a.tar")]);
    }

    #[cfg(unix)]
    #[test]
    fn keeps_absolute_paths() {
        let config = load_config_from_str(
            "[project]\nname = \"x\"\n[classpath]\nentries = [\"/opt/lib/types\"]\n",
        )
        .unwrap();
        let paths = config.resolve_paths(Path::new("/work/x"));
        assert_eq!(paths.classpath, vec![PathBuf::from("/opt/lib/types")]);
    }
}
