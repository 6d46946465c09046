//! Shared pipeline helpers for CLI commands.
//!
//! Contains what `build`, `status` and `clean` have in common: project root
//! resolution, configuration loading, backend selection, build settings and
//! diagnostic rendering.

use std::path::{Path, PathBuf};

use tern_compile::{discover_sources, BackendOptions, BackendRegistry, BuildSettings};
use tern_config::{ProjectConfig, ResolvedPaths, CONFIG_FILE};
use tern_diagnostics::{Diagnostic, DiagnosticRenderer, JsonRenderer, TerminalRenderer};

use crate::{GlobalArgs, ReportFormat};

/// A loaded project: its configuration and resolved locations.
pub struct Project {
    /// The parsed `tern.toml`.
    pub config: ProjectConfig,
    /// Configured paths joined onto the project directory.
    pub paths: ResolvedPaths,
}

impl Project {
    /// Options handed to the backend factory.
    pub fn backend_options(&self) -> BackendOptions {
        BackendOptions {
            source_roots: self.paths.sources.clone(),
            deprecation_warnings: self.config.build.deprecation_warnings,
        }
    }

    /// Build settings for sources with the given extension.
    pub fn settings(&self, extension: &str) -> BuildSettings {
        let mut settings = BuildSettings::new(&self.paths.output, &self.paths.state_dir);
        settings.sources = discover_sources(&self.paths.sources, extension);
        settings.classpath = self.paths.classpath.clone();
        settings.write_output_index = self.config.build.write_output_index;
        settings
    }

    /// `path` relative to the project directory when it lies inside it.
    pub fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.paths.project_dir)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

/// Walks up from `start` looking for the nearest directory containing `tern.toml`.
///
/// Returns the directory containing `tern.toml`, or an error if none is found.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Resolves the project root directory from global CLI args.
///
/// If `--config` is specified, uses that path (file → parent dir, dir → itself).
/// Otherwise walks up from the current directory looking for `tern.toml`.
pub fn resolve_project_root(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let p = PathBuf::from(config_path);
        if p.is_file() {
            Ok(p.parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")))
        } else {
            Ok(p)
        }
    } else {
        find_project_root(&std::env::current_dir()?)
    }
}

/// Loads the project the global args point at.
pub fn load_project(global: &GlobalArgs) -> Result<Project, Box<dyn std::error::Error>> {
    let project_dir = resolve_project_root(global)?;
    let config = tern_config::load_config(&project_dir)?;
    let paths = config.resolve_paths(&project_dir);
    tracing::debug!(
        project = %config.project.name,
        dir = %project_dir.display(),
        backend = %config.build.backend,
        "loaded project"
    );
    Ok(Project { config, paths })
}

/// Every backend the CLI knows about.
pub fn backend_registry() -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    tern_decl::register(&mut registry);
    registry
}

/// Renders one unit diagnostic in the requested format.
pub fn render_diagnostic(
    format: ReportFormat,
    color: bool,
    path: &str,
    diag: &Diagnostic,
) -> String {
    match format {
        ReportFormat::Text => TerminalRenderer::new(color).render(path, diag),
        ReportFormat::Json => JsonRenderer.render(path, diag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &Path) {
        fs::write(
            dir.join(CONFIG_FILE),
            "[project]\nname = \"demo\"\n[classpath]\nentries = [\"lib/base.tar\"]\n",
        )
        .unwrap();
    }

    fn global_with_config(config: Option<String>) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config,
        }
    }

    #[test]
    fn find_project_root_in_current_dir() {
        let tmp = TempDir::new().unwrap();
        write_config(tmp.path());
        assert_eq!(find_project_root(tmp.path()).unwrap(), tmp.path());
    }

    #[test]
    fn find_project_root_in_parent() {
        let tmp = TempDir::new().unwrap();
        write_config(tmp.path());
        let sub = tmp.path().join("src").join("app");
        fs::create_dir_all(&sub).unwrap();
        assert_eq!(find_project_root(&sub).unwrap(), tmp.path());
    }

    #[test]
    fn config_flag_accepts_file_or_dir() {
        let tmp = TempDir::new().unwrap();
        write_config(tmp.path());
        let file = tmp.path().join(CONFIG_FILE);
        let from_file =
            resolve_project_root(&global_with_config(Some(file.display().to_string()))).unwrap();
        assert_eq!(from_file, tmp.path());
        let from_dir =
            resolve_project_root(&global_with_config(Some(tmp.path().display().to_string())))
                .unwrap();
        assert_eq!(from_dir, tmp.path());
    }

    #[test]
    fn settings_follow_config() {
        let tmp = TempDir::new().unwrap();
        write_config(tmp.path());
        let src = tmp.path().join("src").join("app");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("A.decl"), "class A { }").unwrap();
        fs::write(src.join("notes.txt"), "not a unit").unwrap();

        let project =
            load_project(&global_with_config(Some(tmp.path().display().to_string()))).unwrap();
        let settings = project.settings(tern_decl::SOURCE_EXTENSION);
        assert_eq!(settings.sources, vec![src.join("A.decl")]);
        assert_eq!(settings.classpath, vec![tmp.path().join("lib/base.tar")]);
        assert_eq!(settings.output_dir, tmp.path().join("target/types"));
        assert_eq!(settings.state_dir, tmp.path().join("target/tern"));
        assert!(settings.write_output_index);
        assert_eq!(
            project.display_path(&src.join("A.decl")),
            Path::new("src").join("app").join("A.decl").display().to_string()
        );
    }

    #[test]
    fn registry_knows_decl() {
        let registry = backend_registry();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["decl"]);
        let backend = registry.create("decl", &BackendOptions::default()).unwrap();
        assert_eq!(backend.source_extension(), "decl");
    }

    #[test]
    fn missing_project_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_project(&global_with_config(Some(tmp.path().display().to_string())));
        assert!(err.is_err());
    }
}
