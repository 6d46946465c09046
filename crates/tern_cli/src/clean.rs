//! `tern clean`: forget the previous build.
//!
//! Deletes the persisted build state and the output directory, so the next
//! build compiles every unit from scratch.

use std::path::{Path, PathBuf};

use tern_config::ResolvedPaths;
use tern_state::BuildState;

use crate::pipeline::load_project;
use crate::GlobalArgs;

/// Runs the `tern clean` command.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    if !global.quiet {
        eprintln!(
            "   Cleaning {} v{}",
            project.config.project.name, project.config.project.version
        );
    }
    let removed = remove_build_products(&project.paths)?;
    if !global.quiet {
        for path in &removed {
            eprintln!("    Removed {}", project.display_path(path));
        }
        if removed.is_empty() {
            eprintln!("   Nothing to clean");
        }
    }
    Ok(0)
}

/// Deletes the state file and the output directory, returning what existed.
pub fn remove_build_products(paths: &ResolvedPaths) -> std::io::Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    let state_file = BuildState::file_path(&paths.state_dir);
    if remove(&state_file, false)? {
        removed.push(state_file);
    }
    if remove(&paths.output, true)? {
        removed.push(paths.output.clone());
    }
    tracing::info!(removed = removed.len(), "cleaned build products");
    Ok(removed)
}

fn remove(path: &Path, dir: bool) -> std::io::Result<bool> {
    let result = if dir {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
