//! `tern status`: what the next build would start from.
//!
//! Compares the sources on disk and the classpath against the last committed
//! build without compiling anything.

use serde::Serialize;
use tern_compile::{inspect, StatusReport};
use tern_state::UnitId;

use crate::pipeline::{backend_registry, load_project, Project};
use crate::{GlobalArgs, ReportFormat, StatusArgs};

#[derive(Debug, Serialize)]
struct StatusJson<'a> {
    noop: bool,
    full_rebuild: bool,
    classpath_changed: bool,
    added: &'a [UnitId],
    modified: &'a [UnitId],
    removed: &'a [UnitId],
    failing: &'a [UnitId],
}

/// Runs the `tern status` command.
///
/// Always exits with 0; the report says whether a build has work to do.
pub fn run(args: &StatusArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let backend = backend_registry().create(&project.config.build.backend, &project.backend_options())?;
    let settings = project.settings(backend.source_extension());
    let report = inspect(&settings)?;

    match args.format {
        ReportFormat::Text => print!("{}", render_text(&project, &report)),
        ReportFormat::Json => {
            let json = StatusJson {
                noop: report.is_noop(),
                full_rebuild: report.escalated,
                classpath_changed: report.classpath_changed,
                added: &report.added,
                modified: &report.modified,
                removed: &report.removed,
                failing: &report.failing,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&json).unwrap_or_else(|_| "{}".to_string())
            );
        }
    }
    Ok(0)
}

fn render_text(project: &Project, report: &StatusReport) -> String {
    let mut out = String::new();
    if report.escalated {
        out.push_str("no previous build: every unit will be compiled\n");
    } else if report.is_noop() {
        out.push_str("up to date\n");
    }
    if report.classpath_changed {
        out.push_str("classpath changed\n");
    }
    let groups = [
        ("added", &report.added),
        ("modified", &report.modified),
        ("removed", &report.removed),
        ("failing", &report.failing),
    ];
    for (label, units) in groups {
        for unit in units {
            let shown = project.display_path(std::path::Path::new(unit.as_str()));
            out.push_str(&format!("{label:>10}  {shown}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build;
    use crate::BuildArgs;
    use std::fs;

    #[test]
    fn text_report_lists_changes() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("tern.toml"), "[project]\nname = \"demo\"\n").unwrap();
        let src = tmp.path().join("src").join("app");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("A.decl"), "package app;\nclass A { }\n").unwrap();
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config: Some(tmp.path().display().to_string()),
        };
        let project = load_project(&global).unwrap();

        let before = inspect(&project.settings("decl")).unwrap();
        assert!(render_text(&project, &before).starts_with("no previous build"));

        let args = BuildArgs {
            format: ReportFormat::Text,
            full: false,
        };
        assert_eq!(build::run(&args, &global).unwrap(), 0);
        let clean = inspect(&project.settings("decl")).unwrap();
        assert_eq!(render_text(&project, &clean), "up to date\n");

        fs::write(src.join("B.decl"), "package app;\nclass B { }\n").unwrap();
        let changed = inspect(&project.settings("decl")).unwrap();
        let text = render_text(&project, &changed);
        assert!(text.contains("     added  "));
        assert!(text.contains("B.decl"));
        assert!(!text.contains("up to date"));
    }
}
