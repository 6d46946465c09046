//! `tern build`: one incremental build.
//!
//! 1. Find the project root and load `tern.toml`
//! 2. Create the configured backend from the registry
//! 3. Discover the backend's source files under the source roots
//! 4. Run the scheduler against the previous build state
//! 5. Render every unit diagnostic of the committed state
//!
//! With `--format json`, each diagnostic is printed as one JSON line on
//! stdout, followed by a one-line summary object.

use serde::Serialize;
use tern_classpath::EntryCache;
use tern_compile::{BuildOutcome, Scheduler};

use crate::clean::remove_build_products;
use crate::pipeline::{backend_registry, load_project, render_diagnostic, Project};
use crate::{BuildArgs, GlobalArgs, ReportFormat};

/// The machine-readable build summary.
#[derive(Debug, Serialize)]
struct BuildSummary<'a> {
    success: bool,
    compiled: Vec<&'a str>,
    passes: usize,
    carried: usize,
    written: usize,
    deleted: usize,
    errors: usize,
    warnings: usize,
}

impl<'a> BuildSummary<'a> {
    fn new(outcome: &'a BuildOutcome) -> Self {
        let errors = outcome.error_count();
        let warnings = outcome
            .diagnostics()
            .filter(|(_, _, d)| d.severity == tern_diagnostics::Severity::Warning)
            .count();
        Self {
            success: outcome.success,
            compiled: outcome.compiled.iter().map(|u| u.as_str()).collect(),
            passes: outcome.passes,
            carried: outcome.carried,
            written: outcome.written,
            deleted: outcome.deleted,
            errors,
            warnings,
        }
    }
}

/// Runs the `tern build` command.
///
/// Returns exit code 0 if the build succeeded, 1 if any unit has errors.
pub fn run(args: &BuildArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;

    if args.full {
        remove_build_products(&project.paths)?;
    }

    if !global.quiet && args.format == ReportFormat::Text {
        eprintln!(
            "   Building {} v{}",
            project.config.project.name, project.config.project.version
        );
    }

    let registry = backend_registry();
    let mut backend = registry.create(&project.config.build.backend, &project.backend_options())?;
    let settings = project.settings(backend.source_extension());
    if settings.sources.is_empty() && !global.quiet {
        eprintln!(
            "warning: no .{} sources found under the configured source roots",
            backend.source_extension()
        );
    }

    let cache = EntryCache::new();
    let outcome = Scheduler::new(backend.as_mut(), &cache).build(&settings)?;

    report(&project, &outcome, args.format, global);

    Ok(if outcome.success { 0 } else { 1 })
}

fn report(project: &Project, outcome: &BuildOutcome, format: ReportFormat, global: &GlobalArgs) {
    for (_, path, diag) in outcome.diagnostics() {
        let rendered = render_diagnostic(format, global.color, &project.display_path(path), diag);
        match format {
            ReportFormat::Text => eprintln!("{rendered}"),
            ReportFormat::Json => println!("{rendered}"),
        }
    }

    let summary = BuildSummary::new(outcome);
    match format {
        ReportFormat::Text => {
            if global.quiet {
                return;
            }
            eprintln!(
                "   Compiled {} unit(s) in {} pass(es), {} carried over",
                summary.compiled.len(),
                summary.passes,
                summary.carried
            );
            eprintln!(
                "     Output {} written, {} deleted",
                summary.written, summary.deleted
            );
            eprintln!(
                "   Result: {} error(s), {} warning(s)",
                summary.errors, summary.warnings
            );
        }
        ReportFormat::Json => {
            let json = serde_json::to_string(&summary).unwrap_or_else(|_| "{}".to_string());
            println!("{json}");
        }
    }
}
