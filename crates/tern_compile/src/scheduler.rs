//! The incremental compile scheduler.
//!
//! One build runs through these phases:
//!
//! 1. **Seeding**: queue new and modified units; mark every type of a
//!    removed unit changed and schedule its outputs for deletion; diff the
//!    classpath digest against the previous build's and mark each changed
//!    type; queue every unit whose reference record matches a changed type.
//! 2. **Compiling**: hand the whole queue to the backend. Units the backend
//!    pulls in from the source path join the pass.
//! 3. **Propagating**: digest each produced type file and compare it with
//!    the hash from the previous build. New and changed types, and types a
//!    unit no longer produces, are marked changed. Units with errors keep no
//!    outputs. Every unit not yet compiled in this build whose record
//!    matches a changed type is queued, and the loop returns to 2.
//! 4. **Committing**: once a pass queues nothing, the build context carries
//!    untouched units forward and writes outputs and state.
//!
//! A unit is compiled at most once per build, so circular references
//! terminate. A failing backend aborts the build before anything is written.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use std::time::{Instant, SystemTime};

use tern_classpath::{
    classpath_changed, diff, fingerprint_classpath, Classpath, EntryCache, EntryFingerprint,
    TypeIndex,
};
use tern_common::{type_to_path, InternalError};
use tern_diagnostics::{Diagnostic, DiagnosticCode};
use tern_state::{ArtifactRecord, BuildContext, BuildState, UnitId};

use crate::backend::{CompileRequest, CompilerBackend, SourceUnit, UnitOutput};
use crate::environment::BuildEnvironment;
use crate::error::CompileError;
use crate::refs::{ChangedTypes, ReferenceRecord};
use crate::settings::BuildSettings;

/// Build attribute holding the classpath entry fingerprints.
pub const CLASSPATH_FINGERPRINTS: &str = "classpath.fingerprints";

/// Build attribute holding the merged classpath type digest.
pub const CLASSPATH_DIGEST: &str = "classpath.digest";

/// Where the scheduler is in a build.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerPhase {
    /// No build running.
    Idle,
    /// Computing the initial queue.
    Seeding,
    /// The backend is compiling a batch.
    Compiling,
    /// Comparing outputs and queueing affected units.
    Propagating,
    /// Writing outputs and state.
    Committing,
}

impl fmt::Display for SchedulerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Seeding => "seeding",
            Self::Compiling => "compiling",
            Self::Propagating => "propagating",
            Self::Committing => "committing",
        };
        f.write_str(name)
    }
}

/// The result of a committed build.
#[derive(Debug)]
pub struct BuildOutcome {
    /// `false` if any unit of the committed state has an error diagnostic.
    pub success: bool,
    /// Units compiled, in compilation order.
    pub compiled: Vec<UnitId>,
    /// Number of backend invocations.
    pub passes: usize,
    /// Units carried over unchanged.
    pub carried: usize,
    /// Type files written.
    pub written: usize,
    /// Type files deleted.
    pub deleted: usize,
    /// The committed state.
    pub state: BuildState,
}

impl BuildOutcome {
    /// Every diagnostic of the committed state, by unit.
    pub fn diagnostics(&self) -> impl Iterator<Item = (&UnitId, &Path, &Diagnostic)> {
        self.state.units.iter().flat_map(|(unit, record)| {
            record
                .diagnostics
                .iter()
                .map(move |d| (unit, record.path.as_path(), d))
        })
    }

    /// Number of error diagnostics in the committed state.
    pub fn error_count(&self) -> usize {
        self.diagnostics().filter(|(_, _, d)| d.is_error()).count()
    }

    /// Returns `true` if `unit` was compiled in this build.
    pub fn was_compiled(&self, unit: &UnitId) -> bool {
        self.compiled.contains(unit)
    }
}

/// Drives a backend to a fixed point over the changed units.
pub struct Scheduler<'a> {
    backend: &'a mut dyn CompilerBackend,
    cache: &'a EntryCache,
    phase: SchedulerPhase,
}

impl<'a> Scheduler<'a> {
    /// Creates a scheduler over `backend`, opening classpath entries through
    /// `cache`.
    pub fn new(backend: &'a mut dyn CompilerBackend, cache: &'a EntryCache) -> Self {
        Self {
            backend,
            cache,
            phase: SchedulerPhase::Idle,
        }
    }

    /// The current phase.
    pub fn phase(&self) -> SchedulerPhase {
        self.phase
    }

    fn enter(&mut self, phase: SchedulerPhase) {
        tracing::debug!(from = %self.phase, to = %phase, "scheduler phase");
        self.phase = phase;
    }

    /// Runs one incremental build.
    ///
    /// # Errors
    ///
    /// Fails without committing if inputs cannot be read, the classpath
    /// cannot be opened, or the backend fails. Compiler diagnostics never
    /// fail the call; they make [`BuildOutcome::success`] `false`.
    pub fn build(&mut self, settings: &BuildSettings) -> Result<BuildOutcome, CompileError> {
        let result = self.run(settings);
        self.enter(SchedulerPhase::Idle);
        result
    }

    fn run(&mut self, settings: &BuildSettings) -> Result<BuildOutcome, CompileError> {
        let started = Instant::now();
        let build_start = SystemTime::now();
        self.enter(SchedulerPhase::Seeding);

        let mut ctx = BuildContext::open(&settings.state_dir, &settings.output_dir)
            .with_output_index(settings.write_output_index);
        for source in &settings.sources {
            ctx.register_file(source)?;
        }
        let classpath = Classpath::open(&settings.classpath, self.cache, build_start)?;

        let mut changed = ChangedTypes::new();
        let mut queue: BTreeSet<UnitId> = BTreeSet::new();
        if ctx.is_escalated() {
            tracing::info!("no usable build state, compiling everything");
            queue.extend(ctx.inputs().map(|(unit, _, _)| unit.clone()));
        } else {
            queue.extend(ctx.added_inputs());
            queue.extend(ctx.modified_inputs());
            for unit in ctx.removed_inputs() {
                let types: Vec<String> = ctx
                    .previous_unit(&unit)
                    .map(|r| r.artifacts.iter().map(|a| a.type_name.clone()).collect())
                    .unwrap_or_default();
                tracing::debug!(unit = %unit, types = types.len(), "unit removed");
                for type_name in types {
                    ctx.delete_output(&type_name);
                    changed.insert(&type_name);
                }
            }
        }
        seed_classpath(&mut ctx, &classpath, &settings.classpath, &mut changed)?;

        let mut processed: BTreeSet<UnitId> = BTreeSet::new();
        queue.extend(affected_units(&ctx, &changed, &processed, &queue));
        tracing::info!(
            queued = queue.len(),
            changed_types = changed.len(),
            "seeded build"
        );

        let mut compiled = Vec::new();
        let mut produced: HashMap<String, UnitId> = HashMap::new();
        let mut passes = 0;
        while !queue.is_empty() {
            passes += 1;
            self.enter(SchedulerPhase::Compiling);
            let batch = std::mem::take(&mut queue);
            let units: Vec<SourceUnit> = batch
                .iter()
                .filter_map(|unit| {
                    ctx.input_path(unit).map(|path| SourceUnit {
                        id: unit.clone(),
                        path: path.to_path_buf(),
                    })
                })
                .collect();
            tracing::debug!(pass = passes, units = units.len(), "compiling batch");
            let output = {
                let environment = BuildEnvironment::new(&ctx, &classpath, &batch);
                self.backend.compile(CompileRequest {
                    units,
                    environment: &environment,
                })?
            };

            self.enter(SchedulerPhase::Propagating);
            changed.clear();
            let mut answered = BTreeSet::new();
            for unit_output in output.units {
                if processed.contains(&unit_output.unit) {
                    tracing::warn!(unit = %unit_output.unit, "backend recompiled a unit twice, ignoring");
                    continue;
                }
                if !batch.contains(&unit_output.unit) {
                    tracing::debug!(unit = %unit_output.unit, "backend pulled in unit");
                }
                answered.insert(unit_output.unit.clone());
                processed.insert(unit_output.unit.clone());
                compiled.push(unit_output.unit.clone());
                propagate(&mut ctx, unit_output, &mut changed, &mut produced)?;
            }
            if let Some(missing) = batch.iter().find(|unit| !answered.contains(*unit)) {
                return Err(InternalError::new(format!(
                    "backend `{}` returned no result for {missing}",
                    self.backend.name()
                ))
                .into());
            }

            queue.extend(affected_units(&ctx, &changed, &processed, &queue));
            tracing::debug!(
                pass = passes,
                changed_types = changed.len(),
                queued = queue.len(),
                "propagated changes"
            );
        }

        self.enter(SchedulerPhase::Committing);
        let commit = ctx.commit()?;
        let success = !commit.has_errors();
        tracing::info!(
            compiled = compiled.len(),
            passes,
            carried = commit.carried,
            success,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "build finished"
        );
        Ok(BuildOutcome {
            success,
            compiled,
            passes,
            carried: commit.carried,
            written: commit.flushed.written,
            deleted: commit.flushed.deleted,
            state: commit.state,
        })
    }
}

/// Marks classpath types that changed since the previous build and records
/// the classpath digest for the next one.
///
/// The digest is always diffed: a rename inside a directory keeps its file
/// count and newest modification time, so the entry fingerprints only say
/// which entries to mention in the log.
fn seed_classpath(
    ctx: &mut BuildContext,
    classpath: &Classpath,
    paths: &[std::path::PathBuf],
    changed: &mut ChangedTypes,
) -> Result<(), CompileError> {
    let fingerprints = fingerprint_classpath(paths);
    if let Some(previous) = ctx.previous_attribute::<Vec<EntryFingerprint>>(CLASSPATH_FINGERPRINTS) {
        if !classpath_changed(&previous, &fingerprints) {
            tracing::debug!("classpath entries untouched");
        }
    }

    let digest = classpath.digest();
    if !ctx.is_escalated() {
        let previous: Option<TypeIndex> = ctx.previous_attribute(CLASSPATH_DIGEST);
        let types = diff(previous.as_ref(), Some(&digest));
        if !types.is_empty() {
            tracing::info!(types = types.len(), "classpath types changed");
        }
        changed.extend(types.iter().map(String::as_str));
    }
    ctx.set_attribute(CLASSPATH_FINGERPRINTS, &fingerprints)?;
    ctx.set_attribute(CLASSPATH_DIGEST, &digest)?;
    Ok(())
}

/// Registered units, not yet compiled or queued, whose reference record
/// matches one of `changed`.
fn affected_units(
    ctx: &BuildContext,
    changed: &ChangedTypes,
    processed: &BTreeSet<UnitId>,
    queued: &BTreeSet<UnitId>,
) -> Vec<UnitId> {
    if changed.is_empty() {
        return Vec::new();
    }
    let mut affected = Vec::new();
    for (unit, _, _) in ctx.inputs() {
        if processed.contains(unit) || queued.contains(unit) {
            continue;
        }
        let Some(record) = ctx.previous_unit(unit) else {
            continue;
        };
        if record.references.includes_any(changed) {
            tracing::debug!(unit = %unit, "affected by changed types");
            affected.push(unit.clone());
        }
    }
    affected
}

/// Records one unit's result and marks the types it changed.
fn propagate(
    ctx: &mut BuildContext,
    output: UnitOutput,
    changed: &mut ChangedTypes,
    produced: &mut HashMap<String, UnitId>,
) -> Result<(), CompileError> {
    let UnitOutput {
        unit,
        path,
        artifacts,
        diagnostics,
        references,
        dependencies,
    } = output;

    ctx.begin_unit(&unit, &path)?;
    let mut record = ReferenceRecord::from(&references);
    record.add_dependencies(dependencies.iter().map(String::as_str));
    ctx.set_references(&unit, record);
    let has_errors = diagnostics.iter().any(Diagnostic::is_error);
    for diagnostic in diagnostics {
        ctx.add_diagnostic(&unit, diagnostic);
    }

    let previous: Vec<String> = ctx
        .previous_unit(&unit)
        .map(|r| r.artifacts.iter().map(|a| a.type_name.clone()).collect())
        .unwrap_or_default();

    let mut kept = BTreeSet::new();
    if has_errors {
        tracing::debug!(unit = %unit, "unit has errors, dropping its outputs");
    } else {
        for artifact in artifacts {
            let type_name = artifact.type_name;
            if let Some(owner) = produced.get(&type_name).filter(|owner| **owner != unit) {
                ctx.add_diagnostic(
                    &unit,
                    Diagnostic::error(
                        DiagnosticCode::DUPLICATE_TYPE,
                        format!("type `{type_name}` is already defined by {owner}"),
                    ),
                );
                continue;
            }
            let hash = tern_typefile::digest_bytes(&artifact.bytes);
            // An artifact that no longer digests counts as a structural change.
            if hash != ctx.previous_hash(&type_name) {
                tracing::debug!(unit = %unit, type_name = %type_name, "structural change");
                changed.insert(&type_name);
            }
            produced.insert(type_name.clone(), unit.clone());
            kept.insert(type_name.clone());
            ctx.associate_artifact(
                &unit,
                ArtifactRecord {
                    path: type_to_path(&type_name),
                    type_name,
                    hash,
                },
                artifact.bytes,
            );
        }
    }

    for type_name in previous {
        if kept.contains(&type_name) {
            continue;
        }
        if produced.get(&type_name).is_some_and(|owner| *owner != unit) {
            continue;
        }
        tracing::debug!(unit = %unit, type_name = %type_name, "type no longer produced");
        ctx.delete_output(&type_name);
        changed.insert(&type_name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::time::Duration;

    use filetime::FileTime;
    use tern_typefile::{Method, Modifiers, Nesting, TypeFile};

    use crate::backend::{BackendError, CompileOutput, ProducedArtifact, TypeOrigin};

    /// A line-oriented test language:
    ///
    /// - `type NAME SHAPE` defines a type whose shape is SHAPE,
    /// - `uses NAME` references a type,
    /// - `fail` makes the whole backend invocation fail,
    /// - anything else is a body line with no effect on shape.
    struct LineBackend;

    struct Parsed {
        types: Vec<(String, String)>,
        garbage: Vec<String>,
        uses: Vec<String>,
        depends: Vec<String>,
        fail: bool,
    }

    fn parse(text: &str) -> Parsed {
        let mut parsed = Parsed {
            types: Vec::new(),
            garbage: Vec::new(),
            uses: Vec::new(),
            depends: Vec::new(),
            fail: false,
        };
        for line in text.lines() {
            let words: Vec<&str> = line.split_whitespace().collect();
            match words.as_slice() {
                ["type", name, shape] => parsed.types.push((name.to_string(), shape.to_string())),
                ["garbage", name] => parsed.garbage.push(name.to_string()),
                ["uses", name] => parsed.uses.push(name.to_string()),
                ["depends", name] => parsed.depends.push(name.to_string()),
                ["fail"] => parsed.fail = true,
                _ => {}
            }
        }
        parsed
    }

    fn type_bytes(name: &str, shape: &str) -> Vec<u8> {
        let mut t = TypeFile::new(name, Nesting::TopLevel);
        t.modifiers = Modifiers::PUBLIC;
        t.methods.push(Method::new(shape, "()void", Modifiers::PUBLIC));
        tern_typefile::encode(&t).unwrap()
    }

    impl CompilerBackend for LineBackend {
        fn name(&self) -> &str {
            "lines"
        }

        fn source_extension(&self) -> &str {
            "src"
        }

        fn compile(&mut self, request: CompileRequest<'_>) -> Result<CompileOutput, BackendError> {
            let mut pending: Vec<SourceUnit> = request.units;
            let mut parsed: BTreeMap<UnitId, (SourceUnit, Parsed)> = BTreeMap::new();
            while let Some(unit) = pending.pop() {
                if parsed.contains_key(&unit.id) {
                    continue;
                }
                let text = std::fs::read_to_string(&unit.path).map_err(|source| BackendError::Io {
                    path: unit.path.clone(),
                    source,
                })?;
                let p = parse(&text);
                if p.fail {
                    return Err(BackendError::Failed {
                        reason: "told to fail".into(),
                    });
                }
                for name in &p.uses {
                    if let Some(TypeOrigin::Source(id, path)) = request.environment.find_type(name) {
                        pending.push(SourceUnit { id, path });
                    }
                }
                parsed.insert(unit.id.clone(), (unit, p));
            }

            let defined: BTreeSet<&str> = parsed
                .values()
                .flat_map(|(_, p)| p.types.iter().map(|(n, _)| n.as_str()))
                .collect();
            let mut output = CompileOutput::default();
            for (unit, p) in parsed.values() {
                let mut result = UnitOutput::new(unit);
                for name in &p.uses {
                    result.references.add_qualified(name.clone());
                    if !defined.contains(name.as_str())
                        && request.environment.find_type(name).is_none()
                    {
                        result.diagnostics.push(Diagnostic::error(
                            DiagnosticCode::UNRESOLVED_TYPE,
                            format!("cannot resolve type `{name}`"),
                        ));
                    }
                }
                result.dependencies.extend(p.depends.iter().cloned());
                for (name, shape) in &p.types {
                    result.artifacts.push(ProducedArtifact {
                        type_name: name.clone(),
                        bytes: type_bytes(name, shape),
                    });
                }
                for name in &p.garbage {
                    result.artifacts.push(ProducedArtifact {
                        type_name: name.clone(),
                        bytes: b"not a type file".to_vec(),
                    });
                }
                output.units.push(result);
            }
            Ok(output)
        }
    }

    struct Project {
        _dir: tempfile::TempDir,
        root: PathBuf,
        sources: Vec<PathBuf>,
        classpath: Vec<PathBuf>,
        backend: LineBackend,
    }

    impl Project {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path().to_path_buf();
            std::fs::create_dir_all(root.join("src")).unwrap();
            Self {
                _dir: dir,
                root,
                sources: Vec::new(),
                classpath: Vec::new(),
                backend: LineBackend,
            }
        }

        fn write(&mut self, name: &str, text: &str) -> UnitId {
            let path = self.root.join("src").join(name);
            std::fs::write(&path, text).unwrap();
            if !self.sources.contains(&path) {
                self.sources.push(path.clone());
            }
            UnitId::from_path(&path)
        }

        fn remove(&mut self, name: &str) {
            let path = self.root.join("src").join(name);
            std::fs::remove_file(&path).unwrap();
            self.sources.retain(|p| *p != path);
        }

        fn out(&self) -> PathBuf {
            self.root.join("out")
        }

        fn settings(&self) -> BuildSettings {
            let mut settings = BuildSettings::new(self.out(), self.root.join("state"));
            settings.sources = self.sources.clone();
            settings.classpath = self.classpath.clone();
            settings
        }

        fn build(&mut self) -> Result<BuildOutcome, CompileError> {
            let settings = self.settings();
            let cache = EntryCache::new();
            let mut scheduler = Scheduler::new(&mut self.backend, &cache);
            let outcome = scheduler.build(&settings);
            assert_eq!(scheduler.phase(), SchedulerPhase::Idle);
            outcome
        }

        fn compiled(&mut self) -> BTreeSet<UnitId> {
            self.build().unwrap().compiled.into_iter().collect()
        }
    }

    fn ids(units: &[&UnitId]) -> BTreeSet<UnitId> {
        units.iter().map(|u| (*u).clone()).collect()
    }

    #[test]
    fn first_build_compiles_everything_then_nothing() {
        let mut p = Project::new();
        let a = p.write("A.src", "type p.A one\nuses p.B\n");
        let b = p.write("B.src", "type p.B one\n");

        let first = p.build().unwrap();
        assert!(first.success);
        assert_eq!(first.passes, 1);
        assert_eq!(first.compiled.iter().cloned().collect::<BTreeSet<_>>(), ids(&[&a, &b]));
        assert!(p.out().join("p").join("A.type").exists());

        let second = p.build().unwrap();
        assert!(second.compiled.is_empty());
        assert_eq!(second.passes, 0);
        assert_eq!(second.carried, 2);
        assert_eq!(second.state.units, first.state.units);
    }

    #[test]
    fn unreadable_artifact_counts_as_changed() {
        let mut p = Project::new();
        let a = p.write("A.src", "type p.A one\nuses p.B\n");
        let b = p.write("B.src", "type p.B one\n");
        p.build().unwrap();

        p.write("B.src", "garbage p.B\n");
        let outcome = p.build().unwrap();
        assert_eq!(outcome.compiled.iter().cloned().collect::<BTreeSet<_>>(), ids(&[&a, &b]));
        let record = &outcome.state.units[&b];
        assert_eq!(record.artifacts[0].hash, None);

        // Still unreadable: no hash on either side, nothing to propagate.
        p.write("B.src", "garbage p.B\n\n");
        assert_eq!(p.compiled(), ids(&[&b]));
    }

    #[test]
    fn reported_dependencies_join_the_reference_record() {
        let mut p = Project::new();
        let a = p.write("A.src", "type p.A one\ndepends p.Root\n");
        let root = p.write("Root.src", "type p.Root one\n");
        p.write("Other.src", "type p.Other one\n");
        let first = p.build().unwrap();
        assert!(first.state.units[&a].references.qualified.contains("p.Root"));

        p.write("Root.src", "type p.Root two\n");
        assert_eq!(p.compiled(), ids(&[&a, &root]));
    }

    #[test]
    fn body_change_recompiles_only_that_unit() {
        let mut p = Project::new();
        p.write("A.src", "type p.A one\nuses p.B\n");
        let b = p.write("B.src", "type p.B one\n");
        p.build().unwrap();

        p.write("B.src", "type p.B one\nsome body text\n");
        assert_eq!(p.compiled(), ids(&[&b]));
    }

    #[test]
    fn shape_change_recompiles_dependents() {
        let mut p = Project::new();
        let a = p.write("A.src", "type p.A one\nuses p.B\n");
        let b = p.write("B.src", "type p.B one\n");
        p.write("C.src", "type p.C one\n");
        p.build().unwrap();

        p.write("B.src", "type p.B two\n");
        let outcome = p.build().unwrap();
        assert_eq!(outcome.passes, 2);
        assert_eq!(outcome.compiled, vec![b, a]);
    }

    #[test]
    fn propagation_stops_when_shape_is_unchanged() {
        let mut p = Project::new();
        p.write("A.src", "type p.A one\nuses p.B\n");
        let b = p.write("B.src", "type p.B one\nuses p.C\n");
        let c = p.write("C.src", "type p.C one\n");
        p.build().unwrap();

        p.write("C.src", "type p.C two\n");
        assert_eq!(p.compiled(), ids(&[&b, &c]));
    }

    #[test]
    fn removal_recompiles_dependents_and_deletes_outputs() {
        let mut p = Project::new();
        let a = p.write("A.src", "type p.A one\nuses p.B\n");
        p.write("B.src", "type p.B one\n");
        p.build().unwrap();
        assert!(p.out().join("p").join("B.type").exists());

        p.remove("B.src");
        let outcome = p.build().unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.compiled, vec![a.clone()]);
        assert!(!p.out().join("p").join("B.type").exists());
        assert!(!p.out().join("p").join("A.type").exists());
        let messages: Vec<&str> = outcome
            .diagnostics()
            .map(|(_, _, d)| d.message.as_str())
            .collect();
        assert_eq!(messages, vec!["cannot resolve type `p.B`"]);

        let again = p.build().unwrap();
        assert!(!again.success);
        assert!(again.compiled.is_empty());
        assert_eq!(again.error_count(), 1);

        p.write("B.src", "type p.B one\n");
        let fixed = p.build().unwrap();
        assert!(fixed.success);
        assert!(fixed.was_compiled(&a));
    }

    #[test]
    fn circular_references_terminate() {
        let mut p = Project::new();
        let a = p.write("A.src", "type p.A one\nuses p.B\n");
        let b = p.write("B.src", "type p.B one\nuses p.A\n");
        p.build().unwrap();

        p.write("A.src", "type p.A two\nuses p.B\n");
        let outcome = p.build().unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.compiled, vec![a, b]);
    }

    #[test]
    fn backend_failure_commits_nothing() {
        let mut p = Project::new();
        p.write("A.src", "type p.A one\n");
        let first = p.build().unwrap();

        p.write("A.src", "type p.A two\nfail\n");
        assert!(matches!(p.build(), Err(CompileError::Backend(_))));
        let state = BuildState::load(&p.root.join("state")).unwrap();
        assert_eq!(state.units, first.state.units);
    }

    #[test]
    fn missing_output_pulls_source_unit_in() {
        let mut p = Project::new();
        let a = p.write("A.src", "type p.A one\nuses p.B\n");
        let b = p.write("B.src", "type p.B one\n");
        p.build().unwrap();

        std::fs::remove_file(p.out().join("p").join("B.type")).unwrap();
        p.write("A.src", "type p.A one\nuses p.B\nnew body\n");
        let outcome = p.build().unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.compiled.iter().cloned().collect::<BTreeSet<_>>(), ids(&[&a, &b]));
        assert_eq!(outcome.passes, 1);
        assert!(p.out().join("p").join("B.type").exists());
    }

    #[test]
    fn duplicate_types_are_reported() {
        let mut p = Project::new();
        p.write("A.src", "type p.Same one\n");
        p.write("B.src", "type p.Same one\n");
        let outcome = p.build().unwrap();
        assert!(!outcome.success);
        let codes: Vec<DiagnosticCode> = outcome.diagnostics().map(|(_, _, d)| d.code).collect();
        assert_eq!(codes, vec![DiagnosticCode::DUPLICATE_TYPE]);
    }

    #[test]
    fn type_moving_between_units_keeps_its_output() {
        let mut p = Project::new();
        p.write("A.src", "type p.A one\ntype p.Moving one\n");
        p.write("B.src", "type p.B one\n");
        p.build().unwrap();

        p.write("A.src", "type p.A one\n");
        p.write("B.src", "type p.B one\ntype p.Moving one\n");
        let outcome = p.build().unwrap();
        assert!(outcome.success);
        assert!(p.out().join("p").join("Moving.type").exists());
    }

    #[test]
    fn classpath_change_recompiles_users() {
        let mut p = Project::new();
        let lib = p.root.join("lib");
        std::fs::create_dir_all(lib.join("q")).unwrap();
        let q_type = lib.join("q").join("Q.type");
        std::fs::write(&q_type, type_bytes("q.Q", "one")).unwrap();
        p.classpath.push(lib.clone());

        let user = p.write("P.src", "type p.P one\nuses q.Q\n");
        p.write("Other.src", "type p.Other one\n");
        let first = p.build().unwrap();
        assert!(first.success);

        assert!(p.compiled().is_empty());

        std::fs::write(&q_type, type_bytes("q.Q", "two")).unwrap();
        let later = SystemTime::now() + Duration::from_secs(10);
        filetime::set_file_mtime(&q_type, FileTime::from_system_time(later)).unwrap();
        assert_eq!(p.compiled(), ids(&[&user]));
    }

    #[test]
    fn classpath_order_change_recompiles_users_of_shadowed_types() {
        let mut p = Project::new();
        let (one, two) = (p.root.join("one"), p.root.join("two"));
        for (dir, shape) in [(&one, "first"), (&two, "second")] {
            std::fs::create_dir_all(dir.join("q")).unwrap();
            std::fs::write(dir.join("q").join("Q.type"), type_bytes("q.Q", shape)).unwrap();
        }
        p.classpath = vec![one.clone(), two.clone()];
        let user = p.write("P.src", "type p.P one\nuses q.Q\n");
        p.write("Other.src", "type p.Other one\n");
        p.build().unwrap();

        p.classpath = vec![two, one];
        assert_eq!(p.compiled(), ids(&[&user]));
    }
}
