//! The build context: previous generation in, next generation out.
//!
//! A [`BuildContext`] is opened at the start of a build. It loads the last
//! committed [`BuildState`] (read-only), tracks which inputs are new,
//! modified or gone, accumulates fresh records for the units compiled in
//! this build, and stages output changes. [`BuildContext::commit`] carries
//! untouched units forward, flushes the outputs, writes the output type
//! index and replaces the state file.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tern_classpath::TypeIndex;
use tern_common::{ContentHash, StructuralHash};
use tern_diagnostics::Diagnostic;

use crate::error::StateError;
use crate::output::{FlushSummary, OutputStage};
use crate::record::{ArtifactRecord, UnitId, UnitRecord};
use crate::references::ReferenceRecord;
use crate::state::BuildState;

/// How a registered input compares to the previous build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputStatus {
    /// Not present in the previous build.
    New,
    /// Present, with a different fingerprint.
    Modified,
    /// Present, with the same fingerprint.
    Unmodified,
}

#[derive(Debug)]
struct Input {
    path: PathBuf,
    fingerprint: ContentHash,
    status: InputStatus,
}

/// What a commit did.
#[derive(Debug)]
pub struct Commit {
    /// The generation that was written.
    pub state: BuildState,
    /// Units copied forward from the previous generation.
    pub carried: usize,
    /// Output files written and deleted.
    pub flushed: FlushSummary,
}

impl Commit {
    /// Returns `true` if any committed unit has an error diagnostic.
    pub fn has_errors(&self) -> bool {
        self.state.units.values().any(UnitRecord::has_errors)
    }
}

/// Reads an input file and computes its content fingerprint.
pub fn fingerprint_file(path: &Path) -> Result<ContentHash, StateError> {
    let content = std::fs::read(path).map_err(|e| StateError::io(path, e))?;
    Ok(ContentHash::from_bytes(&content))
}

/// State of one build in progress.
#[derive(Debug)]
pub struct BuildContext {
    state_dir: PathBuf,
    previous: Option<BuildState>,
    previous_owners: HashMap<String, UnitId>,
    inputs: BTreeMap<UnitId, Input>,
    processed: BTreeMap<UnitId, UnitRecord>,
    attributes: BTreeMap<String, serde_json::Value>,
    output: OutputStage,
    write_output_index: bool,
}

impl BuildContext {
    /// Opens a context, loading the previous generation from `state_dir`.
    ///
    /// A missing or unusable state file leaves the context escalated: every
    /// input is new.
    pub fn open(state_dir: &Path, output_dir: &Path) -> Self {
        let previous = BuildState::load(state_dir);
        let mut previous_owners = HashMap::new();
        if let Some(state) = &previous {
            for (unit, record) in &state.units {
                for artifact in &record.artifacts {
                    previous_owners.insert(artifact.type_name.clone(), unit.clone());
                }
            }
        }
        tracing::debug!(
            state_dir = %state_dir.display(),
            units = previous.as_ref().map_or(0, |s| s.units.len()),
            escalated = previous.is_none(),
            "opened build context"
        );
        Self {
            state_dir: state_dir.to_path_buf(),
            previous,
            previous_owners,
            inputs: BTreeMap::new(),
            processed: BTreeMap::new(),
            attributes: BTreeMap::new(),
            output: OutputStage::new(output_dir),
            write_output_index: true,
        }
    }

    /// Sets whether commit writes a type index into the output directory.
    pub fn with_output_index(mut self, enabled: bool) -> Self {
        self.write_output_index = enabled;
        self
    }

    /// Returns `true` if there is no usable previous generation.
    pub fn is_escalated(&self) -> bool {
        self.previous.is_none()
    }

    /// The previous record of `unit`.
    pub fn previous_unit(&self, unit: &UnitId) -> Option<&UnitRecord> {
        self.previous.as_ref()?.units.get(unit)
    }

    /// The unit that produced `type_name` in the previous build.
    pub fn previous_owner(&self, type_name: &str) -> Option<&UnitId> {
        self.previous_owners.get(type_name)
    }

    /// The structural hash `type_name` had in the previous build.
    pub fn previous_hash(&self, type_name: &str) -> Option<StructuralHash> {
        let owner = self.previous_owner(type_name)?;
        self.previous_unit(owner)?.artifact(type_name)?.hash
    }

    /// Reads a build-wide attribute set by the previous build.
    pub fn previous_attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.previous.as_ref()?.attribute(key)
    }

    /// Sets a build-wide attribute for the next generation.
    pub fn set_attribute<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StateError> {
        let value = serde_json::to_value(value).map_err(|e| StateError::Serialization {
            reason: e.to_string(),
        })?;
        self.attributes.insert(key.to_string(), value);
        Ok(())
    }

    /// Registers an input with its fingerprint and reports how it compares
    /// to the previous build.
    pub fn register_input(&mut self, path: &Path, fingerprint: ContentHash) -> InputStatus {
        let unit = UnitId::from_path(path);
        let status = match self.previous_unit(&unit) {
            None => InputStatus::New,
            Some(record) if record.fingerprint != fingerprint => InputStatus::Modified,
            Some(_) => InputStatus::Unmodified,
        };
        self.inputs.insert(
            unit,
            Input {
                path: path.to_path_buf(),
                fingerprint,
                status,
            },
        );
        status
    }

    /// Reads, fingerprints and registers the input at `path`.
    pub fn register_file(&mut self, path: &Path) -> Result<InputStatus, StateError> {
        let fingerprint = fingerprint_file(path)?;
        Ok(self.register_input(path, fingerprint))
    }

    /// Every registered input, in key order.
    pub fn inputs(&self) -> impl Iterator<Item = (&UnitId, &Path, InputStatus)> {
        self.inputs
            .iter()
            .map(|(unit, input)| (unit, input.path.as_path(), input.status))
    }

    /// The source path of a registered input.
    pub fn input_path(&self, unit: &UnitId) -> Option<&Path> {
        self.inputs.get(unit).map(|i| i.path.as_path())
    }

    fn inputs_with(&self, status: InputStatus) -> Vec<UnitId> {
        self.inputs
            .iter()
            .filter(|(_, input)| input.status == status)
            .map(|(unit, _)| unit.clone())
            .collect()
    }

    /// Inputs not present in the previous build.
    pub fn added_inputs(&self) -> Vec<UnitId> {
        self.inputs_with(InputStatus::New)
    }

    /// Inputs whose fingerprint changed.
    pub fn modified_inputs(&self) -> Vec<UnitId> {
        self.inputs_with(InputStatus::Modified)
    }

    /// Units of the previous build that were not registered in this one.
    pub fn removed_inputs(&self) -> Vec<UnitId> {
        match &self.previous {
            Some(state) => state
                .units
                .keys()
                .filter(|unit| !self.inputs.contains_key(*unit))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Returns `true` if no input was added, modified or removed.
    ///
    /// Classpath changes are not considered here.
    pub fn is_structural_noop(&self) -> bool {
        !self.is_escalated()
            && self
                .inputs
                .values()
                .all(|i| i.status == InputStatus::Unmodified)
            && self.removed_inputs().is_empty()
    }

    /// Starts a fresh record for `unit`, discarding any started earlier in
    /// this build.
    pub fn begin_unit(&mut self, unit: &UnitId, path: &Path) -> Result<(), StateError> {
        let fingerprint = match self.inputs.get(unit) {
            Some(input) => input.fingerprint,
            None => fingerprint_file(path)?,
        };
        self.processed
            .insert(unit.clone(), UnitRecord::new(path, fingerprint));
        Ok(())
    }

    /// Returns `true` if `unit` has a fresh record in this build.
    pub fn is_processed(&self, unit: &UnitId) -> bool {
        self.processed.contains_key(unit)
    }

    fn fresh(&mut self, unit: &UnitId) -> Option<&mut UnitRecord> {
        let record = self.processed.get_mut(unit);
        if record.is_none() {
            tracing::warn!(unit = %unit, "unit was not started in this build");
        }
        record
    }

    /// Replaces the reference record of `unit`.
    pub fn set_references(&mut self, unit: &UnitId, references: ReferenceRecord) {
        if let Some(record) = self.fresh(unit) {
            record.references = references;
        }
    }

    /// Attributes an artifact to `unit` and stages its bytes for writing.
    pub fn associate_artifact(&mut self, unit: &UnitId, artifact: ArtifactRecord, bytes: Vec<u8>) {
        let type_name = artifact.type_name.clone();
        if let Some(record) = self.fresh(unit) {
            record.artifacts.retain(|a| a.type_name != type_name);
            record.artifacts.push(artifact);
            self.output.write(&type_name, bytes);
        }
    }

    /// Appends a diagnostic to `unit`.
    pub fn add_diagnostic(&mut self, unit: &UnitId, diagnostic: Diagnostic) {
        if let Some(record) = self.fresh(unit) {
            record.diagnostics.push(diagnostic);
        }
    }

    /// Stages the deletion of an output type file.
    pub fn delete_output(&mut self, type_name: &str) {
        self.output.delete(type_name);
    }

    /// The staged view of the output directory.
    pub fn output(&self) -> &OutputStage {
        &self.output
    }

    /// Builds the next generation: fresh records for compiled units and the
    /// previous records, verbatim, for registered units left untouched.
    /// Units that are no longer registered are dropped.
    pub fn carry_over(&self) -> (BuildState, usize) {
        let mut next = BuildState::new();
        next.attributes = self.attributes.clone();
        let mut carried = 0;
        for unit in self.inputs.keys() {
            if let Some(record) = self.processed.get(unit) {
                next.units.insert(unit.clone(), record.clone());
            } else if let Some(record) = self.previous_unit(unit) {
                next.units.insert(unit.clone(), record.clone());
                carried += 1;
            }
        }
        for (unit, record) in &self.processed {
            next.units.entry(unit.clone()).or_insert_with(|| record.clone());
        }
        (next, carried)
    }

    /// Commits the build: flushes staged outputs, writes the output type
    /// index and atomically replaces the state file.
    pub fn commit(mut self) -> Result<Commit, StateError> {
        let (state, carried) = self.carry_over();
        let flushed = self.output.flush()?;

        if self.write_output_index {
            let mut index = TypeIndex::new();
            for record in state.units.values() {
                for artifact in &record.artifacts {
                    if let Some(hash) = artifact.hash {
                        index.insert(artifact.type_name.clone(), hash.as_bytes().to_vec());
                    }
                }
            }
            if let Err(e) = tern_classpath::write_index(self.output.dir(), &index) {
                tracing::warn!(error = %e, "failed to write output type index");
            }
        }

        state.save(&self.state_dir)?;
        tracing::info!(
            units = state.units.len(),
            compiled = self.processed.len(),
            carried,
            written = flushed.written,
            deleted = flushed.deleted,
            "committed build state"
        );
        Ok(Commit {
            state,
            carried,
            flushed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_diagnostics::DiagnosticCode;

    struct Fixture {
        _dir: tempfile::TempDir,
        state_dir: PathBuf,
        output_dir: PathBuf,
        src: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = dir.path().join("state");
        let output_dir = dir.path().join("out");
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        Fixture {
            state_dir,
            output_dir,
            src,
            _dir: dir,
        }
    }

    fn artifact(name: &str, seed: u8) -> ArtifactRecord {
        ArtifactRecord {
            type_name: name.to_string(),
            path: tern_common::type_to_path(name),
            hash: Some(StructuralHash::new([seed; 32])),
        }
    }

    fn write_source(f: &Fixture, name: &str, text: &str) -> PathBuf {
        let path = f.src.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    /// Compiles `path` as a unit producing `types`.
    fn compile(ctx: &mut BuildContext, path: &Path, types: &[(&str, u8)]) -> UnitId {
        let unit = UnitId::from_path(path);
        ctx.begin_unit(&unit, path).unwrap();
        for (name, seed) in types {
            ctx.associate_artifact(&unit, artifact(name, *seed), vec![*seed]);
        }
        unit
    }

    #[test]
    fn first_build_is_escalated_and_everything_is_new() {
        let f = fixture();
        let a = write_source(&f, "A.decl", "class A {}");
        let mut ctx = BuildContext::open(&f.state_dir, &f.output_dir);
        assert!(ctx.is_escalated());
        assert_eq!(ctx.register_file(&a).unwrap(), InputStatus::New);
        assert_eq!(ctx.added_inputs(), vec![UnitId::from_path(&a)]);
        assert!(!ctx.is_structural_noop());
    }

    #[test]
    fn commit_then_reopen_detects_changes() {
        let f = fixture();
        let a = write_source(&f, "A.decl", "class A {}");
        let b = write_source(&f, "B.decl", "class B {}");

        let mut ctx = BuildContext::open(&f.state_dir, &f.output_dir);
        ctx.register_file(&a).unwrap();
        ctx.register_file(&b).unwrap();
        compile(&mut ctx, &a, &[("A", 1)]);
        compile(&mut ctx, &b, &[("B", 2)]);
        let commit = ctx.commit().unwrap();
        assert_eq!(commit.state.units.len(), 2);
        assert_eq!(commit.flushed.written, 2);
        assert!(f.output_dir.join("A.type").exists());

        write_source(&f, "A.decl", "class A { int x; }");
        std::fs::remove_file(&b).unwrap();
        let mut ctx = BuildContext::open(&f.state_dir, &f.output_dir);
        assert!(!ctx.is_escalated());
        assert_eq!(ctx.register_file(&a).unwrap(), InputStatus::Modified);
        assert_eq!(ctx.modified_inputs(), vec![UnitId::from_path(&a)]);
        assert_eq!(ctx.removed_inputs(), vec![UnitId::from_path(&b)]);
        assert_eq!(ctx.previous_owner("B"), Some(&UnitId::from_path(&b)));
        assert_eq!(ctx.previous_hash("B"), Some(StructuralHash::new([2; 32])));
        assert!(!ctx.is_structural_noop());
    }

    #[test]
    fn untouched_units_are_carried_over_verbatim() {
        let f = fixture();
        let a = write_source(&f, "A.decl", "class A {}");
        let b = write_source(&f, "B.decl", "class B {}");

        let mut ctx = BuildContext::open(&f.state_dir, &f.output_dir);
        ctx.register_file(&a).unwrap();
        ctx.register_file(&b).unwrap();
        compile(&mut ctx, &a, &[("A", 1)]);
        let unit_b = compile(&mut ctx, &b, &[("B", 2)]);
        ctx.add_diagnostic(
            &unit_b,
            Diagnostic::warning(DiagnosticCode::DEPRECATED_USE, "uses deprecated type"),
        );
        let first = ctx.commit().unwrap().state;

        let mut ctx = BuildContext::open(&f.state_dir, &f.output_dir);
        ctx.register_file(&a).unwrap();
        ctx.register_file(&b).unwrap();
        assert!(ctx.is_structural_noop());
        compile(&mut ctx, &a, &[("A", 3)]);
        let commit = ctx.commit().unwrap();
        assert_eq!(commit.carried, 1);
        assert_eq!(commit.state.units[&unit_b], first.units[&unit_b]);
        assert_eq!(commit.state.units[&unit_b].diagnostics.len(), 1);
        assert_eq!(
            commit.state.units[&UnitId::from_path(&a)].artifacts[0].hash,
            Some(StructuralHash::new([3; 32]))
        );
    }

    #[test]
    fn removed_units_are_dropped_and_outputs_deleted() {
        let f = fixture();
        let a = write_source(&f, "A.decl", "class A {}");
        let mut ctx = BuildContext::open(&f.state_dir, &f.output_dir);
        ctx.register_file(&a).unwrap();
        compile(&mut ctx, &a, &[("p.A", 1)]);
        ctx.commit().unwrap();
        assert!(f.output_dir.join("p").join("A.type").exists());

        let mut ctx = BuildContext::open(&f.state_dir, &f.output_dir);
        assert_eq!(ctx.removed_inputs().len(), 1);
        ctx.delete_output("p.A");
        assert!(!ctx.output().contains("p.A"));
        let commit = ctx.commit().unwrap();
        assert!(commit.state.units.is_empty());
        assert_eq!(commit.flushed.deleted, 1);
        assert!(!f.output_dir.join("p").join("A.type").exists());
    }

    #[test]
    fn nothing_is_written_without_commit() {
        let f = fixture();
        let a = write_source(&f, "A.decl", "class A {}");
        let mut ctx = BuildContext::open(&f.state_dir, &f.output_dir);
        ctx.register_file(&a).unwrap();
        compile(&mut ctx, &a, &[("A", 1)]);
        assert_eq!(ctx.output().read("A"), Some(vec![1]));
        drop(ctx);
        assert!(!f.output_dir.join("A.type").exists());
        assert!(BuildState::load(&f.state_dir).is_none());
    }

    #[test]
    fn commit_writes_output_index() {
        let f = fixture();
        let a = write_source(&f, "A.decl", "class A {}");
        let mut ctx = BuildContext::open(&f.state_dir, &f.output_dir);
        ctx.register_file(&a).unwrap();
        compile(&mut ctx, &a, &[("p.A", 7)]);
        ctx.commit().unwrap();
        let text =
            std::fs::read_to_string(f.output_dir.join(tern_classpath::INDEX_LOCATION)).unwrap();
        let index = TypeIndex::parse(&text).unwrap();
        assert_eq!(index.get("p.A"), Some(&[vec![7u8; 32]][..]));
    }

    #[test]
    fn output_index_can_be_disabled() {
        let f = fixture();
        let a = write_source(&f, "A.decl", "class A {}");
        let mut ctx = BuildContext::open(&f.state_dir, &f.output_dir).with_output_index(false);
        ctx.register_file(&a).unwrap();
        compile(&mut ctx, &a, &[("p.A", 7)]);
        ctx.commit().unwrap();
        assert!(!f.output_dir.join(tern_classpath::INDEX_LOCATION).exists());
    }

    #[test]
    fn attributes_are_per_build() {
        let f = fixture();
        let mut ctx = BuildContext::open(&f.state_dir, &f.output_dir);
        ctx.set_attribute("digest", &vec!["x".to_string()]).unwrap();
        ctx.commit().unwrap();

        let ctx = BuildContext::open(&f.state_dir, &f.output_dir);
        assert_eq!(
            ctx.previous_attribute::<Vec<String>>("digest"),
            Some(vec!["x".to_string()])
        );
        ctx.commit().unwrap();
        let ctx = BuildContext::open(&f.state_dir, &f.output_dir);
        assert_eq!(ctx.previous_attribute::<Vec<String>>("digest"), None);
    }

    #[test]
    fn commit_reports_errors_in_carried_units() {
        let f = fixture();
        let a = write_source(&f, "A.decl", "class A extends Missing {}");
        let mut ctx = BuildContext::open(&f.state_dir, &f.output_dir);
        ctx.register_file(&a).unwrap();
        let unit = compile(&mut ctx, &a, &[]);
        ctx.add_diagnostic(
            &unit,
            Diagnostic::error(DiagnosticCode::UNRESOLVED_TYPE, "cannot resolve type `Missing`"),
        );
        assert!(ctx.commit().unwrap().has_errors());

        let mut ctx = BuildContext::open(&f.state_dir, &f.output_dir);
        ctx.register_file(&a).unwrap();
        let commit = ctx.commit().unwrap();
        assert_eq!(commit.carried, 1);
        assert!(commit.has_errors());
    }
}
