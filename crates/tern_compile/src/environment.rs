//! The scheduler's view of names outside the batch being compiled.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use tern_classpath::Classpath;
use tern_common::package_name;
use tern_state::{BuildContext, UnitId};

use crate::backend::{NameEnvironment, TypeOrigin};

/// Resolves names against the output directory, the registered sources and
/// the classpath, in that order.
///
/// Output types last produced by a unit in the current batch are hidden:
/// that unit is being recompiled and may no longer define them.
pub struct BuildEnvironment<'a> {
    context: &'a BuildContext,
    classpath: &'a Classpath,
    batch: &'a BTreeSet<UnitId>,
    sources: HashMap<String, (UnitId, PathBuf)>,
    source_packages: BTreeSet<String>,
}

impl<'a> BuildEnvironment<'a> {
    /// Creates the environment for compiling `batch`.
    pub fn new(context: &'a BuildContext, classpath: &'a Classpath, batch: &'a BTreeSet<UnitId>) -> Self {
        let mut sources = HashMap::new();
        let mut source_packages = BTreeSet::new();
        for (unit, path, _) in context.inputs() {
            if batch.contains(unit) || context.is_processed(unit) {
                continue;
            }
            let Some(record) = context.previous_unit(unit) else {
                continue;
            };
            for artifact in &record.artifacts {
                let mut package = package_name(&artifact.type_name);
                while let Some(name) = package {
                    source_packages.insert(name.to_string());
                    package = package_name(name);
                }
                sources.insert(artifact.type_name.clone(), (unit.clone(), path.to_path_buf()));
            }
        }
        Self {
            context,
            classpath,
            batch,
            sources,
            source_packages,
        }
    }

    fn in_output(&self, type_name: &str) -> bool {
        let output = self.context.output();
        if output.is_written(type_name) {
            return true;
        }
        if !output.contains(type_name) {
            return false;
        }
        !matches!(self.context.previous_owner(type_name), Some(owner) if self.batch.contains(owner))
    }
}

impl NameEnvironment for BuildEnvironment<'_> {
    fn find_type(&self, type_name: &str) -> Option<TypeOrigin> {
        if self.in_output(type_name) {
            return Some(TypeOrigin::Output);
        }
        if let Some((unit, path)) = self.sources.get(type_name) {
            return Some(TypeOrigin::Source(unit.clone(), path.clone()));
        }
        self.classpath
            .find_type(type_name)
            .map(|_| TypeOrigin::Classpath)
    }

    fn is_package(&self, name: &str) -> bool {
        if self.classpath.is_package(name) || self.source_packages.contains(name) {
            return true;
        }
        let mut dir = self.context.output().dir().to_path_buf();
        for segment in name.split('.') {
            dir.push(segment);
        }
        dir.is_dir()
    }

    fn read_type(&self, type_name: &str) -> Option<Vec<u8>> {
        if self.in_output(type_name) {
            return self.context.output().read(type_name);
        }
        self.classpath.read_type(type_name)
    }
}
