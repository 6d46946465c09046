//! The contract between the scheduler and a compiler backend.
//!
//! The scheduler hands a backend a batch of units and a [`NameEnvironment`]
//! for resolving everything outside the batch. The backend returns, for each
//! unit it compiled, the type files it produced, its diagnostics and what it
//! referenced. It may compile more units than requested, pulling them in
//! when the environment reports a type as [`TypeOrigin::Source`].
//!
//! Backends are created by name through a [`BackendRegistry`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use tern_diagnostics::Diagnostic;
use tern_state::UnitId;

use crate::error::CompileError;
use crate::refs::ReferenceReport;

/// A unit to compile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceUnit {
    /// The unit's key.
    pub id: UnitId,
    /// The source file.
    pub path: PathBuf,
}

impl SourceUnit {
    /// Creates a unit for the source file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            id: UnitId::from_path(&path),
            path,
        }
    }
}

/// Where a type outside the current batch comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeOrigin {
    /// A classpath entry.
    Classpath,
    /// The project's own output directory.
    Output,
    /// A source unit that is not being compiled yet.
    Source(UnitId, PathBuf),
}

/// Resolves names outside the units being compiled.
pub trait NameEnvironment {
    /// Finds where `type_name` is defined.
    fn find_type(&self, type_name: &str) -> Option<TypeOrigin>;

    /// Returns `true` if `name` is a known package.
    fn is_package(&self, name: &str) -> bool;

    /// Reads the type file of a classpath or output type.
    fn read_type(&self, type_name: &str) -> Option<Vec<u8>>;
}

/// The input of one backend invocation.
pub struct CompileRequest<'a> {
    /// Units to compile.
    pub units: Vec<SourceUnit>,
    /// Resolver for everything else.
    pub environment: &'a dyn NameEnvironment,
}

/// One type file produced by a unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProducedArtifact {
    /// Fully qualified type name.
    pub type_name: String,
    /// Encoded type file.
    pub bytes: Vec<u8>,
}

/// Everything a backend reports for one compiled unit.
#[derive(Clone, Debug)]
pub struct UnitOutput {
    /// The unit's key.
    pub unit: UnitId,
    /// The source file.
    pub path: PathBuf,
    /// Produced type files, in production order.
    pub artifacts: Vec<ProducedArtifact>,
    /// Diagnostics, in report order.
    pub diagnostics: Vec<Diagnostic>,
    /// What the unit referenced.
    pub references: ReferenceReport,
    /// Fully qualified types the unit depends on without naming them, such
    /// as the supertypes of a library type it extends.
    pub dependencies: BTreeSet<String>,
}

impl UnitOutput {
    /// Creates an empty result for `unit`.
    pub fn new(unit: &SourceUnit) -> Self {
        Self {
            unit: unit.id.clone(),
            path: unit.path.clone(),
            artifacts: Vec::new(),
            diagnostics: Vec::new(),
            references: ReferenceReport::new(),
            dependencies: BTreeSet::new(),
        }
    }
}

/// The result of one backend invocation.
#[derive(Clone, Debug, Default)]
pub struct CompileOutput {
    /// Per-unit results; may include units pulled in from the source path.
    pub units: Vec<UnitOutput>,
}

/// A failure of the backend as a whole, as opposed to a diagnostic.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// A source file could not be read.
    #[error("cannot read source {path}: {source}")]
    Io {
        /// The source file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The backend gave up.
    #[error("backend failed: {reason}")]
    Failed {
        /// Why it failed.
        reason: String,
    },
}

/// A compiler the scheduler can drive.
pub trait CompilerBackend {
    /// The name the backend is registered under.
    fn name(&self) -> &str;

    /// File extension of the sources this backend compiles, without the dot.
    fn source_extension(&self) -> &str;

    /// Compiles a batch of units.
    fn compile(&mut self, request: CompileRequest<'_>) -> Result<CompileOutput, BackendError>;
}

/// Settings handed to backend factories.
#[derive(Clone, Debug)]
pub struct BackendOptions {
    /// The project's source roots.
    pub source_roots: Vec<PathBuf>,
    /// Whether uses of deprecated types produce warnings.
    pub deprecation_warnings: bool,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            source_roots: Vec::new(),
            deprecation_warnings: true,
        }
    }
}

/// Creates a backend from options.
pub type BackendFactory = fn(&BackendOptions) -> Box<dyn CompilerBackend>;

/// Named backend factories.
#[derive(Default)]
pub struct BackendRegistry {
    factories: BTreeMap<String, BackendFactory>,
}

impl BackendRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `name`, replacing any earlier one.
    pub fn register(&mut self, name: &str, factory: BackendFactory) {
        self.factories.insert(name.to_string(), factory);
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Creates the backend registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::UnknownBackend`] if nothing is registered
    /// under `name`.
    pub fn create(
        &self,
        name: &str,
        options: &BackendOptions,
    ) -> Result<Box<dyn CompilerBackend>, CompileError> {
        match self.factories.get(name) {
            Some(factory) => Ok(factory(options)),
            None => Err(CompileError::UnknownBackend {
                name: name.to_string(),
                available: self.names().collect::<Vec<_>>().join(", "),
            }),
        }
    }
}
