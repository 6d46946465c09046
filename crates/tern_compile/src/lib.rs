//! Incremental compilation driven by structural change.
//!
//! The [`Scheduler`] decides which units to recompile after some of them,
//! or the classpath, changed. It queues changed units, compiles them
//! through a [`CompilerBackend`], compares the structural hashes of what
//! they produced with the previous build's, and queues every unit whose
//! [`ReferenceRecord`] matches a changed type, until nothing changes.

#![warn(missing_docs)]

pub mod backend;
pub mod environment;
pub mod error;
pub mod refs;
pub mod scheduler;
pub mod settings;
pub mod sources;
pub mod status;

pub use backend::{
    BackendError, BackendFactory, BackendOptions, BackendRegistry, CompileOutput, CompileRequest,
    CompilerBackend, NameEnvironment, ProducedArtifact, SourceUnit, TypeOrigin, UnitOutput,
};
pub use environment::BuildEnvironment;
pub use error::CompileError;
pub use refs::{ChangedType, ChangedTypes, ReferenceRecord, ReferenceReport};
pub use scheduler::{BuildOutcome, Scheduler, SchedulerPhase, CLASSPATH_DIGEST, CLASSPATH_FINGERPRINTS};
pub use settings::BuildSettings;
pub use sources::discover_sources;
pub use status::{inspect, StatusReport};
