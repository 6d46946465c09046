//! The `decl` compiler backend.

use tern_compile::{
    BackendError, BackendOptions, BackendRegistry, CompileOutput, CompileRequest, CompilerBackend,
};

use crate::batch::Batch;
use crate::codegen::compile_unit;

/// Name the backend is registered under.
pub const BACKEND_NAME: &str = "decl";

/// Extension of `decl` source files.
pub const SOURCE_EXTENSION: &str = "decl";

/// Compiles `.decl` units to type files.
#[derive(Clone, Debug)]
pub struct DeclBackend {
    deprecation_warnings: bool,
}

impl DeclBackend {
    /// Creates a backend configured by `options`.
    pub fn new(options: &BackendOptions) -> Self {
        Self {
            deprecation_warnings: options.deprecation_warnings,
        }
    }
}

impl Default for DeclBackend {
    fn default() -> Self {
        Self::new(&BackendOptions::default())
    }
}

impl CompilerBackend for DeclBackend {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    fn source_extension(&self) -> &str {
        SOURCE_EXTENSION
    }

    fn compile(&mut self, request: CompileRequest<'_>) -> Result<CompileOutput, BackendError> {
        let mut batch = Batch::new(request.environment);
        for unit in request.units {
            batch.add(unit)?;
        }
        // Units pulled in while compiling join the end of the batch.
        let mut output = CompileOutput::default();
        let mut next = 0;
        while next < batch.units.len() {
            output.units.push(compile_unit(&mut batch, next, self.deprecation_warnings)?);
            next += 1;
        }
        tracing::debug!(units = output.units.len(), "decl batch compiled");
        Ok(output)
    }
}

fn create(options: &BackendOptions) -> Box<dyn CompilerBackend> {
    Box::new(DeclBackend::new(options))
}

/// Registers the `decl` backend with `registry`.
pub fn register(registry: &mut BackendRegistry) {
    registry.register(BACKEND_NAME, create);
}
