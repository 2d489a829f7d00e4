//! In-process execution of a finished module through MCJIT.

use inkwell::module::Module;
use inkwell::targets::{InitializationConfig, Target};
use inkwell::OptimizationLevel;
use tracing::debug;

use crate::errors::{OpalError, Result};
use crate::runtime;

use super::codegen::func::ENTRY_FUNCTION;

type EntryFn = unsafe extern "C" fn();

/// Compile `module` to machine code and call its `main`.
///
/// Runtime functions are mapped to the Rust implementations in
/// [`crate::runtime`]; `malloc` and `free` resolve to the host C library.
pub fn run(module: &Module<'_>) -> Result<()> {
    Target::initialize_native(&InitializationConfig::default()).map_err(OpalError::Jit)?;

    let engine = module
        .create_jit_execution_engine(OptimizationLevel::None)
        .map_err(|e| OpalError::Jit(format!("could not create execution engine: {e}")))?;

    for (symbol, address) in runtime::symbol_table() {
        if let Some(function) = module.get_function(symbol) {
            engine.add_global_mapping(&function, address);
        }
    }

    // SAFETY: `main` is emitted as `void main()`, matching `EntryFn`.
    let entry = unsafe { engine.get_function::<EntryFn>(ENTRY_FUNCTION) }
        .map_err(|e| OpalError::Jit(format!("could not find {ENTRY_FUNCTION}: {e:?}")))?;

    debug!("running {ENTRY_FUNCTION}");
    // SAFETY: the module passed verification and every external it calls is mapped.
    unsafe { entry.call() };
    Ok(())
}
