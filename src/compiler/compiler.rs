//! LLVM-backed compiler for the Opal language.
//!
//! This is the top-level coordinator. The heavy lifting is split across:
//!
//! - [`codegen`](super::codegen) AST to LLVM IR lowering
//! - [`jit`](super::jit) in-process execution of the finished module

use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::Module;
use tracing::debug;

use crate::ast::Program;
use crate::errors::{OpalError, Result};

use super::codegen::CodeGen;

/// Holds LLVM state for a single compilation unit.
pub struct Compiler<'ctx> {
    pub(crate) context: &'ctx Context,
    pub(crate) module: Module<'ctx>,
    pub(crate) builder: Builder<'ctx>,
}

impl<'ctx> Compiler<'ctx> {
    /// Create a new compiler targeting the given LLVM module name.
    pub fn new(context: &'ctx Context, module_name: &str) -> Self {
        let module = context.create_module(module_name);
        let builder = context.create_builder();
        Self { context, module, builder }
    }

    // ── codegen entry point ─────────────────────────────────────

    /// Lower a full [`Program`] to LLVM IR and verify the result.
    pub fn compile(&self, program: &Program) -> Result<()> {
        let mut codegen = CodeGen::new(self.context, &self.module, &self.builder);
        codegen.generate(program)?;
        self.verify()?;
        debug!(module = %self.module.get_name().to_string_lossy(), "module verified");
        Ok(())
    }

    /// Run LLVM's module verifier.
    pub fn verify(&self) -> Result<()> {
        self.module
            .verify()
            .map_err(|msg| OpalError::Verify(msg.to_string()))
    }

    // ── output helpers ──────────────────────────────────────────

    /// Dump the LLVM IR to stderr.
    pub fn dump_ir(&self) {
        self.module.print_to_stderr();
    }

    /// Return the LLVM IR as a string.
    pub fn ir_string(&self) -> String {
        self.module.print_to_string().to_string()
    }

    pub fn module(&self) -> &Module<'ctx> {
        &self.module
    }
}
