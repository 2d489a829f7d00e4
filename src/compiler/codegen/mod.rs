//! Code generation: walks the AST and emits LLVM IR.

use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::{Linkage, Module};
use inkwell::types::{BasicTypeEnum, PointerType};
use inkwell::values::{BasicMetadataValueEnum, BasicValueEnum, FunctionValue, PointerValue, ValueKind};
use inkwell::AddressSpace;
use tracing::debug;

use crate::ast::Program;
use crate::errors::{OpalError, Result};

pub mod classes;
pub mod expr;
pub mod func;
pub mod runtime;
pub mod stmt;
pub mod symbols;
pub mod types;

pub use classes::{order_classes, ClassInfo, ClassRegistry, MethodInfo};
pub use runtime::{declare_runtime, runtime_symbols};
pub use types::TypeDesc;

use symbols::Frame;

/// A lowered value together with its source-level type.
#[derive(Debug, Clone)]
pub struct Typed<'ctx> {
    pub value: BasicValueEnum<'ctx>,
    pub ty: TypeDesc,
}

impl<'ctx> Typed<'ctx> {
    pub fn new(value: impl Into<BasicValueEnum<'ctx>>, ty: TypeDesc) -> Self {
        Self { value: value.into(), ty }
    }
}

/// Emission context for one module.
///
/// Holds the class registry and the frame of the function being emitted.
/// One instance lowers one program in a single pass.
pub struct CodeGen<'a, 'ctx> {
    pub(crate) context: &'ctx Context,
    pub(crate) module: &'a Module<'ctx>,
    pub(crate) builder: &'a Builder<'ctx>,
    pub(crate) classes: ClassRegistry<'ctx>,
    frame: Option<Frame<'ctx>>,
}

impl<'a, 'ctx> CodeGen<'a, 'ctx> {
    pub fn new(context: &'ctx Context, module: &'a Module<'ctx>, builder: &'a Builder<'ctx>) -> Self {
        Self {
            context,
            module,
            builder,
            classes: ClassRegistry::default(),
            frame: None,
        }
    }

    /// Lower a whole program: runtime declarations, class metadata,
    /// method bodies and finally `main`.
    pub fn generate(&mut self, program: &Program) -> Result<()> {
        declare_runtime(self.context, self.module);

        let declared = program.classes();
        let ordered = order_classes(&declared)?;
        for klass in &ordered {
            self.declare_class(klass)?;
        }
        for klass in &ordered {
            for func in klass.functions() {
                self.lower_method(&klass.name, func)?;
            }
        }

        self.lower_main(&program.block)
    }

    // ── frame access ────────────────────────────────────────────

    pub(crate) fn frame(&self) -> Result<&Frame<'ctx>> {
        self.frame
            .as_ref()
            .ok_or_else(|| OpalError::Unsupported("statement outside of a function".into()))
    }

    pub(crate) fn frame_mut(&mut self) -> Result<&mut Frame<'ctx>> {
        self.frame
            .as_mut()
            .ok_or_else(|| OpalError::Unsupported("statement outside of a function".into()))
    }

    pub(crate) fn enter_frame(&mut self, frame: Frame<'ctx>) {
        self.frame = Some(frame);
    }

    pub(crate) fn leave_frame(&mut self) -> Option<Frame<'ctx>> {
        self.frame.take()
    }

    // ── helpers ─────────────────────────────────────────────────

    pub(crate) fn ptr_type(&self) -> PointerType<'ctx> {
        self.context.ptr_type(AddressSpace::default())
    }

    pub(crate) fn current_block(&self) -> Result<BasicBlock<'ctx>> {
        self.builder
            .get_insert_block()
            .ok_or_else(|| OpalError::Unsupported("builder has no insertion block".into()))
    }

    /// Whether the current block already ends in a terminator.
    pub(crate) fn block_terminated(&self) -> bool {
        self.builder
            .get_insert_block()
            .is_some_and(|bb| bb.get_terminator().is_some())
    }

    /// Branch to `target` unless the current block is already closed.
    pub(crate) fn branch_if_open(&self, target: BasicBlock<'ctx>) -> Result<()> {
        if !self.block_terminated() {
            self.builder.build_unconditional_branch(target)?;
        }
        Ok(())
    }

    pub(crate) fn append_block(&self, name: &str) -> Result<BasicBlock<'ctx>> {
        Ok(self.context.append_basic_block(self.frame()?.function, name))
    }

    /// Allocate a stack slot in the entry block of the current function.
    pub(crate) fn entry_alloca(&self, ty: BasicTypeEnum<'ctx>, name: &str) -> Result<PointerValue<'ctx>> {
        let function = self.frame()?.function;
        let entry = function
            .get_first_basic_block()
            .ok_or_else(|| OpalError::Unsupported(format!("function {name} has no entry block")))?;

        let alloca_builder = self.context.create_builder();
        match entry.get_first_instruction() {
            Some(first) => alloca_builder.position_before(&first),
            None => alloca_builder.position_at_end(entry),
        }
        Ok(alloca_builder.build_alloca(ty, name)?)
    }

    /// Pointer to a NUL-terminated constant holding `text`.
    ///
    /// The global is named after a hash of its contents, so each distinct
    /// string is emitted once per module.
    pub(crate) fn intern_string(&self, text: &str) -> PointerValue<'ctx> {
        let hash = blake3::hash(text.as_bytes()).to_hex();
        let name = format!("str_{}", &hash.as_str()[..16]);

        if let Some(existing) = self.module.get_global(&name) {
            return existing.as_pointer_value();
        }

        let value = self.context.const_string(text.as_bytes(), true);
        let global = self.module.add_global(value.get_type(), None, &name);
        global.set_initializer(&value);
        global.set_constant(true);
        global.set_linkage(Linkage::Private);
        global.set_unnamed_addr(true);
        debug!(symbol = %name, "interned string");
        global.as_pointer_value()
    }

    /// Call `function`, returning its value unless it is void.
    pub(crate) fn call(
        &self,
        function: FunctionValue<'ctx>,
        args: &[BasicMetadataValueEnum<'ctx>],
        label: &str,
    ) -> Result<Option<BasicValueEnum<'ctx>>> {
        // Void results cannot carry a name.
        let label = if function.get_type().get_return_type().is_some() { label } else { "" };
        let call = self.builder.build_call(function, args, label)?;
        Ok(match call.try_as_basic_value() {
            ValueKind::Basic(val) => Some(val),
            ValueKind::Instruction(_) => None,
        })
    }

    /// Call a declared runtime function by symbol.
    pub(crate) fn call_runtime(
        &self,
        name: &str,
        args: &[BasicMetadataValueEnum<'ctx>],
        label: &str,
    ) -> Result<Option<BasicValueEnum<'ctx>>> {
        let function = self
            .module
            .get_function(name)
            .ok_or_else(|| OpalError::UndefinedFunction(name.to_string()))?;
        self.call(function, args, label)
    }

    /// Like [`call_runtime`](Self::call_runtime) for functions that return a value.
    pub(crate) fn call_runtime_value(
        &self,
        name: &str,
        args: &[BasicMetadataValueEnum<'ctx>],
        label: &str,
    ) -> Result<BasicValueEnum<'ctx>> {
        self.call_runtime(name, args, label)?
            .ok_or_else(|| OpalError::Unsupported(format!("runtime function {name} returns no value")))
    }
}
