//! Per-function symbol frames.

use std::collections::HashMap;

use inkwell::basic_block::BasicBlock;
use inkwell::values::{FunctionValue, PointerValue};

use super::types::TypeDesc;

/// Where a variable lives and what it holds.
#[derive(Debug, Clone)]
pub struct Binding<'ctx> {
    pub ptr: PointerValue<'ctx>,
    pub ty: TypeDesc,
    /// `ptr` is the value itself (an instance or `self`), not a slot to load from.
    pub direct: bool,
}

/// Jump targets of an enclosing loop.
#[derive(Debug, Clone, Copy)]
pub struct LoopTarget<'ctx> {
    pub continue_to: BasicBlock<'ctx>,
    pub break_to: BasicBlock<'ctx>,
}

/// Mutable state of the function currently being emitted.
pub struct Frame<'ctx> {
    pub function: FunctionValue<'ctx>,
    pub exit: BasicBlock<'ctx>,
    /// Slot the shared exit block returns from, with its declared type.
    pub ret_slot: Option<(PointerValue<'ctx>, TypeDesc)>,
    symbols: HashMap<String, Binding<'ctx>>,
    loops: Vec<LoopTarget<'ctx>>,
}

impl<'ctx> Frame<'ctx> {
    pub fn new(function: FunctionValue<'ctx>, exit: BasicBlock<'ctx>) -> Self {
        Self {
            function,
            exit,
            ret_slot: None,
            symbols: HashMap::new(),
            loops: Vec::new(),
        }
    }

    pub fn bind(&mut self, name: &str, binding: Binding<'ctx>) {
        self.symbols.insert(name.to_string(), binding);
    }

    pub fn lookup(&self, name: &str) -> Option<&Binding<'ctx>> {
        self.symbols.get(name)
    }

    pub fn lookup_type(&self, name: &str) -> Option<&TypeDesc> {
        self.symbols.get(name).map(|b| &b.ty)
    }

    pub fn push_loop(&mut self, continue_to: BasicBlock<'ctx>, break_to: BasicBlock<'ctx>) {
        self.loops.push(LoopTarget { continue_to, break_to });
    }

    pub fn pop_loop(&mut self) {
        self.loops.pop();
    }

    /// The innermost loop, if any.
    pub fn current_loop(&self) -> Option<LoopTarget<'ctx>> {
        self.loops.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkwell::context::Context;

    #[test]
    fn rebinding_replaces_the_entry() {
        let context = Context::create();
        let module = context.create_module("symbols");
        let builder = context.create_builder();
        let function = module.add_function("main", context.void_type().fn_type(&[], false), None);
        let entry = context.append_basic_block(function, "entry");
        let exit = context.append_basic_block(function, "exit");
        builder.position_at_end(entry);
        let slot = builder.build_alloca(context.i32_type(), "a").unwrap();

        let mut frame = Frame::new(function, exit);
        assert!(frame.lookup("a").is_none());

        frame.bind("a", Binding { ptr: slot, ty: TypeDesc::Int32, direct: false });
        assert_eq!(frame.lookup_type("a"), Some(&TypeDesc::Int32));

        frame.bind("a", Binding { ptr: slot, ty: TypeDesc::Bool, direct: true });
        assert_eq!(frame.lookup_type("a"), Some(&TypeDesc::Bool));
        assert!(frame.lookup("a").unwrap().direct);
    }

    #[test]
    fn loops_resolve_innermost_first() {
        let context = Context::create();
        let module = context.create_module("loops");
        let function = module.add_function("main", context.void_type().fn_type(&[], false), None);
        let exit = context.append_basic_block(function, "exit");
        let outer_cond = context.append_basic_block(function, "outer.cond");
        let outer_end = context.append_basic_block(function, "outer.end");
        let inner_cond = context.append_basic_block(function, "inner.cond");
        let inner_end = context.append_basic_block(function, "inner.end");

        let mut frame = Frame::new(function, exit);
        assert!(frame.current_loop().is_none());

        frame.push_loop(outer_cond, outer_end);
        frame.push_loop(inner_cond, inner_end);
        assert_eq!(frame.current_loop().unwrap().break_to, inner_end);

        frame.pop_loop();
        assert_eq!(frame.current_loop().unwrap().continue_to, outer_cond);
    }
}
