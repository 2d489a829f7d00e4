use inkwell::IntPredicate;

use crate::ast::{BinOperator, Block, Node};
use crate::errors::{OpalError, Result};

use super::symbols::Binding;
use super::types::TypeDesc;
use super::{CodeGen, Typed};

/// Bytes reserved for an `i32` rendered in base 10, sign and NUL included.
const INT_BUFFER_LEN: u32 = 12;

impl<'a, 'ctx> CodeGen<'a, 'ctx> {
    /// Lower statements in order, stopping once the block is terminated by
    /// a `break`, `continue` or `return`.
    pub(crate) fn lower_block(&mut self, block: &Block) -> Result<()> {
        for stmt in &block.statements {
            if self.block_terminated() {
                break;
            }
            self.lower_statement(stmt)?;
        }
        Ok(())
    }

    fn lower_statement(&mut self, node: &Node) -> Result<()> {
        match node {
            // Lowered by the class metadata pass.
            Node::Klass(_) | Node::Funktion(_) => Ok(()),
            Node::Block(block) => self.lower_block(block),
            Node::BinaryOp { op: BinOperator::Assign, lhs, rhs } => self.lower_assign(lhs, rhs),
            Node::If { cond, then_, else_ } => self.lower_if(cond, then_, else_.as_ref()),
            Node::While { cond, body } => self.lower_while(cond, body),
            Node::For { var, iterable, body } => self.lower_for(var, iterable, body),
            Node::Break => self.lower_break(),
            Node::Continue => self.lower_continue(),
            Node::Return(value) => self.lower_return(value),
            Node::Print(value) => self.lower_print(value),
            Node::MethodCall { instance, method, args } => {
                self.lower_method_call(instance, method, args).map(|_| ())
            }
            other => self.lower_expr(other).map(|_| ()),
        }
    }

    // ── variables ───────────────────────────────────────────────

    fn lower_assign(&mut self, target: &Node, rhs: &Node) -> Result<()> {
        let name = match target {
            Node::Var(name) | Node::VarValue(name) => name,
            other => {
                return Err(OpalError::Unsupported(format!(
                    "cannot assign to {}",
                    other.kind_name()
                )))
            }
        };

        if let Node::Call { class_name, args } = rhs {
            let instance = self.lower_instantiation(class_name, args, name)?;
            return self.define(name, instance, true);
        }

        let value = self.lower_expr(rhs)?;
        self.define(name, value, false)
    }

    /// Bind `name` to `value`.
    ///
    /// With `is_class` the value is an instance pointer and is bound
    /// directly. Otherwise an existing slot is overwritten in place, or a
    /// new one is allocated in the entry block.
    pub(crate) fn define(&mut self, name: &str, value: Typed<'ctx>, is_class: bool) -> Result<()> {
        if is_class {
            let ptr = value.value.into_pointer_value();
            self.frame_mut()?.bind(name, Binding { ptr, ty: value.ty, direct: true });
            return Ok(());
        }

        if let Some(existing) = self.frame()?.lookup(name).cloned() {
            if !existing.direct {
                let stored = self.coerce(value, &existing.ty)?;
                self.builder.build_store(existing.ptr, stored)?;
                return Ok(());
            }
        }

        let storage = value
            .ty
            .basic_type(self.context)
            .ok_or_else(|| OpalError::Unsupported(format!("cannot assign a Void value to '{name}'")))?;
        let slot = self.entry_alloca(storage, name)?;
        self.builder.build_store(slot, value.value)?;
        self.frame_mut()?.bind(name, Binding { ptr: slot, ty: value.ty, direct: false });
        Ok(())
    }

    // ── control flow ────────────────────────────────────────────

    fn lower_if(&mut self, cond: &Node, then_: &Block, else_: Option<&Block>) -> Result<()> {
        let start = self.append_block("if.start")?;
        let on_true = self.append_block("if.true")?;
        let on_false = match else_ {
            Some(_) => Some(self.append_block("if.false")?),
            None => None,
        };
        let end = self.append_block("if.end")?;

        self.builder.build_unconditional_branch(start)?;
        self.builder.position_at_end(start);
        let cond = self.lower_expr(cond)?;
        let flag = self.cast_to_bool(cond)?;
        self.builder.build_conditional_branch(flag, on_true, on_false.unwrap_or(end))?;

        self.builder.position_at_end(on_true);
        self.lower_block(then_)?;
        self.branch_if_open(end)?;

        if let (Some(block), Some(body)) = (on_false, else_) {
            self.builder.position_at_end(block);
            self.lower_block(body)?;
            self.branch_if_open(end)?;
        }

        self.builder.position_at_end(end);
        Ok(())
    }

    fn lower_while(&mut self, cond: &Node, body: &Block) -> Result<()> {
        let cond_bb = self.append_block("while.cond")?;
        let body_bb = self.append_block("while.body")?;
        let end = self.append_block("while.end")?;

        self.builder.build_unconditional_branch(cond_bb)?;
        self.builder.position_at_end(cond_bb);
        let cond = self.lower_expr(cond)?;
        let flag = self.cast_to_bool(cond)?;
        self.builder.build_conditional_branch(flag, body_bb, end)?;

        self.builder.position_at_end(body_bb);
        self.frame_mut()?.push_loop(cond_bb, end);
        let lowered = self.lower_block(body);
        self.frame_mut()?.pop_loop();
        lowered?;
        self.branch_if_open(cond_bb)?;

        self.builder.position_at_end(end);
        Ok(())
    }

    /// Iterate a list through a hidden index. `continue` jumps to the
    /// increment block.
    fn lower_for(&mut self, var: &str, iterable: &Node, body: &Block) -> Result<()> {
        let init = self.append_block("for.init")?;
        let cond_bb = self.append_block("for.cond")?;
        let body_bb = self.append_block("for.body")?;
        let step = self.append_block("for.step")?;
        let end = self.append_block("for.end")?;
        let i32_ty = self.context.i32_type();

        self.builder.build_unconditional_branch(init)?;
        self.builder.position_at_end(init);
        let list = self.lower_expr(iterable)?;
        if list.ty != TypeDesc::Vector {
            return Err(OpalError::Unsupported(format!("cannot iterate over {}", list.ty)));
        }
        let index = self.entry_alloca(i32_ty.into(), "for.index")?;
        self.builder.build_store(index, i32_ty.const_zero())?;
        self.builder.build_unconditional_branch(cond_bb)?;

        self.builder.position_at_end(cond_bb);
        let current = self.builder.build_load(i32_ty, index, "for.i")?.into_int_value();
        let size = self
            .call_runtime_value("vector_size", &[list.value.into()], "for.size")?
            .into_int_value();
        let more = self.builder.build_int_compare(IntPredicate::SLT, current, size, "for.more")?;
        self.builder.build_conditional_branch(more, body_bb, end)?;

        self.builder.position_at_end(body_bb);
        let element = self.vector_element(list.value, current.into())?;
        self.define(var, element, false)?;
        self.frame_mut()?.push_loop(step, end);
        let lowered = self.lower_block(body);
        self.frame_mut()?.pop_loop();
        lowered?;
        self.branch_if_open(step)?;

        self.builder.position_at_end(step);
        let current = self.builder.build_load(i32_ty, index, "for.i")?.into_int_value();
        let next = self.builder.build_int_add(current, i32_ty.const_int(1, false), "for.next")?;
        self.builder.build_store(index, next)?;
        self.builder.build_unconditional_branch(cond_bb)?;

        self.builder.position_at_end(end);
        Ok(())
    }

    fn lower_break(&mut self) -> Result<()> {
        let target = self
            .frame()?
            .current_loop()
            .ok_or_else(|| OpalError::Unsupported("break outside of a loop".into()))?;
        self.builder.build_unconditional_branch(target.break_to)?;
        Ok(())
    }

    fn lower_continue(&mut self) -> Result<()> {
        let target = self
            .frame()?
            .current_loop()
            .ok_or_else(|| OpalError::Unsupported("continue outside of a loop".into()))?;
        self.builder.build_unconditional_branch(target.continue_to)?;
        Ok(())
    }

    /// Store into the return slot and jump to the shared exit block.
    fn lower_return(&mut self, value: &Node) -> Result<()> {
        let value = self.lower_expr(value)?;
        let frame = self.frame()?;
        let exit = frame.exit;
        let (slot, ty) = frame.ret_slot.clone().ok_or_else(|| {
            OpalError::Unsupported(format!(
                "{} has no return type and cannot return a value",
                frame.function.get_name().to_string_lossy()
            ))
        })?;

        let value = self.coerce(value, &ty)?;
        self.builder.build_store(slot, value)?;
        self.builder.build_unconditional_branch(exit)?;
        Ok(())
    }

    // ── output ──────────────────────────────────────────────────

    fn lower_print(&mut self, value: &Node) -> Result<()> {
        let value = self.lower_expr(value)?;
        match value.ty.clone() {
            TypeDesc::String => {
                self.call_runtime("puts", &[value.value.into()], "puts")?;
            }
            TypeDesc::Int8 | TypeDesc::Int32 => {
                let int = self.coerce(value, &TypeDesc::Int32)?;
                let buffer_ty = self.context.i8_type().array_type(INT_BUFFER_LEN);
                let buffer = self.entry_alloca(buffer_ty.into(), "int.buffer")?;
                let radix = self.context.i32_type().const_int(10, false);
                let text = self.call_runtime_value(
                    "int_to_string",
                    &[int.into(), buffer.into(), radix.into()],
                    "int.text",
                )?;
                self.call_runtime("puts", &[text.into()], "puts")?;
            }
            TypeDesc::Float64 => {
                let format = self.intern_string("%g\n");
                self.call_runtime("printf", &[format.into(), value.value.into()], "printf")?;
            }
            TypeDesc::Bool => {
                let flag = value.value.into_int_value();
                let yes = self.intern_string("true");
                let no = self.intern_string("false");
                let text = match flag.get_zero_extended_constant() {
                    Some(constant) if constant != 0 => yes,
                    Some(_) => no,
                    None => self.builder.build_select(flag, yes, no, "bool.text")?.into_pointer_value(),
                };
                self.call_runtime("puts", &[text.into()], "puts")?;
            }
            other => return Err(OpalError::CannotPrint(other.to_string())),
        }
        Ok(())
    }
}
