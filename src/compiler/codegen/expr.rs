use inkwell::values::{BasicMetadataValueEnum, BasicValueEnum, FloatValue, IntValue};
use inkwell::{FloatPredicate, IntPredicate};

use crate::ast::{BinOperator, Comparison, Node, Value};
use crate::errors::{OpalError, Result};

use super::types::{vector_struct, TypeDesc};
use super::{CodeGen, Typed};

impl<'a, 'ctx> CodeGen<'a, 'ctx> {
    /// Lower an expression that must produce a value.
    pub(crate) fn lower_expr(&mut self, node: &Node) -> Result<Typed<'ctx>> {
        match node {
            Node::Value(value) => Ok(self.lower_value(value)),
            Node::Var(name) | Node::VarValue(name) => self.load_variable(name),
            Node::BinaryOp { op: BinOperator::Assign, .. } => {
                Err(OpalError::Unsupported("assignment cannot be used as a value".into()))
            }
            Node::BinaryOp { op: BinOperator::Comparison(cmp), lhs, rhs } => {
                self.lower_comparison(*cmp, lhs, rhs)
            }
            Node::BinaryOp { op, lhs, rhs } => self.lower_arithmetic(*op, lhs, rhs),
            Node::List(items) => self.lower_list(items),
            Node::IndexOf { list, index } => self.lower_index(list, index),
            Node::Call { class_name, args } => self.lower_instantiation(class_name, args, "instance"),
            Node::MethodCall { instance, method, args } => self
                .lower_method_call(instance, method, args)?
                .ok_or_else(|| {
                    OpalError::Unsupported(format!("{instance}.{method}() does not return a value"))
                }),
            other => Err(OpalError::Unsupported(format!(
                "{} cannot be used as a value",
                other.kind_name()
            ))),
        }
    }

    pub(crate) fn lower_value(&self, value: &Value) -> Typed<'ctx> {
        match value {
            Value::Integer(v) => {
                Typed::new(self.context.i32_type().const_int(*v as u64, true), TypeDesc::Int32)
            }
            Value::Float(v) => Typed::new(self.context.f64_type().const_float(*v), TypeDesc::Float64),
            Value::Bool(v) => {
                Typed::new(self.context.bool_type().const_int(u64::from(*v), false), TypeDesc::Bool)
            }
            Value::String(s) => Typed::new(self.intern_string(s), TypeDesc::String),
        }
    }

    pub(crate) fn load_variable(&self, name: &str) -> Result<Typed<'ctx>> {
        let binding = self
            .frame()?
            .lookup(name)
            .cloned()
            .ok_or_else(|| OpalError::UndefinedVariable(name.to_string()))?;

        if binding.direct {
            return Ok(Typed::new(binding.ptr, binding.ty));
        }

        let ty = binding
            .ty
            .basic_type(self.context)
            .ok_or_else(|| OpalError::Unsupported(format!("variable '{name}' has no value")))?;
        let value = self.builder.build_load(ty, binding.ptr, name)?;
        Ok(Typed { value, ty: binding.ty })
    }

    // ── numeric dispatch ────────────────────────────────────────

    /// Both operands are 32-bit integers; anything else takes the float path.
    fn both_i32(lhs: &Typed<'ctx>, rhs: &Typed<'ctx>) -> bool {
        let is_i32 = |t: &Typed<'ctx>| {
            t.value.is_int_value() && t.value.into_int_value().get_type().get_bit_width() == 32
        };
        is_i32(lhs) && is_i32(rhs)
    }

    fn lower_arithmetic(&mut self, op: BinOperator, lhs: &Node, rhs: &Node) -> Result<Typed<'ctx>> {
        let lhs = self.lower_expr(lhs)?;
        let rhs = self.lower_expr(rhs)?;

        if Self::both_i32(&lhs, &rhs) {
            let (l, r) = (lhs.value.into_int_value(), rhs.value.into_int_value());
            let value = match op {
                BinOperator::Add => self.builder.build_int_add(l, r, "add")?,
                BinOperator::Sub => self.builder.build_int_sub(l, r, "sub")?,
                BinOperator::Mul => self.builder.build_int_mul(l, r, "mul")?,
                BinOperator::Div => self.builder.build_int_signed_div(l, r, "div")?,
                other => return Err(unsupported_operator(other)),
            };
            return Ok(Typed::new(value, TypeDesc::Int32));
        }

        let l = self.to_float(lhs)?;
        let r = self.to_float(rhs)?;
        match op {
            BinOperator::Add => Ok(Typed::new(self.builder.build_float_add(l, r, "fadd")?, TypeDesc::Float64)),
            BinOperator::Sub => Ok(Typed::new(self.builder.build_float_sub(l, r, "fsub")?, TypeDesc::Float64)),
            BinOperator::Mul => Ok(Typed::new(self.builder.build_float_mul(l, r, "fmul")?, TypeDesc::Float64)),
            BinOperator::Div => {
                // Float division goes through 64-bit integers.
                let i64_ty = self.context.i64_type();
                let li = self.builder.build_float_to_signed_int(l, i64_ty, "div.lhs")?;
                let ri = self.builder.build_float_to_signed_int(r, i64_ty, "div.rhs")?;
                let quotient = self.builder.build_int_unsigned_div(li, ri, "fdiv")?;
                let narrowed = self.builder.build_int_truncate(quotient, self.context.i32_type(), "fdiv.i32")?;
                Ok(Typed::new(narrowed, TypeDesc::Int32))
            }
            other => Err(unsupported_operator(other)),
        }
    }

    fn lower_comparison(&mut self, cmp: Comparison, lhs: &Node, rhs: &Node) -> Result<Typed<'ctx>> {
        let lhs = self.lower_expr(lhs)?;
        let rhs = self.lower_expr(rhs)?;

        if Self::both_i32(&lhs, &rhs) {
            let predicate = match cmp {
                Comparison::Eq  => IntPredicate::EQ,
                Comparison::Neq => IntPredicate::NE,
                Comparison::Gt  => IntPredicate::SGT,
                Comparison::Gte => IntPredicate::SGE,
                Comparison::Lt  => IntPredicate::SLT,
                Comparison::Lte => IntPredicate::SLE,
            };
            let value = self.builder.build_int_compare(
                predicate,
                lhs.value.into_int_value(),
                rhs.value.into_int_value(),
                "cmp",
            )?;
            return Ok(Typed::new(value, TypeDesc::Bool));
        }

        let predicate = match cmp {
            Comparison::Eq  => FloatPredicate::OEQ,
            Comparison::Neq => FloatPredicate::ONE,
            Comparison::Gt  => FloatPredicate::OGT,
            Comparison::Gte => FloatPredicate::OGE,
            Comparison::Lt  => FloatPredicate::OLT,
            Comparison::Lte => FloatPredicate::OLE,
        };
        let l = self.to_float(lhs)?;
        let r = self.to_float(rhs)?;
        let value = self.builder.build_float_compare(predicate, l, r, "fcmp")?;
        Ok(Typed::new(value, TypeDesc::Bool))
    }

    fn to_float(&self, value: Typed<'ctx>) -> Result<FloatValue<'ctx>> {
        Ok(self.coerce(value, &TypeDesc::Float64)?.into_float_value())
    }

    // ── casts ───────────────────────────────────────────────────

    /// Cast an `if`/`while` condition to `i1`.
    pub(crate) fn cast_to_bool(&self, value: Typed<'ctx>) -> Result<IntValue<'ctx>> {
        match value.ty {
            TypeDesc::Bool => Ok(value.value.into_int_value()),
            TypeDesc::Int8 | TypeDesc::Int32 => {
                let v = value.value.into_int_value();
                Ok(self.builder.build_int_compare(IntPredicate::NE, v, v.get_type().const_zero(), "tobool")?)
            }
            TypeDesc::Float64 => {
                let v = value.value.into_float_value();
                Ok(self.builder.build_float_compare(FloatPredicate::ONE, v, v.get_type().const_zero(), "tobool")?)
            }
            other => Err(OpalError::UnsupportedCast { from: other.to_string(), to: "Bool".into() }),
        }
    }

    /// Convert `value` so it can be stored or passed as `target`.
    pub(crate) fn coerce(&self, value: Typed<'ctx>, target: &TypeDesc) -> Result<BasicValueEnum<'ctx>> {
        if &value.ty == target || (value.ty.is_pointer() && target.is_pointer()) {
            return Ok(value.value);
        }

        let unsupported = || OpalError::UnsupportedCast {
            from: value.ty.to_string(),
            to: target.to_string(),
        };

        let b = self.builder;
        let converted: BasicValueEnum = match (&value.ty, target) {
            (TypeDesc::Bool | TypeDesc::Int8 | TypeDesc::Int32, to) if to.is_pointer() => {
                b.build_int_to_ptr(value.value.into_int_value(), self.ptr_type(), "itop")?.into()
            }
            (TypeDesc::Bool, TypeDesc::Int8 | TypeDesc::Int32) => {
                let int_ty = target.basic_type(self.context).ok_or_else(unsupported)?.into_int_type();
                b.build_int_z_extend(value.value.into_int_value(), int_ty, "zext")?.into()
            }
            (TypeDesc::Int8, TypeDesc::Int32) => {
                b.build_int_s_extend(value.value.into_int_value(), self.context.i32_type(), "sext")?.into()
            }
            (TypeDesc::Int32, TypeDesc::Int8) => {
                b.build_int_truncate(value.value.into_int_value(), self.context.i8_type(), "trunc")?.into()
            }
            (TypeDesc::Int8 | TypeDesc::Int32, TypeDesc::Float64) => {
                b.build_signed_int_to_float(value.value.into_int_value(), self.context.f64_type(), "sitofp")?.into()
            }
            (TypeDesc::Bool, TypeDesc::Float64) => {
                b.build_unsigned_int_to_float(value.value.into_int_value(), self.context.f64_type(), "uitofp")?.into()
            }
            (TypeDesc::Float64, TypeDesc::Int8 | TypeDesc::Int32) => {
                let int_ty = target.basic_type(self.context).ok_or_else(unsupported)?.into_int_type();
                b.build_float_to_signed_int(value.value.into_float_value(), int_ty, "fptosi")?.into()
            }
            _ => return Err(unsupported()),
        };
        Ok(converted)
    }

    // ── lists ───────────────────────────────────────────────────

    fn lower_list(&mut self, items: &[Node]) -> Result<Typed<'ctx>> {
        // One slot per literal. Re-running the literal in a loop reinitialises
        // the slot and leaks the previous buffer; nothing is ever collected.
        let vector = self.entry_alloca(vector_struct(self.context).into(), "list")?;
        self.call_runtime("vector_init", &[vector.into()], "")?;

        for item in items {
            let element = self.lower_expr(item)?;
            if !element.ty.is_integer() {
                return Err(OpalError::Unsupported(format!(
                    "lists can only hold integers, found {}",
                    element.ty
                )));
            }
            let boxed = self.coerce(element, &TypeDesc::Class("Object".into()))?;
            self.call_runtime("vector_append", &[vector.into(), boxed.into()], "")?;
        }

        Ok(Typed::new(vector, TypeDesc::Vector))
    }

    fn lower_index(&mut self, list: &Node, index: &Node) -> Result<Typed<'ctx>> {
        let list = self.lower_expr(list)?;
        if list.ty != TypeDesc::Vector {
            return Err(OpalError::Unsupported(format!("cannot index into {}", list.ty)));
        }
        let index = self.lower_expr(index)?;
        let index = self.coerce(index, &TypeDesc::Int32)?;
        self.vector_element(list.value, index)
    }

    /// Read element `index` of a vector as an `i32`.
    pub(crate) fn vector_element(
        &self,
        vector: BasicValueEnum<'ctx>,
        index: BasicValueEnum<'ctx>,
    ) -> Result<Typed<'ctx>> {
        let raw = self.call_runtime_value("vector_get", &[vector.into(), index.into()], "elem")?;
        let value = self
            .builder
            .build_ptr_to_int(raw.into_pointer_value(), self.context.i32_type(), "elem.i32")?;
        Ok(Typed::new(value, TypeDesc::Int32))
    }

    // ── objects ─────────────────────────────────────────────────

    /// Allocate an instance of `class_name` on the stack and run its `init`.
    pub(crate) fn lower_instantiation(
        &mut self,
        class_name: &str,
        args: &[Node],
        slot_name: &str,
    ) -> Result<Typed<'ctx>> {
        let symbol = format!("{class_name}::init");
        let (instance_type, init, params) = {
            let info = self
                .classes
                .get(class_name)
                .ok_or_else(|| OpalError::UndefinedFunction(symbol.clone()))?;
            let init = info
                .method("init")
                .ok_or_else(|| OpalError::UndefinedFunction(symbol.clone()))?;
            (info.instance_type, init.function, init.params.clone())
        };

        let instance = self.entry_alloca(instance_type.into(), slot_name)?;
        let mut call_args: Vec<BasicMetadataValueEnum> = vec![instance.into()];
        call_args.extend(self.lower_args(&symbol, &params, args)?);
        self.call(init, &call_args, "")?;

        Ok(Typed::new(instance, TypeDesc::Class(class_name.to_string())))
    }

    /// Call a method on the object bound to `instance`, resolved statically.
    pub(crate) fn lower_method_call(
        &mut self,
        instance: &str,
        method: &str,
        args: &[Node],
    ) -> Result<Option<Typed<'ctx>>> {
        let receiver = self.load_variable(instance)?;
        let class = match &receiver.ty {
            TypeDesc::Class(class) => class.clone(),
            other => {
                return Err(OpalError::Unsupported(format!(
                    "'{instance}' is a {other}, not an object"
                )))
            }
        };

        let symbol = format!("{class}::{method}");
        let (function, params, ret) = {
            let found = self
                .classes
                .resolve_method(&class, method)
                .ok_or_else(|| OpalError::UndefinedFunction(symbol.clone()))?;
            (found.function, found.params.clone(), found.ret.clone())
        };

        let mut call_args: Vec<BasicMetadataValueEnum> = vec![receiver.value.into()];
        call_args.extend(self.lower_args(&symbol, &params, args)?);
        let result = self.call(function, &call_args, method)?;
        Ok(result.map(|value| Typed { value, ty: ret }))
    }

    fn lower_args(
        &mut self,
        callee: &str,
        params: &[TypeDesc],
        args: &[Node],
    ) -> Result<Vec<BasicMetadataValueEnum<'ctx>>> {
        if params.len() != args.len() {
            return Err(OpalError::Unsupported(format!(
                "{callee} expects {} argument(s), got {}",
                params.len(),
                args.len()
            )));
        }

        let mut lowered = Vec::with_capacity(args.len());
        for (arg, param) in args.iter().zip(params) {
            let value = self.lower_expr(arg)?;
            lowered.push(self.coerce(value, param)?.into());
        }
        Ok(lowered)
    }
}

fn unsupported_operator(op: BinOperator) -> OpalError {
    OpalError::Unsupported(format!("operator '{}' is not supported here", op.symbol()))
}
