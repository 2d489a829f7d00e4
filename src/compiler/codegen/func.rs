use inkwell::values::FunctionValue;
use tracing::debug;

use crate::ast::{Block, Funktion};
use crate::errors::{OpalError, Result};

use super::symbols::{Binding, Frame};
use super::types::TypeDesc;
use super::{CodeGen, Typed};

/// Name of the implicit entry function wrapping top-level statements.
pub const ENTRY_FUNCTION: &str = "main";

impl<'a, 'ctx> CodeGen<'a, 'ctx> {
    /// Emit the body of a method declared by the class metadata pass.
    ///
    /// Parameter 0 is the instance and is bound as `self`. Constructors
    /// install the class vtable before running their body.
    pub(crate) fn lower_method(&mut self, class: &str, func: &Funktion) -> Result<()> {
        let symbol = format!("{class}::{}", func.name);
        let (function, params, ret, vtable) = {
            let info = self
                .classes
                .get(class)
                .ok_or_else(|| OpalError::UndefinedFunction(symbol.clone()))?;
            let method = info
                .method(&func.name)
                .ok_or_else(|| OpalError::UndefinedFunction(symbol.clone()))?;
            (method.function, method.params.clone(), method.ret.clone(), info.vtable)
        };

        self.begin_function(function, &ret)?;

        let this = function
            .get_nth_param(0)
            .ok_or_else(|| OpalError::Unsupported(format!("{symbol} is missing its instance parameter")))?
            .into_pointer_value();
        this.set_name("this");

        if func.is_constructor {
            let instance_type = self
                .classes
                .get(class)
                .map(|info| info.instance_type)
                .ok_or_else(|| OpalError::UndefinedFunction(symbol.clone()))?;
            let slot = self.builder.build_struct_gep(instance_type, this, 0, "vtable.slot")?;
            self.builder.build_store(slot, vtable.as_pointer_value())?;
        }

        self.frame_mut()?.bind(
            "self",
            Binding { ptr: this, ty: TypeDesc::Class(class.to_string()), direct: true },
        );

        for (i, (param, ty)) in func.params.iter().zip(&params).enumerate() {
            let arg = function.get_nth_param(i as u32 + 1).ok_or_else(|| {
                OpalError::Unsupported(format!("{symbol} is missing parameter '{}'", param.name))
            })?;
            arg.set_name(&param.name);
            self.define(&param.name, Typed::new(arg, ty.clone()), false)?;
        }

        self.lower_block(&func.body)?;
        self.finish_function()?;
        debug!(method = %symbol, "lowered method");
        Ok(())
    }

    /// Emit `void main()` from the top-level statements.
    pub(crate) fn lower_main(&mut self, block: &Block) -> Result<()> {
        let fn_type = self.context.void_type().fn_type(&[], false);
        let function = self.module.add_function(ENTRY_FUNCTION, fn_type, None);

        self.begin_function(function, &TypeDesc::Void)?;
        self.lower_block(block)?;
        self.finish_function()
    }

    /// Create the entry and exit blocks, the return slot and a fresh frame.
    fn begin_function(&mut self, function: FunctionValue<'ctx>, ret: &TypeDesc) -> Result<()> {
        let entry = self.context.append_basic_block(function, "entry");
        let exit = self.context.append_basic_block(function, "exit");
        self.builder.position_at_end(entry);
        self.enter_frame(Frame::new(function, exit));

        if let Some(ret_ty) = ret.basic_type(self.context) {
            let slot = self.entry_alloca(ret_ty, "retval")?;
            self.builder.build_store(slot, ret_ty.const_zero())?;
            self.frame_mut()?.ret_slot = Some((slot, ret.clone()));
        }
        Ok(())
    }

    /// Close the open block, move `exit` last and emit the single return.
    fn finish_function(&mut self) -> Result<()> {
        let frame = self
            .leave_frame()
            .ok_or_else(|| OpalError::Unsupported("no function is being emitted".into()))?;

        self.branch_if_open(frame.exit)?;

        if let Some(last) = frame.function.get_last_basic_block() {
            if last != frame.exit {
                frame
                    .exit
                    .move_after(last)
                    .map_err(|_| OpalError::Unsupported("could not reorder exit block".into()))?;
            }
        }

        self.builder.position_at_end(frame.exit);
        match frame.ret_slot {
            Some((slot, ty)) => {
                let ret_ty = ty
                    .basic_type(self.context)
                    .ok_or_else(|| OpalError::Unsupported("return slot without a type".into()))?;
                let value = self.builder.build_load(ret_ty, slot, "ret")?;
                self.builder.build_return(Some(&value))?;
            }
            None => {
                self.builder.build_return(None)?;
            }
        }
        Ok(())
    }
}
