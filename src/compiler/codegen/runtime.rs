use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::types::BasicMetadataTypeEnum;
use inkwell::AddressSpace;

/// Parameter types a runtime function can take.
#[derive(Clone, Copy)]
enum ParamKind { I32, Ptr }

/// Return type of a runtime function.
#[derive(Clone, Copy)]
enum RetKind { Void, I32, Ptr }

// (symbol, params, return, variadic)
const TABLE: &[(&str, &[ParamKind], RetKind, bool)] = &[
    ("malloc",        &[ParamKind::I32],                               RetKind::Ptr,  false),
    ("free",          &[ParamKind::Ptr],                               RetKind::Void, false),
    ("puts",          &[ParamKind::Ptr],                               RetKind::I32,  false),
    ("printf",        &[ParamKind::Ptr],                               RetKind::I32,  true),
    ("int_to_string", &[ParamKind::I32, ParamKind::Ptr, ParamKind::I32], RetKind::Ptr,  false),
    ("vector_init",   &[ParamKind::Ptr],                               RetKind::Void, false),
    ("vector_append", &[ParamKind::Ptr, ParamKind::Ptr],               RetKind::Void, false),
    ("vector_get",    &[ParamKind::Ptr, ParamKind::I32],               RetKind::Ptr,  false),
    ("vector_size",   &[ParamKind::Ptr],                               RetKind::I32,  false),
];

/// Declare the external runtime functions generated code may call.
///
/// Calls are resolved by symbol name, so a missing entry here surfaces
/// as an undefined-function error at the call site.
pub fn declare_runtime<'ctx>(context: &'ctx Context, module: &Module<'ctx>) {
    let ptr    = context.ptr_type(AddressSpace::default());
    let i32_ty = context.i32_type();
    let void   = context.void_type();

    for &(name, params, ret, var_args) in TABLE {
        if module.get_function(name).is_some() {
            continue;
        }

        let params: Vec<BasicMetadataTypeEnum> = params
            .iter()
            .map(|p| match p {
                ParamKind::I32 => i32_ty.into(),
                ParamKind::Ptr => ptr.into(),
            })
            .collect();

        let fn_type = match ret {
            RetKind::Void => void.fn_type(&params, var_args),
            RetKind::I32  => i32_ty.fn_type(&params, var_args),
            RetKind::Ptr  => ptr.fn_type(&params, var_args),
        };

        module.add_function(name, fn_type, None);
    }
}

/// Every symbol [`declare_runtime`] declares.
pub fn runtime_symbols() -> impl Iterator<Item = &'static str> {
    TABLE.iter().map(|&(name, ..)| name)
}
