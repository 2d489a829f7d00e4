//! Type descriptors and their fixed LLVM representations.

use std::fmt;

use inkwell::context::Context;
use inkwell::types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum, FunctionType, StructType};
use inkwell::AddressSpace;

use crate::parser::ROOT_CLASS;

/// Name of the identified struct type backing every list. The dot keeps it
/// apart from class types, which are named after identifiers.
pub const VECTOR_TYPE: &str = "opal.vector";

/// A closed set of value types. Each maps to exactly one LLVM type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDesc {
    Void,
    Bool,
    Int8,
    Int32,
    Float64,
    /// Pointer to NUL-terminated bytes.
    String,
    /// Pointer to a runtime `{ i32 size, i32 capacity, ptr data }` vector.
    Vector,
    /// Pointer to an instance of the named class.
    Class(String),
}

impl TypeDesc {
    /// Resolve a source-level type name. Untyped parameters are objects.
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            Some("Cint32") | Some("Int")    => TypeDesc::Int32,
            Some("Cint8") | Some("Byte")    => TypeDesc::Int8,
            Some("Float") | Some("Double")  => TypeDesc::Float64,
            Some("Bool")                    => TypeDesc::Bool,
            Some("String")                  => TypeDesc::String,
            Some("Void")                    => TypeDesc::Void,
            Some(class)                     => TypeDesc::Class(class.to_string()),
            None                            => TypeDesc::Class(ROOT_CLASS.to_string()),
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, TypeDesc::String | TypeDesc::Vector | TypeDesc::Class(_))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, TypeDesc::Int8 | TypeDesc::Int32)
    }

    /// The storage type, or `None` for `Void`.
    pub fn basic_type<'ctx>(&self, context: &'ctx Context) -> Option<BasicTypeEnum<'ctx>> {
        match self {
            TypeDesc::Void    => None,
            TypeDesc::Bool    => Some(context.bool_type().into()),
            TypeDesc::Int8    => Some(context.i8_type().into()),
            TypeDesc::Int32   => Some(context.i32_type().into()),
            TypeDesc::Float64 => Some(context.f64_type().into()),
            TypeDesc::String | TypeDesc::Vector | TypeDesc::Class(_) => {
                Some(context.ptr_type(AddressSpace::default()).into())
            }
        }
    }

    /// A function type returning `self`.
    pub fn fn_type<'ctx>(
        &self,
        context: &'ctx Context,
        params: &[BasicMetadataTypeEnum<'ctx>],
        var_args: bool,
    ) -> FunctionType<'ctx> {
        match self.basic_type(context) {
            Some(ret) => ret.fn_type(params, var_args),
            None => context.void_type().fn_type(params, var_args),
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Void     => write!(f, "Void"),
            TypeDesc::Bool     => write!(f, "Bool"),
            TypeDesc::Int8     => write!(f, "Cint8"),
            TypeDesc::Int32    => write!(f, "Cint32"),
            TypeDesc::Float64  => write!(f, "Float"),
            TypeDesc::String   => write!(f, "String"),
            TypeDesc::Vector   => write!(f, "List"),
            TypeDesc::Class(n) => write!(f, "{n}"),
        }
    }
}

/// The struct layout shared with the runtime's vector functions.
pub fn vector_struct<'ctx>(context: &'ctx Context) -> StructType<'ctx> {
    if let Some(existing) = context.get_struct_type(VECTOR_TYPE) {
        return existing;
    }
    let i32_ty = context.i32_type();
    let ptr = context.ptr_type(AddressSpace::default());
    let vector = context.opaque_struct_type(VECTOR_TYPE);
    vector.set_body(&[i32_ty.into(), i32_ty.into(), ptr.into()], false);
    vector
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_type_names() {
        assert_eq!(TypeDesc::from_name(Some("Cint32")), TypeDesc::Int32);
        assert_eq!(TypeDesc::from_name(Some("Float")), TypeDesc::Float64);
        assert_eq!(TypeDesc::from_name(Some("Foo")), TypeDesc::Class("Foo".into()));
        assert_eq!(TypeDesc::from_name(None), TypeDesc::Class("Object".into()));
    }

    #[test]
    fn maps_to_fixed_llvm_types() {
        let context = Context::create();
        let i32_ty: BasicTypeEnum = context.i32_type().into();
        let ptr: BasicTypeEnum = context.ptr_type(AddressSpace::default()).into();
        assert_eq!(TypeDesc::Int32.basic_type(&context), Some(i32_ty));
        assert_eq!(TypeDesc::Class("Foo".into()).basic_type(&context), Some(ptr));
        assert_eq!(TypeDesc::Vector.basic_type(&context), Some(ptr));
        assert_eq!(TypeDesc::Void.basic_type(&context), None);
    }

    #[test]
    fn vector_layout_is_created_once() {
        let context = Context::create();
        let first = vector_struct(&context);
        let second = vector_struct(&context);
        assert_eq!(first, second);
        assert_eq!(first.count_fields(), 3);
        assert_eq!(first.get_name().and_then(|n| n.to_str().ok()), Some(VECTOR_TYPE));
    }
}
