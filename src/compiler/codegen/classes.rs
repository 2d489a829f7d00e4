//! Class metadata pass: validation, instance and vtable layouts, method symbols.
//!
//! Runs before any instruction is emitted. Every class gets
//!
//! - an instance type `%Name = type { ptr }` whose field points at the vtable,
//! - a vtable type `%Name_vtable_type = type { ptr, ptr, ptr... }` holding the
//!   parent vtable, the class name and one slot per method,
//! - a private constant `@Name_vtable`,
//! - one function `Name::method` per method taking `this` first.

use std::collections::{HashMap, HashSet};

use inkwell::module::Linkage;
use inkwell::types::{BasicMetadataTypeEnum, BasicTypeEnum, StructType};
use inkwell::values::{BasicValueEnum, FunctionValue, GlobalValue};
use tracing::debug;

use crate::ast::Klass;
use crate::errors::{OpalError, Result};
use crate::parser::ROOT_CLASS;

use super::types::TypeDesc;
use super::CodeGen;

pub struct MethodInfo<'ctx> {
    pub name: String,
    pub function: FunctionValue<'ctx>,
    pub params: Vec<TypeDesc>,
    pub ret: TypeDesc,
}

pub struct ClassInfo<'ctx> {
    pub name: String,
    pub parent: Option<String>,
    pub instance_type: StructType<'ctx>,
    pub vtable_type: StructType<'ctx>,
    pub vtable: GlobalValue<'ctx>,
    pub methods: Vec<MethodInfo<'ctx>>,
}

impl<'ctx> ClassInfo<'ctx> {
    pub fn method(&self, name: &str) -> Option<&MethodInfo<'ctx>> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// Every class lowered so far, by name.
#[derive(Default)]
pub struct ClassRegistry<'ctx> {
    classes: HashMap<String, ClassInfo<'ctx>>,
}

impl<'ctx> ClassRegistry<'ctx> {
    pub fn get(&self, name: &str) -> Option<&ClassInfo<'ctx>> {
        self.classes.get(name)
    }

    fn insert(&mut self, info: ClassInfo<'ctx>) {
        self.classes.insert(info.name.clone(), info);
    }

    /// Find `method` on `class` or the nearest ancestor declaring it.
    pub fn resolve_method(&self, class: &str, method: &str) -> Option<&MethodInfo<'ctx>> {
        let mut current = Some(class);
        while let Some(name) = current {
            let info = self.get(name)?;
            if let Some(found) = info.method(method) {
                return Some(found);
            }
            current = info.parent.as_deref();
        }
        None
    }
}

/// Validate the class list and order it so parents come before children.
///
/// Declaration order is kept wherever the hierarchy allows it.
pub fn order_classes<'k>(classes: &[&'k Klass]) -> Result<Vec<&'k Klass>> {
    let mut by_name: HashMap<&str, &Klass> = HashMap::new();
    for klass in classes {
        if by_name.insert(klass.name.as_str(), klass).is_some() {
            return Err(OpalError::Structural(format!(
                "Class {} is declared more than once",
                klass.name
            )));
        }
    }

    for klass in classes {
        match (&klass.parent, klass.name == ROOT_CLASS) {
            (Some(_), true) => {
                return Err(OpalError::Structural(format!(
                    "The root class {ROOT_CLASS} cannot have a parent"
                )))
            }
            (None, false) => {
                return Err(OpalError::Structural(format!("Class {} has no parent", klass.name)))
            }
            (Some(parent), false) if !by_name.contains_key(parent.as_str()) => {
                return Err(OpalError::UndefinedParent {
                    class: klass.name.clone(),
                    parent: parent.clone(),
                })
            }
            _ => {}
        }

        let mut seen = HashSet::new();
        for func in klass.functions() {
            if !seen.insert(func.name.as_str()) {
                return Err(OpalError::Structural(format!(
                    "Method {}::{} is declared more than once",
                    klass.name, func.name
                )));
            }
        }
    }

    let mut ordered = Vec::with_capacity(classes.len());
    let mut done: HashSet<&str> = HashSet::new();
    for klass in classes {
        let mut chain = Vec::new();
        let mut current = Some(*klass);
        while let Some(k) = current {
            if done.contains(k.name.as_str()) {
                break;
            }
            if chain.iter().any(|c: &&Klass| c.name == k.name) {
                return Err(OpalError::Structural(format!(
                    "Inheritance cycle involving class {}",
                    k.name
                )));
            }
            chain.push(k);
            current = k.parent.as_deref().and_then(|p| by_name.get(p).copied());
        }
        for k in chain.into_iter().rev() {
            done.insert(k.name.as_str());
            ordered.push(k);
        }
    }
    Ok(ordered)
}

impl<'a, 'ctx> CodeGen<'a, 'ctx> {
    /// Build the layouts, vtable and method symbols of one class.
    ///
    /// The parent must already be declared.
    pub(crate) fn declare_class(&mut self, klass: &Klass) -> Result<()> {
        let ptr = self.ptr_type();
        let instance_type = self.context.opaque_struct_type(&klass.name);
        let vtable_type = self.context.opaque_struct_type(&format!("{}_vtable_type", klass.name));

        let mut methods = Vec::new();
        for func in klass.functions() {
            let params: Vec<TypeDesc> = func
                .params
                .iter()
                .map(|p| TypeDesc::from_name(p.type_name.as_deref()))
                .collect();
            let ret = func
                .ret_type
                .as_deref()
                .map_or(TypeDesc::Void, |name| TypeDesc::from_name(Some(name)));

            let mut llvm_params: Vec<BasicMetadataTypeEnum> = vec![ptr.into()];
            for (param, ty) in func.params.iter().zip(&params) {
                let basic = ty.basic_type(self.context).ok_or_else(|| {
                    OpalError::Unsupported(format!(
                        "Parameter '{}' of {}::{} cannot be Void",
                        param.name, klass.name, func.name
                    ))
                })?;
                llvm_params.push(basic.into());
            }

            let fn_type = ret.fn_type(self.context, &llvm_params, false);
            let symbol = format!("{}::{}", klass.name, func.name);
            let function = self.module.add_function(&symbol, fn_type, None);
            debug!(method = %symbol, "declared method");

            methods.push(MethodInfo { name: func.name.clone(), function, params, ret });
        }

        let mut fields: Vec<BasicTypeEnum> = vec![ptr.into(), ptr.into()];
        fields.extend(methods.iter().map(|_| BasicTypeEnum::from(ptr)));
        vtable_type.set_body(&fields, false);

        let parent_vtable = match &klass.parent {
            Some(parent) => self
                .classes
                .get(parent)
                .ok_or_else(|| OpalError::UndefinedParent {
                    class: klass.name.clone(),
                    parent: parent.clone(),
                })?
                .vtable
                .as_pointer_value(),
            None => ptr.const_null(),
        };

        let mut slots: Vec<BasicValueEnum> = vec![
            parent_vtable.into(),
            self.intern_string(&klass.name).into(),
        ];
        slots.extend(
            methods
                .iter()
                .map(|m| BasicValueEnum::from(m.function.as_global_value().as_pointer_value())),
        );

        let vtable = self.module.add_global(vtable_type, None, &format!("{}_vtable", klass.name));
        vtable.set_initializer(&vtable_type.const_named_struct(&slots));
        vtable.set_constant(true);
        vtable.set_linkage(Linkage::Private);

        instance_type.set_body(&[ptr.into()], false);

        debug!(class = %klass.name, methods = methods.len(), "declared class");
        self.classes.insert(ClassInfo {
            name: klass.name.clone(),
            parent: klass.parent.clone(),
            instance_type,
            vtable_type,
            vtable,
            methods,
        });
        Ok(())
    }
}
