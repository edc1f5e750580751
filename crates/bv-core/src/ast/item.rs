use serde::{Deserialize, Serialize};

use super::{MethodRef, Stmt, Symbol, Ty, TypeRef};
use crate::span::{FileId, FileInfo};

/// The closed set of types handed to a whole-program translation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Program {
    pub types: Vec<TypeDef>,
    /// Source files, indexed by `Span::file`.
    #[serde(default)]
    pub files: Vec<FileInfo>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Class,
    Interface,
    Struct,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TypeDef {
    pub name: TypeRef,
    pub kind: TypeKind,
    #[serde(default)]
    pub base_classes: Vec<TypeRef>,
    #[serde(default)]
    pub interfaces: Vec<TypeRef>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub methods: Vec<MethodDef>,
    #[serde(default)]
    pub nested: Vec<TypeDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDef {
    pub name: Symbol,
    pub ty: Ty,
    #[serde(default)]
    pub is_static: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Param {
    pub name: Symbol,
    pub ty: Ty,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MethodDef {
    pub name: Symbol,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default = "void")]
    pub ret: Ty,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_virtual: bool,
    /// `new`-slot method: hides rather than overrides an inherited virtual.
    #[serde(default)]
    pub is_new_slot: bool,
    #[serde(default)]
    pub is_special_name: bool,
    /// Interface methods this method implements explicitly.
    #[serde(default)]
    pub explicit_overrides: Vec<MethodRef>,
    #[serde(default)]
    pub body: Option<Stmt>,
}

fn void() -> Ty {
    Ty::Void
}

impl TypeDef {
    pub fn new(name: impl Into<TypeRef>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            base_classes: Vec::new(),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            nested: Vec::new(),
        }
    }

    pub fn class(name: impl Into<TypeRef>) -> Self {
        TypeDef::new(name, TypeKind::Class)
    }

    pub fn interface(name: impl Into<TypeRef>) -> Self {
        TypeDef::new(name, TypeKind::Interface)
    }

    pub fn extends(mut self, base: impl Into<TypeRef>) -> Self {
        self.base_classes.push(base.into());
        self
    }

    pub fn implements(mut self, iface: impl Into<TypeRef>) -> Self {
        self.interfaces.push(iface.into());
        self
    }

    pub fn with_method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn is_struct(&self) -> bool {
        self.kind == TypeKind::Struct
    }

    /// Methods declared directly on this type with `method`'s name and parameters.
    pub fn methods_matching<'a>(
        &'a self,
        method: &'a MethodRef,
    ) -> impl Iterator<Item = &'a MethodDef> + 'a {
        self.methods
            .iter()
            .filter(move |m| m.name == method.name && m.param_types() == method.params)
    }
}

impl MethodDef {
    pub fn new(name: impl Into<Symbol>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            ret: Ty::Void,
            is_static: false,
            is_virtual: false,
            is_new_slot: false,
            is_special_name: false,
            explicit_overrides: Vec::new(),
            body: None,
        }
    }

    pub fn virtual_method(name: impl Into<Symbol>) -> Self {
        let mut method = MethodDef::new(name);
        method.is_virtual = true;
        method
    }

    pub fn with_param(mut self, name: impl Into<Symbol>, ty: Ty) -> Self {
        self.params.push(Param {
            name: name.into(),
            ty,
        });
        self
    }

    pub fn returning(mut self, ret: Ty) -> Self {
        self.ret = ret;
        self
    }

    pub fn with_body(mut self, body: Stmt) -> Self {
        self.body = Some(body);
        self
    }

    pub fn param_types(&self) -> Vec<Ty> {
        self.params.iter().map(|p| p.ty.clone()).collect()
    }

    pub fn reference(&self, owner: &TypeRef) -> MethodRef {
        MethodRef::new(owner.clone(), self.name.clone(), self.param_types())
    }
}

impl Program {
    pub fn new(types: Vec<TypeDef>) -> Self {
        Self {
            types,
            files: Vec::new(),
        }
    }

    pub fn file_name(&self, file: FileId) -> Option<String> {
        self.files
            .get(file as usize)
            .map(|info| info.file.display().to_string())
    }

    /// Every type definition, nested ones included, in declaration order.
    pub fn all_types(&self) -> Vec<&TypeDef> {
        fn walk<'a>(ty: &'a TypeDef, out: &mut Vec<&'a TypeDef>) {
            out.push(ty);
            for nested in &ty.nested {
                walk(nested, out);
            }
        }
        let mut out = Vec::new();
        for ty in &self.types {
            walk(ty, &mut out);
        }
        out
    }
}
