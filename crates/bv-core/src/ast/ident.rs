//! Names of types, members and locals in the source program.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

use super::Ty;

/// An identifier in the source program.
#[derive(Debug, Clone, Serialize, Deserialize, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(transparent)]
pub struct Symbol {
    pub name: String,
}

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn as_str(&self) -> &str {
        self.name.as_str()
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol::new(name)
    }
}

impl From<String> for Symbol {
    fn from(name: String) -> Self {
        Symbol::new(name)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Reference to a type definition.
///
/// Equality, ordering and hashing look at `name` only. A model of a type
/// declared in a stub module is the same type as the real one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: None,
        }
    }

    pub fn in_module(name: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: Some(module.into()),
        }
    }

    /// `module::name`, stable per declaration. Used where two declarations
    /// with the same name must still be told apart.
    pub fn qualified(&self) -> String {
        match &self.module {
            Some(module) => format!("{}::{}", module, self.name),
            None => self.name.clone(),
        }
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl PartialOrd for TypeRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl Display for TypeRef {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        TypeRef::new(name)
    }
}

/// Signature-level reference to a method: declaring type, name and parameter types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MethodRef {
    #[serde(rename = "type")]
    pub ty: TypeRef,
    pub name: Symbol,
    #[serde(default)]
    pub params: Vec<Ty>,
}

impl MethodRef {
    pub fn new(ty: impl Into<TypeRef>, name: impl Into<Symbol>, params: Vec<Ty>) -> Self {
        Self {
            ty: ty.into(),
            name: name.into(),
            params,
        }
    }

    /// `Type.Name`, used for diagnostics and special-method checks.
    pub fn signature(&self) -> String {
        format!("{}.{}", self.ty, self.name)
    }

    /// Name of the IR procedure implementing this method.
    pub fn procedure_name(&self) -> String {
        if self.params.is_empty() {
            self.signature()
        } else {
            let params = self
                .params
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join("$");
            format!("{}${}", self.signature(), params)
        }
    }

    /// Same name and parameter list, ignoring the declaring type.
    pub fn same_signature(&self, other: &MethodRef) -> bool {
        self.name == other.name && self.params == other.params
    }
}

impl Display for MethodRef {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}(", self.signature())?;
        for (idx, param) in self.params.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ")")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct FieldRef {
    #[serde(rename = "type")]
    pub ty: TypeRef,
    pub name: Symbol,
}

impl FieldRef {
    pub fn new(ty: impl Into<TypeRef>, name: impl Into<Symbol>) -> Self {
        Self {
            ty: ty.into(),
            name: name.into(),
        }
    }

    /// The IR map (or global, for static fields) holding this field.
    pub fn map_name(&self) -> String {
        format!("{}.{}", self.ty, self.name)
    }
}
