use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use super::TypeRef;

/// Static type of a value in the source program.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Ty {
    Void,
    Bool,
    Int,
    Named(TypeRef),
}

/// How a value reduces to a boolean when it is used as a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Reference,
    Integer,
    Boolean,
}

impl Ty {
    pub fn named(name: impl Into<String>) -> Self {
        Ty::Named(TypeRef::new(name))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Ty::Void)
    }

    pub fn as_type_ref(&self) -> Option<&TypeRef> {
        match self {
            Ty::Named(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn value_kind(&self) -> Option<ValueKind> {
        match self {
            Ty::Void => None,
            Ty::Bool => Some(ValueKind::Boolean),
            Ty::Int => Some(ValueKind::Integer),
            Ty::Named(_) => Some(ValueKind::Reference),
        }
    }
}

impl Display for Ty {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Ty::Void => write!(f, "void"),
            Ty::Bool => write!(f, "bool"),
            Ty::Int => write!(f, "int"),
            Ty::Named(ty) => write!(f, "{}", ty),
        }
    }
}
