use serde::{Deserialize, Serialize};

use super::{FieldRef, MethodRef, NodeId, Symbol, Ty, TypeRef};
use crate::span::Span;

pub type BExpr = Box<Expr>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expr {
    #[serde(default)]
    pub id: NodeId,
    #[serde(default)]
    pub span: Span,
    pub ty: Ty,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ExprKind {
    Literal(Lit),
    /// A local variable or parameter.
    Local(Symbol),
    This,
    Field {
        object: Option<BExpr>,
        field: FieldRef,
    },
    Unary {
        op: UnOp,
        operand: BExpr,
    },
    Binary {
        op: BinOp,
        lhs: BExpr,
        rhs: BExpr,
    },
    Conditional {
        cond: BExpr,
        then_expr: BExpr,
        else_expr: BExpr,
    },
    Assign {
        target: Target,
        value: BExpr,
    },
    /// An assignable location read and written by a compound assignment
    /// (`Binary { lhs: Target(..), .. }`).
    Target(Target),
    Call(CallExpr),
    New {
        ty: TypeRef,
        ctor: Option<MethodRef>,
        #[serde(default)]
        args: Vec<Expr>,
    },
    TypeOf(TypeRef),
    /// The exact runtime type of the operand.
    GetType(BExpr),
    Conversion {
        value: BExpr,
        to: Ty,
    },
    DefaultValue(Ty),
    /// Pop the value most recently pushed with a `push` statement.
    Pop,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Lit {
    Int(i64),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Local(Symbol),
    Field {
        object: Option<BExpr>,
        field: FieldRef,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallExpr {
    pub method: MethodRef,
    #[serde(default)]
    pub receiver: Option<BExpr>,
    #[serde(default)]
    pub args: Vec<Expr>,
    #[serde(default)]
    pub is_virtual: bool,
}

impl Expr {
    pub fn new(kind: ExprKind, ty: Ty) -> Self {
        Self {
            id: 0,
            span: Span::default(),
            ty,
            kind,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn int(value: i64) -> Self {
        Expr::new(ExprKind::Literal(Lit::Int(value)), Ty::Int)
    }

    pub fn bool(value: bool) -> Self {
        Expr::new(ExprKind::Literal(Lit::Bool(value)), Ty::Bool)
    }

    pub fn null(ty: Ty) -> Self {
        Expr::new(ExprKind::Literal(Lit::Null), ty)
    }

    pub fn local(name: impl Into<Symbol>, ty: Ty) -> Self {
        Expr::new(ExprKind::Local(name.into()), ty)
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr, ty: Ty) -> Self {
        Expr::new(
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
        )
    }

    pub fn assign(target: Target, value: Expr) -> Self {
        let ty = value.ty.clone();
        Expr::new(
            ExprKind::Assign {
                target,
                value: Box::new(value),
            },
            ty,
        )
    }

    pub fn call(call: CallExpr, result: Ty) -> Self {
        Expr::new(ExprKind::Call(call), result)
    }

    pub fn new_object(ty: TypeRef) -> Self {
        Expr::new(
            ExprKind::New {
                ty: ty.clone(),
                ctor: None,
                args: Vec::new(),
            },
            Ty::Named(ty),
        )
    }

    pub fn is_target(&self) -> bool {
        matches!(self.kind, ExprKind::Target(_))
    }
}

impl CallExpr {
    pub fn new(method: MethodRef, receiver: Option<Expr>, args: Vec<Expr>) -> Self {
        Self {
            method,
            receiver: receiver.map(Box::new),
            args,
            is_virtual: false,
        }
    }

    pub fn virtual_call(method: MethodRef, receiver: Expr, args: Vec<Expr>) -> Self {
        Self {
            method,
            receiver: Some(Box::new(receiver)),
            args,
            is_virtual: true,
        }
    }
}
