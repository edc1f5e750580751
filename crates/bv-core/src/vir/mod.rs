//! Verification IR: procedures made of straight-line commands, structured
//! `if`, labels and explicit gotos. There is no exception or virtual-call
//! primitive.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub mod pretty;

/// The global holding the exception currently being propagated (`null` when none).
pub const EXCEPTION_VAR: &str = "$Exception";
/// Function returning the exact runtime type of a reference.
pub const DYNAMIC_TYPE_FN: &str = "$DynamicType";
/// Predicate `$Subtype(a, b)`: type `a` is `b` or derives from it.
pub const SUBTYPE_FN: &str = "$Subtype";
/// Allocation procedure: `call r := $Alloc(T$X)`.
pub const ALLOC_PROC: &str = "$Alloc";
/// Value recording procedure used for execution traces.
pub const RECORD_PROC: &str = "$Record";

#[derive(Debug, Clone, Serialize, Deserialize, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(transparent)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Name(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Name {
    fn from(name: &str) -> Self {
        Name::new(name)
    }
}

impl From<String> for Name {
    fn from(name: String) -> Self {
        Name(name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum VirTy {
    Int,
    Bool,
    Ref,
    Type,
}

impl Display for VirTy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            VirTy::Int => write!(f, "int"),
            VirTy::Bool => write!(f, "bool"),
            VirTy::Ref => write!(f, "Ref"),
            VirTy::Type => write!(f, "Type"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VarDecl {
    pub name: Name,
    pub ty: VirTy,
}

impl VarDecl {
    pub fn new(name: impl Into<Name>, ty: VirTy) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Lit {
    Int(i64),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UnOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Expr {
    Lit(Lit),
    Ident(Name),
    /// Type constant `T$Name`.
    TypeConst(Name),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    /// Application of an uninterpreted or built-in function.
    App(Name, Vec<Expr>),
    /// `map[index]`, used for instance fields.
    Select(Name, Box<Expr>),
    IfThenElse(Box<Expr>, Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn ident(name: impl Into<Name>) -> Self {
        Expr::Ident(name.into())
    }

    pub fn int(value: i64) -> Self {
        Expr::Lit(Lit::Int(value))
    }

    pub fn bool(value: bool) -> Self {
        Expr::Lit(Lit::Bool(value))
    }

    pub fn null() -> Self {
        Expr::Lit(Lit::Null)
    }

    pub fn type_const(ty: impl Display) -> Self {
        Expr::TypeConst(Name(format!("T${}", ty)))
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn eq(lhs: Expr, rhs: Expr) -> Self {
        Expr::binary(BinOp::Eq, lhs, rhs)
    }

    pub fn neq(lhs: Expr, rhs: Expr) -> Self {
        Expr::binary(BinOp::Neq, lhs, rhs)
    }

    pub fn not(operand: Expr) -> Self {
        Expr::Unary(UnOp::Not, Box::new(operand))
    }

    pub fn dynamic_type(value: Expr) -> Self {
        Expr::App(Name::new(DYNAMIC_TYPE_FN), vec![value])
    }

    pub fn subtype(sub: Expr, sup: Expr) -> Self {
        Expr::App(Name::new(SUBTYPE_FN), vec![sub, sup])
    }

    pub fn exception() -> Self {
        Expr::ident(EXCEPTION_VAR)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AttrValue {
    Expr(Expr),
    Str(String),
}

/// `{:key v1, v2}` annotation attached to a command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attr {
    pub key: String,
    pub values: Vec<AttrValue>,
}

impl Attr {
    pub fn new(key: impl Into<String>, values: Vec<AttrValue>) -> Self {
        Self {
            key: key.into(),
            values,
        }
    }

    pub fn breadcrumb(n: u64) -> Self {
        Attr::new("breadcrumb", vec![AttrValue::Expr(Expr::int(n as i64))])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Lhs {
    Var(Name),
    /// `map[index] := ...`
    Map(Name, Expr),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Cmd {
    Assert {
        cond: Expr,
        attrs: Vec<Attr>,
    },
    Assume {
        cond: Expr,
        attrs: Vec<Attr>,
    },
    Assign {
        lhs: Lhs,
        rhs: Expr,
    },
    Call {
        attrs: Vec<Attr>,
        proc: Name,
        args: Vec<Expr>,
        outs: Vec<Name>,
    },
    /// An `else if` chain is an `else_cmds` holding exactly one `If`.
    If {
        cond: Expr,
        then_cmds: Vec<Cmd>,
        else_cmds: Vec<Cmd>,
    },
    Goto(Name),
    Label(Name),
    Return,
}

impl Cmd {
    pub fn assign(var: impl Into<Name>, rhs: Expr) -> Self {
        Cmd::Assign {
            lhs: Lhs::Var(var.into()),
            rhs,
        }
    }

    pub fn assert(cond: Expr) -> Self {
        Cmd::Assert {
            cond,
            attrs: Vec::new(),
        }
    }

    pub fn assume(cond: Expr) -> Self {
        Cmd::Assume {
            cond,
            attrs: Vec::new(),
        }
    }

    /// `assume {:attr} true`, a marker with no logical content.
    pub fn marker(attr: Attr) -> Self {
        Cmd::Assume {
            cond: Expr::bool(true),
            attrs: vec![attr],
        }
    }

    pub fn call(proc: impl Into<Name>, args: Vec<Expr>, outs: Vec<Name>) -> Self {
        Cmd::Call {
            attrs: Vec::new(),
            proc: proc.into(),
            args,
            outs,
        }
    }

    pub fn if_then(cond: Expr, then_cmds: Vec<Cmd>) -> Self {
        Cmd::If {
            cond,
            then_cmds,
            else_cmds: Vec::new(),
        }
    }

    pub fn if_else(cond: Expr, then_cmds: Vec<Cmd>, else_cmds: Vec<Cmd>) -> Self {
        Cmd::If {
            cond,
            then_cmds,
            else_cmds,
        }
    }

    pub fn goto(label: impl Into<Name>) -> Self {
        Cmd::Goto(label.into())
    }

    pub fn label(label: impl Into<Name>) -> Self {
        Cmd::Label(label.into())
    }

    /// Visit this command and every command nested in it, depth first.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Cmd)) {
        f(self);
        if let Cmd::If {
            then_cmds,
            else_cmds,
            ..
        } = self
        {
            for cmd in then_cmds.iter().chain(else_cmds.iter()) {
                cmd.walk(f);
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Procedure {
    pub name: Name,
    pub params: Vec<VarDecl>,
    pub returns: Vec<VarDecl>,
    pub locals: Vec<VarDecl>,
    /// `None` for procedures that are only declared (helpers provided elsewhere).
    pub body: Option<Vec<Cmd>>,
}

impl Procedure {
    pub fn declaration(name: impl Into<Name>, params: Vec<VarDecl>, returns: Vec<VarDecl>) -> Self {
        Self {
            name: name.into(),
            params,
            returns,
            locals: Vec::new(),
            body: None,
        }
    }

    /// Every command of the body, nested ones included, depth first.
    pub fn commands(&self) -> Vec<&Cmd> {
        let mut out = Vec::new();
        for cmd in self.body.iter().flatten() {
            cmd.walk(&mut |c| out.push(c));
        }
        out
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Program {
    pub type_constants: Vec<Name>,
    pub globals: Vec<VarDecl>,
    /// Instance fields, one map from references to values each.
    pub field_maps: Vec<VarDecl>,
    pub procedures: Vec<Procedure>,
}

impl Program {
    pub fn procedure(&self, name: &str) -> Option<&Procedure> {
        self.procedures.iter().find(|p| p.name.as_str() == name)
    }
}
