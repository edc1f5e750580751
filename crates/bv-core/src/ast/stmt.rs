use serde::{Deserialize, Serialize};

use super::{Expr, NodeId, Symbol, Ty, TypeRef};
use crate::span::Span;

pub type BStmt = Box<Stmt>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stmt {
    #[serde(default)]
    pub id: NodeId,
    #[serde(default)]
    pub span: Span,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StmtKind {
    Block(Vec<Stmt>),
    Empty,
    Assert(Expr),
    Assume(Expr),
    Conditional {
        cond: Expr,
        then_branch: BStmt,
        else_branch: BStmt,
    },
    Expression(Expr),
    Break,
    Continue,
    While {
        cond: Expr,
        body: BStmt,
    },
    DoUntil {
        body: BStmt,
        cond: Expr,
    },
    For {
        init: Vec<Stmt>,
        cond: Option<Expr>,
        step: Vec<Stmt>,
        body: BStmt,
    },
    ForEach {
        variable: Local,
        collection: Expr,
        body: BStmt,
    },
    Switch {
        scrutinee: Expr,
        cases: Vec<SwitchCase>,
    },
    LocalDecl {
        local: Local,
        init: Option<Expr>,
    },
    Return(Option<Expr>),
    Goto(Symbol),
    Labeled {
        label: Symbol,
        body: BStmt,
    },
    Try(TryStmt),
    Throw(Expr),
    Rethrow,
    Push(Expr),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Local {
    pub name: Symbol,
    pub ty: Ty,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwitchCase {
    #[serde(default)]
    pub span: Span,
    /// `None` marks the default case.
    pub value: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TryStmt {
    pub body: BStmt,
    #[serde(default)]
    pub catches: Vec<CatchClause>,
    #[serde(default)]
    pub finally: Option<BStmt>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatchClause {
    #[serde(default)]
    pub span: Span,
    /// `None` catches everything.
    pub exception_type: Option<TypeRef>,
    pub variable: Option<Local>,
    pub body: BStmt,
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Self {
            id: 0,
            span: Span::default(),
            kind,
        }
    }

    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = id;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn block(stmts: Vec<Stmt>) -> Self {
        Stmt::new(StmtKind::Block(stmts))
    }

    pub fn empty() -> Self {
        Stmt::new(StmtKind::Empty)
    }

    pub fn expr(expr: Expr) -> Self {
        Stmt::new(StmtKind::Expression(expr))
    }

    pub fn if_else(cond: Expr, then_branch: Stmt, else_branch: Stmt) -> Self {
        Stmt::new(StmtKind::Conditional {
            cond,
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    pub fn goto(label: impl Into<Symbol>) -> Self {
        Stmt::new(StmtKind::Goto(label.into()))
    }

    pub fn labeled(label: impl Into<Symbol>, body: Stmt) -> Self {
        Stmt::new(StmtKind::Labeled {
            label: label.into(),
            body: Box::new(body),
        })
    }
}

impl StmtKind {
    /// Name of the statement kind, as reported in errors.
    pub fn name(&self) -> &'static str {
        match self {
            StmtKind::Block(_) => "block",
            StmtKind::Empty => "empty",
            StmtKind::Assert(_) => "assert",
            StmtKind::Assume(_) => "assume",
            StmtKind::Conditional { .. } => "conditional",
            StmtKind::Expression(_) => "expression",
            StmtKind::Break => "break",
            StmtKind::Continue => "continue",
            StmtKind::While { .. } => "while",
            StmtKind::DoUntil { .. } => "do-until",
            StmtKind::For { .. } => "for",
            StmtKind::ForEach { .. } => "for-each",
            StmtKind::Switch { .. } => "switch",
            StmtKind::LocalDecl { .. } => "local-declaration",
            StmtKind::Return(_) => "return",
            StmtKind::Goto(_) => "goto",
            StmtKind::Labeled { .. } => "labeled",
            StmtKind::Try(_) => "try",
            StmtKind::Throw(_) => "throw",
            StmtKind::Rethrow => "rethrow",
            StmtKind::Push(_) => "push",
        }
    }
}
