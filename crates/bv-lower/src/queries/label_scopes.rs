use std::collections::{HashMap, HashSet};

use bv_core::ast::{NodeId, Stmt, StmtKind, Symbol};
use bv_core::Result;

use crate::lower_bail;

/// Innermost `try` statement enclosing each label of one procedure body.
/// A label outside every `try` maps to `None`.
#[derive(Debug, Clone, Default)]
pub struct LabelScopes {
    scopes: HashMap<Symbol, Option<NodeId>>,
}

impl LabelScopes {
    pub fn collect(body: &Stmt) -> Result<Self> {
        let mut collector = Collector::default();
        collector.visit(body, None)?;
        Ok(Self {
            scopes: collector.scopes,
        })
    }

    /// `None` for an unknown label, `Some(None)` for a label outside every `try`.
    pub fn innermost_try(&self, label: &Symbol) -> Option<Option<NodeId>> {
        self.scopes.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

#[derive(Default)]
struct Collector {
    scopes: HashMap<Symbol, Option<NodeId>>,
    tries: HashSet<NodeId>,
}

impl Collector {
    fn visit(&mut self, stmt: &Stmt, enclosing: Option<NodeId>) -> Result<()> {
        match &stmt.kind {
            StmtKind::Block(stmts) => self.visit_all(stmts, enclosing),
            StmtKind::Conditional {
                then_branch,
                else_branch,
                ..
            } => {
                self.visit(then_branch, enclosing)?;
                self.visit(else_branch, enclosing)
            }
            StmtKind::While { body, .. }
            | StmtKind::DoUntil { body, .. }
            | StmtKind::ForEach { body, .. } => self.visit(body, enclosing),
            StmtKind::For {
                init, step, body, ..
            } => {
                self.visit_all(init, enclosing)?;
                self.visit_all(step, enclosing)?;
                self.visit(body, enclosing)
            }
            StmtKind::Switch { cases, .. } => {
                for case in cases {
                    self.visit_all(&case.body, enclosing)?;
                }
                Ok(())
            }
            StmtKind::Labeled { label, body } => {
                if self.scopes.insert(label.clone(), enclosing).is_some() {
                    lower_bail!(format!("label `{}` is declared twice", label));
                }
                self.visit(body, enclosing)
            }
            StmtKind::Try(try_stmt) => {
                if !self.tries.insert(stmt.id) {
                    lower_bail!(format!(
                        "try statement id {} is used by more than one try statement",
                        stmt.id
                    ));
                }
                let inner = Some(stmt.id);
                self.visit(&try_stmt.body, inner)?;
                for clause in &try_stmt.catches {
                    self.visit(&clause.body, inner)?;
                }
                if let Some(finally) = &try_stmt.finally {
                    self.visit(finally, inner)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn visit_all(&mut self, stmts: &[Stmt], enclosing: Option<NodeId>) -> Result<()> {
        for stmt in stmts {
            self.visit(stmt, enclosing)?;
        }
        Ok(())
    }
}
