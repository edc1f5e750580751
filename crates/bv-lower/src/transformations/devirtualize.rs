//! Whole-program devirtualization: every virtual call whose receiver type has
//! known subtypes becomes a cascade of exact runtime-type tests.
//!
//! A receiver that is not a plain local or `this` is evaluated once, inside the
//! outermost test, into a `$recvN` local declared at the head of the body.

use bv_core::ast::{
    BinOp, CallExpr, Expr, ExprKind, Local, MethodRef, Stmt, StmtKind, Target, Ty, TypeRef,
};
use bv_core::span::Span;
use bv_core::Result;

use super::IrTransform;
use crate::queries::{OverrideMap, OverrideResolver, SubtypeIndex, TypeTable};

/// Root of the class hierarchy; some of its methods are never dispatched on.
const ROOT_OBJECT_TYPES: [&str; 2] = ["Object", "System.Object"];
const ROOT_OBJECT_EXEMPT: [&str; 3] = ["Equals", "GetHashCode", "ToString"];
/// Name of the runtime type representation produced by `GetType`/`TypeOf`.
pub const RUNTIME_TYPE: &str = "Type";

/// What to do with one call site.
#[derive(Debug, Clone, PartialEq)]
pub enum CallSiteRewrite {
    Unchanged,
    /// Void call: a chain of conditional statements.
    Statement(Stmt),
    /// Value call: a chain of conditional expressions.
    Expression(Expr),
}

struct CallSite<'c> {
    /// Used by the outermost test; binds the receiver when it is not reusable.
    first_receiver: Expr,
    /// Used by every later test and by the calls.
    receiver: Expr,
    call: &'c CallExpr,
    result_ty: &'c Ty,
    span: Span,
}

pub struct Devirtualizer<'a> {
    index: &'a SubtypeIndex,
    types: &'a TypeTable<'a>,
    resolver: OverrideResolver<'a>,
    rewritten: usize,
    receivers: Vec<Local>,
}

impl<'a> Devirtualizer<'a> {
    pub fn new(index: &'a SubtypeIndex, types: &'a TypeTable<'a>) -> Self {
        Self {
            index,
            types,
            resolver: OverrideResolver::new(index, types),
            rewritten: 0,
            receivers: Vec::new(),
        }
    }

    /// Number of call sites rewritten so far.
    pub fn rewritten(&self) -> usize {
        self.rewritten
    }

    fn is_exempt(&self, call: &CallExpr) -> bool {
        let method = &call.method;
        if !call.is_virtual || call.receiver.is_none() {
            return true;
        }
        if ROOT_OBJECT_TYPES.contains(&method.ty.name.as_str())
            && ROOT_OBJECT_EXEMPT.contains(&method.name.as_str())
        {
            return true;
        }
        let is_accessor = ["add_", "remove_"]
            .iter()
            .any(|prefix| method.name.as_str().starts_with(prefix));
        if is_accessor
            && self
                .types
                .get(&method.ty)
                .and_then(|def| def.methods_matching(method).next())
                .is_some_and(|def| def.is_special_name)
        {
            return true;
        }
        !self.index.contains(&method.ty)
    }

    /// Decide how the call site `call` (of static result type `result_ty`) is lowered.
    pub fn rewrite_call(&mut self, call: &CallExpr, result_ty: &Ty, span: Span) -> Result<CallSiteRewrite> {
        if self.is_exempt(call) {
            return Ok(CallSiteRewrite::Unchanged);
        }
        let overrides = self.resolver.resolve(&call.method)?;
        if overrides.is_empty() {
            return Ok(CallSiteRewrite::Unchanged);
        }
        let Some(receiver) = call.receiver.as_deref() else {
            return Ok(CallSiteRewrite::Unchanged);
        };
        tracing::debug!(
            "devirtualizing {} into {} branches",
            call.method,
            overrides.len()
        );
        let (first_receiver, receiver) = self.bind_receiver(receiver);
        let site = CallSite {
            first_receiver,
            receiver,
            call,
            result_ty,
            span,
        };
        let fallback = direct_call(call, &site.receiver, &call.method, result_ty.clone(), span);
        if result_ty.is_void() {
            let fallback = Stmt::expr(fallback).with_span(span);
            let chain = self.fold(&overrides, &site, fallback, |cond, then, rest| {
                Stmt::if_else(cond, Stmt::expr(then).with_span(span), rest).with_span(span)
            });
            Ok(CallSiteRewrite::Statement(chain))
        } else {
            let chain = self.fold(&overrides, &site, fallback, |cond, then, rest| {
                let ty = rest.ty.clone();
                Expr::new(
                    ExprKind::Conditional {
                        cond: Box::new(cond),
                        then_expr: Box::new(then),
                        else_expr: Box::new(rest),
                    },
                    ty,
                )
                .with_span(span)
            });
            Ok(CallSiteRewrite::Expression(chain))
        }
    }

    /// `(outermost use, later uses)` of the receiver.
    fn bind_receiver(&mut self, receiver: &Expr) -> (Expr, Expr) {
        if matches!(receiver.kind, ExprKind::Local(_) | ExprKind::This) {
            return (receiver.clone(), receiver.clone());
        }
        let local = Local {
            name: format!("$recv{}", self.receivers.len()).into(),
            ty: receiver.ty.clone(),
        };
        let bind = Expr::assign(Target::Local(local.name.clone()), receiver.clone())
            .with_span(receiver.span);
        let reuse = Expr::local(local.name.clone(), local.ty.clone()).with_span(receiver.span);
        self.receivers.push(local);
        (bind, reuse)
    }

    /// Right fold over the overrides so the first one found is tested first.
    fn fold<T>(
        &self,
        overrides: &OverrideMap,
        site: &CallSite<'_>,
        fallback: T,
        branch: impl Fn(Expr, Expr, T) -> T,
    ) -> T {
        let CallSite {
            first_receiver,
            receiver,
            call,
            result_ty,
            span,
        } = site;
        let (result_ty, span) = (*result_ty, *span);
        overrides.iter().enumerate().rev().fold(fallback, |rest, (position, (ty, method))| {
            let tested = if position == 0 { first_receiver } else { receiver };
            let cond = exact_type_test(tested, ty, span);
            let candidate = direct_call(call, receiver, method, self.return_type(method, result_ty), span);
            let then = if result_ty.is_void() {
                candidate
            } else {
                Expr::new(
                    ExprKind::Conversion {
                        value: Box::new(candidate),
                        to: result_ty.clone(),
                    },
                    result_ty.clone(),
                )
                .with_span(span)
            };
            branch(cond, then, rest)
        })
    }

    fn return_type(&self, method: &MethodRef, fallback: &Ty) -> Ty {
        self.types
            .get(&method.ty)
            .and_then(|def| def.methods_matching(method).next())
            .map(|def| def.ret.clone())
            .unwrap_or_else(|| fallback.clone())
    }

    fn rewrite_stmt_in_place(&mut self, stmt: &mut Stmt) -> Result<()> {
        let span = stmt.span;
        let mut replacement = None;
        match &mut stmt.kind {
            StmtKind::Block(stmts) => {
                for s in stmts {
                    self.rewrite_stmt_in_place(s)?;
                }
            }
            StmtKind::Assert(e) | StmtKind::Assume(e) | StmtKind::Throw(e) | StmtKind::Push(e) => {
                self.rewrite_expr_in_place(e)?
            }
            StmtKind::Conditional {
                cond,
                then_branch,
                else_branch,
            } => {
                self.rewrite_expr_in_place(cond)?;
                self.rewrite_stmt_in_place(then_branch)?;
                self.rewrite_stmt_in_place(else_branch)?;
            }
            StmtKind::Expression(expr) => {
                if !(expr.ty.is_void() && matches!(expr.kind, ExprKind::Call(_))) {
                    self.rewrite_expr_in_place(expr)?;
                } else if let ExprKind::Call(call) = &mut expr.kind {
                    self.rewrite_call_operands(call)?;
                    if let CallSiteRewrite::Statement(chain) =
                        self.rewrite_call(call, &Ty::Void, span)?
                    {
                        replacement = Some(chain);
                    }
                }
            }
            StmtKind::While { cond, body } | StmtKind::DoUntil { body, cond } => {
                self.rewrite_expr_in_place(cond)?;
                self.rewrite_stmt_in_place(body)?;
            }
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => {
                for s in init.iter_mut().chain(step.iter_mut()) {
                    self.rewrite_stmt_in_place(s)?;
                }
                if let Some(cond) = cond {
                    self.rewrite_expr_in_place(cond)?;
                }
                self.rewrite_stmt_in_place(body)?;
            }
            StmtKind::ForEach {
                collection, body, ..
            } => {
                self.rewrite_expr_in_place(collection)?;
                self.rewrite_stmt_in_place(body)?;
            }
            StmtKind::Switch { scrutinee, cases } => {
                self.rewrite_expr_in_place(scrutinee)?;
                for case in cases {
                    if let Some(value) = &mut case.value {
                        self.rewrite_expr_in_place(value)?;
                    }
                    for s in &mut case.body {
                        self.rewrite_stmt_in_place(s)?;
                    }
                }
            }
            StmtKind::LocalDecl { init, .. } | StmtKind::Return(init) => {
                if let Some(init) = init {
                    self.rewrite_expr_in_place(init)?;
                }
            }
            StmtKind::Labeled { body, .. } => self.rewrite_stmt_in_place(body)?,
            StmtKind::Try(try_stmt) => {
                self.rewrite_stmt_in_place(&mut try_stmt.body)?;
                for clause in &mut try_stmt.catches {
                    self.rewrite_stmt_in_place(&mut clause.body)?;
                }
                if let Some(finally) = &mut try_stmt.finally {
                    self.rewrite_stmt_in_place(finally)?;
                }
            }
            StmtKind::Empty
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Goto(_)
            | StmtKind::Rethrow => {}
        }
        if let Some(chain) = replacement {
            self.rewritten += 1;
            *stmt = chain;
        }
        Ok(())
    }

    fn rewrite_call_operands(&mut self, call: &mut CallExpr) -> Result<()> {
        if let Some(receiver) = &mut call.receiver {
            self.rewrite_expr_in_place(receiver)?;
        }
        for arg in &mut call.args {
            self.rewrite_expr_in_place(arg)?;
        }
        Ok(())
    }

    fn rewrite_target_in_place(&mut self, target: &mut Target) -> Result<()> {
        if let Target::Field {
            object: Some(object),
            ..
        } = target
        {
            self.rewrite_expr_in_place(object)?;
        }
        Ok(())
    }

    fn rewrite_expr_in_place(&mut self, expr: &mut Expr) -> Result<()> {
        let (ty, span) = (expr.ty.clone(), expr.span);
        let mut replacement = None;
        match &mut expr.kind {
            ExprKind::Call(call) => {
                self.rewrite_call_operands(call)?;
                if let CallSiteRewrite::Expression(chain) = self.rewrite_call(call, &ty, span)? {
                    replacement = Some(chain);
                }
            }
            ExprKind::Field {
                object: Some(object),
                ..
            } => self.rewrite_expr_in_place(object)?,
            ExprKind::Unary { operand, .. } => self.rewrite_expr_in_place(operand)?,
            ExprKind::Binary { lhs, rhs, .. } => {
                self.rewrite_expr_in_place(lhs)?;
                self.rewrite_expr_in_place(rhs)?;
            }
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.rewrite_expr_in_place(cond)?;
                self.rewrite_expr_in_place(then_expr)?;
                self.rewrite_expr_in_place(else_expr)?;
            }
            ExprKind::Assign { target, value } => {
                self.rewrite_target_in_place(target)?;
                self.rewrite_expr_in_place(value)?;
            }
            ExprKind::Target(target) => self.rewrite_target_in_place(target)?,
            ExprKind::New { args, .. } => {
                for arg in args {
                    self.rewrite_expr_in_place(arg)?;
                }
            }
            ExprKind::GetType(value) | ExprKind::Conversion { value, .. } => {
                self.rewrite_expr_in_place(value)?
            }
            ExprKind::Literal(_)
            | ExprKind::Local(_)
            | ExprKind::This
            | ExprKind::Field { object: None, .. }
            | ExprKind::TypeOf(_)
            | ExprKind::DefaultValue(_)
            | ExprKind::Pop => {}
        }
        if let Some(chain) = replacement {
            self.rewritten += 1;
            *expr = chain;
        }
        Ok(())
    }
}

impl IrTransform<Stmt, Stmt> for Devirtualizer<'_> {
    fn transform(&mut self, mut body: Stmt) -> Result<Stmt> {
        self.rewrite_stmt_in_place(&mut body)?;
        if self.receivers.is_empty() {
            return Ok(body);
        }
        let mut stmts: Vec<Stmt> = self
            .receivers
            .drain(..)
            .map(|local| Stmt::new(StmtKind::LocalDecl { local, init: None }))
            .collect();
        let span = body.span;
        if let StmtKind::Block(inner) = &mut body.kind {
            stmts.append(inner);
        } else {
            stmts.push(body);
        }
        Ok(Stmt::block(stmts).with_span(span))
    }
}

/// `GetType(receiver) == typeof(ty)`: exact type identity, not subtyping.
fn exact_type_test(receiver: &Expr, ty: &TypeRef, span: Span) -> Expr {
    let runtime_type = Ty::named(RUNTIME_TYPE);
    Expr::binary(
        BinOp::Eq,
        Expr::new(ExprKind::GetType(Box::new(receiver.clone())), runtime_type.clone()),
        Expr::new(ExprKind::TypeOf(ty.clone()), runtime_type),
        Ty::Bool,
    )
    .with_span(span)
}

fn direct_call(call: &CallExpr, receiver: &Expr, method: &MethodRef, result_ty: Ty, span: Span) -> Expr {
    Expr::call(
        CallExpr {
            method: method.clone(),
            receiver: Some(Box::new(receiver.clone())),
            args: call.args.clone(),
            is_virtual: false,
        },
        result_ty,
    )
    .with_span(span)
}
