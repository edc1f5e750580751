use bv_core::ast::{CatchClause, Expr, Stmt, Symbol, TryStmt};
use bv_core::span::Span;
use bv_core::vir::{self, Cmd, VirTy, EXCEPTION_VAR};
use bv_core::{unsupported, Result};

use super::{vir_ty, LowerCx, Phase, ProcedureLowerer, RegionId, NORMAL, PROPAGATING};
use crate::lower_bail;

impl ProcedureLowerer<'_> {
    pub(super) fn lower_try(&self, lcx: &mut LowerCx, stmt: &Stmt, try_stmt: &TryStmt) -> Result<()> {
        if !self.models_exceptions() {
            // nothing is thrown: the catch clauses are dead code
            self.lower_stmt(lcx, &try_stmt.body)?;
            if let Some(finally) = &try_stmt.finally {
                self.lower_stmt(lcx, finally)?;
            }
            return Ok(());
        }

        let catch_types = try_stmt
            .catches
            .iter()
            .map(|clause| clause.exception_type.clone())
            .collect();
        let region = lcx.enter_region(stmt.id, catch_types);

        lcx.push_phase(region, Phase::InTry);
        self.lower_stmt(lcx, &try_stmt.body)?;
        self.leave_normally(lcx, region);
        lcx.pop_phase(region, Phase::InTry)?;

        let catch_label = lcx.catch_label(region);
        lcx.emit_label(catch_label);
        let caught = lcx.exception_local(region);
        lcx.emit(Cmd::assign(caught.clone(), vir::Expr::exception()));
        lcx.emit(Cmd::assign(EXCEPTION_VAR, vir::Expr::null()));

        lcx.push_phase(region, Phase::InCatch);
        let mut arms = Vec::with_capacity(try_stmt.catches.len());
        for clause in &try_stmt.catches {
            arms.push(self.lower_catch_clause(lcx, region, &caught, clause)?);
        }
        // the last declared clause ends up outermost and is tested first
        let dispatch = arms.into_iter().fold(None, |inner: Option<Cmd>, (test, body)| {
            Some(Cmd::if_else(test, body, inner.into_iter().collect()))
        });
        if let Some(dispatch) = dispatch {
            lcx.emit(dispatch);
        }
        // no clause matched
        lcx.emit(Cmd::assign(EXCEPTION_VAR, vir::Expr::ident(caught)));
        self.propagate(lcx)?;
        lcx.pop_phase(region, Phase::InCatch)?;

        let finally_label = lcx.finally_label(region);
        lcx.emit_label(finally_label);
        if let Some(finally) = &try_stmt.finally {
            lcx.push_phase(region, Phase::InFinally);
            let label_var = lcx.label_var();
            let saved_exc = lcx.fresh_local("savedExc", VirTy::Ref);
            let saved_label = lcx.fresh_local("savedLabel", VirTy::Int);
            lcx.emit(Cmd::assign(saved_exc.clone(), vir::Expr::exception()));
            lcx.emit(Cmd::assign(saved_label.clone(), vir::Expr::Ident(label_var.clone())));
            // the body runs with no exception pending; the saved one comes back below
            lcx.emit(Cmd::assign(EXCEPTION_VAR, vir::Expr::null()));
            self.lower_stmt(lcx, finally)?;
            lcx.emit(Cmd::assign(EXCEPTION_VAR, vir::Expr::Ident(saved_exc)));
            lcx.emit(Cmd::assign(label_var, vir::Expr::Ident(saved_label)));
            lcx.pop_phase(region, Phase::InFinally)?;
        }

        self.dispatch_continuation(lcx, region);
        let continuation = lcx.continuation_label(region);
        lcx.emit_label(continuation);
        self.propagate_if_any(lcx)
    }

    fn leave_normally(&self, lcx: &mut LowerCx, region: RegionId) {
        let label_var = lcx.label_var();
        lcx.emit(Cmd::assign(label_var, vir::Expr::int(NORMAL)));
        let finally_label = lcx.finally_label(region);
        lcx.emit(Cmd::goto(finally_label));
    }

    fn lower_catch_clause(
        &self,
        lcx: &mut LowerCx,
        region: RegionId,
        caught: &vir::Name,
        clause: &CatchClause,
    ) -> Result<(vir::Expr, Vec<Cmd>)> {
        let test = match &clause.exception_type {
            Some(ty) => vir::Expr::subtype(
                vir::Expr::dynamic_type(vir::Expr::Ident(caught.clone())),
                vir::Expr::type_const(ty),
            ),
            None => vir::Expr::bool(true),
        };
        let body = lcx.buffered(|lcx| {
            if let Some(variable) = &clause.variable {
                let bound = lcx.declare_local(&variable.name, vir_ty(&variable.ty, clause.span)?);
                self.record(
                    lcx,
                    variable.name.as_str(),
                    VirTy::Ref,
                    vir::Expr::Ident(caught.clone()),
                );
                lcx.emit(Cmd::assign(bound, vir::Expr::Ident(caught.clone())));
            }
            self.lower_stmt(lcx, &clause.body)?;
            self.leave_normally(lcx, region);
            Ok(())
        })?;
        Ok((test, body))
    }

    /// After a `finally`: resume every escaping edge registered on the region,
    /// otherwise fall through to its continuation.
    fn dispatch_continuation(&self, lcx: &mut LowerCx, region: RegionId) {
        let continuation = lcx.continuation_label(region);
        let edges = lcx.escaping_edges(region).to_vec();
        if edges.is_empty() {
            lcx.emit(Cmd::goto(continuation));
            return;
        }
        let label_var = lcx.label_var();
        let dispatch = edges
            .iter()
            .rev()
            .fold(vec![Cmd::goto(continuation)], |otherwise, edge| {
                vec![Cmd::if_else(
                    vir::Expr::eq(vir::Expr::Ident(label_var.clone()), vir::Expr::int(edge.id)),
                    vec![Cmd::goto(edge.resume.clone())],
                    otherwise,
                )]
            });
        lcx.emit_all(dispatch);
    }

    /// Send the exception in `$Exception` to the innermost handler.
    pub fn propagate(&self, lcx: &mut LowerCx) -> Result<()> {
        match lcx.top() {
            None => {
                self.record(lcx, "<propagated exception>", VirTy::Ref, vir::Expr::exception());
                lcx.emit(Cmd::Return);
            }
            Some((region, Phase::InTry)) => {
                let target = lcx.catch_label(region);
                lcx.emit(Cmd::goto(target));
            }
            Some((region, Phase::InCatch)) => {
                let label_var = lcx.label_var();
                lcx.emit(Cmd::assign(label_var, vir::Expr::int(PROPAGATING)));
                let target = lcx.finally_label(region);
                lcx.emit(Cmd::goto(target));
            }
            Some((region, Phase::InFinally)) => {
                // an exception raised by the finally body resumes this region's
                // dispatch, it does not run the finally again
                let target = lcx.continuation_label(region);
                lcx.emit(Cmd::goto(target));
            }
        }
        Ok(())
    }

    /// `if ($Exception != null) { propagate }`
    pub fn propagate_if_any(&self, lcx: &mut LowerCx) -> Result<()> {
        let propagate = lcx.buffered(|lcx| self.propagate(lcx))?;
        lcx.emit(Cmd::if_then(
            vir::Expr::neq(vir::Expr::exception(), vir::Expr::null()),
            propagate,
        ));
        Ok(())
    }

    pub(super) fn lower_throw(&self, lcx: &mut LowerCx, exception: &Expr) -> Result<()> {
        if !self.models_exceptions() {
            lcx.emit(Cmd::assume(vir::Expr::bool(false)));
            return Ok(());
        }
        let value = self.value(lcx, exception)?;
        self.record(lcx, "<thrown exception>", VirTy::Ref, value.clone());
        lcx.emit(Cmd::assign(EXCEPTION_VAR, value));
        self.propagate(lcx)
    }

    pub(super) fn lower_rethrow(&self, lcx: &mut LowerCx, span: Span) -> Result<()> {
        if !self.models_exceptions() {
            lcx.emit(Cmd::assume(vir::Expr::bool(false)));
            return Ok(());
        }
        let Some(region) = lcx.innermost_catch() else {
            unsupported!("rethrow", span, "rethrow outside a catch clause");
        };
        let caught = lcx.exception_local(region);
        self.record(lcx, "<rethrown exception>", VirTy::Ref, vir::Expr::Ident(caught.clone()));
        lcx.emit(Cmd::assign(EXCEPTION_VAR, vir::Expr::Ident(caught)));
        self.propagate(lcx)
    }

    /// Jump to `label`, passing through the `finally` of every region left on the way.
    pub(super) fn lower_goto(&self, lcx: &mut LowerCx, label: &Symbol, span: Span) -> Result<()> {
        let Some(scope) = lcx.label_scope(label) else {
            lower_bail!(format!("goto targets unknown label `{}`", label));
        };
        let stop = match scope {
            None => 0,
            Some(node) => match lcx.stack_position(node) {
                Some(position) => position + 1,
                // regions are not tracked at all without exception modeling
                None if !self.models_exceptions() => 0,
                None => lower_bail!(format!(
                    "goto `{}` jumps into a try statement that does not enclose it",
                    label
                )),
            },
        };
        for index in (stop..lcx.depth()).rev() {
            let (region, phase) = lcx.stack_entry(index);
            if phase == Phase::InFinally {
                unsupported!("goto", span, "goto `{}` leaves a finally block", label);
            }
            let edge = lcx.add_escaping_edge(region);
            let label_var = lcx.label_var();
            lcx.emit(Cmd::assign(label_var, vir::Expr::int(edge.id)));
            let finally_label = lcx.finally_label(region);
            lcx.emit(Cmd::goto(finally_label));
            lcx.emit_label(edge.resume);
        }
        lcx.emit(Cmd::goto(label.as_str()));
        Ok(())
    }
}
