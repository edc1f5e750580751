use bv_core::ast::{BinOp, Expr, ExprKind, Local, Stmt, StmtKind, SwitchCase, ValueKind};
use bv_core::vir::{self, Attr, AttrValue, Cmd};
use bv_core::{unsupported, Result};

use super::{vir_ty, LowerCx, ProcedureLowerer};

impl ProcedureLowerer<'_> {
    pub(super) fn lower_stmt(&self, lcx: &mut LowerCx, stmt: &Stmt) -> Result<()> {
        self.emit_statement_prelude(lcx, stmt);
        match &stmt.kind {
            StmtKind::Block(stmts) => {
                for s in stmts {
                    self.lower_stmt(lcx, s)?;
                }
                Ok(())
            }
            StmtKind::Empty => Ok(()),
            StmtKind::Assert(cond) => {
                let cond = self.condition(lcx, cond)?;
                if self.options().get_me_here {
                    lcx.emit(Cmd::assume(cond));
                } else {
                    lcx.emit(Cmd::assert(cond));
                }
                Ok(())
            }
            StmtKind::Assume(cond) => {
                let cond = self.condition(lcx, cond)?;
                lcx.emit(Cmd::assume(cond));
                Ok(())
            }
            StmtKind::Conditional {
                cond,
                then_branch,
                else_branch,
            } => self.lower_conditional(lcx, cond, then_branch, else_branch),
            StmtKind::Expression(expr) => {
                // `x op= e` arrives as a binary operation whose left operand is a target
                let op_assign = matches!(&expr.kind, ExprKind::Binary { lhs, .. } if lhs.is_target());
                self.exprs.lower(self, lcx, expr, op_assign)?;
                Ok(())
            }
            StmtKind::Break
            | StmtKind::Continue
            | StmtKind::While { .. }
            | StmtKind::DoUntil { .. }
            | StmtKind::For { .. }
            | StmtKind::ForEach { .. } => unsupported!(
                stmt.kind.name(),
                stmt.span,
                "{} statements are not handled",
                stmt.kind.name()
            ),
            StmtKind::Switch { scrutinee, cases } => self.lower_switch(lcx, scrutinee, cases),
            StmtKind::LocalDecl { local, init } => self.lower_local_decl(lcx, local, init.as_ref()),
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    let lowered = self.value(lcx, value)?;
                    let Some(ret) = lcx.return_var().cloned() else {
                        unsupported!(
                            "return",
                            stmt.span,
                            "returns a value but the procedure has no return slot"
                        );
                    };
                    self.record(lcx, "<return value>", vir_ty(&value.ty, value.span)?, lowered.clone());
                    lcx.emit(Cmd::assign(ret, lowered));
                }
                lcx.emit(Cmd::Return);
                Ok(())
            }
            StmtKind::Goto(label) => self.lower_goto(lcx, label, stmt.span),
            StmtKind::Labeled { label, body } => {
                lcx.emit_label(vir::Name::new(label.as_str()));
                self.lower_stmt(lcx, body)
            }
            StmtKind::Try(try_stmt) => self.lower_try(lcx, stmt, try_stmt),
            StmtKind::Throw(exception) => self.lower_throw(lcx, exception),
            StmtKind::Rethrow => self.lower_rethrow(lcx, stmt.span),
            StmtKind::Push(value) => {
                let lowered = self.value(lcx, value)?;
                lcx.push_operand(lowered);
                Ok(())
            }
        }
    }

    fn emit_statement_prelude(&self, lcx: &mut LowerCx, stmt: &Stmt) {
        if matches!(stmt.kind, StmtKind::Block(_) | StmtKind::Empty) {
            return;
        }
        let options = self.options();
        if options.emit_source_context && stmt.span.is_known() {
            let file = self
                .context()
                .program
                .file_name(stmt.span.file)
                .unwrap_or_else(|| format!("file{}", stmt.span.file));
            lcx.emit(Cmd::Assert {
                cond: vir::Expr::bool(true),
                attrs: vec![
                    Attr::new("first", Vec::new()),
                    Attr::new("sourceFile", vec![AttrValue::Str(file)]),
                    Attr::new(
                        "sourceLine",
                        vec![AttrValue::Expr(vir::Expr::int(stmt.span.line as i64))],
                    ),
                ],
            });
        }
        if options.capture_state {
            let state = format!("s{}", self.context().sink.next_capture_state());
            lcx.emit(Cmd::marker(Attr::new(
                "captureState",
                vec![AttrValue::Str(state)],
            )));
        }
    }

    /// Lower an expression that must produce exactly one value.
    pub fn value(&self, lcx: &mut LowerCx, expr: &Expr) -> Result<vir::Expr> {
        match self.exprs.lower(self, lcx, expr, false)? {
            Some(value) => Ok(value),
            None => unsupported!(
                "expression",
                expr.span,
                "expression of type {} yields no value",
                expr.ty
            ),
        }
    }

    /// Lower a condition and reduce it to a boolean by its value kind.
    pub fn condition(&self, lcx: &mut LowerCx, expr: &Expr) -> Result<vir::Expr> {
        let value = self.value(lcx, expr)?;
        match expr.ty.value_kind() {
            Some(ValueKind::Boolean) => Ok(value),
            Some(ValueKind::Integer) => Ok(vir::Expr::neq(value, vir::Expr::int(0))),
            Some(ValueKind::Reference) => Ok(vir::Expr::neq(value, vir::Expr::null())),
            None => unsupported!("condition", expr.span, "condition has no value"),
        }
    }

    fn branch_breadcrumb(&self, lcx: &mut LowerCx) {
        if self.options().instrument_branches {
            lcx.emit(Cmd::marker(Attr::breadcrumb(
                self.context().sink.next_breadcrumb(),
            )));
        }
    }

    fn lower_conditional(
        &self,
        lcx: &mut LowerCx,
        cond: &Expr,
        then_branch: &Stmt,
        else_branch: &Stmt,
    ) -> Result<()> {
        let cond = self.condition(lcx, cond)?;
        let then_cmds = lcx.buffered(|lcx| {
            self.branch_breadcrumb(lcx);
            self.lower_stmt(lcx, then_branch)
        })?;
        let else_cmds = lcx.buffered(|lcx| {
            self.branch_breadcrumb(lcx);
            self.lower_stmt(lcx, else_branch)
        })?;
        lcx.emit(Cmd::if_else(cond, then_cmds, else_cmds));
        Ok(())
    }

    fn lower_switch(&self, lcx: &mut LowerCx, scrutinee: &Expr, cases: &[SwitchCase]) -> Result<()> {
        let scrutinee = self.value(lcx, scrutinee)?;
        let (defaults, cases): (Vec<&SwitchCase>, Vec<&SwitchCase>) =
            cases.iter().partition(|case| case.value.is_none());

        let mut default_cmds = match defaults.last() {
            Some(default) => Some(lcx.buffered(|lcx| {
                for s in &default.body {
                    self.lower_stmt(lcx, s)?;
                }
                Ok(())
            })?),
            None => None,
        };

        // fold from the last case so the first declared case is tested first;
        // the default body only goes into the innermost else
        let mut chain: Option<Cmd> = None;
        for case in cases.iter().rev() {
            let Some(value) = &case.value else {
                continue;
            };
            let value = self.value(lcx, value)?;
            let body = lcx.buffered(|lcx| {
                for s in &case.body {
                    self.lower_stmt(lcx, s)?;
                }
                Ok(())
            })?;
            let else_cmds = match chain.take() {
                Some(inner) => vec![inner],
                None => default_cmds.take().unwrap_or_default(),
            };
            chain = Some(Cmd::if_else(
                vir::Expr::binary(vir::BinOp::Eq, scrutinee.clone(), value),
                body,
                else_cmds,
            ));
        }
        match chain {
            Some(chain) => lcx.emit(chain),
            None => lcx.emit_all(default_cmds.unwrap_or_default()),
        }
        Ok(())
    }

    fn lower_local_decl(&self, lcx: &mut LowerCx, local: &Local, init: Option<&Expr>) -> Result<()> {
        let span = init.map(|e| e.span).unwrap_or_default();
        let name = lcx.declare_local(&local.name, vir_ty(&local.ty, span)?);
        let is_struct = self.context().types.is_struct(&local.ty);

        if is_struct {
            let copy_from = init.filter(|e| !matches!(e.kind, ExprKind::DefaultValue(_)));
            match (copy_from, local.ty.as_type_ref()) {
                (Some(init), Some(struct_ty)) => {
                    let proc = self.context().sink.struct_copy_procedure(struct_ty);
                    let value = self.value(lcx, init)?;
                    lcx.emit(Cmd::call(proc, vec![value], vec![name]));
                }
                _ => {
                    let default = Expr::new(ExprKind::DefaultValue(local.ty.clone()), local.ty.clone());
                    let value = self.value(lcx, &default)?;
                    lcx.emit(Cmd::assign(name, value));
                }
            }
            return Ok(());
        }

        let Some(init) = init else {
            return Ok(());
        };
        let value = self.value(lcx, init)?;
        self.record(lcx, local.name.as_str(), vir_ty(&local.ty, span)?, value.clone());
        lcx.emit(Cmd::assign(name, value));
        Ok(())
    }
}

/// Binary operators shared with the expression lowering.
pub(super) fn vir_binop(op: BinOp) -> vir::BinOp {
    match op {
        BinOp::Add => vir::BinOp::Add,
        BinOp::Sub => vir::BinOp::Sub,
        BinOp::Mul => vir::BinOp::Mul,
        BinOp::Div => vir::BinOp::Div,
        BinOp::Rem => vir::BinOp::Mod,
        BinOp::Eq => vir::BinOp::Eq,
        BinOp::Ne => vir::BinOp::Neq,
        BinOp::Lt => vir::BinOp::Lt,
        BinOp::Le => vir::BinOp::Le,
        BinOp::Gt => vir::BinOp::Gt,
        BinOp::Ge => vir::BinOp::Ge,
        BinOp::And => vir::BinOp::And,
        BinOp::Or => vir::BinOp::Or,
    }
}
