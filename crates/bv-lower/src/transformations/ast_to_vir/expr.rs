//! Expression lowering. The statement engine only needs "one IR value per
//! expression"; [`StructuralExprLowering`] is the default way to get it.

use bv_core::ast::{
    BinOp, CallExpr, Expr, ExprKind, Lit, MethodRef, Target, Ty, TypeRef, UnOp,
};
use bv_core::vir::{self, Cmd, Lhs, VirTy, ALLOC_PROC};
use bv_core::{unsupported, Result};

use super::stmt::vir_binop;
use super::{vir_ty, LowerCx, ProcedureLowerer};

/// Maps one AST expression to at most one IR value, emitting the commands its
/// side effects need into `lcx`. `None` means the expression has no value
/// (a void call).
pub trait ExprLowering: Send + Sync {
    fn lower(
        &self,
        lowerer: &ProcedureLowerer<'_>,
        lcx: &mut LowerCx,
        expr: &Expr,
        op_assign: bool,
    ) -> Result<Option<vir::Expr>>;
}

/// Calls become `call` commands on the procedure named after the method,
/// objects come from `$Alloc`, instance fields are maps indexed by reference.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralExprLowering;

impl ExprLowering for StructuralExprLowering {
    fn lower(
        &self,
        lowerer: &ProcedureLowerer<'_>,
        lcx: &mut LowerCx,
        expr: &Expr,
        op_assign: bool,
    ) -> Result<Option<vir::Expr>> {
        let value = match &expr.kind {
            ExprKind::Literal(lit) => match lit {
                Lit::Int(v) => vir::Expr::int(*v),
                Lit::Bool(v) => vir::Expr::bool(*v),
                Lit::Null => vir::Expr::null(),
            },
            ExprKind::Local(name) => vir::Expr::ident(name.as_str()),
            ExprKind::This => vir::Expr::ident("this"),
            ExprKind::Field { object, field } => match object {
                Some(object) => {
                    let object = lowerer.value(lcx, object)?;
                    vir::Expr::Select(vir::Name::new(field.map_name()), Box::new(object))
                }
                None => vir::Expr::ident(field.map_name()),
            },
            ExprKind::Unary { op, operand } => {
                let operand = lowerer.value(lcx, operand)?;
                let op = match op {
                    UnOp::Not => vir::UnOp::Not,
                    UnOp::Neg => vir::UnOp::Neg,
                };
                vir::Expr::Unary(op, Box::new(operand))
            }
            ExprKind::Binary { op, lhs, rhs } => match &lhs.kind {
                ExprKind::Target(target) => {
                    if !op_assign {
                        unsupported!(
                            "compound-assignment",
                            expr.span,
                            "compound assignment used as a value"
                        );
                    }
                    let current = read_target(lowerer, lcx, target)?;
                    let rhs = lowerer.value(lcx, rhs)?;
                    let updated = vir::Expr::binary(vir_binop(*op), current, rhs);
                    write_target(lowerer, lcx, target, updated)?;
                    read_target(lowerer, lcx, target)?
                }
                _ => lower_binary(lowerer, lcx, *op, lhs, rhs)?,
            },
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => lower_conditional(lowerer, lcx, expr, cond, then_expr, else_expr)?,
            ExprKind::Assign { target, value } => {
                let value = lowerer.value(lcx, value)?;
                write_target(lowerer, lcx, target, value)?;
                read_target(lowerer, lcx, target)?
            }
            ExprKind::Target(target) => read_target(lowerer, lcx, target)?,
            ExprKind::Call(call) => return lower_call(lowerer, lcx, call, &expr.ty),
            ExprKind::New { ty, ctor, args } => lower_new(lowerer, lcx, ty, ctor.as_ref(), args)?,
            ExprKind::TypeOf(ty) => vir::Expr::type_const(ty),
            ExprKind::GetType(object) => vir::Expr::dynamic_type(lowerer.value(lcx, object)?),
            ExprKind::Conversion { value, to } => {
                let lowered = lowerer.value(lcx, value)?;
                match (&value.ty, to) {
                    (Ty::Bool, Ty::Int) => vir::Expr::IfThenElse(
                        Box::new(lowered),
                        Box::new(vir::Expr::int(1)),
                        Box::new(vir::Expr::int(0)),
                    ),
                    (Ty::Int, Ty::Bool) => vir::Expr::neq(lowered, vir::Expr::int(0)),
                    _ => lowered,
                }
            }
            ExprKind::DefaultValue(ty) => match ty {
                Ty::Void => unsupported!("default-value", expr.span, "default value of void"),
                Ty::Bool => vir::Expr::bool(false),
                Ty::Int => vir::Expr::int(0),
                Ty::Named(name) if lowerer.context().types.is_struct(ty) => alloc(lcx, name),
                Ty::Named(_) => vir::Expr::null(),
            },
            ExprKind::Pop => lcx.pop_operand()?,
        };
        Ok(Some(value))
    }
}

fn read_target(lowerer: &ProcedureLowerer<'_>, lcx: &mut LowerCx, target: &Target) -> Result<vir::Expr> {
    Ok(match target {
        Target::Local(name) => vir::Expr::ident(name.as_str()),
        Target::Field {
            object: Some(object),
            field,
        } => {
            let object = lowerer.value(lcx, object)?;
            vir::Expr::Select(vir::Name::new(field.map_name()), Box::new(object))
        }
        Target::Field { object: None, field } => vir::Expr::ident(field.map_name()),
    })
}

fn write_target(
    lowerer: &ProcedureLowerer<'_>,
    lcx: &mut LowerCx,
    target: &Target,
    value: vir::Expr,
) -> Result<()> {
    let lhs = match target {
        Target::Local(name) => Lhs::Var(vir::Name::new(name.as_str())),
        Target::Field {
            object: Some(object),
            field,
        } => Lhs::Map(vir::Name::new(field.map_name()), lowerer.value(lcx, object)?),
        Target::Field { object: None, field } => Lhs::Var(vir::Name::new(field.map_name())),
    };
    lcx.emit(Cmd::Assign { lhs, rhs: value });
    Ok(())
}

fn lower_binary(
    lowerer: &ProcedureLowerer<'_>,
    lcx: &mut LowerCx,
    op: BinOp,
    lhs: &Expr,
    rhs: &Expr,
) -> Result<vir::Expr> {
    let left = lowerer.value(lcx, lhs)?;
    let mut right = None;
    let rhs_cmds = lcx.buffered(|lcx| {
        right = Some(lowerer.value(lcx, rhs)?);
        Ok(())
    })?;
    let Some(right) = right else {
        unsupported!("expression", rhs.span, "operand yields no value");
    };
    if rhs_cmds.is_empty() {
        return Ok(vir::Expr::binary(vir_binop(op), left, right));
    }
    match op {
        // the right operand's side effects only happen when it is evaluated
        BinOp::And | BinOp::Or => {
            let tmp = lcx.fresh_local("tmp", VirTy::Bool);
            lcx.emit(Cmd::assign(tmp.clone(), left));
            let guard = if op == BinOp::And {
                vir::Expr::Ident(tmp.clone())
            } else {
                vir::Expr::not(vir::Expr::Ident(tmp.clone()))
            };
            let mut then_cmds = rhs_cmds;
            then_cmds.push(Cmd::assign(tmp.clone(), right));
            lcx.emit(Cmd::if_then(guard, then_cmds));
            Ok(vir::Expr::Ident(tmp))
        }
        _ => {
            // keep left-to-right order: pin the left value before the right's effects
            let tmp = lcx.fresh_local("tmp", vir_ty(&lhs.ty, lhs.span)?);
            lcx.emit(Cmd::assign(tmp.clone(), left));
            lcx.emit_all(rhs_cmds);
            Ok(vir::Expr::binary(vir_binop(op), vir::Expr::Ident(tmp), right))
        }
    }
}

fn lower_conditional(
    lowerer: &ProcedureLowerer<'_>,
    lcx: &mut LowerCx,
    expr: &Expr,
    cond: &Expr,
    then_expr: &Expr,
    else_expr: &Expr,
) -> Result<vir::Expr> {
    let cond = lowerer.condition(lcx, cond)?;
    let mut branches = [None, None];
    let then_cmds = lcx.buffered(|lcx| {
        branches[0] = Some(lowerer.value(lcx, then_expr)?);
        Ok(())
    })?;
    let else_cmds = lcx.buffered(|lcx| {
        branches[1] = Some(lowerer.value(lcx, else_expr)?);
        Ok(())
    })?;
    let [Some(then_value), Some(else_value)] = branches else {
        unsupported!("conditional", expr.span, "branch yields no value");
    };
    if then_cmds.is_empty() && else_cmds.is_empty() {
        return Ok(vir::Expr::IfThenElse(
            Box::new(cond),
            Box::new(then_value),
            Box::new(else_value),
        ));
    }
    let tmp = lcx.fresh_local("tmp", vir_ty(&expr.ty, expr.span)?);
    let mut then_cmds = then_cmds;
    then_cmds.push(Cmd::assign(tmp.clone(), then_value));
    let mut else_cmds = else_cmds;
    else_cmds.push(Cmd::assign(tmp.clone(), else_value));
    lcx.emit(Cmd::if_else(cond, then_cmds, else_cmds));
    Ok(vir::Expr::Ident(tmp))
}

fn lower_call(
    lowerer: &ProcedureLowerer<'_>,
    lcx: &mut LowerCx,
    call: &CallExpr,
    result_ty: &Ty,
) -> Result<Option<vir::Expr>> {
    let mut args = Vec::with_capacity(call.args.len() + 1);
    if let Some(receiver) = &call.receiver {
        args.push(lowerer.value(lcx, receiver)?);
    }
    for arg in &call.args {
        args.push(lowerer.value(lcx, arg)?);
    }
    let result = match result_ty {
        Ty::Void => None,
        ty => Some(lcx.fresh_local("tmp", vir_ty(ty, Default::default())?)),
    };
    emit_call(lowerer, lcx, &call.method, args, result.iter().cloned().collect())?;
    Ok(result.map(vir::Expr::Ident))
}

/// The call itself, then a jump to the handler if the callee raised.
fn emit_call(
    lowerer: &ProcedureLowerer<'_>,
    lcx: &mut LowerCx,
    method: &MethodRef,
    args: Vec<vir::Expr>,
    outs: Vec<vir::Name>,
) -> Result<()> {
    lcx.emit(Cmd::call(method.procedure_name(), args, outs));
    if lowerer.models_exceptions() {
        lowerer.propagate_if_any(lcx)?;
    }
    Ok(())
}

fn alloc(lcx: &mut LowerCx, ty: &TypeRef) -> vir::Expr {
    let object = lcx.fresh_local("tmp", VirTy::Ref);
    lcx.emit(Cmd::call(
        ALLOC_PROC,
        vec![vir::Expr::type_const(ty)],
        vec![object.clone()],
    ));
    vir::Expr::Ident(object)
}

fn lower_new(
    lowerer: &ProcedureLowerer<'_>,
    lcx: &mut LowerCx,
    ty: &TypeRef,
    ctor: Option<&MethodRef>,
    args: &[Expr],
) -> Result<vir::Expr> {
    let mut lowered = Vec::with_capacity(args.len() + 1);
    for arg in args {
        lowered.push(lowerer.value(lcx, arg)?);
    }
    let object = alloc(lcx, ty);
    if let Some(ctor) = ctor {
        lowered.insert(0, object.clone());
        emit_call(lowerer, lcx, ctor, lowered, Vec::new())?;
    }
    Ok(object)
}
