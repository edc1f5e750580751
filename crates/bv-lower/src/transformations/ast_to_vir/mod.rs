//! Lowering of method bodies into verification-IR procedures.
//!
//! Structured exception handling becomes an explicit state machine: a
//! nullable exception global, an integer resume tag (`$label`), labeled
//! blocks and gotos. Each `try` statement is a region with its own catch,
//! finally and continuation labels; the regions being lowered form a stack
//! tagged with the phase (try, catch or finally) currently emitted.

use bv_core::ast::{MethodDef, Program, Ty, TypeDef};
use bv_core::span::Span;
use bv_core::vir::{self, Attr, AttrValue, Cmd, Procedure, VarDecl, VirTy};
use bv_core::{Result, TranslationOptions};

use super::IrTransform;
use crate::error::unsupported_construct;
use crate::queries::{LabelScopes, TypeTable};
use crate::sink::ProgramSink;

mod context;
mod exceptions;
mod expr;
mod stmt;

pub use context::*;
pub use expr::{ExprLowering, StructuralExprLowering};

/// Read-only inputs shared by every procedure of one translation.
pub struct TranslationContext<'a> {
    pub options: &'a TranslationOptions,
    pub program: &'a Program,
    pub types: &'a TypeTable<'a>,
    pub sink: &'a ProgramSink,
}

/// A method and the type declaring it.
#[derive(Clone, Copy)]
pub struct MethodSource<'m> {
    pub owner: &'m TypeDef,
    pub method: &'m MethodDef,
}

/// Lowers one method body at a time. Holds no per-procedure state; that lives
/// in the [`LowerCx`] threaded through every call.
pub struct ProcedureLowerer<'a> {
    cx: &'a TranslationContext<'a>,
    exprs: &'a dyn ExprLowering,
}

/// IR type of a value of source type `ty`.
pub fn vir_ty(ty: &Ty, span: Span) -> Result<VirTy> {
    match ty {
        Ty::Void => Err(unsupported_construct(
            "void-value",
            span,
            "a void expression has no IR value",
        )),
        Ty::Bool => Ok(VirTy::Bool),
        Ty::Int => Ok(VirTy::Int),
        Ty::Named(name) if name.name == super::RUNTIME_TYPE => Ok(VirTy::Type),
        Ty::Named(_) => Ok(VirTy::Ref),
    }
}

impl<'a> ProcedureLowerer<'a> {
    pub fn new(cx: &'a TranslationContext<'a>, exprs: &'a dyn ExprLowering) -> Self {
        Self { cx, exprs }
    }

    pub fn context(&self) -> &TranslationContext<'a> {
        self.cx
    }

    pub fn options(&self) -> &TranslationOptions {
        self.cx.options
    }

    pub fn models_exceptions(&self) -> bool {
        self.cx.options.models_exceptions()
    }

    pub fn lower_method(&self, source: MethodSource<'_>) -> Result<Procedure> {
        let MethodSource { owner, method } = source;
        let name = method.reference(&owner.name).procedure_name();

        let mut params = Vec::new();
        if !method.is_static {
            params.push(VarDecl::new("this", VirTy::Ref));
        }
        for param in &method.params {
            params.push(VarDecl::new(
                param.name.as_str(),
                vir_ty(&param.ty, Span::default())?,
            ));
        }
        let returns = if method.ret.is_void() {
            Vec::new()
        } else {
            vec![VarDecl::new(RESULT_VAR, vir_ty(&method.ret, Span::default())?)]
        };

        let Some(body) = &method.body else {
            return Ok(Procedure::declaration(name, params, returns));
        };
        tracing::debug!("lowering procedure {}", name);

        let mut lcx = LowerCx::new(LabelScopes::collect(body)?);
        for param in &params {
            lcx.bind_param(param.name.clone());
        }
        if !returns.is_empty() {
            lcx.set_return_var(RESULT_VAR);
        }
        if self.options().instrument_branches {
            lcx.emit(Cmd::marker(Attr::breadcrumb(self.cx.sink.next_breadcrumb())));
        }
        self.lower_stmt(&mut lcx, body)?;
        let (locals, body) = lcx.finish()?;

        Ok(Procedure {
            name: vir::Name::new(name),
            params,
            returns,
            locals,
            body: Some(body),
        })
    }

    /// `call {:cexpr "label"} $Record.<ty>(value)` when value recording is on.
    pub fn record(&self, lcx: &mut LowerCx, label: &str, ty: VirTy, value: vir::Expr) {
        if !self.options().record_values {
            return;
        }
        let proc = self.cx.sink.record_procedure(ty);
        lcx.emit(Cmd::Call {
            attrs: vec![Attr::new("cexpr", vec![AttrValue::Str(label.to_string())])],
            proc,
            args: vec![value],
            outs: Vec::new(),
        });
    }
}

impl<'m> IrTransform<MethodSource<'m>, Procedure> for ProcedureLowerer<'_> {
    fn transform(&mut self, source: MethodSource<'m>) -> Result<Procedure> {
        self.lower_method(source)
    }
}
