//! Whole-program translation: index the hierarchy once, then devirtualize and
//! lower every method, possibly on several worker threads.

use bv_core::ast::{MethodDef, Program};
use bv_core::span::Span;
use bv_core::diagnostics::{Diagnostic, DiagnosticManager};
use bv_core::vir::{self, Name, Procedure, VarDecl, VirTy, ALLOC_PROC, EXCEPTION_VAR};
use bv_core::{Result, TranslationOptions};

use crate::queries::{SubtypeIndex, TypeTable};
use crate::sink::ProgramSink;
use crate::transformations::{
    vir_ty, Devirtualizer, ExprLowering, IrTransform, MethodSource, ProcedureLowerer,
    StructuralExprLowering, TranslationContext,
};

/// What to do with a procedure whose lowering fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop at the first failure (in declaration order).
    #[default]
    Abort,
    /// Leave the procedure out, keep its diagnostic and carry on.
    Skip,
}

/// Result of a whole-program translation.
#[derive(Debug)]
pub struct Translation {
    pub program: vir::Program,
    pub diagnostics: Vec<Diagnostic>,
    /// Procedures left out under [`FailurePolicy::Skip`].
    pub skipped: Vec<String>,
}

pub struct WholeProgramTranslator<'a> {
    options: &'a TranslationOptions,
    policy: FailurePolicy,
    exprs: &'a dyn ExprLowering,
}

impl<'a> WholeProgramTranslator<'a> {
    pub fn new(options: &'a TranslationOptions) -> Self {
        Self {
            options,
            policy: FailurePolicy::default(),
            exprs: &StructuralExprLowering,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_expr_lowering(mut self, exprs: &'a dyn ExprLowering) -> Self {
        self.exprs = exprs;
        self
    }

    pub fn translate(&self, program: &Program) -> Result<Translation> {
        let types = TypeTable::new(program);
        let index = SubtypeIndex::from_table(program, &types);
        let sink = ProgramSink::new();
        let cx = TranslationContext {
            options: self.options,
            program,
            types: &types,
            sink: &sink,
        };

        let methods: Vec<MethodSource<'_>> = program
            .all_types()
            .into_iter()
            .flat_map(|owner| {
                owner
                    .methods
                    .iter()
                    .map(move |method| MethodSource { owner, method })
            })
            .collect();
        tracing::info!(
            "translating {} methods of {} types with {} workers",
            methods.len(),
            types.len(),
            self.worker_count(methods.len())
        );

        let results = self.run_workers(&methods, |source| {
            lower_one(&cx, &index, self.exprs, source)
        });

        let diagnostics = DiagnosticManager::new();
        let mut procedures = Vec::with_capacity(methods.len());
        let mut skipped = Vec::new();
        for (source, result) in methods.iter().zip(results) {
            match result {
                Ok(procedure) => procedures.push(procedure),
                Err(err) => {
                    let name = source.method.reference(&source.owner.name).procedure_name();
                    diagnostics.add_diagnostic(Diagnostic::from_error(&err, name.clone()));
                    match self.policy {
                        FailurePolicy::Abort => return Err(err),
                        FailurePolicy::Skip => {
                            tracing::warn!("skipping {}: {}", name, err);
                            skipped.push(name);
                        }
                    }
                }
            }
        }

        procedures.push(Procedure::declaration(
            ALLOC_PROC,
            vec![VarDecl::new("type", VirTy::Type)],
            vec![VarDecl::new("object", VirTy::Ref)],
        ));
        procedures.extend(sink.helper_declarations());

        Ok(Translation {
            program: program_skeleton(program, &types, procedures)?,
            diagnostics: diagnostics.take(),
            skipped,
        })
    }

    fn worker_count(&self, jobs: usize) -> usize {
        self.options.jobs.max(1).min(jobs.max(1))
    }

    /// Apply `work` to every item on a scoped worker pool, keeping input order.
    fn run_workers<T, R, F>(&self, items: &[T], work: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync,
    {
        let workers = self.worker_count(items.len());
        if workers == 1 {
            return items.iter().map(&work).collect();
        }
        let mut indexed: Vec<(usize, R)> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    let work = &work;
                    scope.spawn(move || {
                        items
                            .iter()
                            .enumerate()
                            .skip(worker)
                            .step_by(workers)
                            .map(|(i, item)| (i, work(item)))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| match handle.join() {
                    Ok(results) => results,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });
        indexed.sort_by_key(|(i, _)| *i);
        indexed.into_iter().map(|(_, r)| r).collect()
    }
}

fn lower_one(
    cx: &TranslationContext<'_>,
    index: &SubtypeIndex,
    exprs: &dyn ExprLowering,
    source: &MethodSource<'_>,
) -> Result<Procedure> {
    let method = match &source.method.body {
        Some(body) => {
            let mut devirtualizer = Devirtualizer::new(index, cx.types);
            let body = devirtualizer.transform(body.clone())?;
            if devirtualizer.rewritten() > 0 {
                tracing::debug!(
                    "{}: {} call sites devirtualized",
                    source.method.name,
                    devirtualizer.rewritten()
                );
            }
            MethodDef {
                body: Some(body),
                ..source.method.clone()
            }
        }
        None => source.method.clone(),
    };
    let mut lowerer = ProcedureLowerer::new(cx, exprs);
    lowerer.transform(MethodSource {
        owner: source.owner,
        method: &method,
    })
}

/// Type constants, the exception global and the field maps around the procedures.
fn program_skeleton(
    program: &Program,
    types: &TypeTable<'_>,
    procedures: Vec<Procedure>,
) -> Result<vir::Program> {
    let type_constants = types
        .iter()
        .map(|def| Name::new(format!("T${}", def.name)))
        .collect();
    let mut globals = vec![VarDecl::new(EXCEPTION_VAR, VirTy::Ref)];
    let mut field_maps = Vec::new();
    for def in program.all_types() {
        for field in &def.fields {
            let decl = VarDecl::new(
                format!("{}.{}", def.name, field.name),
                vir_ty(&field.ty, Span::default())?,
            );
            if field.is_static {
                globals.push(decl);
            } else {
                field_maps.push(decl);
            }
        }
    }
    Ok(vir::Program {
        type_constants,
        globals,
        field_maps,
        procedures,
    })
}
