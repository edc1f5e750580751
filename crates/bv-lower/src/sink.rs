//! State shared by every procedure of one whole-program translation.

use std::sync::atomic::{AtomicU64, Ordering};

use bv_core::ast::TypeRef;
use bv_core::collections::ConcurrentMap;
use bv_core::vir::{Name, Procedure, VarDecl, VirTy, RECORD_PROC};

/// Helper procedures requested while lowering and the program-wide counters.
/// Shared by reference across worker threads.
#[derive(Default)]
pub struct ProgramSink {
    struct_copies: ConcurrentMap<TypeRef, Procedure>,
    record_procs: ConcurrentMap<VirTy, Procedure>,
    breadcrumbs: AtomicU64,
    capture_states: AtomicU64,
}

impl ProgramSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// `S.#copy_ctor`, the bit-wise copy of struct `S`.
    pub fn struct_copy_procedure(&self, ty: &TypeRef) -> Name {
        self.struct_copies
            .get_or_insert_with(ty.clone(), |ty| {
                Procedure::declaration(
                    format!("{}.#copy_ctor", ty),
                    vec![VarDecl::new("this", VirTy::Ref)],
                    vec![VarDecl::new("copy", VirTy::Ref)],
                )
            })
            .name
    }

    /// `$Record.<ty>`, the trace hook for values of IR type `ty`.
    pub fn record_procedure(&self, ty: VirTy) -> Name {
        self.record_procs
            .get_or_insert_with(ty, |ty| {
                Procedure::declaration(
                    format!("{}.{}", RECORD_PROC, ty),
                    vec![VarDecl::new("value", *ty)],
                    Vec::new(),
                )
            })
            .name
    }

    /// Unique across the whole translation, whatever thread asks.
    pub fn next_breadcrumb(&self) -> u64 {
        self.breadcrumbs.fetch_add(1, Ordering::Relaxed)
    }

    pub fn next_capture_state(&self) -> u64 {
        self.capture_states.fetch_add(1, Ordering::Relaxed)
    }

    /// Declarations of every helper requested so far, ordered by name.
    pub fn helper_declarations(&self) -> Vec<Procedure> {
        let mut helpers = self
            .struct_copies
            .values_sorted_by_key(|p| p.name.clone());
        helpers.extend(self.record_procs.values_sorted_by_key(|p| p.name.clone()));
        helpers
    }
}
