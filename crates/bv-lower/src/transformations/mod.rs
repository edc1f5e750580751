use bv_core::Result;

pub mod ast_to_vir;
pub mod devirtualize;

pub use ast_to_vir::*;
pub use devirtualize::*;

/// One lowering or rewriting step from `Src` to `Dst`.
pub trait IrTransform<Src, Dst> {
    fn transform(&mut self, source: Src) -> Result<Dst>;
}
