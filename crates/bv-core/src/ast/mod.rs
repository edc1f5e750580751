//! Structured source program: type definitions, statements and expressions.
//!
//! The tree is produced by a front end (or deserialized from JSON) and is never
//! mutated by the lowering.

mod expr;
mod ident;
mod item;
mod stmt;
mod ty;

pub use expr::*;
pub use ident::*;
pub use item::*;
pub use stmt::*;
pub use ty::*;

/// Front-end assigned identity of a statement or expression.
pub type NodeId = u32;
