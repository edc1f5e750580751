// bv-lower: lowering of the structured program representation into the
// verification IR
//
// Architecture:
// - queries: read-only facts about the program (hierarchy, overrides, label scopes)
// - transformations: devirtualization and AST -> VIR lowering
// - driver: whole-program translation over a worker pool

pub mod driver;
pub mod error;
pub mod queries;
pub mod sink;
pub mod transformations;

pub use driver::*;
pub use queries::*;
pub use sink::ProgramSink;
pub use transformations::*;
