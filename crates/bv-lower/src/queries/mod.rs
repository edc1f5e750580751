// Queries - read-only facts about the program, computed once and shared

pub mod hierarchy;
pub mod label_scopes;
pub mod overrides;

pub use hierarchy::*;
pub use label_scopes::*;
pub use overrides::*;
