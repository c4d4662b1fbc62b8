//! Builders for constructing modules and function bodies in memory.
//!
//! This is the surface the host loader targets, and the way the test suites
//! assemble inputs.

mod func_builder;
mod module_builder;

pub use func_builder::FunctionBuilder;
pub use module_builder::ModuleBuilder;
