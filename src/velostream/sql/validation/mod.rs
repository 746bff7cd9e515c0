//! SQL validation support used at plan compile time.

pub mod function_registry;

pub use function_registry::{FUNCTION_REGISTRY, FunctionKind, FunctionRegistry};
