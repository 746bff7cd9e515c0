//! Execution engine tests
//!
//! Projection behaviour is exercised through the public processor API with
//! the built-in expression evaluator.

pub mod common_test_utils;
pub mod processors;
