//! Attribute-based access-control decision core: principal and context
//! types, the policy model, the evaluator, and the data-scope resolver.

pub mod context;
pub mod decision;
pub mod engine;
pub mod policy;
pub mod principal;
pub mod registry;
