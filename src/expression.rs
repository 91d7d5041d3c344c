//! Filter expression trees.
//!
//! This module provides:
//! - The `QueryNode` tree and its operators
//! - Literal constants and canonical functions
//! - Type checking of finished trees
//! - Evaluation against records

pub mod eval;
pub mod function;
pub mod literal;
pub mod node;
pub mod operator;
pub mod type_checker;

pub use eval::{evaluate_expression, ExpressionEvaluator};
pub use function::Function;
pub use literal::ConstantNode;
pub use node::QueryNode;
pub use operator::{BinaryOperator, LambdaKind, UnaryOperator};
pub use type_checker::TypeChecker;
