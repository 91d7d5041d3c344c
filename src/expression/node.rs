//! Expression tree definitions.

use crate::access::Value;
use crate::edm::PropertyPath;
use crate::expression::function::Function;
use crate::expression::literal::ConstantNode;
use crate::expression::operator::{BinaryOperator, LambdaKind, UnaryOperator};
use std::fmt;
use std::sync::Arc;

/// Expression tree node
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    /// Binary operation
    BinaryOperator {
        left: Box<QueryNode>,
        operator: BinaryOperator,
        right: Box<QueryNode>,
    },

    /// Unary operation
    UnaryOperator {
        operator: UnaryOperator,
        operand: Box<QueryNode>,
    },

    /// Literal constant
    Constant(Arc<ConstantNode>),

    /// Property path, optionally rooted at a lambda parameter
    PropertyAccess {
        path: Arc<PropertyPath>,
        parameter: Option<String>,
    },

    /// Canonical function call
    FunctionCall {
        function: Function,
        parameters: Vec<QueryNode>,
    },

    /// `any`/`all` over a collection-valued property
    Lambda {
        source: Box<QueryNode>,
        kind: LambdaKind,
        parameter: String,
        body: Option<Box<QueryNode>>,
    },
}

impl QueryNode {
    /// Create a binary operation node
    pub fn binary(left: QueryNode, operator: BinaryOperator, right: QueryNode) -> Self {
        QueryNode::BinaryOperator {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }

    pub fn not(operand: QueryNode) -> Self {
        QueryNode::UnaryOperator {
            operator: UnaryOperator::Not,
            operand: Box::new(operand),
        }
    }

    pub fn constant(node: Arc<ConstantNode>) -> Self {
        QueryNode::Constant(node)
    }

    pub fn property(path: Arc<PropertyPath>) -> Self {
        QueryNode::PropertyAccess {
            path,
            parameter: None,
        }
    }

    /// The constant's value, if this is a constant
    pub fn constant_value(&self) -> Option<&Value> {
        match self {
            QueryNode::Constant(node) => Some(node.value()),
            _ => None,
        }
    }

    /// Visit this node and every node below it, parents first
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a QueryNode)) {
        visit(self);
        match self {
            QueryNode::BinaryOperator { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            QueryNode::UnaryOperator { operand, .. } => operand.walk(visit),
            QueryNode::FunctionCall { parameters, .. } => {
                for parameter in parameters {
                    parameter.walk(visit);
                }
            }
            QueryNode::Lambda { source, body, .. } => {
                source.walk(visit);
                if let Some(body) = body {
                    body.walk(visit);
                }
            }
            QueryNode::Constant(_) | QueryNode::PropertyAccess { .. } => {}
        }
    }
}

/// Fully parenthesized rendering, so grouping is visible
impl fmt::Display for QueryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryNode::BinaryOperator {
                left,
                operator,
                right,
            } => write!(f, "({} {} {})", left, operator, right),
            QueryNode::UnaryOperator { operator, operand } => {
                write!(f, "({} {})", operator, operand)
            }
            QueryNode::Constant(node) => f.write_str(node.literal_text()),
            QueryNode::PropertyAccess { path, parameter } => match parameter {
                Some(parameter) => write!(f, "{}/{}", parameter, path),
                None => write!(f, "{}", path),
            },
            QueryNode::FunctionCall {
                function,
                parameters,
            } => {
                write!(f, "{}(", function)?;
                for (i, parameter) in parameters.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", parameter)?;
                }
                f.write_str(")")
            }
            QueryNode::Lambda {
                source,
                kind,
                parameter,
                body,
            } => match body {
                Some(body) => write!(f, "{}/{}({}: {})", source, kind.as_str(), parameter, body),
                None => write!(f, "{}/{}()", source, kind.as_str()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::{self, Product};
    use crate::edm::TypeKey;
    use crate::error::Result;

    #[test]
    fn test_display_and_walk() -> Result<()> {
        let model = demo::model()?;
        let price = model.resolve_path(TypeKey::of::<Product>(), "Price")?;
        let name = model.resolve_path(TypeKey::of::<Product>(), "Name")?;

        let node = QueryNode::binary(
            QueryNode::not(QueryNode::binary(
                QueryNode::property(price),
                BinaryOperator::Gt,
                QueryNode::constant(ConstantNode::int32_zero()),
            )),
            BinaryOperator::Or,
            QueryNode::FunctionCall {
                function: Function::Contains,
                parameters: vec![
                    QueryNode::property(name),
                    QueryNode::constant(ConstantNode::null()),
                ],
            },
        );
        assert_eq!(
            node.to_string(),
            "((not (Price gt 0)) or contains(Name, null))"
        );

        let mut count = 0;
        node.walk(&mut |_| count += 1);
        assert_eq!(count, 8);
        Ok(())
    }
}
