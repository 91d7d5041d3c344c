//! Type checking for expressions.

use crate::edm::{EdmModel, EdmType, PrimitiveKind};
use crate::error::{ODataError, Result};
use crate::expression::QueryNode;

/// Type checker for filter trees
pub struct TypeChecker<'a> {
    /// Model used to name types in error messages
    model: &'a EdmModel,
}

impl<'a> TypeChecker<'a> {
    pub fn new(model: &'a EdmModel) -> Self {
        Self { model }
    }

    /// Type check an expression and return its output type.
    ///
    /// `None` is the type of a `null` literal, and of anything derived only from one.
    pub fn check(&self, node: &QueryNode) -> Result<Option<EdmType>> {
        match node {
            QueryNode::Constant(constant) => Ok(constant.edm_type().cloned()),

            QueryNode::PropertyAccess { path, .. } => {
                Ok(Some(path.terminal().property_type().clone()))
            }

            QueryNode::BinaryOperator {
                left,
                operator,
                right,
            } => {
                let left_type = self.check(left)?;
                let right_type = self.check(right)?;

                // Arithmetic over a lone null stays untyped
                if operator.is_arithmetic() && (left_type.is_none() || right_type.is_none()) {
                    if let Some(t) = left_type.as_ref().or(right_type.as_ref()) {
                        if !t.is_numeric() {
                            return Err(self.invalid_operands(
                                operator.as_str(),
                                left_type.as_ref(),
                                right_type.as_ref(),
                            ));
                        }
                    }
                    return Ok(None);
                }

                operator
                    .output_type(left_type.as_ref(), right_type.as_ref())
                    .map(Some)
                    .ok_or_else(|| {
                        self.invalid_operands(
                            operator.as_str(),
                            left_type.as_ref(),
                            right_type.as_ref(),
                        )
                    })
            }

            QueryNode::UnaryOperator { operator, operand } => {
                let operand_type = self.check(operand)?;
                operator
                    .output_type(operand_type.as_ref())
                    .map(Some)
                    .ok_or_else(|| {
                        self.invalid_operands(operator.as_str(), operand_type.as_ref(), None)
                    })
            }

            QueryNode::FunctionCall {
                function,
                parameters,
            } => {
                let types = parameters
                    .iter()
                    .map(|p| self.check(p))
                    .collect::<Result<Vec<_>>>()?;
                function.return_type(&types).map(Some).ok_or_else(|| {
                    let names: Vec<String> = types.iter().map(|t| self.describe(t.as_ref())).collect();
                    ODataError::syntax(format!(
                        "The function '{}' cannot be applied to ({})",
                        function,
                        names.join(", ")
                    ))
                    .with_target(function.name())
                })
            }

            QueryNode::Lambda { body, .. } => {
                if let Some(body) = body {
                    self.check_predicate(body)?;
                }
                Ok(Some(EdmType::Primitive(PrimitiveKind::Boolean)))
            }
        }
    }

    /// Check that an expression can be used as a filter predicate
    pub fn check_filter_predicate(&self, node: &QueryNode) -> Result<()> {
        self.check_predicate(node)
    }

    fn check_predicate(&self, node: &QueryNode) -> Result<()> {
        match self.check(node)? {
            None => Ok(()),
            Some(t) if t.is_boolean() => Ok(()),
            Some(t) => Err(ODataError::syntax(format!(
                "The expression '{}' is of type '{}', expected 'Edm.Boolean'",
                node,
                self.model.type_name(&t)
            ))),
        }
    }

    fn describe(&self, edm_type: Option<&EdmType>) -> String {
        edm_type.map_or_else(|| "null".to_string(), |t| self.model.type_name(t))
    }

    fn invalid_operands(
        &self,
        operator: &str,
        left: Option<&EdmType>,
        right: Option<&EdmType>,
    ) -> ODataError {
        let message = match right {
            Some(_) => format!(
                "The operator '{}' cannot be applied to '{}' and '{}'",
                operator,
                self.describe(left),
                self.describe(right)
            ),
            None => format!(
                "The operator '{}' cannot be applied to '{}'",
                operator,
                self.describe(left)
            ),
        };
        ODataError::syntax(message).with_target(operator)
    }
}
