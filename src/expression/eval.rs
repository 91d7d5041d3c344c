//! Expression evaluation implementation.

use crate::access::{Record, Value};
use crate::edm::{PrimitiveKind, PropertyPath};
use crate::error::{ODataError, Result};
use crate::expression::{BinaryOperator, LambdaKind, QueryNode, UnaryOperator};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::sync::Arc;

/// Evaluator for expressions against one record
pub struct ExpressionEvaluator<'a> {
    /// The record being filtered
    record: &'a dyn Record,
    /// Lambda parameters in scope, innermost last
    bindings: Vec<(String, Arc<dyn Record>)>,
}

impl<'a> ExpressionEvaluator<'a> {
    /// Create a new evaluator for a record
    pub fn new(record: &'a dyn Record) -> Self {
        Self {
            record,
            bindings: Vec::new(),
        }
    }

    /// Evaluate an expression and return the result
    pub fn evaluate(&self, node: &QueryNode) -> Result<Value> {
        match node {
            QueryNode::Constant(constant) => Ok(constant.value().clone()),

            QueryNode::PropertyAccess { path, parameter } => {
                self.evaluate_property(path, parameter.as_deref())
            }

            QueryNode::BinaryOperator {
                left,
                operator,
                right,
            } => match operator {
                BinaryOperator::And | BinaryOperator::Or => {
                    self.evaluate_logical(*operator, left, right)
                }
                _ => {
                    let left_val = self.evaluate(left)?;
                    let right_val = self.evaluate(right)?;
                    self.evaluate_binary_op(*operator, left_val, right_val)
                }
            },

            QueryNode::UnaryOperator { operator, operand } => {
                let operand_val = self.evaluate(operand)?;
                self.evaluate_unary_op(*operator, operand_val)
            }

            QueryNode::FunctionCall {
                function,
                parameters,
            } => {
                let arguments = parameters
                    .iter()
                    .map(|p| self.evaluate(p))
                    .collect::<Result<Vec<_>>>()?;
                function.evaluate(&arguments)
            }

            QueryNode::Lambda {
                source,
                kind,
                parameter,
                body,
            } => self.evaluate_lambda(source, *kind, parameter, body.as_deref()),
        }
    }

    /// Evaluate a filter predicate; only `true` keeps the record
    pub fn evaluate_predicate(&self, node: &QueryNode) -> Result<bool> {
        match self.evaluate(node)? {
            Value::Boolean(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(ODataError::evaluation(format!(
                "The expression '{}' evaluated to {:?} instead of a boolean",
                node, other
            ))),
        }
    }

    /// Walk a property path; a null along the way yields null
    fn evaluate_property(&self, path: &PropertyPath, parameter: Option<&str>) -> Result<Value> {
        let root: &dyn Record = match parameter {
            Some(name) => self
                .bindings
                .iter()
                .rev()
                .find(|(alias, _)| alias == name)
                .map(|(_, record)| record.as_ref())
                .ok_or_else(|| {
                    ODataError::evaluation(format!("The lambda parameter '{}' is not bound", name))
                })?,
            None => self.record,
        };

        let mut segments = path.segments();
        let first = match segments.next() {
            Some(property) => property,
            None => return Ok(Value::Null),
        };
        let mut value = root.field(first.name());

        for property in segments {
            value = match value {
                Value::Null => return Ok(Value::Null),
                Value::Record(record) => record.field(property.name()),
                other => {
                    return Err(ODataError::evaluation(format!(
                        "Cannot read '{}' from {:?} in the path '{}'",
                        property.name(),
                        other,
                        path
                    )))
                }
            };
        }
        Ok(value)
    }

    /// Three-valued `and`/`or`
    fn evaluate_logical(
        &self,
        op: BinaryOperator,
        left: &QueryNode,
        right: &QueryNode,
    ) -> Result<Value> {
        let left_val = self.evaluate(left)?;
        // false and x = false, true or x = true
        match (op, &left_val) {
            (BinaryOperator::And, Value::Boolean(false)) => return Ok(Value::Boolean(false)),
            (BinaryOperator::Or, Value::Boolean(true)) => return Ok(Value::Boolean(true)),
            _ => {}
        }
        let right_val = self.evaluate(right)?;

        let as_logical = |value: &Value| match value {
            Value::Boolean(b) => Ok(Some(*b)),
            Value::Null => Ok(None),
            other => Err(ODataError::evaluation(format!(
                "The operator '{}' requires boolean operands, found {:?}",
                op, other
            ))),
        };

        let result = match (op, as_logical(&left_val)?, as_logical(&right_val)?) {
            (BinaryOperator::And, Some(false), _) | (BinaryOperator::And, _, Some(false)) => {
                Some(false)
            }
            (BinaryOperator::And, Some(true), Some(true)) => Some(true),
            (BinaryOperator::Or, Some(true), _) | (BinaryOperator::Or, _, Some(true)) => {
                Some(true)
            }
            (BinaryOperator::Or, Some(false), Some(false)) => Some(false),
            _ => None,
        };
        Ok(result.map_or(Value::Null, Value::Boolean))
    }

    /// Evaluate a binary operation other than `and`/`or`
    fn evaluate_binary_op(&self, op: BinaryOperator, left: Value, right: Value) -> Result<Value> {
        match op {
            // null is a value for equality
            BinaryOperator::Eq => Ok(Value::Boolean(values_equal(&left, &right)?)),
            BinaryOperator::Ne => Ok(Value::Boolean(!values_equal(&left, &right)?)),

            // Ordering against null is never true
            BinaryOperator::Gt => self.compare_values(&left, &right, Ordering::is_gt),
            BinaryOperator::Ge => self.compare_values(&left, &right, Ordering::is_ge),
            BinaryOperator::Lt => self.compare_values(&left, &right, Ordering::is_lt),
            BinaryOperator::Le => self.compare_values(&left, &right, Ordering::is_le),

            BinaryOperator::Has => match (&left, &right) {
                (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
                (Value::Enum(value), Value::Enum(flags)) if value.type_key == flags.type_key => {
                    Ok(Value::Boolean(value.has(flags)))
                }
                _ => Err(invalid_operands(op, &left, &right)),
            },

            BinaryOperator::Add
            | BinaryOperator::Sub
            | BinaryOperator::Mul
            | BinaryOperator::Div
            | BinaryOperator::Mod => {
                if left.is_null() || right.is_null() {
                    return Ok(Value::Null);
                }
                arithmetic(op, &left, &right)
            }

            BinaryOperator::And | BinaryOperator::Or => Err(ODataError::evaluation(format!(
                "The operator '{}' must be evaluated as a logical operator",
                op
            ))),
        }
    }

    /// Evaluate a unary operation
    fn evaluate_unary_op(&self, op: UnaryOperator, operand: Value) -> Result<Value> {
        match op {
            UnaryOperator::Not => match operand {
                Value::Null => Ok(Value::Null),
                Value::Boolean(b) => Ok(Value::Boolean(!b)),
                other => Err(ODataError::evaluation(format!(
                    "The operator '{}' requires a boolean operand, found {:?}",
                    op, other
                ))),
            },
        }
    }

    /// Compare two values and apply a comparison function
    fn compare_values<F>(&self, left: &Value, right: &Value, cmp_fn: F) -> Result<Value>
    where
        F: FnOnce(Ordering) -> bool,
    {
        if left.is_null() || right.is_null() {
            return Ok(Value::Boolean(false));
        }
        match left.compare(right) {
            Some(ordering) => Ok(Value::Boolean(cmp_fn(ordering))),
            None => Err(ODataError::evaluation(format!(
                "Cannot compare {:?} with {:?}",
                left, right
            ))),
        }
    }

    fn evaluate_lambda(
        &self,
        source: &QueryNode,
        kind: LambdaKind,
        parameter: &str,
        body: Option<&QueryNode>,
    ) -> Result<Value> {
        let items = match self.evaluate(source)? {
            Value::Collection(items) => items,
            // An absent collection has no elements
            Value::Null => Vec::new(),
            other => {
                return Err(ODataError::evaluation(format!(
                    "The lambda source '{}' is not a collection: {:?}",
                    source, other
                )))
            }
        };

        let body = match body {
            Some(body) => body,
            None => return Ok(Value::Boolean(!items.is_empty())),
        };

        for item in items {
            let record = match item {
                Value::Record(record) => record,
                other => {
                    return Err(ODataError::evaluation(format!(
                        "The lambda parameter '{}' must range over records, found {:?}",
                        parameter, other
                    )))
                }
            };
            let mut bindings = self.bindings.clone();
            bindings.push((parameter.to_string(), record));
            let inner = ExpressionEvaluator {
                record: self.record,
                bindings,
            };
            let matched = inner.evaluate_predicate(body)?;
            match kind {
                LambdaKind::Any if matched => return Ok(Value::Boolean(true)),
                LambdaKind::All if !matched => return Ok(Value::Boolean(false)),
                _ => {}
            }
        }

        Ok(Value::Boolean(kind == LambdaKind::All))
    }
}

/// Helper function to evaluate an expression against a record
pub fn evaluate_expression(node: &QueryNode, record: &dyn Record) -> Result<Value> {
    ExpressionEvaluator::new(record).evaluate(node)
}

fn invalid_operands(op: BinaryOperator, left: &Value, right: &Value) -> ODataError {
    ODataError::evaluation(format!(
        "The operator '{}' cannot be applied to {:?} and {:?}",
        op, left, right
    ))
}

/// Equality with null treated as a value
fn values_equal(left: &Value, right: &Value) -> Result<bool> {
    match (left, right) {
        (Value::Null, Value::Null) => Ok(true),
        (Value::Null, _) | (_, Value::Null) => Ok(false),
        (Value::Record(_), Value::Record(_)) | (Value::Collection(_), Value::Collection(_)) => {
            Ok(left == right)
        }
        _ => match left.compare(right) {
            Some(ordering) => Ok(ordering == Ordering::Equal),
            None => Err(ODataError::evaluation(format!(
                "Cannot compare {:?} with {:?}",
                left, right
            ))),
        },
    }
}

/// Arithmetic over two non-null numerics, promoted to the wider kind
fn arithmetic(op: BinaryOperator, left: &Value, right: &Value) -> Result<Value> {
    let kind = match (left.primitive_kind(), right.primitive_kind()) {
        (Some(l), Some(r)) => l.promote(r),
        _ => None,
    }
    .ok_or_else(|| invalid_operands(op, left, right))?;

    let overflow = || ODataError::evaluation(format!("Arithmetic overflow in '{}'", op));
    let division_by_zero = || ODataError::evaluation("Division by zero");

    match kind {
        PrimitiveKind::Int32 | PrimitiveKind::Int64 => {
            let (a, b) = left
                .as_i64()
                .zip(right.as_i64())
                .ok_or_else(|| invalid_operands(op, left, right))?;
            let result = match op {
                BinaryOperator::Add => a.checked_add(b),
                BinaryOperator::Sub => a.checked_sub(b),
                BinaryOperator::Mul => a.checked_mul(b),
                BinaryOperator::Div if b == 0 => return Err(division_by_zero()),
                BinaryOperator::Div => a.checked_div(b),
                BinaryOperator::Mod if b == 0 => return Err(division_by_zero()),
                BinaryOperator::Mod => a.checked_rem(b),
                _ => None,
            }
            .ok_or_else(overflow)?;
            if kind == PrimitiveKind::Int32 {
                i32::try_from(result)
                    .map(Value::Int32)
                    .map_err(|_| overflow())
            } else {
                Ok(Value::Int64(result))
            }
        }
        PrimitiveKind::Decimal => {
            let (a, b): (Decimal, Decimal) = left
                .as_decimal()
                .zip(right.as_decimal())
                .ok_or_else(|| invalid_operands(op, left, right))?;
            let result = match op {
                BinaryOperator::Add => a.checked_add(b),
                BinaryOperator::Sub => a.checked_sub(b),
                BinaryOperator::Mul => a.checked_mul(b),
                BinaryOperator::Div if b.is_zero() => return Err(division_by_zero()),
                BinaryOperator::Div => a.checked_div(b),
                BinaryOperator::Mod if b.is_zero() => return Err(division_by_zero()),
                BinaryOperator::Mod => a.checked_rem(b),
                _ => None,
            }
            .ok_or_else(overflow)?;
            Ok(Value::Decimal(result))
        }
        PrimitiveKind::Single | PrimitiveKind::Double => {
            let (a, b) = left
                .as_f64()
                .zip(right.as_f64())
                .ok_or_else(|| invalid_operands(op, left, right))?;
            let result = match op {
                BinaryOperator::Add => a + b,
                BinaryOperator::Sub => a - b,
                BinaryOperator::Mul => a * b,
                BinaryOperator::Div => a / b,
                BinaryOperator::Mod => a % b,
                _ => return Err(invalid_operands(op, left, right)),
            };
            Ok(if kind == PrimitiveKind::Single {
                Value::Single(result as f32)
            } else {
                Value::Double(result)
            })
        }
        _ => Err(invalid_operands(op, left, right)),
    }
}
