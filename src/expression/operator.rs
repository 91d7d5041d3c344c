//! Operator definitions for filter expressions.

use crate::edm::{EdmType, PrimitiveKind};
use std::fmt;

/// Binary operators supported in filter expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    // Comparison
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,

    // Enum flags
    Has,

    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Logical
    And,
    Or,
}

impl BinaryOperator {
    /// Look up an operator by its keyword, e.g. `eq`
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "eq" => BinaryOperator::Eq,
            "ne" => BinaryOperator::Ne,
            "gt" => BinaryOperator::Gt,
            "ge" => BinaryOperator::Ge,
            "lt" => BinaryOperator::Lt,
            "le" => BinaryOperator::Le,
            "has" => BinaryOperator::Has,
            "add" => BinaryOperator::Add,
            "sub" => BinaryOperator::Sub,
            "mul" => BinaryOperator::Mul,
            "div" => BinaryOperator::Div,
            "mod" => BinaryOperator::Mod,
            "and" => BinaryOperator::And,
            "or" => BinaryOperator::Or,
            _ => return None,
        })
    }

    /// Binding strength within a clause; higher binds tighter.
    ///
    /// `and`/`or` are not ranked here: the parser splits clauses at them first.
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOperator::Has => 5,
            BinaryOperator::Mul | BinaryOperator::Div | BinaryOperator::Mod => 4,
            BinaryOperator::Add | BinaryOperator::Sub => 3,
            BinaryOperator::Gt | BinaryOperator::Ge | BinaryOperator::Lt | BinaryOperator::Le => 2,
            BinaryOperator::Eq | BinaryOperator::Ne => 1,
            BinaryOperator::And | BinaryOperator::Or => 0,
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Eq
                | BinaryOperator::Ne
                | BinaryOperator::Gt
                | BinaryOperator::Ge
                | BinaryOperator::Lt
                | BinaryOperator::Le
        )
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Sub
                | BinaryOperator::Mul
                | BinaryOperator::Div
                | BinaryOperator::Mod
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }

    /// Get the output type of this operator given input types.
    ///
    /// `None` for either side stands for a `null` literal, which fits any operand.
    pub fn output_type(&self, left: Option<&EdmType>, right: Option<&EdmType>) -> Option<EdmType> {
        let boolean = EdmType::Primitive(PrimitiveKind::Boolean);
        match self {
            BinaryOperator::And | BinaryOperator::Or => {
                let fits = |t: Option<&EdmType>| t.map_or(true, EdmType::is_boolean);
                (fits(left) && fits(right)).then_some(boolean)
            }

            BinaryOperator::Eq | BinaryOperator::Ne => match (left, right) {
                (Some(l), Some(r)) if !Self::comparable(l, r) => None,
                _ => Some(boolean),
            },

            BinaryOperator::Gt | BinaryOperator::Ge | BinaryOperator::Lt | BinaryOperator::Le => {
                match (left, right) {
                    (Some(l), Some(r)) if !Self::comparable(l, r) => None,
                    (Some(EdmType::Complex(_)), _)
                    | (_, Some(EdmType::Complex(_)))
                    | (Some(EdmType::Collection(_)), _)
                    | (_, Some(EdmType::Collection(_))) => None,
                    _ => Some(boolean),
                }
            }

            BinaryOperator::Has => match (left, right) {
                (Some(EdmType::Enum(l)), Some(EdmType::Enum(r))) if l == r => Some(boolean),
                (Some(EdmType::Enum(_)), None) => Some(boolean),
                _ => None,
            },

            BinaryOperator::Add
            | BinaryOperator::Sub
            | BinaryOperator::Mul
            | BinaryOperator::Div
            | BinaryOperator::Mod => {
                let numeric = |t: Option<&EdmType>| t.map(|t| t.primitive_kind());
                match (numeric(left), numeric(right)) {
                    (Some(Some(l)), Some(Some(r))) => l.promote(r).map(EdmType::Primitive),
                    (Some(Some(k)), None) | (None, Some(Some(k))) if k.is_numeric() => {
                        Some(EdmType::Primitive(k))
                    }
                    _ => None,
                }
            }
        }
    }

    /// Two operand types can be compared for (in)equality or order
    fn comparable(left: &EdmType, right: &EdmType) -> bool {
        match (left, right) {
            (EdmType::Primitive(l), EdmType::Primitive(r)) => {
                l == r || (l.is_numeric() && r.is_numeric())
            }
            (l, r) => l == r,
        }
    }

    /// Get the keyword for this operator
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Eq => "eq",
            BinaryOperator::Ne => "ne",
            BinaryOperator::Gt => "gt",
            BinaryOperator::Ge => "ge",
            BinaryOperator::Lt => "lt",
            BinaryOperator::Le => "le",
            BinaryOperator::Has => "has",
            BinaryOperator::Add => "add",
            BinaryOperator::Sub => "sub",
            BinaryOperator::Mul => "mul",
            BinaryOperator::Div => "div",
            BinaryOperator::Mod => "mod",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unary operators supported in filter expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Not,
}

impl UnaryOperator {
    /// Get the output type of this operator given input type
    pub fn output_type(&self, operand: Option<&EdmType>) -> Option<EdmType> {
        match self {
            UnaryOperator::Not => match operand {
                None => Some(EdmType::Primitive(PrimitiveKind::Boolean)),
                Some(t) if t.is_boolean() => Some(t.clone()),
                Some(_) => None,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOperator::Not => "not",
        }
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quantifier of a lambda expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LambdaKind {
    Any,
    All,
}

impl LambdaKind {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "any" => Some(LambdaKind::Any),
            "all" => Some(LambdaKind::All),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LambdaKind::Any => "any",
            LambdaKind::All => "all",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edm::TypeKey;

    fn primitive(kind: PrimitiveKind) -> EdmType {
        EdmType::Primitive(kind)
    }

    #[test]
    fn test_binary_operator_output_types() {
        let int32 = primitive(PrimitiveKind::Int32);
        let int64 = primitive(PrimitiveKind::Int64);
        let decimal = primitive(PrimitiveKind::Decimal);
        let string = primitive(PrimitiveKind::String);
        let boolean = primitive(PrimitiveKind::Boolean);

        // Arithmetic promotes
        assert_eq!(
            BinaryOperator::Add.output_type(Some(&int32), Some(&int64)),
            Some(int64.clone())
        );
        assert_eq!(
            BinaryOperator::Mul.output_type(Some(&decimal), Some(&int32)),
            Some(decimal.clone())
        );
        assert_eq!(BinaryOperator::Sub.output_type(Some(&string), Some(&int32)), None);

        // Comparison
        assert_eq!(
            BinaryOperator::Gt.output_type(Some(&decimal), Some(&int32)),
            Some(boolean.clone())
        );
        assert_eq!(
            BinaryOperator::Eq.output_type(Some(&string), None),
            Some(boolean.clone())
        );
        assert_eq!(BinaryOperator::Eq.output_type(Some(&string), Some(&int32)), None);

        // Logical
        assert_eq!(
            BinaryOperator::And.output_type(Some(&boolean), Some(&boolean)),
            Some(boolean.clone())
        );
        assert_eq!(BinaryOperator::Or.output_type(Some(&int32), Some(&boolean)), None);
    }

    #[test]
    fn test_has_requires_matching_enum() {
        struct Colour;
        struct Size;
        let colour = EdmType::Enum(TypeKey::of::<Colour>());
        let size = EdmType::Enum(TypeKey::of::<Size>());
        assert!(BinaryOperator::Has.output_type(Some(&colour), Some(&colour)).is_some());
        assert!(BinaryOperator::Has.output_type(Some(&colour), Some(&size)).is_none());
    }

    #[test]
    fn test_precedence_order() {
        assert!(BinaryOperator::Has.precedence() > BinaryOperator::Mul.precedence());
        assert!(BinaryOperator::Mul.precedence() > BinaryOperator::Add.precedence());
        assert!(BinaryOperator::Add.precedence() > BinaryOperator::Lt.precedence());
        assert!(BinaryOperator::Lt.precedence() > BinaryOperator::Eq.precedence());
        assert_eq!(BinaryOperator::Div.precedence(), BinaryOperator::Mod.precedence());
    }

    #[test]
    fn test_operator_display() {
        assert_eq!(BinaryOperator::from_keyword("mod"), Some(BinaryOperator::Mod));
        assert_eq!(BinaryOperator::from_keyword("like"), None);
        assert_eq!(BinaryOperator::Ge.to_string(), "ge");
        assert_eq!(UnaryOperator::Not.to_string(), "not");
        assert_eq!(LambdaKind::from_keyword("all"), Some(LambdaKind::All));
    }
}
