// Filter tokens for lexical analysis

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Delimiters
    OpenParen,
    CloseParen,
    Comma,

    // Logical
    And,
    Or,
    Not,

    // eq ne gt ge lt le has add sub mul div mod
    BinaryOperator,

    // Literals
    Boolean,
    Null,
    Binary,
    Date,
    DateTimeOffset,
    TimeOfDay,
    Guid,
    Decimal,
    Double,
    Single,
    Duration,
    Enum,
    Integer,
    String,

    // Identifiers
    /// `Path/any` or `Path/all`, always followed by `(`
    Lambda,
    /// `alias:` inside a lambda
    LambdaParameter,
    /// Identifier followed by `(`
    FunctionName,
    PropertyPath,

    // Special
    Whitespace,
}

impl TokenKind {
    /// Check if the token is a literal
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TokenKind::Boolean
                | TokenKind::Null
                | TokenKind::Binary
                | TokenKind::Date
                | TokenKind::DateTimeOffset
                | TokenKind::TimeOfDay
                | TokenKind::Guid
                | TokenKind::Decimal
                | TokenKind::Double
                | TokenKind::Single
                | TokenKind::Duration
                | TokenKind::Enum
                | TokenKind::Integer
                | TokenKind::String
        )
    }

    /// `and` or `or`
    pub fn is_logical(&self) -> bool {
        matches!(self, TokenKind::And | TokenKind::Or)
    }
}

/// A token and where it starts in the filter text
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    /// Byte offset into the filter text
    pub position: usize,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            value: value.into(),
            position,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' at position {}", self.value, self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert!(TokenKind::Decimal.is_literal());
        assert!(TokenKind::Enum.is_literal());
        assert!(!TokenKind::PropertyPath.is_literal());
        assert!(TokenKind::Or.is_logical());
        assert!(!TokenKind::Not.is_logical());
    }

    #[test]
    fn test_display() {
        let token = Token::new(TokenKind::BinaryOperator, "eq", 5);
        assert_eq!(token.to_string(), "'eq' at position 5");
    }
}
