//! Error types shared by the model, parser, query options and executors.

use thiserror::Error;

/// Errors raised while building a model, parsing a query or evaluating it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ODataError {
    /// The host type graph could not be turned into a model.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The query text could not be tokenized or parsed.
    #[error("Syntax error: {message}")]
    Syntax {
        message: String,
        position: Option<usize>,
        target: Option<String>,
    },

    /// A name in the query does not exist in the model.
    #[error("Resolution error: {message}")]
    Resolution {
        message: String,
        target: Option<String>,
    },

    /// The API was called with arguments that can never succeed.
    #[error("Usage error: {message}")]
    Usage {
        message: String,
        target: Option<String>,
    },

    /// The query is well formed but not allowed by the active settings.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        target: Option<String>,
    },

    /// A record could not be evaluated against the expression.
    #[error("Evaluation error: {message}")]
    Evaluation { message: String },
}

impl ODataError {
    pub fn configuration(message: impl Into<String>) -> Self {
        ODataError::Configuration {
            message: message.into(),
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        ODataError::Syntax {
            message: message.into(),
            position: None,
            target: None,
        }
    }

    /// Syntax error pointing at the offending fragment of the input.
    pub fn syntax_at(message: impl Into<String>, position: usize, fragment: impl Into<String>) -> Self {
        ODataError::Syntax {
            message: message.into(),
            position: Some(position),
            target: Some(fragment.into()),
        }
    }

    pub fn resolution(message: impl Into<String>, target: impl Into<String>) -> Self {
        ODataError::Resolution {
            message: message.into(),
            target: Some(target.into()),
        }
    }

    pub fn usage(message: impl Into<String>, target: Option<&str>) -> Self {
        ODataError::Usage {
            message: message.into(),
            target: target.map(str::to_string),
        }
    }

    pub fn validation(message: impl Into<String>, target: impl Into<String>) -> Self {
        ODataError::Validation {
            message: message.into(),
            target: Some(target.into()),
        }
    }

    pub fn evaluation(message: impl Into<String>) -> Self {
        ODataError::Evaluation {
            message: message.into(),
        }
    }

    /// The option, property, operator or function the error is about, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            ODataError::Syntax { target, .. }
            | ODataError::Resolution { target, .. }
            | ODataError::Usage { target, .. }
            | ODataError::Validation { target, .. } => target.as_deref(),
            ODataError::Configuration { .. } | ODataError::Evaluation { .. } => None,
        }
    }

    /// Position in the query text, for syntax errors raised by the tokenizer or parser.
    pub fn position(&self) -> Option<usize> {
        match self {
            ODataError::Syntax { position, .. } => *position,
            _ => None,
        }
    }

    /// Attach a target to an error that does not carry one yet.
    pub fn with_target(self, new_target: &str) -> Self {
        match self {
            ODataError::Syntax {
                message,
                position,
                target: None,
            } => ODataError::Syntax {
                message,
                position,
                target: Some(new_target.to_string()),
            },
            ODataError::Usage {
                message,
                target: None,
            } => ODataError::Usage {
                message,
                target: Some(new_target.to_string()),
            },
            other => other,
        }
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, ODataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ODataError::syntax_at("unbalanced parenthesis", 4, ")");
        assert_eq!(err.to_string(), "Syntax error: unbalanced parenthesis");
        assert_eq!(err.position(), Some(4));
        assert_eq!(err.target(), Some(")"));

        let err = ODataError::resolution("The type 'Product' does not contain a property named 'Foo'", "Foo");
        assert_eq!(
            err.to_string(),
            "Resolution error: The type 'Product' does not contain a property named 'Foo'"
        );
        assert_eq!(err.target(), Some("Foo"));

        let err = ODataError::configuration("unsupported generic type");
        assert_eq!(err.target(), None);
        assert_eq!(err.position(), None);
    }

    #[test]
    fn test_with_target() {
        let err = ODataError::syntax("bad value").with_target("$top");
        assert_eq!(err.target(), Some("$top"));

        // An existing target is kept
        let err = ODataError::syntax_at("bad", 0, "x").with_target("$filter");
        assert_eq!(err.target(), Some("x"));

        let err = ODataError::evaluation("division by zero").with_target("$filter");
        assert_eq!(err.target(), None);
    }
}
