//! Query validation against caller policy.
//!
//! Parsing only checks that a query is well formed and type correct. The checks
//! here decide whether it is allowed: which options may be used, which operators
//! and functions a filter may contain, and how large `$top` may be.

use crate::error::{ODataError, Result};
use crate::expression::{BinaryOperator, Function, QueryNode, UnaryOperator};
use crate::query_options::{QueryOptions, SystemQueryOption};
use std::collections::HashSet;

/// What a query may use. `None` for an allow list means everything is allowed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationSettings {
    allowed_options: Option<HashSet<SystemQueryOption>>,
    allowed_operators: Option<HashSet<BinaryOperator>>,
    allowed_unary_operators: Option<HashSet<UnaryOperator>>,
    allowed_functions: Option<HashSet<Function>>,
    max_top: Option<usize>,
}

impl ValidationSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_options(mut self, options: impl IntoIterator<Item = SystemQueryOption>) -> Self {
        self.allowed_options = Some(options.into_iter().collect());
        self
    }

    /// Restrict the binary operators a filter may use: comparison, logical,
    /// arithmetic and `has` alike.
    pub fn allow_operators(mut self, operators: impl IntoIterator<Item = BinaryOperator>) -> Self {
        self.allowed_operators = Some(operators.into_iter().collect());
        self
    }

    /// Restrict the unary operators a filter may use; an empty list denies `not`
    pub fn allow_unary_operators(
        mut self,
        operators: impl IntoIterator<Item = UnaryOperator>,
    ) -> Self {
        self.allowed_unary_operators = Some(operators.into_iter().collect());
        self
    }

    pub fn allow_functions(mut self, functions: impl IntoIterator<Item = Function>) -> Self {
        self.allowed_functions = Some(functions.into_iter().collect());
        self
    }

    pub fn with_max_top(mut self, max_top: usize) -> Self {
        self.max_top = Some(max_top);
        self
    }

    pub fn max_top(&self) -> Option<usize> {
        self.max_top
    }

    pub fn is_option_allowed(&self, option: SystemQueryOption) -> bool {
        self.allowed_options
            .as_ref()
            .map_or(true, |allowed| allowed.contains(&option))
    }

    pub fn is_operator_allowed(&self, operator: BinaryOperator) -> bool {
        self.allowed_operators
            .as_ref()
            .map_or(true, |allowed| allowed.contains(&operator))
    }

    pub fn is_unary_operator_allowed(&self, operator: UnaryOperator) -> bool {
        self.allowed_unary_operators
            .as_ref()
            .map_or(true, |allowed| allowed.contains(&operator))
    }

    pub fn is_function_allowed(&self, function: Function) -> bool {
        self.allowed_functions
            .as_ref()
            .map_or(true, |allowed| allowed.contains(&function))
    }
}

/// Check parsed `options` against `settings`.
///
/// Options are parsed on the way, so a malformed option fails with its parse error
/// before any policy is applied to it.
pub fn validate(options: &QueryOptions, settings: &ValidationSettings) -> Result<()> {
    for option in options.raw().options() {
        if !settings.is_option_allowed(option) {
            return Err(ODataError::validation(
                format!("The query option '{}' is not allowed", option),
                option.name(),
            ));
        }
    }

    if let (Some(top), Some(max_top)) = (options.top()?, settings.max_top()) {
        if top > max_top {
            return Err(ODataError::validation(
                format!(
                    "The limit of '{}' for $top was exceeded, the requested value was '{}'",
                    max_top, top
                ),
                SystemQueryOption::Top.name(),
            ));
        }
    }

    if let Some(filter) = options.filter()? {
        validate_filter(filter, settings)?;
    }

    log::debug!("query for '{}' passed validation", options.entity_set().name());
    Ok(())
}

/// Check every operator and function in a filter tree
pub fn validate_filter(filter: &QueryNode, settings: &ValidationSettings) -> Result<()> {
    let mut violation = None;
    filter.walk(&mut |node| {
        if violation.is_some() {
            return;
        }
        violation = match node {
            QueryNode::BinaryOperator { operator, .. } if !settings.is_operator_allowed(*operator) => {
                Some(ODataError::validation(
                    format!("The operator '{}' is not allowed in $filter", operator),
                    operator.as_str(),
                ))
            }
            QueryNode::UnaryOperator { operator, .. }
                if !settings.is_unary_operator_allowed(*operator) =>
            {
                Some(ODataError::validation(
                    format!("The operator '{}' is not allowed in $filter", operator),
                    operator.as_str(),
                ))
            }
            QueryNode::FunctionCall { function, .. } if !settings.is_function_allowed(*function) => {
                Some(ODataError::validation(
                    format!("The function '{}' is not allowed in $filter", function.name()),
                    function.name(),
                ))
            }
            _ => None,
        };
    });
    violation.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo;
    use std::sync::Arc;

    fn check(query: &str, settings: &ValidationSettings) -> Result<()> {
        let options = QueryOptions::parse(query, "Products", Arc::new(demo::model()?))?;
        validate(&options, settings)
    }

    #[test]
    fn test_default_allows_everything() -> Result<()> {
        check(
            "$filter=contains(Name, 'i') and Price mul 2 gt 800M&$top=1000&$orderby=Name",
            &ValidationSettings::default(),
        )
    }

    #[test]
    fn test_disallowed_option() -> Result<()> {
        let settings = ValidationSettings::new()
            .allow_options([SystemQueryOption::Filter, SystemQueryOption::Top]);
        check("$filter=Id eq 1&$top=2", &settings)?;

        let err = check("$filter=Id eq 1&$orderby=Name", &settings).unwrap_err();
        assert!(matches!(err, ODataError::Validation { .. }));
        assert_eq!(err.target(), Some("$orderby"));
        Ok(())
    }

    #[test]
    fn test_max_top() -> Result<()> {
        let settings = ValidationSettings::new().with_max_top(10);
        check("$top=10", &settings)?;
        check("", &settings)?;

        let err = check("$top=11", &settings).unwrap_err();
        assert_eq!(err.target(), Some("$top"));
        assert!(err.to_string().contains("'10'"));
        Ok(())
    }

    #[test]
    fn test_disallowed_operator() -> Result<()> {
        let settings = ValidationSettings::new().allow_operators([
            BinaryOperator::And,
            BinaryOperator::Eq,
            BinaryOperator::Lt,
            BinaryOperator::Gt,
        ]);
        check("$filter=Id eq 1 and Price lt 500M", &settings)?;

        let err = check("$filter=Id eq 1 or Id eq 2", &settings).unwrap_err();
        assert_eq!(err.target(), Some("or"));

        let err = check("$filter=Price add 1M gt 500M", &settings).unwrap_err();
        assert_eq!(err.target(), Some("add"));

        let err = check("$filter=Price ge 500M", &settings).unwrap_err();
        assert!(matches!(err, ODataError::Validation { .. }));
        assert_eq!(err.target(), Some("ge"));
        Ok(())
    }

    #[test]
    fn test_disallowed_not() -> Result<()> {
        check("$filter=not (Id eq 1)", &ValidationSettings::default())?;

        let settings = ValidationSettings::new().allow_unary_operators(std::iter::empty());
        check("$filter=Id eq 1", &settings)?;
        let err = check("$filter=Id eq 2 and not (Id eq 1)", &settings).unwrap_err();
        assert!(matches!(err, ODataError::Validation { .. }));
        assert_eq!(err.target(), Some("not"));

        let settings = ValidationSettings::new().allow_unary_operators([UnaryOperator::Not]);
        check("$filter=not (Id eq 1)", &settings)
    }

    #[test]
    fn test_disallowed_function() -> Result<()> {
        let settings = ValidationSettings::new().allow_functions([Function::StartsWith]);
        check("$filter=startswith(Name, 'i')", &settings)?;

        let err = check("$filter=Id eq 1 and contains(Name, 'i')", &settings).unwrap_err();
        assert_eq!(err.target(), Some("contains"));
        Ok(())
    }

    #[test]
    fn test_parse_errors_come_first() -> Result<()> {
        let settings = ValidationSettings::new().with_max_top(1);
        let err = check("$top=x", &settings).unwrap_err();
        assert!(matches!(err, ODataError::Syntax { .. }));
        Ok(())
    }
}
