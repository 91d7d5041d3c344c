// Filter parser - reduces tokens to a QueryNode tree

use super::lexer::Lexer;
use super::token::{Token, TokenKind};
use crate::edm::{EdmModel, PropertyPath, TypeKey};
use crate::error::{ODataError, Result};
use crate::expression::{
    BinaryOperator, ConstantNode, Function, LambdaKind, QueryNode, TypeChecker,
};
use std::sync::Arc;

/// Types visible while parsing: the entity type plus any lambda parameters
#[derive(Debug, Clone)]
struct Scope {
    type_key: TypeKey,
    /// Innermost parameter last
    parameters: Vec<(String, TypeKey)>,
}

impl Scope {
    fn parameter(&self, alias: &str) -> Option<TypeKey> {
        self.parameters
            .iter()
            .rev()
            .find(|(name, _)| name == alias)
            .map(|(_, key)| *key)
    }

    fn with_parameter(&self, alias: &str, type_key: TypeKey) -> Scope {
        let mut inner = self.clone();
        inner.parameters.push((alias.to_string(), type_key));
        inner
    }
}

/// Read position within one clause
struct Cursor<'t> {
    tokens: &'t [Token],
    position: usize,
}

impl<'t> Cursor<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Cursor {
            tokens,
            position: 0,
        }
    }

    fn current(&self) -> Option<&'t Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.position);
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }
}

pub struct Parser<'m> {
    model: &'m EdmModel,
    scope: Scope,
}

impl<'m> Parser<'m> {
    /// Create a parser resolving property paths against `type_key`
    pub fn new(model: &'m EdmModel, type_key: TypeKey) -> Self {
        Parser {
            model,
            scope: Scope {
                type_key,
                parameters: Vec::new(),
            },
        }
    }

    /// Parse a filter expression into a tree, without type checking it
    pub fn parse(&self, input: &str) -> Result<QueryNode> {
        let tokens = Lexer::new(input).tokenize()?;
        if tokens.is_empty() {
            return Err(ODataError::syntax("The filter expression is empty"));
        }
        check_balance(&tokens, input.len())?;
        self.parse_expression(&tokens, &self.scope)
    }

    /// Split at top-level `and`/`or`, reduce each clause, combine left to right
    fn parse_expression(&self, tokens: &[Token], scope: &Scope) -> Result<QueryNode> {
        let mut clauses: Vec<&[Token]> = Vec::new();
        let mut operators: Vec<&Token> = Vec::new();
        let mut depth = 0usize;
        let mut start = 0;

        for (i, token) in tokens.iter().enumerate() {
            match token.kind {
                TokenKind::OpenParen => depth += 1,
                TokenKind::CloseParen => depth = depth.saturating_sub(1),
                TokenKind::And | TokenKind::Or if depth == 0 => {
                    clauses.push(&tokens[start..i]);
                    operators.push(token);
                    start = i + 1;
                }
                _ => {}
            }
        }
        clauses.push(&tokens[start..]);

        let mut clauses = clauses.into_iter();
        let first = clauses.next().unwrap_or_default();
        if first.is_empty() {
            return Err(match operators.first() {
                Some(op) => ODataError::syntax_at(
                    format!("Operator with no left-hand operand: {}", op),
                    op.position,
                    op.value.as_str(),
                ),
                None => ODataError::syntax("The filter expression is empty"),
            });
        }

        let mut root = self.parse_clause(first, scope)?;
        for (op, clause) in operators.into_iter().zip(clauses) {
            if clause.is_empty() {
                return Err(no_right_operand(op));
            }
            let operator = if op.kind == TokenKind::And {
                BinaryOperator::And
            } else {
                BinaryOperator::Or
            };
            let right = self.parse_clause(clause, scope)?;
            root = QueryNode::binary(root, operator, right);
        }
        Ok(root)
    }

    /// Reduce one clause; a leading `not` wraps the rest of the clause
    fn parse_clause(&self, tokens: &[Token], scope: &Scope) -> Result<QueryNode> {
        if let Some((first, rest)) = tokens.split_first() {
            if first.kind == TokenKind::Not {
                if rest.is_empty() {
                    return Err(no_right_operand(first));
                }
                return Ok(QueryNode::not(self.parse_clause(rest, scope)?));
            }
        }

        let mut cursor = Cursor::new(tokens);
        let node = self.parse_binary(&mut cursor, scope, 1)?;
        match cursor.current() {
            Some(token) => Err(unexpected(token)),
            None => Ok(node),
        }
    }

    /// Precedence climbing over the non-logical binary operators
    fn parse_binary(&self, cursor: &mut Cursor<'_>, scope: &Scope, min: u8) -> Result<QueryNode> {
        let mut left = self.parse_operand(cursor, scope)?;

        while let Some(token) = cursor.current() {
            if token.kind != TokenKind::BinaryOperator {
                break;
            }
            let operator =
                BinaryOperator::from_keyword(&token.value).ok_or_else(|| unexpected(token))?;
            let precedence = operator.precedence();
            if precedence < min {
                break;
            }
            cursor.advance();
            if cursor.is_at_end() {
                return Err(no_right_operand(token));
            }
            let right = self.parse_binary(cursor, scope, precedence + 1)?;
            left = QueryNode::binary(left, operator, right);
        }

        Ok(left)
    }

    fn parse_operand(&self, cursor: &mut Cursor<'_>, scope: &Scope) -> Result<QueryNode> {
        let token = cursor
            .advance()
            .ok_or_else(|| ODataError::syntax("Expected an operand at the end of the input"))?;

        match token.kind {
            TokenKind::OpenParen => {
                let inner = take_group(cursor, token)?;
                if inner.is_empty() {
                    return Err(ODataError::syntax_at(
                        format!("Empty parentheses at position {}", token.position),
                        token.position,
                        "()",
                    ));
                }
                self.parse_expression(inner, scope)
            }

            TokenKind::FunctionName => self.parse_function(cursor, token, scope),

            TokenKind::Lambda => self.parse_lambda(cursor, token, scope),

            TokenKind::PropertyPath => {
                let (path, parameter) = self.resolve_path(&token.value, scope)?;
                Ok(QueryNode::PropertyAccess { path, parameter })
            }

            kind if kind.is_literal() => Ok(QueryNode::constant(ConstantNode::parse(
                kind,
                &token.value,
                self.model,
            )?)),

            _ => Err(unexpected(token)),
        }
    }

    fn parse_function(
        &self,
        cursor: &mut Cursor<'_>,
        name: &Token,
        scope: &Scope,
    ) -> Result<QueryNode> {
        let function = Function::from_name(&name.value).ok_or_else(|| {
            ODataError::resolution(
                format!("Unknown function '{}' at position {}", name.value, name.position),
                name.value.as_str(),
            )
        })?;

        let open = cursor.advance().ok_or_else(|| unexpected(name))?;
        let inner = take_group(cursor, open)?;
        if inner.is_empty() {
            return Err(ODataError::syntax_at(
                format!("The function '{}' requires at least one parameter", function),
                name.position,
                function.name(),
            ));
        }

        let mut parameters = Vec::new();
        for argument in split_arguments(inner) {
            match argument {
                Ok(tokens) => parameters.push(self.parse_expression(tokens, scope)?),
                Err(comma) => {
                    return Err(ODataError::syntax_at(
                        format!(
                            "Empty parameter in the call to '{}' at position {}",
                            function, comma.position
                        ),
                        comma.position,
                        function.name(),
                    ))
                }
            }
        }

        if !function.arity().contains(&parameters.len()) {
            return Err(ODataError::syntax_at(
                format!(
                    "The function '{}' takes {} parameter(s), found {}",
                    function,
                    describe_arity(function),
                    parameters.len()
                ),
                name.position,
                function.name(),
            ));
        }

        Ok(QueryNode::FunctionCall {
            function,
            parameters,
        })
    }

    fn parse_lambda(&self, cursor: &mut Cursor<'_>, token: &Token, scope: &Scope) -> Result<QueryNode> {
        let (source_text, keyword) = token
            .value
            .rsplit_once('/')
            .ok_or_else(|| unexpected(token))?;
        let kind = LambdaKind::from_keyword(keyword).ok_or_else(|| unexpected(token))?;

        let (path, parameter) = self.resolve_path(source_text, scope)?;
        let element = path
            .terminal()
            .property_type()
            .is_collection()
            .then(|| path.terminal().property_type().complex_key())
            .flatten()
            .ok_or_else(|| {
                ODataError::resolution(
                    format!(
                        "The lambda source '{}' is not a collection of complex values",
                        source_text
                    ),
                    source_text,
                )
            })?;
        let source = Box::new(QueryNode::PropertyAccess { path, parameter });

        let open = cursor.advance().ok_or_else(|| unexpected(token))?;
        let inner = take_group(cursor, open)?;

        let (alias, body_tokens) = match inner.split_first() {
            None if kind == LambdaKind::Any => {
                return Ok(QueryNode::Lambda {
                    source,
                    kind,
                    parameter: String::new(),
                    body: None,
                })
            }
            None => {
                return Err(ODataError::syntax_at(
                    format!("'{}' requires a lambda body", token.value),
                    token.position,
                    token.value.as_str(),
                ))
            }
            Some((first, rest)) if first.kind == TokenKind::LambdaParameter => (first, rest),
            Some((first, _)) => {
                return Err(ODataError::syntax_at(
                    format!("Expected a lambda parameter, found {}", first),
                    first.position,
                    first.value.as_str(),
                ))
            }
        };

        if scope.parameter(&alias.value).is_some() {
            return Err(ODataError::syntax_at(
                format!("The lambda parameter '{}' is already in use", alias.value),
                alias.position,
                alias.value.as_str(),
            ));
        }
        if body_tokens.is_empty() {
            return Err(ODataError::syntax_at(
                format!("The lambda parameter '{}' has no body", alias.value),
                alias.position,
                alias.value.as_str(),
            ));
        }

        let inner_scope = scope.with_parameter(&alias.value, element);
        let body = self.parse_expression(body_tokens, &inner_scope)?;

        Ok(QueryNode::Lambda {
            source,
            kind,
            parameter: alias.value.clone(),
            body: Some(Box::new(body)),
        })
    }

    /// Resolve a path, rooting it at a lambda parameter when its first segment is one
    fn resolve_path(&self, text: &str, scope: &Scope) -> Result<(Arc<PropertyPath>, Option<String>)> {
        let (head, tail) = match text.split_once('/') {
            Some((head, tail)) => (head, Some(tail)),
            None => (text, None),
        };

        match scope.parameter(head) {
            Some(element) => {
                let tail = tail.ok_or_else(|| {
                    ODataError::syntax(format!(
                        "The lambda parameter '{}' must be followed by a property",
                        head
                    ))
                    .with_target(head)
                })?;
                let path = self.model.resolve_path(element, tail)?;
                Ok((path, Some(head.to_string())))
            }
            None => Ok((self.model.resolve_path(scope.type_key, text)?, None)),
        }
    }
}

/// Parse and type check a `$filter` expression against an entity type
pub fn parse_filter(raw: &str, model: &EdmModel, type_key: TypeKey) -> Result<QueryNode> {
    let node = Parser::new(model, type_key).parse(raw)?;
    TypeChecker::new(model).check_filter_predicate(&node)?;
    log::debug!("parsed $filter '{}' as {}", raw, node);
    Ok(node)
}

/// Every `(` must close, and no `)` may come before its `(`
fn check_balance(tokens: &[Token], end: usize) -> Result<()> {
    let mut open = Vec::new();
    for token in tokens {
        match token.kind {
            TokenKind::OpenParen => open.push(token.position),
            TokenKind::CloseParen => {
                if open.pop().is_none() {
                    return Err(ODataError::syntax_at(
                        format!("Unbalanced parenthesis at position {}", token.position),
                        token.position,
                        ")",
                    ));
                }
            }
            _ => {}
        }
    }
    match open.last() {
        Some(position) => Err(ODataError::syntax_at(
            format!(
                "Unbalanced parenthesis at position {}: expected ')' before position {}",
                position, end
            ),
            *position,
            "(",
        )),
        None => Ok(()),
    }
}

/// Consume up to the `)` matching `open`, returning the tokens in between
fn take_group<'t>(cursor: &mut Cursor<'t>, open: &Token) -> Result<&'t [Token]> {
    if open.kind != TokenKind::OpenParen {
        return Err(unexpected(open));
    }
    let start = cursor.position;
    let mut depth = 1usize;
    while let Some(token) = cursor.advance() {
        match token.kind {
            TokenKind::OpenParen => depth += 1,
            TokenKind::CloseParen => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&cursor.tokens[start..cursor.position - 1]);
                }
            }
            _ => {}
        }
    }
    Err(ODataError::syntax_at(
        format!("Unbalanced parenthesis at position {}", open.position),
        open.position,
        "(",
    ))
}

/// Split call arguments at top-level commas; an empty argument yields the comma at fault
fn split_arguments(tokens: &[Token]) -> Vec<std::result::Result<&[Token], &Token>> {
    let mut arguments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::OpenParen => depth += 1,
            TokenKind::CloseParen => depth = depth.saturating_sub(1),
            TokenKind::Comma if depth == 0 => {
                arguments.push(if i == start { Err(token) } else { Ok(&tokens[start..i]) });
                start = i + 1;
            }
            _ => {}
        }
    }

    if start == tokens.len() {
        // Trailing comma
        if let Some(comma) = start.checked_sub(1).and_then(|i| tokens.get(i)) {
            arguments.push(Err(comma));
        }
    } else {
        arguments.push(Ok(&tokens[start..]));
    }
    arguments
}

fn describe_arity(function: Function) -> String {
    let arity = function.arity();
    if arity.start() == arity.end() {
        arity.start().to_string()
    } else {
        format!("{} to {}", arity.start(), arity.end())
    }
}

fn no_right_operand(op: &Token) -> ODataError {
    ODataError::syntax_at(
        format!("Operator with no right-hand operand: {}", op),
        op.position,
        op.value.as_str(),
    )
}

fn unexpected(token: &Token) -> ODataError {
    ODataError::syntax_at(
        format!("Unexpected token {}", token),
        token.position,
        token.value.as_str(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::{self, Category, Employee, Product};
    use pretty_assertions::assert_eq;

    fn parse(filter: &str) -> Result<String> {
        let model = demo::model()?;
        Ok(parse_filter(filter, &model, TypeKey::of::<Product>())?.to_string())
    }

    #[test]
    fn test_logical_combination_is_left_to_right() -> Result<()> {
        assert_eq!(
            parse("Id eq 1 and Name eq 'x' and Price eq 3M")?,
            "(((Id eq 1) and (Name eq 'x')) and (Price eq 3M))"
        );
        assert_eq!(
            parse("(Id eq 1 or Name eq 'x') and Price eq 3M")?,
            "(((Id eq 1) or (Name eq 'x')) and (Price eq 3M))"
        );
        // No and-over-or precedence: strictly source order
        assert_eq!(
            parse("Id eq 1 or Id eq 2 and Id eq 3")?,
            "(((Id eq 1) or (Id eq 2)) and (Id eq 3))"
        );
        Ok(())
    }

    #[test]
    fn test_operator_precedence_within_clause() -> Result<()> {
        assert_eq!(
            parse("Id add 2 mul 3 eq 7")?,
            "((Id add (2 mul 3)) eq 7)"
        );
        assert_eq!(
            parse("Id sub 1 sub 1 eq 0")?,
            "(((Id sub 1) sub 1) eq 0)"
        );
        assert_eq!(
            parse("Price div 2 gt 100 eq true")?,
            "(((Price div 2) gt 100) eq true)"
        );
        assert_eq!(
            parse("Colour has Sample.Model.Colour'Red' eq false")?,
            "((Colour has Sample.Model.Colour'Red') eq false)"
        );
        Ok(())
    }

    #[test]
    fn test_not_applies_to_its_clause() -> Result<()> {
        assert_eq!(
            parse("not Id eq 1 and Id eq 2")?,
            "((not (Id eq 1)) and (Id eq 2))"
        );
        assert_eq!(
            parse("Id eq 2 or not(Id eq 1)")?,
            "((Id eq 2) or (not (Id eq 1)))"
        );
        Ok(())
    }

    #[test]
    fn test_functions_and_paths() -> Result<()> {
        assert_eq!(
            parse("contains(tolower(Name), 'pho') and Category/Name eq 'Phones'")?,
            "(contains(tolower(Name), 'pho') and (Category/Name eq 'Phones'))"
        );
        assert_eq!(
            parse("substring(Name, 1, length(Name) sub 2) eq 'Phon'")?,
            "(substring(Name, 1, (length(Name) sub 2)) eq 'Phon')"
        );
        Ok(())
    }

    #[test]
    fn test_lambdas() -> Result<()> {
        let model = demo::model()?;
        let node = parse_filter(
            "Products/any(p: p/Price gt 500M and p/Category/Id eq Id)",
            &model,
            TypeKey::of::<Category>(),
        )?;
        assert_eq!(
            node.to_string(),
            "Products/any(p: ((p/Price gt 500M) and (p/Category/Id eq Id)))"
        );

        let node = parse_filter("Products/any()", &model, TypeKey::of::<Category>())?;
        assert_eq!(node.to_string(), "Products/any()");

        let err = parse_filter("Products/all()", &model, TypeKey::of::<Category>()).unwrap_err();
        assert!(err.to_string().contains("requires a lambda body"));

        // The source must hold complex values
        let err = parse("Tags/any(t: t eq 'x')").unwrap_err();
        assert!(matches!(err, ODataError::Resolution { .. }));
        assert_eq!(err.target(), Some("Tags"));

        // Paths through the parameter resolve against the element type
        let err = parse_filter(
            "Products/any(p: p/Forename eq 'x')",
            &model,
            TypeKey::of::<Category>(),
        )
        .unwrap_err();
        assert_eq!(err.target(), Some("Forename"));
        Ok(())
    }

    #[test]
    fn test_inherited_and_self_referencing_paths() -> Result<()> {
        let model = demo::model()?;
        let node = parse_filter(
            "Manager/Forename eq 'Margaret' and Level eq Sample.Model.Level'Senior'",
            &model,
            TypeKey::of::<Employee>(),
        )?;
        assert_eq!(
            node.to_string(),
            "((Manager/Forename eq 'Margaret') and (Level eq Sample.Model.Level'Senior'))"
        );
        Ok(())
    }

    #[test]
    fn test_unbalanced_parenthesis() {
        let err = parse("(Id eq 1").unwrap_err();
        assert!(err.to_string().contains("Unbalanced parenthesis"));
        assert_eq!(err.position(), Some(0));

        let err = parse("Id eq 1)").unwrap_err();
        assert!(err.to_string().contains("Unbalanced parenthesis"));
        assert_eq!(err.position(), Some(7));
    }

    #[test]
    fn test_missing_operands() {
        let err = parse("Id eq 1 and").unwrap_err();
        assert!(err.to_string().contains("no right-hand operand"));
        assert_eq!(err.target(), Some("and"));

        let err = parse("Id eq").unwrap_err();
        assert!(err.to_string().contains("no right-hand operand"));
        assert_eq!(err.position(), Some(3));

        let err = parse("and Id eq 1").unwrap_err();
        assert!(err.to_string().contains("no left-hand operand"));

        let err = parse("not").unwrap_err();
        assert!(err.to_string().contains("no right-hand operand"));
    }

    #[test]
    fn test_function_errors() {
        let err = parse("shout(Name) eq 'X'").unwrap_err();
        assert!(matches!(err, ODataError::Resolution { .. }));
        assert_eq!(err.target(), Some("shout"));

        let err = parse("contains(Name) eq true").unwrap_err();
        assert!(err.to_string().contains("takes 2 parameter(s), found 1"));

        let err = parse("contains(Name, ) eq true").unwrap_err();
        assert!(err.to_string().contains("Empty parameter"));

        let err = parse("contains(Name, 'a',)").unwrap_err();
        assert!(err.to_string().contains("Empty parameter"));

        let err = parse("length() eq 1").unwrap_err();
        assert!(err.to_string().contains("at least one parameter"));
    }

    #[test]
    fn test_resolution_errors() {
        let err = parse("Weight gt 1").unwrap_err();
        assert!(matches!(err, ODataError::Resolution { .. }));
        assert_eq!(err.target(), Some("Weight"));

        let err = parse("Name/Length eq 1").unwrap_err();
        assert!(err.to_string().contains("not navigable"));
        assert_eq!(err.target(), Some("Name"));
    }

    #[test]
    fn test_unexpected_tokens() {
        let err = parse("Id eq 1 2").unwrap_err();
        assert!(err.to_string().contains("Unexpected token '2' at position 8"));

        let err = parse("Id eq 1 $").unwrap_err();
        assert!(err.to_string().contains("Unrecognized input"));

        let err = parse("Price add 1").unwrap_err();
        assert!(err.to_string().contains("expected 'Edm.Boolean'"));

        assert!(parse("").is_err());
        assert!(parse("()").is_err());
    }
}
