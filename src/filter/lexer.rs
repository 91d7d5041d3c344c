// Filter lexer - tokenizes $filter expressions

use super::token::{Token, TokenKind};
use crate::error::{ODataError, Result};
use once_cell::sync::OnceCell;
use regex_lite::Regex;

/// What must come right after a match for it to count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Follow {
    Any,
    WhitespaceOrEnd,
    WhitespaceOrParen,
    OpenParen,
    /// End of input or a character that cannot continue an identifier
    WordBoundary,
}

impl Follow {
    fn accepts(&self, rest: &str) -> bool {
        let next = rest.chars().next();
        match self {
            Follow::Any => true,
            Follow::WhitespaceOrEnd => next.map_or(true, char::is_whitespace),
            Follow::WhitespaceOrParen => next.map_or(true, |c| c.is_whitespace() || c == '('),
            Follow::OpenParen => next == Some('('),
            Follow::WordBoundary => next.map_or(true, |c| !(c.is_alphanumeric() || c == '_')),
        }
    }
}

struct TokenDefinition {
    kind: TokenKind,
    regex: Regex,
    follow: Follow,
}

// Tried top to bottom; the first definition that matches and whose follow check
// passes wins, so specific patterns sit above the general ones they overlap.
const PATTERNS: &[(TokenKind, &str, Follow)] = &[
    (TokenKind::Whitespace, r"^\s+", Follow::Any),
    (TokenKind::OpenParen, r"^\(", Follow::Any),
    (TokenKind::CloseParen, r"^\)", Follow::Any),
    (TokenKind::Comma, r"^,", Follow::Any),
    (TokenKind::And, r"^and", Follow::WhitespaceOrEnd),
    (TokenKind::Or, r"^or", Follow::WhitespaceOrEnd),
    (TokenKind::Not, r"^not", Follow::WhitespaceOrParen),
    (
        TokenKind::BinaryOperator,
        r"^(?:eq|ne|gt|ge|lt|le|has|add|sub|mul|div|mod)",
        Follow::WhitespaceOrEnd,
    ),
    (TokenKind::Boolean, r"^(?:true|false)", Follow::WordBoundary),
    (TokenKind::Null, r"^null", Follow::WordBoundary),
    (TokenKind::Binary, r"^binary'[A-Za-z0-9+/]*={0,2}'", Follow::Any),
    (
        TokenKind::Duration,
        r"^duration'-?P(?:\d+D)?(?:T(?:\d+H)?(?:\d+M)?(?:\d+(?:\.\d+)?S)?)?'",
        Follow::Any,
    ),
    (
        TokenKind::Enum,
        r"^[A-Za-z_]\w*(?:\.[A-Za-z_]\w*)+'[^']*'",
        Follow::Any,
    ),
    (
        TokenKind::DateTimeOffset,
        r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:\d{2})?",
        Follow::WordBoundary,
    ),
    (
        TokenKind::Guid,
        r"^[0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12}",
        Follow::WordBoundary,
    ),
    (TokenKind::Date, r"^\d{4}-\d{2}-\d{2}", Follow::WordBoundary),
    (
        TokenKind::TimeOfDay,
        r"^\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?",
        Follow::WordBoundary,
    ),
    (TokenKind::Decimal, r"^-?\d+(?:\.\d+)?[mM]", Follow::WordBoundary),
    (
        TokenKind::Single,
        r"^-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?[fF]",
        Follow::WordBoundary,
    ),
    (
        TokenKind::Double,
        r"^-?\d+(?:(?:\.\d+)?[eE][+-]?\d+[dD]?|\.\d+[dD]?|[dD])",
        Follow::WordBoundary,
    ),
    (TokenKind::Integer, r"^-?\d+[lL]?", Follow::WordBoundary),
    (TokenKind::String, r"^'(?:[^']|'')*'", Follow::Any),
    (
        TokenKind::Lambda,
        r"^[A-Za-z_]\w*(?:/[A-Za-z_]\w*)*/(?:any|all)",
        Follow::OpenParen,
    ),
    (TokenKind::LambdaParameter, r"^[A-Za-z_]\w*:", Follow::Any),
    (TokenKind::FunctionName, r"^[A-Za-z_]\w*", Follow::OpenParen),
    (
        TokenKind::PropertyPath,
        r"^[A-Za-z_]\w*(?:/[A-Za-z_]\w*)*",
        Follow::WordBoundary,
    ),
];

static DEFINITIONS: OnceCell<Vec<TokenDefinition>> = OnceCell::new();

fn definitions() -> Result<&'static [TokenDefinition]> {
    DEFINITIONS
        .get_or_try_init(|| {
            PATTERNS
                .iter()
                .map(|(kind, pattern, follow)| {
                    Regex::new(pattern)
                        .map(|regex| TokenDefinition {
                            kind: *kind,
                            regex,
                            follow: *follow,
                        })
                        .map_err(|e| {
                            ODataError::configuration(format!(
                                "Invalid token pattern for {:?}: {}",
                                kind, e
                            ))
                        })
                })
                .collect()
        })
        .map(Vec::as_slice)
}

pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    /// Get the next token, skipping whitespace. `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>> {
        loop {
            let rest = &self.input[self.position..];
            if rest.is_empty() {
                return Ok(None);
            }

            let (kind, matched) = Self::match_token(rest)?.ok_or_else(|| {
                let fragment: String = rest
                    .chars()
                    .take_while(|c| !c.is_whitespace())
                    .take(24)
                    .collect();
                ODataError::syntax_at(
                    format!(
                        "Unrecognized input '{}' at position {}",
                        fragment, self.position
                    ),
                    self.position,
                    fragment,
                )
            })?;

            let start = self.position;
            self.position += matched.len();

            match kind {
                TokenKind::Whitespace => continue,
                TokenKind::LambdaParameter => {
                    let alias = matched.trim_end_matches(':');
                    return Ok(Some(Token::new(kind, alias, start)));
                }
                _ => return Ok(Some(Token::new(kind, matched, start))),
            }
        }
    }

    /// Find the highest priority definition matching the start of `rest`
    fn match_token(rest: &str) -> Result<Option<(TokenKind, &str)>> {
        for definition in definitions()? {
            if let Some(m) = definition.regex.find(rest) {
                if m.end() > 0 && definition.follow.accepts(&rest[m.end()..]) {
                    return Ok(Some((definition.kind, m.as_str())));
                }
            }
        }
        Ok(None)
    }

    /// Tokenize the whole input
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        log::trace!(
            "tokenized '{}': {:?}",
            self.input,
            tokens.iter().map(|t| (t.kind, t.value.as_str())).collect::<Vec<_>>()
        );
        Ok(tokens)
    }
}

/// Tokenize a filter expression
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    Lexer::new(input).tokenize()
}
