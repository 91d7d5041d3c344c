// Filter module - $filter tokenizing and parsing

pub mod lexer;
pub mod parser;
pub mod token;

pub use lexer::{tokenize, Lexer};
pub use parser::{parse_filter, Parser};
pub use token::{Token, TokenKind};
