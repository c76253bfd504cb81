//! Dialect-configurable SQL lexing and parser-cursor support.
//!
//! This crate covers the front half of the sqlvine toolkit: turning SQL
//! text into tokens and walking the token stream from a grammar.
//!
//! - [`dialect`] describes how one SQL dialect tokenizes: quote pairs,
//!   comment markers, keyword tables, escape sets and literal prefixes,
//!   compiled once into immutable [`DialectRules`].
//! - [`lexer`] scans a SQL string into [`Token`]s in a single pass,
//!   resolving multi-word keywords and operators through the dialect's
//!   keyword trie.
//! - [`cursor`] wraps the resulting token stream with the matching,
//!   backtracking and error-reporting primitives a recursive-descent
//!   parser is written against.
//!
//! ```
//! use sqlvine_parser::{Cursor, DialectRules, ErrorLevel, Lexer, TokenKind};
//!
//! let rules = DialectRules::ansi();
//! let tokens = Lexer::new(&rules).tokenize("SELECT 1")?;
//! assert_eq!(tokens[0].kind, TokenKind::Select);
//!
//! let mut cursor = Cursor::new(ErrorLevel::Collect, 100, 3);
//! cursor.load("SELECT 1", tokens);
//! assert!(cursor.match_kind(TokenKind::Select, true, None));
//! # Ok::<(), sqlvine_parser::LexError>(())
//! ```

pub mod cursor;
pub mod dialect;
pub mod lexer;
pub mod token;
mod trie;

pub use cursor::Cursor;
pub use dialect::{DialectBuilder, DialectRules};
pub use lexer::Lexer;
pub use sqlvine_error::{ErrorLevel, LexError, ParseError};
pub use token::{Token, TokenKind};
