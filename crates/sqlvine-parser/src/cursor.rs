//! Token cursor for recursive-descent parsers.
//!
//! [`Cursor`] wraps a lexed token stream and exposes the matching
//! primitives a grammar is written against: peeking, kind and text
//! matching with optional consumption, speculative parsing, and error
//! reporting under a configurable [`ErrorLevel`] policy.
//!
//! A stream is split into statement chunks at top-level semicolons when it
//! is loaded; `advance_chunk` moves the cursor to the next statement while
//! the accumulated error list persists across chunks.

use sqlvine_error::{highlight_sql, ErrorLevel, ParseError};
use sqlvine_expr::Expr;

use crate::token::{Token, TokenKind};

/// Statement-chunked token cursor with error collection.
#[derive(Debug)]
pub struct Cursor {
    pub error_level: ErrorLevel,
    /// Characters of surrounding source kept on each side of an error
    /// highlight.
    error_message_context: usize,
    /// Cap on how many collected messages `check_errors` reports.
    max_errors: usize,
    sql: String,
    errors: Vec<ParseError>,
    tokens: Vec<Token>,
    index: isize,
    // Leading comments of the most recently consumed token, until they are
    // forwarded onto an expression node.
    prev_comments: Option<Vec<String>>,
    chunks: Vec<Vec<Token>>,
    chunk_index: usize,
}

impl Cursor {
    #[must_use]
    pub fn new(error_level: ErrorLevel, error_message_context: usize, max_errors: usize) -> Cursor {
        Cursor {
            error_level,
            error_message_context,
            max_errors,
            sql: String::new(),
            errors: Vec::new(),
            tokens: Vec::new(),
            index: 0,
            prev_comments: None,
            chunks: Vec::new(),
            chunk_index: 0,
        }
    }

    /// Loads a fresh token stream, discarding all previous state including
    /// collected errors, and positions the cursor at the first token of the
    /// first statement chunk.
    pub fn load(&mut self, sql: impl Into<String>, tokens: Vec<Token>) {
        self.sql = sql.into();
        self.errors.clear();
        self.tokens.clear();
        self.index = 0;
        self.prev_comments = None;
        self.chunks = split_chunks(tokens);
        self.chunk_index = 0;
        self.advance_chunk();
    }

    /// Moves to the next statement chunk. Returns false when no chunks
    /// remain. Collected errors are kept.
    pub fn advance_chunk(&mut self) -> bool {
        let Some(chunk) = self.chunks.get_mut(self.chunk_index) else {
            return false;
        };
        self.tokens = std::mem::take(chunk);
        self.chunk_index += 1;
        self.index = -1;
        self.advance(1);
        true
    }

    fn token_at(&self, index: isize) -> Option<&Token> {
        usize::try_from(index).ok().and_then(|i| self.tokens.get(i))
    }

    #[must_use]
    pub fn curr(&self) -> Option<&Token> {
        self.token_at(self.index)
    }

    #[must_use]
    pub fn next_token(&self) -> Option<&Token> {
        self.token_at(self.index + 1)
    }

    #[must_use]
    pub fn prev(&self) -> Option<&Token> {
        self.token_at(self.index - 1)
    }

    /// The cursor position, for later [`Cursor::retreat`].
    #[must_use]
    pub fn index(&self) -> isize {
        self.index
    }

    pub fn advance(&mut self, times: isize) {
        self.index += times;
        self.prev_comments = self.prev().map(|t| t.comments.clone());
    }

    pub fn retreat(&mut self, index: isize) {
        if index != self.index {
            self.advance(index - self.index);
        }
    }

    /// Errors collected so far under [`ErrorLevel::Collect`].
    #[must_use]
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Summarizes collected errors as a single failure, reporting at most
    /// `max_errors` messages.
    pub fn check_errors(&self) -> Result<(), ParseError> {
        if self.errors.is_empty() {
            return Ok(());
        }
        let joined = self
            .errors
            .iter()
            .take(self.max_errors)
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        Err(ParseError::message_only(joined))
    }

    /// Forwards pending leading comments from the last consumed token onto
    /// `expression`, then clears them.
    fn forward_comments(&mut self, expression: Option<&Expr>) {
        let Some(expression) = expression else { return };
        if self.prev_comments.as_ref().is_some_and(|c| !c.is_empty()) {
            if let Some(comments) = self.prev_comments.take() {
                expression.add_comments(&comments, false);
            }
        }
    }

    /// Matches the current token's kind. On a match, consumes it when
    /// `advance` is set and forwards pending comments onto `expression`.
    pub fn match_kind(
        &mut self,
        kind: TokenKind,
        advance: bool,
        expression: Option<&Expr>,
    ) -> bool {
        if self.curr().map(|t| t.kind) == Some(kind) {
            if advance {
                self.advance(1);
            }
            self.forward_comments(expression);
            return true;
        }
        false
    }

    /// Matches any of the given kinds.
    pub fn match_any(&mut self, kinds: &[TokenKind], advance: bool) -> bool {
        let matched = self
            .curr()
            .is_some_and(|t| kinds.contains(&t.kind));
        if matched && advance {
            self.advance(1);
        }
        matched
    }

    /// Matches an exact two-token lookahead.
    pub fn match_pair(&mut self, kind_a: TokenKind, kind_b: TokenKind, advance: bool) -> bool {
        let matched = self.curr().map(|t| t.kind) == Some(kind_a)
            && self.next_token().map(|t| t.kind) == Some(kind_b);
        if matched && advance {
            self.advance(2);
        }
        matched
    }

    /// Case-insensitive text match against any of `texts` (uppercase).
    /// String literals never match by text.
    pub fn match_texts(&mut self, texts: &[&str], advance: bool) -> bool {
        let matched = self.curr().is_some_and(|t| {
            t.kind != TokenKind::String && texts.contains(&t.text.to_uppercase().as_str())
        });
        if matched && advance {
            self.advance(1);
        }
        matched
    }

    /// Case-insensitive sequential text match. Fully backtracks on the
    /// first non-matching token; with `advance` unset, backtracks even on
    /// success.
    pub fn match_text_seq(&mut self, texts: &[&str], advance: bool) -> bool {
        let index = self.index;
        for text in texts {
            let matched = self.curr().is_some_and(|t| {
                t.kind != TokenKind::String && t.text.to_uppercase() == *text
            });
            if matched {
                self.advance(1);
            } else {
                self.retreat(index);
                return false;
            }
        }
        if !advance {
            self.retreat(index);
        }
        true
    }

    /// True when the previous and current tokens are adjacent in the
    /// source, with no whitespace between them.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        match (self.prev(), self.curr()) {
            (Some(prev), Some(curr)) => prev.end + 1 == curr.start,
            _ => false,
        }
    }

    /// The source text spanned by two tokens, inclusive.
    #[must_use]
    pub fn find_sql(&self, start: &Token, end: &Token) -> String {
        self.sql
            .chars()
            .skip(start.start)
            .take((end.end + 1).saturating_sub(start.start))
            .collect()
    }

    /// Runs `parse` with the error policy forced to
    /// [`ErrorLevel::Immediate`]. The cursor position is restored when the
    /// method fails or returns nothing (or always, with `retreat` set); the
    /// original error policy is always restored.
    pub fn try_parse<T>(
        &mut self,
        parse: impl FnOnce(&mut Cursor) -> Result<Option<T>, ParseError>,
        retreat: bool,
    ) -> Option<T> {
        let index = self.index;
        let error_level = self.error_level;
        self.error_level = ErrorLevel::Immediate;

        let this = parse(self).unwrap_or_default();

        self.error_level = error_level;
        if this.is_none() || retreat {
            self.retreat(index);
        }
        this
    }

    /// Reports a parse error at `token` (or the current, or previous,
    /// token) according to the error policy: returned under `Immediate`,
    /// collected under `Collect`, discarded under `Ignore`.
    pub fn raise_error(
        &mut self,
        message: impl Into<String>,
        token: Option<&Token>,
    ) -> Result<(), ParseError> {
        let message = message.into();
        let (line, col, start, end) = token
            .or_else(|| self.curr())
            .or_else(|| self.prev())
            .map_or((1, 1, 0, 0), |t| (t.line, t.col, t.start, t.end));

        let (formatted_sql, start_context, highlight, end_context) =
            highlight_sql(&self.sql, (start, end), self.error_message_context);
        let formatted_message = format!("{message}. Line {line}, Col: {col}.\n  {formatted_sql}");

        let error = ParseError {
            message: formatted_message,
            description: message,
            line,
            col,
            start_context,
            highlight,
            end_context,
        };

        match self.error_level {
            ErrorLevel::Immediate => Err(error),
            ErrorLevel::Collect => {
                tracing::debug!(error = %error.description, "collecting parse error");
                self.errors.push(error);
                Ok(())
            }
            ErrorLevel::Ignore => Ok(()),
        }
    }

    /// Routes the expression's validation messages through the error
    /// policy. Under [`ErrorLevel::Ignore`] validation is skipped entirely.
    pub fn validate_expression(
        &mut self,
        expression: &Expr,
        arg_count: Option<usize>,
    ) -> Result<(), ParseError> {
        if self.error_level != ErrorLevel::Ignore {
            for message in expression.error_messages(arg_count) {
                self.raise_error(message, None)?;
            }
        }
        Ok(())
    }
}

/// Splits a token stream into statement chunks at top-level semicolons.
/// The separators themselves are dropped, except that a semicolon carrying
/// comments is kept as its own chunk so the comments survive.
fn split_chunks(tokens: Vec<Token>) -> Vec<Vec<Token>> {
    let total = tokens.len();
    let mut chunks: Vec<Vec<Token>> = vec![Vec::new()];

    for (i, token) in tokens.into_iter().enumerate() {
        if token.kind == TokenKind::Semicolon {
            if !token.comments.is_empty() {
                chunks.push(vec![token]);
            }
            if i + 1 < total {
                chunks.push(Vec::new());
            }
        } else if let Some(last) = chunks.last_mut() {
            last.push(token);
        }
    }

    chunks
}

#[cfg(test)]
mod tests {
    use sqlvine_expr::kind::IDENTIFIER;
    use sqlvine_expr::{Expr, Value};

    use super::*;
    use crate::dialect::DialectRules;
    use crate::lexer::Lexer;

    fn cursor_for(sql: &str) -> Cursor {
        let rules = DialectRules::ansi();
        let tokens = Lexer::new(&rules).tokenize(sql).unwrap();
        let mut cursor = Cursor::new(ErrorLevel::Collect, 100, 3);
        cursor.load(sql, tokens);
        cursor
    }

    #[test]
    fn test_peek_and_advance() {
        let mut cursor = cursor_for("SELECT a FROM t");
        assert_eq!(cursor.curr().map(|t| t.kind), Some(TokenKind::Select));
        assert_eq!(cursor.next_token().map(|t| t.kind), Some(TokenKind::Var));
        assert!(cursor.prev().is_none());

        cursor.advance(1);
        assert_eq!(cursor.prev().map(|t| t.kind), Some(TokenKind::Select));
        assert_eq!(cursor.curr().map(|t| t.text.as_str()), Some("a"));

        cursor.advance(10);
        assert!(cursor.curr().is_none());
        cursor.retreat(0);
        assert_eq!(cursor.curr().map(|t| t.kind), Some(TokenKind::Select));
    }

    #[test]
    fn test_match_kind() {
        let mut cursor = cursor_for("SELECT 1");
        assert!(!cursor.match_kind(TokenKind::From, true, None));
        assert_eq!(cursor.index(), 0);

        assert!(cursor.match_kind(TokenKind::Select, false, None));
        assert_eq!(cursor.index(), 0);

        assert!(cursor.match_kind(TokenKind::Select, true, None));
        assert_eq!(cursor.curr().map(|t| t.kind), Some(TokenKind::Number));
    }

    #[test]
    fn test_match_any_and_pair() {
        let mut cursor = cursor_for("SELECT 1");
        assert!(cursor.match_any(&[TokenKind::Insert, TokenKind::Select], false));
        assert!(cursor.match_pair(TokenKind::Select, TokenKind::Number, true));
        assert!(cursor.curr().is_none());

        let mut cursor = cursor_for("SELECT 1");
        assert!(!cursor.match_pair(TokenKind::Select, TokenKind::Var, true));
        assert_eq!(cursor.index(), 0);
    }

    #[test]
    fn test_match_texts_skips_string_literals() {
        let mut cursor = cursor_for("foo 'foo'");
        assert!(cursor.match_texts(&["FOO"], true));
        // same text, but a string literal never matches by text
        assert!(!cursor.match_texts(&["FOO"], true));
        assert_eq!(cursor.curr().map(|t| t.kind), Some(TokenKind::String));
    }

    #[test]
    fn test_match_text_seq_backtracks() {
        let mut cursor = cursor_for("not materialized x");
        assert!(!cursor.match_text_seq(&["NOT", "BANANA"], true));
        assert_eq!(cursor.index(), 0);

        assert!(cursor.match_text_seq(&["NOT", "MATERIALIZED"], false));
        assert_eq!(cursor.index(), 0);

        assert!(cursor.match_text_seq(&["NOT", "MATERIALIZED"], true));
        assert_eq!(cursor.curr().map(|t| t.text.as_str()), Some("x"));
    }

    #[test]
    fn test_is_connected() {
        let mut cursor = cursor_for("f(x)");
        cursor.advance(1);
        // no whitespace between `f` and `(`
        assert!(cursor.is_connected());

        let mut cursor = cursor_for("f (x)");
        cursor.advance(1);
        assert!(!cursor.is_connected());
    }

    #[test]
    fn test_find_sql() {
        let cursor = cursor_for("SELECT a FROM t");
        let start = cursor.curr().cloned().unwrap();
        let end = cursor.next_token().cloned().unwrap();
        assert_eq!(cursor.find_sql(&start, &end), "SELECT a");
    }

    #[test]
    fn test_try_parse_restores_on_failure() {
        let mut cursor = cursor_for("SELECT 1");
        let result: Option<()> = cursor.try_parse(
            |c| {
                c.advance(1);
                assert_eq!(c.error_level, ErrorLevel::Immediate);
                c.raise_error("nope", None)?;
                Ok(Some(()))
            },
            false,
        );
        assert!(result.is_none());
        assert_eq!(cursor.index(), 0);
        assert_eq!(cursor.error_level, ErrorLevel::Collect);
        // the failure was speculative, nothing was collected
        assert!(cursor.errors().is_empty());
    }

    #[test]
    fn test_try_parse_keeps_position_on_success() {
        let mut cursor = cursor_for("SELECT 1");
        let result = cursor.try_parse(
            |c| {
                c.advance(1);
                Ok(Some("select"))
            },
            false,
        );
        assert_eq!(result, Some("select"));
        assert_eq!(cursor.index(), 1);
    }

    #[test]
    fn test_raise_error_collects() {
        let mut cursor = cursor_for("SELECT 1");
        cursor.advance(1);
        cursor.raise_error("Unexpected token", None).unwrap();

        let errors = cursor.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].description, "Unexpected token");
        assert!(errors[0].message.contains("Line 1, Col: 8"));
        assert_eq!(errors[0].highlight, "1");
        assert!(cursor.check_errors().is_err());
    }

    #[test]
    fn test_raise_error_immediate() {
        let mut cursor = cursor_for("SELECT 1");
        cursor.error_level = ErrorLevel::Immediate;
        let err = cursor.raise_error("boom", None).unwrap_err();
        assert_eq!(err.description, "boom");
        assert!(cursor.errors().is_empty());
    }

    #[test]
    fn test_raise_error_ignore_discards() {
        let mut cursor = cursor_for("SELECT 1");
        cursor.error_level = ErrorLevel::Ignore;
        cursor.raise_error("noise", None).unwrap();
        assert!(cursor.errors().is_empty());
        assert!(cursor.check_errors().is_ok());
    }

    #[test]
    fn test_validate_expression() {
        let mut cursor = cursor_for("SELECT 1");
        let incomplete = Expr::new(&IDENTIFIER);
        cursor.validate_expression(&incomplete, None).unwrap();
        assert_eq!(cursor.errors().len(), 1);

        let complete = Expr::build(&IDENTIFIER, [("this", Value::from("x"))]);
        cursor.validate_expression(&complete, None).unwrap();
        assert_eq!(cursor.errors().len(), 1);

        cursor.error_level = ErrorLevel::Ignore;
        cursor.validate_expression(&incomplete, None).unwrap();
        assert_eq!(cursor.errors().len(), 1);
    }

    #[test]
    fn test_chunks_split_at_semicolons() {
        let mut cursor = cursor_for("SELECT 1; SELECT 2");
        assert_eq!(cursor.curr().map(|t| t.kind), Some(TokenKind::Select));
        cursor.advance(2);
        assert!(cursor.curr().is_none());

        cursor.raise_error("first statement", None).unwrap();
        assert!(cursor.advance_chunk());
        assert_eq!(cursor.curr().map(|t| t.kind), Some(TokenKind::Select));
        assert_eq!(cursor.next_token().map(|t| t.text.as_str()), Some("2"));
        // errors persist across chunks
        assert_eq!(cursor.errors().len(), 1);
        assert!(!cursor.advance_chunk());
    }

    #[test]
    fn test_comment_forwarding() {
        let mut cursor = cursor_for("-- note\nSELECT 1");
        let node = Expr::build(&IDENTIFIER, [("this", Value::from("x"))]);
        assert!(cursor.match_kind(TokenKind::Select, true, Some(&node)));
        assert_eq!(node.comments(), vec![" note".to_string()]);

        // forwarded once, then cleared
        let other = Expr::build(&IDENTIFIER, [("this", Value::from("y"))]);
        assert!(cursor.match_kind(TokenKind::Number, false, Some(&other)));
        assert!(other.comments().is_empty());
    }
}
