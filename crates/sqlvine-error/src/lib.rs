//! Shared error types for the sqlvine SQL toolkit.
//!
//! The lexer reports fatal scan failures as [`LexError`], carrying enough
//! source context to render a useful message without re-reading the input.
//! Parser-level consumers collect or raise [`ParseError`] values according
//! to the [`ErrorLevel`] policy chosen at construction time.

use thiserror::Error;

/// How parse errors are propagated by cursor-level consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorLevel {
    /// Discard errors silently.
    Ignore,
    /// Accumulate errors on the cursor and keep going.
    #[default]
    Collect,
    /// Return the first error immediately.
    Immediate,
}

/// Fatal tokenizer failure: unterminated literal, unterminated comment, or
/// an invalid numeric string.
///
/// `offset` is a character offset into the source; `context` is a short
/// excerpt surrounding it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (line {line}, col {col})\n  near: {context}")]
pub struct LexError {
    pub message: String,
    pub line: u32,
    pub col: u32,
    pub offset: usize,
    pub context: String,
}

impl LexError {
    #[must_use]
    pub fn new(
        message: impl Into<String>,
        line: u32,
        col: u32,
        offset: usize,
        context: impl Into<String>,
    ) -> Self {
        LexError {
            message: message.into(),
            line,
            col,
            offset,
            context: context.into(),
        }
    }
}

/// A parse-level error with a pre-rendered source highlight.
///
/// `message` is the full formatted message; `description` is the bare text
/// the error was raised with. The three context fields partition the source
/// excerpt around the offending range.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub description: String,
    pub line: u32,
    pub col: u32,
    pub start_context: String,
    pub highlight: String,
    pub end_context: String,
}

impl ParseError {
    /// Builds an error with no source context, for failures that are not
    /// anchored to a token.
    #[must_use]
    pub fn message_only(message: impl Into<String>) -> Self {
        let message = message.into();
        ParseError {
            description: message.clone(),
            message,
            line: 1,
            col: 1,
            start_context: String::new(),
            highlight: String::new(),
            end_context: String::new(),
        }
    }
}

/// Renders a caret view of `sql` around the inclusive character range
/// `(start, end)`, keeping at most `context_length` characters of context on
/// either side.
///
/// Returns `(formatted, start_context, highlight, end_context)`.
#[must_use]
pub fn highlight_sql(
    sql: &str,
    range: (usize, usize),
    context_length: usize,
) -> (String, String, String, String) {
    let chars: Vec<char> = sql.chars().collect();
    let len = chars.len();
    let start = range.0.min(len);
    // Inclusive end; clamp into bounds before converting to exclusive.
    let end = (range.1 + 1).clamp(start, len);

    let ctx_start = start.saturating_sub(context_length);
    let ctx_end = (end + context_length).min(len);

    let start_context: String = chars[ctx_start..start].iter().collect();
    let highlight: String = chars[start..end].iter().collect();
    let end_context: String = chars[end..ctx_end].iter().collect();

    let caret = format!(
        "{}{}",
        " ".repeat(start_context.chars().count()),
        "^".repeat(highlight.chars().count().max(1))
    );
    let formatted = format!("{start_context}{highlight}{end_context}\n  {caret}");

    (formatted, start_context, highlight, end_context)
}
