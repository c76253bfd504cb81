//! The SQL lexer.
//!
//! [`Lexer`] turns a SQL string into a flat token stream according to a
//! dialect's [`DialectRules`]. Scanning is a single forward pass over the
//! character sequence with one character of lookahead (`peek`); multi-word
//! keywords and multi-character operators resolve through the dialect's
//! keyword trie, plain words through the keyword map.
//!
//! Token spans use inclusive character offsets: `end` is the index of the
//! token's last character, so adjacency is `prev.end + 1 == next.start`.

use std::collections::HashSet;

use sqlvine_error::LexError;

use crate::dialect::DialectRules;
use crate::token::{Token, TokenKind};
use crate::trie::Trie;

/// Whitespace as the scanner understands it, including the unicode spaces
/// and separators.
fn is_space_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n'
            | '\r'
            | ' '
            | '\u{b}'
            | '\u{c}'
            | '\u{1c}'..='\u{1f}'
            | '\u{85}'
            | '\u{a0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200a}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202f}'
            | '\u{205f}'
            | '\u{3000}'
    )
}

/// Internal scan failure, positioned but without source context. `tokenize`
/// attaches the surrounding excerpt when converting to [`LexError`].
#[derive(Debug)]
struct ScanError {
    message: String,
    line: u32,
    col: u32,
    offset: usize,
}

impl ScanError {
    fn new(message: String, line: u32, col: u32, offset: usize) -> ScanError {
        ScanError {
            message,
            line,
            col,
            offset,
        }
    }
}

type ScanResult<T = ()> = Result<T, ScanError>;

/// A reusable tokenizer over one dialect's rules. `tokenize` resets all
/// per-input state, so a single lexer can process many statements.
#[derive(Debug)]
pub struct Lexer<'d> {
    rules: &'d DialectRules,
    raw: String,
    sql: Vec<char>,
    size: usize,
    ascii: bool,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: u32,
    col: u32,
    comments: Vec<String>,
    ch: char,
    peek: char,
    end: bool,
    prev_token_line: Option<u32>,
}

impl<'d> Lexer<'d> {
    #[must_use]
    pub fn new(rules: &'d DialectRules) -> Lexer<'d> {
        Lexer {
            rules,
            raw: String::new(),
            sql: Vec::new(),
            size: 0,
            ascii: true,
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
            col: 0,
            comments: Vec::new(),
            ch: '\0',
            peek: '\0',
            end: false,
            prev_token_line: None,
        }
    }

    fn reset(&mut self) {
        self.raw.clear();
        self.sql.clear();
        self.size = 0;
        self.ascii = true;
        self.tokens.clear();
        self.start = 0;
        self.current = 0;
        self.line = 1;
        self.col = 0;
        self.comments.clear();
        self.ch = '\0';
        self.peek = '\0';
        self.end = false;
        self.prev_token_line = None;
    }

    /// Tokenizes `sql`, returning the token stream or the first fatal scan
    /// failure (unterminated literal or comment, invalid numeric string).
    pub fn tokenize(&mut self, sql: &str) -> Result<Vec<Token>, LexError> {
        self.reset();
        self.raw.push_str(sql);
        self.sql.extend(sql.chars());
        self.size = self.sql.len();
        self.ascii = sql.is_ascii();

        tracing::trace!(chars = self.size, "tokenizing");

        if let Err(err) = self.scan(false) {
            let from = self.current.saturating_sub(50);
            let to = self
                .current
                .saturating_add(50)
                .min(self.size.saturating_sub(1));
            let context: String = self
                .sql
                .get(from..to.max(from))
                .unwrap_or_default()
                .iter()
                .collect();
            return Err(LexError::new(
                err.message,
                err.line,
                err.col,
                err.offset,
                context,
            ));
        }

        tracing::trace!(tokens = self.tokens.len(), "tokenized");
        Ok(std::mem::take(&mut self.tokens))
    }

    fn scan(&mut self, check_semicolon: bool) -> ScanResult {
        let rules = self.rules;

        while self.size != 0 && !self.end {
            // Skip runs of plain spaces in a batch rather than one advance
            // call per character.
            let mut current = self.current;
            while current < self.size {
                let c = self.sql[current];
                if c == ' ' || c == '\t' {
                    current += 1;
                } else {
                    break;
                }
            }
            let offset = if current > self.current {
                current - self.current
            } else {
                1
            };

            self.start = current;
            self.advance(isize::try_from(offset).unwrap_or(1), false);

            if !is_space_char(self.ch) {
                if self.ch.is_ascii_digit() {
                    self.scan_number()?;
                } else if let Some(&identifier_end) = rules.identifiers.get(&self.ch) {
                    self.scan_identifier(identifier_end)?;
                } else {
                    self.scan_keywords()?;
                }
            }

            if check_semicolon && self.peek == ';' {
                break;
            }
        }

        if !self.comments.is_empty() {
            if let Some(last) = self.tokens.last_mut() {
                last.comments.append(&mut self.comments);
            }
        }
        Ok(())
    }

    /// Moves the scanner forward (or backward) by `i` characters, keeping
    /// line and column in sync. With `alnum`, also swallows the following
    /// alphanumeric run in one step.
    fn advance(&mut self, i: isize, alnum: bool) {
        if self.ch == '\n' || self.ch == '\r' {
            // A \r\n pair counts as a single line break.
            if !(self.ch == '\r' && self.peek == '\n') {
                self.col = u32::try_from(i.max(0)).unwrap_or(0);
                self.line += 1;
            }
        } else {
            let col = i64::from(self.col) + i as i64;
            self.col = u32::try_from(col.max(0)).unwrap_or(u32::MAX);
        }

        self.current = self.current.saturating_add_signed(i);
        self.end = self.current >= self.size;
        self.ch = if self.current == 0 || self.current > self.size {
            '\0'
        } else {
            self.sql[self.current - 1]
        };
        self.peek = if self.end { '\0' } else { self.sql[self.current] };

        if alnum && self.ch.is_alphanumeric() {
            while self.peek.is_alphanumeric() {
                self.col += 1;
                self.current += 1;
                self.end = self.current >= self.size;
                self.peek = if self.end { '\0' } else { self.sql[self.current] };
            }
            self.ch = self.sql[self.current - 1];
        }
    }

    /// The text consumed since the last token boundary.
    fn text(&self) -> String {
        self.sql[self.start..self.current].iter().collect()
    }

    /// Compares the window of `size` characters starting at the current
    /// character against `target`.
    fn window_eq(&self, size: usize, target: &str) -> bool {
        if size == 1 {
            let mut it = target.chars();
            return it.next() == Some(self.ch) && it.next().is_none();
        }
        let Some(from) = self.current.checked_sub(1) else {
            return false;
        };
        let to = from + size;
        to <= self.size && self.sql[from..to].iter().copied().eq(target.chars())
    }

    fn add(&mut self, kind: TokenKind, text: Option<String>) -> ScanResult {
        let rules = self.rules;
        self.prev_token_line = Some(self.line);

        // A comment directly before a semicolon belongs to the statement it
        // terminates, not to the semicolon.
        if kind == TokenKind::Semicolon && !self.comments.is_empty() && !self.tokens.is_empty() {
            if let Some(last) = self.tokens.last_mut() {
                last.comments.append(&mut self.comments);
            }
        }

        let text = text.unwrap_or_else(|| self.text());
        self.tokens.push(Token::new(
            kind,
            text,
            self.line,
            self.col,
            self.start,
            self.current.saturating_sub(1),
            std::mem::take(&mut self.comments),
        ));

        // After a command keyword at the start of a statement, everything up
        // to the next semicolon is re-captured as one opaque string.
        if rules.commands.contains(&kind)
            && self.peek != ';'
            && (self.tokens.len() == 1
                || self
                    .tokens
                    .get(self.tokens.len() - 2)
                    .is_some_and(|t| rules.command_prefix_tokens.contains(&t.kind)))
        {
            let passthrough_start = self.current;
            let count = self.tokens.len();
            self.scan(true)?;
            self.tokens.truncate(count);
            let text: String = self.sql[passthrough_start..self.current].iter().collect();
            let text = text.trim().to_string();
            if !text.is_empty() {
                self.start = passthrough_start;
                self.add(TokenKind::String, Some(text))?;
            }
        }
        Ok(())
    }

    fn scan_keywords(&mut self) -> ScanResult {
        let rules = self.rules;
        let trie = &rules.keyword_trie;
        let mut node = Trie::ROOT;
        let mut size: usize = 0;
        let mut word: Option<String> = None;
        let mut chars = self.ch.to_string();
        let mut ch = self.ch;
        let mut prev_space = false;
        let mut skip = false;
        let mut exhausted = false;
        let mut single_token = rules.single_tokens.contains_key(&self.ch);

        loop {
            if !skip {
                match trie.step(node, ch.to_ascii_uppercase()) {
                    Some(next) => {
                        node = next;
                        if trie.is_terminal(node) {
                            word = Some(chars.clone());
                        }
                    }
                    None => break,
                }
            }

            let at = self.current + size;
            size += 1;

            if at < self.size {
                ch = self.sql[at];
                single_token = single_token || rules.single_tokens.contains_key(&ch);
                let is_space = is_space_char(ch);

                if !is_space || !prev_space {
                    if is_space {
                        // Runs of whitespace collapse to one space inside
                        // multi-word keywords.
                        ch = ' ';
                    }
                    chars.push(ch);
                    prev_space = is_space;
                    skip = false;
                } else {
                    skip = true;
                }
            } else {
                exhausted = true;
                break;
            }
        }

        if let Some(word) = word {
            if self.scan_string(&word)? {
                return Ok(());
            }
            if self.scan_comment(&word)? {
                return Ok(());
            }
            // Only take the keyword when it ends on a clean boundary; a
            // trailing alphanumeric turns the whole run into a var instead.
            if prev_space || single_token || exhausted {
                let word = word.to_uppercase();
                if let Some(&kind) = rules.keywords.get(&word) {
                    self.advance(isize::try_from(size).unwrap_or(1) - 1, false);
                    return self.add(kind, Some(word));
                }
            }
        }

        if let Some(&kind) = rules.single_tokens.get(&self.ch) {
            let text = self.ch.to_string();
            return self.add(kind, Some(text));
        }

        self.scan_var()
    }

    fn scan_comment(&mut self, comment_start: &str) -> ScanResult<bool> {
        let rules = self.rules;
        let Some(comment_end) = rules.comments.get(comment_start) else {
            return Ok(false);
        };
        let comment_end = comment_end.clone();
        let comment_start_line = self.line;
        let comment_start_size = comment_start.chars().count();

        if let Some(end_delim) = comment_end {
            self.advance(isize::try_from(comment_start_size).unwrap_or(1), false);

            let mut depth = 1u32;
            let end_size = end_delim.chars().count();

            loop {
                if self.end {
                    return Err(ScanError::new(
                        format!("Missing {end_delim}"),
                        self.line,
                        self.col,
                        self.current,
                    ));
                }
                if self.window_eq(end_size, &end_delim) {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }

                self.advance(1, true);

                if rules.nested_comments && !self.end && self.window_eq(end_size, comment_start) {
                    self.advance(isize::try_from(comment_start_size).unwrap_or(1), false);
                    depth += 1;
                }
            }

            let text = self.text();
            let total = text.chars().count();
            let keep = if end_size <= 1 {
                0
            } else {
                total.saturating_sub(end_size - 1)
            };
            let body: String = text
                .chars()
                .take(keep)
                .skip(comment_start_size)
                .collect();
            self.comments.push(body);
            self.advance(isize::try_from(end_size).unwrap_or(1) - 1, false);
        } else {
            // Line comment: runs to the end of the line.
            if self.ascii && !self.end {
                let from = self.current;
                let stop = memchr::memchr2(b'\n', b'\r', &self.raw.as_bytes()[from..])
                    .map_or(self.size, |p| from + p);
                if stop > from {
                    self.advance(isize::try_from(stop - from).unwrap_or(1), false);
                }
            } else {
                while !self.end && self.peek != '\n' && self.peek != '\r' {
                    self.advance(1, true);
                }
            }
            let body: String = self.text().chars().skip(comment_start_size).collect();
            self.comments.push(body);
        }

        if comment_start == rules.hint_start {
            let preceded = self
                .tokens
                .last()
                .is_some_and(|t| rules.tokens_preceding_hint.contains(&t.kind));
            if preceded {
                self.add(TokenKind::Hint, None)?;
            }
        }

        // A comment on the same line as the previous token trails it; any
        // other comment leads the next token.
        if self.prev_token_line == Some(comment_start_line) {
            if let Some(last) = self.tokens.last_mut() {
                last.comments.append(&mut self.comments);
            }
            self.prev_token_line = Some(self.line);
        }

        Ok(true)
    }

    fn scan_number(&mut self) -> ScanResult {
        let rules = self.rules;

        if self.ch == '0' {
            let peek_upper = self.peek.to_ascii_uppercase();
            if peek_upper == 'B' {
                return if rules.has_bit_strings {
                    self.scan_bits()
                } else {
                    self.add(TokenKind::Number, None)
                };
            } else if peek_upper == 'X' {
                return if rules.has_hex_strings {
                    self.scan_hex()
                } else {
                    self.add(TokenKind::Number, None)
                };
            }
        }

        let mut decimal = false;
        let mut scientific = 0u8;

        loop {
            if self.peek.is_ascii_digit() {
                self.advance(1, false);
            } else if self.peek == '.' && !decimal {
                if self.tokens.last().map(|t| t.kind) == Some(TokenKind::Parameter) {
                    return self.add(TokenKind::Number, None);
                }
                decimal = true;
                self.advance(1, false);
            } else if (self.peek == '-' || self.peek == '+') && scientific == 1 {
                // Only part of the number when a digit follows.
                if self.current + 1 < self.size && self.sql[self.current + 1].is_ascii_digit() {
                    scientific += 1;
                    self.advance(1, false);
                } else {
                    return self.add(TokenKind::Number, None);
                }
            } else if self.peek.to_ascii_uppercase() == 'E' && scientific == 0 {
                scientific += 1;
                self.advance(1, false);
            } else if self.peek == '_' && rules.numbers_can_be_underscore_separated {
                self.advance(1, false);
            } else if self.peek.is_alphabetic() || self.peek == '_' {
                let number_text = self.text();
                let mut literal = String::new();

                while self.peek != '\0'
                    && !is_space_char(self.peek)
                    && !rules.single_tokens.contains_key(&self.peek)
                {
                    literal.push(self.peek);
                    self.advance(1, false);
                }

                let kind = rules
                    .numeric_literals
                    .get(&literal.to_uppercase())
                    .and_then(|keyword| rules.keywords.get(keyword))
                    .copied();

                if let Some(kind) = kind {
                    // A typed literal like 12L expands to 12 :: BIGINT; the
                    // three tokens share the literal's source span.
                    self.add(TokenKind::Number, Some(number_text))?;
                    self.add(TokenKind::DColon, Some("::".to_string()))?;
                    return self.add(kind, Some(literal));
                } else if rules.identifiers_can_start_with_digit {
                    return self.add(TokenKind::Var, None);
                }

                let back = isize::try_from(literal.chars().count()).unwrap_or(0);
                self.advance(-back, false);
                return self.add(TokenKind::Number, Some(number_text));
            } else {
                return self.add(TokenKind::Number, None);
            }
        }
    }

    fn scan_bits(&mut self) -> ScanResult {
        self.advance(1, false);
        let value = self.extract_value();
        let digits: String = value.chars().skip(2).collect();
        // Not a valid binary string: fall back to an identifier.
        if !digits.is_empty() && digits.chars().all(|c| c.is_digit(2)) {
            self.add(TokenKind::BitString, Some(digits))
        } else {
            self.add(TokenKind::Identifier, None)
        }
    }

    fn scan_hex(&mut self) -> ScanResult {
        self.advance(1, false);
        let value = self.extract_value();
        let digits: String = value.chars().skip(2).collect();
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit()) {
            self.add(TokenKind::HexString, Some(digits))
        } else {
            self.add(TokenKind::Identifier, None)
        }
    }

    fn extract_value(&mut self) -> String {
        let rules = self.rules;
        loop {
            let peek = self.peek;
            if peek != '\0' && !is_space_char(peek) && !rules.single_tokens.contains_key(&peek) {
                self.advance(1, true);
            } else {
                break;
            }
        }
        self.text()
    }

    fn scan_string(&mut self, start: &str) -> ScanResult<bool> {
        let rules = self.rules;
        let mut base: Option<u32> = None;
        let mut kind = TokenKind::String;
        let end: String;

        if let Some(e) = rules.quotes.get(start) {
            end = e.clone();
        } else if let Some((e, k)) = rules.format_strings.get(start) {
            let e = e.clone();
            kind = *k;

            match kind {
                TokenKind::HexString => {
                    base = Some(16);
                    end = e;
                }
                TokenKind::BitString => {
                    base = Some(2);
                    end = e;
                }
                TokenKind::HeredocString => {
                    self.advance(1, false);

                    let tag = if self.window_eq(1, &e) {
                        String::new()
                    } else {
                        self.extract_string(
                            &e,
                            None,
                            true,
                            !rules.heredoc_tag_is_identifier,
                        )?
                    };

                    if !tag.is_empty()
                        && rules.heredoc_tag_is_identifier
                        && (self.end
                            || tag.chars().all(|c| c.is_ascii_digit())
                            || tag.chars().any(char::is_whitespace))
                    {
                        // Not a valid heredoc tag after all: back up and
                        // re-lex the opener as the dialect's fallback kind.
                        if !self.end {
                            self.advance(-1, false);
                        }
                        let back = isize::try_from(tag.chars().count()).unwrap_or(0);
                        self.advance(-back, false);
                        self.add(rules.heredoc_string_alternative, None)?;
                        return Ok(true);
                    }

                    end = format!("{start}{tag}{e}");
                }
                _ => end = e,
            }
        } else {
            return Ok(false);
        }

        self.advance(isize::try_from(start.chars().count()).unwrap_or(1), false);
        let escapes = if kind == TokenKind::ByteString {
            &rules.byte_string_escapes
        } else {
            &rules.string_escapes
        };
        let text = self.extract_string(&end, Some(escapes), kind == TokenKind::RawString, true)?;

        if let Some(base) = base {
            if !text.is_empty() && !text.chars().all(|c| c.is_digit(base)) {
                return Err(ScanError::new(
                    "Numeric string contains invalid characters".to_string(),
                    self.line,
                    self.col,
                    self.start,
                ));
            }
        }

        self.add(kind, Some(text))?;
        Ok(true)
    }

    fn scan_identifier(&mut self, identifier_end: char) -> ScanResult {
        self.advance(1, false);
        let mut escapes = self.rules.identifier_escapes.clone();
        escapes.insert(identifier_end);
        let text =
            self.extract_string(&identifier_end.to_string(), Some(&escapes), false, true)?;
        self.add(TokenKind::Identifier, Some(text))
    }

    fn scan_var(&mut self) -> ScanResult {
        let rules = self.rules;

        loop {
            let peek = self.peek;
            if peek == '\0' || is_space_char(peek) {
                break;
            }
            if !rules.var_single_tokens.contains(&peek)
                && rules.single_tokens.contains_key(&peek)
            {
                break;
            }
            self.advance(1, true);
        }

        let kind = if self.tokens.last().map(|t| t.kind) == Some(TokenKind::Parameter) {
            TokenKind::Var
        } else {
            rules
                .keywords
                .get(&self.text().to_uppercase())
                .copied()
                .unwrap_or(TokenKind::Var)
        };
        self.add(kind, None)
    }

    /// Consumes characters up to (and including) `delimiter`, resolving
    /// escapes, and returns the unquoted text.
    fn extract_string(
        &mut self,
        delimiter: &str,
        escapes: Option<&HashSet<char>>,
        raw_string: bool,
        raise_unmatched: bool,
    ) -> ScanResult<String> {
        let rules = self.rules;
        let escapes = escapes.unwrap_or(&rules.string_escapes);
        let delim_size = delimiter.chars().count();
        let delim_char = if delim_size == 1 {
            delimiter.chars().next()
        } else {
            None
        };
        let mut text = String::new();

        loop {
            if !raw_string
                && !rules.unescaped_sequences.is_empty()
                && self.peek != '\0'
                && escapes.contains(&self.ch)
            {
                let mut sequence = String::with_capacity(2);
                sequence.push(self.ch);
                sequence.push(self.peek);
                if let Some(replacement) = rules.unescaped_sequences.get(&sequence) {
                    self.advance(2, false);
                    text.push_str(replacement);
                    continue;
                }
            }

            let is_custom_escape = !rules.escape_follow_chars.is_empty()
                && self.ch == '\\'
                && !rules.escape_follow_chars.contains(&self.peek);
            let peek_is_delim = self.peek != '\0' && delim_char == Some(self.peek);

            if (rules.string_escapes_allowed_in_raw_strings || !raw_string)
                && escapes.contains(&self.ch)
                && (peek_is_delim || escapes.contains(&self.peek) || is_custom_escape)
                && (!rules.quote_start_chars.contains(&self.ch) || self.ch == self.peek)
            {
                if peek_is_delim {
                    text.push(self.peek);
                } else if is_custom_escape && self.ch != self.peek {
                    text.push(self.peek);
                } else {
                    text.push(self.ch);
                    text.push(self.peek);
                }

                if self.current + 1 < self.size {
                    self.advance(2, false);
                } else {
                    return Err(ScanError::new(
                        format!("Missing {delimiter}"),
                        self.line,
                        self.col,
                        self.current,
                    ));
                }
            } else {
                if self.window_eq(delim_size, delimiter) {
                    if delim_size > 1 {
                        self.advance(isize::try_from(delim_size).unwrap_or(1) - 1, false);
                    }
                    break;
                }

                if self.end {
                    if !raise_unmatched {
                        text.push(self.ch);
                        return Ok(text);
                    }
                    return Err(ScanError::new(
                        format!("Missing {delimiter}"),
                        self.line,
                        self.col,
                        self.start,
                    ));
                }

                let from = self.current - 1;
                self.advance(1, true);
                for &c in &self.sql[from..self.current - 1] {
                    text.push(c);
                }
            }
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn lex(sql: &str) -> Vec<Token> {
        let rules = DialectRules::ansi();
        Lexer::new(&rules).tokenize(sql).unwrap()
    }

    fn lex_with(rules: &DialectRules, sql: &str) -> Vec<Token> {
        Lexer::new(rules).tokenize(sql).unwrap()
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_select_offsets() {
        let tokens = lex("SELECT 1");
        assert_eq!(kinds(&tokens), vec![TokenKind::Select, TokenKind::Number]);

        let select = &tokens[0];
        assert_eq!(select.text, "SELECT");
        assert_eq!((select.start, select.end), (0, 5));
        assert_eq!((select.line, select.col), (1, 6));

        let number = &tokens[1];
        assert_eq!(number.text, "1");
        assert_eq!((number.start, number.end), (7, 7));
        assert_eq!((number.line, number.col), (1, 8));

        // adjacency holds across the space gap
        assert_eq!(select.end + 2, number.start);
    }

    #[test]
    fn test_keywords_resolve_case_insensitively() {
        let tokens = lex("select Foo froM bar");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Select,
                TokenKind::Var,
                TokenKind::From,
                TokenKind::Var
            ]
        );
        // keyword text keeps its source casing when resolved as a word
        assert_eq!(tokens[0].text, "select");
        assert_eq!(tokens[2].text, "froM");
    }

    #[test]
    fn test_multi_word_keyword_collapses_whitespace() {
        let tokens = lex("a GROUP  \t BY b");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Var, TokenKind::GroupBy, TokenKind::Var]
        );
        // multi-word keywords are emitted uppercased with one space
        assert_eq!(tokens[1].text, "GROUP BY");
    }

    #[test]
    fn test_keyword_with_trailing_alnum_is_a_var() {
        let tokens = lex("GROUP BYX");
        assert_eq!(kinds(&tokens), vec![TokenKind::Var, TokenKind::Var]);
        assert_eq!(tokens[0].text, "GROUP");
        assert_eq!(tokens[1].text, "BYX");
    }

    #[test]
    fn test_operators() {
        let tokens = lex("a::b");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Var, TokenKind::DColon, TokenKind::Var]
        );

        let tokens = lex("1 <=> 2");
        assert_eq!(tokens[1].kind, TokenKind::NullsafeEq);

        let tokens = lex("x ->> 'k'");
        assert_eq!(tokens[1].kind, TokenKind::DArrow);

        let tokens = lex("a != b <> c");
        assert_eq!(tokens[1].kind, TokenKind::Neq);
        assert_eq!(tokens[3].kind, TokenKind::Neq);
    }

    #[test]
    fn test_single_tokens() {
        let tokens = lex("(a, b)");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::LParen,
                TokenKind::Var,
                TokenKind::Comma,
                TokenKind::Var,
                TokenKind::RParen
            ]
        );
    }

    #[test]
    fn test_string_literal_and_escape_doubling() {
        let tokens = lex("'it''s'");
        assert_eq!(kinds(&tokens), vec![TokenKind::String]);
        assert_eq!(tokens[0].text, "it's");
        assert_eq!((tokens[0].start, tokens[0].end), (0, 6));
    }

    #[test]
    fn test_unterminated_string_errors() {
        let rules = DialectRules::ansi();
        let err = Lexer::new(&rules).tokenize("SELECT 'abc").unwrap_err();
        assert!(err.message.contains("Missing"));
        // error is anchored at the opening quote
        assert_eq!(err.offset, 7);
        assert_eq!(err.line, 1);
        assert!(err.context.contains("'abc"));
    }

    #[test]
    fn test_quoted_identifier_and_escape_doubling() {
        let tokens = lex(r#""a""b""#);
        assert_eq!(kinds(&tokens), vec![TokenKind::Identifier]);
        assert_eq!(tokens[0].text, "a\"b");
    }

    #[test]
    fn test_trailing_comment_attaches_to_previous_token() {
        let tokens = lex("SELECT 1 -- one\nSELECT 2");
        assert_eq!(tokens[1].kind, TokenKind::Number);
        assert_eq!(tokens[1].comments, vec![" one".to_string()]);
        assert!(tokens[2].comments.is_empty());
    }

    #[test]
    fn test_leading_comment_attaches_to_next_token() {
        let tokens = lex("-- lead\nSELECT 1");
        assert_eq!(tokens[0].kind, TokenKind::Select);
        assert_eq!(tokens[0].comments, vec![" lead".to_string()]);
    }

    #[test]
    fn test_comment_at_eof_flushes_to_last_token() {
        let tokens = lex("SELECT 1\n-- tail");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].comments, vec![" tail".to_string()]);
    }

    #[test]
    fn test_comment_before_semicolon_attaches_backwards() {
        let tokens = lex("SELECT 1\n-- note\n;");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Select, TokenKind::Number, TokenKind::Semicolon]
        );
        assert_eq!(tokens[1].comments, vec![" note".to_string()]);
        assert!(tokens[2].comments.is_empty());
    }

    #[test]
    fn test_block_comment() {
        let tokens = lex("SELECT /* inline */ 1");
        assert_eq!(kinds(&tokens), vec![TokenKind::Select, TokenKind::Number]);
        assert_eq!(tokens[0].comments, vec![" inline ".to_string()]);
    }

    #[test]
    fn test_nested_block_comment() {
        let tokens = lex("/* outer /* inner */ rest */ x");
        assert_eq!(kinds(&tokens), vec![TokenKind::Var]);
        assert_eq!(
            tokens[0].comments,
            vec![" outer /* inner */ rest ".to_string()]
        );
    }

    #[test]
    fn test_unnested_block_comment_ends_early() {
        let rules = DialectRules::builder().nested_comments(false).build();
        let tokens = lex_with(&rules, "/* a /* b */ x");
        assert_eq!(kinds(&tokens), vec![TokenKind::Var]);
        assert_eq!(tokens[0].comments, vec![" a /* b ".to_string()]);
    }

    #[test]
    fn test_unterminated_block_comment_errors() {
        let rules = DialectRules::ansi();
        let err = Lexer::new(&rules).tokenize("SELECT 1 /* oops").unwrap_err();
        assert!(err.message.contains("Missing */"));
    }

    #[test]
    fn test_hint_after_select_becomes_token() {
        let tokens = lex("SELECT /*+ FULL(t) */ 1");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Select, TokenKind::Hint, TokenKind::Number]
        );
        assert_eq!(tokens[1].text, "/*+ FULL(t) */");
        assert_eq!(tokens[1].comments, vec![" FULL(t) ".to_string()]);
    }

    #[test]
    fn test_hint_elsewhere_stays_a_comment() {
        let tokens = lex("a /*+ nope */ b");
        assert_eq!(kinds(&tokens), vec![TokenKind::Var, TokenKind::Var]);
        assert_eq!(tokens[0].comments, vec![" nope ".to_string()]);
    }

    #[test]
    fn test_command_passthrough() {
        let tokens = lex("SHOW TABLES LIKE 'x';");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Show, TokenKind::String, TokenKind::Semicolon]
        );
        assert_eq!(tokens[1].text, "TABLES LIKE 'x'");
        // the passthrough string's span starts right after the command word
        assert_eq!(tokens[1].start, 4);
    }

    #[test]
    fn test_command_after_semicolon_is_still_passthrough() {
        let tokens = lex("SELECT 1; SHOW x");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Select,
                TokenKind::Number,
                TokenKind::Semicolon,
                TokenKind::Show,
                TokenKind::String
            ]
        );
        assert_eq!(tokens[4].text, "x");
    }

    #[test]
    fn test_numbers() {
        let tokens = lex("1.5e-3 42 .x");
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].text, "1.5e-3");
        assert_eq!(tokens[1].text, "42");

        let tokens = lex("@1.2");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Parameter,
                TokenKind::Number,
                TokenKind::Dot,
                TokenKind::Number
            ]
        );
    }

    #[test]
    fn test_number_with_trailing_word_backtracks() {
        // L is not a known literal suffix in the base dialect
        let tokens = lex("12L");
        assert_eq!(kinds(&tokens), vec![TokenKind::Number, TokenKind::Var]);
        assert_eq!(tokens[0].text, "12");
        assert_eq!(tokens[1].text, "L");
    }

    #[test]
    fn test_numeric_literal_suffix_expands_to_cast() {
        let rules = DialectRules::builder()
            .numeric_literals(&[("L", "BIGINT")])
            .build();
        let tokens = lex_with(&rules, "12L");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Number, TokenKind::DColon, TokenKind::BigInt]
        );
        assert_eq!(tokens[0].text, "12");
        assert_eq!(tokens[1].text, "::");
        assert_eq!(tokens[2].text, "L");
        // all three tokens cover the literal's span
        for token in &tokens {
            assert_eq!((token.start, token.end), (0, 2));
        }
    }

    #[test]
    fn test_identifiers_can_start_with_digit() {
        let rules = DialectRules::builder()
            .identifiers_can_start_with_digit(true)
            .build();
        let tokens = lex_with(&rules, "1abc");
        assert_eq!(kinds(&tokens), vec![TokenKind::Var]);
        assert_eq!(tokens[0].text, "1abc");
    }

    #[test]
    fn test_hex_and_bit_strings() {
        let rules = DialectRules::builder()
            .hex_strings(&[("0x", ""), ("x'", "'"), ("X'", "'")])
            .bit_strings(&[("0b", ""), ("b'", "'"), ("B'", "'")])
            .build();

        let tokens = lex_with(&rules, "0xCAFE 0b101 x'ff'");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::HexString,
                TokenKind::BitString,
                TokenKind::HexString
            ]
        );
        assert_eq!(tokens[0].text, "CAFE");
        assert_eq!(tokens[1].text, "101");
        assert_eq!(tokens[2].text, "ff");

        // not parseable in the base: falls back to an identifier
        let tokens = lex_with(&rules, "0xZZ 0b12");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Identifier, TokenKind::Identifier]
        );
        assert_eq!(tokens[0].text, "0xZZ");
        assert_eq!(tokens[1].text, "0b12");
    }

    #[test]
    fn test_national_string() {
        let tokens = lex("N'abc'");
        assert_eq!(kinds(&tokens), vec![TokenKind::NationalString]);
        assert_eq!(tokens[0].text, "abc");
    }

    #[test]
    fn test_raw_string_keeps_backslashes() {
        let rules = DialectRules::builder()
            .raw_strings(&[("r'", "'"), ("R'", "'")])
            .build();
        let tokens = lex_with(&rules, r"r'a\nb'");
        assert_eq!(kinds(&tokens), vec![TokenKind::RawString]);
        assert_eq!(tokens[0].text, r"a\nb");
    }

    #[test]
    fn test_unescaped_sequences() {
        let rules = DialectRules::builder()
            .string_escapes(&['\\', '\''])
            .unescaped_sequences(&[("\\n", "\n"), ("\\t", "\t")])
            .build();
        let tokens = lex_with(&rules, r"'a\nb'");
        assert_eq!(tokens[0].text, "a\nb");
    }

    #[test]
    fn test_heredoc_string() {
        let rules = DialectRules::builder()
            .heredoc_strings(&[("$", "$")])
            .single_token('$', TokenKind::Var)
            .build();
        let tokens = lex_with(&rules, "$tag$ body $tag$");
        assert_eq!(kinds(&tokens), vec![TokenKind::HeredocString]);
        assert_eq!(tokens[0].text, " body ");

        let tokens = lex_with(&rules, "$$ body $$");
        assert_eq!(kinds(&tokens), vec![TokenKind::HeredocString]);
        assert_eq!(tokens[0].text, " body ");
    }

    #[test]
    fn test_heredoc_invalid_tag_falls_back() {
        let rules = DialectRules::builder()
            .heredoc_strings(&[("$", "$")])
            .single_token('$', TokenKind::Var)
            .heredoc_tag_is_identifier(true)
            .build();
        // a purely numeric tag is not an identifier, so $1$ is not a heredoc
        let tokens = lex_with(&rules, "$1$SELECT");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Var,
                TokenKind::Number,
                TokenKind::Var,
                TokenKind::Select
            ]
        );
        assert_eq!(tokens[0].text, "$");
        assert_eq!(tokens[2].text, "$");
    }

    #[test]
    fn test_var_single_tokens() {
        let rules = DialectRules::builder().var_single_tokens(&['@']).build();
        let tokens = lex_with(&rules, "a@b c");
        assert_eq!(kinds(&tokens), vec![TokenKind::Var, TokenKind::Var]);
        assert_eq!(tokens[0].text, "a@b");
    }

    #[test]
    fn test_var_after_parameter_never_resolves_to_keyword() {
        let tokens = lex("@select");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Parameter, TokenKind::Var]
        );
        assert_eq!(tokens[1].text, "select");
    }

    #[test]
    fn test_crlf_counts_one_line_break() {
        let tokens = lex("a\r\nb");
        assert_eq!((tokens[0].line, tokens[0].col), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].col), (2, 1));

        let tokens = lex("a\n\nb");
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_lexer_is_reusable() {
        let rules = DialectRules::ansi();
        let mut lexer = Lexer::new(&rules);
        let first = lexer.tokenize("SELECT 1").unwrap();
        let second = lexer.tokenize("SELECT 2").unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
        assert_eq!(second[1].text, "2");
    }

    proptest! {
        #[test]
        fn test_spans_are_ordered_and_in_bounds(sql in "[a-z0-9_ .,()*+=<>';\n-]{0,60}") {
            let rules = DialectRules::ansi();
            let mut lexer = Lexer::new(&rules);
            let Ok(tokens) = lexer.tokenize(&sql) else {
                // unterminated strings and comments are legitimate failures
                return Ok(());
            };
            let size = sql.chars().count();
            let mut prev_start: Option<usize> = None;

            for token in &tokens {
                prop_assert!(token.start <= token.end);
                prop_assert!(token.end < size);
                if let Some(prev) = prev_start {
                    prop_assert!(token.start > prev);
                }
                prev_start = Some(token.start);

                if matches!(token.kind, TokenKind::Var | TokenKind::Number) {
                    let slice: String = sql
                        .chars()
                        .skip(token.start)
                        .take(token.end + 1 - token.start)
                        .collect();
                    prop_assert_eq!(&token.text, &slice);
                }
            }
        }
    }
}
