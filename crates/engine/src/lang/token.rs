// ETP - Execution Trace Prediction
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Tokenizer for the snippet language.
//!
//! Produces `Newline`/`Indent`/`Dedent` tokens from leading whitespace the way
//! an indentation-sensitive grammar expects. Newlines inside brackets and
//! after a trailing backslash join lines.

use etp_common::{Position, Span};

use crate::ParseError;

/// Reserved words. Some are only recognized to report them as unsupported.
pub const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

// Longest first within each length class.
const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "**", "//", "==", "!=", "<=", ">=", "+=", "-=", "*=", "/=", "%=",
    "&=", "|=", "^=", "<<", ">>", "->", ":=", "+", "-", "*", "/", "%", "<", ">", "=", "(", ")",
    "[", "]", "{", "}", ",", ":", ".", ";", "&", "|", "^", "~", "@",
];

const TAB_SIZE: usize = 8;

/// Token kinds
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifier
    Name(String),
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f64),
    /// String literal with escapes resolved
    Str(String),
    /// Reserved word
    Keyword(&'static str),
    /// Operator or delimiter
    Op(&'static str),
    /// End of a logical line
    Newline,
    /// Indentation increased
    Indent,
    /// Indentation decreased
    Dedent,
    /// End of input
    EndOfFile,
}

/// A token with its source range
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Token kind and payload
    pub kind: TokenKind,
    /// Source range
    pub span: Span,
}

/// Split `source` into tokens
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(source).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    indents: Vec<usize>,
    depth: usize,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.replace("\r\n", "\n").chars().collect(),
            pos: 0,
            line: 1,
            column: 0,
            indents: vec![0],
            depth: 0,
            tokens: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn here(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn push(&mut self, kind: TokenKind, start: Position) {
        let span = Span::new(start, self.here());
        self.tokens.push(Token { kind, span });
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.here())
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        let mut at_line_start = true;
        loop {
            if at_line_start {
                if self.depth == 0 && !self.line_start()? {
                    if self.peek().is_none() {
                        break;
                    }
                    continue;
                }
                at_line_start = false;
            }

            let Some(c) = self.peek() else { break };
            let start = self.here();
            match c {
                '\n' => {
                    self.bump();
                    if self.depth == 0 {
                        let end = Position::new(start.line, start.column + 1);
                        self.tokens.push(Token { kind: TokenKind::Newline, span: Span::new(start, end) });
                    }
                    at_line_start = true;
                }
                ' ' | '\t' | '\x0c' | '\r' => {
                    self.bump();
                }
                '#' => self.skip_comment(),
                '\\' => {
                    self.bump();
                    if self.peek() != Some('\n') {
                        return Err(self.error("unexpected character after line continuation character"));
                    }
                    self.bump();
                }
                '\'' | '"' => self.string(start, false)?,
                c if c.is_ascii_digit() => self.number(start)?,
                '.' if self.peek_at(1).is_some_and(|n| n.is_ascii_digit()) => self.number(start)?,
                c if c == '_' || c.is_alphabetic() => self.word(start)?,
                c => self.operator(start, c)?,
            }
        }

        if self.depth > 0 {
            return Err(self.error("unexpected EOF: unclosed bracket"));
        }
        let end = self.here();
        if self.tokens.last().is_some_and(|t| !matches!(t.kind, TokenKind::Newline | TokenKind::Dedent)) {
            self.tokens.push(Token { kind: TokenKind::Newline, span: Span::new(end, end) });
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.tokens.push(Token { kind: TokenKind::Dedent, span: Span::new(end, end) });
        }
        self.tokens.push(Token { kind: TokenKind::EndOfFile, span: Span::new(end, end) });
        Ok(self.tokens)
    }

    /// Measure indentation of a new physical line. Returns `false` when the
    /// line is blank or a comment (and has been consumed).
    fn line_start(&mut self) -> Result<bool, ParseError> {
        let mut width = 0;
        loop {
            match self.peek() {
                Some(' ') => width += 1,
                Some('\t') => width = (width / TAB_SIZE + 1) * TAB_SIZE,
                Some('\x0c') => width = 0,
                Some('\r') => {}
                _ => break,
            }
            self.bump();
        }

        match self.peek() {
            None => return Ok(false),
            Some('\n') => {
                self.bump();
                return Ok(false);
            }
            Some('#') => {
                self.skip_comment();
                self.bump();
                return Ok(false);
            }
            _ => {}
        }

        let start = self.here();
        let current = self.indents.last().copied().unwrap_or(0);
        if width > current {
            self.indents.push(width);
            self.tokens.push(Token { kind: TokenKind::Indent, span: Span::new(start, start) });
        } else if width < current {
            while self.indents.last().is_some_and(|level| width < *level) {
                self.indents.pop();
                self.tokens.push(Token { kind: TokenKind::Dedent, span: Span::new(start, start) });
            }
            if self.indents.last() != Some(&width) {
                return Err(self.error("unindent does not match any outer indentation level"));
            }
        }
        Ok(true)
    }

    fn skip_comment(&mut self) {
        while self.peek().is_some_and(|c| c != '\n') {
            self.bump();
        }
    }

    fn word(&mut self, start: Position) -> Result<(), ParseError> {
        let mut text = String::new();
        while let Some(c) = self.peek().filter(|c| *c == '_' || c.is_alphanumeric()) {
            text.push(c);
            self.bump();
        }

        if matches!(self.peek(), Some('\'' | '"')) {
            match text.to_ascii_lowercase().as_str() {
                "r" => return self.string(start, true),
                "u" => return self.string(start, false),
                "f" | "rf" | "fr" => {
                    return Err(ParseError::new("f-strings are not supported", start))
                }
                "b" | "rb" | "br" => {
                    return Err(ParseError::new("bytes literals are not supported", start))
                }
                _ => {}
            }
        }

        match KEYWORDS.iter().find(|kw| **kw == text) {
            Some(kw) => self.push(TokenKind::Keyword(kw), start),
            None => self.push(TokenKind::Name(text), start),
        }
        Ok(())
    }

    fn number(&mut self, start: Position) -> Result<(), ParseError> {
        let radix = match (self.peek(), self.peek_at(1)) {
            (Some('0'), Some('x' | 'X')) => Some(16),
            (Some('0'), Some('o' | 'O')) => Some(8),
            (Some('0'), Some('b' | 'B')) => Some(2),
            _ => None,
        };

        if let Some(radix) = radix {
            self.bump();
            self.bump();
            let mut digits = String::new();
            while let Some(c) = self.peek().filter(|c| c.is_ascii_alphanumeric() || *c == '_') {
                if c != '_' {
                    digits.push(c);
                }
                self.bump();
            }
            let value = i64::from_str_radix(&digits, radix)
                .map_err(|_| ParseError::new(format!("invalid or too large integer literal '{digits}'"), start))?;
            self.push(TokenKind::Int(value), start);
            return Ok(());
        }

        let mut text = String::new();
        let mut is_float = false;
        self.digits(&mut text);
        if self.peek() == Some('.') {
            is_float = true;
            text.push('.');
            self.bump();
            self.digits(&mut text);
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let signed = matches!(self.peek_at(1), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                text.push('e');
                self.bump();
                if signed {
                    text.extend(self.bump());
                }
                self.digits(&mut text);
            }
        }

        match self.peek() {
            Some('j' | 'J') => return Err(self.error("complex literals are not supported")),
            Some(c) if c == '_' || c.is_alphanumeric() => {
                return Err(self.error("invalid decimal literal"))
            }
            _ => {}
        }

        if is_float {
            let value: f64 =
                text.parse().map_err(|_| ParseError::new(format!("invalid float literal '{text}'"), start))?;
            self.push(TokenKind::Float(value), start);
        } else {
            let value: i64 = text
                .parse()
                .map_err(|_| ParseError::new(format!("integer literal '{text}' is too large"), start))?;
            self.push(TokenKind::Int(value), start);
        }
        Ok(())
    }

    fn digits(&mut self, out: &mut String) {
        while let Some(c) = self.peek().filter(|c| c.is_ascii_digit() || *c == '_') {
            if c != '_' {
                out.push(c);
            }
            self.bump();
        }
    }

    /// Read exactly `width` hex digits of a `\x`, `\u` or `\U` escape
    fn hex_escape(&mut self, width: usize, name: char) -> Result<char, ParseError> {
        let mut hex = String::with_capacity(width);
        for _ in 0..width {
            match self.peek().filter(char::is_ascii_hexdigit) {
                Some(c) => {
                    hex.push(c);
                    self.bump();
                }
                None => return Err(self.error(format!("truncated \\{name} escape"))),
            }
        }
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error(format!("invalid \\{name} escape")))
    }

    fn string(&mut self, start: Position, raw: bool) -> Result<(), ParseError> {
        let Some(quote) = self.bump() else {
            return Err(self.error("unterminated string literal"));
        };
        if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
            return Err(ParseError::new("triple-quoted strings are not supported", start));
        }

        let mut value = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(ParseError::new("unterminated string literal", start)),
                Some(c) if c == quote => break,
                Some('\\') => {
                    let Some(escaped) = self.bump() else {
                        return Err(ParseError::new("unterminated string literal", start));
                    };
                    if raw {
                        value.push('\\');
                        value.push(escaped);
                        continue;
                    }
                    match escaped {
                        '\n' => {}
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        '0' => value.push('\0'),
                        'a' => value.push('\x07'),
                        'b' => value.push('\x08'),
                        'f' => value.push('\x0c'),
                        'v' => value.push('\x0b'),
                        '\\' | '\'' | '"' => value.push(escaped),
                        'x' => value.push(self.hex_escape(2, 'x')?),
                        'u' => value.push(self.hex_escape(4, 'u')?),
                        'U' => value.push(self.hex_escape(8, 'U')?),
                        'N' => {
                            return Err(ParseError::new("named unicode escapes are not supported", start))
                        }
                        other => {
                            value.push('\\');
                            value.push(other);
                        }
                    }
                }
                Some(c) => value.push(c),
            }
        }
        self.push(TokenKind::Str(value), start);
        Ok(())
    }

    fn operator(&mut self, start: Position, c: char) -> Result<(), ParseError> {
        for len in (1..=3).rev() {
            if self.pos + len > self.chars.len() {
                continue;
            }
            let text: String = self.chars[self.pos..self.pos + len].iter().collect();
            let Some(op) = OPERATORS.iter().find(|op| **op == text) else { continue };
            for _ in 0..len {
                self.bump();
            }
            match *op {
                "(" | "[" | "{" => self.depth += 1,
                ")" | "]" | "}" => {
                    self.depth = self
                        .depth
                        .checked_sub(1)
                        .ok_or_else(|| ParseError::new(format!("unmatched '{op}'"), start))?;
                }
                _ => {}
            }
            self.push(TokenKind::Op(op), start);
            return Ok(());
        }
        Err(ParseError::new(format!("invalid character '{c}'"), start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_assignment() {
        assert_eq!(
            kinds("a = 5 + 3"),
            vec![
                TokenKind::Name("a".into()),
                TokenKind::Op("="),
                TokenKind::Int(5),
                TokenKind::Op("+"),
                TokenKind::Int(3),
                TokenKind::Newline,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn test_indentation() {
        let kinds = kinds("if x:\n    y = 1\n\n    # note\nz = 2\n");
        assert!(kinds.contains(&TokenKind::Indent));
        let dedent = kinds.iter().position(|k| *k == TokenKind::Dedent).unwrap();
        assert_eq!(kinds[dedent + 1], TokenKind::Name("z".into()));
    }

    #[test]
    fn test_dedent_to_unknown_level() {
        assert!(tokenize("if x:\n    y = 1\n  z = 2").is_err());
    }

    #[test]
    fn test_brackets_join_lines() {
        let kinds = kinds("xs = [1,\n      2]\n");
        assert_eq!(kinds.iter().filter(|k| **k == TokenKind::Newline).count(), 1);
        assert!(!kinds.contains(&TokenKind::Indent));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("0x1f")[0], TokenKind::Int(31));
        assert_eq!(kinds("1_000")[0], TokenKind::Int(1000));
        assert_eq!(kinds("2.5")[0], TokenKind::Float(2.5));
        assert_eq!(kinds("1e3")[0], TokenKind::Float(1000.0));
        assert_eq!(kinds(".5")[0], TokenKind::Float(0.5));
        assert!(tokenize("99999999999999999999").is_err());
        assert!(tokenize("3j").is_err());
    }

    #[test]
    fn test_strings() {
        assert_eq!(kinds(r#"'a\nb'"#)[0], TokenKind::Str("a\nb".into()));
        assert_eq!(kinds(r#""it's""#)[0], TokenKind::Str("it's".into()));
        assert_eq!(kinds(r"r'\d'")[0], TokenKind::Str("\\d".into()));
        assert!(tokenize("f'{x}'").is_err());
        assert!(tokenize("'''doc'''").is_err());
        assert!(tokenize("'open").is_err());
    }

    #[test]
    fn test_unicode_escapes() {
        assert_eq!(kinds(r"'\u00e9'")[0], TokenKind::Str("é".into()));
        assert_eq!(kinds(r"'\U0001F600!'")[0], TokenKind::Str("😀!".into()));
        assert_eq!(kinds(r"'\x41'")[0], TokenKind::Str("A".into()));
        assert_eq!(kinds(r"r'\u00e9'")[0], TokenKind::Str("\\u00e9".into()));
        assert!(tokenize(r"'\u00'").is_err());
        assert!(tokenize(r"'\UFFFFFFFF'").is_err());
        assert!(tokenize(r"'\N{DASH}'").is_err());
    }

    #[test]
    fn test_operator_columns() {
        let tokens = tokenize("a <= b").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Op("<="));
        assert_eq!(tokens[1].span.start, Position::new(1, 2));
        assert_eq!(tokens[1].span.end, Position::new(1, 4));
    }

    #[test]
    fn test_columns_count_characters() {
        let tokens = tokenize("s = 'é' + t").unwrap();
        assert_eq!(tokens[3].kind, TokenKind::Op("+"));
        assert_eq!(tokens[3].span.start.column, 8);
    }
}
