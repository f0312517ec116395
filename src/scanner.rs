/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use crate::errors::AsmError;

// Reserved words: mnemonics, operand registers, jmp conditions, modifiers,
// wait sources, directives and version names. Must stay sorted ascending;
// lookup is a binary search and the unit tests check the ordering.
pub const RESERVED_TAB: &[&str] = &[
    "!osre",
    "!x",
    "!y",
    "auto",
    "block",
    "clear",
    "clock_div",
    "define",
    "exec",
    "fifo",
    "gpio",
    "ifempty",
    "iffull",
    "in",
    "irq",
    "isr",
    "jmp",
    "jmppin",
    "lang_opt",
    "left",
    "manual",
    "mov",
    "mov_status",
    "next",
    "noblock",
    "nop",
    "nowait",
    "null",
    "opt",
    "origin",
    "osr",
    "out",
    "pc",
    "pin",
    "pindirs",
    "pins",
    "pio_version",
    "prev",
    "program",
    "public",
    "pull",
    "push",
    "rel",
    "right",
    "rp2040",
    "rp2350",
    "set",
    "side",
    "side_set",
    "status",
    "wait",
    "word",
    "wrap",
    "wrap_target",
    "x",
    "x!=y",
    "x--",
    "y",
    "y--",
];

pub fn is_reserved(word: &str) -> bool {
    RESERVED_TAB.binary_search(&word).is_ok()
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Newline,
    Eof,
    Keyword(String), // reserved word (lowercased) or punctuation
    Label(String),   // identifier immediately followed by ':'
    Symbol(String),  // identifier, original case preserved
    Number(i32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub col: usize,
}

impl Token {
    pub fn is_kw(&self, kw: &str) -> bool {
        matches!(&self.kind, TokenKind::Keyword(k) if k == kw)
    }

    /// Token rendered back to source text, for error messages and the
    /// scanner round-trip test. Keywords come back case-folded.
    pub fn text(&self) -> String {
        match &self.kind {
            TokenKind::Newline => "\n".to_string(),
            TokenKind::Eof => "<eof>".to_string(),
            TokenKind::Keyword(k) => k.clone(),
            TokenKind::Label(name) => format!("{}:", name),
            TokenKind::Symbol(name) => name.clone(),
            TokenKind::Number(n) => n.to_string(),
        }
    }
}

// Multi-char punctuation is a maximal munch over this set. '/' is excluded
// so comment openers are always recognized; ':' is handled separately so
// labels keep their trailing colon.
fn is_munch(c: char) -> bool {
    matches!(
        c,
        '~' | '!' | '%' | '^' | '&' | '*' | '+' | '-' | '=' | '<' | '>' | '|'
    )
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Converts PIO assembly source into a token stream. Comments are stripped,
/// each source line collapses to one Newline token, and the stream always
/// ends Newline, Eof.
pub struct Scanner<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    col: usize,
    last_was_newline: bool,
    done: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Scanner<'a> {
        Scanner {
            chars: source.chars().peekable(),
            line: 1,
            col: 1,
            last_was_newline: false,
            done: false,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next();
        match c {
            Some('\n') => {
                self.line += 1;
                self.col = 1;
            }
            Some(_) => self.col += 1,
            None => {}
        }
        c
    }

    fn token(&self, kind: TokenKind, line: usize, col: usize) -> Token {
        Token { kind, line, col }
    }

    pub fn next_token(&mut self) -> Result<Token, AsmError> {
        loop {
            // whitespace separates tokens and produces nothing
            while matches!(self.peek(), Some(' ' | '\t' | '\r')) {
                self.advance();
            }

            let (line, col) = (self.line, self.col);

            let Some(c) = self.peek() else {
                // synthetic newline before the final Eof
                if !self.last_was_newline {
                    self.last_was_newline = true;
                    return Ok(self.token(TokenKind::Newline, line, col));
                }
                self.done = true;
                return Ok(self.token(TokenKind::Eof, line, col));
            };

            match c {
                '\n' => {
                    self.advance();
                    self.last_was_newline = true;
                    return Ok(self.token(TokenKind::Newline, line, col));
                }
                ';' => {
                    self.skip_line_comment();
                    continue;
                }
                '/' => {
                    self.advance();
                    match self.peek() {
                        Some('/') => {
                            self.skip_line_comment();
                            continue;
                        }
                        Some('*') => {
                            self.advance();
                            self.skip_block_comment(line, col)?;
                            continue;
                        }
                        _ => {
                            self.last_was_newline = false;
                            return Ok(self.token(
                                TokenKind::Keyword("/".to_string()),
                                line,
                                col,
                            ));
                        }
                    }
                }
                '(' | ')' | '[' | ']' | '.' | ',' => {
                    self.advance();
                    self.last_was_newline = false;
                    return Ok(self.token(TokenKind::Keyword(c.to_string()), line, col));
                }
                ':' => {
                    self.advance();
                    if self.peek() == Some(':') {
                        self.advance();
                        self.last_was_newline = false;
                        return Ok(self.token(TokenKind::Keyword("::".to_string()), line, col));
                    }
                    return Err(AsmError::BadInput {
                        line,
                        col,
                        found: ':',
                    });
                }
                c if is_munch(c) => {
                    let mut text = String::new();
                    while matches!(self.peek(), Some(c) if is_munch(c)) {
                        text.push(self.advance().unwrap());
                    }
                    self.last_was_newline = false;
                    return Ok(self.token(TokenKind::Keyword(text), line, col));
                }
                c if is_ident_start(c) => {
                    let tok = self.scan_identifier(line, col);
                    self.last_was_newline = false;
                    return Ok(tok);
                }
                c if c.is_ascii_digit() => {
                    let tok = self.scan_number(line, col)?;
                    self.last_was_newline = false;
                    return Ok(tok);
                }
                found => {
                    return Err(AsmError::BadInput { line, col, found });
                }
            }
        }
    }

    // '//' and ';' comments run to end of line; the '\n' is left in place so
    // the line still collapses to a single Newline token.
    fn skip_line_comment(&mut self) {
        while matches!(self.peek(), Some(c) if c != '\n') {
            self.advance();
        }
    }

    // Block comments may span lines (the newlines inside are consumed
    // silently) and do not nest.
    fn skip_block_comment(&mut self, line: usize, col: usize) -> Result<(), AsmError> {
        loop {
            match self.advance() {
                Some('*') if self.peek() == Some('/') => {
                    self.advance();
                    return Ok(());
                }
                Some(_) => {}
                None => return Err(AsmError::UnterminatedComment { line, col }),
            }
        }
    }

    fn scan_identifier(&mut self, line: usize, col: usize) -> Token {
        let mut text = String::new();
        while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
            text.push(self.advance().unwrap());
        }
        // identifier immediately followed by ':' is a label placement
        if self.peek() == Some(':') {
            // avoid eating half of a '::' operator
            let mut probe = self.chars.clone();
            probe.next();
            if probe.peek() != Some(&':') {
                self.advance();
                return self.token(TokenKind::Label(text), line, col);
            }
        }
        let lower = text.to_ascii_lowercase();
        if is_reserved(&lower) {
            self.token(TokenKind::Keyword(lower), line, col)
        } else {
            self.token(TokenKind::Symbol(text), line, col)
        }
    }

    fn scan_number(&mut self, line: usize, col: usize) -> Result<Token, AsmError> {
        let mut raw = String::new();
        while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
            raw.push(self.advance().unwrap());
        }
        let text: String = raw.chars().filter(|&c| c != '_').collect();

        let bad = |t: &str| AsmError::BadNumber {
            line,
            col,
            text: t.to_string(),
        };

        let value = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            u32::from_str_radix(hex, 16).map_err(|_| bad(&raw))? as i32
        } else if let Some(bin) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
            u32::from_str_radix(bin, 2).map_err(|_| bad(&raw))? as i32
        } else {
            if !text.chars().all(|c| c.is_ascii_digit()) || text.is_empty() {
                return Err(bad(&raw));
            }
            let wide: i64 = text.parse().map_err(|_| bad(&raw))?;
            if wide > u32::MAX as i64 {
                return Err(bad(&raw));
            }
            wide as u32 as i32
        };

        Ok(self.token(TokenKind::Number(value), line, col))
    }
}

impl Iterator for Scanner<'_> {
    type Item = Result<Token, AsmError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_token() {
            Ok(tok) => Some(Ok(tok)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

// ------------- unit tests -------------
