//! Tokenizer for a single MI output line.

use crate::mi::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Eol,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Equals,
    String,
    Symbol,
    Number,
    /// `^`
    Caret,
    /// `+`
    Plus,
    /// `*`
    Star,
    /// `~`
    Tilde,
    /// `@`
    At,
    /// `&`
    Ampersand,
}

/// Lexical unit. `text` is empty for everything except strings, symbols and numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

impl<'a> Token<'a> {
    fn punct(kind: TokenKind) -> Self {
        Self { kind, text: "" }
    }
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TokenKind::Eol => f.write_str("end of line"),
            TokenKind::LeftBrace => f.write_str("`{`"),
            TokenKind::RightBrace => f.write_str("`}`"),
            TokenKind::LeftBracket => f.write_str("`[`"),
            TokenKind::RightBracket => f.write_str("`]`"),
            TokenKind::Comma => f.write_str("`,`"),
            TokenKind::Equals => f.write_str("`=`"),
            TokenKind::String => write!(f, "string \"{}\"", self.text),
            TokenKind::Symbol => write!(f, "symbol `{}`", self.text),
            TokenKind::Number => write!(f, "number {}", self.text),
            TokenKind::Caret => f.write_str("`^`"),
            TokenKind::Plus => f.write_str("`+`"),
            TokenKind::Star => f.write_str("`*`"),
            TokenKind::Tilde => f.write_str("`~`"),
            TokenKind::At => f.write_str("`@`"),
            TokenKind::Ampersand => f.write_str("`&`"),
        }
    }
}

const DIGIT: u8 = 0b01;
const TERMINATOR: u8 = 0b10;

static CHAR_CLASS: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut c = b'0';
    while c <= b'9' {
        table[c as usize] = DIGIT;
        c += 1;
    }
    let terminators = [0, b' ', b'\t', b'\r', b'\n', b',', b'=', b'[', b']', b'{', b'}'];
    let mut i = 0;
    while i < terminators.len() {
        table[terminators[i] as usize] = TERMINATOR;
        i += 1;
    }
    table
};

#[inline(always)]
fn is_digit(b: u8) -> bool {
    CHAR_CLASS[b as usize] & DIGIT != 0
}

#[inline(always)]
fn is_terminator(b: u8) -> bool {
    CHAR_CLASS[b as usize] & TERMINATOR != 0
}

#[inline(always)]
fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

/// On-demand tokenizer with a single slot of lookahead.
pub struct Lexer<'a> {
    line: &'a str,
    pos: usize,
    lookahead: Option<Token<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(line: &'a str) -> Self {
        Self {
            line,
            pos: 0,
            lookahead: None,
        }
    }

    /// Current byte offset into the line.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Return a token to the lexer, it will be produced by the next [`Lexer::next_token`] call.
    ///
    /// # Panics
    ///
    /// Panics if the lookahead slot is already occupied.
    pub fn push_back(&mut self, token: Token<'a>) {
        assert!(
            self.lookahead.is_none(),
            "lexer pushback slot already occupied"
        );
        self.lookahead = Some(token);
    }

    /// Return the next token without consuming it.
    pub fn peek(&mut self) -> Result<&Token<'a>, Error> {
        let token = match self.lookahead.take() {
            Some(token) => token,
            None => self.scan()?,
        };
        Ok(self.lookahead.insert(token))
    }

    pub fn next_token(&mut self) -> Result<Token<'a>, Error> {
        match self.lookahead.take() {
            Some(token) => Ok(token),
            None => self.scan(),
        }
    }

    fn current(&self) -> u8 {
        self.line.as_bytes().get(self.pos).copied().unwrap_or(0)
    }

    fn scan(&mut self) -> Result<Token<'a>, Error> {
        while is_space(self.current()) {
            self.pos += 1;
        }

        let kind = match self.current() {
            0 => return Ok(Token::punct(TokenKind::Eol)),
            b'{' => TokenKind::LeftBrace,
            b'}' => TokenKind::RightBrace,
            b'[' => TokenKind::LeftBracket,
            b']' => TokenKind::RightBracket,
            b',' => TokenKind::Comma,
            b'=' => TokenKind::Equals,
            b'^' => TokenKind::Caret,
            b'+' => TokenKind::Plus,
            b'*' => TokenKind::Star,
            b'~' => TokenKind::Tilde,
            b'@' => TokenKind::At,
            b'&' => TokenKind::Ampersand,
            b'"' => return self.scan_string(),
            b if is_digit(b) => return Ok(self.scan_run(TokenKind::Number, is_digit)),
            _ => return Ok(self.scan_run(TokenKind::Symbol, |b| !is_terminator(b))),
        };
        self.pos += 1;
        Ok(Token::punct(kind))
    }

    fn scan_run(&mut self, kind: TokenKind, accept: impl Fn(u8) -> bool) -> Token<'a> {
        let start = self.pos;
        while self.pos < self.line.len() && accept(self.current()) {
            self.pos += 1;
        }
        Token {
            kind,
            text: &self.line[start..self.pos],
        }
    }

    /// Scan a quoted string, escapes are kept as is.
    fn scan_string(&mut self) -> Result<Token<'a>, Error> {
        let quote = self.pos;
        self.pos += 1;
        let start = self.pos;
        let mut escaped = false;
        loop {
            match self.current() {
                0 => {
                    // leave the lexer at end of line so later calls keep producing EOL
                    self.pos = self.line.len();
                    return Err(Error::UnterminatedString(quote));
                }
                b'"' if !escaped => break,
                b'\\' => escaped = !escaped,
                _ => escaped = false,
            }
            self.pos += 1;
        }
        let text = &self.line[start..self.pos];
        self.pos += 1;
        Ok(Token {
            kind: TokenKind::String,
            text,
        })
    }
}
