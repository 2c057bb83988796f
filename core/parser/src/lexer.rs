//! FILENAME: core/parser/src/lexer.rs
//! PURPOSE: Scans a raw expression string and produces a stream of Tokens.
//! CONTEXT: First stage of the parsing pipeline. Every token records the
//! byte offset it starts at so parse errors can point into the definition
//! the user committed.
//!
//! SUPPORTED OPERATORS:
//! - Single char: + - * / & ( ) , = < >
//! - Multi char: <= >= <>
//! - Strings: 'text' ('' escapes a quote)
//! - Field names: [Sales Amount] or "Sales Amount"

use crate::token::Token;
use std::iter::Peekable;
use std::str::CharIndices;

pub struct Lexer<'a> {
    chars: Peekable<CharIndices<'a>>,
    len: usize,
    /// Byte offset of the most recently returned token.
    token_start: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            chars: input.char_indices().peekable(),
            len: input.len(),
            token_start: 0,
        }
    }

    /// Byte offset where the last token returned by `next_token` starts.
    /// At the end of input this is the input length.
    pub fn token_start(&self) -> usize {
        self.token_start
    }

    fn bump(&mut self) -> Option<char> {
        self.chars.next().map(|(_, ch)| ch)
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, ch)| ch)
    }

    /// Consumes the next char if it equals `expected`.
    fn eat(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    /// Advances the lexer and returns the next token.
    pub fn next_token(&mut self) -> Token {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.chars.next();
        }

        let (start, ch) = match self.chars.next() {
            Some(next) => next,
            None => {
                self.token_start = self.len;
                return Token::EOF;
            }
        };
        self.token_start = start;

        match ch {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Asterisk,
            '/' => Token::Slash,
            '&' => Token::Ampersand,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            '=' => Token::Equals,
            '<' if self.eat('=') => Token::LessEqual,
            '<' if self.eat('>') => Token::NotEqual,
            '<' => Token::LessThan,
            '>' if self.eat('=') => Token::GreaterEqual,
            '>' => Token::GreaterThan,
            '\'' => self.quoted('\'').map_or(Token::Illegal('\''), Token::String),
            '[' => self.quoted(']').map_or(Token::Illegal('['), Token::Field),
            '"' => self.quoted('"').map_or(Token::Illegal('"'), Token::Field),
            c if c.is_ascii_digit() || c == '.' => self.number(c),
            c if starts_identifier(c) => self.identifier(c),
            c => Token::Illegal(c),
        }
    }

    /// Text up to the closing `close`, where a doubled `close` stands for
    /// one literal char. `None` when the input ends first.
    fn quoted(&mut self, close: char) -> Option<String> {
        let mut text = String::new();
        loop {
            let ch = self.bump()?;
            if ch != close {
                text.push(ch);
            } else if self.eat(close) {
                text.push(close);
            } else {
                return Some(text);
            }
        }
    }

    fn number(&mut self, first: char) -> Token {
        let mut digits = String::from(first);
        let mut seen_dot = first == '.';
        while let Some(ch) = self.peek_char() {
            let take = ch.is_ascii_digit() || (ch == '.' && !seen_dot);
            if !take {
                break;
            }
            seen_dot |= ch == '.';
            digits.push(ch);
            self.chars.next();
        }
        // A lone "." does not parse.
        digits.parse::<f64>().map_or(Token::Illegal(first), Token::Number)
    }

    /// Names keep their case; the parser upper-cases function names only.
    fn identifier(&mut self, first: char) -> Token {
        let mut name = String::from(first);
        while let Some(ch) = self.peek_char() {
            if !(starts_identifier(ch) || ch.is_ascii_digit()) {
                break;
            }
            name.push(ch);
            self.chars.next();
        }
        Token::Identifier(name)
    }
}

fn starts_identifier(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '%'
}
