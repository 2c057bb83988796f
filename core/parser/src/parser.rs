//! FILENAME: core/parser/src/parser.rs
//! PURPOSE: Converts a stream of Tokens into an AST.
//! CONTEXT: Second stage of the parsing pipeline. Binary operators are
//! handled by precedence climbing over the table in `binary_operator`;
//! unary minus and primaries by plain recursive descent.
//!
//! GRAMMAR (loosest binding first):
//!   expression     --> binary(comparison)
//!   comparison     --> "=" | "<>" | "<" | ">" | "<=" | ">="
//!   concatenation  --> "&"
//!   additive       --> "+" | "-"
//!   multiplicative --> "*" | "/"
//!   unary          --> "-" unary | primary
//!   primary        --> NUMBER | STRING | FIELD | IDENTIFIER | call | "(" expression ")"
//!   call           --> IDENTIFIER "(" (expression ("," expression)*)? ")"
//!
//! All binary operators associate to the left.

use crate::ast::{BinaryOperator, Expression, UnaryOperator, Value};
use crate::lexer::Lexer;
use crate::token::Token;

#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub message: String,
    /// Byte offset into the parsed text.
    pub position: usize,
}

impl ParseError {
    pub fn at(position: usize, message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
            position,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error at offset {}: {}", self.position, self.message)
    }
}

impl std::error::Error for ParseError {}

pub type ParseResult<T> = Result<T, ParseError>;

/// Binding level of each binary operator token. Higher binds tighter.
fn binary_operator(token: &Token) -> Option<(BinaryOperator, u8)> {
    let entry = match token {
        Token::Equals => (BinaryOperator::Equal, 1),
        Token::NotEqual => (BinaryOperator::NotEqual, 1),
        Token::LessThan => (BinaryOperator::LessThan, 1),
        Token::GreaterThan => (BinaryOperator::GreaterThan, 1),
        Token::LessEqual => (BinaryOperator::LessEqual, 1),
        Token::GreaterEqual => (BinaryOperator::GreaterEqual, 1),
        Token::Ampersand => (BinaryOperator::Concat, 2),
        Token::Plus => (BinaryOperator::Add, 3),
        Token::Minus => (BinaryOperator::Subtract, 3),
        Token::Asterisk => (BinaryOperator::Multiply, 4),
        Token::Slash => (BinaryOperator::Divide, 4),
        _ => return None,
    };
    Some(entry)
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    /// Byte offset of `current`.
    position: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        let position = lexer.token_start();
        Parser {
            lexer,
            current,
            position,
        }
    }

    /// Parses the whole input. The leading '=' of a calculated dimension is
    /// optional.
    pub fn parse(&mut self) -> ParseResult<Expression> {
        if self.current == Token::Equals {
            self.advance();
        }
        if self.current == Token::EOF {
            return Err(self.error("Empty expression"));
        }

        let expr = self.parse_binary(1)?;
        if self.current != Token::EOF {
            return Err(self.error(format!("Unexpected token after expression: {}", self.current)));
        }
        Ok(expr)
    }

    fn advance(&mut self) {
        self.current = self.lexer.next_token();
        self.position = self.lexer.token_start();
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::at(self.position, message)
    }

    fn expect(&mut self, expected: Token) -> ParseResult<()> {
        if self.current != expected {
            return Err(self.error(format!("Expected {}, found {}", expected, self.current)));
        }
        self.advance();
        Ok(())
    }

    /// Operands joined by operators binding at `min_level` or tighter.
    fn parse_binary(&mut self, min_level: u8) -> ParseResult<Expression> {
        let mut left = self.parse_unary()?;
        while let Some((op, level)) = binary_operator(&self.current) {
            if level < min_level {
                break;
            }
            self.advance();
            let right = self.parse_binary(level + 1)?;
            left = Expression::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expression> {
        if self.current != Token::Minus {
            return self.parse_primary();
        }
        self.advance();
        Ok(Expression::UnaryOp {
            op: UnaryOperator::Negate,
            operand: Box::new(self.parse_unary()?),
        })
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        let token = std::mem::replace(&mut self.current, Token::EOF);
        let expr = match token {
            Token::Number(n) => Expression::Literal(Value::Number(n)),
            Token::String(s) => Expression::Literal(Value::String(s)),
            Token::Field(name) if name.trim().is_empty() => {
                return Err(self.error("Empty field name"));
            }
            Token::Field(name) => Expression::Field(name),
            Token::Identifier(name) => {
                self.advance();
                // A name followed by '(' calls a function; otherwise it is a field.
                return if self.current == Token::LParen {
                    self.parse_call(name)
                } else {
                    Ok(Expression::Field(name))
                };
            }
            Token::LParen => {
                self.advance();
                let inner = self.parse_binary(1)?;
                self.expect(Token::RParen)?;
                return Ok(inner);
            }
            Token::EOF => return Err(self.error("Unexpected end of expression")),
            Token::Illegal(ch) => return Err(self.error(format!("Illegal character: {}", ch))),
            other => {
                let message = format!("Unexpected token: {}", other);
                self.current = other;
                return Err(self.error(message));
            }
        };
        self.advance();
        Ok(expr)
    }

    /// Arguments of a call whose name has been read; `current` is '('.
    fn parse_call(&mut self, name: String) -> ParseResult<Expression> {
        self.advance();
        let mut args = Vec::new();
        if self.current != Token::RParen {
            loop {
                args.push(self.parse_binary(1)?);
                if self.current != Token::Comma {
                    break;
                }
                self.advance();
            }
        }
        self.expect(Token::RParen)?;
        Ok(Expression::FunctionCall {
            name: name.to_uppercase(),
            args,
        })
    }
}

pub fn parse(input: &str) -> ParseResult<Expression> {
    Parser::new(input).parse()
}

/// Interprets a dimension field definition: a leading '=' makes it a
/// calculated expression, anything else names a field verbatim (spaces and
/// all).
pub fn parse_field_definition(definition: &str) -> ParseResult<Expression> {
    let trimmed = definition.trim();
    if trimmed.is_empty() {
        return Err(ParseError::at(0, "Empty field definition"));
    }
    if !trimmed.starts_with('=') {
        return Ok(Expression::Field(trimmed.to_string()));
    }
    // Offsets should point into the untrimmed definition.
    let leading = definition.len() - definition.trim_start().len();
    parse(trimmed).map_err(|e| ParseError::at(e.position + leading, e.message))
}
