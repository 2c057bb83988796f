//! FILENAME: core/parser/src/lib.rs
//! PURPOSE: Library root for the engine expression parser.
//! CONTEXT: This module exposes the lexer, parser, and AST components
//! needed to turn measure expressions and calculated dimensions into trees
//! the engine can evaluate.
//!
//! PIPELINE: Expression String --> Lexer --> Tokens --> Parser --> AST --> Evaluator
//!
//! SUPPORTED FEATURES:
//! - Arithmetic: +, -, *, /
//! - Comparison: =, <>, <, >, <=, >=
//! - String concatenation: &
//! - Field references: Year, [Sales Amount]
//! - Function calls: Sum([Sales Amount]), Month(TimeStamp)
//! - Parentheses for grouping
//! - Unary negation: -5

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

// Register the separate tests module
#[cfg(test)]
mod tests;

// Re-export commonly used types for convenience
pub use ast::{BinaryOperator, Expression, UnaryOperator, Value};
pub use lexer::Lexer;
pub use parser::{parse, parse_field_definition, ParseError, ParseResult, Parser};
pub use token::Token;
