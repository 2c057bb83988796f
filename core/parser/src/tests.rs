//! FILENAME: core/parser/src/tests.rs
//! PURPOSE: Consolidated unit tests for the parser crate.

use crate::ast::{BinaryOperator, Expression, UnaryOperator, Value};
use crate::lexer::Lexer;
use crate::parser::{parse, parse_field_definition};
use crate::token::Token;

fn field(name: &str) -> Expression {
    Expression::Field(name.to_string())
}

fn call(name: &str, args: Vec<Expression>) -> Expression {
    Expression::FunctionCall {
        name: name.to_string(),
        args,
    }
}

fn binary(left: Expression, op: BinaryOperator, right: Expression) -> Expression {
    Expression::BinaryOp {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

// ========================================
// LEXER TESTS
// ========================================

#[test]
fn lexer_tokenizes_measure() {
    let mut lexer = Lexer::new("Sum([Sales Amount])");
    assert_eq!(lexer.next_token(), Token::Identifier("Sum".to_string()));
    assert_eq!(lexer.next_token(), Token::LParen);
    assert_eq!(lexer.next_token(), Token::Field("Sales Amount".to_string()));
    assert_eq!(lexer.next_token(), Token::RParen);
    assert_eq!(lexer.next_token(), Token::EOF);
}

#[test]
fn lexer_keeps_identifier_case() {
    let mut lexer = Lexer::new("TimeStamp");
    assert_eq!(lexer.next_token(), Token::Identifier("TimeStamp".to_string()));
}

#[test]
fn lexer_reads_string_with_escaped_quote() {
    let mut lexer = Lexer::new("'it''s' & '-'");
    assert_eq!(lexer.next_token(), Token::String("it's".to_string()));
    assert_eq!(lexer.next_token(), Token::Ampersand);
    assert_eq!(lexer.next_token(), Token::String("-".to_string()));
}

#[test]
fn lexer_reads_double_quoted_field() {
    let mut lexer = Lexer::new("\"Sales Rep Name\"");
    assert_eq!(lexer.next_token(), Token::Field("Sales Rep Name".to_string()));
}

#[test]
fn lexer_tokenizes_comparison_operators() {
    let mut lexer = Lexer::new("< > <= >= <> =");
    assert_eq!(lexer.next_token(), Token::LessThan);
    assert_eq!(lexer.next_token(), Token::GreaterThan);
    assert_eq!(lexer.next_token(), Token::LessEqual);
    assert_eq!(lexer.next_token(), Token::GreaterEqual);
    assert_eq!(lexer.next_token(), Token::NotEqual);
    assert_eq!(lexer.next_token(), Token::Equals);
}

#[test]
fn lexer_flags_unterminated_literals() {
    assert_eq!(Lexer::new("'open").next_token(), Token::Illegal('\''));
    assert_eq!(Lexer::new("[open").next_token(), Token::Illegal('['));
}

#[test]
fn lexer_reads_decimals() {
    let mut lexer = Lexer::new("1.5 .25");
    assert_eq!(lexer.next_token(), Token::Number(1.5));
    assert_eq!(lexer.next_token(), Token::Number(0.25));
}

// ========================================
// PARSER TESTS
// ========================================

#[test]
fn parser_aggregation_on_bracketed_field() {
    let expr = parse("Sum([Sales Amount])").unwrap();
    assert_eq!(expr, call("SUM", vec![field("Sales Amount")]));
}

#[test]
fn parser_uppercases_function_names_only() {
    let expr = parse("year(TimeStamp)").unwrap();
    assert_eq!(expr, call("YEAR", vec![field("TimeStamp")]));
}

#[test]
fn parser_calculated_dimension() {
    let expr = parse("=Year(TimeStamp)&'-'&Month(TimeStamp)").unwrap();
    let expected = binary(
        binary(
            call("YEAR", vec![field("TimeStamp")]),
            BinaryOperator::Concat,
            Expression::Literal(Value::String("-".to_string())),
        ),
        BinaryOperator::Concat,
        call("MONTH", vec![field("TimeStamp")]),
    );
    assert_eq!(expr, expected);
}

#[test]
fn parser_respects_precedence() {
    // 1 + 2 * 3 & 'x' groups as ((1 + (2 * 3)) & 'x')
    let expr = parse("1 + 2 * 3 & 'x'").unwrap();
    let expected = binary(
        binary(
            Expression::Literal(Value::Number(1.0)),
            BinaryOperator::Add,
            binary(
                Expression::Literal(Value::Number(2.0)),
                BinaryOperator::Multiply,
                Expression::Literal(Value::Number(3.0)),
            ),
        ),
        BinaryOperator::Concat,
        Expression::Literal(Value::String("x".to_string())),
    );
    assert_eq!(expr, expected);
}

#[test]
fn parser_measure_arithmetic() {
    let expr = parse("Sum(Sales) / Count(Sales)").unwrap();
    assert_eq!(
        expr,
        binary(
            call("SUM", vec![field("Sales")]),
            BinaryOperator::Divide,
            call("COUNT", vec![field("Sales")]),
        )
    );
}

#[test]
fn parser_unary_negation() {
    let expr = parse("-Sum(Sales)").unwrap();
    assert_eq!(
        expr,
        Expression::UnaryOp {
            op: UnaryOperator::Negate,
            operand: Box::new(call("SUM", vec![field("Sales")])),
        }
    );
}

#[test]
fn parser_comparison_after_leading_equals() {
    let expr = parse("=Year > 2015").unwrap();
    assert_eq!(
        expr,
        binary(
            field("Year"),
            BinaryOperator::GreaterThan,
            Expression::Literal(Value::Number(2015.0)),
        )
    );
}

#[test]
fn parser_multiple_arguments() {
    let expr = parse("Max(a, 1, 'b')").unwrap();
    match expr {
        Expression::FunctionCall { name, args } => {
            assert_eq!(name, "MAX");
            assert_eq!(args.len(), 3);
        }
        other => panic!("expected call, got {:?}", other),
    }
}

#[test]
fn parser_errors() {
    assert!(parse("").is_err());
    assert!(parse("=").is_err());
    assert!(parse("Sum(Sales").is_err());
    assert!(parse("1 +").is_err());
    assert!(parse("Sales Amount").is_err());
    assert!(parse("[]").is_err());
    assert!(parse("a ? b").is_err());
}

#[test]
fn parser_error_message_names_token() {
    let err = parse("Sum(Sales))").unwrap_err();
    assert!(err.message.contains(")"), "{}", err);
}

#[test]
fn parser_errors_carry_offsets() {
    let err = parse("Sum(Sales))").unwrap_err();
    assert_eq!(err.position, 10);
    assert!(err.to_string().contains("offset 10"));

    assert_eq!(parse("1 + ").unwrap_err().position, 4);
    assert_eq!(parse_field_definition("  =Year(]").unwrap_err().position, 8);
}

#[test]
fn lexer_reports_token_starts() {
    let mut lexer = Lexer::new("a <= [b c]");
    lexer.next_token();
    assert_eq!(lexer.token_start(), 0);
    assert_eq!(lexer.next_token(), Token::LessEqual);
    assert_eq!(lexer.token_start(), 2);
    lexer.next_token();
    assert_eq!(lexer.token_start(), 5);
    assert_eq!(lexer.next_token(), Token::EOF);
    assert_eq!(lexer.token_start(), 10);
}

#[test]
fn fields_are_listed_once_in_order() {
    let expr = parse("=Year(TimeStamp) & [Sales Rep Name] & Month(TimeStamp)").unwrap();
    assert_eq!(expr.fields(), vec!["TimeStamp", "Sales Rep Name"]);
}

#[test]
fn display_round_trips_through_parser() {
    let expr = parse("=Year(TimeStamp)&'it''s'&[Sales Amount]*2").unwrap();
    let reparsed = parse(&expr.to_string()).unwrap();
    assert_eq!(reparsed, expr);
}

// ========================================
// FIELD DEFINITION TESTS
// ========================================

#[test]
fn field_definition_without_equals_is_verbatim() {
    assert_eq!(
        parse_field_definition("Sales Rep Name").unwrap(),
        field("Sales Rep Name")
    );
    assert_eq!(parse_field_definition("  Year ").unwrap(), field("Year"));
}

#[test]
fn field_definition_with_equals_is_expression() {
    assert_eq!(
        parse_field_definition("=Month(TimeStamp)").unwrap(),
        call("MONTH", vec![field("TimeStamp")])
    );
    assert!(parse_field_definition("   ").is_err());
    assert!(parse_field_definition("=").is_err());
}
