//! FILENAME: core/engine/src/evaluator.rs
//! PURPOSE: Evaluates parsed expressions against the loaded table.
//! CONTEXT: Expressions are first bound to a table (field names resolved to
//! field positions, function names to builtins). A bound calculated
//! dimension is evaluated once per record; a bound measure is evaluated once
//! per group of records, with aggregations folding over the group.
//!
//! SUPPORTED FEATURES:
//! - Arithmetic: +, -, *, / (null on NaN or division by zero)
//! - Concatenation: & over text forms
//! - Comparison: =, <>, <, >, <=, >= (true is -1, false is 0)
//! - Date parts: YEAR, MONTH (dual, e.g. 1 / "Jan"), DAY
//! - Aggregations: SUM, COUNT, AVG, MIN, MAX, ONLY
//! - A bare field in a measure behaves as ONLY(field)

use std::cmp::Ordering;

use parser::{BinaryOperator, Expression, UnaryOperator, Value};

use hypercube::{HyperCubeError, HyperCubeResult};

use crate::dataset::Table;
use crate::number_format::civil_from_serial;
use crate::value::{compare_text, FieldValue};

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

// ============================================================================
// BUILTINS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinFunction {
    Year,
    Month,
    Day,
    Sum,
    Count,
    Avg,
    Min,
    Max,
    Only,
}

impl BuiltinFunction {
    /// Maps an upper-cased function name to its builtin.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "YEAR" => Some(BuiltinFunction::Year),
            "MONTH" => Some(BuiltinFunction::Month),
            "DAY" => Some(BuiltinFunction::Day),
            "SUM" => Some(BuiltinFunction::Sum),
            "COUNT" => Some(BuiltinFunction::Count),
            "AVG" => Some(BuiltinFunction::Avg),
            "MIN" => Some(BuiltinFunction::Min),
            "MAX" => Some(BuiltinFunction::Max),
            "ONLY" => Some(BuiltinFunction::Only),
            _ => None,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        !matches!(
            self,
            BuiltinFunction::Year | BuiltinFunction::Month | BuiltinFunction::Day
        )
    }
}

// ============================================================================
// BINDING
// ============================================================================

/// An expression whose names are resolved against a table.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundExpr {
    Literal(FieldValue),
    Field(usize),
    Binary {
        left: Box<BoundExpr>,
        op: BinaryOperator,
        right: Box<BoundExpr>,
    },
    Negate(Box<BoundExpr>),
    /// A per-value function such as YEAR.
    Scalar {
        func: BuiltinFunction,
        arg: Box<BoundExpr>,
    },
    /// An aggregation folding its per-record argument over a group.
    Aggregate {
        func: BuiltinFunction,
        arg: Box<BoundExpr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindContext {
    /// Per record: no aggregations allowed.
    Record,
    /// Per group: aggregations allowed, but not nested.
    Group,
}

/// Binds a calculated dimension or a plain field reference.
pub fn bind_dimension(expr: &Expression, table: &Table) -> HyperCubeResult<BoundExpr> {
    bind(expr, table, BindContext::Record)
}

pub fn bind_measure(expr: &Expression, table: &Table) -> HyperCubeResult<BoundExpr> {
    bind(expr, table, BindContext::Group)
}

fn bind(expr: &Expression, table: &Table, context: BindContext) -> HyperCubeResult<BoundExpr> {
    match expr {
        Expression::Literal(Value::Number(n)) => Ok(BoundExpr::Literal(FieldValue::number(*n))),
        Expression::Literal(Value::String(s)) => Ok(BoundExpr::Literal(FieldValue::text(s.clone()))),
        Expression::Field(name) => table
            .field_index(name)
            .map(BoundExpr::Field)
            .ok_or_else(|| HyperCubeError::validation(format!("unknown field '{}'", name))),
        Expression::BinaryOp { left, op, right } => Ok(BoundExpr::Binary {
            left: Box::new(bind(left, table, context)?),
            op: *op,
            right: Box::new(bind(right, table, context)?),
        }),
        Expression::UnaryOp {
            op: UnaryOperator::Negate,
            operand,
        } => Ok(BoundExpr::Negate(Box::new(bind(operand, table, context)?))),
        Expression::FunctionCall { name, args } => {
            let func = BuiltinFunction::from_name(name)
                .ok_or_else(|| HyperCubeError::validation(format!("unknown function '{}'", name)))?;
            let [arg] = args.as_slice() else {
                return Err(HyperCubeError::validation(format!(
                    "{} takes exactly one argument, got {}",
                    name,
                    args.len()
                )));
            };

            if func.is_aggregate() {
                if context == BindContext::Record {
                    return Err(HyperCubeError::validation(format!(
                        "aggregation {} is not allowed here",
                        name
                    )));
                }
                Ok(BoundExpr::Aggregate {
                    func,
                    arg: Box::new(bind(arg, table, BindContext::Record)?),
                })
            } else {
                Ok(BoundExpr::Scalar {
                    func,
                    arg: Box::new(bind(arg, table, context)?),
                })
            }
        }
    }
}

// ============================================================================
// EVALUATION
// ============================================================================

/// Evaluates a bound dimension expression for one record.
pub fn eval_record(expr: &BoundExpr, table: &Table, record: usize) -> FieldValue {
    match expr {
        BoundExpr::Literal(value) => value.clone(),
        BoundExpr::Field(field) => table.value(record, *field).clone(),
        BoundExpr::Binary { left, op, right } => apply_binary(
            &eval_record(left, table, record),
            *op,
            &eval_record(right, table, record),
        ),
        BoundExpr::Negate(operand) => negate(&eval_record(operand, table, record)),
        BoundExpr::Scalar { func, arg } => apply_scalar(*func, &eval_record(arg, table, record)),
        // Binding keeps aggregations out of record context.
        BoundExpr::Aggregate { .. } => FieldValue::Empty,
    }
}

/// Evaluates a bound measure over a group of records.
pub fn eval_group(expr: &BoundExpr, table: &Table, records: &[usize]) -> FieldValue {
    match expr {
        BoundExpr::Literal(value) => value.clone(),
        BoundExpr::Field(_) => aggregate(BuiltinFunction::Only, expr, table, records),
        BoundExpr::Binary { left, op, right } => apply_binary(
            &eval_group(left, table, records),
            *op,
            &eval_group(right, table, records),
        ),
        BoundExpr::Negate(operand) => negate(&eval_group(operand, table, records)),
        BoundExpr::Scalar { func, arg } => apply_scalar(*func, &eval_group(arg, table, records)),
        BoundExpr::Aggregate { func, arg } => aggregate(*func, arg, table, records),
    }
}

fn aggregate(func: BuiltinFunction, arg: &BoundExpr, table: &Table, records: &[usize]) -> FieldValue {
    let mut acc = AggregateAccumulator::new();
    for &record in records {
        acc.add(eval_record(arg, table, record));
    }
    acc.compute(func)
}

fn apply_binary(left: &FieldValue, op: BinaryOperator, right: &FieldValue) -> FieldValue {
    match op {
        BinaryOperator::Concat => {
            FieldValue::text(format!("{}{}", left.text_form(), right.text_form()))
        }
        BinaryOperator::Add => arithmetic(left, right, |a, b| a + b),
        BinaryOperator::Subtract => arithmetic(left, right, |a, b| a - b),
        BinaryOperator::Multiply => arithmetic(left, right, |a, b| a * b),
        BinaryOperator::Divide => arithmetic(left, right, |a, b| {
            if b == 0.0 {
                f64::NAN
            } else {
                a / b
            }
        }),
        BinaryOperator::Equal => truth(compare(left, right) == Ordering::Equal),
        BinaryOperator::NotEqual => truth(compare(left, right) != Ordering::Equal),
        BinaryOperator::LessThan => truth(compare(left, right) == Ordering::Less),
        BinaryOperator::GreaterThan => truth(compare(left, right) == Ordering::Greater),
        BinaryOperator::LessEqual => truth(compare(left, right) != Ordering::Greater),
        BinaryOperator::GreaterEqual => truth(compare(left, right) != Ordering::Less),
    }
}

fn arithmetic(left: &FieldValue, right: &FieldValue, f: impl Fn(f64, f64) -> f64) -> FieldValue {
    // NaN operands or results become null
    FieldValue::number(f(left.num(), right.num()))
}

/// Numbers compare numerically, anything else by text.
fn compare(left: &FieldValue, right: &FieldValue) -> Ordering {
    if left.is_numeric() && right.is_numeric() {
        left.num().partial_cmp(&right.num()).unwrap_or(Ordering::Equal)
    } else {
        compare_text(left, right)
    }
}

fn truth(value: bool) -> FieldValue {
    FieldValue::number(if value { -1.0 } else { 0.0 })
}

fn negate(value: &FieldValue) -> FieldValue {
    FieldValue::number(-value.num())
}

fn apply_scalar(func: BuiltinFunction, arg: &FieldValue) -> FieldValue {
    let Some((year, month, day)) = civil_from_serial(arg.num()) else {
        return FieldValue::Empty;
    };
    match func {
        BuiltinFunction::Year => FieldValue::number(year as f64),
        BuiltinFunction::Month => FieldValue::dual(month as f64, MONTH_NAMES[(month as usize - 1) % 12]),
        BuiltinFunction::Day => FieldValue::number(day as f64),
        _ => FieldValue::Empty,
    }
}

// ============================================================================
// AGGREGATE ACCUMULATOR
// ============================================================================

/// Accumulator for computing aggregates incrementally.
#[derive(Debug, Clone, Default)]
pub struct AggregateAccumulator {
    pub sum: f64,
    /// Non-empty values seen.
    pub count: u64,
    pub count_numbers: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// The single distinct value seen so far, for ONLY.
    only: Option<FieldValue>,
    ambiguous: bool,
}

impl AggregateAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: FieldValue) {
        if value.is_empty() {
            return;
        }
        self.count += 1;

        let n = value.num();
        if !n.is_nan() {
            self.count_numbers += 1;
            self.sum += n;
            self.min = Some(self.min.map_or(n, |m| m.min(n)));
            self.max = Some(self.max.map_or(n, |m| m.max(n)));
        }

        if !self.ambiguous {
            match &self.only {
                None => self.only = Some(value),
                Some(seen) if *seen != value => self.ambiguous = true,
                Some(_) => {}
            }
        }
    }

    /// Computes the final aggregate value.
    pub fn compute(&self, func: BuiltinFunction) -> FieldValue {
        match func {
            BuiltinFunction::Sum => FieldValue::number(self.sum),
            BuiltinFunction::Count => FieldValue::number(self.count as f64),
            BuiltinFunction::Avg => {
                if self.count_numbers == 0 {
                    FieldValue::Empty
                } else {
                    FieldValue::number(self.sum / self.count_numbers as f64)
                }
            }
            BuiltinFunction::Min => self.min.map_or(FieldValue::Empty, FieldValue::number),
            BuiltinFunction::Max => self.max.map_or(FieldValue::Empty, FieldValue::number),
            BuiltinFunction::Only => match (&self.only, self.ambiguous) {
                (Some(value), false) => value.clone(),
                _ => FieldValue::Empty,
            },
            BuiltinFunction::Year | BuiltinFunction::Month | BuiltinFunction::Day => {
                FieldValue::Empty
            }
        }
    }
}
