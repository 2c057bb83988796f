//! FILENAME: core/engine/src/value.rs
//! Dataset values and their hashable normalization.
//!
//! Every field value has a numeric side, a text side, or both (a dual value
//! such as month 1 / "Jan"). Values are interned per field, so equality and
//! hashing must be total, including for NaN.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use hypercube::{Cell, FieldAttributes};

use crate::number_format::{format_general, format_number};

/// Wrapper around f64 that implements Eq and Hash for use as HashMap keys.
/// NaN values are treated as equal to each other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderedFloat(pub f64);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        if self.0.is_nan() && other.0.is_nan() {
            true
        } else {
            self.0 == other.0
        }
    }
}

impl Eq for OrderedFloat {}

impl std::hash::Hash for OrderedFloat {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        if self.0.is_nan() {
            u64::MAX.hash(state);
        } else if self.0 == 0.0 {
            // 0.0 and -0.0 are equal, so they must hash alike
            0u64.hash(state);
        } else {
            self.0.to_bits().hash(state);
        }
    }
}

/// A single value of a dataset field or of a per-record expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldValue {
    Empty,
    Number(OrderedFloat),
    Text(String),
    /// Number with its own display text.
    Dual(OrderedFloat, String),
}

impl FieldValue {
    pub fn number(n: f64) -> Self {
        if n.is_nan() {
            FieldValue::Empty
        } else {
            FieldValue::Number(OrderedFloat(n))
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        FieldValue::Text(s.into())
    }

    pub fn dual(n: f64, s: impl Into<String>) -> Self {
        FieldValue::Dual(OrderedFloat(n), s.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Empty)
    }

    /// Numeric side, NaN when there is none.
    pub fn num(&self) -> f64 {
        match self {
            FieldValue::Number(n) | FieldValue::Dual(n, _) => n.0,
            FieldValue::Empty | FieldValue::Text(_) => f64::NAN,
        }
    }

    pub fn is_numeric(&self) -> bool {
        !self.num().is_nan()
    }

    /// Text side. Plain numbers render in general format.
    pub fn text_form(&self) -> String {
        match self {
            FieldValue::Empty => String::new(),
            FieldValue::Number(n) => format_general(n.0),
            FieldValue::Text(s) | FieldValue::Dual(_, s) => s.clone(),
        }
    }

    /// Emits the value as a cell. `presentation` renders plain numbers;
    /// dual and text values keep their own text.
    pub fn to_cell(&self, presentation: Option<&FieldAttributes>) -> Cell {
        match self {
            FieldValue::Empty => Cell::null(),
            FieldValue::Number(n) => {
                let text = match presentation {
                    Some(attrs) => format_number(n.0, attrs),
                    None => format_general(n.0),
                };
                Cell::new(n.0, text)
            }
            FieldValue::Text(s) => Cell::text(s.clone()),
            FieldValue::Dual(n, s) => Cell::new(n.0, s.clone()),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::number(n)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::number(n as f64)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

// ============================================================================
// ORDERING
// ============================================================================

/// Numeric comparison. Values without a numeric side sort after all
/// numbers and tie with each other.
pub fn compare_numeric(a: &FieldValue, b: &FieldValue) -> Ordering {
    let (x, y) = (a.num(), b.num());
    match (x.is_nan(), y.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
    }
}

/// Case-insensitive text comparison; empty values sort last.
pub fn compare_text(a: &FieldValue, b: &FieldValue) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let (x, y) = (a.text_form(), b.text_form());
            x.to_lowercase()
                .cmp(&y.to_lowercase())
                .then_with(|| x.cmp(&y))
        }
    }
}
