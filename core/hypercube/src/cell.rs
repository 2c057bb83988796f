//! FILENAME: core/hypercube/src/cell.rs
//! PURPOSE: A single computed value as delivered by the engine.
//! CONTEXT: Every cell carries both a numeric and a text form. The numeric
//! form is NaN when the value has no numeric meaning (e.g. a sales rep name).

use serde::{Deserialize, Serialize};

/// One value in a data page matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    /// Numeric representation, NaN if the value is not numeric.
    #[serde(with = "nan_as_null")]
    pub num: f64,
    /// Display text, already formatted by the engine.
    pub text: String,
    /// The engine had no value for this position (rendered as "-").
    #[serde(default)]
    pub is_null: bool,
}

impl Cell {
    pub fn new(num: f64, text: impl Into<String>) -> Self {
        Cell {
            num,
            text: text.into(),
            is_null: false,
        }
    }

    /// A numeric cell whose text is the plain rendering of the number.
    pub fn number(num: f64) -> Self {
        let text = if num.fract() == 0.0 && num.abs() < 1e15 {
            format!("{:.0}", num)
        } else {
            format!("{}", num)
        };
        Cell::new(num, text)
    }

    pub fn text(text: impl Into<String>) -> Self {
        Cell::new(f64::NAN, text)
    }

    pub fn null() -> Self {
        Cell {
            num: f64::NAN,
            text: "-".to_string(),
            is_null: true,
        }
    }

    pub fn is_numeric(&self) -> bool {
        !self.num.is_nan()
    }
}

// NaN compares equal to NaN so that text-only cells can be compared in tests
// and change detection.
impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        let num_eq = (self.num.is_nan() && other.num.is_nan()) || self.num == other.num;
        num_eq && self.text == other.text && self.is_null == other.is_null
    }
}

mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_none()
        } else {
            serializer.serialize_some(value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}
