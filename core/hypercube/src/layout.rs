//! FILENAME: core/hypercube/src/layout.rs
//! Engine-reported shape of a computed cube.
//!
//! The layout is what the engine knows about a cube after evaluating it
//! against the current selection state: grid size and, per column, which
//! field or expression is presented.

use serde::{Deserialize, Serialize};

use crate::page::GridSize;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionInfo {
    /// Title of the presented field (its label, or the field definition).
    pub fallback_title: String,

    /// Index of the presented field within the dimension's field list.
    /// Moves with drill-down for hierarchies and with `active_field` for
    /// cyclic groups.
    pub group_pos: usize,

    /// Titles of every field of a grouped dimension, in definition order.
    pub group_fallback_titles: Vec<String>,

    /// Number of distinct values of the presented field in the result.
    pub cardinal: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureInfo {
    pub fallback_title: String,
    /// Smallest numeric value in the column, NaN for an empty result.
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperCubeLayout {
    pub size: GridSize,
    pub dimension_info: Vec<DimensionInfo>,
    pub measure_info: Vec<MeasureInfo>,
}

impl HyperCubeLayout {
    pub fn row_count(&self) -> usize {
        self.size.rows
    }

    pub fn column_count(&self) -> usize {
        self.size.columns
    }
}
