//! FILENAME: core/hypercube/src/definition.rs
//! HyperCube Definition - what a cube computes.
//!
//! This module contains all the types needed to DESCRIBE a hypercube:
//! - Dimensions (inline field lists or library references, with grouping)
//! - Measures (inline expressions or library references, with number formats)
//! - Sorting (per-item criteria plus the inter-column evaluation order)
//!
//! Output column order is always [dimensions..., measures...] in definition
//! order. `inter_column_sort_order` only decides which column the engine
//! sorts by first.

use serde::{Deserialize, Serialize};

use crate::error::{HyperCubeError, HyperCubeResult};

/// Largest decimal count a number format may request.
pub const MAX_DECIMALS: u8 = 15;

// ============================================================================
// SORTING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// How the items of one dimension level (or one measure) are ordered.
/// Criteria are applied numeric first, then text, then load order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortCriteria {
    #[serde(default)]
    pub sort_by_numeric: Option<SortDirection>,
    #[serde(default)]
    pub sort_by_text: Option<SortDirection>,
    #[serde(default)]
    pub sort_by_load_order: Option<SortDirection>,
}

impl SortCriteria {
    pub fn numeric(direction: SortDirection) -> Self {
        SortCriteria {
            sort_by_numeric: Some(direction),
            ..Default::default()
        }
    }

    pub fn text(direction: SortDirection) -> Self {
        SortCriteria {
            sort_by_text: Some(direction),
            ..Default::default()
        }
    }

    pub fn load_order(direction: SortDirection) -> Self {
        SortCriteria {
            sort_by_load_order: Some(direction),
            ..Default::default()
        }
    }

    pub fn is_unsorted(&self) -> bool {
        self.sort_by_numeric.is_none()
            && self.sort_by_text.is_none()
            && self.sort_by_load_order.is_none()
    }
}

// ============================================================================
// GROUPING
// ============================================================================

/// How the field list of a dimension is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Grouping {
    /// Plain dimension: the first field is presented.
    #[default]
    None,
    /// Stacked drill-down: the engine presents the first level whose
    /// predecessors each have exactly one possible value under the current
    /// selections. The last level is presented once every earlier one is
    /// narrowed down.
    Hierarchy,
    /// Cyclic group: the caller picks the presented field via `active_field`.
    Collection,
}

// ============================================================================
// NUMBER FORMAT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FieldAttrType {
    #[default]
    Unknown,
    Ascii,
    Integer,
    Real,
    Fixed,
    Money,
    Date,
    Time,
    Timestamp,
    Interval,
}

/// Number presentation attributes, interpreted by the engine when it
/// renders the text form of a cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldAttributes {
    #[serde(default)]
    pub attr_type: FieldAttrType,
    /// Number of decimals.
    #[serde(default)]
    pub n_dec: u8,
    /// Whether the thousands separator is used.
    #[serde(default)]
    pub use_thou: bool,
    /// Format pattern, engine-interpreted.
    #[serde(default)]
    pub fmt: Option<String>,
    /// Decimal separator.
    #[serde(default)]
    pub dec: Option<String>,
    /// Thousands separator.
    #[serde(default)]
    pub thou: Option<String>,
}

impl FieldAttributes {
    pub fn money(n_dec: u8, dec: &str, thou: &str) -> Self {
        FieldAttributes {
            attr_type: FieldAttrType::Money,
            n_dec,
            use_thou: true,
            fmt: None,
            dec: Some(dec.to_string()),
            thou: Some(thou.to_string()),
        }
    }

    pub fn fixed(n_dec: u8) -> Self {
        FieldAttributes {
            attr_type: FieldAttrType::Fixed,
            n_dec,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> HyperCubeResult<()> {
        if self.n_dec > MAX_DECIMALS {
            return Err(HyperCubeError::validation(format!(
                "number format requests {} decimals (max {})",
                self.n_dec, MAX_DECIMALS
            )));
        }
        if self.use_thou {
            if let (Some(dec), Some(thou)) = (&self.dec, &self.thou) {
                if dec == thou {
                    return Err(HyperCubeError::validation(format!(
                        "decimal and thousands separators are both '{}'",
                        dec
                    )));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// DIMENSIONS
// ============================================================================

/// The inline part of a dimension. For a library dimension `field_defs`
/// stays empty while sort criteria and grouping still apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineDimensionDef {
    #[serde(default)]
    pub grouping: Grouping,

    /// Field names or calculated expressions (leading '='). More than one
    /// entry forms a hierarchy or a cyclic group depending on `grouping`.
    #[serde(default)]
    pub field_defs: Vec<String>,

    /// Optional display labels, parallel to `field_defs`.
    #[serde(default)]
    pub field_labels: Vec<String>,

    /// One criteria entry per field level. Missing entries mean load order.
    #[serde(default)]
    pub sort_criterias: Vec<SortCriteria>,

    /// Index of the presented field of a cyclic group.
    #[serde(default)]
    pub active_field: usize,

    /// Display formatting per field level.
    #[serde(default)]
    pub number_presentations: Vec<FieldAttributes>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    /// Reference to a dimension of the engine's library.
    #[serde(default)]
    pub library_id: Option<String>,

    #[serde(default)]
    pub def: InlineDimensionDef,

    /// Drop rows whose value for this dimension is null.
    #[serde(default)]
    pub null_suppression: bool,
}

impl Dimension {
    pub fn inline(field: impl Into<String>) -> Self {
        Dimension {
            library_id: None,
            def: InlineDimensionDef {
                field_defs: vec![field.into()],
                ..Default::default()
            },
            null_suppression: false,
        }
    }

    pub fn library(id: impl Into<String>) -> Self {
        Dimension {
            library_id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn is_library(&self) -> bool {
        self.library_id.is_some()
    }

    /// Sort criteria for the given field level (load order when unset).
    pub fn sort_criteria_for(&self, level: usize) -> SortCriteria {
        self.def.sort_criterias.get(level).cloned().unwrap_or_default()
    }

    pub fn validate(&self, index: usize) -> HyperCubeResult<()> {
        let inline = !self.def.field_defs.is_empty();
        let library = match &self.library_id {
            Some(id) if id.trim().is_empty() => {
                return Err(HyperCubeError::validation(format!(
                    "dimension {} has an empty library id",
                    index
                )))
            }
            Some(_) => true,
            None => false,
        };

        match (inline, library) {
            (true, true) => {
                return Err(HyperCubeError::validation(format!(
                    "dimension {} sets both inline fields and a library id",
                    index
                )))
            }
            (false, false) => {
                return Err(HyperCubeError::validation(format!(
                    "dimension {} sets neither inline fields nor a library id",
                    index
                )))
            }
            _ => {}
        }

        if self.def.field_defs.iter().any(|f| f.trim().is_empty()) {
            return Err(HyperCubeError::validation(format!(
                "dimension {} has an empty field definition",
                index
            )));
        }

        match self.def.grouping {
            Grouping::Collection => {
                // Library field counts are only known to the engine.
                if inline && self.def.active_field >= self.def.field_defs.len() {
                    return Err(HyperCubeError::validation(format!(
                        "dimension {}: active field {} out of range for {} fields",
                        index,
                        self.def.active_field,
                        self.def.field_defs.len()
                    )));
                }
            }
            Grouping::None | Grouping::Hierarchy => {
                if self.def.grouping == Grouping::None && self.def.field_defs.len() > 1 {
                    return Err(HyperCubeError::validation(format!(
                        "dimension {} lists {} fields without a grouping",
                        index,
                        self.def.field_defs.len()
                    )));
                }
                if self.def.active_field != 0 {
                    return Err(HyperCubeError::validation(format!(
                        "dimension {}: active field is only meaningful for cyclic groups",
                        index
                    )));
                }
            }
        }

        if inline && self.def.sort_criterias.len() > self.def.field_defs.len() {
            return Err(HyperCubeError::validation(format!(
                "dimension {} has {} sort criteria for {} fields",
                index,
                self.def.sort_criterias.len(),
                self.def.field_defs.len()
            )));
        }

        for attrs in &self.def.number_presentations {
            attrs.validate()?;
        }
        Ok(())
    }
}

// ============================================================================
// MEASURES
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineMeasureDef {
    /// Aggregation expression, e.g. `Sum([Sales Amount])`.
    #[serde(default)]
    pub def: String,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub num_format: Option<FieldAttributes>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measure {
    /// Reference to a measure of the engine's library.
    #[serde(default)]
    pub library_id: Option<String>,

    #[serde(default)]
    pub def: InlineMeasureDef,

    #[serde(default)]
    pub sort_by: SortCriteria,
}

impl Measure {
    pub fn inline(expression: impl Into<String>) -> Self {
        Measure {
            library_id: None,
            def: InlineMeasureDef {
                def: expression.into(),
                ..Default::default()
            },
            sort_by: SortCriteria::default(),
        }
    }

    pub fn library(id: impl Into<String>) -> Self {
        Measure {
            library_id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn is_library(&self) -> bool {
        self.library_id.is_some()
    }

    pub fn validate(&self, index: usize) -> HyperCubeResult<()> {
        let inline = !self.def.def.trim().is_empty();
        let library = match &self.library_id {
            Some(id) if id.trim().is_empty() => {
                return Err(HyperCubeError::validation(format!(
                    "measure {} has an empty library id",
                    index
                )))
            }
            Some(_) => true,
            None => false,
        };

        match (inline, library) {
            (true, true) => Err(HyperCubeError::validation(format!(
                "measure {} sets both an inline expression and a library id",
                index
            ))),
            (false, false) => Err(HyperCubeError::validation(format!(
                "measure {} sets neither an inline expression nor a library id",
                index
            ))),
            _ => match &self.def.num_format {
                Some(attrs) => attrs.validate(),
                None => Ok(()),
            },
        }
    }
}

// ============================================================================
// MAIN DEFINITION STRUCT
// ============================================================================

/// How the engine lays out the cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DataMode {
    /// One row per dimension value combination.
    #[default]
    Straight,
    Pivot,
    Stacked,
}

/// The complete definition of a hypercube as committed to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HyperCubeDefinition {
    #[serde(default)]
    pub dimensions: Vec<Dimension>,

    #[serde(default)]
    pub measures: Vec<Measure>,

    /// Column indices in the order the engine applies their sort criteria.
    /// Empty means definition order.
    #[serde(default)]
    pub inter_column_sort_order: Vec<usize>,

    #[serde(default)]
    pub mode: DataMode,

    /// Drop rows where every measure evaluates to zero or null.
    #[serde(default)]
    pub suppress_zero: bool,
}

impl HyperCubeDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of columns a data page of this cube has.
    pub fn column_count(&self) -> usize {
        self.dimensions.len() + self.measures.len()
    }

    /// Appends an inline dimension on a single field or expression.
    pub fn add_inline_dimension(&mut self, field: impl Into<String>) -> &mut Dimension {
        self.push_dimension(Dimension::inline(field))
    }

    pub fn add_library_dimension(&mut self, id: impl Into<String>) -> &mut Dimension {
        self.push_dimension(Dimension::library(id))
    }

    pub fn add_inline_measure(&mut self, expression: impl Into<String>) -> &mut Measure {
        self.push_measure(Measure::inline(expression))
    }

    /// Appends a measure referring to the engine's library by id.
    pub fn add_library_measure(&mut self, id: impl Into<String>) -> &mut Measure {
        self.push_measure(Measure::library(id))
    }

    /// Appends a dimension. With an explicit sort order, measure indices
    /// shift by one and the new column sorts last.
    pub fn push_dimension(&mut self, dimension: Dimension) -> &mut Dimension {
        let position = self.dimensions.len();
        if !self.inter_column_sort_order.is_empty() {
            for index in self.inter_column_sort_order.iter_mut() {
                if *index >= position {
                    *index += 1;
                }
            }
            self.inter_column_sort_order.push(position);
        }
        self.dimensions.push(dimension);
        &mut self.dimensions[position]
    }

    pub fn push_measure(&mut self, measure: Measure) -> &mut Measure {
        if !self.inter_column_sort_order.is_empty() {
            self.inter_column_sort_order.push(self.column_count());
        }
        self.measures.push(measure);
        let last = self.measures.len() - 1;
        &mut self.measures[last]
    }

    /// Replaces all dimensions at once. Clears the inter-column sort order.
    pub fn set_dimensions(&mut self, dimensions: impl IntoIterator<Item = Dimension>) {
        self.dimensions = dimensions.into_iter().collect();
        self.inter_column_sort_order.clear();
    }

    /// Replaces all measures at once. Clears the inter-column sort order.
    pub fn set_measures(&mut self, measures: impl IntoIterator<Item = Measure>) {
        self.measures = measures.into_iter().collect();
        self.inter_column_sort_order.clear();
    }

    /// The sort order the engine applies: the explicit one, or definition order.
    pub fn effective_sort_order(&self) -> Vec<usize> {
        if self.inter_column_sort_order.is_empty() {
            (0..self.column_count()).collect()
        } else {
            self.inter_column_sort_order.clone()
        }
    }

    pub fn validate(&self) -> HyperCubeResult<()> {
        for (index, dimension) in self.dimensions.iter().enumerate() {
            dimension.validate(index)?;
        }
        for (index, measure) in self.measures.iter().enumerate() {
            measure.validate(index)?;
        }
        self.validate_sort_order()
    }

    fn validate_sort_order(&self) -> HyperCubeResult<()> {
        let order = &self.inter_column_sort_order;
        if order.is_empty() {
            return Ok(());
        }

        let columns = self.column_count();
        if order.len() != columns {
            return Err(HyperCubeError::validation(format!(
                "inter-column sort order has {} entries for {} columns",
                order.len(),
                columns
            )));
        }

        let mut seen = vec![false; columns];
        for &index in order {
            if index >= columns {
                return Err(HyperCubeError::validation(format!(
                    "inter-column sort order names column {} of {}",
                    index, columns
                )));
            }
            if seen[index] {
                return Err(HyperCubeError::validation(format!(
                    "inter-column sort order repeats column {}",
                    index
                )));
            }
            seen[index] = true;
        }
        Ok(())
    }
}
