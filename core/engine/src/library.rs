//! FILENAME: core/engine/src/library.rs
//! Master items: named measures and dimensions that cube definitions refer
//! to by id.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use hypercube::{FieldAttributes, Grouping, HyperCubeError, HyperCubeResult};

/// A catalog entry as listed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryItem {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryMeasure {
    pub title: String,
    pub def: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub num_format: Option<FieldAttributes>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryDimension {
    pub title: String,
    #[serde(default)]
    pub grouping: Grouping,
    pub field_defs: Vec<String>,
    #[serde(default)]
    pub field_labels: Vec<String>,
}

impl LibraryDimension {
    /// A single-field dimension.
    pub fn field(title: impl Into<String>, field: impl Into<String>) -> Self {
        LibraryDimension {
            title: title.into(),
            grouping: Grouping::None,
            field_defs: vec![field.into()],
            field_labels: Vec::new(),
        }
    }

    /// A drill-down group over the given fields.
    pub fn hierarchy<I, S>(title: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LibraryDimension {
            title: title.into(),
            grouping: Grouping::Hierarchy,
            field_defs: fields.into_iter().map(Into::into).collect(),
            field_labels: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Library {
    measures: BTreeMap<String, LibraryMeasure>,
    dimensions: BTreeMap<String, LibraryDimension>,
}

fn check_id(id: &str) -> HyperCubeResult<()> {
    if id.trim().is_empty() {
        return Err(HyperCubeError::validation("library ids must not be empty"));
    }
    Ok(())
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a measure. The expression itself is checked by the
    /// engine before it gets here.
    pub fn insert_measure(&mut self, id: &str, measure: LibraryMeasure) -> HyperCubeResult<()> {
        check_id(id)?;
        if measure.def.trim().is_empty() {
            return Err(HyperCubeError::validation(format!(
                "library measure '{}' has no expression",
                id
            )));
        }
        self.measures.insert(id.to_string(), measure);
        Ok(())
    }

    pub fn insert_dimension(&mut self, id: &str, dimension: LibraryDimension) -> HyperCubeResult<()> {
        check_id(id)?;
        if dimension.field_defs.is_empty()
            || dimension.field_defs.iter().any(|f| f.trim().is_empty())
        {
            return Err(HyperCubeError::validation(format!(
                "library dimension '{}' needs non-empty field definitions",
                id
            )));
        }
        if dimension.grouping == Grouping::None && dimension.field_defs.len() > 1 {
            return Err(HyperCubeError::validation(format!(
                "library dimension '{}' lists several fields without a grouping",
                id
            )));
        }
        self.dimensions.insert(id.to_string(), dimension);
        Ok(())
    }

    pub fn measure(&self, id: &str) -> Option<&LibraryMeasure> {
        self.measures.get(id)
    }

    pub fn dimension(&self, id: &str) -> Option<&LibraryDimension> {
        self.dimensions.get(id)
    }

    pub fn remove_measure(&mut self, id: &str) -> Option<LibraryMeasure> {
        self.measures.remove(id)
    }

    pub fn remove_dimension(&mut self, id: &str) -> Option<LibraryDimension> {
        self.dimensions.remove(id)
    }

    /// Measures in id order.
    pub fn measure_list(&self) -> Vec<LibraryItem> {
        self.measures
            .iter()
            .map(|(id, m)| LibraryItem {
                id: id.clone(),
                title: m.title.clone(),
            })
            .collect()
    }

    pub fn dimension_list(&self) -> Vec<LibraryItem> {
        self.dimensions
            .iter()
            .map(|(id, d)| LibraryItem {
                id: id.clone(),
                title: d.title.clone(),
            })
            .collect()
    }
}
