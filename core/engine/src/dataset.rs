//! FILENAME: core/engine/src/dataset.rs
//! The loaded data model: one table of named fields.
//!
//! Architecture:
//! - Each unique value of a field is stored once and referenced by index
//! - A record is a vector of indices into the fields' unique value stores
//! - Load order (first appearance of a value) falls out of interning order

use rustc_hash::FxHashMap;

use hypercube::{HyperCubeError, HyperCubeResult};

use crate::value::FieldValue;

// ============================================================================
// VALUE INTERNING
// ============================================================================

/// A reference to an interned value within a field's unique value store.
/// Using u32 to save memory (supports up to 4B unique values per field).
pub type ValueId = u32;

/// Represents a "null" or missing value.
pub const VALUE_ID_EMPTY: ValueId = u32::MAX;

static EMPTY: FieldValue = FieldValue::Empty;

/// Storage for a single field: its unique values in load order.
#[derive(Debug, Clone, Default)]
pub struct FieldStore {
    pub name: String,

    /// Map from value to its unique ID (for deduplication during load).
    value_to_id: FxHashMap<FieldValue, ValueId>,

    /// Unique values indexed by ValueId, in order of first appearance.
    id_to_value: Vec<FieldValue>,
}

impl FieldStore {
    pub fn new(name: impl Into<String>) -> Self {
        FieldStore {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Interns a value and returns its ValueId.
    /// If the value already exists, returns the existing ID.
    pub fn intern(&mut self, value: FieldValue) -> ValueId {
        if value.is_empty() {
            return VALUE_ID_EMPTY;
        }

        if let Some(&id) = self.value_to_id.get(&value) {
            return id;
        }

        let id = self.id_to_value.len() as ValueId;
        self.id_to_value.push(value.clone());
        self.value_to_id.insert(value, id);
        id
    }

    /// Gets the value for a given ID.
    pub fn get_value(&self, id: ValueId) -> &FieldValue {
        if id == VALUE_ID_EMPTY {
            return &EMPTY;
        }
        self.id_to_value.get(id as usize).unwrap_or(&EMPTY)
    }

    /// Number of unique values (excluding empty).
    pub fn unique_count(&self) -> usize {
        self.id_to_value.len()
    }

    /// IDs of the values whose text form equals `text`, or whose numeric side
    /// equals `text` parsed as a number.
    pub fn find_by_text(&self, text: &str) -> Vec<ValueId> {
        let number = text.trim().parse::<f64>().ok();
        self.id_to_value
            .iter()
            .enumerate()
            .filter(|(_, value)| {
                value.text_form() == text || number.is_some_and(|n| value.num() == n)
            })
            .map(|(id, _)| id as ValueId)
            .collect()
    }
}

// ============================================================================
// TABLE
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct Table {
    fields: Vec<FieldStore>,
    field_index: FxHashMap<String, usize>,
    /// Records as ValueIds, indexed by field position.
    records: Vec<Vec<ValueId>>,
}

impl Table {
    /// Creates an empty table. Field names must be unique and non-empty.
    pub fn new<I, S>(field_names: I) -> HyperCubeResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Table::default();
        for name in field_names {
            let name = name.into();
            if name.trim().is_empty() {
                return Err(HyperCubeError::validation("field names must not be empty"));
            }
            if table.field_index.contains_key(&name) {
                return Err(HyperCubeError::validation(format!(
                    "duplicate field '{}'",
                    name
                )));
            }
            table.field_index.insert(name.clone(), table.fields.len());
            table.fields.push(FieldStore::new(name));
        }
        Ok(table)
    }

    /// Appends one record; values are given in field order.
    pub fn add_row<I, V>(&mut self, values: I) -> HyperCubeResult<()>
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        let values: Vec<FieldValue> = values.into_iter().map(Into::into).collect();
        if values.len() != self.fields.len() {
            return Err(HyperCubeError::validation(format!(
                "row has {} values for {} fields",
                values.len(),
                self.fields.len()
            )));
        }

        let record = values
            .into_iter()
            .zip(self.fields.iter_mut())
            .map(|(value, field)| field.intern(value))
            .collect();
        self.records.push(record);
        Ok(())
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.field_index.get(name).copied()
    }

    pub fn field(&self, index: usize) -> Option<&FieldStore> {
        self.fields.get(index)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    /// The interned id of `field` in `record`.
    pub fn value_id(&self, record: usize, field: usize) -> ValueId {
        self.records
            .get(record)
            .and_then(|r| r.get(field))
            .copied()
            .unwrap_or(VALUE_ID_EMPTY)
    }

    pub fn value(&self, record: usize, field: usize) -> &FieldValue {
        match self.fields.get(field) {
            Some(store) => store.get_value(self.value_id(record, field)),
            None => &EMPTY,
        }
    }
}
