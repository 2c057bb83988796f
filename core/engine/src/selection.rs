//! FILENAME: core/engine/src/selection.rs
//! Session selection state: per field, the set of selected value ids.
//! A record is possible when, for every field with a selection, its value is
//! among the selected ones.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::dataset::{Table, ValueId};

#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    selected: FxHashMap<usize, FxHashSet<ValueId>>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the selection in `field`. An empty set clears it.
    pub fn select(&mut self, field: usize, values: impl IntoIterator<Item = ValueId>) {
        let values: FxHashSet<ValueId> = values.into_iter().collect();
        if values.is_empty() {
            self.selected.remove(&field);
        } else {
            self.selected.insert(field, values);
        }
    }

    pub fn clear_field(&mut self, field: usize) -> bool {
        self.selected.remove(&field).is_some()
    }

    pub fn clear_all(&mut self) {
        self.selected.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected ids of `field`, if the field carries a selection.
    pub fn selected(&self, field: usize) -> Option<&FxHashSet<ValueId>> {
        self.selected.get(&field)
    }

    pub fn accepts(&self, table: &Table, record: usize) -> bool {
        self.selected
            .iter()
            .all(|(&field, ids)| ids.contains(&table.value_id(record, field)))
    }

    /// Indices of all possible records, in load order.
    pub fn possible_records(&self, table: &Table) -> Vec<usize> {
        (0..table.row_count())
            .filter(|&record| self.accepts(table, record))
            .collect()
    }
}
