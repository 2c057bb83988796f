//! FILENAME: core/engine/src/lib.rs
//! PURPOSE: Reference calculation engine for hypercube clients.
//! CONTEXT: Implements `hypercube::EngineGateway` in process: a single loaded
//! table with interned values, selection state, a library of master
//! measures and dimensions, and cube calculation (grouping, drill-down,
//! sorting, number formatting).

pub mod calculator;
pub mod dataset;
pub mod engine;
pub mod evaluator;
pub mod library;
pub mod number_format;
pub mod selection;
pub mod value;

// Re-export commonly used types at the crate root
pub use calculator::{compile, compute, CompiledCube, ComputedCube};
pub use dataset::{FieldStore, Table, ValueId, VALUE_ID_EMPTY};
pub use engine::{Engine, EngineConfig};
pub use evaluator::{AggregateAccumulator, BoundExpr, BuiltinFunction};
pub use library::{Library, LibraryDimension, LibraryItem, LibraryMeasure};
pub use number_format::{civil_from_serial, date_serial, format_general, format_number};
pub use selection::SelectionState;
pub use value::{FieldValue, OrderedFloat};
