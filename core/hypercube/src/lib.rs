//! FILENAME: core/hypercube/src/lib.rs
//! HyperCube client core.
//!
//! Describes multidimensional result sets and walks them page by page
//! against a calculation engine reached through `EngineGateway`.
//!
//! Layers:
//! - `definition`: dimensions, measures, sort criteria, grouping
//! - `properties` / `path`: the object's property tree and cube addressing
//! - `object`: committed state plus batched, atomic edits
//! - `pager`: cursor state machine, lazy page and row sequences
//! - `gateway`: the engine contract (implemented elsewhere)

pub mod cell;
pub mod config;
pub mod definition;
pub mod error;
pub mod gateway;
pub mod layout;
pub mod logging;
pub mod object;
pub mod page;
pub mod pager;
pub mod path;
pub mod properties;

#[cfg(test)]
mod testing;

pub use cell::Cell;
pub use config::PagerConfig;
pub use definition::{
    DataMode, Dimension, FieldAttrType, FieldAttributes, Grouping, HyperCubeDefinition,
    InlineDimensionDef, InlineMeasureDef, Measure, SortCriteria, SortDirection,
};
pub use error::{HyperCubeError, HyperCubeResult};
pub use gateway::{DefinitionHandle, EngineGateway, ObjectId};
pub use layout::{DimensionInfo, HyperCubeLayout, MeasureInfo};
pub use object::{EditBatch, GenericObject};
pub use page::{DataPage, EdgeFlags, GridSize, Page};
pub use pager::{CollectedRows, Direction, PageIter, Pager, RowIter};
pub use path::{CubePath, HYPERCUBE_PROPERTY};
pub use properties::{ObjectInfo, ObjectProperties, Property, PropertyTree};
