//! FILENAME: core/hypercube/src/gateway.rs
//! PURPOSE: The single capability the core consumes from a calculation engine.
//! CONTEXT: The engine owns aggregation, sorting, grouping and selection
//! state. The core only describes cubes, commits them and asks for pages.
//! Implementations decide transport, timeouts and retries; every method is a
//! blocking round trip.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::HyperCubeResult;
use crate::layout::HyperCubeLayout;
use crate::page::{DataPage, Page};
use crate::path::CubePath;
use crate::properties::ObjectProperties;

/// Engine-assigned identity of a generic object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A resolved cube location as handed out by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionHandle {
    pub object: ObjectId,
    pub path: CubePath,
    /// Moves whenever the definition stored at `path` changes.
    pub revision: u64,
    /// Dimensions plus measures of the committed definition.
    pub column_count: usize,
}

pub trait EngineGateway {
    /// Creates an empty object of the given type.
    fn create_object(&self, object_type: &str) -> HyperCubeResult<ObjectId>;

    /// Atomically replaces every property of `object`. Subsequent `evaluate`
    /// calls observe either the old or the new tree as a whole.
    fn commit(&self, object: ObjectId, properties: &ObjectProperties) -> HyperCubeResult<()>;

    /// Maps a path to a handle. Fails with `PathNotFound` when no cube is
    /// committed there.
    fn resolve_path(&self, object: ObjectId, path: &CubePath) -> HyperCubeResult<DefinitionHandle>;

    /// Returns one data page per requested window, in request order, against
    /// the engine's current selection state. All or nothing.
    fn evaluate(&self, handle: &DefinitionHandle, pages: &[Page]) -> HyperCubeResult<Vec<DataPage>>;

    /// Reports the shape of the computed cube.
    fn layout(&self, handle: &DefinitionHandle) -> HyperCubeResult<HyperCubeLayout>;
}
