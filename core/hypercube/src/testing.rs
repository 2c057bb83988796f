//! FILENAME: core/hypercube/src/testing.rs
//! In-memory gateway for unit tests: a synthetic grid whose cell at (r, c)
//! holds the number r*100+c and the text "r{r}c{c}".

use std::cell::{Cell as Counter, RefCell};
use std::collections::HashMap;

use crate::cell::Cell;
use crate::error::{HyperCubeError, HyperCubeResult};
use crate::gateway::{DefinitionHandle, EngineGateway, ObjectId};
use crate::layout::{DimensionInfo, HyperCubeLayout, MeasureInfo};
use crate::page::{DataPage, GridSize, Page};
use crate::path::CubePath;
use crate::properties::ObjectProperties;

#[derive(Default)]
pub struct GridGateway {
    rows: Counter<usize>,
    round_trips: Counter<usize>,
    next_id: Counter<u64>,
    next_revision: Counter<u64>,
    objects: RefCell<HashMap<ObjectId, ObjectProperties>>,
    revisions: RefCell<HashMap<(ObjectId, CubePath), u64>>,
    fail: Counter<bool>,
}

impl GridGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row count of every cube served from now on.
    pub fn set_rows(&self, rows: usize) {
        self.rows.set(rows);
    }

    /// Number of `evaluate` calls so far.
    pub fn round_trips(&self) -> usize {
        self.round_trips.get()
    }

    /// Makes every later call fail with `EngineUnavailable`.
    pub fn set_failing(&self, fail: bool) {
        self.fail.set(fail);
    }

    fn check_up(&self) -> HyperCubeResult<()> {
        if self.fail.get() {
            return Err(HyperCubeError::EngineUnavailable("grid gateway is down".to_string()));
        }
        Ok(())
    }
}

impl EngineGateway for GridGateway {
    fn create_object(&self, object_type: &str) -> HyperCubeResult<ObjectId> {
        self.check_up()?;
        let id = ObjectId(self.next_id.get() + 1);
        self.next_id.set(id.0);
        self.objects
            .borrow_mut()
            .insert(id, ObjectProperties::new(object_type));
        Ok(id)
    }

    fn commit(&self, object: ObjectId, properties: &ObjectProperties) -> HyperCubeResult<()> {
        self.check_up()?;
        let mut objects = self.objects.borrow_mut();
        let old = objects
            .get(&object)
            .ok_or_else(|| HyperCubeError::path_not_found(object.to_string()))?;
        let mut revisions = self.revisions.borrow_mut();
        for path in properties.cube_paths() {
            let new_def = properties.hypercube(&path)?;
            let unchanged = old.hypercube(&path).map(|d| d == new_def).unwrap_or(false);
            if !unchanged {
                let revision = self.next_revision.get() + 1;
                self.next_revision.set(revision);
                revisions.insert((object, path), revision);
            }
        }
        objects.insert(object, properties.clone());
        Ok(())
    }

    fn resolve_path(&self, object: ObjectId, path: &CubePath) -> HyperCubeResult<DefinitionHandle> {
        self.check_up()?;
        let objects = self.objects.borrow();
        let def = objects
            .get(&object)
            .ok_or_else(|| HyperCubeError::path_not_found(path.to_string()))?
            .hypercube(path)?;
        let revision = self
            .revisions
            .borrow()
            .get(&(object, path.clone()))
            .copied()
            .unwrap_or(0);
        Ok(DefinitionHandle {
            object,
            path: path.clone(),
            revision,
            column_count: def.column_count(),
        })
    }

    fn evaluate(&self, handle: &DefinitionHandle, pages: &[Page]) -> HyperCubeResult<Vec<DataPage>> {
        self.check_up()?;
        self.round_trips.set(self.round_trips.get() + 1);
        let grid = GridSize::new(self.rows.get(), handle.column_count);
        let mut result = Vec::with_capacity(pages.len());
        for page in pages {
            if page.top > grid.rows || page.left > grid.columns {
                return Err(HyperCubeError::OutOfRange(format!("{:?}", page)));
            }
            let bottom = page.bottom().min(grid.rows);
            let right = page.right().min(grid.columns);
            let matrix = (page.top..bottom)
                .map(|r| {
                    (page.left..right)
                        .map(|c| Cell::new((r * 100 + c) as f64, format!("r{}c{}", r, c)))
                        .collect()
                })
                .collect();
            result.push(DataPage::new(*page, matrix, grid.edges_of(page)));
        }
        Ok(result)
    }

    fn layout(&self, handle: &DefinitionHandle) -> HyperCubeResult<HyperCubeLayout> {
        self.check_up()?;
        let objects = self.objects.borrow();
        let def = objects
            .get(&handle.object)
            .ok_or_else(|| HyperCubeError::path_not_found(handle.path.to_string()))?
            .hypercube(&handle.path)?;
        Ok(HyperCubeLayout {
            size: GridSize::new(self.rows.get(), def.column_count()),
            dimension_info: def
                .dimensions
                .iter()
                .map(|d| DimensionInfo {
                    fallback_title: d.def.field_defs.first().cloned().unwrap_or_default(),
                    group_pos: 0,
                    group_fallback_titles: d.def.field_defs.clone(),
                    cardinal: self.rows.get(),
                })
                .collect(),
            measure_info: def
                .measures
                .iter()
                .map(|m| MeasureInfo {
                    fallback_title: m.def.def.clone(),
                    min: f64::NAN,
                    max: f64::NAN,
                })
                .collect(),
        })
    }
}
