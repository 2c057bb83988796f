//! FILENAME: core/engine/src/engine.rs
//! PURPOSE: In-process calculation engine behind the `EngineGateway` contract.
//! CONTEXT: Owns the session: the loaded table, the library, selection state
//! and every committed object. Commits swap an object's whole property tree
//! under the write lock, so concurrent evaluations observe either the old or
//! the new tree. Computed cubes are cached per path until the definition,
//! the data, the library or the selections change.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use hypercube::{
    CubePath, DataPage, DefinitionHandle, EngineGateway, HyperCubeDefinition, HyperCubeError,
    HyperCubeLayout, HyperCubeResult, ObjectId, ObjectProperties, Page,
};
use hypercube::{log_debug, log_info, log_warn};

use crate::calculator::{compile, compute, CompiledCube, ComputedCube};
use crate::dataset::Table;
use crate::library::{Library, LibraryDimension, LibraryItem, LibraryMeasure};
use crate::selection::SelectionState;

const CATEGORY: &str = "ENGINE";

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Largest width x height a single requested page may cover.
    pub max_page_cells: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_page_cells: 10_000,
        }
    }
}

// ============================================================================
// SESSION STATE
// ============================================================================

#[derive(Debug)]
struct CommittedCube {
    definition: HyperCubeDefinition,
    revision: u64,
    compiled: Arc<CompiledCube>,
}

#[derive(Debug)]
struct ObjectRecord {
    properties: ObjectProperties,
    cubes: FxHashMap<CubePath, CommittedCube>,
}

#[derive(Debug, Default)]
struct EngineState {
    table: Table,
    library: Library,
    selections: SelectionState,
    /// Bumped whenever the table, the library or the selections change.
    generation: u64,
    objects: BTreeMap<ObjectId, ObjectRecord>,
    next_object: u64,
    next_revision: u64,
}

impl EngineState {
    fn cube(&self, object: ObjectId, path: &CubePath) -> HyperCubeResult<&CommittedCube> {
        self.objects
            .get(&object)
            .and_then(|record| record.cubes.get(path))
            .ok_or_else(|| HyperCubeError::path_not_found(format!("{}{}", object, path)))
    }
}

type ResultCache = FxHashMap<(ObjectId, CubePath), CachedResult>;

struct CachedResult {
    revision: u64,
    generation: u64,
    result: Arc<ComputedCube>,
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct Engine {
    state: RwLock<EngineState>,
    results: Mutex<ResultCache>,
    connected: AtomicBool,
    config: EngineConfig,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Engine::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Engine {
            state: RwLock::new(EngineState::default()),
            results: Mutex::new(FxHashMap::default()),
            connected: AtomicBool::new(true),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Simulates losing the session; every later call fails until
    /// `reconnect`.
    pub fn disconnect(&self) {
        log_warn!(CATEGORY, "engine disconnected");
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn reconnect(&self) {
        log_info!(CATEGORY, "engine reconnected");
        self.connected.store(true, Ordering::SeqCst);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn check_connected(&self) -> HyperCubeResult<()> {
        if !self.is_connected() {
            return Err(HyperCubeError::EngineUnavailable(
                "engine session is disconnected".to_string(),
            ));
        }
        Ok(())
    }

    fn read(&self) -> HyperCubeResult<RwLockReadGuard<'_, EngineState>> {
        self.check_connected()?;
        self.state
            .read()
            .map_err(|_| HyperCubeError::EngineUnavailable("engine state is poisoned".to_string()))
    }

    fn write(&self) -> HyperCubeResult<RwLockWriteGuard<'_, EngineState>> {
        self.check_connected()?;
        self.state
            .write()
            .map_err(|_| HyperCubeError::EngineUnavailable("engine state is poisoned".to_string()))
    }

    // ------------------------------------------------------------------------
    // Data and library
    // ------------------------------------------------------------------------

    /// Replaces the data model. Selections refer to value ids of the old
    /// table, so they are cleared.
    pub fn load_table(&self, table: Table) -> HyperCubeResult<()> {
        let mut state = self.write()?;
        log_info!(
            CATEGORY,
            "loaded table with {} fields and {} rows",
            table.field_count(),
            table.row_count()
        );
        state.table = table;
        state.selections.clear_all();
        state.generation += 1;
        Ok(())
    }

    /// Adds a library measure. The expression is checked against the
    /// current table.
    pub fn create_measure(&self, id: &str, def: &str, title: &str) -> HyperCubeResult<()> {
        self.create_library_measure(
            id,
            LibraryMeasure {
                title: title.to_string(),
                def: def.to_string(),
                label: None,
                num_format: None,
            },
        )
    }

    pub fn create_library_measure(&self, id: &str, measure: LibraryMeasure) -> HyperCubeResult<()> {
        let mut state = self.write()?;
        let mut probe = HyperCubeDefinition::new();
        probe.add_inline_measure(measure.def.clone());
        compile(&probe, &state.library, &state.table)?;

        state.library.insert_measure(id, measure)?;
        state.generation += 1;
        log_info!(CATEGORY, "library measure '{}' created", id);
        Ok(())
    }

    pub fn create_dimension(&self, id: &str, dimension: LibraryDimension) -> HyperCubeResult<()> {
        let mut state = self.write()?;
        let mut probe = HyperCubeDefinition::new();
        for def in &dimension.field_defs {
            probe.add_inline_dimension(def.clone());
        }
        compile(&probe, &state.library, &state.table)?;

        state.library.insert_dimension(id, dimension)?;
        state.generation += 1;
        log_info!(CATEGORY, "library dimension '{}' created", id);
        Ok(())
    }

    pub fn measure_list(&self) -> HyperCubeResult<Vec<LibraryItem>> {
        Ok(self.read()?.library.measure_list())
    }

    pub fn dimension_list(&self) -> HyperCubeResult<Vec<LibraryItem>> {
        Ok(self.read()?.library.dimension_list())
    }

    // ------------------------------------------------------------------------
    // Selections
    // ------------------------------------------------------------------------

    /// Selects the values of `field` whose text (or number) matches one of
    /// `values`, replacing any earlier selection in that field. Returns false
    /// and leaves the state untouched when nothing matches.
    pub fn select(&self, field: &str, values: &[&str]) -> HyperCubeResult<bool> {
        let mut state = self.write()?;
        let index = state
            .table
            .field_index(field)
            .ok_or_else(|| HyperCubeError::validation(format!("unknown field '{}'", field)))?;
        let ids: Vec<_> = match state.table.field(index) {
            Some(store) => values.iter().flat_map(|v| store.find_by_text(v)).collect(),
            None => Vec::new(),
        };
        if ids.is_empty() {
            log_debug!(CATEGORY, "select {} {:?}: no match", field, values);
            return Ok(false);
        }

        state.selections.select(index, ids);
        state.generation += 1;
        log_debug!(CATEGORY, "selected {:?} in {}", values, field);
        Ok(true)
    }

    pub fn clear_field(&self, field: &str) -> HyperCubeResult<()> {
        let mut state = self.write()?;
        let index = state
            .table
            .field_index(field)
            .ok_or_else(|| HyperCubeError::validation(format!("unknown field '{}'", field)))?;
        if state.selections.clear_field(index) {
            state.generation += 1;
        }
        log_debug!(CATEGORY, "cleared selection in {}", field);
        Ok(())
    }

    pub fn clear_all(&self) -> HyperCubeResult<()> {
        let mut state = self.write()?;
        state.selections.clear_all();
        state.generation += 1;
        log_debug!(CATEGORY, "cleared all selections");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------------

    /// The computed cube behind `handle`, from cache when still current.
    fn computed(&self, state: &EngineState, handle: &DefinitionHandle) -> HyperCubeResult<Arc<ComputedCube>> {
        let cube = state.cube(handle.object, &handle.path)?;
        let key = (handle.object, handle.path.clone());

        if let Some(cached) = self.lock_results()?.get(&key) {
            if cached.revision == cube.revision && cached.generation == state.generation {
                return Ok(Arc::clone(&cached.result));
            }
        }

        // Computed without the cache lock so other cubes stay available.
        let result = Arc::new(compute(&cube.compiled, &state.table, &state.selections)?);
        log_debug!(
            CATEGORY,
            "computed {}{}: {} rows",
            handle.object,
            handle.path,
            result.rows.len()
        );
        self.lock_results()?.insert(
            key,
            CachedResult {
                revision: cube.revision,
                generation: state.generation,
                result: Arc::clone(&result),
            },
        );
        Ok(result)
    }

    fn lock_results(&self) -> HyperCubeResult<MutexGuard<'_, ResultCache>> {
        self.results
            .lock()
            .map_err(|_| HyperCubeError::EngineUnavailable("result cache is poisoned".to_string()))
    }

    fn check_page_shape(&self, page: &Page) -> HyperCubeResult<()> {
        page.validate()?;
        if page.cell_count() > self.config.max_page_cells {
            return Err(HyperCubeError::validation(format!(
                "page {}x{} exceeds the {} cell limit",
                page.width, page.height, self.config.max_page_cells
            )));
        }
        Ok(())
    }
}

fn slice_page(result: &ComputedCube, page: &Page) -> HyperCubeResult<DataPage> {
    let grid = result.layout.size;
    if page.top > grid.rows || page.left > grid.columns {
        return Err(HyperCubeError::OutOfRange(format!(
            "page at row {} column {} lies outside a {}x{} cube",
            page.top, page.left, grid.rows, grid.columns
        )));
    }

    let bottom = page.bottom().min(grid.rows);
    let right = page.right().min(grid.columns);
    let matrix = result.rows[page.top..bottom]
        .iter()
        .map(|row| row[page.left..right].to_vec())
        .collect();
    Ok(DataPage::new(*page, matrix, grid.edges_of(page)))
}

impl EngineGateway for Engine {
    fn create_object(&self, object_type: &str) -> HyperCubeResult<ObjectId> {
        let mut state = self.write()?;
        state.next_object += 1;
        let id = ObjectId(state.next_object);
        state.objects.insert(
            id,
            ObjectRecord {
                properties: ObjectProperties::new(object_type),
                cubes: FxHashMap::default(),
            },
        );
        log_debug!(CATEGORY, "created object {} of type {}", id, object_type);
        Ok(id)
    }

    fn commit(&self, object: ObjectId, properties: &ObjectProperties) -> HyperCubeResult<()> {
        let mut state = self.write()?;
        properties.validate()?;

        let old = state
            .objects
            .get(&object)
            .ok_or_else(|| HyperCubeError::path_not_found(format!("object {}", object)))?;

        // Compile everything before touching the session.
        let mut compiled = Vec::new();
        for path in properties.cube_paths() {
            let definition = properties.hypercube(&path)?;
            let cube = compile(definition, &state.library, &state.table).map_err(|e| match e {
                HyperCubeError::Validation(message) => {
                    HyperCubeError::Validation(format!("{}: {}", path, message))
                }
                other => other,
            })?;
            let kept = old
                .cubes
                .get(&path)
                .filter(|c| c.definition == *definition)
                .map(|c| c.revision);
            compiled.push((path, definition.clone(), cube, kept));
        }

        let mut cubes = FxHashMap::default();
        let mut changed = 0;
        for (path, definition, cube, kept) in compiled {
            let revision = match kept {
                Some(revision) => revision,
                None => {
                    changed += 1;
                    state.next_revision += 1;
                    state.next_revision
                }
            };
            cubes.insert(
                path,
                CommittedCube {
                    definition,
                    revision,
                    compiled: Arc::new(cube),
                },
            );
        }

        let count = cubes.len();
        state.objects.insert(
            object,
            ObjectRecord {
                properties: properties.clone(),
                cubes,
            },
        );
        log_info!(
            CATEGORY,
            "commit {}: {} cube(s), {} changed",
            object,
            count,
            changed
        );
        Ok(())
    }

    fn resolve_path(&self, object: ObjectId, path: &CubePath) -> HyperCubeResult<DefinitionHandle> {
        let state = self.read()?;
        let cube = state.cube(object, path)?;
        Ok(DefinitionHandle {
            object,
            path: path.clone(),
            revision: cube.revision,
            column_count: cube.compiled.column_count(),
        })
    }

    fn evaluate(&self, handle: &DefinitionHandle, pages: &[Page]) -> HyperCubeResult<Vec<DataPage>> {
        for page in pages {
            self.check_page_shape(page)?;
        }

        let state = self.read()?;
        let result = self.computed(&state, handle)?;
        let data = pages
            .iter()
            .map(|page| slice_page(&result, page))
            .collect::<HyperCubeResult<Vec<_>>>()?;
        log_debug!(
            CATEGORY,
            "evaluate {}{}: {} page(s)",
            handle.object,
            handle.path,
            data.len()
        );
        Ok(data)
    }

    fn layout(&self, handle: &DefinitionHandle) -> HyperCubeResult<HyperCubeLayout> {
        let state = self.read()?;
        Ok(self.computed(&state, handle)?.layout.clone())
    }
}

impl Engine {
    /// The property tree last committed for `object`.
    pub fn committed_properties(&self, object: ObjectId) -> HyperCubeResult<ObjectProperties> {
        let state = self.read()?;
        state
            .objects
            .get(&object)
            .map(|record| record.properties.clone())
            .ok_or_else(|| HyperCubeError::path_not_found(format!("object {}", object)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldValue;
    use hypercube::GridSize;

    fn engine() -> Engine {
        let mut table = Table::new(["Year", "Amount"]).unwrap();
        for (year, amount) in [(2015.0, 40.0), (2016.0, 60.0), (2015.0, 60.0)] {
            table
                .add_row([FieldValue::from(year), FieldValue::from(amount)])
                .unwrap();
        }
        let engine = Engine::new();
        engine.load_table(table).unwrap();
        engine
    }

    fn year_cube() -> HyperCubeDefinition {
        let mut def = HyperCubeDefinition::new();
        def.add_inline_dimension("Year");
        def.add_inline_measure("Sum(Amount)");
        def
    }

    fn commit_cube(engine: &Engine, def: HyperCubeDefinition) -> DefinitionHandle {
        let id = engine.create_object("table").unwrap();
        let mut props = ObjectProperties::new("table");
        props.set_hypercube(&CubePath::top_level(), def).unwrap();
        engine.commit(id, &props).unwrap();
        engine.resolve_path(id, &CubePath::top_level()).unwrap()
    }

    #[test]
    fn test_config_from_json() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());

        let config: EngineConfig = serde_json::from_str(r#"{"max_page_cells": 4}"#).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(serde_json::from_str::<EngineConfig>(&json).unwrap(), config);

        let engine = Engine::with_config(config);
        let mut table = Table::new(["Year", "Amount"]).unwrap();
        table.add_row([FieldValue::from(2015.0), FieldValue::from(1.0)]).unwrap();
        engine.load_table(table).unwrap();
        let handle = commit_cube(&engine, year_cube());
        assert!(engine.evaluate(&handle, &[Page::new(0, 0, 2, 2)]).is_ok());
        assert!(matches!(
            engine.evaluate(&handle, &[Page::new(0, 0, 2, 3)]),
            Err(HyperCubeError::Validation(_))
        ));
    }

    #[test]
    fn test_evaluate_clips_at_edges() {
        let engine = engine();
        let handle = commit_cube(&engine, year_cube());
        let pages = engine
            .evaluate(&handle, &[Page::new(1, 0, 5, 5), Page::new(0, 1, 1, 1)])
            .unwrap();
        assert_eq!(pages[0].row_count(), 1);
        assert_eq!(pages[0].column_count(), 2);
        assert!(pages[0].outside_edge.rows);
        assert_eq!(pages[1].matrix, vec![vec![hypercube::Cell::new(100.0, "100")]]);
        assert!(!pages[1].outside_edge.rows);
    }

    #[test]
    fn test_page_errors() {
        let engine = engine();
        let handle = commit_cube(&engine, year_cube());
        assert!(matches!(
            engine.evaluate(&handle, &[Page::new(3, 0, 2, 2)]),
            Err(HyperCubeError::OutOfRange(_))
        ));
        assert!(matches!(
            engine.evaluate(&handle, &[Page::new(0, 0, 0, 2)]),
            Err(HyperCubeError::Validation(_))
        ));
        assert!(matches!(
            engine.evaluate(&handle, &[Page::new(0, 0, 2, 10_000)]),
            Err(HyperCubeError::Validation(_))
        ));
    }

    #[test]
    fn test_revision_moves_only_on_change() {
        let engine = engine();
        let id = engine.create_object("table").unwrap();
        let path = CubePath::top_level();
        let mut props = ObjectProperties::new("table");
        props.set_hypercube(&path, year_cube()).unwrap();

        engine.commit(id, &props).unwrap();
        let first = engine.resolve_path(id, &path).unwrap().revision;
        engine.commit(id, &props).unwrap();
        assert_eq!(engine.resolve_path(id, &path).unwrap().revision, first);

        props.hypercube_mut(&path).unwrap().suppress_zero = true;
        engine.commit(id, &props).unwrap();
        assert!(engine.resolve_path(id, &path).unwrap().revision > first);
    }

    #[test]
    fn test_failed_commit_keeps_previous_tree() {
        let engine = engine();
        let handle = commit_cube(&engine, year_cube());

        let mut bad = ObjectProperties::new("table");
        let mut def = year_cube();
        def.add_inline_measure("Sum(Nope)");
        bad.set_hypercube(&CubePath::top_level(), def).unwrap();
        let err = engine.commit(handle.object, &bad).unwrap_err();
        assert!(matches!(err, HyperCubeError::Validation(ref m) if m.contains("/hyperCubeDef")));

        let props = engine.committed_properties(handle.object).unwrap();
        assert_eq!(props.hypercube(&CubePath::top_level()).unwrap(), &year_cube());
    }

    #[test]
    fn test_selection_invalidates_cached_result() {
        let engine = engine();
        let handle = commit_cube(&engine, year_cube());
        assert_eq!(engine.layout(&handle).unwrap().size, GridSize::new(2, 2));

        assert!(engine.select("Year", &["2016"]).unwrap());
        assert_eq!(engine.layout(&handle).unwrap().size, GridSize::new(1, 2));
        assert!(!engine.select("Year", &["1999"]).unwrap());
        assert_eq!(engine.layout(&handle).unwrap().size, GridSize::new(1, 2));

        engine.clear_field("Year").unwrap();
        assert_eq!(engine.layout(&handle).unwrap().size, GridSize::new(2, 2));
        assert!(engine.select("Region", &["x"]).is_err());
    }

    #[test]
    fn test_disconnect() {
        let engine = engine();
        let handle = commit_cube(&engine, year_cube());
        engine.disconnect();
        assert!(matches!(
            engine.evaluate(&handle, &[Page::new(0, 0, 2, 2)]),
            Err(HyperCubeError::EngineUnavailable(_))
        ));
        assert!(engine.create_object("x").is_err());
        engine.reconnect();
        assert!(engine.evaluate(&handle, &[Page::new(0, 0, 2, 2)]).is_ok());
    }

    #[test]
    fn test_unknown_object_and_path() {
        let engine = engine();
        assert!(matches!(
            engine.commit(ObjectId(99), &ObjectProperties::new("x")),
            Err(HyperCubeError::PathNotFound(_))
        ));
        let id = engine.create_object("x").unwrap();
        assert!(matches!(
            engine.resolve_path(id, &CubePath::top_level()),
            Err(HyperCubeError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_library_measure_checked_on_create() {
        let engine = engine();
        engine.create_measure("m1", "Sum(Amount)", "Sales").unwrap();
        assert!(engine.create_measure("m2", "Sum(Missing)", "Bad").is_err());
        let list = engine.measure_list().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].title, "Sales");
    }
}
