//! FILENAME: core/engine/src/calculator.rs
//! Cube calculation: compiles committed definitions and computes their rows.
//!
//! Compilation happens at commit time and resolves everything a definition
//! refers to (library items, expressions, field names). Computation runs
//! against the current selection state:
//! 1. Filter records by the selections
//! 2. Pick the presented field of every grouped dimension
//! 3. Group records by dimension values (load order preserved)
//! 4. Evaluate measures per group, optionally dropping all-zero rows
//! 5. Sort by the inter-column sort order, then emit cells

use std::cmp::Ordering;

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use parser::{parse, parse_field_definition, Expression};

use hypercube::{
    Cell, DataMode, DimensionInfo, FieldAttributes, GridSize, Grouping, HyperCubeDefinition,
    HyperCubeError, HyperCubeLayout, HyperCubeResult, MeasureInfo, SortCriteria, SortDirection,
};

use crate::dataset::Table;
use crate::evaluator::{bind_dimension, bind_measure, eval_group, eval_record, BoundExpr};
use crate::library::Library;
use crate::selection::SelectionState;
use crate::value::{compare_numeric, compare_text, FieldValue};

type DimKey = SmallVec<[FieldValue; 4]>;

// ============================================================================
// COMPILED DEFINITIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledLevel {
    pub expr: Expression,
    pub title: String,
    pub sort: SortCriteria,
    pub presentation: Option<FieldAttributes>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDimension {
    pub grouping: Grouping,
    pub levels: Vec<CompiledLevel>,
    pub active_field: usize,
    pub null_suppression: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledMeasure {
    pub expr: Expression,
    pub title: String,
    pub sort: SortCriteria,
    pub num_format: Option<FieldAttributes>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledCube {
    pub dimensions: Vec<CompiledDimension>,
    pub measures: Vec<CompiledMeasure>,
    pub sort_order: Vec<usize>,
    pub suppress_zero: bool,
}

impl CompiledCube {
    pub fn column_count(&self) -> usize {
        self.dimensions.len() + self.measures.len()
    }
}

fn title_of(labels: &[String], index: usize, def: &str) -> String {
    match labels.get(index) {
        Some(label) if !label.trim().is_empty() => label.clone(),
        _ => def.to_string(),
    }
}

/// Resolves a definition against the library and checks every expression
/// against the table.
pub fn compile(
    definition: &HyperCubeDefinition,
    library: &Library,
    table: &Table,
) -> HyperCubeResult<CompiledCube> {
    definition.validate()?;
    if definition.mode != DataMode::Straight {
        return Err(HyperCubeError::validation(format!(
            "data mode {:?} is not supported, only Straight",
            definition.mode
        )));
    }

    let mut dimensions = Vec::with_capacity(definition.dimensions.len());
    for (index, dimension) in definition.dimensions.iter().enumerate() {
        let inline = &dimension.def;
        let (grouping, field_defs, labels) = match &dimension.library_id {
            Some(id) => {
                let entry = library.dimension(id).ok_or_else(|| {
                    HyperCubeError::validation(format!(
                        "dimension {} refers to unknown library dimension '{}'",
                        index, id
                    ))
                })?;
                (entry.grouping, &entry.field_defs, &entry.field_labels)
            }
            None => (inline.grouping, &inline.field_defs, &inline.field_labels),
        };

        if grouping == Grouping::Collection && inline.active_field >= field_defs.len() {
            return Err(HyperCubeError::validation(format!(
                "dimension {}: active field {} out of range for {} fields",
                index,
                inline.active_field,
                field_defs.len()
            )));
        }

        let mut levels = Vec::with_capacity(field_defs.len());
        for (level, def) in field_defs.iter().enumerate() {
            let expr = parse_field_definition(def).map_err(|e| {
                HyperCubeError::validation(format!("dimension {} field '{}': {}", index, def, e))
            })?;
            bind_dimension(&expr, table)?;
            levels.push(CompiledLevel {
                expr,
                title: title_of(labels, level, def),
                sort: dimension.sort_criteria_for(level),
                presentation: inline.number_presentations.get(level).cloned(),
            });
        }

        dimensions.push(CompiledDimension {
            grouping,
            levels,
            active_field: inline.active_field,
            null_suppression: dimension.null_suppression,
        });
    }

    let mut measures = Vec::with_capacity(definition.measures.len());
    for (index, measure) in definition.measures.iter().enumerate() {
        let (source, title, num_format) = match &measure.library_id {
            Some(id) => {
                let entry = library.measure(id).ok_or_else(|| {
                    HyperCubeError::validation(format!(
                        "measure {} refers to unknown library measure '{}'",
                        index, id
                    ))
                })?;
                let title = measure
                    .def
                    .label
                    .clone()
                    .or_else(|| entry.label.clone())
                    .unwrap_or_else(|| entry.title.clone());
                let format = measure.def.num_format.clone().or_else(|| entry.num_format.clone());
                (entry.def.clone(), title, format)
            }
            None => {
                let title = measure.def.label.clone().unwrap_or_else(|| measure.def.def.clone());
                (measure.def.def.clone(), title, measure.def.num_format.clone())
            }
        };

        let expr = parse(&source).map_err(|e| {
            HyperCubeError::validation(format!("measure {} '{}': {}", index, source, e))
        })?;
        bind_measure(&expr, table)?;
        measures.push(CompiledMeasure {
            expr,
            title,
            sort: measure.sort_by.clone(),
            num_format,
        });
    }

    Ok(CompiledCube {
        dimensions,
        measures,
        sort_order: definition.effective_sort_order(),
        suppress_zero: definition.suppress_zero,
    })
}

// ============================================================================
// COMPUTATION
// ============================================================================

/// The full result of a cube under one selection state.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedCube {
    pub rows: Vec<Vec<Cell>>,
    pub layout: HyperCubeLayout,
}

struct ResultRow {
    dims: DimKey,
    /// Load-order rank of each dimension value.
    ranks: SmallVec<[usize; 4]>,
    measures: SmallVec<[FieldValue; 4]>,
    first_record: usize,
}

/// Number of distinct non-empty values of `expr` over `records`, capped at 2.
fn distinct_up_to_two(expr: &BoundExpr, table: &Table, records: &[usize]) -> usize {
    let mut first: Option<FieldValue> = None;
    for &record in records {
        let value = eval_record(expr, table, record);
        if value.is_empty() {
            continue;
        }
        match &first {
            None => first = Some(value),
            Some(seen) if *seen != value => return 2,
            Some(_) => {}
        }
    }
    usize::from(first.is_some())
}

/// The presented level of a dimension. A hierarchy drills down past every
/// level that has exactly one possible value.
fn active_level(
    dimension: &CompiledDimension,
    bound_levels: &[BoundExpr],
    table: &Table,
    records: &[usize],
) -> usize {
    match dimension.grouping {
        Grouping::None => 0,
        Grouping::Collection => dimension.active_field,
        Grouping::Hierarchy => {
            let mut level = 0;
            while level + 1 < bound_levels.len()
                && distinct_up_to_two(&bound_levels[level], table, records) == 1
            {
                level += 1;
            }
            level
        }
    }
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}

/// Applies numeric, then text, then load order criteria. `rank` is absent for
/// measure columns, which have no load order.
fn compare_by_criteria(
    criteria: &SortCriteria,
    a: &FieldValue,
    b: &FieldValue,
    rank: Option<(usize, usize)>,
) -> Ordering {
    if let Some(direction) = criteria.sort_by_numeric {
        let ordering = directed(compare_numeric(a, b), direction);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    if let Some(direction) = criteria.sort_by_text {
        let ordering = directed(compare_text(a, b), direction);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    match rank {
        Some((x, y)) => {
            let direction = criteria.sort_by_load_order.unwrap_or(SortDirection::Ascending);
            directed(x.cmp(&y), direction)
        }
        None => Ordering::Equal,
    }
}

pub fn compute(
    cube: &CompiledCube,
    table: &Table,
    selections: &SelectionState,
) -> HyperCubeResult<ComputedCube> {
    let records = selections.possible_records(table);

    // Bind every level so drill-down can inspect the ones above the active one.
    let mut presented = Vec::with_capacity(cube.dimensions.len());
    for dimension in &cube.dimensions {
        let bound = dimension
            .levels
            .iter()
            .map(|level| bind_dimension(&level.expr, table))
            .collect::<HyperCubeResult<Vec<_>>>()?;
        let level = active_level(dimension, &bound, table, &records);
        let expr = bound.into_iter().nth(level).ok_or_else(|| {
            HyperCubeError::validation(format!("dimension has no field at level {}", level))
        })?;
        presented.push((level, expr));
    }

    let measures = cube
        .measures
        .iter()
        .map(|m| bind_measure(&m.expr, table))
        .collect::<HyperCubeResult<Vec<_>>>()?;

    let mut rows = group_rows(cube, &presented, &measures, table, &records);

    if cube.suppress_zero && !measures.is_empty() {
        rows.retain(|row| {
            row.measures.iter().any(|m| {
                if m.is_numeric() {
                    m.num() != 0.0
                } else {
                    !m.is_empty()
                }
            })
        });
    }

    let dim_count = cube.dimensions.len();
    rows.sort_by(|a, b| {
        for &column in &cube.sort_order {
            let ordering = if column < dim_count {
                let (level, _) = presented[column];
                let criteria = &cube.dimensions[column].levels[level].sort;
                compare_by_criteria(
                    criteria,
                    &a.dims[column],
                    &b.dims[column],
                    Some((a.ranks[column], b.ranks[column])),
                )
            } else {
                let m = column - dim_count;
                compare_by_criteria(&cube.measures[m].sort, &a.measures[m], &b.measures[m], None)
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        a.first_record.cmp(&b.first_record)
    });

    let layout = build_layout(cube, &presented, &rows);
    let matrix = rows
        .iter()
        .map(|row| {
            let mut cells = Vec::with_capacity(cube.column_count());
            for (column, value) in row.dims.iter().enumerate() {
                let (level, _) = presented[column];
                let presentation = cube.dimensions[column].levels[level].presentation.as_ref();
                cells.push(value.to_cell(presentation));
            }
            for (m, value) in row.measures.iter().enumerate() {
                cells.push(value.to_cell(cube.measures[m].num_format.as_ref()));
            }
            cells
        })
        .collect();

    Ok(ComputedCube {
        rows: matrix,
        layout,
    })
}

fn group_rows(
    cube: &CompiledCube,
    presented: &[(usize, BoundExpr)],
    measures: &[BoundExpr],
    table: &Table,
    records: &[usize],
) -> Vec<ResultRow> {
    if presented.is_empty() {
        if measures.is_empty() {
            return Vec::new();
        }
        // Totals only: one row over every possible record.
        return vec![ResultRow {
            dims: SmallVec::new(),
            ranks: SmallVec::new(),
            measures: measures.iter().map(|m| eval_group(m, table, records)).collect(),
            first_record: 0,
        }];
    }

    let mut index: FxHashMap<DimKey, usize> = FxHashMap::default();
    let mut groups: Vec<(DimKey, SmallVec<[usize; 4]>, Vec<usize>)> = Vec::new();
    // First-appearance ranks for calculated levels.
    let mut seen: Vec<FxHashMap<FieldValue, usize>> = vec![FxHashMap::default(); presented.len()];

    'records: for &record in records {
        let mut key = DimKey::with_capacity(presented.len());
        let mut ranks = SmallVec::<[usize; 4]>::with_capacity(presented.len());
        for (column, (_, expr)) in presented.iter().enumerate() {
            let value = eval_record(expr, table, record);
            if value.is_empty() && cube.dimensions[column].null_suppression {
                continue 'records;
            }
            let rank = match expr {
                BoundExpr::Field(field) => table.value_id(record, *field) as usize,
                _ => {
                    let next = seen[column].len();
                    *seen[column].entry(value.clone()).or_insert(next)
                }
            };
            key.push(value);
            ranks.push(rank);
        }

        match index.get(&key) {
            Some(&group) => groups[group].2.push(record),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, ranks, vec![record]));
            }
        }
    }

    groups
        .into_iter()
        .map(|(dims, ranks, members)| ResultRow {
            measures: measures.iter().map(|m| eval_group(m, table, &members)).collect(),
            first_record: members.first().copied().unwrap_or(0),
            dims,
            ranks,
        })
        .collect()
}

fn build_layout(
    cube: &CompiledCube,
    presented: &[(usize, BoundExpr)],
    rows: &[ResultRow],
) -> HyperCubeLayout {
    let dimension_info = cube
        .dimensions
        .iter()
        .zip(presented)
        .enumerate()
        .map(|(column, (dimension, (level, _)))| {
            let distinct: FxHashSet<&FieldValue> = rows.iter().map(|r| &r.dims[column]).collect();
            DimensionInfo {
                fallback_title: dimension.levels[*level].title.clone(),
                group_pos: *level,
                group_fallback_titles: dimension.levels.iter().map(|l| l.title.clone()).collect(),
                cardinal: distinct.len(),
            }
        })
        .collect();

    let measure_info = cube
        .measures
        .iter()
        .enumerate()
        .map(|(m, measure)| {
            let values = rows.iter().map(|r| r.measures[m].num()).filter(|n| !n.is_nan());
            let (min, max) = values.fold((f64::NAN, f64::NAN), |(lo, hi), n| {
                (if lo.is_nan() { n } else { lo.min(n) }, if hi.is_nan() { n } else { hi.max(n) })
            });
            MeasureInfo {
                fallback_title: measure.title.clone(),
                min,
                max,
            }
        })
        .collect();

    HyperCubeLayout {
        size: GridSize::new(rows.len(), cube.column_count()),
        dimension_info,
        measure_info,
    }
}
