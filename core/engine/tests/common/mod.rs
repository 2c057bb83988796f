//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for engine integration tests.

#![allow(dead_code)]

use engine::{date_serial, Engine, FieldValue, LibraryDimension, Table};
use hypercube::{DataPage, GenericObject, HyperCubeDefinition, SortCriteria, SortDirection};

pub const OBJECT_TYPE: &str = "mycustomtype";
pub const TOP_LEVEL: &str = "/hyperCubeDef";

/// Test harness owning an engine session.
pub struct TestHarness {
    pub engine: Engine,
}

impl TestHarness {
    /// Create a new test harness with an empty data model.
    pub fn new() -> Self {
        TestHarness {
            engine: Engine::new(),
        }
    }

    /// Create a harness loaded with the sales fixture and its library items.
    pub fn with_sales_data() -> Self {
        let harness = Self::new();
        harness
            .engine
            .load_table(SalesFixture::table())
            .expect("fixture table loads");
        harness
            .engine
            .create_measure(SalesFixture::MEASURE_ID, "Sum([Sales Amount])", "Sales")
            .expect("library measure");
        harness
            .engine
            .create_dimension(
                SalesFixture::DATE_DIMENSION_ID,
                LibraryDimension::hierarchy("Date", ["Year", "Month"]),
            )
            .expect("library dimension");
        harness
    }

    /// Create a harness over the given (year, amount) pairs.
    pub fn with_yearly_amounts(rows: &[(f64, f64)]) -> Self {
        let harness = Self::new();
        let mut table = Table::new(["Year", "Sales Amount"]).unwrap();
        for &(year, amount) in rows {
            table
                .add_row([FieldValue::from(year), FieldValue::from(amount)])
                .unwrap();
        }
        harness.engine.load_table(table).unwrap();
        harness
    }

    /// Create a harness with `rows` distinct keys, for paging tests.
    pub fn with_numbered_rows(rows: usize) -> Self {
        let harness = Self::new();
        let mut table = Table::new(["Key", "Value"]).unwrap();
        for i in 0..rows {
            table
                .add_row([FieldValue::from(i as f64), FieldValue::from((i * 10) as f64)])
                .unwrap();
        }
        harness.engine.load_table(table).unwrap();
        harness
    }

    pub fn object(&self) -> GenericObject<'_, Engine> {
        GenericObject::create(&self.engine, OBJECT_TYPE).expect("object creation")
    }

    /// An object whose top-level cube is `definition`.
    pub fn object_with(&self, definition: HyperCubeDefinition) -> GenericObject<'_, Engine> {
        let mut object = self.object();
        object
            .set_hypercube(TOP_LEVEL, definition)
            .expect("definition commits");
        object
    }

    /// Library id of the measure titled `title`.
    pub fn measure_id(&self, title: &str) -> Option<String> {
        self.engine
            .measure_list()
            .ok()?
            .into_iter()
            .find(|item| item.title == title)
            .map(|item| item.id)
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

/// Two years of monthly sales for three reps.
///
/// Sales Amount = (year - 2014) * 100 + month * 10 + rep index, which gives
/// yearly totals of 5976 (2015) and 9576 (2016).
pub struct SalesFixture;

impl SalesFixture {
    pub const MEASURE_ID: &'static str = "measure-sales";
    pub const DATE_DIMENSION_ID: &'static str = "dimension-date";
    pub const YEARS: [i32; 2] = [2015, 2016];
    pub const REPS: [&'static str; 3] = ["Amalia Craig", "Amanda Honda", "Brenda Gibson"];
    pub const MONTHS: [&'static str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];

    pub fn headers() -> Vec<&'static str> {
        vec![
            "TimeStamp",
            "Year",
            "Month",
            "YearMonth",
            "Sales Rep Name",
            "Sales Amount",
        ]
    }

    pub fn amount(year: i32, month: u32, rep: usize) -> f64 {
        ((year - 2014) * 100) as f64 + (month * 10) as f64 + rep as f64
    }

    pub fn year_total(year: i32) -> f64 {
        (1..=12u32)
            .flat_map(|month| (0..Self::REPS.len()).map(move |rep| Self::amount(year, month, rep)))
            .sum()
    }

    pub fn table() -> Table {
        let mut table = Table::new(Self::headers()).unwrap();
        for year in Self::YEARS {
            for month in 1..=12u32 {
                let name = Self::MONTHS[(month - 1) as usize];
                for (rep, rep_name) in Self::REPS.iter().enumerate() {
                    table
                        .add_row([
                            FieldValue::from(date_serial(year, month, 15)),
                            FieldValue::from(year as f64),
                            FieldValue::dual(month as f64, name),
                            FieldValue::text(format!("{}-{}", year, name)),
                            FieldValue::from(*rep_name),
                            FieldValue::from(Self::amount(year, month, rep)),
                        ])
                        .unwrap();
                }
            }
        }
        table
    }
}

// ============================================================================
// DEFINITION BUILDERS
// ============================================================================

pub fn ascending_numeric() -> SortCriteria {
    SortCriteria::numeric(SortDirection::Ascending)
}

/// Dimensions on `fields`, all sorted numerically ascending, plus one
/// `Sum([Sales Amount])` measure.
pub fn sorted_sales_cube(fields: &[&str]) -> HyperCubeDefinition {
    let mut def = HyperCubeDefinition::new();
    for field in fields {
        def.add_inline_dimension(*field).def.sort_criterias = vec![ascending_numeric()];
    }
    def.add_inline_measure("Sum([Sales Amount])");
    def
}

// ============================================================================
// ASSERTION HELPERS
// ============================================================================

/// Text of every cell, row by row.
pub fn page_texts(page: &DataPage) -> Vec<Vec<String>> {
    page.matrix
        .iter()
        .map(|row| row.iter().map(|c| c.text.clone()).collect())
        .collect()
}

pub fn column_texts(page: &DataPage, column: usize) -> Vec<String> {
    page.matrix
        .iter()
        .filter_map(|row| row.get(column).map(|c| c.text.clone()))
        .collect()
}

pub fn column_numbers(page: &DataPage, column: usize) -> Vec<f64> {
    page.matrix
        .iter()
        .filter_map(|row| row.get(column).map(|c| c.num))
        .collect()
}
