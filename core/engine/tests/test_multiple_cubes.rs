//! FILENAME: tests/test_multiple_cubes.rs
//! Objects carrying several cubes at nested paths.

mod common;

use common::{column_numbers, column_texts, sorted_sales_cube, TestHarness};
use engine::Engine;
use hypercube::{
    CubePath, Direction, EngineGateway, GenericObject, HyperCubeDefinition, HyperCubeError, Page,
};

const MONTH_PATH: &str = "/container0/hyperCubeDef";
const YEAR_PATH: &str = "/container1/hyperCubeDef";

fn two_cube_object(harness: &TestHarness) -> GenericObject<'_, Engine> {
    let mut object = harness.object();
    object
        .with_suspended_layout(|props| {
            props.set_hypercube(&CubePath::parse(MONTH_PATH)?, sorted_sales_cube(&["Month"]))?;
            props.set_hypercube(&CubePath::parse(YEAR_PATH)?, sorted_sales_cube(&["Year"]))
        })
        .unwrap();
    object
}

#[test]
fn test_all_pagers_cover_every_cube() {
    let harness = TestHarness::with_sales_data();
    let object = two_cube_object(&harness);

    let pagers = object.get_all_pagers().unwrap();
    let paths: Vec<String> = pagers.iter().map(|p| p.path().to_string()).collect();
    assert_eq!(paths, vec![MONTH_PATH, YEAR_PATH]);

    let mut pager = pagers
        .into_iter()
        .find(|p| p.path().contains("container0"))
        .expect("month pager");
    pager.set_current_pages(vec![Page::new(0, 0, 2, 5)]).unwrap();
    let last = pager.get_last_page().unwrap();
    assert_eq!(pager.current_pages()[0].top, 7);
    assert_eq!(column_texts(&last[0], 0), vec!["Aug", "Sep", "Oct", "Nov", "Dec"]);
}

#[test]
fn test_cubes_evaluate_independently() {
    let harness = TestHarness::with_sales_data();
    let object = two_cube_object(&harness);

    let months = object.get_pager(MONTH_PATH).unwrap();
    let years = object.get_pager(YEAR_PATH).unwrap();
    assert_eq!(months.layout().unwrap().row_count(), 12);
    assert_eq!(years.layout().unwrap().row_count(), 2);

    let page = &years.get_data(&[Page::new(0, 0, 2, 5)]).unwrap()[0];
    assert_eq!(column_numbers(page, 1), vec![5976.0, 9576.0]);

    // One selection state drives every cube of the session.
    harness.engine.select("Month", &["Jan"]).unwrap();
    assert_eq!(months.layout().unwrap().row_count(), 1);
    let page = &years.get_data(&[Page::new(0, 0, 2, 5)]).unwrap()[0];
    assert_eq!(column_numbers(page, 1), vec![333.0, 633.0]);
}

#[test]
fn test_same_key_in_sibling_containers() {
    let harness = TestHarness::with_sales_data();
    let mut object = harness.object();
    let mut batch = object.begin_edit();
    batch
        .set_hypercube("/containerA/cube", sorted_sales_cube(&["Year"]))
        .unwrap();
    batch
        .set_hypercube("/containerB/cube", sorted_sales_cube(&["Sales Rep Name"]))
        .unwrap();
    batch.apply().unwrap();

    let a = object.get_pager("/containerA/cube").unwrap();
    let b = object.get_pager("/containerB/cube").unwrap();
    assert_eq!(a.layout().unwrap().dimension_info[0].fallback_title, "Year");
    assert_eq!(b.layout().unwrap().dimension_info[0].fallback_title, "Sales Rep Name");
    assert!(matches!(
        object.get_pager("/containerC/cube"),
        Err(HyperCubeError::PathNotFound(_))
    ));
}

#[test]
fn test_editing_one_cube_keeps_sibling_revision() {
    let harness = TestHarness::with_sales_data();
    let mut object = two_cube_object(&harness);
    let month_path = CubePath::parse(MONTH_PATH).unwrap();
    let year_path = CubePath::parse(YEAR_PATH).unwrap();

    let month_before = harness.engine.resolve_path(object.id(), &month_path).unwrap();
    let year_before = harness.engine.resolve_path(object.id(), &year_path).unwrap();

    let mut pager = object.get_pager(MONTH_PATH).unwrap();
    let mut walk = pager.iterate_pages(vec![Page::new(0, 0, 2, 5)], Direction::Next);
    assert!(walk.next().unwrap().is_ok());

    let mut def = object.hypercube(YEAR_PATH).unwrap();
    def.add_inline_measure("Count([Sales Rep Name])");
    object.set_hypercube(YEAR_PATH, def).unwrap();

    let month_after = harness.engine.resolve_path(object.id(), &month_path).unwrap();
    let year_after = harness.engine.resolve_path(object.id(), &year_path).unwrap();
    assert_eq!(month_after.revision, month_before.revision);
    assert_ne!(year_after.revision, year_before.revision);
    assert_eq!(year_after.column_count, 3);

    // The walk over the untouched cube carries on.
    let rest: Vec<_> = walk.collect::<Result<_, _>>().unwrap();
    assert_eq!(rest.len(), 2);
}

#[test]
fn test_batch_with_one_bad_cube_commits_nothing() {
    let harness = TestHarness::with_sales_data();
    let mut object = two_cube_object(&harness);

    let mut bad = HyperCubeDefinition::new();
    bad.add_inline_dimension("Quarter");
    let mut batch = object.begin_edit();
    batch.set_hypercube(MONTH_PATH, sorted_sales_cube(&["YearMonth"])).unwrap();
    batch.set_hypercube(YEAR_PATH, bad).unwrap();
    assert!(matches!(batch.apply(), Err(HyperCubeError::Validation(_))));

    assert_eq!(
        object.hypercube(MONTH_PATH).unwrap(),
        sorted_sales_cube(&["Month"])
    );
    let committed = harness.engine.committed_properties(object.id()).unwrap();
    assert_eq!(&committed, object.properties());
    assert_eq!(
        object.get_pager(MONTH_PATH).unwrap().layout().unwrap().row_count(),
        12
    );
}
