//! FILENAME: core/engine/demos/hypercube_usage.rs
//! Walk-through of cube definitions, formatting, sorting, selections,
//! grouping, paging and multi-cube objects against an in-process engine.
//!
//! Run with: cargo run -p engine --example hypercube_usage

use std::error::Error;

use engine::{date_serial, Engine, FieldValue, LibraryDimension, Table};
use hypercube::{
    Cell, CubePath, Direction, FieldAttributes, GenericObject, Grouping, HyperCubeDefinition,
    HyperCubeResult, Page, Pager, SortCriteria, SortDirection,
};
use log::LevelFilter;

const TOP_LEVEL: &str = "/hyperCubeDef";
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const REPS: [&str; 3] = ["Amalia Craig", "Amanda Honda", "Brenda Gibson"];

fn main() -> Result<(), Box<dyn Error>> {
    hypercube::logging::init(LevelFilter::Warn)?;

    let engine = prepare_engine()?;
    let mut object = GenericObject::create(&engine, "mycustomtype")?;

    basic_usage(&engine, &mut object)?;
    formatting(&mut object)?;
    sorting(&mut object)?;
    selections(&engine, &mut object)?;
    grouped_dimensions(&engine, &mut object)?;
    paging(&engine)?;
    multiple_cubes(&engine)?;
    Ok(())
}

fn prepare_engine() -> HyperCubeResult<Engine> {
    let mut table = Table::new([
        "TimeStamp",
        "Year",
        "Month",
        "YearMonth",
        "Sales Rep Name",
        "Sales Amount",
    ])?;
    for year in [2015, 2016] {
        for (m, name) in MONTHS.iter().enumerate() {
            let month = m as u32 + 1;
            for (r, rep) in REPS.iter().enumerate() {
                let amount = ((year - 2014) * 100) as f64 + (month * 10) as f64 + r as f64;
                table.add_row([
                    FieldValue::from(date_serial(year, month, 15)),
                    FieldValue::from(year as f64),
                    FieldValue::dual(month as f64, *name),
                    FieldValue::text(format!("{}-{}", year, name)),
                    FieldValue::from(*rep),
                    FieldValue::from(amount),
                ])?;
            }
        }
    }

    let engine = Engine::new();
    engine.load_table(table)?;
    engine.create_measure("measure-sales", "Sum([Sales Amount])", "Sales")?;
    engine.create_dimension(
        "dimension-date",
        LibraryDimension::hierarchy("Date", ["Year", "Month"]),
    )?;
    Ok(engine)
}

// ============================================================================
// OUTPUT HELPERS
// ============================================================================

fn all_rows(pager: &mut Pager<'_, Engine>) -> HyperCubeResult<Vec<Vec<Cell>>> {
    Ok(pager.collect_all_rows()?.rows)
}

fn print_cube(header: &str, object: &GenericObject<'_, Engine>) -> HyperCubeResult<()> {
    println!("*** {}", header);
    let mut pager = object.get_pager(TOP_LEVEL)?;
    for row in all_rows(&mut pager)? {
        let texts: Vec<&str> = row.iter().map(|cell| cell.text.as_str()).collect();
        println!("{}", texts.join(" | "));
    }
    Ok(())
}

fn print_page(header: &str, rows: &[Vec<Cell>]) {
    println!("*** {}", header);
    for row in rows {
        println!("YearMonth: {}, Sales: {}", row[0].text, row[1].text);
    }
}

// ============================================================================
// EXAMPLES
// ============================================================================

fn basic_usage(engine: &Engine, object: &mut GenericObject<'_, Engine>) -> Result<(), Box<dyn Error>> {
    let mut def = HyperCubeDefinition::new();
    def.add_inline_dimension("Year");
    def.add_inline_measure("Sum([Sales Amount])");
    object.set_hypercube(TOP_LEVEL, def.clone())?;
    print_cube("Sales per year", object)?;

    def.add_inline_dimension("Month");
    object.set_hypercube(TOP_LEVEL, def)?;
    print_cube("Sales per year and month", object)?;

    let sales = engine
        .measure_list()?
        .into_iter()
        .find(|item| item.title == "Sales")
        .ok_or("library measure 'Sales' is missing")?;
    let mut def = HyperCubeDefinition::new();
    def.add_inline_dimension("Year");
    def.add_inline_dimension("Month");
    def.add_library_measure(sales.id);
    object.set_hypercube(TOP_LEVEL, def)?;
    print_cube("Sales per year and month using library measure for sales", object)?;

    let mut def = HyperCubeDefinition::new();
    def.add_inline_dimension("=Year(TimeStamp)&'-'&Month(TimeStamp)");
    def.add_inline_dimension("YearMonth");
    def.add_inline_measure("Sum([Sales Amount])");
    object.set_hypercube(TOP_LEVEL, def)?;
    print_cube("Sales per year and month (calculated dimension)", object)?;
    Ok(())
}

fn formatting(object: &mut GenericObject<'_, Engine>) -> HyperCubeResult<()> {
    let mut def = HyperCubeDefinition::new();
    def.add_inline_dimension("Year");
    def.add_inline_dimension("Month");
    def.add_inline_measure("Sum([Sales Amount])").def.num_format =
        Some(FieldAttributes::money(2, ".", ","));
    object.set_hypercube(TOP_LEVEL, def)?;
    print_cube("Use USD as currency", object)
}

fn sorting(object: &mut GenericObject<'_, Engine>) -> HyperCubeResult<()> {
    object.with_suspended_layout(|props| {
        let def = props.hypercube_mut(&CubePath::top_level())?;
        for dimension in &mut def.dimensions {
            dimension.def.sort_criterias = vec![SortCriteria::numeric(SortDirection::Ascending)];
        }
        Ok(())
    })?;
    print_cube("Sales per year and month, sorted", object)?;

    let mut def = object.hypercube(TOP_LEVEL)?;
    def.inter_column_sort_order = vec![1, 0, 2];
    object.set_hypercube(TOP_LEVEL, def)?;
    print_cube("Sales per year and month, sorted by month then year", object)?;

    let mut def = object.hypercube(TOP_LEVEL)?;
    def.inter_column_sort_order = vec![2, 0, 1];
    def.measures[0].sort_by = SortCriteria::numeric(SortDirection::Descending);
    object.set_hypercube(TOP_LEVEL, def)?;
    print_cube("Sales per year and month, sorted by sales (descending)", object)
}

fn selections(engine: &Engine, object: &mut GenericObject<'_, Engine>) -> HyperCubeResult<()> {
    let mut def = object.hypercube(TOP_LEVEL)?;
    def.inter_column_sort_order.clear();
    object.set_hypercube(TOP_LEVEL, def)?;

    engine.select("Year", &["2016"])?;
    print_cube("Sales for year 2016 only", object)?;
    engine.select("Sales Rep Name", &["Amalia Craig"])?;
    print_cube("Sales for year 2016 and sales rep Amalia Craig", object)?;
    engine.select("Sales Rep Name", &["Amanda Honda"])?;
    print_cube("Sales for year 2016 and sales rep Amanda Honda", object)?;
    engine.clear_all()?;
    print_cube("Sales for all years", object)
}

fn grouped_dimensions(engine: &Engine, object: &mut GenericObject<'_, Engine>) -> HyperCubeResult<()> {
    for (grouping, label) in [(Grouping::Hierarchy, "drill-down"), (Grouping::Collection, "cyclic")] {
        let mut def = HyperCubeDefinition::new();
        let dimension = def.add_inline_dimension("Year");
        dimension.def.grouping = grouping;
        dimension.def.field_defs.push("Month".to_string());
        dimension.def.sort_criterias = vec![SortCriteria::numeric(SortDirection::Ascending); 2];
        def.add_inline_measure("Sum([Sales Amount])");
        object.set_hypercube(TOP_LEVEL, def)?;

        engine.select("Year", &["2016"])?;
        let info = object.get_pager(TOP_LEVEL)?.layout()?.dimension_info.remove(0);
        print_cube(
            &format!("{} group on '{}' (level {})", label, info.fallback_title, info.group_pos),
            object,
        )?;
        engine.clear_all()?;
    }
    Ok(())
}

fn paging(engine: &Engine) -> HyperCubeResult<()> {
    let mut object = GenericObject::create(engine, "mycustomtype")?;
    let mut def = HyperCubeDefinition::new();
    def.add_inline_dimension("YearMonth");
    def.add_inline_measure("Sum([Sales Amount])");
    object.set_hypercube(TOP_LEVEL, def)?;

    let mut pager = object.get_pager(TOP_LEVEL)?;
    let first = pager.go_to(vec![Page::new(0, 0, 2, 5)])?;
    print_page("First page", &first[0].matrix);

    let mut page_nr = 1;
    while !pager.is_at_row_edge() {
        page_nr += 1;
        let pages = pager.get_next_page()?;
        print_page(&format!("Page nr: {}", page_nr), &pages[0].matrix);
    }

    let last = pager.get_last_page()?;
    print_page("Last page", &last[0].matrix);
    for (step, pages) in pager
        .iterate_pages(vec![Page::new(19, 0, 2, 5)], Direction::Previous)
        .enumerate()
    {
        print_page(&format!("Backwards step {}", step), &pages?[0].matrix);
    }
    Ok(())
}

fn multiple_cubes(engine: &Engine) -> HyperCubeResult<()> {
    let mut object = GenericObject::create(engine, "mycustomtype")?;
    object.with_suspended_layout(|props| {
        for (container, field) in [("container0", "Month"), ("container1", "Year")] {
            let mut def = HyperCubeDefinition::new();
            def.add_inline_dimension(field).def.sort_criterias =
                vec![SortCriteria::numeric(SortDirection::Ascending)];
            def.add_inline_measure("Sum([Sales Amount])");
            props.set_hypercube(&CubePath::parse(&format!("/{}/hyperCubeDef", container))?, def)?;
        }
        Ok(())
    })?;

    let mut pagers = object.get_all_pagers()?;
    for pager in &mut pagers {
        println!("*** Sales per cube {}", pager.path());
        for row in all_rows(pager)? {
            println!("{}: {}", row[0].text, row[1].text);
        }
    }

    if let Some(pager) = pagers.iter_mut().find(|p| p.path().contains("container0")) {
        pager.set_current_pages(vec![Page::new(0, 0, 2, 5)])?;
        let last = pager.get_last_page()?;
        println!("*** The last five rows of hypercube in container0");
        for row in &last[0].matrix {
            println!("Month: {}, Sales: {}", row[0].text, row[1].text);
        }
    }
    Ok(())
}
