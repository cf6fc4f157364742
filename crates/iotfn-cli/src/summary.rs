use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use polars::prelude::DataFrame;

use iotfn_common::any_to_string;
use iotfn_model::{FunctionMetadata, ItemTag};
use iotfn_transform::{PipelineRun, StepStatus};

pub fn print_run_summary(run: &PipelineRun) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("#"),
        header_cell("Function"),
        header_cell("Status"),
        header_cell("Rows"),
        header_cell("Added columns"),
        header_cell("Time (ms)"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Center);
    align_column(&mut table, 3, CellAlignment::Right);
    align_column(&mut table, 5, CellAlignment::Right);
    for (idx, step) in run.steps.iter().enumerate() {
        let added = if step.added_columns.is_empty() {
            dim_cell("-")
        } else {
            Cell::new(step.added_columns.join(", "))
        };
        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(&step.function),
            status_cell(&step.status),
            Cell::new(step.rows),
            added,
            Cell::new(step.elapsed.as_millis()),
        ]);
    }
    println!("{table}");

    let failures: Vec<_> = run.failures().collect();
    if !failures.is_empty() {
        eprintln!("Errors:");
        for (function, error) in failures {
            eprintln!("- {function} ({}): {error}", error.kind());
        }
    }
    if !run.trace.is_empty() {
        println!("Trace:");
        for entry in &run.trace {
            println!("- {entry}");
        }
    }
}

/// Print up to `limit` rows of a frame.
pub fn print_frame(df: &DataFrame, limit: usize) {
    println!("{}", frame_table(df, limit));
    if df.height() > limit {
        println!("({} of {} rows shown)", limit, df.height());
    }
}

pub fn frame_table(df: &DataFrame, limit: usize) -> Table {
    let mut table = Table::new();
    table.set_header(
        df.get_column_names()
            .into_iter()
            .map(|name| header_cell(name.as_str()))
            .collect::<Vec<_>>(),
    );
    apply_table_style(&mut table);
    let columns = df.get_columns();
    for row in 0..df.height().min(limit) {
        let cells: Vec<Cell> = columns
            .iter()
            .map(|column| match column.get(row) {
                Ok(value) if !value.is_null() => Cell::new(any_to_string(value)),
                _ => dim_cell("null"),
            })
            .collect();
        table.add_row(cells);
    }
    table
}

pub fn print_catalog(entries: &[FunctionMetadata]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Function"),
        header_cell("Category"),
        header_cell("Inputs"),
        header_cell("Outputs"),
        header_cell("Description"),
    ]);
    apply_table_style(&mut table);
    for meta in entries {
        let category = if meta.is_event() {
            Cell::new(meta.category.display_name()).fg(Color::Yellow)
        } else {
            Cell::new(meta.category.display_name())
        };
        let inputs: Vec<String> = meta
            .inputs
            .iter()
            .map(|input| {
                if meta.constants.contains(input) {
                    format!("{input} (constant)")
                } else {
                    input.clone()
                }
            })
            .collect();
        let outputs: Vec<String> = meta
            .outputs
            .iter()
            .map(|output| match meta.tags_for(output) {
                [] => output.clone(),
                tags => {
                    let tags: Vec<&str> = tags.iter().map(ItemTag::as_str).collect();
                    format!("{output} [{}]", tags.join(", "))
                }
            })
            .collect();
        table.add_row(vec![
            Cell::new(&meta.name).add_attribute(Attribute::Bold),
            category,
            Cell::new(inputs.join("\n")),
            Cell::new(outputs.join("\n")),
            Cell::new(&meta.description),
        ]);
    }
    println!("{table}");
}

fn status_cell(status: &StepStatus) -> Cell {
    let cell = Cell::new(status.label()).add_attribute(Attribute::Bold);
    match status {
        StepStatus::Succeeded => cell.fg(Color::Green),
        StepStatus::Failed(_) => cell.fg(Color::Red),
        StepStatus::Skipped => cell.fg(Color::DarkGrey),
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}
