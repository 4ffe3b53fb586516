use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use cts_cli::types::CommandResult;
use cts_model::PatientFailure;

/// Failures beyond this many are summarized in one line.
const FAILURE_ROWS: usize = 25;

pub fn print_summary(result: &CommandResult) {
    println!("Command: {}", result.report.command);
    println!("Output: {}", result.output_dir.display());
    println!("Run report: {}", result.report_path.display());

    let mut table = Table::new();
    table.set_header(vec![header_cell("Count"), header_cell("Value")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    for (name, value) in &result.report.counts {
        table.add_row(vec![Cell::new(name), count_cell(name, *value)]);
    }
    println!("{table}");
    print_failure_table(&result.report.failures);
}

fn print_failure_table(failures: &[PatientFailure]) {
    if failures.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Patient"),
        header_cell("Kind"),
        header_cell("Reason"),
    ]);
    apply_table_style(&mut table);
    for failure in failures.iter().take(FAILURE_ROWS) {
        table.add_row(vec![
            Cell::new(failure.patient_id.as_str()),
            Cell::new(failure.kind.as_str()).fg(Color::Yellow),
            Cell::new(&failure.reason),
        ]);
    }
    if failures.len() > FAILURE_ROWS {
        table.add_row(vec![
            dim_cell("..."),
            dim_cell(format!("{} more", failures.len() - FAILURE_ROWS)),
            dim_cell("see run report"),
        ]);
    }
    println!();
    println!("Skipped patients:");
    println!("{table}");
}

fn count_cell(name: &str, value: usize) -> Cell {
    let flagged = matches!(name, "failed" | "rejected_rows" | "timeline_skipped_rows");
    if value == 0 {
        dim_cell(value)
    } else if flagged {
        Cell::new(value)
            .fg(Color::Yellow)
            .add_attribute(Attribute::Bold)
    } else {
        Cell::new(value)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value.to_string()).add_attribute(Attribute::Dim)
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}
