//! Records command - print the saved invoice table.

use clap::Args;
use console::style;

use invex_core::models::invoice::{Field, InvoiceRecord};
use invex_core::store::RecordTable;

use super::load_config;

/// Arguments for the records command.
#[derive(Args)]
pub struct RecordsArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// Aligned columns
    Text,
    /// JSON array
    Json,
    /// CSV with the table header
    Csv,
}

pub fn run(args: RecordsArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let table = RecordTable::from_config(&config.storage)?;
    let records = table.read_all()?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Csv => print!("{}", format_csv(&records)?),
        OutputFormat::Text if records.is_empty() => {
            println!(
                "{} No records in {}",
                style("ℹ").blue(),
                table.path().display()
            );
        }
        OutputFormat::Text => print!("{}", format_text(&records)),
    }

    Ok(())
}

fn format_csv(records: &[InvoiceRecord]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(Field::header())?;
    for record in records {
        wtr.write_record(record.to_row())?;
    }
    Ok(String::from_utf8(wtr.into_inner()?)?)
}

fn format_text(records: &[InvoiceRecord]) -> String {
    let rows: Vec<[String; 3]> = records.iter().map(InvoiceRecord::to_row).collect();
    let header = Field::header();

    let widths: Vec<usize> = (0..header.len())
        .map(|col| {
            rows.iter()
                .map(|row| row[col].chars().count())
                .chain(std::iter::once(header[col].len()))
                .max()
                .unwrap_or_default()
        })
        .collect();

    let mut output = String::new();
    let mut push_line = |cells: [&str; 3]| {
        let line: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect();
        output.push_str(line.join("  ").trim_end());
        output.push('\n');
    };

    push_line(header);
    for row in &rows {
        push_line([&row[0], &row[1], &row[2]]);
    }
    output
}
