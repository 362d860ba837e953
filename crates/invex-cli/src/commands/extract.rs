//! Extract command - run one invoice through the pipeline in the terminal.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::{Term, style};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tracing::{debug, info};

use invex_core::models::document::UploadedDocument;
use invex_core::models::invoice::{Field, InvoiceRecord};
use invex_core::pipeline::{Pipeline, ProcessReport};

use super::{describe_save, load_config};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input file (PDF, JPG, JPEG or PNG)
    #[arg(required = true)]
    input: PathBuf,

    /// Save without asking when the record is complete
    #[arg(short, long, conflicts_with = "no_save")]
    yes: bool,

    /// Never save, only show what was extracted
    #[arg(long)]
    no_save: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable sections
    Text,
    /// One JSON object with text, raw response and record
    Json,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    // Unsupported extensions are rejected before the file is read.
    let document = UploadedDocument::from_path(&args.input)?;
    info!("Processing file: {}", args.input.display());

    let pipeline = Pipeline::from_config(&config)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!("Extracting {}...", document.file_name()));

    let report = pipeline.process(&document).await;
    pb.finish_and_clear();

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report_json(&report))?),
        OutputFormat::Text => print_report(&report),
    }

    if let Some(e) = report.error {
        return Err(e.into());
    }

    let Some(record) = report.record else {
        return Ok(());
    };

    if !record.is_complete() {
        eprintln!(
            "{} Not saved: missing {}",
            style("✗").red(),
            missing_labels(&record)
        );
        return Ok(());
    }

    if args.no_save {
        debug!("--no-save given, leaving table untouched");
    } else if args.yes || confirm("Save to spreadsheet?")? {
        let outcome = pipeline.save(&record)?;
        eprintln!("{} {}", style("✓").green(), describe_save(&outcome));
    } else {
        eprintln!("{} Not saved.", style("ℹ").blue());
    }

    debug!("Total processing time: {:?}", start.elapsed());
    Ok(())
}

fn print_report(report: &ProcessReport) {
    if let Some(text) = &report.text {
        println!("{}", style("Extracted Text:").bold());
        println!("{}", text.text);
        println!();
    }

    if let Some(raw) = &report.raw_response {
        println!("{}", style("Service Response:").bold());
        println!("{}", raw);
        println!();
    }

    if let Some(record) = &report.record {
        println!("{}", style("Extracted Data:").bold());
        for field in Field::ALL {
            let value = record.get(field).unwrap_or("-");
            println!("  {:<15} {}", format!("{}:", field.label()), value);
        }
        println!();
    }
}

fn report_json(report: &ProcessReport) -> serde_json::Value {
    json!({
        "file_name": report.file_name,
        "text": report.text,
        "raw_response": report.raw_response,
        "record": report.record,
        "missing_fields": report.record.as_ref().map(InvoiceRecord::missing_fields),
        "error": report.error.as_ref().map(|e| json!({
            "kind": e.kind().as_str(),
            "message": e.to_string(),
        })),
    })
}

fn missing_labels(record: &InvoiceRecord) -> String {
    record
        .missing_fields()
        .iter()
        .map(|f| f.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Ask a yes/no question on the terminal. Anything but y/yes is a no.
fn confirm(question: &str) -> anyhow::Result<bool> {
    let term = Term::stderr();
    term.write_str(&format!("{} [y/N] ", question))?;
    let answer = term.read_line()?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
