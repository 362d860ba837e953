//! Config command - inspect and edit the JSON configuration.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;
use serde_json::Value;

use invex_core::models::config::InvexConfig;
use invex_core::ocr::TesseractEngine;
use invex_core::pdf::PopplerRasterizer;

use super::config_path;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Write a configuration file with default values
    Init(InitArgs),

    /// Get a value by dotted key (e.g. "llm.model")
    Get {
        /// Configuration key
        key: String,
    },

    /// Set a value by dotted key
    Set {
        /// Configuration key
        key: String,
        /// New value (parsed as JSON, else taken as a string)
        value: String,
    },

    /// Show the configuration file path and external tool status
    Path,
}

#[derive(Args)]
struct InitArgs {
    /// Output path for configuration file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite existing file
    #[arg(long)]
    force: bool,
}

pub async fn run(args: ConfigArgs, explicit: Option<&str>) -> anyhow::Result<()> {
    let path = config_path(explicit);
    match args.command {
        ConfigCommand::Show => show_config(&path),
        ConfigCommand::Init(init_args) => init_config(init_args, &path),
        ConfigCommand::Get { key } => get_config(&path, &key),
        ConfigCommand::Set { key, value } => set_config(&path, &key, &value),
        ConfigCommand::Path => show_path(&path).await,
    }
}

fn load_or_default(path: &Path) -> anyhow::Result<InvexConfig> {
    if path.exists() {
        Ok(InvexConfig::from_file(path)?)
    } else {
        Ok(InvexConfig::default())
    }
}

fn show_config(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        eprintln!(
            "{} No config file found, showing defaults.",
            style("ℹ").blue()
        );
    }
    let config = load_or_default(path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn init_config(args: InitArgs, path: &Path) -> anyhow::Result<()> {
    let output_path = args.output.unwrap_or_else(|| path.to_path_buf());

    if output_path.exists() && !args.force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            output_path.display()
        );
    }

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    InvexConfig::default().save(&output_path)?;

    println!(
        "{} Created configuration file at {}",
        style("✓").green(),
        output_path.display()
    );
    Ok(())
}

fn get_config(path: &Path, key: &str) -> anyhow::Result<()> {
    let json = serde_json::to_value(load_or_default(path)?)?;
    let value = lookup(&json, key)
        .ok_or_else(|| anyhow::anyhow!("Configuration key not found: {}", key))?;
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn set_config(path: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let config = load_or_default(path)?;

    let parsed_value: Value =
        serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));

    let mut json = serde_json::to_value(&config)?;
    assign(&mut json, key, parsed_value.clone())?;

    let config: InvexConfig = serde_json::from_value(json)
        .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e))?;
    ensure_persisted(&config, key)?;
    config.validate()?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    config.save(path)?;

    println!(
        "{} Set {} = {}",
        style("✓").green(),
        key,
        serde_json::to_string(&parsed_value)?
    );
    Ok(())
}

async fn show_path(path: &Path) -> anyhow::Result<()> {
    println!("Configuration file: {}", path.display());

    let config = if path.exists() {
        println!("Status: {}", style("exists").green());
        InvexConfig::from_file(path)?
    } else {
        println!("Status: {}", style("not created").yellow());
        println!();
        println!("Run 'invex config init' to create a configuration file.");
        InvexConfig::default()
    };

    println!();
    println!("Record table: {}", config.storage.table_path.display());
    tool_status(
        "tesseract",
        &config.ocr.tesseract_cmd,
        TesseractEngine::new(config.ocr.clone()).is_available().await,
    );
    tool_status(
        "pdftoppm",
        &config.pdf.pdftoppm_cmd,
        PopplerRasterizer::new(&config.pdf).is_available().await,
    );
    Ok(())
}

fn tool_status(name: &str, program: &Path, available: bool) {
    let status = if available {
        style("found").green()
    } else {
        style("missing").red()
    };
    println!("{}: {} ({})", name, status, program.display());
}

/// Fail unless `key` is written out when the config is saved.
fn ensure_persisted(config: &InvexConfig, key: &str) -> anyhow::Result<()> {
    let saved = serde_json::to_value(config)?;
    if lookup(&saved, key).is_some() {
        return Ok(());
    }
    if key == "llm.api_key" {
        anyhow::bail!(
            "{} is never written to the config file; set the {} environment variable instead",
            key,
            config.llm.api_key_env
        );
    }
    anyhow::bail!("Configuration key not found: {}", key)
}

/// Follow a dotted key through nested objects.
fn lookup<'a>(json: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(json, |current, part| current.get(part))
}

/// Replace the value at a dotted key; every parent must already exist.
fn assign(json: &mut Value, key: &str, value: Value) -> anyhow::Result<()> {
    let (parents, last) = match key.rsplit_once('.') {
        Some((parents, last)) => (Some(parents), last),
        None => (None, key),
    };

    let mut current = json;
    for part in parents.into_iter().flat_map(|p| p.split('.')) {
        current = current
            .get_mut(part)
            .ok_or_else(|| anyhow::anyhow!("Configuration path not found: {}", key))?;
    }

    match current.as_object_mut() {
        Some(obj) => {
            obj.insert(last.to_string(), value);
            Ok(())
        }
        None => anyhow::bail!("Cannot set value at non-object path"),
    }
}
