//! Output formatting for CLI
//!
//! Results go to stdout in the selected format. Status lines for humans go to
//! stdout on success and stderr otherwise.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Display;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    #[value(alias = "yml")]
    Yaml,
}

impl OutputFormat {
    /// True if results are printed for humans rather than for tools
    pub fn is_table(self) -> bool {
        self == OutputFormat::Table
    }
}

/// Print a list as table rows, or serialize the items themselves
///
/// Rows are a display projection; JSON and YAML carry every field.
pub fn print_list<T, R>(items: Vec<T>, format: OutputFormat) -> anyhow::Result<()>
where
    T: Serialize,
    R: Tabled + From<T>,
{
    match format {
        OutputFormat::Table => print_table(items.into_iter().map(R::from).collect::<Vec<R>>()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&items)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&items)?),
    }
    Ok(())
}

/// Serialize a single item; returns false for table output so the caller can
/// print its own layout
pub fn print_serialized<T: Serialize>(item: &T, format: OutputFormat) -> anyhow::Result<bool> {
    match format {
        OutputFormat::Table => return Ok(false),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(item)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(item)?),
    }
    Ok(true)
}

pub fn print_table<R: Tabled>(rows: Vec<R>) {
    if rows.is_empty() {
        println!("{}", "Nothing to show".yellow());
        return;
    }

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
}

pub fn success(message: impl Display) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn warning(message: impl Display) {
    eprintln!("{} {}", "⚠".yellow().bold(), message.to_string().yellow());
}

pub fn failure(message: impl Display) {
    eprintln!("{} {}", "✗".red().bold(), message.to_string().red());
}

/// Table cell for an optional value
pub fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}
