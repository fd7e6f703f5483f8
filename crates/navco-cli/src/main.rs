//! NAVCO audit CLI
//!
//! The `navco-audit` command checks the 3.5% rule against the NAVCO dataset
//! releases found in a data directory.
//!
//! ## Commands
//!
//! - `audit`: Evaluate the rule for every configured release
//! - `lookup`: Search one release for a named case
//! - `columns`: Show the normalized columns of one release
//! - `versions`: List known releases and their candidate files

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{info, Level};

use navco_core::{
    list_columns, lookup_in_version, run_audit, write_audit_report_json, write_audit_summary_md,
    AuditConfig, AuditReport, CaseLookupResult, CaseQuery, DatasetVersion, DirStore, MatchField,
    VerdictOutcome, VersionOutcome,
};

#[derive(Parser)]
#[command(name = "navco-audit")]
#[command(version = navco_core::VERSION)]
#[command(about = "Audit the 3.5% rule against NAVCO dataset releases", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Directory holding the dataset files
    #[arg(long, global = true, env = "NAVCO_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate the rule for every configured release
    Audit {
        /// JSON audit config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Audit only these releases (repeatable)
        #[arg(long)]
        only: Vec<DatasetVersion>,

        /// Write the JSON audit report here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a markdown summary here
        #[arg(long)]
        markdown: Option<PathBuf>,

        /// Stdout format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Search one release for a named case
    Lookup {
        /// Release to search, e.g. 2.1
        #[arg(long)]
        version: DatasetVersion,

        /// Case-insensitive text to look for
        #[arg(long)]
        text: String,

        /// Only records from this year
        #[arg(long)]
        year: Option<i64>,

        /// Field to match: location, campaign or any
        #[arg(long, default_value = "any")]
        field: MatchField,

        /// Stdout format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the normalized columns of one release
    Columns {
        #[arg(long)]
        version: DatasetVersion,
    },

    /// List known releases and their candidate files
    Versions,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    navco_core::init_tracing(cli.json, level);

    let store = DirStore::new(&cli.data_dir);

    match cli.command {
        Commands::Audit {
            config,
            only,
            output,
            markdown,
            format,
        } => cmd_audit(
            &store,
            config.as_deref(),
            &only,
            output.as_deref(),
            markdown.as_deref(),
            format,
        ),
        Commands::Lookup {
            version,
            text,
            year,
            field,
            format,
        } => {
            let mut query = CaseQuery::new(text, field);
            query.year = year;
            cmd_lookup(&store, version, &query, format)
        }
        Commands::Columns { version } => cmd_columns(&store, version),
        Commands::Versions => cmd_versions(),
    }
}

/// Run the audit and print or persist the report
fn cmd_audit(
    store: &DirStore,
    config_path: Option<&Path>,
    only: &[DatasetVersion],
    output: Option<&Path>,
    markdown: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => AuditConfig::from_json_file(path)
            .with_context(|| format!("Failed to load audit config {:?}", path))?,
        None => AuditConfig::default(),
    };
    config.restrict_to(only);
    if config.versions.is_empty() {
        anyhow::bail!("No releases left to audit after --only filter");
    }

    info!(data_dir = %store.root().display(), "starting audit");
    let report = run_audit(store, &config);

    if let Some(path) = output {
        write_audit_report_json(path, &report)?;
        info!(path = %path.display(), "audit report written");
    }
    if let Some(path) = markdown {
        write_audit_summary_md(path, &report)?;
        info!(path = %path.display(), "markdown summary written");
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_audit_text(&report),
    }
    Ok(())
}

fn print_audit_text(report: &AuditReport) {
    for version in &report.versions {
        println!("{}", version.title);
        match &version.outcome {
            VersionOutcome::Unavailable { detail } | VersionOutcome::LoadFailed { detail } => {
                println!("  [{}] {}", version.outcome.status(), detail);
            }
            VersionOutcome::Evaluated { result } => {
                if let Some(source) = &version.source {
                    println!(
                        "  source: {} ({} rows, {} columns)",
                        source.file_name, version.row_count, version.column_count
                    );
                }
                match result {
                    VerdictOutcome::Decided(record) => {
                        println!(
                            "  max failure: {} ({}) at {:.4}%",
                            record.selected_campaign.as_deref().unwrap_or("?"),
                            record
                                .selected_year
                                .map(|y| y.to_string())
                                .unwrap_or_else(|| "?".to_string()),
                            record.participation_fraction * 100.0
                        );
                        println!("  verdict: {}", record.verdict);
                    }
                    VerdictOutcome::Indeterminate(record) => {
                        println!("  verdict: {} ({})", result.verdict(), record.reason.as_str());
                        if !record.found_participation_like_columns.is_empty() {
                            println!(
                                "  participation-like columns: {}",
                                record.found_participation_like_columns.join(", ")
                            );
                        }
                    }
                }
            }
        }
        for diagnostic in &version.diagnostics {
            println!("  warning: {}", diagnostic);
        }
        for lookup in &version.case_lookups {
            print_lookup_text(lookup);
        }
        println!();
    }
}

fn print_lookup_text(lookup: &CaseLookupResult) {
    println!("  lookup \"{}\":", lookup.query.text);
    if lookup.matches.is_empty() {
        println!("    no matching records");
    }
    for m in &lookup.matches {
        println!(
            "    {} | {} | {} | success={} nonviolent={} size={}",
            m.campaign.as_deref().unwrap_or("-"),
            m.year.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string()),
            m.location.as_deref().unwrap_or("-"),
            fmt_flag(m.success),
            fmt_flag(m.nonviolent),
            m.size_category_label.as_deref().unwrap_or("-")
        );
    }
}

fn fmt_flag(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "yes",
        Some(false) => "no",
        None => "-",
    }
}

/// Search one release for a case
fn cmd_lookup(
    store: &DirStore,
    version: DatasetVersion,
    query: &CaseQuery,
    format: OutputFormat,
) -> Result<()> {
    let result = lookup_in_version(store, version, query)
        .with_context(|| format!("Lookup failed for NAVCO {}", version))?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => {
            print_lookup_text(&result);
            if !result.missing_columns.is_empty() {
                println!("  missing columns: {}", result.missing_columns.join(", "));
            }
        }
    }
    Ok(())
}

/// Print normalized columns of one release
fn cmd_columns(store: &DirStore, version: DatasetVersion) -> Result<()> {
    let listing = list_columns(store, version)
        .with_context(|| format!("Failed to load NAVCO {}", version))?;
    println!(
        "NAVCO {} from {} (sha256 {})",
        version, listing.source.file_name, listing.source.sha256
    );
    for column in &listing.columns {
        let marker = if listing.participation_like.contains(column) {
            "*"
        } else {
            " "
        };
        println!("{} {}", marker, column);
    }
    Ok(())
}

/// List known releases
fn cmd_versions() -> Result<()> {
    for version in DatasetVersion::ALL {
        let descriptor = version.descriptor();
        println!("{}  {}", version, descriptor.title);
        for candidate in descriptor.candidates {
            println!("      {} ({})", candidate.file_name, candidate.format);
        }
    }
    Ok(())
}
