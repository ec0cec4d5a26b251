use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use invoice_tables::{
    AnalysisReport, AnalyzeOptions, PageSelection, TARGET_PRODUCT, analyze_invoice_with_options,
    extract_tables_from_bytes, write_tables_csv,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "invoice-sum",
    version,
    about = "Sum invoice line-item totals for one product"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the summed Total of every matching Product row.
    Sum(SumArgs),
    /// Dump every detected table as CSV.
    Tables(TablesArgs),
}

#[derive(Debug, Args)]
struct SourceArgs {
    /// Input PDF path.
    #[arg(short, long)]
    input: PathBuf,

    /// Page selection like 1-3,5.
    #[arg(long)]
    pages: Option<String>,

    /// Minimum cells required per candidate table row.
    #[arg(long, default_value_t = 2)]
    min_cols: usize,
}

#[derive(Debug, Args)]
struct SumArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Product name to match after trimming.
    #[arg(long, default_value = TARGET_PRODUCT)]
    product: String,

    /// Print counters and warnings to stderr.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Args)]
struct TablesArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Output CSV path; stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output delimiter character.
    #[arg(long, default_value = ",")]
    delimiter: char,
}

fn parse_options(source: &SourceArgs, product: Option<&str>) -> Result<AnalyzeOptions> {
    let pages = source
        .pages
        .as_deref()
        .map(PageSelection::from_str)
        .transpose()
        .map_err(|error| anyhow!("invalid page selection: {error}"))
        .context("failed to parse --pages")?;
    if let Some(selection) = &pages {
        debug!(pages = selection.page_count(), "page selection parsed");
    }

    let mut options = AnalyzeOptions {
        pages,
        min_cols: source.min_cols,
        ..AnalyzeOptions::default()
    };
    if let Some(product) = product {
        options.product = product.to_string();
    }
    Ok(options)
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read '{}'", path.display()))
}

fn log_report(report: &AnalysisReport) {
    eprintln!(
        "pages={} tables={} eligible={} matched_rows={} skipped_rows={}",
        report.page_count,
        report.table_count,
        report.eligible_table_count,
        report.matched_rows,
        report.skipped_rows
    );
    for warning in &report.warnings {
        eprintln!("  - {warning}");
    }
}

fn run_sum(args: &SumArgs) -> Result<ExitCode> {
    let options = parse_options(&args.source, Some(&args.product))?;
    let bytes = read_input(&args.source.input)?;
    let filename = args.source.input.to_string_lossy();
    let report = analyze_invoice_with_options(&bytes, &filename, &options)
        .with_context(|| format!("failed to analyze '{}'", args.source.input.display()))?;

    if args.verbose {
        log_report(&report);
    }
    println!("{}", report.sum);
    Ok(ExitCode::SUCCESS)
}

fn run_tables(args: &TablesArgs) -> Result<ExitCode> {
    if !args.delimiter.is_ascii() {
        anyhow::bail!("delimiter must be a single ASCII character");
    }
    let delimiter = u8::try_from(args.delimiter)?;

    let options = parse_options(&args.source, None)?;
    let bytes = read_input(&args.source.input)?;
    let extraction = extract_tables_from_bytes(&bytes, &options).with_context(|| {
        format!(
            "failed to extract tables from '{}'",
            args.source.input.display()
        )
    })?;

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create '{}'", path.display()))?;
            write_tables_csv(BufWriter::new(file), &extraction, delimiter)?;
        }
        None => {
            write_tables_csv(io::stdout().lock(), &extraction, delimiter)?;
        }
    }

    if extraction.table_count() == 0 {
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("invoice_tables=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();
    let outcome = match &cli.command {
        Commands::Sum(args) => run_sum(args),
        Commands::Tables(args) => run_tables(args),
    };

    match outcome {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}
