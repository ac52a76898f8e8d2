//! EcoNet CLI - Command-line interface for the ecological-integrity index
//!
//! Usage:
//!   econet discretize <table.csv> -o binned.csv --bins 5
//!   econet index <table.csv> -a adjacency.csv -t condition -o index.csv
//!   econet index <table.csv> -a adjacency.csv -t condition -o index.asc \
//!       --grid 512x512 --report json

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use econet_core::engine::em::EmConfig;
use econet_core::engine::pipeline::{build_structure, run_index_pipeline, FitDiagnostics, ScoredIndex};
use econet_io::adjacency::read_adjacency_path;
use econet_io::csv_table::{read_table_path, write_index, write_table};
use econet_io::discretize::EqualWidthDiscretizer;
use econet_io::grid::{write_ascii_grid_path, GridSpec};
use econet_io::IoError;

#[derive(Parser)]
#[command(name = "econet")]
#[command(version)]
#[command(about = "Ecological-integrity index over a discrete Bayesian network")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Equal-width discretize the numeric columns of a table
    Discretize {
        /// Input CSV table
        table: PathBuf,

        /// Output CSV path
        #[arg(short, long)]
        output: PathBuf,

        /// Number of equal-width bins per column
        #[arg(short, long, default_value_t = 5)]
        bins: usize,

        /// Columns to leave untouched (comma separated)
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,
    },

    /// Fit the network on a table and write the per-row index
    Index {
        /// Input CSV table (training and scoring rows together)
        table: PathBuf,

        /// Adjacency-matrix CSV (row = parent, column = child, 1 = arc)
        #[arg(short, long)]
        adjacency: PathBuf,

        /// Target variable holding the (partially observed) condition label
        #[arg(short, long)]
        target: String,

        /// Ordinal levels for the trailing target categories (comma separated)
        #[arg(long, value_delimiter = ',', default_value = "1,2,3")]
        levels: Vec<f64>,

        /// EM convergence threshold on CPT entry change
        #[arg(long, default_value_t = 7e-5)]
        epsilon: f64,

        /// EM iteration cap
        #[arg(long, default_value_t = 100)]
        max_iterations: usize,

        /// Output path (CSV, or ASCII grid when --grid is given)
        #[arg(short, long)]
        output: PathBuf,

        /// Reshape the index to ROWSxCOLS and write an ESRI ASCII grid
        #[arg(long, value_name = "ROWSxCOLS")]
        grid: Option<String>,

        /// Diagnostics report format: summary or json
        #[arg(long, default_value = "summary")]
        report: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Discretize {
            table,
            output,
            bins,
            exclude,
        } => run_discretize(&table, &output, bins, &exclude),
        Command::Index {
            table,
            adjacency,
            target,
            levels,
            epsilon,
            max_iterations,
            output,
            grid,
            report,
        } => run_index(
            &table,
            &adjacency,
            &target,
            &levels,
            EmConfig {
                epsilon,
                max_iterations,
            },
            &output,
            grid.as_deref(),
            &report,
        ),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run_discretize(
    table_path: &PathBuf,
    output: &PathBuf,
    bins: usize,
    exclude: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let table = read_table_path(table_path)?;
    let columns: Vec<String> = table
        .columns()
        .iter()
        .filter(|name| !exclude.contains(name))
        .cloned()
        .collect();

    let mut discretizer = EqualWidthDiscretizer::new(bins)?;
    discretizer.fit(&table, &columns)?;
    let binned = discretizer.transform(&table)?;

    write_table(BufWriter::new(File::create(output)?), &binned)?;
    println!(
        "Discretized {} columns over {} rows into {} bins",
        columns.len(),
        binned.n_rows(),
        bins
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_index(
    table_path: &PathBuf,
    adjacency_path: &PathBuf,
    target: &str,
    levels: &[f64],
    em: EmConfig,
    output: &PathBuf,
    grid: Option<&str>,
    report: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let table = read_table_path(table_path)?;
    let spec = read_adjacency_path(adjacency_path)?;

    let structure = build_structure(&table, &spec.variables, &spec.arcs)?;
    let (scored, diagnostics) = run_index_pipeline(&structure, &table, target, levels, em)?;

    match grid {
        Some(shape) => {
            let grid_spec = parse_grid_spec(shape)?;
            write_ascii_grid_path(output, &grid_spec, &scored.index)?;
        }
        None => {
            write_index(BufWriter::new(File::create(output)?), &scored.index)?;
        }
    }

    match report {
        "json" => print_json_report(&scored, &diagnostics)?,
        "summary" => print_summary(&scored, &diagnostics),
        other => {
            eprintln!("Unknown report format '{other}', using summary");
            print_summary(&scored, &diagnostics);
        }
    }
    Ok(())
}

fn parse_grid_spec(shape: &str) -> Result<GridSpec, IoError> {
    let (rows, cols) = shape
        .split_once(['x', 'X'])
        .ok_or_else(|| IoError::Parse(format!("grid shape '{shape}' is not ROWSxCOLS")))?;
    let rows = rows
        .trim()
        .parse::<usize>()
        .map_err(|_| IoError::Parse(format!("bad grid rows in '{shape}'")))?;
    let cols = cols
        .trim()
        .parse::<usize>()
        .map_err(|_| IoError::Parse(format!("bad grid cols in '{shape}'")))?;
    Ok(GridSpec::new(rows, cols))
}

fn print_summary(scored: &ScoredIndex, diagnostics: &FitDiagnostics) {
    let scored_rows = scored.index.iter().filter(|v| v.is_some()).count();
    println!("Training rows: {}", diagnostics.training_rows);
    println!(
        "EM: {} iteration(s), converged: {}, final max delta: {:.3e}",
        diagnostics.em.iterations_run, diagnostics.em.converged, diagnostics.em.final_max_delta
    );
    if diagnostics.em.uniform_filled_columns > 0 {
        println!(
            "Uniform-filled CPT columns: {}",
            diagnostics.em.uniform_filled_columns
        );
    }
    println!("Scored rows: {} / {}", scored_rows, scored.index.len());
    if !scored.issues.is_empty() {
        println!("Row issues: {}", scored.issues.len());
    }
}

fn print_json_report(
    scored: &ScoredIndex,
    diagnostics: &FitDiagnostics,
) -> Result<(), serde_json::Error> {
    #[derive(serde::Serialize)]
    struct Report<'a> {
        training_rows: usize,
        em_iterations: usize,
        em_converged: bool,
        em_final_max_delta: f64,
        uniform_filled_columns: usize,
        rows: usize,
        scored_rows: usize,
        issues: &'a [econet_core::RowIssue],
    }

    let report = Report {
        training_rows: diagnostics.training_rows,
        em_iterations: diagnostics.em.iterations_run,
        em_converged: diagnostics.em.converged,
        em_final_max_delta: diagnostics.em.final_max_delta,
        uniform_filled_columns: diagnostics.em.uniform_filled_columns,
        rows: scored.index.len(),
        scored_rows: scored.index.iter().filter(|v| v.is_some()).count(),
        issues: &scored.issues,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
