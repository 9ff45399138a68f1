//! `vafdb`: filter a joined sample/VAF table from the command line.
//!
//! The table is loaded into an in-memory store and the request runs through
//! the query engine page by page, exactly as a remote client would see it.

mod load;
mod output;

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value as Json;
use tracing_subscriber::EnvFilter;
use vafdb_query::{EngineConfig, MemoryStore, QueryEngine, QueryRequest, Registry};

use crate::load::{load_table, Delimiter};
use crate::output::{OutputMode, RecordWriter};

/// Filter VAF records by sample metadata and per-position statistics.
#[derive(Parser, Debug)]
#[command(name = "vafdb", version)]
struct Cli {
    /// Engine configuration (YAML)
    #[arg(long, global = true, env = "VAFDB_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Filter with field__lookup=value pairs; all pairs must match
    Filter {
        #[command(flatten)]
        run: RunArgs,

        /// Filter pair, e.g. `-f coverage__gte 20`
        #[arg(
            short = 'f',
            long = "field",
            num_args = 2,
            value_names = ["FIELD", "VALUE"],
            action = ArgAction::Append
        )]
        fields: Vec<String>,
    },
    /// Filter with a nested JSON expression
    Query {
        #[command(flatten)]
        run: RunArgs,

        /// Expression, e.g. `{"|": [{"coverage__lt": 5}, {"pathogen": "MPXV"}]}`
        #[arg(long, conflicts_with = "expr_file", required_unless_present = "expr_file")]
        expr: Option<String>,

        /// File holding the expression
        #[arg(long)]
        expr_file: Option<PathBuf>,
    },
    /// List filterable fields and their lookups
    Fields {
        #[arg(short, long, value_enum, default_value_t)]
        output: OutputMode,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Joined sample/VAF table (CSV, or TSV by extension)
    #[arg(long)]
    data: PathBuf,

    /// Read the table as tab-separated regardless of extension
    #[arg(long)]
    tsv: bool,

    #[arg(short, long, value_enum, default_value_t)]
    output: OutputMode,

    /// Records fetched per page
    #[arg(long)]
    page_size: Option<usize>,
}

#[derive(Serialize)]
struct FieldRow {
    field: String,
    kind: &'static str,
    lookups: String,
    choices: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli, io::stdout().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => ExitCode::from(report(&err)),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("VAFDB_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Prints the failure and picks the exit status: 1 for rejected filters,
/// 2 for everything else.
fn report(err: &anyhow::Error) -> u8 {
    let validation = err
        .downcast_ref::<vafdb_query::Error>()
        .and_then(vafdb_query::Error::validation);
    match validation {
        Some(errors) => {
            match serde_json::to_string_pretty(&errors.to_response()) {
                Ok(body) => eprintln!("{body}"),
                Err(_) => eprintln!("{errors}"),
            }
            1
        }
        None => {
            eprintln!("error: {err:#}");
            2
        }
    }
}

fn run<W: Write>(cli: Cli, out: W) -> Result<()> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Command::Fields { output } => list_fields(Registry::global(), output, out),
        Command::Filter { run, fields } => {
            let pairs = fields
                .chunks_exact(2)
                .map(|pair| (pair[0].clone(), pair[1].clone()));
            execute(QueryRequest::simple(pairs), &run, config, out)
        }
        Command::Query {
            run,
            expr,
            expr_file,
        } => {
            let text = match (expr, expr_file) {
                (Some(text), _) => text,
                (None, Some(path)) => fs::read_to_string(&path)
                    .with_context(|| format!("cannot read {}", path.display()))?,
                (None, None) => anyhow::bail!("one of --expr or --expr-file is required"),
            };
            let json: Json = serde_json::from_str(&text).context("expression is not valid JSON")?;
            execute(QueryRequest::expression(json), &run, config, out)
        }
    }
}

fn execute<W: Write>(request: QueryRequest, run: &RunArgs, config: EngineConfig, out: W) -> Result<()> {
    let delimiter = if run.tsv {
        Delimiter::Tab
    } else {
        Delimiter::for_path(&run.data)
    };
    let store = MemoryStore::new();
    load_table(&run.data, delimiter, &store)?;

    let engine = QueryEngine::new(store, config)?;
    let request = match run.page_size {
        Some(size) => request.with_page_size(size),
        None => request,
    };

    let mut writer = RecordWriter::new(out, run.output);
    let mut records = engine.records(request);
    for record in records.by_ref() {
        writer.write(&record?)?;
    }
    let written = writer.written();
    writer.finish()?;
    tracing::info!(records = written, pages = records.pages(), "query complete");
    Ok(())
}

fn list_fields<W: Write>(registry: &Registry, mode: OutputMode, out: W) -> Result<()> {
    let mut writer = RecordWriter::new(out, mode);
    for spec in registry.fields() {
        let lookups: Vec<String> = spec.lookups.iter().map(ToString::to_string).collect();
        writer.write(&FieldRow {
            field: spec.path().to_string(),
            kind: spec.kind.as_str(),
            lookups: lookups.join(","),
            choices: spec.choices.map(|c| c.join(",")),
        })?;
    }
    writer.finish()?;
    Ok(())
}
