//! oxide-query CLI
//!
//! Compiles query-options documents to SQL for one or all dialects.

mod schema_file;

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use oxide_query_core::{
    Dialect, JoinPlanner, QueryCompiler, QueryOptions, Schema, Statement, Target,
};

use crate::schema_file::SchemaFile;

/// Compile query options to dialect SQL.
#[derive(Parser)]
#[command(name = "oxide-query")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Target dialect, or `all`.
    #[arg(
        short,
        long,
        env = "OXIDE_QUERY_DIALECT",
        default_value = "postgres",
        value_parser = parse_dialects
    )]
    dialect: Dialects,

    /// JSON schema description.
    #[arg(short, long)]
    schema: PathBuf,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a SELECT.
    Select {
        /// Query options file.
        query: PathBuf,
    },

    /// Compile a DELETE, or a TRUNCATE when the options ask for one.
    Delete {
        /// Query options file.
        query: PathBuf,
    },

    /// Show the join plan of a SELECT without rendering it.
    Plan {
        /// Query options file.
        query: PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Dialects(Vec<Dialect>);

fn parse_dialects(s: &str) -> std::result::Result<Dialects, String> {
    if s.eq_ignore_ascii_case("all") {
        Ok(Dialects(Dialect::ALL.to_vec()))
    } else {
        s.parse().map(|d| Dialects(vec![d]))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let schema = SchemaFile::load(&cli.schema)?.into_schema()?;
    info!(
        entities = schema.entities().count(),
        associations = schema.associations().len(),
        "Loaded schema"
    );

    let output = match &cli.command {
        Commands::Select { query } => {
            let statement = load_options(query)?.into_select()?;
            compile_all(&schema, &cli.dialect.0, &statement.into())?
        }
        Commands::Delete { query } => {
            let statement = load_options(query)?.into_delete()?;
            compile_all(&schema, &cli.dialect.0, &statement.into())?
        }
        Commands::Plan { query } => describe_plan(&schema, &load_options(query)?)?,
    };
    print!("{output}");
    Ok(())
}

fn load_options(path: &Path) -> Result<QueryOptions> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read query file {}", path.display()))?;
    QueryOptions::from_json(&text)
        .with_context(|| format!("Failed to parse query file {}", path.display()))
}

/// Compiles for every requested dialect. With a single dialect a failure is
/// an error; otherwise failing dialects are reported and skipped.
fn compile_all(schema: &Schema, dialects: &[Dialect], statement: &Statement) -> Result<String> {
    let mut output = String::new();
    for &dialect in dialects {
        match QueryCompiler::new(dialect, schema).compile(statement) {
            Ok(compiled) if dialects.len() == 1 => writeln!(output, "{compiled}")?,
            Ok(compiled) => writeln!(output, "-- {dialect}\n{compiled}")?,
            Err(e) if dialects.len() == 1 => {
                return Err(e).with_context(|| format!("Failed to compile for {dialect}"));
            }
            Err(e) => {
                warn!(%dialect, error = %e, "Skipping dialect");
                writeln!(output, "-- {dialect}: {e}")?;
            }
        }
    }
    Ok(output)
}

fn describe_plan(schema: &Schema, options: &QueryOptions) -> Result<String> {
    let query = options.clone().into_select()?;
    let Target::Entity(root) = &query.target else {
        anyhow::bail!("A join plan needs a 'model'");
    };
    let plan = JoinPlanner::new(schema).plan(root, &query.includes)?;

    let mut output = String::new();
    writeln!(output, "{root}")?;
    for entry in &plan.entries {
        let kind = if entry.through { " (through)" } else { "" };
        writeln!(
            output,
            "  {} {} AS {} FROM {}{kind}",
            entry.join_type.sql_keyword(),
            entry.entity,
            entry.alias,
            entry.source_alias
        )?;
        if let Some(filter) = &entry.attached_where {
            writeln!(output, "    WHERE {}", filter.render(Dialect::Postgres))?;
        }
    }
    Ok(output)
}
