//! Build a relationship chart from a Wildermyth legacy and export it.
//!
//! Usage:
//!   legacy-chart legacy.json                          # JSON chart on stdout
//!   legacy-chart legacy.json -f dot -o chart.gv       # Graphviz file
//!   legacy-chart legacy.json.zip                      # exported archive
//!   legacy-chart legacy.json --exclude-relationships past --include-heroes Ada
//!
//! Set `RUST_LOG=debug` for per-edge diagnostics.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use legacy_chart::params::{parse_relationship_list, resolve_heroes};
use legacy_chart::{legacy, ChartView, FilterParams, RelationshipChart};

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Dot,
}

#[derive(Parser)]
#[command(name = "legacy-chart")]
#[command(about = "Wildermyth legacy relationship chart builder")]
struct Args {
    /// Path to legacy.json or legacy.json.zip
    legacy_path: PathBuf,

    /// Where to write the chart (stdout if omitted)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// JSON file with filter parameters; command line lists override it
    #[arg(long)]
    filter_config: Option<PathBuf>,

    /// Relationships to include; entry format is status[_kind]
    #[arg(long, num_args = 1..)]
    include_relationships: Option<Vec<String>>,

    /// Relationships to exclude; entry format is status[_kind]
    #[arg(long, num_args = 1..)]
    exclude_relationships: Option<Vec<String>>,

    /// Heroes to include; accepts a name, an id or a short id
    #[arg(long, num_args = 1..)]
    include_heroes: Option<Vec<String>>,

    /// Heroes to exclude; accepts a name, an id or a short id
    #[arg(long, num_args = 1..)]
    exclude_heroes: Option<Vec<String>>,

    /// Leave unknown parents out of the export
    #[arg(long)]
    hide_phantoms: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> legacy_chart::Result<()> {
    let legacy = legacy::load_legacy_json(&args.legacy_path)?;
    let characters = legacy::load_characters(&legacy)?;
    let mut chart = RelationshipChart::from_character_data(&characters)?;

    let params = filter_params(args, &chart)?;
    chart.apply_filter_params(&params)?;
    chart.clean_relationships()?;

    let view = ChartView::from_chart(&chart, args.hide_phantoms);
    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };
    match args.format {
        OutputFormat::Json => view.export_json(&mut writer)?,
        OutputFormat::Dot => view.export_dot(&mut writer)?,
    }
    writer.flush()?;

    info!(
        nodes = view.nodes.len(),
        relationships = view.relationships.len(),
        output = args.output.as_ref().map_or("stdout".to_string(), |p| p.display().to_string()),
        "chart exported"
    );
    Ok(())
}

fn filter_params(args: &Args, chart: &RelationshipChart<'_>) -> legacy_chart::Result<FilterParams> {
    let mut params = match &args.filter_config {
        Some(path) => FilterParams::from_json_file(path)?,
        None => FilterParams::default(),
    };

    if let Some(list) = parse_relationship_list(args.include_relationships.as_deref())? {
        params.include_relationships = Some(list);
    }
    if let Some(list) = parse_relationship_list(args.exclude_relationships.as_deref())? {
        params.exclude_relationships = Some(list);
    }
    if let Some(heroes) = &args.include_heroes {
        params.include_heroes = Some(resolve_heroes(heroes, chart)?);
    }
    if let Some(heroes) = &args.exclude_heroes {
        params.exclude_heroes = Some(resolve_heroes(heroes, chart)?);
    }
    Ok(params)
}
