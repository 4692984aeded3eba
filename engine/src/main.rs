//! Command line entry point: [`Cli`]

use clap::{Parser, Subcommand};
use plan_lens::config::{Config, LoggingConfig};
use plan_lens::services::plan_analyzer::identity::{
    IdentityGenerator, SequenceIdGenerator, UuidGenerator,
};
use plan_lens::services::plan_analyzer::{
    AnalyzerOptions, EngineInput, NodeClassifier, OperatorParser, analyze_input,
};
use plan_lens::utils::{EngineError, EngineResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

const LONG_ABOUT: &str = "
plan-lens - query plan enrichment

Reads query plan snapshots (operator graph, runtime metrics and plan
descriptions) and writes enriched executions: typed operator plans,
derived metrics and io/basic/advanced views of the plan graph.

Environment Variables
APP_LOG_LEVEL: tracing filter directive. Default is info,plan_lens=debug.
APP_LOG_FILE: daily rolling log file.
APP_OUTPUT_PRETTY: pretty-print JSON output (true/false).
APP_HIDDEN_NODE_NAMES: comma-separated operators hidden from every view.
";

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = LONG_ABOUT)]
struct Cli {
    #[clap(long, global = true, help = "Path to the configuration file")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Enrich every execution of an input document
    Analyze {
        #[clap(short, long, help = "Input JSON document", value_parser(parse_valid_file))]
        input: PathBuf,

        #[clap(short, long, help = "Write the result here instead of stdout")]
        output: Option<PathBuf>,

        #[clap(long, help = "Use sequential ids instead of random UUIDs")]
        deterministic_ids: bool,
    },
    /// Run a single operator parser
    Parse {
        #[clap(long, help = "Operator name, e.g. SortMergeJoin or GpuFilter")]
        operator: String,

        #[clap(long, help = "Plan description text")]
        plan: String,
    },
}

fn parse_valid_file(file: &str) -> std::result::Result<PathBuf, String> {
    let path = PathBuf::from(file);
    if !path.exists() {
        Err(format!("File does not exist: '{file}'"))
    } else if !path.is_file() {
        Err(format!("Exists but is not a file: '{file}'"))
    } else {
        Ok(path)
    }
}

fn init_logging(config: &LoggingConfig) -> EngineResult<Option<WorkerGuard>> {
    let filter = EnvFilter::try_new(&config.level).map_err(EngineError::config)?;
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard) = match &config.file {
        Some(file) => {
            let path = Path::new(file);
            let directory = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| EngineError::config(format!("logging.file '{}' has no file name", file)))?;
            fs::create_dir_all(directory)?;

            let appender = tracing_appender::rolling::daily(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(EngineError::config)?;
    Ok(guard)
}

fn analyze(config: &Config, input: &Path, output: Option<&Path>, deterministic_ids: bool) -> EngineResult<()> {
    let text = fs::read_to_string(input)?;
    let document: EngineInput = serde_json::from_str(&text)?;
    if document.executions.is_empty() {
        return Err(EngineError::invalid_input(format!("{} contains no executions", input.display())));
    }

    let options = AnalyzerOptions::from(&config.analyzer);
    let ids: Box<dyn IdentityGenerator> = if deterministic_ids {
        Box::new(SequenceIdGenerator::new("plan"))
    } else {
        Box::new(UuidGenerator)
    };

    let store = analyze_input(document, &options, ids.as_ref());
    tracing::info!("Analyzed {} executions from {}", store.len(), input.display());

    let json = if config.output.pretty {
        serde_json::to_string_pretty(&store)?
    } else {
        serde_json::to_string(&store)?
    };

    match output {
        Some(path) => {
            fs::write(path, json)?;
            tracing::info!("Wrote result to {}", path.display());
        },
        None => println!("{}", json),
    }
    Ok(())
}

fn parse(operator: &str, plan: &str) -> EngineResult<()> {
    let normalized = NodeClassifier::normalize_name(operator);
    let parsed = OperatorParser::parse(&normalized, plan)?
        .ok_or_else(|| EngineError::invalid_input(format!("No parser for operator '{}'", operator)))?;
    println!("{}", serde_json::to_string_pretty(&parsed)?);
    Ok(())
}

fn run(cli: Cli) -> EngineResult<()> {
    let (config, origin) = Config::load(cli.config.as_deref())?;
    let _guard = init_logging(&config.logging)?;
    origin.log();

    match cli.command {
        Command::Analyze { input, output, deterministic_ids } => {
            analyze(&config, &input, output.as_deref(), deterministic_ids)
        },
        Command::Parse { operator, plan } => parse(&operator, &plan),
    }
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        },
    }
}
