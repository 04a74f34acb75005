//! stac-task - run STAC tasks over payloads from the command line.

mod tasks;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use stac_task_core::observability::{LogFormat, init_logging, parse_level};
use stac_task_core::{
    AppBuilder, BuildError, ConfigError, ErrorKind, Executor, ExecutorConfig, StacTaskError,
};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "stac-task")]
#[command(about = "Run STAC tasks over payloads")]
#[command(version)]
struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Log format (json, pretty, compact)
    #[arg(long, env = "LOG_FORMAT", default_value = "compact", global = true)]
    log_format: String,

    /// Root for working directories; they are preserved when set
    #[arg(long, value_name = "DIR", global = true)]
    workdir: Option<PathBuf>,

    /// Keep temporary working directories
    #[arg(long, global = true)]
    keep_workdir: bool,

    /// Items processed at the same time
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a task over a payload
    Run {
        /// Payload path or URL
        input: String,

        /// Task to run; defaults to the only registered task in the payload
        task: Option<String>,

        /// Where to write the output payload; printed to stdout when absent
        output: Option<String>,
    },
    /// List the available tasks
    List,
    /// Print the JSON schema of a task's input or output items
    Jsonschema {
        /// Task to describe; may be omitted when exactly one task is registered
        task: Option<String>,

        #[arg(value_enum, default_value_t = SchemaModel::Input)]
        model: SchemaModel,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SchemaModel {
    Input,
    Output,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Task(#[from] StacTaskError),

    #[error("cannot render JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    fn kind(&self) -> Option<ErrorKind> {
        match self {
            CliError::Task(e) => Some(e.kind()),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(parse_level(&cli.log_level), LogFormat::parse(&cli.log_format)) {
        eprintln!("failed to initialise logging: {e}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(kind = ?e.kind(), error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = executor_config(&cli)?;
    let executor = build_executor(config)?;

    match cli.command {
        Commands::Run {
            input,
            task,
            output,
        } => {
            let payload = executor
                .run(&input, task.as_deref(), output.as_deref())
                .await?;
            if output.is_none() {
                println!("{}", payload.to_string_pretty()?);
            }
            info!(features = payload.features.len(), "done");
        }
        Commands::List => {
            for line in task_listing(&executor) {
                println!("{line}");
            }
        }
        Commands::Jsonschema { task, model } => {
            let schema = task_schema(&executor, task.as_deref(), model)?;
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }
    Ok(())
}

fn task_schema(
    executor: &Executor,
    task: Option<&str>,
    model: SchemaModel,
) -> Result<serde_json::Value, CliError> {
    let registry = executor.registry();
    let name = match task {
        Some(name) => name.to_string(),
        None => match registry.names().as_slice() {
            [only] => only.clone(),
            _ => {
                return Err(StacTaskError::Configuration(
                    "TASK can only be omitted when exactly one task is registered".to_string(),
                )
                .into());
            }
        },
    };
    let task = registry.get(&name)?;
    let schema = match model {
        SchemaModel::Input => task.input_schema(),
        SchemaModel::Output => task.output_schema(),
    };
    Ok(serde_json::to_value(schema)?)
}

/// File values first, command-line flags on top.
fn executor_config(cli: &Cli) -> Result<ExecutorConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => ExecutorConfig::from_toml_file(path)?,
        None => ExecutorConfig::default(),
    };
    if let Some(workdir) = &cli.workdir {
        config.workdir = Some(workdir.clone());
    }
    if cli.keep_workdir {
        config.keep_workdir = true;
    }
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    Ok(config)
}

fn build_executor(config: ExecutorConfig) -> Result<Executor, CliError> {
    let builder = tasks::register_builtins(AppBuilder::new())?;
    Ok(builder
        .expect_tasks(tasks::BUILTIN_TASKS)
        .with_config(config)
        .build()?)
}

/// `name: first line of the description`, sorted by name.
fn task_listing(executor: &Executor) -> Vec<String> {
    let registry = executor.registry();
    registry
        .names()
        .into_iter()
        .map(|name| {
            let summary = registry
                .description(&name)
                .and_then(|d| d.lines().next())
                .unwrap_or_default();
            format!("{name}: {summary}")
        })
        .collect()
}
