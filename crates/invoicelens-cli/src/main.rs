use std::env;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use invoicelens_contracts::config::{AppConfig, INVOICE_INSTRUCTION};
use invoicelens_contracts::error::ConfigError;
use invoicelens_engine::{GeminiModel, MongoRecordStore, Orchestrator};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

mod page;

use page::{chat_loop, run_once, Page, SubmitReport};

const EXIT_UPSTREAM: i32 = 1;
const EXIT_CONFIG: i32 = 2;
const EXIT_REJECTED: i32 = 3;

#[derive(Debug, Parser)]
#[command(
    name = "invoicelens",
    version,
    about = "Ask Gemini questions about an invoice image and keep the answers in MongoDB"
)]
struct Cli {
    /// Overrides GEMINI_MODEL.
    #[arg(long, global = true)]
    model: Option<String>,
    /// Overrides MONGO_DATABASE.
    #[arg(long, global = true)]
    database: Option<String>,
    /// Overrides MONGO_COLLECTION.
    #[arg(long, global = true)]
    collection: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive page on stdin/stdout.
    Chat,
    /// Submit one prompt and image, then exit.
    Run(RunArgs),
}

#[derive(Debug, Parser)]
struct RunArgs {
    #[arg(long, default_value = "")]
    prompt: String,
    #[arg(long)]
    image: Option<PathBuf>,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("invoicelens error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let dotenv = dotenvy::dotenv();
    init_tracing();
    match dotenv {
        Ok(path) => debug!(path = %path.display(), ".env loaded"),
        Err(err) => debug!("no .env loaded: {err}"),
    }

    let mut stdout = io::stdout().lock();
    let upstreams = match startup(&cli, |key| env::var(key).ok(), &mut stdout)? {
        Ok(upstreams) => upstreams,
        Err(code) => return Ok(code),
    };
    let Upstreams { model, store } = upstreams;
    let mut orchestrator = Orchestrator::new(&model, &store, INVOICE_INSTRUCTION);
    let mut page = Page::new(stdout);

    match cli.command {
        Command::Chat => {
            chat_loop(&mut page, &mut orchestrator, io::stdin().lock())?;
            Ok(0)
        }
        Command::Run(args) => {
            let report = run_once(
                &mut page,
                &mut orchestrator,
                &args.prompt,
                args.image.as_deref(),
            )?;
            Ok(exit_code(report))
        }
    }
}

struct Upstreams {
    model: GeminiModel,
    store: MongoRecordStore,
}

/// Loads configuration and opens both upstream handles. Any failure is
/// written to `out` as a banner and turned into the exit code, before the
/// page is drawn.
fn startup<F, W>(cli: &Cli, lookup: F, out: &mut W) -> io::Result<Result<Upstreams, i32>>
where
    F: Fn(&str) -> Option<String>,
    W: Write,
{
    let config = match load_config(cli, lookup) {
        Ok(config) => config,
        Err(err) => return halt(out, err).map(Err),
    };
    info!(?config, "configuration loaded");

    let model = match GeminiModel::new(&config) {
        Ok(model) => model,
        Err(err) => return halt(out, err).map(Err),
    };
    let store = match MongoRecordStore::connect(&config) {
        Ok(store) => store,
        Err(err) => return halt(out, err).map(Err),
    };
    Ok(Ok(Upstreams { model, store }))
}

fn load_config<F>(cli: &Cli, lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = AppConfig::from_lookup(lookup)?;
    if let Some(model) = cli.model.as_deref().filter(|value| !value.trim().is_empty()) {
        config.gemini_model = model.trim().to_string();
    }
    if let Some(database) = cli.database.as_deref().filter(|value| !value.trim().is_empty()) {
        config.database = database.trim().to_string();
    }
    if let Some(collection) = cli
        .collection
        .as_deref()
        .filter(|value| !value.trim().is_empty())
    {
        config.collection = collection.trim().to_string();
    }
    Ok(config)
}

fn halt<W: Write>(out: &mut W, err: ConfigError) -> io::Result<i32> {
    error!("startup halted: {err}");
    writeln!(out, "[error] {err}")?;
    Ok(EXIT_CONFIG)
}

fn exit_code(report: Option<SubmitReport>) -> i32 {
    match report {
        Some(SubmitReport::Saved) => 0,
        Some(SubmitReport::Failed) => EXIT_UPSTREAM,
        Some(SubmitReport::Rejected) | None => EXIT_REJECTED,
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("invoicelens=info,invoicelens_engine=info")),
        )
        .with_writer(io::stderr)
        .init();
}
