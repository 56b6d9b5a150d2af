//! CLI entry point for the PaperSage backend (for dev and scripting).

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use papersage_core::{
    app_data_dir, load_config, status, ArxivHarvester, CatalogEntry, Config, HttpFetcher,
    JsonCatalog, Library, OllamaClient, Pipeline, PipelineError, PipelineOptions,
};
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "papersage")]
#[command(about = "PaperSage: ask questions about research papers")]
struct Cli {
    /// Log level used when RUST_LOG is not set.
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show backend status (for dev).
    Status,
    /// Show where PaperSage stores its config and catalog.
    DataDir,
    /// Print the effective config.
    Config,
    /// List papers on a topic, fetching from arXiv when none are stored.
    Papers {
        topic: String,
        /// Earliest publication year (inclusive).
        #[arg(long)]
        from: Option<i32>,
        /// Latest publication year (inclusive).
        #[arg(long)]
        to: Option<i32>,
    },
    /// Add a paper to the catalog.
    AddPaper {
        #[arg(long)]
        title: String,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        topic: String,
        #[arg(long)]
        url: String,
    },
    /// Answer a question about one paper (URL or title).
    Ask {
        paper: String,
        question: String,
        /// Chunks retrieved as context.
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Answer a question about each of several papers.
    AskMany {
        question: String,
        #[arg(required = true)]
        papers: Vec<String>,
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Summarize one or more papers.
    Summarize {
        #[arg(required = true)]
        papers: Vec<String>,
    },
    /// Suggest future work based on one or more papers.
    Ideas {
        #[arg(required = true)]
        papers: Vec<String>,
    },
}

#[derive(Serialize)]
struct IdeasOutput {
    future_work_ideas: String,
}

fn setup_logging(log_level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();
}

fn open_library(config: &Config, client: &Arc<OllamaClient>) -> Result<Library, PipelineError> {
    let catalog = match config.catalog_path() {
        Some(path) => JsonCatalog::open(&path)?,
        None => JsonCatalog::open_default()?,
    };
    let harvester = ArxivHarvester::new(config.fetch_timeout())?;
    Ok(
        Library::new(Arc::new(catalog), client.clone(), config.match_threshold)
            .with_harvester(Arc::new(harvester)),
    )
}

fn build_pipeline(config: &Config) -> Result<(Pipeline, Library), Box<dyn std::error::Error>> {
    let client = Arc::new(OllamaClient::from_config(config)?);
    let library = open_library(config, &client)?;
    let fetcher = HttpFetcher::new(config.fetch_timeout())?;
    let pipeline = Pipeline::new(client.clone(), client, Arc::new(fetcher))
        .with_library(library.clone())
        .with_options(PipelineOptions::from(config));
    Ok((pipeline, library))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config();
    match command {
        Commands::Status => {
            println!("PaperSage backend");
            println!("  core: {}", status());
        }
        Commands::DataDir => match app_data_dir() {
            Some(p) => println!("{}", p.display()),
            None => eprintln!("Could not determine app data directory."),
        },
        Commands::Config => print_json(&config)?,
        Commands::Papers { topic, from, to } => {
            let (_, library) = build_pipeline(&config)?;
            let papers = library.get_papers(&topic, from, to).await?;
            print_json(&papers)?;
        }
        Commands::AddPaper {
            title,
            year,
            topic,
            url,
        } => {
            let (_, library) = build_pipeline(&config)?;
            library
                .add_paper(CatalogEntry {
                    title,
                    year,
                    topic,
                    url,
                })
                .await?;
            println!("Added.");
        }
        Commands::Ask { paper, question, k } => {
            let (pipeline, _) = build_pipeline(&config)?;
            print_json(&pipeline.answer_question(&paper, &question, k).await?)?;
        }
        Commands::AskMany {
            question,
            papers,
            k,
        } => {
            let (pipeline, _) = build_pipeline(&config)?;
            print_json(&pipeline.answer_across_papers(&question, &papers, k).await?)?;
        }
        Commands::Summarize { papers } => {
            let (pipeline, _) = build_pipeline(&config)?;
            print_json(&pipeline.summarize_across_papers(&papers).await?)?;
        }
        Commands::Ideas { papers } => {
            let (pipeline, _) = build_pipeline(&config)?;
            let future_work_ideas = pipeline.generate_future_work_ideas(&papers).await?;
            print_json(&IdeasOutput { future_work_ideas })?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    match run(cli.command.unwrap_or(Commands::Status)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
