use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use docqa::{config, logging, rag::QaService};

#[derive(Parser)]
#[command(
    name = "docqa-cli",
    about = "Index documents and ask questions without running the HTTP server"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store and index a document, replacing the one indexed before.
    Ingest {
        /// Path of a `.pdf`, `.txt`, or `.md` file.
        path: PathBuf,
    },
    /// Answer a question from the indexed documents.
    Ask {
        /// Question text.
        question: String,
        /// Print the answer as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    config::init_config();
    logging::init_tracing();
    let service = QaService::from_config(config::get_config())
        .await
        .context("failed to open vector index")?;

    match cli.command {
        Command::Ingest { path } => ingest(&service, &path).await?,
        Command::Ask { question, json } => {
            let answer = service.answer_question(&question).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            } else {
                println!("{}", answer.answer);
                for (index, source) in answer.sources.iter().enumerate() {
                    println!("  [{}] {}", index + 1, source);
                }
            }
        }
    }
    Ok(())
}

async fn ingest(service: &QaService, path: &Path) -> Result<()> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("{} has no usable file name", path.display()))?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let outcome = service
        .ingest_upload(filename, bytes)
        .await
        .with_context(|| format!("failed to ingest {}", path.display()))?;
    println!(
        "{}: {} chunks indexed ({} repeated chunks skipped)",
        outcome.filename, outcome.inserted, outcome.skipped_duplicates
    );
    Ok(())
}
