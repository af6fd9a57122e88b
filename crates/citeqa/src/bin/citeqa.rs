//! citeqa command line: build a corpus, ask questions, chat, or serve HTTP
//!
//! Run with: cargo run -p citeqa -- ask "Where does Alice live?" --data ./docs

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use citeqa::config::VectorBackend;
use citeqa::generation::format_citation_list;
use citeqa::server::RagServer;
use citeqa::{
    DocumentSource, IngestReport, IngestStatus, QueryResult, RagConfig, RagPipeline, SearchHit,
};

/// Document question answering with page-level citations
#[derive(Parser, Debug)]
#[command(name = "citeqa", version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to $CITEQA_CONFIG, then built-in defaults)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest files or directories into the vector index
    Ingest {
        /// Files or directories (searched recursively)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Answer one question
    Ask {
        question: String,

        /// Directory to ingest before answering
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Candidates per phrasing
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Query with the original question only
        #[arg(long)]
        no_expansion: bool,
    },
    /// List the chunks the index returns for a query, without asking the model
    Search {
        query: String,

        /// Hits to list
        #[arg(short, long, default_value_t = 20)]
        k: usize,

        /// Directory to ingest before searching
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
    /// Interactive question loop; `exit` or `quit` ends it
    Chat {
        /// Directory to ingest before the first question
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
    /// Run the HTTP server
    Serve {
        /// Directory to ingest before serving
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "citeqa=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = RagConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Command::Ingest { paths } => {
            if config.vector_store.backend == VectorBackend::Memory {
                tracing::warn!(
                    "The memory index is discarded on exit; pass --data to ask/chat/serve or configure the chroma backend"
                );
            }
            let pipeline = RagPipeline::from_config(config)?;
            let sources = collect_sources(&paths);
            let report = pipeline.ingest_batch(sources).await?;
            print_report(&report);
        }
        Command::Ask {
            question,
            data,
            top_k,
            no_expansion,
        } => {
            let pipeline = RagPipeline::from_config(config)?;
            load_corpus(&pipeline, data.as_deref()).await?;

            let retrieval = &pipeline.config().retrieval;
            let top_k = top_k.unwrap_or(retrieval.top_k);
            let expansion = retrieval.query_expansion && !no_expansion;
            let result = pipeline.ask_with(&question, top_k, expansion).await;
            print_result(&result);
        }
        Command::Search { query, k, data } => {
            let pipeline = RagPipeline::from_config(config)?;
            load_corpus(&pipeline, data.as_deref()).await?;
            let hits = pipeline.search(&query, k).await?;
            print_hits(&hits);
        }
        Command::Chat { data } => {
            let pipeline = RagPipeline::from_config(config)?;
            load_corpus(&pipeline, data.as_deref()).await?;
            chat(&pipeline).await?;
        }
        Command::Serve { data, port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            let pipeline = RagPipeline::from_config(config)?;
            load_corpus(&pipeline, data.as_deref()).await?;

            let server = RagServer::new(pipeline);
            println!("citeqa listening on http://{}", server.address());
            println!("  POST /api/ask      - Ask a question");
            println!("  POST /api/ingest   - Upload documents");
            println!("  GET  /api/history  - Recent questions");
            println!("  GET  /api/search   - Raw index hits");
            println!("  GET  /health       - Index and model status");
            server.start().await?;
        }
    }

    Ok(())
}

/// Expand directories into their supported documents; files are taken as given
fn collect_sources(paths: &[PathBuf]) -> Vec<DocumentSource> {
    paths
        .iter()
        .flat_map(|path| {
            if path.is_dir() {
                DocumentSource::discover(path)
            } else {
                vec![DocumentSource::from_path(path)]
            }
        })
        .collect()
}

async fn load_corpus(pipeline: &RagPipeline, data: Option<&Path>) -> anyhow::Result<()> {
    let Some(dir) = data else {
        return Ok(());
    };

    let sources = DocumentSource::discover(dir);
    if sources.is_empty() {
        tracing::warn!("No supported documents under {}", dir.display());
        return Ok(());
    }

    tracing::info!("Building knowledge base from {} documents in {}", sources.len(), dir.display());
    let report = pipeline
        .ingest_batch(sources)
        .await
        .with_context(|| format!("ingesting {}", dir.display()))?;
    tracing::info!(
        "Knowledge base ready: {} chunks, {} documents skipped",
        report.total_chunks,
        report.failed_count()
    );
    Ok(())
}

async fn chat(pipeline: &RagPipeline) -> anyhow::Result<()> {
    println!("Ask questions about your documents. Type 'exit' or 'quit' to leave.");
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\nQuestion: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }
        if question.is_empty() {
            continue;
        }

        let result = pipeline.ask(question).await;
        print_result(&result);
    }

    Ok(())
}

fn print_result(result: &QueryResult) {
    println!("\nAnswer:\n{}", result.answer);
    println!("\nSources:\n{}", format_citation_list(&result.citations));
}

fn print_hits(hits: &[SearchHit]) {
    if hits.is_empty() {
        println!("No chunks found.");
        return;
    }
    for hit in hits {
        println!("{:>3}. {} (similarity {:.3})", hit.rank, hit.citation, hit.similarity);
        println!("     {}", hit.preview.replace('\n', " "));
    }
}

fn print_report(report: &IngestReport) {
    for doc in &report.documents {
        let kind = doc.kind.map(|k| k.display_name()).unwrap_or("Unknown");
        match &doc.status {
            IngestStatus::Indexed => println!(
                "{} [{}]: {} units, {} chunks",
                doc.source_id, kind, doc.units, doc.chunks
            ),
            IngestStatus::Empty => println!("{} [{}]: no text found", doc.source_id, kind),
            IngestStatus::Failed(message) => {
                println!("{} [{}]: skipped ({})", doc.source_id, kind, message)
            }
        }
    }
    println!(
        "Indexed {} chunks from {} documents ({} skipped)",
        report.total_chunks,
        report.documents.len(),
        report.failed_count()
    );
}
