use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use voicemate::api::{ApiServer, ApiState};
use voicemate::{Config, KnowledgeIndexer};

/// VoiceMate - answer spoken questions about a knowledge base
#[derive(Parser)]
#[command(name = "voicemate", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Index the knowledge source into the vector store
    Index {
        /// Source document (defaults to `VOICEMATE_SOURCE` or data/info.txt)
        #[arg(short, long)]
        source: Option<PathBuf>,
    },
    /// Answer a spoken question from an audio file
    Ask {
        /// WAV or MP3 file
        audio: PathBuf,
        /// Where to write the spoken reply
        #[arg(short, long, default_value = "reply.wav")]
        out: PathBuf,
    },
    /// Answer a typed question (retrieval and generation only)
    Query {
        /// The question
        text: String,
    },
    /// Show the chunks retrieved for a question
    Retrieve {
        /// The question
        text: String,
        /// Number of chunks
        #[arg(short, default_value = "3")]
        k: usize,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity; RUST_LOG wins when set
    let filter = match cli.verbose {
        0 => "info,voicemate=info",
        1 => "info,voicemate=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => serve(config, port).await,
        Command::Index { source } => index(&config, source).await,
        Command::Ask { audio, out } => ask(&config, &audio, &out).await,
        Command::Query { text } => query(&config, &text).await,
        Command::Retrieve { text, k } => retrieve(&config, &text, k).await,
    }
}

async fn serve(config: Config, port: Option<u16>) -> anyhow::Result<()> {
    let port = port.unwrap_or(config.api_server.port);
    let pipeline = config.pipeline()?;

    tracing::info!(
        persona = %config.persona.id(),
        namespace = %config.retrieval.namespace,
        port,
        "starting voicemate"
    );

    ApiServer::new(ApiState::new(pipeline, config.memory()), port)
        .run()
        .await?;

    Ok(())
}

async fn index(config: &Config, source: Option<PathBuf>) -> anyhow::Result<()> {
    let source = source.unwrap_or_else(|| config.source_path.clone());
    let indexer = KnowledgeIndexer::new(
        config.embedder()?,
        config.open_index()?,
        config.retrieval.namespace.clone(),
    );

    let count = indexer.index_file(&source).await?;
    println!(
        "Indexed {count} chunks from {} into namespace '{}'",
        source.display(),
        config.retrieval.namespace
    );

    Ok(())
}

async fn ask(config: &Config, audio: &Path, out: &Path) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(audio).await?;
    let pipeline = config.pipeline()?;
    let mut memory = config.memory();

    let reply = pipeline.process(&bytes, &mut memory).await;
    println!("{}", reply.text);

    if reply.audio.is_empty() {
        eprintln!("(no audio produced)");
    } else {
        tokio::fs::write(out, &reply.audio).await?;
        eprintln!("Wrote {} bytes to {}", reply.audio.len(), out.display());
    }

    Ok(())
}

async fn query(config: &Config, text: &str) -> anyhow::Result<()> {
    let answerer = config.answerer()?;
    let mut memory = config.memory();

    let answer = answerer.answer(text, &mut memory).await;
    println!("{answer}");

    Ok(())
}

async fn retrieve(config: &Config, text: &str, k: usize) -> anyhow::Result<()> {
    let retriever = config.retriever(config.embedder()?, config.open_index()?);

    let results = retriever.retrieve(text, k).await?;
    if results.is_empty() {
        println!("No matching chunks in namespace '{}'", retriever.namespace());
    }
    for result in results {
        println!("[{:.4}] {}", result.score, result.chunk.id);
        println!("{}\n", result.chunk.text);
    }

    Ok(())
}
