mod backends;

use anyhow::Context;
use backends::{ConfiguredEmbedder, ConfiguredIndex};
use chrono::Utc;
use clap::{Parser, Subcommand};
use doc_qa_core::{
    discover_documents, CharacterNgramEmbedder, Chunker, ChunkingConfig, DocumentExtractor,
    DocumentQa, FileType, HttpEmbedder, HttpGenerator, IngestSummary, IngestionOptions,
    MemoryIndex, QdrantIndex,
};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "doc-qa", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Maximum segment size in characters
    #[arg(long, default_value = "1000")]
    chunk_max_chars: usize,

    /// Overlap budget; a tenth of it, rounded up, is carried over as words
    #[arg(long, default_value = "200")]
    chunk_overlap: usize,

    /// Embedding endpoint; the built-in trigram embedder is used when unset
    #[arg(long, env = "EMBEDDING_ENDPOINT")]
    embedding_endpoint: Option<String>,

    /// Bearer token for the embedding endpoint
    #[arg(long, env = "EMBEDDING_API_KEY", hide_env_values = true)]
    embedding_api_key: Option<String>,

    /// Embedding vector size
    #[arg(long, env = "EMBEDDING_DIMENSIONS", default_value = "128")]
    embedding_dimensions: usize,

    /// Generation endpoint used to answer questions
    #[arg(long, env = "GENERATION_ENDPOINT")]
    generation_endpoint: Option<String>,

    /// Bearer token for the generation endpoint
    #[arg(long, env = "GENERATION_API_KEY", hide_env_values = true)]
    generation_api_key: Option<String>,

    /// Qdrant base URL; a local snapshot index is used when unset
    #[arg(long, env = "QDRANT_URL")]
    qdrant_url: Option<String>,

    /// Qdrant collection
    #[arg(long, env = "QDRANT_COLLECTION", default_value = "documents")]
    qdrant_collection: String,

    /// Snapshot file for the local index
    #[arg(long, env = "DOC_QA_INDEX_PATH", default_value = ".doc-qa/index.json")]
    index_path: PathBuf,

    /// Directory uploaded files are copied into
    #[arg(long, default_value = "uploads")]
    uploads_dir: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Extract one file and print the segments it would be indexed as.
    Chunk {
        /// File to segment.
        #[arg(long)]
        file: PathBuf,
    },
    /// Ingest files, then answer questions about them.
    Ask {
        /// File to ingest; repeat for several.
        #[arg(long = "file")]
        files: Vec<PathBuf>,
        /// Folder whose supported files are ingested recursively.
        #[arg(long)]
        folder: Option<PathBuf>,
        /// Question to answer; repeat for several. Reads stdin lines when absent.
        #[arg(long = "question")]
        questions: Vec<String>,
        /// Read files where they are instead of copying them into the uploads dir.
        #[arg(long, default_value_t = false)]
        in_place: bool,
    },
}

impl Cli {
    fn ingestion_options(&self) -> IngestionOptions {
        IngestionOptions {
            chunk_max_chars: self.chunk_max_chars,
            chunk_overlap: self.chunk_overlap,
            uploads_dir: self.uploads_dir.clone(),
            ..IngestionOptions::default()
        }
    }

    fn embedder(&self) -> anyhow::Result<ConfiguredEmbedder> {
        Ok(match &self.embedding_endpoint {
            Some(endpoint) => ConfiguredEmbedder::Http(HttpEmbedder::new(
                endpoint,
                self.embedding_api_key.clone(),
                self.embedding_dimensions,
            )?),
            None => ConfiguredEmbedder::Ngram(CharacterNgramEmbedder {
                dimensions: self.embedding_dimensions,
            }),
        })
    }

    async fn index(&self) -> anyhow::Result<ConfiguredIndex> {
        Ok(match &self.qdrant_url {
            Some(url) => {
                let index = QdrantIndex::new(url, &self.qdrant_collection, self.embedding_dimensions)?;
                index.ensure_collection().await?;
                ConfiguredIndex::Qdrant(index)
            }
            None => ConfiguredIndex::Memory(MemoryIndex::open(&self.index_path).await?),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "doc-qa boot"
    );

    match &cli.command {
        Command::Chunk { file } => print_segments(&cli, file).await,
        Command::Ask {
            files,
            folder,
            questions,
            in_place,
        } => ask(&cli, files, folder.as_deref(), questions, *in_place).await,
    }
}

async fn print_segments(cli: &Cli, file: &Path) -> anyhow::Result<()> {
    let filename = file
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("path has no file name: {}", file.display()))?;
    let chunker = Chunker::new(ChunkingConfig::from(&cli.ingestion_options()))?;

    let extracted = DocumentExtractor::from_env()
        .extract(file, &FileType::from_filename(filename))
        .await?;

    let mut count = 0usize;
    for page in &extracted.pages {
        for segment in chunker.chunk(&page.text, filename, page.number) {
            println!(
                "[page {} chunk {}] {} chars",
                segment.page,
                segment.chunk_index,
                segment.text.chars().count()
            );
            println!("{}\n", segment.text);
            count += 1;
        }
    }

    println!("{count} segments from {filename}");
    Ok(())
}

async fn ask(
    cli: &Cli,
    files: &[PathBuf],
    folder: Option<&Path>,
    questions: &[String],
    in_place: bool,
) -> anyhow::Result<()> {
    let endpoint = cli
        .generation_endpoint
        .as_deref()
        .context("GENERATION_ENDPOINT (or --generation-endpoint) is required to answer questions")?;
    let generator = HttpGenerator::new(endpoint, cli.generation_api_key.clone())?;

    let qa = DocumentQa::new(
        cli.embedder()?,
        generator,
        cli.index().await?,
        cli.ingestion_options(),
    )?
    .with_extractor(DocumentExtractor::from_env());

    let mut paths = files.to_vec();
    if let Some(folder) = folder {
        paths.extend(discover_documents(folder));
    }

    for path in &paths {
        let summary = if in_place {
            qa.ingest_path(path).await.map_err(anyhow::Error::from)
        } else {
            ingest_copy(&qa, path).await
        };

        match summary {
            Ok(summary) => print_summary(&summary),
            Err(error) => warn!(path = %path.display(), %error, "skipped file"),
        }
    }

    qa.index().persist().await?;
    info!(files = qa.file_count().await, "ingestion finished");

    if questions.is_empty() {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            answer(&qa, &line).await?;
        }
    } else {
        for question in questions {
            answer(&qa, question).await?;
        }
    }

    Ok(())
}

async fn ingest_copy(
    qa: &DocumentQa<ConfiguredEmbedder, HttpGenerator, ConfiguredIndex>,
    path: &Path,
) -> anyhow::Result<IngestSummary> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("path has no file name: {}", path.display()))?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(qa.ingest_upload(filename, &bytes).await?)
}

fn print_summary(summary: &IngestSummary) {
    println!(
        "{} {} type={} chunks={}",
        summary.file_id, summary.filename, summary.file_type, summary.chunk_count
    );
    if !summary.text_preview.is_empty() {
        println!("  preview: {}", summary.text_preview);
    }
}

async fn answer(
    qa: &DocumentQa<ConfiguredEmbedder, HttpGenerator, ConfiguredIndex>,
    question: &str,
) -> anyhow::Result<()> {
    let answer = qa.answer_question(question).await?;
    println!("question: {question}");
    println!("answer: {}", answer.answer);
    if !answer.source.is_empty() {
        println!("source: {}", answer.source);
    }
    println!();
    Ok(())
}
