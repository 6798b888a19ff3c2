use crate::catalog::FileCatalog;
use crate::chunking::{ChunkingConfig, Chunker};
use crate::embeddings::Embedder;
use crate::extractor::{DocumentExtractor, ExtractedDocument};
use crate::generation::Generator;
use crate::ingest::{extraction_failure, index_segments, persist_upload, segment_document, text_preview};
use crate::prompt::compose_prompt;
use crate::router::{
    format_source, route_mode, select_farthest, EMBEDDING_FAILURE_ANSWER, NO_FILE_OF_TYPE_ANSWER,
};
use crate::traits::CorpusIndex;
use crate::{
    Answer, FileCategory, FileRecord, FileType, IngestError, IngestSummary, IngestionOptions,
    QueryError, RouteMode,
};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    Context {
        mode: RouteMode,
        context: String,
        source: String,
    },
    ShortCircuit(Answer),
}

/// Ingestion and question answering over one catalog and one corpus index.
///
/// The file catalog sits behind a single-writer lock, so uploads may be
/// ingested concurrently. Embedding and generation calls run outside the
/// lock.
pub struct DocumentQa<E, G, I>
where
    E: Embedder,
    G: Generator,
    I: CorpusIndex,
{
    embedder: E,
    generator: G,
    index: I,
    extractor: DocumentExtractor,
    chunker: Chunker,
    options: IngestionOptions,
    catalog: RwLock<FileCatalog>,
}

impl<E, G, I> DocumentQa<E, G, I>
where
    E: Embedder + Send + Sync,
    G: Generator + Send + Sync,
    I: CorpusIndex + Send + Sync,
{
    pub fn new(
        embedder: E,
        generator: G,
        index: I,
        options: IngestionOptions,
    ) -> Result<Self, IngestError> {
        Ok(Self {
            embedder,
            generator,
            index,
            extractor: DocumentExtractor::default(),
            chunker: Chunker::new(ChunkingConfig::from(&options))?,
            options,
            catalog: RwLock::new(FileCatalog::new()),
        })
    }

    pub fn with_extractor(mut self, extractor: DocumentExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn options(&self) -> &IngestionOptions {
        &self.options
    }

    pub async fn lookup(&self, file_id: &str) -> Option<FileRecord> {
        self.catalog.read().await.lookup(file_id).cloned()
    }

    pub async fn file_count(&self) -> usize {
        self.catalog.read().await.len()
    }

    pub async fn ingest(
        &self,
        filename: &str,
        stored_path: PathBuf,
        extracted: Result<ExtractedDocument, IngestError>,
    ) -> Result<IngestSummary, IngestError> {
        let file_id = self.catalog.write().await.reserve_file_id();
        self.ingest_as(file_id, filename, stored_path, extracted).await
    }

    pub async fn ingest_upload(
        &self,
        filename: &str,
        bytes: &[u8],
    ) -> Result<IngestSummary, IngestError> {
        let file_id = self.catalog.write().await.reserve_file_id();
        let stored_path =
            persist_upload(&self.options.uploads_dir, &file_id, filename, bytes).await?;
        let extracted = self
            .extractor
            .extract(&stored_path, &FileType::from_filename(filename))
            .await;
        self.ingest_as(file_id, filename, stored_path, extracted).await
    }

    pub async fn ingest_path(&self, path: &Path) -> Result<IngestSummary, IngestError> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))?;
        let extracted = self
            .extractor
            .extract(path, &FileType::from_filename(filename))
            .await;
        self.ingest(filename, path.to_path_buf(), extracted).await
    }

    async fn ingest_as(
        &self,
        file_id: String,
        filename: &str,
        stored_path: PathBuf,
        extracted: Result<ExtractedDocument, IngestError>,
    ) -> Result<IngestSummary, IngestError> {
        let file_type = FileType::from_filename(filename);

        let (full_text, segments) = match extracted {
            Ok(document) => {
                let segments = segment_document(filename, &document, &self.chunker);
                (document.full_text, segments)
            }
            Err(error) => {
                warn!(file_id = %file_id, filename, %error, "extraction failed, storing error text");
                extraction_failure(filename, &error)
            }
        };

        let report = index_segments(
            &self.embedder,
            &self.index,
            &file_id,
            &file_type,
            &segments,
            self.options.min_segment_chars,
        )
        .await?;

        let summary = IngestSummary {
            file_id: file_id.clone(),
            filename: filename.to_string(),
            file_type: file_type.clone(),
            chunk_count: segments.len(),
            text_preview: text_preview(&segments, self.options.preview_chars),
        };

        self.catalog.write().await.register(FileRecord {
            file_id,
            filename: filename.to_string(),
            stored_path,
            file_type,
            full_text,
            segments,
            ingested_at: Utc::now(),
        });

        info!(
            file_id = %summary.file_id,
            filename,
            file_type = %summary.file_type,
            chunk_count = summary.chunk_count,
            indexed = report.indexed,
            skipped = report.skipped,
            "file ingested"
        );
        Ok(summary)
    }

    pub async fn route(&self, question: &str) -> Result<Routed, QueryError> {
        let question = question.trim();
        let mode = route_mode(question);
        debug!(?mode, "question routed");

        match mode {
            RouteMode::TypeDirected(category) => Ok(self.route_to_file(category).await),
            RouteMode::Semantic => self.route_semantic(question).await,
        }
    }

    async fn route_to_file(&self, category: FileCategory) -> Routed {
        let catalog = self.catalog.read().await;
        match catalog.find_first_by_type(category) {
            Some(record) if !record.full_text.is_empty() => Routed::Context {
                mode: RouteMode::TypeDirected(category),
                context: record.full_text.clone(),
                source: record.filename.clone(),
            },
            _ => {
                debug!(category = category.as_str(), "no file of requested type");
                Routed::ShortCircuit(Answer {
                    context: String::new(),
                    answer: NO_FILE_OF_TYPE_ANSWER.to_string(),
                    source: String::new(),
                })
            }
        }
    }

    async fn route_semantic(&self, question: &str) -> Result<Routed, QueryError> {
        let vector = match self.embedder.embed(question).await {
            Ok(vector) => vector,
            Err(error) => {
                warn!(%error, "question embedding failed");
                return Ok(Routed::ShortCircuit(Answer {
                    context: String::new(),
                    answer: EMBEDDING_FAILURE_ANSWER.to_string(),
                    source: String::new(),
                }));
            }
        };

        let hits = self
            .index
            .query(&vector, self.options.retrieval_top_k)
            .await?;

        let (context, source) = match select_farthest(&hits) {
            Some(hit) => (
                hit.text.clone(),
                format_source(&hit.metadata.filename, hit.metadata.page),
            ),
            None => (String::new(), String::new()),
        };

        Ok(Routed::Context {
            mode: RouteMode::Semantic,
            context,
            source,
        })
    }

    pub async fn answer_question(&self, question: &str) -> Result<Answer, QueryError> {
        match self.route(question).await? {
            Routed::ShortCircuit(answer) => Ok(answer),
            Routed::Context {
                mode,
                context,
                source,
            } => {
                let prompt = compose_prompt(mode, &context, question);
                let answer = self.generator.generate(&prompt).await?;
                Ok(Answer {
                    context,
                    answer,
                    source,
                })
            }
        }
    }
}
