pub mod catalog;
pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod generation;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod prompt;
pub mod router;
pub mod stores;
pub mod traits;

pub use catalog::FileCatalog;
pub use chunking::{chunk_text, normalize_whitespace, Chunker, ChunkingConfig};
pub use embeddings::{CharacterNgramEmbedder, Embedder, HttpEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{EmbedError, GenerateError, IndexError, IngestError, QueryError};
pub use extractor::{
    discover_documents, render_table, DocumentExtractor, ExtractedDocument, OcrEndpointConfig,
    PageText,
};
pub use generation::{Generator, HttpGenerator};
pub use ingest::{
    extraction_failure, index_segments, persist_upload, segment_document, text_preview,
    IndexingReport,
};
pub use models::{
    Answer, FileCategory, FileRecord, FileType, IndexHit, IndexedItem, IngestSummary,
    IngestionOptions, RouteMode, Segment, SegmentMetadata,
};
pub use orchestrator::{DocumentQa, Routed};
pub use prompt::{compose_prompt, NOT_IN_CONTEXT_ANSWER};
pub use router::{
    detect_file_category, format_source, route_mode, select_farthest, EMBEDDING_FAILURE_ANSWER,
    NO_FILE_OF_TYPE_ANSWER,
};
pub use stores::{MemoryIndex, QdrantIndex};
pub use traits::CorpusIndex;
