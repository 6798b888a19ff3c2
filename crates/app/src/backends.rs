use async_trait::async_trait;
use doc_qa_core::{
    CharacterNgramEmbedder, CorpusIndex, EmbedError, Embedder, HttpEmbedder, IndexError,
    IndexHit, IndexedItem, MemoryIndex, QdrantIndex,
};

/// Embedder picked at startup from the CLI configuration.
pub enum ConfiguredEmbedder {
    Ngram(CharacterNgramEmbedder),
    Http(HttpEmbedder),
}

#[async_trait]
impl Embedder for ConfiguredEmbedder {
    fn dimensions(&self) -> usize {
        match self {
            Self::Ngram(embedder) => embedder.dimensions(),
            Self::Http(embedder) => embedder.dimensions(),
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        match self {
            Self::Ngram(embedder) => embedder.embed(text).await,
            Self::Http(embedder) => embedder.embed(text).await,
        }
    }
}

/// Corpus index picked at startup: a local snapshot file or a Qdrant collection.
pub enum ConfiguredIndex {
    Memory(MemoryIndex),
    Qdrant(QdrantIndex),
}

impl ConfiguredIndex {
    /// Flushes local state. Qdrant persists on insert.
    pub async fn persist(&self) -> Result<(), IndexError> {
        match self {
            Self::Memory(index) => index.persist().await,
            Self::Qdrant(_) => Ok(()),
        }
    }
}

#[async_trait]
impl CorpusIndex for ConfiguredIndex {
    async fn insert(&self, item: IndexedItem) -> Result<(), IndexError> {
        match self {
            Self::Memory(index) => index.insert(item).await,
            Self::Qdrant(index) => index.insert(item).await,
        }
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<IndexHit>, IndexError> {
        match self {
            Self::Memory(index) => index.query(vector, k).await,
            Self::Qdrant(index) => index.query(vector, k).await,
        }
    }
}
