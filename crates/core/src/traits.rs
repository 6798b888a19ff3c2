use crate::{IndexError, IndexHit, IndexedItem};
use async_trait::async_trait;

#[async_trait]
pub trait CorpusIndex {
    /// Inserting an id that already exists overwrites it.
    async fn insert(&self, item: IndexedItem) -> Result<(), IndexError>;

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<IndexHit>, IndexError>;
}
