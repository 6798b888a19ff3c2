use crate::traits::CorpusIndex;
use crate::{IndexError, IndexHit, IndexedItem};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    items: Vec<IndexedItem>,
}

#[derive(Debug, Default)]
struct Items {
    ordered: Vec<IndexedItem>,
    positions: HashMap<String, usize>,
}

impl Items {
    fn upsert(&mut self, item: IndexedItem) {
        match self.positions.get(&item.id) {
            Some(&position) => self.ordered[position] = item,
            None => {
                self.positions.insert(item.id.clone(), self.ordered.len());
                self.ordered.push(item);
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryIndex {
    items: RwLock<Items>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, IndexError> {
        let path = path.into();
        let mut items = Items::default();

        if tokio::fs::try_exists(&path).await? {
            let raw = tokio::fs::read(&path).await?;
            let snapshot: Snapshot = serde_json::from_slice(&raw)?;
            for item in snapshot.items {
                items.upsert(item);
            }
            debug!(path = %path.display(), items = items.ordered.len(), "loaded index snapshot");
        }

        Ok(Self {
            items: RwLock::new(items),
            snapshot_path: Some(path),
        })
    }

    pub async fn persist(&self) -> Result<(), IndexError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let items = self.items.read().await;
        let snapshot = Snapshot {
            items: items.ordered.clone(),
        };
        write_snapshot(path, &serde_json::to_vec(&snapshot)?).await?;
        debug!(path = %path.display(), items = snapshot.items.len(), "persisted index snapshot");
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.ordered.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn euclidean_distance(a: &[f32], b: &[f32]) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| {
                let delta = f64::from(*x) - f64::from(*y);
                delta * delta
            })
            .sum::<f64>()
            .sqrt()
    }
}

async fn write_snapshot(path: &Path, bytes: &[u8]) -> Result<(), IndexError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

#[async_trait]
impl CorpusIndex for MemoryIndex {
    async fn insert(&self, item: IndexedItem) -> Result<(), IndexError> {
        let mut items = self.items.write().await;
        if let Some(existing) = items.ordered.first() {
            if existing.vector.len() != item.vector.len() {
                return Err(IndexError::Dimension {
                    expected: existing.vector.len(),
                    actual: item.vector.len(),
                });
            }
        }
        items.upsert(item);
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<IndexHit>, IndexError> {
        let items = self.items.read().await;
        if let Some(existing) = items.ordered.first() {
            if existing.vector.len() != vector.len() {
                return Err(IndexError::Dimension {
                    expected: existing.vector.len(),
                    actual: vector.len(),
                });
            }
        }

        let mut scored = items
            .ordered
            .iter()
            .map(|item| (Self::euclidean_distance(&item.vector, vector), item))
            .collect::<Vec<_>>();

        // stable sort keeps insertion order among equal distances
        scored.sort_by(|left, right| left.0.total_cmp(&right.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(distance, item)| IndexHit {
                id: item.id.clone(),
                text: item.text.clone(),
                metadata: item.metadata.clone(),
                distance,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FileType, SegmentMetadata};
    use tempfile::tempdir;

    fn item(id: &str, vector: Vec<f32>) -> IndexedItem {
        IndexedItem {
            id: id.to_string(),
            vector,
            text: format!("text of {id}"),
            metadata: SegmentMetadata {
                file_id: "abcd0123".to_string(),
                filename: "a.txt".to_string(),
                page: 1,
                chunk_index: 0,
                total_chunks: 1,
                file_type: FileType::Txt,
            },
        }
    }

    #[tokio::test]
    async fn query_returns_nearest_first_up_to_k() -> Result<(), IndexError> {
        let index = MemoryIndex::new();
        index.insert(item("far", vec![10.0, 0.0])).await?;
        index.insert(item("near", vec![1.0, 0.0])).await?;
        index.insert(item("mid", vec![4.0, 0.0])).await?;

        let hits = index.query(&[0.0, 0.0], 2).await?;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "near");
        assert_eq!(hits[1].id, "mid");
        assert!((hits[1].distance - 4.0).abs() < 1e-9);
        Ok(())
    }

    #[tokio::test]
    async fn insert_overwrites_existing_id() -> Result<(), IndexError> {
        let index = MemoryIndex::new();
        index.insert(item("a", vec![1.0])).await?;
        let mut replacement = item("a", vec![2.0]);
        replacement.text = "replaced".to_string();
        index.insert(replacement).await?;

        assert_eq!(index.len().await, 1);
        let hits = index.query(&[2.0], 3).await?;
        assert_eq!(hits[0].text, "replaced");
        Ok(())
    }

    #[tokio::test]
    async fn mismatched_dimensions_are_rejected() -> Result<(), IndexError> {
        let index = MemoryIndex::new();
        index.insert(item("a", vec![1.0, 2.0])).await?;

        assert!(index.insert(item("b", vec![1.0])).await.is_err());
        assert!(index.query(&[1.0, 2.0, 3.0], 1).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn snapshot_survives_reopen() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("index.json");

        let index = MemoryIndex::open(&path).await?;
        assert!(index.is_empty().await);
        index.insert(item("kept", vec![0.5, 0.5])).await?;
        index.persist().await?;

        let reopened = MemoryIndex::open(&path).await?;
        let hits = reopened.query(&[0.5, 0.5], 3).await?;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "kept");
        Ok(())
    }
}
