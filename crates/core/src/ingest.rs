use crate::chunking::Chunker;
use crate::embeddings::Embedder;
use crate::extractor::ExtractedDocument;
use crate::traits::CorpusIndex;
use crate::{FileType, IndexedItem, IngestError, Segment, SegmentMetadata};
use std::path::{Path, PathBuf};
use tracing::warn;

pub async fn persist_upload(
    uploads_dir: &Path,
    file_id: &str,
    filename: &str,
    bytes: &[u8],
) -> Result<PathBuf, IngestError> {
    let name = Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| IngestError::MissingFileName(filename.to_string()))?;

    tokio::fs::create_dir_all(uploads_dir).await?;
    let path = uploads_dir.join(format!("{file_id}_{name}"));
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

pub fn segment_document(
    filename: &str,
    document: &ExtractedDocument,
    chunker: &Chunker,
) -> Vec<Segment> {
    document
        .pages
        .iter()
        .flat_map(|page| chunker.chunk(&page.text, filename, page.number))
        .collect()
}

pub fn extraction_failure(filename: &str, error: &IngestError) -> (String, Vec<Segment>) {
    let text = format!("Error extracting text: {error}");
    let segment = Segment {
        text: text.clone(),
        filename: filename.to_string(),
        page: 1,
        chunk_index: 0,
    };
    (text, vec![segment])
}

pub fn text_preview(segments: &[Segment], max_chars: usize) -> String {
    segments
        .first()
        .map(|segment| {
            let head = segment.text.chars().take(max_chars).collect::<String>();
            format!("{head}...")
        })
        .unwrap_or_default()
}

pub struct IndexingReport {
    pub indexed: usize,
    pub skipped: usize,
}

/// Embeds and inserts each segment longer than `min_chars` characters.
///
/// Item ids use the segment's position in the whole file's list, not its
/// per-page `chunk_index`. A segment whose embedding fails is skipped and
/// the rest continue; index failures abort.
pub async fn index_segments<E, I>(
    embedder: &E,
    index: &I,
    file_id: &str,
    file_type: &FileType,
    segments: &[Segment],
    min_chars: usize,
) -> Result<IndexingReport, IngestError>
where
    E: Embedder + Send + Sync,
    I: CorpusIndex + Send + Sync,
{
    let mut report = IndexingReport {
        indexed: 0,
        skipped: 0,
    };

    for (ordinal, segment) in segments.iter().enumerate() {
        if segment.text.trim().is_empty() || segment.text.chars().count() <= min_chars {
            report.skipped += 1;
            continue;
        }

        let vector = match embedder.embed(&segment.text).await {
            Ok(vector) => vector,
            Err(error) => {
                warn!(file_id, ordinal, %error, "embedding failed, segment skipped");
                report.skipped += 1;
                continue;
            }
        };

        index
            .insert(IndexedItem {
                id: IndexedItem::segment_id(file_id, ordinal),
                vector,
                text: segment.text.clone(),
                metadata: SegmentMetadata {
                    file_id: file_id.to_string(),
                    filename: segment.filename.clone(),
                    page: segment.page,
                    chunk_index: segment.chunk_index,
                    total_chunks: segments.len(),
                    file_type: file_type.clone(),
                },
            })
            .await?;
        report.indexed += 1;
    }

    Ok(report)
}
