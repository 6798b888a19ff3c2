use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub filename: String,
    pub page: u32,
    /// Position within this page's segment sequence, restarting at 0 per page.
    pub chunk_index: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(into = "String", from = "String")]
pub enum FileType {
    Pdf,
    Docx,
    Txt,
    Csv,
    Db,
    Jpg,
    Jpeg,
    Png,
    Bmp,
    Other(String),
}

impl FileType {
    pub fn from_filename(filename: &str) -> Self {
        match filename.rsplit_once('.') {
            Some((_, ext)) => Self::from_token(ext),
            None => Self::Other("file".to_string()),
        }
    }

    pub fn from_token(token: &str) -> Self {
        match token.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "txt" => Self::Txt,
            "csv" => Self::Csv,
            "db" => Self::Db,
            "jpg" => Self::Jpg,
            "jpeg" => Self::Jpeg,
            "png" => Self::Png,
            "bmp" => Self::Bmp,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
            Self::Csv => "csv",
            Self::Db => "db",
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Bmp => "bmp",
            Self::Other(token) => token,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Jpg | Self::Jpeg | Self::Png | Self::Bmp)
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<FileType> for String {
    fn from(value: FileType) -> Self {
        value.as_str().to_string()
    }
}

impl From<String> for FileType {
    fn from(value: String) -> Self {
        Self::from_token(&value)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FileCategory {
    Pdf,
    Txt,
    Docx,
    Image,
    Db,
    Csv,
}

impl FileCategory {
    pub fn matches(self, file_type: &FileType) -> bool {
        match self {
            Self::Pdf => *file_type == FileType::Pdf,
            Self::Txt => *file_type == FileType::Txt,
            Self::Docx => *file_type == FileType::Docx,
            Self::Image => file_type.is_image(),
            Self::Db => *file_type == FileType::Db,
            Self::Csv => *file_type == FileType::Csv,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Txt => "txt",
            Self::Docx => "docx",
            Self::Image => "image",
            Self::Db => "db",
            Self::Csv => "csv",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub file_id: String,
    pub filename: String,
    pub stored_path: PathBuf,
    pub file_type: FileType,
    pub full_text: String,
    pub segments: Vec<Segment>,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentMetadata {
    pub file_id: String,
    pub filename: String,
    pub page: u32,
    pub chunk_index: u32,
    pub total_chunks: usize,
    pub file_type: FileType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedItem {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: SegmentMetadata,
}

impl IndexedItem {
    pub fn segment_id(file_id: &str, ordinal: usize) -> String {
        format!("{file_id}_chunk_{ordinal}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexHit {
    pub id: String,
    pub text: String,
    pub metadata: SegmentMetadata,
    pub distance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestSummary {
    pub file_id: String,
    pub filename: String,
    pub file_type: FileType,
    pub chunk_count: usize,
    pub text_preview: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RouteMode {
    TypeDirected(FileCategory),
    Semantic,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Answer {
    pub context: String,
    pub answer: String,
    pub source: String,
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub chunk_max_chars: usize,
    pub chunk_overlap: usize,
    pub min_segment_chars: usize,
    pub retrieval_top_k: usize,
    pub preview_chars: usize,
    pub uploads_dir: PathBuf,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_max_chars: 1_000,
            chunk_overlap: 200,
            min_segment_chars: 50,
            retrieval_top_k: 3,
            preview_chars: 200,
            uploads_dir: PathBuf::from("uploads"),
        }
    }
}
