use crate::{FileCategory, IndexHit, RouteMode};
use std::path::Path;

pub const NO_FILE_OF_TYPE_ANSWER: &str = "No file of this type found in uploaded documents.";
pub const EMBEDDING_FAILURE_ANSWER: &str = "Error generating embeddings.";

const CATEGORY_KEYWORDS: [(FileCategory, &[&str]); 6] = [
    (FileCategory::Pdf, &["pdf"]),
    (FileCategory::Txt, &["txt", "text"]),
    (FileCategory::Docx, &["docx", "docs", "document"]),
    (FileCategory::Image, &["image", "jpg", "png", "bmp", "jpeg"]),
    (FileCategory::Db, &["db", "database"]),
    (FileCategory::Csv, &["csv"]),
];

pub fn detect_file_category(question: &str) -> Option<FileCategory> {
    let lowered = question.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| lowered.contains(keyword)))
        .map(|(category, _)| *category)
}

pub fn route_mode(question: &str) -> RouteMode {
    match detect_file_category(question) {
        Some(category) => RouteMode::TypeDirected(category),
        None => RouteMode::Semantic,
    }
}

/// Picks the hit with the largest reported distance; ties keep the earliest.
pub fn select_farthest(hits: &[IndexHit]) -> Option<&IndexHit> {
    hits.iter().fold(None, |best: Option<&IndexHit>, hit| match best {
        Some(current) if hit.distance <= current.distance => Some(current),
        _ => Some(hit),
    })
}

pub fn format_source(filename: &str, page: u32) -> String {
    let paginated = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf") || ext.eq_ignore_ascii_case("docx"));

    if paginated {
        format!("page {page} of {filename}")
    } else {
        filename.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FileType, SegmentMetadata};

    fn hit(id: &str, distance: f64) -> IndexHit {
        IndexHit {
            id: id.to_string(),
            text: format!("text {id}"),
            metadata: SegmentMetadata {
                file_id: "abcd0123".to_string(),
                filename: "a.txt".to_string(),
                page: 1,
                chunk_index: 0,
                total_chunks: 3,
                file_type: FileType::Txt,
            },
            distance,
        }
    }

    #[test]
    fn keywords_map_to_categories() {
        assert_eq!(detect_file_category("Summarise the PDF"), Some(FileCategory::Pdf));
        assert_eq!(detect_file_category("what is in the text file"), Some(FileCategory::Txt));
        assert_eq!(detect_file_category("describe the document"), Some(FileCategory::Docx));
        assert_eq!(detect_file_category("what does the PNG show"), Some(FileCategory::Image));
        assert_eq!(detect_file_category("list the database rows"), Some(FileCategory::Db));
        assert_eq!(detect_file_category("totals in the CSV"), Some(FileCategory::Csv));
        assert_eq!(detect_file_category("who signed the contract?"), None);
    }

    #[test]
    fn earlier_category_wins_when_several_match() {
        assert_eq!(
            detect_file_category("compare the pdf with the csv"),
            Some(FileCategory::Pdf)
        );
        assert_eq!(
            detect_file_category("is the image in the document?"),
            Some(FileCategory::Docx)
        );
    }

    #[test]
    fn keywords_match_inside_words() {
        assert_eq!(detect_file_category("any feedback?"), Some(FileCategory::Db));
        assert_eq!(route_mode("what's the context here"), RouteMode::TypeDirected(FileCategory::Txt));
        assert_eq!(route_mode("who won?"), RouteMode::Semantic);
    }

    #[test]
    fn farthest_hit_is_selected() {
        let hits = vec![hit("a", 0.9), hit("b", 0.3), hit("c", 0.6)];
        assert_eq!(select_farthest(&hits).map(|h| h.id.as_str()), Some("a"));

        let hits = vec![hit("a", 0.3), hit("b", 0.6), hit("c", 0.9)];
        assert_eq!(select_farthest(&hits).map(|h| h.id.as_str()), Some("c"));
    }

    #[test]
    fn ties_keep_the_earliest_hit() {
        let hits = vec![hit("a", 0.5), hit("b", 0.5)];
        assert_eq!(select_farthest(&hits).map(|h| h.id.as_str()), Some("a"));
        assert!(select_farthest(&[]).is_none());
    }

    #[test]
    fn source_mentions_page_for_paginated_formats() {
        assert_eq!(format_source("minutes.docx", 3), "page 3 of minutes.docx");
        assert_eq!(format_source("Manual.PDF", 7), "page 7 of Manual.PDF");
        assert_eq!(format_source("sales.csv", 3), "sales.csv");
        assert_eq!(format_source("README", 1), "README");
    }
}
