use crate::error::IngestError;
use crate::models::FileType;
use base64::{engine::general_purpose::STANDARD, Engine};
use lopdf::Document;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{Connection, Row};
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const PDF_PAGE_SEPARATOR: &str = "\n\n\t\t";
const DB_TABLE: &str = "data_table";
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;
const OCR_PROMPT: &str = "What's written in this image in English. Give me only the OCR text.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedDocument {
    pub full_text: String,
    pub pages: Vec<PageText>,
}

impl ExtractedDocument {
    pub fn single_page(text: String) -> Self {
        Self {
            pages: vec![PageText {
                number: 1,
                text: text.clone(),
            }],
            full_text: text,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct LlmOcrRequest {
    content_base64: String,
    mime_type: String,
    source_path: String,
    prompt: String,
}

#[derive(Debug, Clone, Deserialize)]
struct LlmOcrResponse {
    pages: Option<Vec<LlmOcrPage>>,
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct LlmOcrPage {
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OcrEndpointConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
}

impl OcrEndpointConfig {
    pub fn from_env() -> Option<Self> {
        let endpoint = non_blank(std::env::var("LLM_OCR_ENDPOINT").ok())?;
        let api_key = non_blank(std::env::var("LLM_OCR_API_KEY").ok());
        Some(Self { endpoint, api_key })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, Default)]
pub struct DocumentExtractor {
    ocr: Option<OcrEndpointConfig>,
    client: Client,
}

impl DocumentExtractor {
    pub fn new(ocr: Option<OcrEndpointConfig>) -> Self {
        Self {
            ocr,
            client: Client::new(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(OcrEndpointConfig::from_env())
    }

    pub async fn extract(
        &self,
        path: &Path,
        file_type: &FileType,
    ) -> Result<ExtractedDocument, IngestError> {
        match file_type {
            FileType::Pdf => self.extract_pdf(path).await,
            FileType::Docx => Ok(ExtractedDocument::single_page(extract_docx(path)?)),
            FileType::Txt => Ok(ExtractedDocument::single_page(
                tokio::fs::read_to_string(path).await?,
            )),
            FileType::Csv => Ok(ExtractedDocument::single_page(extract_csv(path)?)),
            FileType::Db => Ok(ExtractedDocument::single_page(extract_sqlite(path).await?)),
            FileType::Jpg | FileType::Jpeg | FileType::Png | FileType::Bmp => {
                let pages = self.ocr_pages(path, image_mime(file_type)).await?;
                let text = pages
                    .into_iter()
                    .map(|page| page.text)
                    .collect::<Vec<_>>()
                    .join("\n\n");
                Ok(ExtractedDocument::single_page(text))
            }
            FileType::Other(_) => Ok(ExtractedDocument::default()),
        }
    }

    async fn extract_pdf(&self, path: &Path) -> Result<ExtractedDocument, IngestError> {
        let pages = match extract_pdf_pages(path) {
            Ok(pages) => pages,
            Err(IngestError::PdfParse(parse_error)) if self.ocr.is_some() => {
                self.ocr_pages(path, "application/pdf")
                    .await
                    .map_err(|ocr_error| {
                        IngestError::PdfParse(format!(
                            "{parse_error}; multimodal OCR fallback failed: {ocr_error}"
                        ))
                    })?
            }
            Err(error) => return Err(error),
        };

        let full_text = pages
            .iter()
            .map(|page| format!("{}{PDF_PAGE_SEPARATOR}", page.text))
            .collect::<String>();

        Ok(ExtractedDocument { full_text, pages })
    }

    async fn ocr_pages(&self, path: &Path, mime_type: &str) -> Result<Vec<PageText>, IngestError> {
        let cfg = self.ocr.as_ref().ok_or_else(|| {
            IngestError::OcrFailed("LLM_OCR_ENDPOINT is not configured".to_string())
        })?;

        let content = tokio::fs::read(path).await?;
        let payload = LlmOcrRequest {
            content_base64: STANDARD.encode(content),
            mime_type: mime_type.to_string(),
            source_path: path.to_string_lossy().to_string(),
            prompt: OCR_PROMPT.to_string(),
        };

        let mut request = self
            .client
            .post(&cfg.endpoint)
            .header("content-type", "application/json")
            .json(&payload);

        if let Some(api_key) = &cfg.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(IngestError::OcrFailed(format!(
                "multimodal OCR request to {} returned {}",
                cfg.endpoint,
                response.status()
            )));
        }

        let payload: LlmOcrResponse = response.json().await?;
        payload_to_pages(&payload, path)
    }
}

fn image_mime(file_type: &FileType) -> &'static str {
    match file_type {
        FileType::Png => "image/png",
        FileType::Bmp => "image/bmp",
        _ => "image/jpeg",
    }
}

fn extract_pdf_pages(path: &Path) -> Result<Vec<PageText>, IngestError> {
    let document =
        Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

    let mut pages = Vec::new();
    for (page_no, _page_id) in document.get_pages() {
        let text = document
            .extract_text(&[page_no])
            .map_err(|error| IngestError::PdfParse(error.to_string()))?;
        pages.push(PageText {
            number: page_no,
            text,
        });
    }

    Ok(pages)
}

fn extract_docx(path: &Path) -> Result<String, IngestError> {
    let file = std::fs::File::open(path)?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|error| IngestError::DocxParse(error.to_string()))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|error| IngestError::DocxParse(error.to_string()))?;

    let mut xml = Vec::new();
    entry.take(MAX_XML_ENTRY_BYTES).read_to_end(&mut xml)?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(IngestError::DocxParse(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }

    let paragraphs = docx_paragraphs(&xml)?;
    Ok(paragraphs
        .into_iter()
        .filter(|paragraph| !paragraph.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n"))
}

fn docx_paragraphs(xml: &[u8]) -> Result<Vec<String>, IngestError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(element)) => match element.local_name().as_ref() {
                b"p" => current.clear(),
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(element)) => match element.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" => current.push('\n'),
                b"p" => paragraphs.push(String::new()),
                _ => {}
            },
            Ok(Event::Text(text)) if in_text => {
                let unescaped = text
                    .unescape()
                    .map_err(|error| IngestError::DocxParse(error.to_string()))?;
                current.push_str(&unescaped);
            }
            Ok(Event::End(element)) => match element.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(error) => return Err(IngestError::DocxParse(error.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

fn extract_csv(path: &Path) -> Result<String, IngestError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader
        .headers()?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(
            (0..headers.len())
                .map(|column| match record.get(column) {
                    Some(value) if !value.is_empty() => value.to_string(),
                    _ => "NaN".to_string(),
                })
                .collect(),
        );
    }

    Ok(render_table(&headers, &rows))
}

async fn extract_sqlite(path: &Path) -> Result<String, IngestError> {
    let options = SqliteConnectOptions::new().filename(path).read_only(true);
    let mut connection = SqliteConnection::connect_with(&options).await?;

    let columns = sqlx::query(&format!("SELECT name FROM pragma_table_info('{DB_TABLE}')"))
        .fetch_all(&mut connection)
        .await?
        .iter()
        .map(|row| row.try_get::<String, _>("name"))
        .collect::<Result<Vec<_>, _>>()?;

    if columns.is_empty() {
        connection.close().await?;
        return Err(IngestError::InvalidArgument(format!(
            "no such table: {DB_TABLE}"
        )));
    }

    let projection = columns
        .iter()
        .map(|column| format!("CAST(\"{}\" AS TEXT)", column.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(", ");

    let fetched = sqlx::query(&format!("SELECT {projection} FROM {DB_TABLE}"))
        .fetch_all(&mut connection)
        .await?;

    let mut rows = Vec::with_capacity(fetched.len());
    for row in &fetched {
        let mut cells = Vec::with_capacity(columns.len());
        for column in 0..columns.len() {
            let value: Option<String> = row.try_get(column)?;
            cells.push(value.unwrap_or_else(|| "None".to_string()));
        }
        rows.push(cells);
    }

    connection.close().await?;
    Ok(render_table(&columns, &rows))
}

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let index_width = rows.len().saturating_sub(1).to_string().len();
    let widths = headers
        .iter()
        .enumerate()
        .map(|(column, header)| {
            rows.iter()
                .filter_map(|row| row.get(column))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect::<Vec<_>>();

    let mut lines = vec![table_line("", index_width, headers, &widths)];
    for (index, row) in rows.iter().enumerate() {
        lines.push(table_line(&index.to_string(), index_width, row, &widths));
    }

    lines.join("\n")
}

fn table_line(index: &str, index_width: usize, cells: &[String], widths: &[usize]) -> String {
    let mut line = format!("{index:<index_width$}");
    for (cell, width) in cells.iter().zip(widths.iter()) {
        line.push_str("  ");
        line.push_str(&format!("{cell:>width$}"));
    }
    line
}

pub fn discover_documents(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let supported = entry
            .path()
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| FileType::from_filename(name).is_supported());

        if supported {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

fn payload_to_pages(payload: &LlmOcrResponse, path: &Path) -> Result<Vec<PageText>, IngestError> {
    if let Some(listed) = &payload.pages {
        let listed = listed
            .iter()
            .filter_map(|page| {
                let text = page.text.as_ref().map(|value| value.trim().to_string());
                text.and_then(|normalized| {
                    if normalized.is_empty() {
                        None
                    } else {
                        Some(PageText {
                            number: page.page.unwrap_or(1),
                            text: normalized,
                        })
                    }
                })
            })
            .collect::<Vec<_>>();

        if !listed.is_empty() {
            return Ok(listed);
        }
    }

    if let Some(raw_text) = &payload.text {
        let pages = raw_text
            .split('\u{000c}')
            .enumerate()
            .filter_map(|(index, chunk)| {
                let normalized = chunk.trim().to_string();
                if normalized.is_empty() {
                    None
                } else {
                    Some(PageText {
                        number: (index + 1) as u32,
                        text: normalized,
                    })
                }
            })
            .collect::<Vec<_>>();

        if !pages.is_empty() {
            return Ok(pages);
        }
    }

    Err(IngestError::OcrFailed(format!(
        "multimodal OCR response was empty for {}",
        path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_docx(path: &Path, body: &str) -> Result<(), Box<dyn std::error::Error>> {
        let file = fs::File::create(path)?;
        let mut writer = zip::ZipWriter::new(file);
        writer.start_file(
            "word/document.xml",
            zip::write::SimpleFileOptions::default(),
        )?;
        writer.write_all(body.as_bytes())?;
        writer.finish()?;
        Ok(())
    }

    #[test]
    fn ocr_payload_with_pages_converts_only_nonempty_text() {
        let response = LlmOcrResponse {
            pages: Some(vec![
                LlmOcrPage {
                    page: Some(2),
                    text: Some("  ".to_string()),
                },
                LlmOcrPage {
                    page: Some(3),
                    text: Some("Page 3".to_string()),
                },
            ]),
            text: None,
        };

        let pages = payload_to_pages(&response, Path::new("x.png"))
            .expect("multimodal response should be parsed");

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].number, 3);
        assert_eq!(pages[0].text, "Page 3");
    }

    #[test]
    fn ocr_payload_fallback_text_split_by_form_feed() {
        let response = LlmOcrResponse {
            pages: None,
            text: Some("First\u{000C}Second\n".to_string()),
        };

        let pages = payload_to_pages(&response, Path::new("x.pdf"))
            .expect("multimodal response should be parsed");

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].number, 2);
        assert_eq!(pages[1].text, "Second");
    }

    #[test]
    fn empty_ocr_payload_is_an_error() {
        let response = LlmOcrResponse {
            pages: Some(Vec::new()),
            text: Some(" \u{000C} ".to_string()),
        };
        assert!(payload_to_pages(&response, Path::new("x.png")).is_err());
    }

    #[tokio::test]
    async fn txt_is_read_as_one_page() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("notes.txt");
        fs::write(&path, "line one\n\nline two")?;

        let extracted = DocumentExtractor::new(None)
            .extract(&path, &FileType::Txt)
            .await?;

        assert_eq!(extracted.full_text, "line one\n\nline two");
        assert_eq!(extracted.pages.len(), 1);
        assert_eq!(extracted.pages[0].number, 1);
        Ok(())
    }

    #[tokio::test]
    async fn docx_paragraphs_are_joined_with_blank_lines() -> Result<(), Box<dyn std::error::Error>>
    {
        let dir = tempdir()?;
        let path = dir.path().join("memo.docx");
        write_docx(
            &path,
            r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Quarterly </w:t></w:r><w:r><w:t>report &amp; outlook</w:t></w:r></w:p>
    <w:p><w:r><w:t>   </w:t></w:r></w:p>
    <w:p/>
    <w:p><w:r><w:t>Second paragraph</w:t></w:r></w:p>
  </w:body>
</w:document>"#,
        )?;

        let extracted = DocumentExtractor::new(None)
            .extract(&path, &FileType::Docx)
            .await?;

        assert_eq!(
            extracted.full_text,
            "Quarterly report & outlook\n\nSecond paragraph"
        );
        Ok(())
    }

    #[tokio::test]
    async fn csv_is_rendered_as_table() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("people.csv");
        fs::write(&path, "name,age\nalice,30\nbob,\n")?;

        let extracted = DocumentExtractor::new(None)
            .extract(&path, &FileType::Csv)
            .await?;

        assert_eq!(
            extracted.full_text,
            "    name  age\n0  alice   30\n1    bob  NaN"
        );
        Ok(())
    }

    #[tokio::test]
    async fn sqlite_data_table_is_rendered() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("inventory.db");

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        let mut connection = SqliteConnection::connect_with(&options).await?;
        sqlx::query("CREATE TABLE data_table (item TEXT, qty INTEGER)")
            .execute(&mut connection)
            .await?;
        sqlx::query("INSERT INTO data_table VALUES ('valve', 12), ('pump', NULL)")
            .execute(&mut connection)
            .await?;
        connection.close().await?;

        let extracted = DocumentExtractor::new(None)
            .extract(&path, &FileType::Db)
            .await?;

        assert_eq!(
            extracted.full_text,
            "    item   qty\n0  valve    12\n1   pump  None"
        );
        Ok(())
    }

    #[tokio::test]
    async fn image_without_ocr_endpoint_fails() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("scan.png");
        fs::write(&path, [0u8, 1, 2])?;

        let result = DocumentExtractor::new(None)
            .extract(&path, &FileType::Png)
            .await;
        assert!(matches!(result, Err(IngestError::OcrFailed(_))));
        Ok(())
    }

    #[tokio::test]
    async fn broken_pdf_is_a_parse_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"%PDF-1.4\n%broken")?;

        let result = DocumentExtractor::new(None)
            .extract(&path, &FileType::Pdf)
            .await;
        assert!(matches!(result, Err(IngestError::PdfParse(_))));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_types_extract_to_nothing() -> Result<(), Box<dyn std::error::Error>> {
        let extracted = DocumentExtractor::new(None)
            .extract(Path::new("missing.bin"), &FileType::from_token("bin"))
            .await?;
        assert_eq!(extracted, ExtractedDocument::default());
        Ok(())
    }

    #[test]
    fn discover_documents_is_recursive_and_filtered() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let nested = dir.path().join("nested");
        fs::create_dir(&nested)?;
        fs::write(dir.path().join("a.pdf"), b"x")?;
        fs::write(nested.join("b.csv"), b"x")?;
        fs::write(nested.join("c.md"), b"x")?;

        let files = discover_documents(dir.path());
        assert_eq!(files.len(), 2);
        Ok(())
    }
}
