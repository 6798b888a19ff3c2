use crate::error::IngestError;
use crate::models::{IngestionOptions, Segment};
use regex::Regex;

const PARAGRAPH_BREAK: &str = r"\n\s*\n+";
const SENTENCE_END: &str = r"[.!?]\s+";

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    /// Overlap budget; a tenth of it, rounded up, is carried over as words.
    /// Zero carries the whole flushed buffer.
    pub overlap: usize,
    pub min_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self::from(&IngestionOptions::default())
    }
}

impl From<&IngestionOptions> for ChunkingConfig {
    fn from(value: &IngestionOptions) -> Self {
        Self {
            max_chars: value.chunk_max_chars,
            overlap: value.chunk_overlap,
            min_chars: value.min_segment_chars,
        }
    }
}

impl ChunkingConfig {
    pub fn overlap_words(&self) -> usize {
        if self.overlap == 0 {
            return usize::MAX;
        }
        self.overlap.div_ceil(10)
    }
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
    paragraph_re: Regex,
    sentence_re: Regex,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self, IngestError> {
        if config.max_chars == 0 {
            return Err(IngestError::InvalidArgument(
                "chunk max_chars must be positive".to_string(),
            ));
        }

        Ok(Self {
            config,
            paragraph_re: Regex::new(PARAGRAPH_BREAK)?,
            sentence_re: Regex::new(SENTENCE_END)?,
        })
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    /// Splits one page of text. `chunk_index` starts at 0 on every call.
    pub fn chunk(&self, text: &str, filename: &str, page: u32) -> Vec<Segment> {
        let text = text.trim();
        if char_len(text) < self.config.min_chars {
            return Vec::new();
        }

        let mut emitter = SegmentEmitter::new(filename, page);

        for paragraph in self.paragraph_re.split(text) {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() || char_len(paragraph) < self.config.min_chars {
                continue;
            }

            if char_len(paragraph) <= self.config.max_chars {
                emitter.push(paragraph);
            } else {
                self.split_oversized(paragraph, &mut emitter);
            }
        }

        emitter.finish()
    }

    fn split_oversized(&self, paragraph: &str, emitter: &mut SegmentEmitter<'_>) {
        let mut buffer = String::new();

        for sentence in self.sentences(paragraph) {
            if char_len(&buffer) + char_len(sentence) + 1 <= self.config.max_chars {
                buffer.push_str(sentence);
                buffer.push(' ');
                continue;
            }

            let flushed = buffer.trim();
            if !flushed.is_empty() {
                emitter.push(flushed);
            }

            let carried = tail_words(&buffer, self.config.overlap_words());
            buffer = carried
                .into_iter()
                .chain(sentence.split_whitespace())
                .collect::<Vec<_>>()
                .join(" ");
            buffer.push(' ');
        }

        let leftover = buffer.trim();
        if !leftover.is_empty() {
            emitter.push(leftover);
        }
    }

    fn sentences<'t>(&self, paragraph: &'t str) -> Vec<&'t str> {
        let mut sentences = Vec::new();
        let mut start = 0;

        for boundary in self.sentence_re.find_iter(paragraph) {
            // keep the punctuation, drop the whitespace after it
            let punctuation_end = boundary.start() + 1;
            sentences.push(&paragraph[start..punctuation_end]);
            start = boundary.end();
        }
        sentences.push(&paragraph[start..]);

        sentences
    }
}

pub fn chunk_text(
    text: &str,
    filename: &str,
    page: u32,
    config: ChunkingConfig,
) -> Result<Vec<Segment>, IngestError> {
    Ok(Chunker::new(config)?.chunk(text, filename, page))
}

struct SegmentEmitter<'a> {
    filename: &'a str,
    page: u32,
    next_index: u32,
    segments: Vec<Segment>,
}

impl<'a> SegmentEmitter<'a> {
    fn new(filename: &'a str, page: u32) -> Self {
        Self {
            filename,
            page,
            next_index: 0,
            segments: Vec::new(),
        }
    }

    fn push(&mut self, text: &str) {
        self.segments.push(Segment {
            text: text.to_string(),
            filename: self.filename.to_string(),
            page: self.page,
            chunk_index: self.next_index,
        });
        self.next_index = self.next_index.saturating_add(1);
    }

    fn finish(self) -> Vec<Segment> {
        self.segments
    }
}

fn tail_words(text: &str, count: usize) -> Vec<&str> {
    let words = text.split_whitespace().collect::<Vec<_>>();
    let skip = words.len().saturating_sub(count);
    words[skip..].to_vec()
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
