use crate::error::IngestError;
use crate::extractor::PageText;
use crate::models::{TextChunk, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Window configuration, measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be positive".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {} must be smaller than chunk size {}",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Recursive separator splitter: tries paragraph, line, word and finally
/// character boundaries, merging adjacent pieces into windows that carry
/// `chunk_overlap` characters of trailing context.
#[derive(Debug, Clone, Copy)]
pub struct TextSplitter {
    config: ChunkingConfig,
}

impl TextSplitter {
    pub fn new(config: ChunkingConfig) -> Result<Self, IngestError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &SEPARATORS)
    }

    /// Splits every page, keeping the page number and a global running index.
    pub fn split_pages(&self, pages: &[PageText]) -> Vec<TextChunk> {
        let mut chunks = Vec::new();
        let mut cursor = 0u64;

        for page in pages {
            for text in self.split_text(&page.text) {
                chunks.push(TextChunk {
                    chunk_id: make_chunk_id(page.number, cursor, &text),
                    chunk_index: cursor,
                    page: page.number,
                    text,
                });
                cursor = cursor.saturating_add(1);
            }
        }

        chunks
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let position = separators
            .iter()
            .position(|separator| separator.is_empty() || text.contains(separator))
            .unwrap_or(separators.len().saturating_sub(1));
        let separator = separators.get(position).copied().unwrap_or("");
        let remaining = separators.get(position + 1..).unwrap_or(&[]);

        let pieces: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split(separator)
                .filter(|piece| !piece.is_empty())
                .map(str::to_string)
                .collect()
        };

        let mut output = Vec::new();
        let mut fitting: Vec<String> = Vec::new();

        for piece in pieces {
            if char_len(&piece) < self.config.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                output.extend(self.merge_pieces(&fitting, separator));
                fitting.clear();
            }

            if remaining.is_empty() {
                output.push(piece);
            } else {
                output.extend(self.split_recursive(&piece, remaining));
            }
        }

        if !fitting.is_empty() {
            output.extend(self.merge_pieces(&fitting, separator));
        }

        output
    }

    fn merge_pieces(&self, pieces: &[String], separator: &str) -> Vec<String> {
        let separator_len = char_len(separator);
        let mut merged = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let piece_len = char_len(piece);
            let joiner = if window.is_empty() { 0 } else { separator_len };

            if total + piece_len + joiner > self.config.chunk_size && !window.is_empty() {
                push_joined(&mut merged, &window, separator);

                // Drop leading pieces until only the overlap remains and the
                // next piece fits.
                loop {
                    let joiner = if window.is_empty() { 0 } else { separator_len };
                    let beyond_overlap = total > self.config.chunk_overlap;
                    let next_overflows =
                        total > 0 && total + piece_len + joiner > self.config.chunk_size;
                    if !beyond_overlap && !next_overflows {
                        break;
                    }
                    let Some(front) = window.pop_front() else {
                        break;
                    };
                    let front_joiner = if window.is_empty() { 0 } else { separator_len };
                    total = total.saturating_sub(char_len(front) + front_joiner);
                }
            }

            let joiner = if window.is_empty() { 0 } else { separator_len };
            window.push_back(piece.as_str());
            total += piece_len + joiner;
        }

        push_joined(&mut merged, &window, separator);
        merged
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            config: ChunkingConfig::default(),
        }
    }
}

fn push_joined(target: &mut Vec<String>, window: &VecDeque<&str>, separator: &str) {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        target.push(trimmed.to_string());
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn make_chunk_id(page: u32, index: u64, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(page.to_le_bytes());
    hasher.update(index.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(chunk_size: usize, chunk_overlap: usize) -> TextSplitter {
        TextSplitter::new(ChunkingConfig {
            chunk_size,
            chunk_overlap,
        })
        .expect("config should be valid")
    }

    #[test]
    fn default_window_is_500_with_100_overlap() {
        let config = TextSplitter::default().config();
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.chunk_overlap, 100);
    }

    #[test]
    fn overlap_must_be_smaller_than_window() {
        let result = TextSplitter::new(ChunkingConfig {
            chunk_size: 10,
            chunk_overlap: 10,
        });
        assert!(matches!(result, Err(IngestError::InvalidChunkConfig(_))));
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = splitter(500, 100).split_text("A short paragraph.");
        assert_eq!(chunks, vec!["A short paragraph.".to_string()]);
    }

    #[test]
    fn words_are_merged_with_trailing_overlap() {
        let chunks = splitter(10, 4).split_text("aaa bbb ccc ddd eee");
        assert_eq!(chunks, vec!["aaa bbb", "bbb ccc", "ccc ddd", "ddd eee"]);
    }

    #[test]
    fn paragraphs_are_preferred_over_words() {
        let text = "first paragraph here\n\nsecond paragraph here";
        let chunks = splitter(25, 5).split_text(text);
        assert_eq!(chunks, vec!["first paragraph here", "second paragraph here"]);
    }

    #[test]
    fn unbroken_text_falls_back_to_characters() {
        let chunks = splitter(4, 1).split_text("abcdefghij");
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 4));
        assert_eq!(chunks.first().map(String::as_str), Some("abcd"));
        assert_eq!(chunks.get(1).map(String::as_str), Some("defg"));
    }

    #[test]
    fn windows_never_exceed_chunk_size_on_long_documents() {
        let sentence = "The relief valve opens at the configured pressure. ";
        let text = sentence.repeat(80);
        let chunks = TextSplitter::default().split_text(&text);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 500));
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() {
        let chunks = splitter(5, 1).split_text("héllo wörld ünïcödé");
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 5));
    }

    #[test]
    fn blank_text_produces_no_chunks() {
        assert!(splitter(10, 2).split_text("   \n\n  ").is_empty());
    }

    #[test]
    fn pages_keep_numbers_and_running_index() {
        let pages = vec![
            PageText {
                number: 1,
                text: "aaa bbb ccc".to_string(),
            },
            PageText {
                number: 3,
                text: "ddd".to_string(),
            },
        ];

        let chunks = splitter(8, 0).split_pages(&pages);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].page, 1);
        assert_eq!(chunks[2].page, 3);
        assert_eq!(
            chunks.iter().map(|chunk| chunk.chunk_index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_ne!(chunks[0].chunk_id, chunks[1].chunk_id);
    }
}
