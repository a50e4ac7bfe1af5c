use crate::error::IngestError;
use crate::DocumentChunk;

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
    pub min_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: 1_500,
            overlap_chars: 150,
            min_chars: 40,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.max_chars == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "max_chars must be positive".to_string(),
            ));
        }
        if self.overlap_chars >= self.max_chars {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap_chars ({}) must be smaller than max_chars ({})",
                self.overlap_chars, self.max_chars
            )));
        }
        Ok(())
    }
}

pub fn normalize_whitespace(text: &str) -> String {
    text.replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(normalize_whitespace(&current.join(" ")));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(normalize_whitespace(&current.join(" ")));
    }

    paragraphs
}

/// Packs blank-line separated paragraphs into chunks of at most `max_chars`
/// characters; a paragraph longer than that is cut into overlapping windows.
pub fn chunk_by_paragraph(text: &str, config: ChunkingConfig) -> Vec<String> {
    let mut packed = Vec::new();
    let mut current = String::new();

    for paragraph in paragraphs(text) {
        if current.is_empty() {
            current.push_str(&paragraph);
            continue;
        }

        if current.chars().count() + paragraph.chars().count() + 2 <= config.max_chars {
            current.push_str("\n\n");
            current.push_str(&paragraph);
        } else {
            packed.push(std::mem::take(&mut current));
            current.push_str(&paragraph);
        }
    }
    if !current.is_empty() {
        packed.push(current);
    }

    let mut chunks = Vec::new();
    for chunk in packed {
        let chars: Vec<char> = chunk.chars().collect();
        if chars.len() <= config.max_chars {
            chunks.push(chunk);
            continue;
        }

        let step = config.max_chars.saturating_sub(config.overlap_chars).max(1);
        let mut start = 0;
        while start < chars.len() {
            let end = (start + config.max_chars).min(chars.len());
            chunks.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }
    }

    let kept = chunks
        .iter()
        .filter(|chunk| chunk.chars().count() >= config.min_chars)
        .cloned()
        .collect::<Vec<_>>();

    if kept.is_empty() && !text.trim().is_empty() {
        return vec![normalize_whitespace(text)];
    }
    kept
}

pub fn build_chunks(
    source: &str,
    text: &str,
    config: ChunkingConfig,
) -> Result<Vec<DocumentChunk>, IngestError> {
    config.validate()?;
    Ok(chunk_by_paragraph(text, config)
        .into_iter()
        .map(|chunk| DocumentChunk::new(chunk, source))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_chars: usize, overlap_chars: usize, min_chars: usize) -> ChunkingConfig {
        ChunkingConfig {
            max_chars,
            overlap_chars,
            min_chars,
        }
    }

    #[test]
    fn whitespace_is_normalized() {
        let input = "A  \t  lot\nof \u{a0}  spacing";
        assert_eq!(normalize_whitespace(input), "A lot of spacing");
    }

    #[test]
    fn short_paragraphs_are_packed_together() {
        let text = "Kafka produces events.\n\nConsumers read\nfrom Kafka.\n\n\nDone.";
        let chunks = chunk_by_paragraph(text, config(200, 10, 1));
        assert_eq!(
            chunks,
            vec!["Kafka produces events.\n\nConsumers read from Kafka.\n\nDone.".to_string()]
        );
    }

    #[test]
    fn packing_respects_max_chars() {
        let text = "aaaaaaaaaa\n\nbbbbbbbbbb\n\ncccccccccc";
        let chunks = chunk_by_paragraph(text, config(24, 2, 1));
        assert_eq!(chunks, vec!["aaaaaaaaaa\n\nbbbbbbbbbb", "cccccccccc"]);
    }

    #[test]
    fn long_paragraphs_are_split_with_overlap() {
        let text = "abcdefghijklmnopqrst";
        let chunks = chunk_by_paragraph(text, config(8, 2, 1));
        assert_eq!(chunks, vec!["abcdefgh", "ghijklmn", "mnopqrst"]);
    }

    #[test]
    fn tiny_documents_still_yield_one_chunk() {
        let chunks = chunk_by_paragraph("Hi.", config(100, 10, 50));
        assert_eq!(chunks, vec!["Hi.".to_string()]);
        assert!(chunk_by_paragraph("  \n ", config(100, 10, 50)).is_empty());
    }

    #[test]
    fn chunks_carry_their_source() {
        let chunks = build_chunks("notes/kafka.md", "Kafka produces events.", config(100, 10, 1))
            .unwrap();
        assert_eq!(chunks[0].source, "notes/kafka.md");
        assert!(build_chunks("x", "text", config(10, 10, 1)).is_err());
    }
}
