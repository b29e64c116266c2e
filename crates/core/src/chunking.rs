use crate::error::IngestError;
use crate::models::IngestionOptions;

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: 2_000,
            overlap_chars: 200,
        }
    }
}

impl From<IngestionOptions> for ChunkingConfig {
    fn from(value: IngestionOptions) -> Self {
        Self {
            max_chars: value.max_chunk_chars,
            overlap_chars: value.overlap_chars,
        }
    }
}

impl ChunkingConfig {
    /// The overlap must be strictly smaller than the window, otherwise the
    /// cursor cannot advance.
    fn validate(&self) -> Result<(), IngestError> {
        if self.max_chars == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "max_chars must be positive".to_string(),
            ));
        }
        if self.overlap_chars >= self.max_chars {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {} must be smaller than max chunk size {}",
                self.overlap_chars, self.max_chars
            )));
        }
        Ok(())
    }
}

/// Collapse all whitespace runs (including newlines and non-breaking spaces)
/// to single spaces and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Sentence terminators, tried in this order before any other breakpoint.
const SENTENCE_TERMINATORS: [&str; 3] = [". ", "! ", "? "];

/// Split `text` into overlapping segments of at most `max_chars` bytes each.
///
/// Each window is cut at the best boundary found scanning backwards from the
/// candidate end: sentence terminator, then paragraph break, then newline,
/// then space, then a hard cut. The matched terminator stays with the
/// emitted segment, and the next window starts `overlap_chars` before the
/// cut. Output is deterministic for identical input and config.
pub fn chunk_text(text: &str, config: ChunkingConfig) -> Result<Vec<String>, IngestError> {
    config.validate()?;

    if text.len() <= config.max_chars {
        return Ok(vec![text.to_string()]);
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < text.len() {
        let hard_end = floor_char_boundary(text, start + config.max_chars);
        if hard_end >= text.len() {
            chunks.push(text[start..].to_string());
            break;
        }

        let cut = best_breakpoint(&text[start..hard_end])
            .map(|relative| start + relative)
            .unwrap_or(hard_end);
        chunks.push(text[start..cut].to_string());

        let mut next = floor_char_boundary(text, cut.saturating_sub(config.overlap_chars));
        if next <= start {
            // A boundary landed inside the overlap region. Restarting behind
            // the current window would loop forever, so continue from the cut.
            next = cut;
        }
        start = next;
    }

    Ok(chunks)
}

/// Best cut position inside `window`, as an offset one past the matched
/// boundary so the terminator is kept with the emitted segment.
fn best_breakpoint(window: &str) -> Option<usize> {
    for terminator in SENTENCE_TERMINATORS {
        if let Some(position) = window.rfind(terminator) {
            return Some(position + terminator.len());
        }
    }
    if let Some(position) = window.rfind("\n\n") {
        return Some(position + 2);
    }
    if let Some(position) = window.rfind('\n') {
        return Some(position + 1);
    }
    if let Some(position) = window.rfind(' ') {
        return Some(position + 1);
    }
    None
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    let mut index = index;
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}
