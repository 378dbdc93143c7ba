//! Sliding sentence-window chunking (§4.1 `sentence_window`).

use super::sentence_seg::segment;
use crate::chunk::ChunkCandidate;
use crate::error::{PipelineError, Result};

pub fn chunk(text: &str, window_size: usize, overlap: usize) -> Result<Vec<ChunkCandidate>> {
    if window_size == 0 {
        return Err(PipelineError::InvalidConfig(
            "sentence_window: window_size must be greater than 0".into(),
        ));
    }

    let chars: Vec<char> = text.chars().collect();
    let sentences = segment(text);
    if sentences.is_empty() {
        return Ok(Vec::new());
    }

    let step = window_size.saturating_sub(overlap).max(1);
    let mut candidates = Vec::new();
    let mut i = 0usize;

    while i < sentences.len() {
        let window_end = (i + window_size).min(sentences.len());
        let start = sentences[i].start_char;
        let end = sentences[window_end - 1].end_char;
        let text: String = chars[start..end].iter().collect();
        candidates.push(ChunkCandidate::new(text, start, end));

        if window_end == sentences.len() {
            break;
        }
        i += step;
    }

    Ok(candidates)
}
