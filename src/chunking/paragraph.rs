//! Paragraph-accumulating chunking (§4.1 `paragraph`). No overlap.

use crate::chunk::ChunkCandidate;
use crate::error::{PipelineError, Result};

pub fn chunk(text: &str, chunk_size: usize) -> Result<Vec<ChunkCandidate>> {
    if chunk_size == 0 {
        return Err(PipelineError::InvalidConfig(
            "paragraph: chunk_size must be greater than 0".into(),
        ));
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Ok(Vec::new());
    }

    let paragraphs = split_paragraphs(&chars);
    if paragraphs.is_empty() {
        return Ok(Vec::new());
    }

    let mut candidates = Vec::new();
    let mut current_start = paragraphs[0].0;
    let mut current_end = paragraphs[0].0;

    for &(start, end) in &paragraphs {
        if end - current_start > chunk_size && current_end > current_start {
            candidates.push(make_candidate(&chars, current_start, current_end));
            current_start = start;
        }
        current_end = end;
    }

    if current_end > current_start {
        candidates.push(make_candidate(&chars, current_start, current_end));
    }

    Ok(candidates)
}

/// Split on blank-line separators (two or more consecutive newlines),
/// returning non-empty paragraph spans as char offsets.
fn split_paragraphs(chars: &[char]) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        if chars[i] == '\n' {
            let mut j = i + 1;
            let mut newline_count = 1;
            while j < chars.len() && (chars[j] == '\n' || chars[j] == ' ' || chars[j] == '\t') {
                if chars[j] == '\n' {
                    newline_count += 1;
                }
                j += 1;
            }
            if newline_count >= 2 {
                spans.push((start, i));
                start = j;
                i = j;
                continue;
            }
        }
        i += 1;
    }
    spans.push((start, chars.len()));

    spans
        .into_iter()
        .filter(|&(s, e)| chars[s..e].iter().any(|c| !c.is_whitespace()))
        .collect()
}

fn make_candidate(chars: &[char], start: usize, end: usize) -> ChunkCandidate {
    // Trim leading/trailing whitespace from the span while keeping offsets
    // anchored to the original, untrimmed positions.
    let mut trimmed_start = start;
    while trimmed_start < end && chars[trimmed_start].is_whitespace() {
        trimmed_start += 1;
    }
    let mut trimmed_end = end;
    while trimmed_end > trimmed_start && chars[trimmed_end - 1].is_whitespace() {
        trimmed_end -= 1;
    }
    let text: String = chars[trimmed_start..trimmed_end].iter().collect();
    ChunkCandidate::new(text, trimmed_start, trimmed_end)
}
