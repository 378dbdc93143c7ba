//! Sentence-accumulating chunking (§4.1 `sentence`).

use super::sentence_seg::segment;
use crate::chunk::ChunkCandidate;
use crate::error::{PipelineError, Result};

pub fn chunk(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<ChunkCandidate>> {
    if chunk_size == 0 {
        return Err(PipelineError::InvalidConfig(
            "sentence: chunk_size must be greater than 0".into(),
        ));
    }
    if overlap >= chunk_size {
        return Err(PipelineError::InvalidConfig(
            "sentence: overlap must be less than chunk_size".into(),
        ));
    }

    let chars: Vec<char> = text.chars().collect();
    let sentences = segment(text);
    if sentences.is_empty() {
        return Ok(Vec::new());
    }

    let mut candidates = Vec::new();
    let mut current_start = sentences[0].start_char;
    let mut current_end = sentences[0].start_char;

    for sentence in &sentences {
        let tentative_end = sentence.end_char;
        if tentative_end - current_start > chunk_size && current_end > current_start {
            candidates.push(make_candidate(&chars, current_start, current_end));
            current_start = current_end.saturating_sub(overlap);
            current_end = current_start;
        }
        current_end = sentence.end_char;
    }

    if current_end > current_start {
        candidates.push(make_candidate(&chars, current_start, current_end));
    }

    Ok(candidates)
}

fn make_candidate(chars: &[char], start: usize, end: usize) -> ChunkCandidate {
    let text: String = chars[start..end].iter().collect();
    ChunkCandidate::new(text, start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_sentences_until_overflow() {
        let text = "AI is hot. Cooking is fun. Rust is great. Go is fast.";
        let candidates = chunk(text, 25, 0).unwrap();
        assert!(candidates.len() > 1);
    }

    #[test]
    fn single_sentence_input_yields_one_chunk() {
        let candidates = chunk("Just one sentence here.", 100, 0).unwrap();
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert_eq!(chunk("", 10, 2).unwrap().len(), 0);
    }

    #[test]
    fn rejects_bad_config() {
        assert!(chunk("text", 0, 0).is_err());
        assert!(chunk("text", 5, 5).is_err());
    }
}
