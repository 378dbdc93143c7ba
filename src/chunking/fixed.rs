//! Fixed-width sliding window chunking (§4.1 `fixed`).

use crate::chunk::ChunkCandidate;
use crate::error::{PipelineError, Result};

/// Slide a window of width `chunk_size` with step `chunk_size - overlap`.
pub fn chunk(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<ChunkCandidate>> {
    if chunk_size == 0 {
        return Err(PipelineError::InvalidConfig(
            "fixed: chunk_size must be greater than 0".into(),
        ));
    }
    if overlap >= chunk_size {
        return Err(PipelineError::InvalidConfig(
            "fixed: overlap must be less than chunk_size".into(),
        ));
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Ok(Vec::new());
    }

    let step = chunk_size - overlap;
    let mut candidates = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let slice: String = chars[start..end].iter().collect();
        candidates.push(ChunkCandidate::new(slice, start, end));
        if end == chars.len() {
            break;
        }
        start += step;
    }

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slides_with_overlap() {
        let text = "0123456789";
        let candidates = chunk(text, 4, 1).unwrap();
        assert_eq!(candidates[0].text, "0123");
        assert_eq!(candidates[1].start_char, 3);
    }

    #[test]
    fn rejects_overlap_ge_chunk_size() {
        assert!(chunk("hello world", 4, 4).is_err());
        assert!(chunk("hello world", 4, 5).is_err());
    }

    #[test]
    fn rejects_zero_chunk_size() {
        assert!(chunk("hello", 0, 0).is_err());
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert_eq!(chunk("", 10, 2).unwrap().len(), 0);
    }

    #[test]
    fn offsets_stay_in_bounds() {
        let text = "a quick brown fox jumps over the lazy dog";
        for c in chunk(text, 10, 3).unwrap() {
            assert!(c.start_char <= c.end_char);
            assert!(c.end_char <= text.chars().count());
        }
    }
}
