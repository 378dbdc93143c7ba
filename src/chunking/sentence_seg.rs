//! Shared sentence segmentation used by the `sentence`, `sentence_window`
//! and `semantic` strategies (§4.1).
//!
//! Language-independent policy: split on `[.!?]` followed by whitespace (or
//! end of text). Offsets are Unicode scalar (char) positions, consistent
//! with every other chunking strategy in this crate.

/// A sentence with its offsets into the original text.
#[derive(Debug, Clone, PartialEq)]
pub struct Sentence {
    pub text: String,
    pub start_char: usize,
    pub end_char: usize,
}

/// Segment `text` into sentences. Never panics on empty input; returns an
/// empty vec for empty text, and a single sentence for text with no
/// terminal punctuation.
pub fn segment(text: &str) -> Vec<Sentence> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || chars.iter().all(|c| c.is_whitespace()) {
        return Vec::new();
    }

    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        if matches!(chars[i], '.' | '!' | '?') {
            let mut j = i + 1;
            while j < chars.len() && matches!(chars[j], '.' | '!' | '?') {
                j += 1;
            }
            if j >= chars.len() || chars[j].is_whitespace() {
                push_sentence(&mut sentences, &chars, start, j);
                let mut k = j;
                while k < chars.len() && chars[k].is_whitespace() {
                    k += 1;
                }
                start = k;
                i = k;
                continue;
            }
        }
        i += 1;
    }

    if start < chars.len() {
        push_sentence(&mut sentences, &chars, start, chars.len());
    }

    if sentences.is_empty() {
        let text: String = chars.iter().collect();
        sentences.push(Sentence {
            text: text.trim().to_string(),
            start_char: 0,
            end_char: chars.len(),
        });
    }

    sentences
}

fn push_sentence(sentences: &mut Vec<Sentence>, chars: &[char], start: usize, end: usize) {
    let text: String = chars[start..end].iter().collect();
    if !text.trim().is_empty() {
        sentences.push(Sentence {
            text: text.trim().to_string(),
            start_char: start,
            end_char: end,
        });
    }
}
