//! Markdown-heading-section chunking (§4.1 `heading`).
//!
//! Each `^#{1,6}\s+...$` line starts a section running to the next heading
//! or end of text. Text before the first heading forms an implicit leading
//! chunk at `level = 0`. `metadata["heading_index"]` records the ordinal
//! position of a heading among prior headings at the same level
//! (supplemented from `original_source`'s heading chunker).

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::chunk::ChunkCandidate;
use crate::error::Result;

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^(#{1,6})[ \t]+(.+?)[ \t]*$").unwrap())
}

struct Heading {
    char_start: usize,
    level: usize,
    text: String,
}

pub fn chunk(text: &str) -> Result<Vec<ChunkCandidate>> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Ok(Vec::new());
    }

    let headings = find_headings(text);
    if headings.is_empty() {
        return Ok(vec![ChunkCandidate::new(text.to_string(), 0, chars.len())
            .with_metadata("level", serde_json::json!(0))]);
    }

    let mut candidates = Vec::new();

    if headings[0].char_start > 0 {
        let lead: String = chars[0..headings[0].char_start].iter().collect();
        if !lead.trim().is_empty() {
            candidates.push(
                ChunkCandidate::new(lead, 0, headings[0].char_start)
                    .with_metadata("level", serde_json::json!(0)),
            );
        }
    }

    let mut level_counts: HashMap<usize, usize> = HashMap::new();
    for (i, heading) in headings.iter().enumerate() {
        let end = headings.get(i + 1).map(|h| h.char_start).unwrap_or(chars.len());
        let section: String = chars[heading.char_start..end].iter().collect();
        let count = level_counts.entry(heading.level).or_insert(0);
        *count += 1;
        candidates.push(
            ChunkCandidate::new(section, heading.char_start, end)
                .with_metadata("level", serde_json::json!(heading.level))
                .with_metadata("heading", serde_json::json!(heading.text))
                .with_metadata("heading_index", serde_json::json!(*count)),
        );
    }

    Ok(candidates)
}

fn find_headings(text: &str) -> Vec<Heading> {
    let re = heading_re();
    re.captures_iter(text)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            let level = cap.get(1)?.as_str().len();
            let heading_text = cap.get(2)?.as_str().trim().to_string();
            let char_start = text[..whole.start()].chars().count();
            Some(Heading {
                char_start,
                level,
                text: heading_text,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_one_chunk_per_section() {
        let text = "Intro text.\n\n# Title\nBody one.\n\n## Sub\nBody two.";
        let candidates = chunk(text).unwrap();
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].metadata["level"], serde_json::json!(0));
        assert_eq!(candidates[1].metadata["level"], serde_json::json!(1));
        assert_eq!(candidates[2].metadata["level"], serde_json::json!(2));
    }

    #[test]
    fn no_headings_yields_single_level_zero_chunk() {
        let candidates = chunk("just prose, no headings here").unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].metadata["level"], serde_json::json!(0));
    }

    #[test]
    fn heading_index_counts_siblings_at_same_level() {
        let text = "# One\nbody\n# Two\nbody\n## Sub\nbody";
        let candidates = chunk(text).unwrap();
        assert_eq!(candidates[0].metadata["heading_index"], serde_json::json!(1));
        assert_eq!(candidates[1].metadata["heading_index"], serde_json::json!(2));
        assert_eq!(candidates[2].metadata["heading_index"], serde_json::json!(1));
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert_eq!(chunk("").unwrap().len(), 0);
    }
}
