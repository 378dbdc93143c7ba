//! Fenced-code-aware chunking (§4.1 `code_aware`).
//!
//! Triple-backtick fenced regions are extracted as standalone chunks tagged
//! `metadata.type = "code"`, with the fence's info string (if any) kept as
//! `metadata.language`. Prose between fences is recursively split with the
//! paragraph strategy.

use super::paragraph;
use crate::chunk::ChunkCandidate;
use crate::error::{PipelineError, Result};

pub fn chunk(text: &str, chunk_size: usize) -> Result<Vec<ChunkCandidate>> {
    if chunk_size == 0 {
        return Err(PipelineError::InvalidConfig(
            "code_aware: chunk_size must be greater than 0".into(),
        ));
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Ok(Vec::new());
    }

    let fences = find_fences(&chars);
    if fences.is_empty() {
        return paragraph::chunk(text, chunk_size);
    }

    let mut candidates = Vec::new();
    let mut cursor = 0usize;

    for fence in &fences {
        if fence.content_start > cursor {
            let prose: String = chars[cursor..fence.content_start].iter().collect();
            candidates.extend(paragraph::chunk(&prose, chunk_size)?.into_iter().map(|c| {
                ChunkCandidate::new(c.text, c.start_char + cursor, c.end_char + cursor)
            }));
        }

        let code_text: String = chars[fence.content_start..fence.content_end].iter().collect();
        let mut candidate = ChunkCandidate::new(code_text, fence.content_start, fence.content_end)
            .with_metadata("type", serde_json::json!("code"));
        if let Some(lang) = &fence.language {
            candidate = candidate.with_metadata("language", serde_json::json!(lang));
        }
        candidates.push(candidate);

        cursor = fence.fence_end;
    }

    if cursor < chars.len() {
        let prose: String = chars[cursor..].iter().collect();
        candidates.extend(paragraph::chunk(&prose, chunk_size)?.into_iter().map(|c| {
            ChunkCandidate::new(c.text, c.start_char + cursor, c.end_char + cursor)
        }));
    }

    Ok(candidates)
}

struct Fence {
    /// Char offset of the first line after the opening fence.
    content_start: usize,
    /// Char offset of the opening backtick of the closing fence (exclusive
    /// end of the code body).
    content_end: usize,
    /// Char offset just past the closing fence line, where prose resumes.
    fence_end: usize,
    language: Option<String>,
}

fn find_fences(chars: &[char]) -> Vec<Fence> {
    let mut fences = Vec::new();
    let mut i = 0usize;

    while i < chars.len() {
        if is_fence_marker(chars, i) {
            let open_marker_end = i + 3;
            let mut line_end = open_marker_end;
            while line_end < chars.len() && chars[line_end] != '\n' {
                line_end += 1;
            }
            let info: String = chars[open_marker_end..line_end].iter().collect();
            let language = if info.trim().is_empty() {
                None
            } else {
                Some(info.trim().to_string())
            };
            let content_start = (line_end + 1).min(chars.len());

            // find closing fence
            let mut j = content_start;
            let mut closed = false;
            let mut content_end = chars.len();
            let mut fence_end = chars.len();
            while j < chars.len() {
                if (j == 0 || chars[j - 1] == '\n') && is_fence_marker(chars, j) {
                    content_end = if j > content_start { j - 1 } else { j };
                    let mut close_line_end = j + 3;
                    while close_line_end < chars.len() && chars[close_line_end] != '\n' {
                        close_line_end += 1;
                    }
                    fence_end = (close_line_end + 1).min(chars.len());
                    closed = true;
                    break;
                }
                j += 1;
            }

            if !closed {
                // unterminated fence: treat rest of text as code
                content_end = chars.len();
                fence_end = chars.len();
            }

            fences.push(Fence {
                content_start,
                content_end,
                fence_end,
                language,
            });
            i = fence_end;
        } else {
            i += 1;
        }
    }

    fences
}

fn is_fence_marker(chars: &[char], at: usize) -> bool {
    at + 2 < chars.len() && chars[at] == '`' && chars[at + 1] == '`' && chars[at + 2] == '`'
}
