//! Embedding-valley semantic chunking (§4.1 `semantic`).
//!
//! Sentences are grouped into windows, each window is embedded via a
//! pluggable [`SentenceEmbedder`], and adjacent windows are compared by
//! cosine similarity. A gap is a split point ("valley") when its similarity
//! is a local minimum (`<=` both neighbors, per the Open Question decision
//! to keep the non-strict rule) and the accumulated group already meets
//! `min_chunk_size`.

use async_trait::async_trait;

use super::sentence_seg::segment;
use crate::chunk::ChunkCandidate;
use crate::error::{PipelineError, Result};

/// A local embedder used only to drive valley detection; not the pipeline's
/// `Embedder` port (§8 ports are batch/network-facing, this is in-process).
#[async_trait]
pub trait SentenceEmbedder: Send + Sync {
    async fn embed(&self, sentences: &[String]) -> Result<Vec<Vec<f32>>>;
}

pub async fn chunk(
    text: &str,
    embedder: &dyn SentenceEmbedder,
    window_size: usize,
    threshold: f32,
    min_chunk_size: usize,
) -> Result<Vec<ChunkCandidate>> {
    if window_size == 0 {
        return Err(PipelineError::InvalidConfig(
            "semantic: window_size must be greater than 0".into(),
        ));
    }

    let chars: Vec<char> = text.chars().collect();
    let sentences = segment(text);
    if sentences.is_empty() {
        return Ok(Vec::new());
    }
    if sentences.len() == 1 {
        return Ok(vec![ChunkCandidate::new(
            sentences[0].text.clone(),
            sentences[0].start_char,
            sentences[0].end_char,
        )]);
    }

    let texts: Vec<String> = sentences.iter().map(|s| s.text.clone()).collect();
    let embeddings = embedder.embed(&texts).await?;
    if embeddings.len() != sentences.len() {
        return Err(PipelineError::Internal(
            "semantic: embedder returned a mismatched number of vectors".into(),
        ));
    }

    let window_embeddings: Vec<Vec<f32>> = (0..sentences.len())
        .map(|i| {
            let lo = i.saturating_sub(window_size);
            let hi = (i + window_size + 1).min(sentences.len());
            mean_vector(&embeddings[lo..hi])
        })
        .collect();

    let gaps = sentences.len() - 1;
    let similarities: Vec<f32> = (0..gaps)
        .map(|i| cosine_similarity(&window_embeddings[i], &window_embeddings[i + 1]))
        .collect();

    let is_valley = |i: usize| -> bool {
        let sim = similarities[i];
        if sim > threshold {
            return false;
        }
        let left_ok = i == 0 || sim <= similarities[i - 1];
        let right_ok = i == gaps - 1 || sim <= similarities[i + 1];
        left_ok && right_ok
    };

    let mut candidates = Vec::new();
    let mut group_start = 0usize;

    for gap in 0..gaps {
        let group_end_char = sentences[gap].end_char;
        let group_len = group_end_char - sentences[group_start].start_char;
        if is_valley(gap) && group_len >= min_chunk_size {
            candidates.push(make_candidate(
                &chars,
                sentences[group_start].start_char,
                group_end_char,
            ));
            group_start = gap + 1;
        }
    }

    let last = sentences.len() - 1;
    candidates.push(make_candidate(
        &chars,
        sentences[group_start].start_char,
        sentences[last].end_char,
    ));

    Ok(candidates)
}

fn make_candidate(chars: &[char], start: usize, end: usize) -> ChunkCandidate {
    let text: String = chars[start..end].iter().collect();
    ChunkCandidate::new(text, start, end)
}

fn mean_vector(vectors: &[Vec<f32>]) -> Vec<f32> {
    let dim = vectors.first().map(|v| v.len()).unwrap_or(0);
    let mut sum = vec![0.0f32; dim];
    for v in vectors {
        for (s, x) in sum.iter_mut().zip(v.iter()) {
            *s += x;
        }
    }
    let n = vectors.len().max(1) as f32;
    sum.iter_mut().for_each(|s| *s /= n);
    sum
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|y| y * y).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
