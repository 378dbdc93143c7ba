//! Chunking algorithm library (§4.1): eight pluggable strategies behind one
//! `chunk(text, strategy, params)` entry point.

mod code_aware;
mod fixed;
mod heading;
mod paragraph;
mod recursive;
mod semantic;
mod sentence;
mod sentence_seg;
mod sentence_window;

pub use semantic::SentenceEmbedder;

use serde::{Deserialize, Serialize};

use crate::chunk::ChunkCandidate;
use crate::error::{PipelineError, Result};

/// One of the eight chunking strategies named in §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Fixed,
    Recursive,
    Sentence,
    Paragraph,
    SentenceWindow,
    Heading,
    CodeAware,
    Semantic,
}

/// Union of every knob the eight strategies accept. Strategies ignore the
/// fields they don't use; `ChunkParams::validate` only checks the fields a
/// given strategy actually reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkParams {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default)]
    pub overlap: usize,
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_min_chunk_size")]
    pub min_chunk_size: usize,
    #[serde(default = "default_threshold")]
    pub threshold: f32,
}

fn default_chunk_size() -> usize {
    512
}

fn default_window_size() -> usize {
    3
}

fn default_min_chunk_size() -> usize {
    64
}

fn default_threshold() -> f32 {
    0.75
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: 0,
            window_size: default_window_size(),
            min_chunk_size: default_min_chunk_size(),
            threshold: default_threshold(),
        }
    }
}

/// Split `text` per `strategy`/`params`. `semantic` requires a local
/// [`SentenceEmbedder`]; every other strategy ignores `embedder`.
pub async fn chunk(
    text: &str,
    strategy: Strategy,
    params: &ChunkParams,
    embedder: Option<&dyn SentenceEmbedder>,
) -> Result<Vec<ChunkCandidate>> {
    match strategy {
        Strategy::Fixed => fixed::chunk(text, params.chunk_size, params.overlap),
        Strategy::Recursive => recursive::chunk(text, params.chunk_size, params.overlap),
        Strategy::Sentence => sentence::chunk(text, params.chunk_size, params.overlap),
        Strategy::Paragraph => paragraph::chunk(text, params.chunk_size),
        Strategy::SentenceWindow => sentence_window::chunk(text, params.window_size, params.overlap),
        Strategy::Heading => heading::chunk(text),
        Strategy::CodeAware => code_aware::chunk(text, params.chunk_size),
        Strategy::Semantic => {
            let embedder = embedder.ok_or_else(|| {
                PipelineError::InvalidConfig(
                    "semantic: requires a SentenceEmbedder, none configured".into(),
                )
            })?;
            semantic::chunk(
                text,
                embedder,
                params.window_size,
                params.threshold,
                params.min_chunk_size,
            )
            .await
        }
    }
}
