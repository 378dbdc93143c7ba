//! Recursive separator-cascade chunking (§4.1 `recursively`).
//!
//! Splits on an ordered separator list, greedily re-merging pieces up to
//! `chunk_size` at each level and only recursing into the next (finer)
//! separator when a single piece still exceeds `chunk_size`.

use crate::chunk::ChunkCandidate;
use crate::error::{PipelineError, Result};

const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " ", ""];

pub fn chunk(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<ChunkCandidate>> {
    if chunk_size == 0 {
        return Err(PipelineError::InvalidConfig(
            "recursive: chunk_size must be greater than 0".into(),
        ));
    }
    if overlap >= chunk_size {
        return Err(PipelineError::InvalidConfig(
            "recursive: overlap must be less than chunk_size".into(),
        ));
    }

    let root: Vec<char> = text.chars().collect();
    if root.is_empty() {
        return Ok(Vec::new());
    }

    Ok(split_recursive(&root, 0, root.len(), chunk_size, overlap, SEPARATORS))
}

fn split_recursive(
    root: &[char],
    start: usize,
    end: usize,
    chunk_size: usize,
    overlap: usize,
    seps: &[&str],
) -> Vec<ChunkCandidate> {
    let sep = seps[0];
    let pieces = split_positions(root, start, end, sep);
    merge_or_recurse(root, pieces, chunk_size, overlap, seps)
}

/// Split `root[start..end]` on occurrences of `sep`, returning the
/// non-separator spans as `(start, end)` char offsets into `root`. An empty
/// separator splits per character.
fn split_positions(root: &[char], start: usize, end: usize, sep: &str) -> Vec<(usize, usize)> {
    if sep.is_empty() {
        return (start..end).map(|i| (i, i + 1)).collect();
    }

    let needle: Vec<char> = sep.chars().collect();
    let mut pieces = Vec::new();
    let mut piece_start = start;
    let mut i = start;

    while i + needle.len() <= end {
        if root[i..i + needle.len()] == needle[..] {
            pieces.push((piece_start, i));
            i += needle.len();
            piece_start = i;
        } else {
            i += 1;
        }
    }
    pieces.push((piece_start, end));
    pieces.into_iter().filter(|&(s, e)| e > s).collect()
}

fn merge_or_recurse(
    root: &[char],
    pieces: Vec<(usize, usize)>,
    chunk_size: usize,
    overlap: usize,
    seps: &[&str],
) -> Vec<ChunkCandidate> {
    let mut good: Vec<(usize, usize)> = Vec::new();
    let mut out = Vec::new();

    for piece in pieces {
        let piece_len = piece.1 - piece.0;
        if piece_len <= chunk_size {
            good.push(piece);
            continue;
        }

        if !good.is_empty() {
            out.extend(merge_good(root, &good, chunk_size, overlap));
            good.clear();
        }

        if seps.len() > 1 {
            out.extend(split_recursive(root, piece.0, piece.1, chunk_size, overlap, &seps[1..]));
        } else {
            // Only the empty separator remains, which never produces an
            // over-long piece (each piece is one character).
            out.push(make_candidate(root, piece.0, piece.1));
        }
    }

    if !good.is_empty() {
        out.extend(merge_good(root, &good, chunk_size, overlap));
    }

    out
}

/// Greedily concatenate same-level pieces until the next piece would exceed
/// `chunk_size`; seed the next accumulator with up to `overlap` trailing
/// characters of the finalized group.
fn merge_good(
    root: &[char],
    pieces: &[(usize, usize)],
    chunk_size: usize,
    overlap: usize,
) -> Vec<ChunkCandidate> {
    let mut out = Vec::new();
    let mut current: Vec<(usize, usize)> = Vec::new();

    for &piece in pieces {
        if let Some(&first) = current.first() {
            let tentative_len = piece.1 - first.0;
            if tentative_len > chunk_size {
                let span = (current.first().unwrap().0, current.last().unwrap().1);
                out.push(make_candidate(root, span.0, span.1));
                current = seed_overlap(&current, overlap);
            }
        }
        current.push(piece);
    }

    if !current.is_empty() {
        let span = (current.first().unwrap().0, current.last().unwrap().1);
        out.push(make_candidate(root, span.0, span.1));
    }

    out
}

fn seed_overlap(finalized: &[(usize, usize)], overlap: usize) -> Vec<(usize, usize)> {
    if overlap == 0 {
        return Vec::new();
    }
    let end = finalized.last().unwrap().1;
    let mut seeded = Vec::new();
    for &piece in finalized.iter().rev() {
        if end - piece.0 <= overlap {
            seeded.insert(0, piece);
        } else {
            break;
        }
    }
    seeded
}

fn make_candidate(root: &[char], start: usize, end: usize) -> ChunkCandidate {
    let text: String = root[start..end].iter().collect();
    ChunkCandidate::new(text, start, end)
}
