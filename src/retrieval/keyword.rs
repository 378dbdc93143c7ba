//! Keyword (TF-IDF-weighted full-text) retrieval (§4.2 `keyword`).

use std::collections::HashMap;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

use super::{filter_corpus, Query, Retriever, RetrieverParams};
use crate::chunk::{sort_and_truncate, Chunk, RetrievalResult};
use crate::error::Result;

pub struct KeywordRetriever;

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w+").unwrap())
}

fn tokenize(text: &str) -> Vec<String> {
    token_re()
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

#[async_trait]
impl Retriever for KeywordRetriever {
    async fn retrieve(
        &self,
        query: &Query,
        corpus: &[Chunk],
        params: &RetrieverParams,
    ) -> Result<Vec<RetrievalResult>> {
        let candidates = filter_corpus(corpus, params);
        let query_terms = tokenize(&query.text);
        if query_terms.is_empty() || candidates.is_empty() {
            return Ok(Vec::new());
        }

        let doc_freq = document_frequencies(&candidates, &query_terms);
        let n = candidates.len() as f32;

        let results: Vec<RetrievalResult> = candidates
            .into_iter()
            .filter_map(|chunk| {
                let terms = tokenize(&chunk.text);
                let mut term_counts: HashMap<&str, usize> = HashMap::new();
                for t in &terms {
                    *term_counts.entry(t.as_str()).or_insert(0) += 1;
                }

                let score: f32 = query_terms
                    .iter()
                    .map(|q| {
                        let tf = *term_counts.get(q.as_str()).unwrap_or(&0) as f32;
                        if tf == 0.0 {
                            return 0.0;
                        }
                        let df = *doc_freq.get(q.as_str()).unwrap_or(&0) as f32;
                        let idf = ((1.0 + n) / (1.0 + df)).ln() + 1.0;
                        tf * idf
                    })
                    .sum();

                if score > 0.0 {
                    Some(RetrievalResult::new(chunk.clone(), score))
                } else {
                    None
                }
            })
            .collect();

        Ok(sort_and_truncate(results, params.top_k))
    }
}

fn document_frequencies<'a>(candidates: &[&'a Chunk], query_terms: &[String]) -> HashMap<String, usize> {
    let mut df = HashMap::new();
    for chunk in candidates {
        let terms: std::collections::HashSet<String> = tokenize(&chunk.text).into_iter().collect();
        for q in query_terms {
            if terms.contains(q) {
                *df.entry(q.clone()).or_insert(0) += 1;
            }
        }
    }
    df
}
