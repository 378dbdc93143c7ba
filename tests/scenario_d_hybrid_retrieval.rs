//! Scenario D: hybrid retrieval at the extremes of its fusion weight
//! collapses to its constituent strategies — alpha=1.0 matches pure dense
//! ranking, alpha=0.0 matches pure keyword ranking.

mod common;

use ragforge::chunk::Chunk;
use ragforge::retrieval::{DenseRetriever, HybridRetriever, KeywordRetriever, Query, Retriever, RetrieverParams};

fn corpus() -> Vec<Chunk> {
    vec![
        Chunk::new("d", "rust programming language for systems work", 0, 0, 1).with_embedding(vec![1.0, 0.0]),
        Chunk::new("d", "a recipe for baking sourdough bread", 1, 0, 1).with_embedding(vec![0.0, 1.0]),
        Chunk::new("d", "systems programming with memory safety", 2, 0, 1).with_embedding(vec![0.9, 0.1]),
    ]
}

#[tokio::test]
async fn alpha_one_matches_pure_dense_ordering() {
    let corpus = corpus();
    let query = Query::new("systems programming").with_embedding(vec![1.0, 0.0]);
    let params = RetrieverParams {
        alpha: 1.0,
        top_k: 3,
        fetch_k: 3,
        ..Default::default()
    };

    let hybrid = HybridRetriever.retrieve(&query, &corpus, &params).await.unwrap();
    let dense = DenseRetriever.retrieve(&query, &corpus, &params).await.unwrap();

    let hybrid_order: Vec<usize> = hybrid.iter().map(|r| r.chunk.index).collect();
    let dense_order: Vec<usize> = dense.iter().map(|r| r.chunk.index).collect();
    assert_eq!(hybrid_order, dense_order);
}

#[tokio::test]
async fn alpha_zero_matches_pure_keyword_ordering() {
    let corpus = corpus();
    let query = Query::new("systems programming").with_embedding(vec![1.0, 0.0]);
    let params = RetrieverParams {
        alpha: 0.0,
        top_k: 3,
        fetch_k: 3,
        ..Default::default()
    };

    let hybrid = HybridRetriever.retrieve(&query, &corpus, &params).await.unwrap();
    let keyword = KeywordRetriever.retrieve(&query, &corpus, &params).await.unwrap();

    let hybrid_order: Vec<usize> = hybrid.iter().map(|r| r.chunk.index).collect();
    let keyword_order: Vec<usize> = keyword.iter().map(|r| r.chunk.index).collect();
    assert_eq!(hybrid_order, keyword_order);
}
