mod common;

use anyhow::Result;
use common::{build_index, new_corpus, test_config};
use trawl::rerank::{LexicalSession, RerankConfig, RerankService, ScoringSession, WordPieceEncoder};
use trawl::SearchPipeline;

// Full cascade over a tiny corpus with the deterministic lexical session:
// documents covering more query terms must rank higher.
#[test]
fn reranked_search_orders_by_overlap() -> Result<()> {
    let corpus = new_corpus(&[
        ("d0.txt", "quick brown fox jumps"),
        ("d1.txt", "quick dog"),
        ("d2.txt", "fox quick fox"),
    ]);
    let index = tempfile::tempdir()?;
    let mut cfg = test_config(index.path(), 4);
    build_index(corpus.path(), &cfg)?;

    let vocab = index.path().join("vocab.txt");
    std::fs::write(
        &vocab,
        "[PAD]\n[UNK]\n[CLS]\n[SEP]\nquick\nbrown\nfox\ndog\njumps\n",
    )?;
    cfg.vocab_path = vocab.clone();

    let service = RerankService::spawn(RerankConfig::from(&cfg), move || {
        let encoder = WordPieceEncoder::load(&vocab)?;
        let session: Box<dyn ScoringSession> = Box::new(LexicalSession::new(encoder.sep_id()));
        Ok((encoder, session))
    });
    let pipeline = SearchPipeline::open(&cfg)
        .map_err(anyhow::Error::from)?
        .with_rerank(service);

    let (ranked, metrics) = pipeline
        .search_with_metrics("q1", "quick and fox")
        .unwrap();
    // Candidates: docs containing both quick and fox -> {0, 2}. Both cover
    // the full query, so overlap ties and ascending id breaks it.
    assert_eq!(ranked.iter().map(|s| s.id).collect::<Vec<_>>(), vec![0, 2]);
    assert_eq!(metrics.num_candidates, 2);
    assert!(metrics.retrieval_ms >= 0.0);

    let (ranked, _) = pipeline.search_with_metrics("q2", "quick or dog").unwrap();
    // Candidates {0, 1, 2}; d1 matches both query terms, d0/d2 only one.
    assert_eq!(ranked.first().map(|s| s.id), Some(1));
    assert_eq!(ranked.len(), 3);
    Ok(())
}
