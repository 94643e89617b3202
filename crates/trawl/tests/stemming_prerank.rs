mod common;

use anyhow::Result;
use common::{new_corpus, test_config};
use trawl::{DocumentStream, SearchPipeline};

// An index built with stemming folds inflected forms together; the query
// side uses the same normalizer, so either form matches.
#[test]
fn stemmed_index_matches_inflected_queries() -> Result<()> {
    let corpus = new_corpus(&[
        ("d0.txt", "the virus spreads quickly"),
        ("d1.txt", "viruses spreading in schools"),
        ("d2.txt", "unrelated content"),
    ]);
    let index = tempfile::tempdir()?;
    let mut cfg = test_config(index.path(), 4);
    cfg.stemming = true;

    let stream = DocumentStream::open_with_normalizer(corpus.path(), cfg.normalizer())?;
    trawl::BsbiIndexer::new(&stream, &cfg).build()?;

    let pipeline = SearchPipeline::open(&cfg).map_err(anyhow::Error::from)?;
    assert_eq!(pipeline.search_boolean("virus").unwrap().into_vec(), vec![0, 1]);
    assert_eq!(
        pipeline.search_boolean("viruses").unwrap().into_vec(),
        vec![0, 1]
    );
    assert_eq!(
        pipeline.search_boolean("spread and not school").unwrap().into_vec(),
        vec![0]
    );
    Ok(())
}

#[test]
fn preranked_search_orders_by_term_coverage() -> Result<()> {
    let corpus = new_corpus(&[
        ("d0.txt", "quick brown fox"),
        ("d1.txt", "quick dog"),
        ("d2.txt", "brown quick fox terrier"),
    ]);
    let index = tempfile::tempdir()?;
    let cfg = test_config(index.path(), 4);
    let stream = DocumentStream::open(corpus.path())?;
    trawl::BsbiIndexer::new(&stream, &cfg).build()?;

    let pipeline = SearchPipeline::open(&cfg).map_err(anyhow::Error::from)?;
    let ranked = pipeline.search_preranked("quick or brown or fox").unwrap();
    // Boolean OR admits all three; 0 and 2 cover three query terms and tie,
    // broken by ascending id, d1 covers only "quick".
    assert_eq!(ranked.iter().map(|s| s.id).collect::<Vec<_>>(), vec![0, 2, 1]);
    assert_eq!(ranked[0].score, 3.0);
    assert_eq!(ranked[2].score, 1.0);
    Ok(())
}
