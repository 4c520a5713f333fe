//! Tests for retrieval ranking correctness.

#[cfg(test)]
mod tests {
    use crate::config::RetrievalConfig;
    use crate::rag::filter::FilterSpec;
    use crate::rag::retrieve::retrieve;
    use crate::tests::{lance_store, record, trigram_store, CountingEmbedder, StaticEmbedder};
    use crate::types::Score;

    #[tokio::test]
    async fn test_relevant_chunk_ranks_first() {
        let (_dir, store) = lance_store(
            vec![
                record("cooking.pdf", 1, "Cooking recipes for pasta", &[]),
                record("tele.pdf", 2, "Telehealth licensure rules", &[]),
            ],
            vec![vec![-0.3, -0.8, 0.4, -0.2], vec![1.0, 0.5, 0.2, 0.1]],
        )
        .await;
        let embedder = StaticEmbedder::new(vec![0.9, 0.4, 0.3, 0.1]);

        let contexts = retrieve(
            "query",
            embedder.as_ref(),
            &store,
            5,
            &FilterSpec::new(),
            &RetrievalConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(contexts.len(), 2);
        assert_eq!(contexts[0].record.doc, "tele.pdf", "Most relevant chunk should be first");

        let top = contexts[0].score.similarity().unwrap();
        let second = contexts[1].score.similarity().unwrap();
        assert!(top > 0.8, "Relevant chunk score should be high: {}", top);
        assert!(top > second, "Scores should be ordered");
    }

    #[tokio::test]
    async fn test_scores_descending_and_bounded() {
        let (_dir, store) = lance_store(
            vec![
                record("a.pdf", 1, "A", &[]),
                record("b.pdf", 1, "B", &[]),
                record("c.pdf", 1, "C", &[]),
                record("d.pdf", 1, "D", &[]),
            ],
            vec![
                vec![-1.0, 0.0, 0.0],
                vec![0.7, 0.7, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![5.0, 0.0, 0.0],
            ],
        )
        .await;
        let embedder = StaticEmbedder::new(vec![2.0, 0.0, 0.0]);

        let contexts = retrieve(
            "query",
            embedder.as_ref(),
            &store,
            10,
            &FilterSpec::new(),
            &RetrievalConfig::default(),
        )
        .await
        .unwrap();

        let scores: Vec<f32> = contexts.iter().map(|c| c.score.similarity().unwrap()).collect();
        assert_eq!(scores.len(), 4, "A small corpus returns fewer hits than requested");
        for pair in scores.windows(2) {
            assert!(pair[0] >= pair[1], "Scores should be ordered: {:?}", scores);
        }
        assert!(scores.iter().all(|s| (-1.0001f32..=1.0001).contains(s)));
        assert_eq!(contexts[0].record.doc, "d.pdf");
        assert_eq!(contexts[3].record.doc, "a.pdf");
    }

    #[tokio::test]
    async fn test_filters_skip_better_candidates() {
        let (_dir, store) = lance_store(
            vec![
                record("best.pdf", 1, "x", &["robotics"]),
                record("good.pdf", 1, "y", &["telemedicine", "ehr"]),
                record("weak.pdf", 1, "z", &["telemedicine"]),
            ],
            vec![vec![1.0, 0.0], vec![0.8, 0.2], vec![0.1, 0.9]],
        )
        .await;
        let embedder = StaticEmbedder::new(vec![1.0, 0.0]);
        let filters = FilterSpec::new().with_topics(["telemedicine", "unused"]);

        let contexts = retrieve(
            "query",
            embedder.as_ref(),
            &store,
            1,
            &filters,
            &RetrievalConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].record.doc, "good.pdf");
    }

    #[tokio::test]
    async fn test_trigram_similarity_prefers_shared_words() {
        let store = trigram_store(vec![
            record("robots.pdf", 1, "Robotic assistants help older adults at home", &[]),
            record("tele.pdf", 1, "Licensure and reimbursement barriers slow telemedicine", &[]),
        ])
        .await;
        let embedder = CountingEmbedder::new();

        let contexts = retrieve(
            "telemedicine licensure barriers",
            embedder.as_ref(),
            &store,
            2,
            &FilterSpec::new(),
            &RetrievalConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(embedder.calls(), 1);
        assert_eq!(contexts[0].record.doc, "tele.pdf");
        assert!(matches!(contexts[0].score, Score::Similarity(_)));
    }

    #[tokio::test]
    async fn test_empty_store_skips_embedding() {
        let store = trigram_store(vec![]).await;
        let embedder = CountingEmbedder::new();

        let contexts = retrieve(
            "anything",
            embedder.as_ref(),
            &store,
            5,
            &FilterSpec::new(),
            &RetrievalConfig::default(),
        )
        .await
        .unwrap();

        assert!(contexts.is_empty());
        assert_eq!(embedder.calls(), 0);
    }
}
