mod common;

use std::sync::Arc;

use common::MockIngestion;
use langfuse_rs::{BatchEventManager, Generation, Langfuse, Score, Span, Trace};

#[test_log::test(tokio::test)]
async fn facade_delivers_everything_on_shutdown() -> anyhow::Result<()> {
    let ingestion = MockIngestion::new();
    let manager = Arc::new(BatchEventManager::with_pool(ingestion.clone(), 2, 10));
    let langfuse = Langfuse::with_batch_manager(manager, None);

    let trace = langfuse.trace(Trace::new().with_id("t1").with_name("chat")).await?;
    let span = langfuse.span(trace.span(Span::new().with_id("s1"))).await?;
    let generation = langfuse
        .generation(span.generation(Generation::new().with_id("g1").with_model("gpt-4")))
        .await?;
    langfuse.end_generation(generation).await?;
    langfuse.end_span(span).await?;
    langfuse.score(trace.score(Score::new("helpful", 1.0).with_id("sc1"))).await?;

    langfuse.shutdown().await;

    let delivered = ingestion.delivered_ids();
    for id in ["t1", "s1", "g1", "sc1"] {
        assert!(delivered.iter().any(|d| d == id), "{} not delivered", id);
    }
    assert_eq!(delivered.len(), 6);
    assert!(!langfuse.is_running());
    Ok(())
}

#[tokio::test]
async fn full_buffers_fail_fast() {
    let ingestion = MockIngestion::new();
    let manager = Arc::new(BatchEventManager::with_pool(ingestion.clone(), 1, 1));
    let langfuse = Langfuse::with_event_manager(manager);

    langfuse.trace(Trace::new()).await.unwrap();
    let err = langfuse.trace(Trace::new()).await.unwrap_err();

    assert!(err.is_no_capacity());
    assert!(ingestion.batches().is_empty());
}
