mod common;

use std::collections::HashSet;

use common::TestEnv;
use langfuse_rs::EventType;
use proptest::prelude::*;
use serde_json::json;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn admission_respects_total_capacity(shards in 1usize..6, capacity in 1usize..6, count in 0usize..40) {
        tokio_test::block_on(async {
            let env = TestEnv::new(shards, capacity);
            let total = shards * capacity;

            for n in 0..count {
                let result = env.manager.enqueue(&n.to_string(), EventType::EventCreate, json!(n)).await;
                if n < total {
                    prop_assert!(result.is_ok());
                } else {
                    prop_assert!(result.unwrap_err().is_no_capacity());
                }
            }

            let mut seen = HashSet::new();
            for shard in 0..shards {
                let ids = env.shard_ids(shard).await;
                prop_assert!(ids.len() <= capacity);
                for id in ids {
                    prop_assert!(seen.insert(id));
                }
            }
            prop_assert_eq!(seen.len(), count.min(total));
            Ok(())
        })?;
    }

    #[test]
    fn partial_flush_keeps_exactly_failed_in_order(
        rejected in proptest::collection::vec(any::<bool>(), 1..20),
    ) {
        tokio_test::block_on(async {
            let env = TestEnv::new(1, rejected.len());
            let ids: Vec<String> = (0..rejected.len()).map(|n| format!("r{}", n)).collect();

            for id in &ids {
                env.manager.enqueue(id, EventType::EventCreate, json!({})).await.unwrap();
            }

            let failed: Vec<&str> = ids
                .iter()
                .zip(&rejected)
                .filter(|(_, rejected)| **rejected)
                .map(|(id, _)| id.as_str())
                .collect();
            env.ingestion.reject(&failed);
            env.manager.flush().await;

            prop_assert_eq!(env.shard_ids(0).await, failed);
            Ok(())
        })?;
    }
}
