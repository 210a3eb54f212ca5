//! Property tests over the queue fill and pipeline output.

use proptest::prelude::*;
use reel_feed::{Collaborators, Pipeline, PrefetchQueue};
use reel_test_utils::assertions::assert_component_compliant;
use reel_test_utils::generators::arb_idea;
use reel_test_utils::{
    fixtures, CountingApplyEngine, MemorySink, ScriptedCodeGenerator, ScriptedIdeaSource,
};
use std::sync::Arc;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

fn pipeline(codegen: Arc<ScriptedCodeGenerator>, apply: CountingApplyEngine) -> Pipeline {
    Pipeline::new(
        Collaborators {
            ideas: Arc::new(ScriptedIdeaSource::new(["Neon Racer", "Pixel Pirates"])),
            codegen,
            apply: Arc::new(apply),
            sink: Arc::new(MemorySink::new()),
        },
        fixtures::feed_config(5),
    )
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Filling an empty queue with k failing runs leaves exactly target - k.
    #[test]
    fn prop_fill_short_by_failures(
        capacity in 1usize..=6,
        failures in 0usize..=6,
        concurrency in 1usize..=3,
    ) {
        let failures = failures.min(capacity);
        let codegen = Arc::new(ScriptedCodeGenerator::new());
        codegen.fail_next(failures);
        let pipeline = pipeline(codegen, CountingApplyEngine::new());
        let queue = PrefetchQueue::new(capacity);

        let report = runtime().block_on(queue.fill_to_target(&pipeline, capacity, None, concurrency));

        prop_assert_eq!(report.failed, failures);
        prop_assert_eq!(queue.len(), capacity - failures);
        prop_assert!(queue.len() <= queue.capacity());
    }

    /// Whatever the apply step does to a valid component, the artifact
    /// payload comes out compliant and still mentions the idea.
    #[test]
    fn prop_artifact_payload_compliant(
        idea in arb_idea(),
        drop_import in any::<bool>(),
        drop_export in any::<bool>(),
        fenced in any::<bool>(),
    ) {
        let mut merged = fixtures::component_for(&idea);
        if drop_import {
            merged = merged.replacen("import React, { useState } from 'react';", "", 1);
        }
        if drop_export {
            merged = merged.replacen("export default GameZone;", "", 1);
        }
        if fenced {
            merged = format!("```jsx\n{}\n```", merged);
        }

        let pipeline = pipeline(
            Arc::new(ScriptedCodeGenerator::new()),
            CountingApplyEngine::returning(merged),
        );
        let artifact = runtime()
            .block_on(pipeline.produce_traced(Some(idea.clone())))
            .1
            .unwrap();

        assert_component_compliant(artifact.payload(), "GameZone");
        prop_assert!(artifact.payload().contains(idea.as_str()));
        prop_assert_eq!(artifact.idea(), &idea);
    }
}
