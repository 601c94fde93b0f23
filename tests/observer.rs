use std::sync::{Arc, Mutex};

use fluent_dataset::{
    CompositePipelineObserver, Dataset, KeySelectors, MergeOptions, MergeStats, PipelineEvent, PipelineMetrics,
    PipelineObserver, PipelineOp, PipelineOptions,
};
use serde_json::json;

#[derive(Default)]
struct RecordingObserver {
    ops: Mutex<Vec<(PipelineOp, usize, usize)>>,
    merges: Mutex<Vec<MergeStats>>,
    materialized: Mutex<Vec<usize>>,
}

impl PipelineObserver for RecordingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::OperationApplied {
                op,
                level_before,
                level_after,
            } => self.ops.lock().unwrap().push((*op, *level_before, *level_after)),
            PipelineEvent::Materialized { group_level } => self.materialized.lock().unwrap().push(*group_level),
            PipelineEvent::MergeFinished { stats } => self.merges.lock().unwrap().push(*stats),
        }
    }
}

#[test]
fn observer_receives_level_transitions() {
    let obs = Arc::new(RecordingObserver::default());
    let mut ds = Dataset::with_options(
        vec![json!({"k": "a"}), json!({"k": "b"}), json!({"k": "a"})],
        PipelineOptions {
            observer: Some(obs.clone()),
        },
    );
    ds.group(|r| r["k"].clone())
        .map(|r| r)
        .reduce(fluent_dataset::Reducer::fold(|rows| json!(rows.len())))
        .unwrap();
    ds.get().unwrap();

    assert_eq!(
        *obs.ops.lock().unwrap(),
        vec![
            (PipelineOp::Group, 1, 2),
            (PipelineOp::Map, 2, 2),
            (PipelineOp::Reduce, 2, 2),
            (PipelineOp::Ungroup, 2, 1),
        ]
    );
    assert_eq!(*obs.materialized.lock().unwrap(), vec![1]);
}

#[test]
fn merge_stats_are_reported_once_the_output_is_consumed() {
    let obs = Arc::new(RecordingObserver::default());
    let mut ds = Dataset::new(vec![
        json!({"id": 1}),
        json!({"id": 2}),
        json!({"id": 2}),
        json!({"id": 4}),
    ]);
    ds.observe(obs.clone());
    ds.merge(
        Dataset::new(vec![json!({"id": 2, "r": true}), json!({"id": 3, "r": true})]),
        KeySelectors::same(["id"]),
        MergeOptions::keywords("both both").unwrap(),
    )
    .unwrap();
    assert!(obs.merges.lock().unwrap().is_empty());

    let out = ds.get().unwrap();
    assert_eq!(out.as_array().map(Vec::len), Some(5));

    let merges = obs.merges.lock().unwrap();
    assert_eq!(
        merges.as_slice(),
        &[MergeStats {
            left_rows: 4,
            probes: 2,
            skipped_duplicates: 0,
            matched_pairs: 2,
            right_only: 1,
            left_only: 2,
            emitted: 5,
        }]
    );
}

#[test]
fn composite_observer_feeds_metrics_and_recorder() {
    let metrics = Arc::new(PipelineMetrics::new());
    let recorder = Arc::new(RecordingObserver::default());
    let composite = CompositePipelineObserver::new(vec![
        metrics.clone() as Arc<dyn PipelineObserver>,
        recorder.clone(),
    ]);

    let mut ds = Dataset::with_options(
        vec![json!(3), json!(1), json!(2)],
        PipelineOptions {
            observer: Some(Arc::new(composite)),
        },
    );
    ds.filter(|v| v.as_i64() != Some(1));
    ds.with(|v| assert_eq!(v, &json!([3, 2]))).unwrap();

    let snap = metrics.snapshot();
    assert_eq!(snap.operations, 1);
    assert_eq!(snap.materializations, 1);
    assert_eq!(recorder.ops.lock().unwrap().len(), 1);
}
