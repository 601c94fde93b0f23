//! Pipeline events, observers and metrics.
//!
//! A [`crate::Dataset`] reports what it does to an optional [`PipelineObserver`]:
//! every chained operation, every materialization, and a summary for each merge once its
//! output has been fully consumed. The same events are also written to the `log` facade at
//! `trace` level.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Pipeline operation names, as reported in events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineOp {
    Map,
    Filter,
    Sort,
    Group,
    Ungroup,
    Reduce,
    Distinct,
    Merge,
}

impl fmt::Display for PipelineOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Map => "map",
            Self::Filter => "filter",
            Self::Sort => "sort",
            Self::Group => "group",
            Self::Ungroup => "ungroup",
            Self::Reduce => "reduce",
            Self::Distinct => "distinct",
            Self::Merge => "merge",
        };
        f.write_str(name)
    }
}

/// Counters describing one merge call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Left-hand records indexed.
    pub left_rows: u64,
    /// Right-hand rows probed against the left index.
    pub probes: u64,
    /// Right-hand rows skipped because their key was already processed (distinct merges).
    pub skipped_duplicates: u64,
    /// Matched left/right pairs.
    pub matched_pairs: u64,
    /// Right-hand rows with no left match.
    pub right_only: u64,
    /// Left-hand records never matched by any right row.
    pub left_only: u64,
    /// Rows emitted after combination and mapping.
    pub emitted: u64,
}

/// Events emitted by a dataset pipeline.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// An operation was chained onto the pipeline.
    OperationApplied {
        op: PipelineOp,
        level_before: usize,
        level_after: usize,
    },
    /// The pipeline was materialized (`get`, `with`, `into_value`).
    Materialized { group_level: usize },
    /// A merge's output was fully consumed.
    MergeFinished { stats: MergeStats },
}

/// Observer hook for pipeline events.
pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent);
}

/// A simple stderr logger for pipeline events.
#[derive(Debug, Default)]
pub struct StdErrPipelineObserver;

impl PipelineObserver for StdErrPipelineObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::OperationApplied {
                op,
                level_before,
                level_after,
            } => eprintln!("[pipeline][{op}] group_level {level_before} -> {level_after}"),
            PipelineEvent::Materialized { group_level } => {
                eprintln!("[pipeline][get] materialized at group_level {group_level}")
            }
            PipelineEvent::MergeFinished { stats } => eprintln!(
                "[pipeline][merge] left_rows={} probes={} matched={} right_only={} left_only={} emitted={}",
                stats.left_rows, stats.probes, stats.matched_pairs, stats.right_only, stats.left_only, stats.emitted
            ),
        }
    }
}

/// An observer that fans out events to a list of observers.
#[derive(Default)]
pub struct CompositePipelineObserver {
    observers: Vec<Arc<dyn PipelineObserver>>,
}

impl CompositePipelineObserver {
    pub fn new(observers: Vec<Arc<dyn PipelineObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositePipelineObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositePipelineObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl PipelineObserver for CompositePipelineObserver {
    fn on_event(&self, event: &PipelineEvent) {
        for o in &self.observers {
            o.on_event(event);
        }
    }
}

/// Running counters fed by pipeline events.
///
/// Attach it as an observer (it implements [`PipelineObserver`]) and snapshot it at any time.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    operations: AtomicU64,
    materializations: AtomicU64,
    merges: AtomicU64,
    merge_rows_emitted: AtomicU64,
    merge_probes: AtomicU64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> PipelineMetricsSnapshot {
        PipelineMetricsSnapshot {
            operations: self.operations.load(Ordering::SeqCst),
            materializations: self.materializations.load(Ordering::SeqCst),
            merges: self.merges.load(Ordering::SeqCst),
            merge_rows_emitted: self.merge_rows_emitted.load(Ordering::SeqCst),
            merge_probes: self.merge_probes.load(Ordering::SeqCst),
        }
    }
}

impl PipelineObserver for PipelineMetrics {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::OperationApplied { .. } => {
                let _ = self.operations.fetch_add(1, Ordering::SeqCst);
            }
            PipelineEvent::Materialized { .. } => {
                let _ = self.materializations.fetch_add(1, Ordering::SeqCst);
            }
            PipelineEvent::MergeFinished { stats } => {
                let _ = self.merges.fetch_add(1, Ordering::SeqCst);
                let _ = self.merge_rows_emitted.fetch_add(stats.emitted, Ordering::SeqCst);
                let _ = self.merge_probes.fetch_add(stats.probes, Ordering::SeqCst);
            }
        }
    }
}

/// Immutable snapshot of [`PipelineMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineMetricsSnapshot {
    pub operations: u64,
    pub materializations: u64,
    pub merges: u64,
    pub merge_rows_emitted: u64,
    pub merge_probes: u64,
}

impl fmt::Display for PipelineMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "operations={}, materializations={}, merges={}, merge_rows_emitted={}, merge_probes={}",
            self.operations, self.materializations, self.merges, self.merge_rows_emitted, self.merge_probes
        )
    }
}

/// Forwards events to the configured observer and to `log`.
#[derive(Clone, Default)]
pub(crate) struct EventSink {
    observer: Option<Arc<dyn PipelineObserver>>,
}

impl EventSink {
    pub(crate) fn new(observer: Option<Arc<dyn PipelineObserver>>) -> Self {
        Self { observer }
    }

    pub(crate) fn emit(&self, event: PipelineEvent) {
        log::trace!("{event:?}");
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }

    pub(crate) fn is_observed(&self) -> bool {
        self.observer.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CompositePipelineObserver, MergeStats, PipelineEvent, PipelineMetrics, PipelineObserver, PipelineOp,
    };
    use std::sync::Arc;

    #[test]
    fn metrics_count_events() {
        let metrics = PipelineMetrics::new();
        metrics.on_event(&PipelineEvent::OperationApplied {
            op: PipelineOp::Group,
            level_before: 1,
            level_after: 2,
        });
        metrics.on_event(&PipelineEvent::Materialized { group_level: 2 });
        metrics.on_event(&PipelineEvent::MergeFinished {
            stats: MergeStats {
                probes: 4,
                emitted: 3,
                ..Default::default()
            },
        });

        let snap = metrics.snapshot();
        assert_eq!(snap.operations, 1);
        assert_eq!(snap.materializations, 1);
        assert_eq!(snap.merges, 1);
        assert_eq!(snap.merge_rows_emitted, 3);
        assert_eq!(snap.merge_probes, 4);
        assert!(snap.to_string().contains("merges=1"));
    }

    #[test]
    fn composite_fans_out() {
        let a = Arc::new(PipelineMetrics::new());
        let b = Arc::new(PipelineMetrics::new());
        let composite = CompositePipelineObserver::new(vec![a.clone() as Arc<dyn PipelineObserver>, b.clone()]);
        composite.on_event(&PipelineEvent::Materialized { group_level: 1 });
        assert_eq!(a.snapshot().materializations, 1);
        assert_eq!(b.snapshot().materializations, 1);
    }
}
