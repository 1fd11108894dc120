use crate::error::Result;
use crate::probes::ProbeRunner;
use crate::reporter::Reporter;
use crate::sink::ResultSink;
use chrono::Utc;
use futures_util::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};
use vpnmon_core::{AvailabilitySummary, Node, ProbeOutcome, Report};

/// Report of one run together with its availability figure
#[derive(Debug, Clone)]
pub struct ProbeRun {
    pub report: Report,
    pub summary: AvailabilitySummary,
    /// Where the raw traces of this run were appended, if anywhere
    pub log_path: Option<PathBuf>,
}

/// Aborts the probe tasks of a run that is dropped before they finish
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

/// Fans out one probe per node and collects the results into a report
pub struct Coordinator {
    runner: Arc<ProbeRunner>,
    log_path: Option<PathBuf>,
    max_concurrent_probes: Option<usize>,
}

impl Coordinator {
    pub fn new(runner: Arc<ProbeRunner>) -> Self {
        Self {
            runner,
            log_path: None,
            max_concurrent_probes: None,
        }
    }

    /// Append raw traces to `path` on every run
    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Cap the number of probes running at once. `None` probes every node
    /// simultaneously. A cap of zero is rejected by `MonitorConfig::validate`.
    pub fn with_max_concurrent_probes(mut self, limit: Option<usize>) -> Self {
        self.max_concurrent_probes = limit;
        self
    }

    /// Sink for one run. A log that cannot be opened costs the raw traces,
    /// not the report.
    async fn open_sink(&self) -> ResultSink {
        let Some(path) = &self.log_path else {
            return ResultSink::in_memory();
        };
        match ResultSink::open(path).await {
            Ok(sink) => sink,
            Err(e) => {
                warn!("Raw trace log disabled for this run: {}", e);
                ResultSink::in_memory()
            }
        }
    }

    /// Probe every node concurrently and wait for all of them.
    ///
    /// Each call owns a fresh sink, so nothing carries over between runs.
    /// A probe task that panics is recorded as errored for its node.
    pub async fn run(&self, nodes: &[Node]) -> Result<ProbeRun> {
        let sink = Arc::new(self.open_sink().await);
        let limiter = self.max_concurrent_probes.map(|n| Arc::new(Semaphore::new(n)));

        let timestamp = Utc::now();

        let handles: Vec<_> = nodes
            .iter()
            .cloned()
            .map(|node| {
                let runner = self.runner.clone();
                let sink = sink.clone();
                let limiter = limiter.clone();

                tokio::spawn(async move {
                    let _permit = match limiter {
                        Some(limiter) => limiter.acquire_owned().await.ok(),
                        None => None,
                    };
                    runner.probe(&node, &sink).await
                })
            })
            .collect();

        info!("Probing {} nodes", handles.len());

        // Dropping this future aborts probes still in flight
        let _abort = AbortOnDrop(handles.iter().map(|h| h.abort_handle()).collect());

        for (node, joined) in nodes.iter().zip(join_all(handles).await) {
            match joined {
                Ok(outcome) => debug!(node_id = node.id, status = %outcome.status, "Probe joined"),
                Err(e) => {
                    error!(node_id = node.id, "Probe task failed: {}", e);
                    sink.append(ProbeOutcome::errored(node, Some(e.to_string())))
                        .await;
                }
            }
        }

        let summary = Reporter::summary(sink.available().await, nodes.len());
        let report = Reporter::build(timestamp, sink.take_outcomes().await);

        Ok(ProbeRun {
            report,
            summary,
            log_path: sink.log_path().map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{traceroute_output, MockTracer};
    use std::collections::HashSet;
    use std::time::Duration;
    use vpnmon_core::Verdict;

    fn coordinator(tracer: Arc<MockTracer>) -> Coordinator {
        Coordinator::new(Arc::new(ProbeRunner::new(tracer)))
    }

    #[tokio::test]
    async fn test_example_ordering() {
        let tracer = Arc::new(MockTracer::new());
        tracer.set_output("a", traceroute_output("a", 6)).await;
        tracer.set_failure("b", 1, "b: Name or service not known").await;
        tracer.set_output("c", traceroute_output("c", 5)).await;

        let nodes = vec![Node::new(1, "a"), Node::new(2, "b"), Node::new(3, "c")];
        let run = coordinator(tracer).run(&nodes).await.unwrap();

        let ids: Vec<u64> = run.report.results.iter().map(|o| o.node_id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
        assert_eq!(run.report.results[2].status, Verdict::Errored);
        assert_eq!(run.summary.to_string(), "2/3");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_one_outcome_per_node() {
        let tracer = Arc::new(MockTracer::new());
        let mut nodes = Vec::new();
        for id in 0..50u64 {
            let host = format!("relay{id}");
            match id % 3 {
                0 => tracer.set_output(&host, traceroute_output(&host, 8)).await,
                1 => tracer.set_output(&host, traceroute_output(&host, 2)).await,
                _ => {} // unknown host, fails
            }
            nodes.push(Node::new(id, host));
        }

        let run = coordinator(tracer.clone()).run(&nodes).await.unwrap();

        assert_eq!(run.report.len(), nodes.len());
        let ids: HashSet<u64> = run.report.results.iter().map(|o| o.node_id).collect();
        assert_eq!(ids.len(), nodes.len());
        assert_eq!(tracer.calls(), nodes.len());
        assert_eq!(run.summary.available, 17);
        assert_eq!(run.summary.total, 50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_nodes_probed_simultaneously() {
        let tracer = Arc::new(MockTracer::new().with_delay(Duration::from_secs(10)));
        let nodes: Vec<Node> = (0..20u64).map(|id| Node::new(id, format!("relay{id}"))).collect();
        for node in &nodes {
            tracer.set_output(&node.host, traceroute_output(&node.host, 5)).await;
        }

        let start = tokio::time::Instant::now();
        let run = coordinator(tracer.clone()).run(&nodes).await.unwrap();

        assert_eq!(run.report.len(), 20);
        assert_eq!(tracer.peak_in_flight(), 20);
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_cap() {
        let tracer = Arc::new(MockTracer::new().with_delay(Duration::from_secs(1)));
        let nodes: Vec<Node> = (0..12u64).map(|id| Node::new(id, format!("relay{id}"))).collect();
        for node in &nodes {
            tracer.set_output(&node.host, traceroute_output(&node.host, 5)).await;
        }

        let run = coordinator(tracer.clone())
            .with_max_concurrent_probes(Some(4))
            .run(&nodes)
            .await
            .unwrap();

        assert_eq!(run.report.len(), 12);
        assert_eq!(tracer.peak_in_flight(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_run_aborts_probes() {
        let tracer = Arc::new(MockTracer::new().with_delay(Duration::from_secs(3600)));
        let nodes: Vec<Node> = (0..5u64).map(|id| Node::new(id, format!("relay{id}"))).collect();
        let coordinator = coordinator(tracer.clone());

        let abandoned =
            tokio::time::timeout(Duration::from_secs(1), coordinator.run(&nodes)).await;
        assert!(abandoned.is_err());
        assert_eq!(tracer.calls(), 5);

        // Give the aborted tasks a chance to be torn down
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(tracer.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_raw_log_written_per_successful_probe() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("vpnmon.log");

        let tracer = Arc::new(MockTracer::new());
        tracer.set_output("a", traceroute_output("a", 5)).await;
        tracer.set_output("b", traceroute_output("b", 1)).await;

        let nodes = vec![Node::new(1, "a"), Node::new(2, "b"), Node::new(3, "c")];
        let run = coordinator(tracer)
            .with_log_path(&log)
            .run(&nodes)
            .await
            .unwrap();

        assert_eq!(run.log_path.as_deref(), Some(log.as_path()));
        let contents = std::fs::read_to_string(&log).unwrap();
        // Two successful traces logged, the failed one is not
        assert_eq!(contents.matches("traceroute to ").count(), 2);
    }

    #[tokio::test]
    async fn test_unopenable_log_still_reports_every_node() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("missing-dir").join("vpnmmon.log");

        let tracer = Arc::new(MockTracer::new());
        tracer.set_output("a", traceroute_output("a", 5)).await;
        tracer.set_output("b", traceroute_output("b", 2)).await;

        let nodes = vec![Node::new(1, "a"), Node::new(2, "b"), Node::new(3, "c")];
        let run = coordinator(tracer.clone())
            .with_log_path(&log)
            .run(&nodes)
            .await
            .unwrap();

        assert_eq!(run.report.len(), 3);
        assert_eq!(tracer.calls(), 3);
        assert_eq!(run.summary.to_string(), "1/3");
        assert!(run.log_path.is_none());
        assert!(!log.exists());
    }

    #[tokio::test]
    async fn test_runs_do_not_share_state() {
        let tracer = Arc::new(MockTracer::new());
        tracer.set_output("a", traceroute_output("a", 5)).await;

        let coordinator = coordinator(tracer);
        let nodes = vec![Node::new(1, "a")];

        let first = coordinator.run(&nodes).await.unwrap();
        let second = coordinator.run(&nodes).await.unwrap();

        assert_eq!(first.report.len(), 1);
        assert_eq!(second.report.len(), 1);
        assert_eq!(second.summary.available, 1);
    }

    #[tokio::test]
    async fn test_empty_node_set() {
        let run = coordinator(Arc::new(MockTracer::new()))
            .run(&[])
            .await
            .unwrap();
        assert!(run.report.is_empty());
        assert_eq!(run.summary.total, 0);
    }
}
