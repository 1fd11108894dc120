use crate::error::{MonitorError, Result};
use crate::traits::{NodeSource, RouteTracer};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use vpnmon_core::Node;

/// Canned result of a mock trace
#[derive(Debug, Clone)]
enum MockTrace {
    Output(String),
    Failure { exit_code: i32, stderr: String },
}

/// Route tracer that answers from a per-host table
///
/// Hosts without an entry fail the way `traceroute` does for an unresolvable
/// name. Tracks in-flight calls so tests can assert on concurrency.
pub struct MockTracer {
    traces: RwLock<HashMap<String, MockTrace>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockTracer {
    pub fn new() -> Self {
        Self {
            traces: RwLock::new(HashMap::new()),
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Make every trace take `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answer traces to `host` with `stdout` and a zero exit code
    pub async fn set_output(&self, host: &str, stdout: impl Into<String>) {
        self.traces
            .write()
            .await
            .insert(host.to_string(), MockTrace::Output(stdout.into()));
    }

    /// Answer traces to `host` with a failing exit code
    pub async fn set_failure(&self, host: &str, exit_code: i32, stderr: impl Into<String>) {
        self.traces.write().await.insert(
            host.to_string(),
            MockTrace::Failure {
                exit_code,
                stderr: stderr.into(),
            },
        );
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Traces currently running
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of traces that were running at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl Default for MockTracer {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight count when a trace finishes or is dropped
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RouteTracer for MockTracer {
    async fn trace(&self, host: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let trace = self.traces.read().await.get(host).cloned();
        debug!("Mock: traced {}", host);

        match trace {
            Some(MockTrace::Output(stdout)) => Ok(stdout),
            Some(MockTrace::Failure { exit_code, stderr }) => Err(MonitorError::command_failed(
                format!("traceroute {}", host),
                exit_code,
                stderr,
            )),
            None => Err(MonitorError::command_failed(
                format!("traceroute {}", host),
                2,
                format!("{}: Name or service not known", host),
            )),
        }
    }
}

/// Node source that replays a scripted list of responses, one per call
pub struct MockNodeSource {
    responses: Mutex<VecDeque<Result<Vec<Node>>>>,
    calls: AtomicUsize,
}

impl MockNodeSource {
    pub fn new(responses: Vec<Result<Vec<Node>>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Source that always has `nodes` available on the first call
    pub fn with_nodes(nodes: Vec<Node>) -> Self {
        Self::new(vec![Ok(nodes)])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NodeSource for MockNodeSource {
    async fn fetch(&self) -> Result<Vec<Node>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(MonitorError::internal_error("no scripted response left")))
    }
}

/// Realistic `traceroute` stdout with `hops` numbered hop lines
pub fn traceroute_output(host: &str, hops: usize) -> String {
    let mut out = format!(
        "traceroute to {} (198.51.100.10), 8 hops max, 60 byte packets\n",
        host
    );
    for hop in 1..=hops {
        if hop % 3 == 0 {
            out.push_str(&format!("{:>2}  * * *\n", hop));
        } else {
            out.push_str(&format!(
                "{:>2}  10.0.{}.1 (10.0.{}.1)  {}.412 ms  {}.398 ms  {}.377 ms\n",
                hop,
                hop,
                hop,
                hop * 2,
                hop * 2,
                hop * 2
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::hop_lines;

    #[test]
    fn test_traceroute_output_hop_count() {
        let output = traceroute_output("relay1", 6);
        assert_eq!(hop_lines(&output).count(), 6);
        assert!(output.starts_with("traceroute to relay1"));
    }

    #[tokio::test]
    async fn test_mock_tracer_unknown_host_fails() {
        let tracer = MockTracer::new();
        let err = tracer.trace("nowhere").await.unwrap_err();
        assert!(matches!(err, MonitorError::CommandFailed { exit_code: 2, .. }));
        assert_eq!(tracer.calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_node_source_replays_in_order() {
        let source = MockNodeSource::new(vec![
            Err(MonitorError::transport("mock", "refused")),
            Ok(vec![Node::new(1, "a")]),
        ]);

        assert!(source.fetch().await.is_err());
        assert_eq!(source.fetch().await.unwrap(), vec![Node::new(1, "a")]);
        assert!(matches!(
            source.fetch().await,
            Err(MonitorError::InternalError { .. })
        ));
        assert_eq!(source.calls(), 3);
    }
}
