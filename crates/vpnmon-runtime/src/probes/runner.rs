use crate::error::MonitorError;
use crate::probes::types::{classify, DEFAULT_HOP_THRESHOLD};
use crate::sink::ResultSink;
use crate::traits::RouteTracer;
use std::sync::Arc;
use tracing::{debug, error, warn};
use vpnmon_core::{CoreError, Node, ProbeOutcome};

/// Probes a single node and records the outcome in a sink
pub struct ProbeRunner {
    tracer: Arc<dyn RouteTracer>,
    hop_threshold: usize,
}

impl ProbeRunner {
    pub fn new(tracer: Arc<dyn RouteTracer>) -> Self {
        Self {
            tracer,
            hop_threshold: DEFAULT_HOP_THRESHOLD,
        }
    }

    pub fn with_hop_threshold(mut self, hop_threshold: usize) -> Self {
        self.hop_threshold = hop_threshold;
        self
    }

    /// Trace `node`, classify the result and write it to `sink`.
    ///
    /// The outcome is built before any shared write. On success the raw trace
    /// is appended to the sink's log; an `Available` verdict also bumps the
    /// available counter. Every call appends exactly one outcome.
    pub async fn probe(&self, node: &Node, sink: &ResultSink) -> ProbeOutcome {
        let outcome = if node.host.is_empty() {
            let err = CoreError::invalid_node(node.id, "no hostname or address to probe");
            warn!(node_id = node.id, "{}", err);
            ProbeOutcome::errored(node, Some(err.to_string()))
        } else {
            match self.tracer.trace(&node.host).await {
                Ok(stdout) => {
                    let status = classify(&stdout, self.hop_threshold);

                    if let Err(e) = sink.log_raw(&stdout).await {
                        warn!(node_id = node.id, error = %e, "Failed to log raw trace");
                    }
                    ProbeOutcome::new(node, status, Some(stdout))
                }
                Err(MonitorError::CommandFailed { stderr, .. }) => {
                    error!(node_id = node.id, host = %node.host, "{}", stderr);
                    ProbeOutcome::errored(node, (!stderr.is_empty()).then_some(stderr))
                }
                Err(e) => {
                    error!(node_id = node.id, host = %node.host, "Trace failed: {}", e);
                    ProbeOutcome::errored(node, Some(e.to_string()))
                }
            }
        };

        if outcome.is_available() {
            sink.increment_available().await;
        }

        debug!(node_id = node.id, status = %outcome.status, "Probe finished");
        sink.append(outcome.clone()).await;
        outcome
    }
}
