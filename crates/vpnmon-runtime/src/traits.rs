use crate::error::Result;
use async_trait::async_trait;
use vpnmon_core::Node;

/// Supplier of the relay node list
///
/// Implemented by `ApiClient` for the VPN manager backend and by
/// `MockNodeSource` for tests. Connection-level failures must be reported as
/// `MonitorError::Transport` so the fetch retrier can tell them apart from
/// permanent failures.
#[async_trait]
pub trait NodeSource: Send + Sync {
    /// Fetch the current node set
    async fn fetch(&self) -> Result<Vec<Node>>;
}

/// Runs a route trace towards a single host
///
/// `Traceroute` shells out to the system utility; `MockTracer` returns canned
/// output. An unsuccessful trace is an error (usually `CommandFailed` carrying
/// the utility's stderr).
#[async_trait]
pub trait RouteTracer: Send + Sync {
    /// Trace the route to `host` and return the captured stdout
    async fn trace(&self, host: &str) -> Result<String>;
}
