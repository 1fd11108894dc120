// Allow unused assignments for diagnostic fields - they're used by the thiserror/miette macros
#![allow(unused_assignments)]

pub mod api_client;
pub mod command;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod mock;
pub mod monitor;
pub mod probes;
pub mod reporter;
pub mod retry;
pub mod sink;
pub mod traits;

// Re-export primary types
pub use error::{MonitorError, Result};
pub use mock::{MockNodeSource, MockTracer};
pub use probes::{ProbeRunner, ProtocolMode, Traceroute, TracerouteConfig};
pub use traits::{NodeSource, RouteTracer};

// Re-export the run pipeline
pub use api_client::ApiClient;
pub use config::{Credentials, MonitorConfig, DEFAULT_LOG_PATH};
pub use coordinator::{Coordinator, ProbeRun};
pub use monitor::Monitor;
pub use reporter::Reporter;
pub use retry::FetchRetrier;
pub use sink::ResultSink;
