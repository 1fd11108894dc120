pub mod runner;
pub mod tracer;
pub mod types;

pub use runner::ProbeRunner;
pub use tracer::Traceroute;
pub use types::{
    classify, hop_lines, ProtocolMode, TracerouteConfig, DEFAULT_HOP_THRESHOLD, DEFAULT_MAX_HOPS,
};
