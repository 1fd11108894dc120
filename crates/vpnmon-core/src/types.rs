use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// A relay node to probe, as handed to the coordinator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    pub id: u64,
    /// Hostname or address passed to the probing utility. May be empty when
    /// the upstream record carried no usable address.
    pub host: String,
}

impl Node {
    pub fn new(id: u64, host: impl Into<String>) -> Self {
        Self {
            id,
            host: host.into(),
        }
    }
}

/// Node record as returned by the VPN manager API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: u64,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    /// Legacy `host;port;...` connection string
    #[serde(default)]
    pub server: Option<String>,
}

impl NodeRecord {
    /// First non-empty of hostname, ip_address, or the host part of `server`
    pub fn host(&self) -> Option<&str> {
        fn non_empty(value: Option<&str>) -> Option<&str> {
            value.map(str::trim).filter(|v| !v.is_empty())
        }

        non_empty(self.hostname.as_deref())
            .or_else(|| non_empty(self.ip_address.as_deref()))
            .or_else(|| non_empty(self.server.as_deref().and_then(|s| s.split(';').next())))
    }

    /// Convert to a probe target. Records without an address keep an empty
    /// host and are classified as errored when probed.
    pub fn into_node(self) -> Node {
        let host = self.host().unwrap_or_default().to_string();
        Node::new(self.id, host)
    }
}

/// Reachability classification of a single probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Available,
    Unavailable,
    Errored,
}

impl Verdict {
    /// Status tag used in the report: true, false, or null for errored probes
    pub fn as_status(&self) -> Option<bool> {
        match self {
            Verdict::Available => Some(true),
            Verdict::Unavailable => Some(false),
            Verdict::Errored => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Available => write!(f, "available"),
            Verdict::Unavailable => write!(f, "unavailable"),
            Verdict::Errored => write!(f, "errored"),
        }
    }
}

/// Result of probing one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub node_id: u64,
    pub host: String,
    pub status: Verdict,
    /// Captured stdout on success, stderr (if any) on failure
    pub raw_output: Option<String>,
}

impl ProbeOutcome {
    pub fn new(node: &Node, status: Verdict, raw_output: Option<String>) -> Self {
        Self {
            node_id: node.id,
            host: node.host.clone(),
            status,
            raw_output,
        }
    }

    pub fn errored(node: &Node, reason: Option<String>) -> Self {
        Self::new(node, Verdict::Errored, reason)
    }

    pub fn is_available(&self) -> bool {
        self.status == Verdict::Available
    }
}

/// Serialized form of one report line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub hostname: String,
    pub id: u64,
    pub status: Option<bool>,
}

impl From<&ProbeOutcome> for ReportEntry {
    fn from(outcome: &ProbeOutcome) -> Self {
        Self {
            hostname: outcome.host.clone(),
            id: outcome.node_id,
            status: outcome.status.as_status(),
        }
    }
}

/// Final output of one monitoring run
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Moment the run started probing
    pub timestamp: DateTime<Utc>,
    pub results: Vec<ProbeOutcome>,
}

impl Report {
    /// Seconds since the Unix epoch, with microsecond precision
    pub fn timestamp_secs(&self) -> f64 {
        self.timestamp.timestamp_micros() as f64 / 1_000_000.0
    }

    pub fn entries(&self) -> Vec<ReportEntry> {
        self.results.iter().map(ReportEntry::from).collect()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

// Keys are emitted in lexical order so reports diff cleanly across runs.
impl Serialize for Report {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Report", 2)?;
        state.serialize_field("results", &self.entries())?;
        state.serialize_field("timestamp", &self.timestamp_secs())?;
        state.end()
    }
}

/// Fraction of probed nodes found available
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilitySummary {
    pub available: usize,
    pub total: usize,
}

impl fmt::Display for AvailabilitySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.available, self.total)
    }
}
