use vpnmon_core::Verdict;

/// Hop limit passed to the probing utility
pub const DEFAULT_MAX_HOPS: u8 = 8;

/// A trace must show more hop lines than this to count as available
pub const DEFAULT_HOP_THRESHOLD: usize = 4;

/// Packet type the route trace uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProtocolMode {
    Icmp,
    #[default]
    Tcp,
    Udp,
}

impl ProtocolMode {
    /// `traceroute` flag selecting this mode
    pub fn flag(&self) -> &'static str {
        match self {
            ProtocolMode::Icmp => "-I",
            ProtocolMode::Tcp => "-T",
            ProtocolMode::Udp => "-U",
        }
    }
}

impl std::fmt::Display for ProtocolMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolMode::Icmp => write!(f, "icmp"),
            ProtocolMode::Tcp => write!(f, "tcp"),
            ProtocolMode::Udp => write!(f, "udp"),
        }
    }
}

/// How the external `traceroute` utility is invoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracerouteConfig {
    pub program: String,
    pub max_hops: u8,
    pub protocol: ProtocolMode,
}

impl Default for TracerouteConfig {
    fn default() -> Self {
        Self {
            program: "traceroute".to_string(),
            max_hops: DEFAULT_MAX_HOPS,
            protocol: ProtocolMode::default(),
        }
    }
}

impl TracerouteConfig {
    /// Arguments for tracing `host`, e.g. `-T -m 8 relay.example.net`
    pub fn args(&self, host: &str) -> Vec<String> {
        vec![
            self.protocol.flag().to_string(),
            "-m".to_string(),
            self.max_hops.to_string(),
            host.to_string(),
        ]
    }
}

/// Numbered hop lines of a trace; headers and blank lines are skipped
pub fn hop_lines(output: &str) -> impl Iterator<Item = &str> {
    output
        .split('\n')
        .map(str::trim)
        .filter(|line| line.chars().next().is_some_and(|c| c.is_ascii_digit()))
}

/// Classify a successful trace by how many hops answered within the budget
pub fn classify(output: &str, hop_threshold: usize) -> Verdict {
    if hop_lines(output).count() > hop_threshold {
        Verdict::Available
    } else {
        Verdict::Unavailable
    }
}
