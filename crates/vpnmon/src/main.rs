use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use vpnmon_core::Report;
use vpnmon_runtime::{
    ApiClient, Credentials, Monitor, MonitorConfig, MonitorError, ProtocolMode, TracerouteConfig,
    DEFAULT_LOG_PATH,
};

#[derive(Parser)]
#[command(name = "vpnmon", about = "VPN relay availability monitor")]
struct Cli {
    /// Log level for diagnostics on stderr (RUST_LOG overrides it)
    #[arg(long, value_enum, default_value_t = Verbosity::None, global = true)]
    verbosity: Verbosity,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe every node once and print the report
    Check {
        #[command(flatten)]
        opts: MonitorArgs,
    },
    /// Probe every node on a fixed interval until interrupted
    Watch {
        /// Seconds between availability checks
        #[arg(long, default_value_t = 300)]
        interval: u64,
        #[command(flatten)]
        opts: MonitorArgs,
    },
}

#[derive(Args)]
struct MonitorArgs {
    /// Path to a credentials file, e.g. 'credentials.json'
    #[arg(long)]
    credentials: Option<PathBuf>,
    /// VPN manager API base URL (ignored when --credentials is given)
    #[arg(long, env = "VPNMON_API_URL")]
    api_url: Option<String>,
    /// API token (ignored when --credentials is given)
    #[arg(long, env = "VPNMON_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// Append raw traceroute output here
    #[arg(long, default_value = DEFAULT_LOG_PATH)]
    log_path: PathBuf,
    /// Do not keep a raw traceroute log
    #[arg(long)]
    no_log: bool,
    /// Node list fetch attempts before giving up
    #[arg(long, default_value_t = 3)]
    fetch_attempts: u32,
    /// Seconds to wait between failed fetch attempts
    #[arg(long, default_value_t = 5)]
    fetch_interval: u64,
    /// Limit how many nodes are probed at the same time
    #[arg(long)]
    max_concurrent: Option<usize>,
    /// traceroute binary to run
    #[arg(long, default_value = "traceroute")]
    traceroute: String,
    /// Hop limit passed to traceroute
    #[arg(long, default_value_t = 8)]
    max_hops: u8,
    /// Probe packet type
    #[arg(long, value_enum, default_value_t = Protocol::Tcp)]
    protocol: Protocol,
    /// Print the report on a single line
    #[arg(long)]
    compact: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Verbosity {
    Debug,
    Info,
    Error,
    None,
}

impl Verbosity {
    fn filter(self) -> &'static str {
        match self {
            Verbosity::Debug => "debug",
            Verbosity::Info => "info",
            Verbosity::Error => "error",
            Verbosity::None => "off",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Protocol {
    Icmp,
    Tcp,
    Udp,
}

impl From<Protocol> for ProtocolMode {
    fn from(protocol: Protocol) -> Self {
        match protocol {
            Protocol::Icmp => ProtocolMode::Icmp,
            Protocol::Tcp => ProtocolMode::Tcp,
            Protocol::Udp => ProtocolMode::Udp,
        }
    }
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; stdout is reserved for the report
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.verbosity.filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check { opts } => run_check(&opts).await,
        Commands::Watch { interval, opts } => run_watch(&opts, interval).await,
    }
}

/// Probe all nodes once and print the report
async fn run_check(opts: &MonitorArgs) -> miette::Result<()> {
    let monitor = create_monitor(opts, None)?;
    let run = monitor.run_once().await?;
    print_report(&run.report, opts.compact)?;
    Ok(())
}

/// Repeat checks until Ctrl-C
async fn run_watch(opts: &MonitorArgs, interval: u64) -> miette::Result<()> {
    let monitor = create_monitor(opts, Some(Duration::from_secs(interval)))?;

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupted, finishing up"),
            Err(e) => error!("Failed to listen for ctrl-c: {}", e),
        }
        signal_token.cancel();
    });

    let compact = opts.compact;
    monitor
        .watch(token, |run| print_report(&run.report, compact))
        .await?;

    Ok(())
}

fn print_report(report: &Report, compact: bool) -> Result<(), MonitorError> {
    let json = if compact {
        vpnmon_core::to_json(report)?
    } else {
        vpnmon_core::to_json_pretty(report)?
    };
    println!("{}", json);
    Ok(())
}

/// Build the monitor from command line options
fn create_monitor(opts: &MonitorArgs, watch_interval: Option<Duration>) -> miette::Result<Monitor> {
    let client = match &opts.credentials {
        Some(path) => ApiClient::from_credentials(&Credentials::from_file(path)?),
        None => {
            let url = opts.api_url.as_deref().ok_or_else(|| {
                MonitorError::invalid_config(
                    "no VPN manager API endpoint configured",
                    "Pass --credentials <file>, or --api-url (VPNMON_API_URL) with --token (VPNMON_TOKEN)",
                )
            })?;
            ApiClient::new(url).with_token(opts.token.clone().unwrap_or_default())
        }
    };
    info!("Using VPN manager API at {}", client.base_url());

    let mut config = MonitorConfig {
        log_path: (!opts.no_log).then(|| opts.log_path.clone()),
        fetch_attempts: opts.fetch_attempts,
        fetch_interval: Duration::from_secs(opts.fetch_interval),
        max_concurrent_probes: opts.max_concurrent,
        tracer: TracerouteConfig {
            program: opts.traceroute.clone(),
            max_hops: opts.max_hops,
            protocol: opts.protocol.into(),
        },
        ..Default::default()
    };
    if let Some(interval) = watch_interval {
        config.watch_interval = interval;
    }

    Ok(Monitor::new(Arc::new(client), config)?)
}
