use crate::config::MonitorConfig;
use crate::coordinator::{Coordinator, ProbeRun};
use crate::error::Result;
use crate::probes::{ProbeRunner, Traceroute};
use crate::retry::FetchRetrier;
use crate::traits::{NodeSource, RouteTracer};
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Fetches the node list and probes every node, once or on an interval
pub struct Monitor {
    source: Arc<dyn NodeSource>,
    retrier: FetchRetrier,
    coordinator: Coordinator,
    config: MonitorConfig,
}

impl Monitor {
    /// Monitor probing with the system `traceroute`
    pub fn new(source: Arc<dyn NodeSource>, config: MonitorConfig) -> Result<Self> {
        let tracer = Arc::new(Traceroute::new(config.tracer.clone()));
        Self::with_tracer(source, tracer, config)
    }

    pub fn with_tracer(
        source: Arc<dyn NodeSource>,
        tracer: Arc<dyn RouteTracer>,
        config: MonitorConfig,
    ) -> Result<Self> {
        config.validate()?;

        let runner = ProbeRunner::new(tracer).with_hop_threshold(config.hop_threshold);
        let mut coordinator = Coordinator::new(Arc::new(runner))
            .with_max_concurrent_probes(config.max_concurrent_probes);
        if let Some(path) = &config.log_path {
            coordinator = coordinator.with_log_path(path);
        }

        Ok(Self {
            source,
            retrier: FetchRetrier::new(config.fetch_attempts, config.fetch_interval),
            coordinator,
            config,
        })
    }

    /// One full availability check. Fails without probing anything when the
    /// node list cannot be fetched.
    pub async fn run_once(&self) -> Result<ProbeRun> {
        let nodes = self.retrier.fetch_with_retry(self.source.as_ref()).await?;
        info!("{} nodes received", nodes.len());

        let run = self.coordinator.run(&nodes).await?;

        info!("Availability check completed");
        info!("{} nodes available", run.summary);
        if let Some(path) = &run.log_path {
            info!("Full log can be found at {}", path.display());
        }

        Ok(run)
    }

    /// Run checks every `watch_interval` until `token` is cancelled.
    ///
    /// Cancellation also interrupts a check in progress; its probes are
    /// aborted and no report is produced for it.
    ///
    /// A failed run is logged and the loop carries on. An error returned by
    /// `on_run` stops the loop.
    pub async fn watch<F>(&self, token: CancellationToken, mut on_run: F) -> Result<()>
    where
        F: FnMut(&ProbeRun) -> Result<()>,
    {
        info!(
            "Starting monitor loop (interval: {:?})",
            self.config.watch_interval
        );

        let mut interval = tokio::time::interval(self.config.watch_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    info!("Monitor shutting down");
                    return Ok(());
                }
                _ = interval.tick() => {
                    let result = tokio::select! {
                        biased;
                        _ = token.cancelled() => {
                            info!("Monitor shutting down, abandoning the check in progress");
                            return Ok(());
                        }
                        result = self.run_once() => result,
                    };
                    match result {
                        Ok(run) => on_run(&run)?,
                        Err(e) => error!("Availability check failed: {}", e),
                    }
                }
            }
        }
    }
}
