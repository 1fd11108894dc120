use crate::command;
use crate::error::Result;
use crate::probes::types::TracerouteConfig;
use crate::traits::RouteTracer;
use async_trait::async_trait;

/// Route tracer backed by the system `traceroute` utility
pub struct Traceroute {
    config: TracerouteConfig,
}

impl Traceroute {
    pub fn new(config: TracerouteConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl RouteTracer for Traceroute {
    async fn trace(&self, host: &str) -> Result<String> {
        let args = self.config.args(host);
        let output = command::exec(&self.config.program, args.as_slice()).await?;
        Ok(output.stdout)
    }
}
