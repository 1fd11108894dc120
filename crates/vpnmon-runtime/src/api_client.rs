use crate::config::Credentials;
use crate::error::{MonitorError, Result};
use crate::traits::NodeSource;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use vpnmon_core::{Node, NodeRecord};

/// Lightweight HTTP client for the VPN manager backend
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

/// `GET /nodes` response body: `{"data": {"node": [...]}}`
#[derive(Debug, Deserialize)]
struct NodesEnvelope {
    data: NodesData,
}

#[derive(Debug, Deserialize)]
struct NodesData {
    #[serde(default)]
    node: Vec<NodeRecord>,
}

/// Upper bound on one node-list request, connect to last body byte
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            client: build_client(DEFAULT_REQUEST_TIMEOUT),
        }
    }

    /// Give up on a request after `timeout`; the failure counts as transient
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.is_empty()).then_some(token);
        self
    }

    pub fn from_credentials(credentials: &Credentials) -> Self {
        Self::new(&credentials.url).with_token(credentials.token.clone())
    }

    /// GET /nodes
    pub async fn list_nodes(&self) -> Result<Vec<NodeRecord>> {
        let url = format!("{}/nodes", self.base_url);
        debug!("GET {}", url);

        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await.map_err(|e| {
            if e.is_builder() {
                MonitorError::invalid_config(
                    format!("Cannot build request for '{}': {}", url, e),
                    "Check the API URL in the credentials file or --api-url",
                )
            } else {
                MonitorError::transport(&url, e.to_string())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MonitorError::api_request_failed(
                &url,
                status.as_u16(),
                body,
            ));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| MonitorError::transport(&url, format!("Failed to read body: {}", e)))?;

        let envelope: NodesEnvelope = vpnmon_core::from_json(&body)?;
        Ok(envelope.data.node)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!("Falling back to a default HTTP client: {}", e);
            Client::new()
        })
}

#[async_trait]
impl NodeSource for ApiClient {
    async fn fetch(&self) -> Result<Vec<Node>> {
        let nodes: Vec<Node> = self
            .list_nodes()
            .await?
            .into_iter()
            .map(NodeRecord::into_node)
            .collect();
        Ok(nodes)
    }
}
