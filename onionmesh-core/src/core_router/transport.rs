/*
    Transport - request/response calls between participants

    Relays and senders never talk HTTP directly; they go through the `Transport` trait:
      - fetch_nodes: full directory listing (sender, once per send)
      - register_node: publish {nodeId, pubKey} (relay, once at startup)
      - forward: POST {message} to the `/message` endpoint of a relay or user

    Every call is a single attempt. A non-success status is a failure; there is no retry
    and no timeout other than the one configured on the underlying client.
*/

use super::addressing::{AddressError, AddressSpace, Endpoint};
use crate::config::Config;
use crate::core_directory::NodeRecord;
use crate::core_http::types::{MessageRequest, NodeRegistryResponse, RegisterNodeRequest};
use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

/// Errors raised by a transport call
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request could not be sent or the response could not be read
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The peer answered with a non-success status
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    /// The target endpoint has no valid port
    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    /// Used by in-process transports when a hop is not reachable
    #[error("Unreachable: {0}")]
    Unreachable(String),
}

/// Outbound calls a node can make
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the directory listing
    async fn fetch_nodes(&self) -> Result<Vec<NodeRecord>, TransportError>;

    /// Register a relay with the directory
    async fn register_node(&self, record: &NodeRecord) -> Result<(), TransportError>;

    /// Deliver `message` to the `/message` endpoint of `endpoint`
    async fn forward(&self, endpoint: Endpoint, message: &str) -> Result<(), TransportError>;
}

/// Transport over plain HTTP with JSON bodies
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    host: String,
    addresses: AddressSpace,
}

impl HttpTransport {
    pub fn new(client: Client, host: impl Into<String>, addresses: AddressSpace) -> Self {
        Self {
            client,
            host: host.into(),
            addresses,
        }
    }

    /// Build a transport from the network and transport sections of `config`
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        // Every peer is a node of this overlay, never reached through a proxy
        let mut builder = Client::builder().no_proxy();
        if let Some(timeout) = config.transport.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self::new(
            builder.build()?,
            config.network.host.clone(),
            config.network.address_space(),
        ))
    }

    fn url(&self, port: u16, path: &str) -> String {
        format!("http://{}:{}{}", self.host, port, path)
    }

    async fn post_json<B: serde::Serialize + Sync>(
        &self,
        url: String,
        body: &B,
    ) -> Result<reqwest::Response, TransportError> {
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| TransportError::Request { url: url.clone(), source })?;

        if !response.status().is_success() {
            return Err(TransportError::Status {
                url,
                status: response.status().as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch_nodes(&self) -> Result<Vec<NodeRecord>, TransportError> {
        let url = self.url(self.addresses.registry_port, "/getNodeRegistry");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| TransportError::Request { url: url.clone(), source })?;

        if !response.status().is_success() {
            return Err(TransportError::Status {
                url,
                status: response.status().as_u16(),
            });
        }

        let registry: NodeRegistryResponse = response
            .json()
            .await
            .map_err(|source| TransportError::Request { url, source })?;
        Ok(registry.nodes)
    }

    async fn register_node(&self, record: &NodeRecord) -> Result<(), TransportError> {
        let url = self.url(self.addresses.registry_port, "/registerNode");
        self.post_json(url, &RegisterNodeRequest::from(record)).await?;
        Ok(())
    }

    async fn forward(&self, endpoint: Endpoint, message: &str) -> Result<(), TransportError> {
        let port = self.addresses.port_of(endpoint)?;
        let url = self.url(port, "/message");
        debug!(%endpoint, %url, bytes = message.len(), "Forwarding message");

        self.post_json(url, &MessageRequest::new(message)).await?;
        Ok(())
    }
}
