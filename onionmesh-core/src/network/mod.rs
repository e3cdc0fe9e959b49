/*
    Network - run directory, relays and users in one process

    Launch order:
    1. Directory on `registry_port`
    2. Relays: generate a key pair, start listening on `base_relay_port + id`, then
       register with the directory. A failed registration is logged and the relay
       keeps running; it simply never appears in a circuit.
    3. Users on `base_user_port + id`

    Every server subscribes to the same ShutdownCoordinator. `shutdown` broadcasts once
    and waits up to `network.shutdown_timeout` per server.
*/

use crate::config::Config;
use crate::core_crypto::RelayKeyPair;
use crate::core_directory::{Directory, NodeId, UserId};
use crate::core_http::{
    build_directory_router, build_relay_router, build_user_router, NodeServer, RunningServer,
};
use crate::core_onion::{RelayNode, UserNode};
use crate::core_router::{AddressSpace, HttpTransport, Transport};
use crate::shutdown::ShutdownCoordinator;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// A set of running nodes sharing one transport and one shutdown signal
pub struct Network {
    config: Config,
    addresses: AddressSpace,
    transport: Arc<dyn Transport>,
    shutdown: Arc<ShutdownCoordinator>,
    directory: Option<Arc<Directory>>,
    relays: BTreeMap<NodeId, Arc<RelayNode>>,
    users: BTreeMap<UserId, Arc<UserNode>>,
    servers: Vec<RunningServer>,
}

impl Network {
    /// An empty network; nothing is listening yet
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::from_config(&config)?);

        Ok(Self {
            addresses: config.network.address_space(),
            shutdown: Arc::new(ShutdownCoordinator::new(config.network.shutdown_timeout)),
            config,
            transport,
            directory: None,
            relays: BTreeMap::new(),
            users: BTreeMap::new(),
            servers: Vec::new(),
        })
    }

    /// Start a directory, then `relay_ids`, then `user_ids`
    pub async fn launch(config: Config, relay_ids: &[NodeId], user_ids: &[UserId]) -> Result<Self> {
        let mut network = Self::new(config)?;

        network.launch_directory().await?;
        for &id in relay_ids {
            network.launch_relay(id).await?;
        }
        for &id in user_ids {
            network.launch_user(id).await?;
        }

        info!(
            relays = relay_ids.len(),
            users = user_ids.len(),
            "Network launched"
        );
        Ok(network)
    }

    pub async fn launch_directory(&mut self) -> Result<Arc<Directory>> {
        let directory = Arc::new(Directory::new());
        let router = build_directory_router(directory.clone());
        let addr = self.config.network.socket_address(self.addresses.registry_port);

        self.start_server("directory".to_string(), addr, router).await?;
        self.directory = Some(directory.clone());
        Ok(directory)
    }

    pub async fn launch_relay(&mut self, node_id: NodeId) -> Result<Arc<RelayNode>> {
        let port = self.addresses.relay_port(node_id)?;

        // RSA generation is CPU bound
        let keys = tokio::task::spawn_blocking(RelayKeyPair::generate)
            .await
            .context("key generation task failed")??;
        let relay = Arc::new(RelayNode::new(
            node_id,
            keys,
            self.addresses,
            self.transport.clone(),
        )?);

        let router = build_relay_router(relay.clone(), self.config.relay.expose_private_key);
        let addr = self.config.network.socket_address(port);
        self.start_server(format!("relay-{}", node_id), addr, router).await?;

        if let Err(err) = relay.register().await {
            warn!(node_id, error = %err, "Relay registration failed, continuing without it");
        }

        self.relays.insert(node_id, relay.clone());
        Ok(relay)
    }

    pub async fn launch_user(&mut self, user_id: UserId) -> Result<Arc<UserNode>> {
        let port = self.addresses.user_port(user_id)?;
        let user = Arc::new(UserNode::new(
            user_id,
            self.addresses,
            self.transport.clone(),
        )?);

        let router = build_user_router(user.clone());
        let addr = self.config.network.socket_address(port);
        self.start_server(format!("user-{}", user_id), addr, router).await?;

        self.users.insert(user_id, user.clone());
        Ok(user)
    }

    async fn start_server(&mut self, name: String, addr: String, router: axum::Router) -> Result<()> {
        let server = NodeServer::new(name, addr, router)
            .start(&self.shutdown)
            .await?;
        self.servers.push(server);
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn addresses(&self) -> AddressSpace {
        self.addresses
    }

    pub fn directory(&self) -> Option<&Arc<Directory>> {
        self.directory.as_ref()
    }

    pub fn relay(&self, node_id: NodeId) -> Option<&Arc<RelayNode>> {
        self.relays.get(&node_id)
    }

    pub fn user(&self, user_id: UserId) -> Option<&Arc<UserNode>> {
        self.users.get(&user_id)
    }

    pub fn relay_ids(&self) -> Vec<NodeId> {
        self.relays.keys().copied().collect()
    }

    pub fn user_ids(&self) -> Vec<UserId> {
        self.users.keys().copied().collect()
    }

    pub fn shutdown_coordinator(&self) -> Arc<ShutdownCoordinator> {
        self.shutdown.clone()
    }

    /// Stop every server and wait for them to drain
    pub async fn shutdown(self) -> Result<()> {
        // A signal handler may already have broadcast
        if !self.shutdown.is_shutting_down().await {
            self.shutdown.shutdown().await;
        }

        let timeout = self.shutdown.timeout();
        let mut first_error = None;
        for server in self.servers {
            if let Err(err) = server.join(timeout).await {
                warn!(error = %err, "Server stopped with an error");
                first_error.get_or_insert(err);
            }
        }

        self.shutdown.complete().await;
        first_error.map_or(Ok(()), Err)
    }
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("addresses", &self.addresses)
            .field("relays", &self.relay_ids())
            .field("users", &self.user_ids())
            .finish_non_exhaustive()
    }
}
