//! `BackboneServer` builder and accept loop.
//!
//! This is the entry point for running a Gamespine backbone. It ties the
//! layers together: transport → session → broker.

use std::sync::Arc;

use gamespine_broker::Broker;
use gamespine_session::LoginValidator;
use gamespine_transport::{TcpTransport, Transport};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::GamespineError;

/// Shared server state passed to each connection handler task.
///
/// The broker behind one async mutex is the whole coordination story:
/// every frame is processed start to finish under the lock, so handlers
/// never observe half-applied registry updates.
pub(crate) struct ServerState {
    pub(crate) broker: Mutex<Broker>,
}

/// Builder for configuring and starting a backbone server.
///
/// # Example
///
/// ```rust,ignore
/// use gamespine::prelude::*;
///
/// let server = BackboneServer::builder()
///     .bind("0.0.0.0:45000")
///     .build(MirrorValidator)
///     .await?;
/// server.run().await
/// ```
pub struct BackboneServerBuilder {
    bind_addr: String,
}

impl BackboneServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:45000".to_string(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Binds the listener and builds the server with the given login
    /// policy.
    pub async fn build(
        self,
        validator: impl LoginValidator + 'static,
    ) -> Result<BackboneServer, GamespineError> {
        let transport = TcpTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            broker: Mutex::new(Broker::new(validator)),
        });

        Ok(BackboneServer { transport, state })
    }
}

impl Default for BackboneServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running backbone server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct BackboneServer {
    transport: TcpTransport,
    state: Arc<ServerState>,
}

impl BackboneServer {
    /// Creates a new builder.
    pub fn builder() -> BackboneServerBuilder {
        BackboneServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), GamespineError> {
        tracing::info!("backbone server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await
                        {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
