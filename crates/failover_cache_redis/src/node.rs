// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use failover_cache_node::{Command, Endpoint, Reply, StoreError, StoreNode};
use redis::aio::ConnectionManager;
use tokio::sync::Mutex;

use crate::ConnectionOptions;
use crate::decode::{reply, store_error};

enum State {
    Idle,
    Connected(ConnectionManager),
    Closed,
}

/// A store node backed by one Redis endpoint.
///
/// Creating a node does not touch the network. The first command opens a
/// multiplexed connection that later commands share; the connection lock is
/// only held while connecting, never for the duration of a command.
///
/// After [`close`](StoreNode::close) every command fails with
/// [`StoreErrorKind::Closed`](failover_cache_node::StoreErrorKind::Closed).
pub struct RedisNode {
    endpoint: Endpoint,
    client: redis::Client,
    options: ConnectionOptions,
    state: Mutex<State>,
}

impl std::fmt::Debug for RedisNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisNode")
            .field("endpoint", &self.endpoint)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl RedisNode {
    /// Creates a node for `endpoint` without connecting.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint does not form a valid connection URL.
    pub fn new(endpoint: Endpoint, options: ConnectionOptions) -> Result<Self, StoreError> {
        let client = redis::Client::open(format!("redis://{endpoint}/")).map_err(store_error)?;

        Ok(Self {
            endpoint,
            client,
            options,
            state: Mutex::new(State::Idle),
        })
    }

    /// Returns the connection options of this node.
    #[must_use]
    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        let mut state = self.state.lock().await;

        match &*state {
            State::Connected(connection) => Ok(connection.clone()),
            State::Closed => Err(StoreError::closed(format!("node {} is closed", self.endpoint))),
            State::Idle => {
                let connection = ConnectionManager::new_with_config(self.client.clone(), self.options.manager_config())
                    .await
                    .map_err(store_error)?;

                tracing::debug!(endpoint = %self.endpoint, "store node connected");
                *state = State::Connected(connection.clone());
                Ok(connection)
            }
        }
    }
}

impl StoreNode for RedisNode {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn execute(&self, command: Command) -> Result<Reply, StoreError> {
        let mut connection = self.connection().await?;

        let mut cmd = redis::cmd(command.name().as_str());
        for arg in command.args() {
            cmd.arg(arg.as_str());
        }

        let value: redis::Value = cmd.query_async(&mut connection).await.map_err(store_error)?;
        reply(value)
    }

    async fn close(&self) -> Result<(), StoreError> {
        let previous = std::mem::replace(&mut *self.state.lock().await, State::Closed);

        if matches!(previous, State::Connected(_)) {
            tracing::debug!(endpoint = %self.endpoint, "store node connection released");
        }

        Ok(())
    }
}
