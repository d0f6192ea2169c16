// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cache construction.

use failover_cache_node::StoreNode;

use crate::{Cache, RandomReplica, ReplicaSelector, Router, Topology};
#[cfg(feature = "redis")]
use crate::{CacheConfig, Result, classify};
#[cfg(feature = "redis")]
use failover_cache_redis::{ConnectionOptions, RedisNode};

/// Builder for a [`Cache`].
///
/// Created by [`Cache::builder`]. Replicas are optional; the replica
/// selector defaults to [`RandomReplica`] and stampede protection is off.
///
/// # Examples
///
/// ```
/// use failover_cache::{Cache, RoundRobin};
/// use failover_cache_node::testing::MockNode;
///
/// let primary = MockNode::new("primary:6379");
/// let cache = Cache::builder(primary.clone())
///     .replica(primary.mirror("replica-1:6380"))
///     .replica(primary.mirror("replica-2:6380"))
///     .selector(RoundRobin::new())
///     .stampede_protection(true)
///     .build();
///
/// assert_eq!(cache.topology().replicas().len(), 2);
/// ```
#[derive(Debug)]
pub struct CacheBuilder<N, S = RandomReplica> {
    primary: N,
    replicas: Vec<N>,
    selector: S,
    stampede_protection: bool,
}

impl<N: StoreNode> CacheBuilder<N> {
    pub(crate) fn new(primary: N) -> Self {
        Self {
            primary,
            replicas: Vec::new(),
            selector: RandomReplica,
            stampede_protection: false,
        }
    }
}

impl<N, S> CacheBuilder<N, S>
where
    N: StoreNode,
    S: ReplicaSelector,
{
    /// Adds a replica.
    #[must_use]
    pub fn replica(mut self, node: N) -> Self {
        self.replicas.push(node);
        self
    }

    /// Adds several replicas.
    #[must_use]
    pub fn replicas(mut self, nodes: impl IntoIterator<Item = N>) -> Self {
        self.replicas.extend(nodes);
        self
    }

    /// Sets the policy that picks the replica for each read.
    #[must_use]
    pub fn selector<T: ReplicaSelector>(self, selector: T) -> CacheBuilder<N, T> {
        CacheBuilder {
            primary: self.primary,
            replicas: self.replicas,
            selector,
            stampede_protection: self.stampede_protection,
        }
    }

    /// Makes concurrent misses on the same entry share one load and one write.
    ///
    /// Only misses validated with the same schema type are coalesced, so a
    /// caller never receives a payload checked against another caller's schema.
    #[must_use]
    pub fn stampede_protection(mut self, enabled: bool) -> Self {
        self.stampede_protection = enabled;
        self
    }

    /// Builds the cache.
    #[must_use]
    pub fn build(self) -> Cache<N, S> {
        if self.replicas.is_empty() {
            tracing::warn!(
                primary = %self.primary.endpoint(),
                "no replicas configured, the primary serves reads and writes"
            );
        } else {
            tracing::info!(
                primary = %self.primary.endpoint(),
                replicas = self.replicas.len(),
                "cache configured with read replicas"
            );
        }

        let router = Router::new(Topology::new(self.primary, self.replicas), self.selector);
        Cache::from_parts(router, self.stampede_protection)
    }
}

#[cfg(feature = "redis")]
#[cfg_attr(docsrs, doc(cfg(feature = "redis")))]
impl Cache<RedisNode> {
    /// Creates a cache with one [`RedisNode`] per configured endpoint.
    ///
    /// No connection is opened until the first operation.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint does not form a valid connection URL.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use failover_cache::{Cache, CacheConfig};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let cache = Cache::from_config(&CacheConfig::from_env()?)?;
    /// let value = cache.get("users", "42").await?;
    /// cache.close().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        let options = ConnectionOptions::with_timeout(config.timeout());

        let primary = RedisNode::new(config.primary().clone(), options).map_err(classify)?;
        let replicas = config
            .replicas()
            .iter()
            .map(|endpoint| RedisNode::new(endpoint.clone(), options))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(classify)?;

        Ok(Self::builder(primary).replicas(replicas).build())
    }
}
