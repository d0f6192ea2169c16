// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// The store nodes a cache talks to: one primary and any number of replicas.
///
/// Fixed at construction; the cache owns every node for its lifetime.
///
/// # Examples
///
/// ```
/// use failover_cache::Topology;
/// use failover_cache_node::testing::MockNode;
///
/// let primary = MockNode::new("primary:6379");
/// let replica = primary.mirror("replica:6380");
/// let topology = Topology::new(primary, vec![replica]);
///
/// assert_eq!(topology.replicas().len(), 1);
/// assert_eq!(topology.nodes().count(), 2);
/// ```
#[derive(Debug)]
pub struct Topology<N> {
    primary: N,
    replicas: Vec<N>,
}

impl<N> Topology<N> {
    /// Creates a topology from a primary and its replicas.
    pub fn new(primary: N, replicas: Vec<N>) -> Self {
        Self { primary, replicas }
    }

    /// Returns the node that accepts writes.
    pub fn primary(&self) -> &N {
        &self.primary
    }

    /// Returns the read-only nodes.
    pub fn replicas(&self) -> &[N] {
        &self.replicas
    }

    /// Returns `true` if reads are served by the primary alone.
    pub fn is_primary_only(&self) -> bool {
        self.replicas.is_empty()
    }

    /// Iterates over the primary followed by every replica.
    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        std::iter::once(&self.primary).chain(&self.replicas)
    }
}
