// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Binding of named operations to store nodes.
//!
//! Writes are bound to the primary with no fallback. Reads are routed in two
//! stages: [`Router::pick_replica`] chooses a replica through the configured
//! [`ReplicaSelector`], then the read is guarded with the primary as its
//! fallback. Without replicas, reads go to the primary directly.

use failover_cache_node::{Command, CommandName, Reply, StoreError, StoreNode};
use layered::Service;

use crate::{Error, Guard, RandomReplica, ReplicaSelector, Result, Topology};

/// A single command name bound to one node.
///
/// Executing it sends the command with the given arguments to that node.
#[derive(Debug)]
pub struct NodeCall<'a, N> {
    node: &'a N,
    name: CommandName,
}

impl<'a, N> NodeCall<'a, N> {
    /// Returns the node this call is bound to.
    pub fn node(&self) -> &'a N {
        self.node
    }

    /// Returns the bound command name.
    pub fn name(&self) -> CommandName {
        self.name
    }
}

impl<N: StoreNode> Service<Vec<String>> for NodeCall<'_, N> {
    type Out = std::result::Result<Reply, StoreError>;

    async fn execute(&self, args: Vec<String>) -> Self::Out {
        self.node.execute(Command::new(self.name, args)).await
    }
}

/// A guarded operation produced by a [`Router`].
///
/// For replica reads the primary call is the fallback; otherwise there is
/// no fallback.
pub type GuardedOp<'a, N> = Guard<NodeCall<'a, N>>;

/// Resolves operation names to guarded calls on the right node.
#[derive(Debug)]
pub struct Router<N, S = RandomReplica> {
    topology: Topology<N>,
    selector: S,
}

impl<N, S> Router<N, S>
where
    N: StoreNode,
    S: ReplicaSelector,
{
    /// Creates a router over `topology` that picks replicas with `selector`.
    pub fn new(topology: Topology<N>, selector: S) -> Self {
        Self { topology, selector }
    }

    /// Returns the nodes this router binds to.
    pub fn topology(&self) -> &Topology<N> {
        &self.topology
    }

    /// Resolves a write operation by name.
    ///
    /// # Errors
    ///
    /// Returns a [`Signal::NotSupported`](crate::Signal::NotSupported) error
    /// if the name is not a known command or the primary does not support it.
    pub fn resolve_for_write(&self, name: &str) -> Result<GuardedOp<'_, N>> {
        self.write(parse(name)?)
    }

    /// Resolves a read operation by name.
    ///
    /// # Errors
    ///
    /// Returns a [`Signal::NotSupported`](crate::Signal::NotSupported) error
    /// if the name is not a known read command or a bound node does not
    /// support it.
    pub fn resolve_for_read(&self, name: &str) -> Result<GuardedOp<'_, N>> {
        self.read(parse(name)?)
    }

    /// Binds `name` to the primary, without fallback.
    ///
    /// # Errors
    ///
    /// Returns a [`Signal::NotSupported`](crate::Signal::NotSupported) error
    /// if the primary does not support the command.
    pub fn write(&self, name: CommandName) -> Result<GuardedOp<'_, N>> {
        Ok(Guard::new(name.as_str(), bind(self.topology.primary(), name)?))
    }

    /// Binds `name` to a replica with the primary as fallback, or to the
    /// primary alone when there are no replicas.
    ///
    /// # Errors
    ///
    /// Returns a [`Signal::NotSupported`](crate::Signal::NotSupported) error
    /// for write commands and for commands a bound node does not support.
    pub fn read(&self, name: CommandName) -> Result<GuardedOp<'_, N>> {
        if name.is_write() {
            return Err(Error::not_supported(format!("'{name}' mutates state and cannot be served by a replica")));
        }

        let primary = bind(self.topology.primary(), name)?;
        match self.pick_replica() {
            None => Ok(Guard::new(name.as_str(), primary)),
            Some(replica) => Ok(Guard::new(name.as_str(), bind(replica, name)?).fallback(primary)),
        }
    }

    /// Chooses the replica for the next read, or `None` without replicas.
    pub fn pick_replica(&self) -> Option<&N> {
        let replicas = self.topology.replicas();
        if replicas.is_empty() {
            return None;
        }

        replicas.get(self.selector.select(replicas.len()) % replicas.len())
    }
}

fn parse(name: &str) -> Result<CommandName> {
    name.parse().map_err(Error::not_supported)
}

fn bind<N: StoreNode>(node: &N, name: CommandName) -> Result<NodeCall<'_, N>> {
    if node.supports(name) {
        Ok(NodeCall { node, name })
    } else {
        Err(Error::not_supported(format!("'{name}' is not supported by {}", node.endpoint())))
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use failover_cache_node::StoreErrorKind;
    use failover_cache_node::testing::MockNode;
    use futures::executor::block_on;

    use super::*;
    use crate::{RoundRobin, Signal};

    fn router(replicas: usize) -> (MockNode, Vec<MockNode>, Router<MockNode, RoundRobin>) {
        let primary = MockNode::new("primary:6379");
        let replicas: Vec<_> = (0..replicas).map(|i| primary.mirror(&format!("replica-{i}:6380"))).collect();
        let router = Router::new(Topology::new(primary.clone(), replicas.clone()), RoundRobin::new());
        (primary, replicas, router)
    }

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn writes_bind_to_primary_without_fallback() {
        let (primary, replicas, router) = router(2);

        let op = router.write(CommandName::HSet).unwrap();
        assert_eq!(op.primary().node().endpoint(), primary.endpoint());
        assert!(op.fallback_ref().is_none());

        block_on(op.execute(args(&["h", "f", "v"]))).unwrap();
        assert_eq!(primary.count(CommandName::HSet), 1);
        assert!(replicas.iter().all(|r| r.operations().is_empty()));
    }

    #[test]
    fn reads_without_replicas_use_primary_only() {
        let (primary, _, router) = router(0);

        for _ in 0..10 {
            let op = router.read(CommandName::HGet).unwrap();
            assert!(op.fallback_ref().is_none());
            block_on(op.execute(args(&["h", "f"]))).unwrap();
        }
        assert_eq!(primary.count(CommandName::HGet), 10);
        assert!(router.pick_replica().is_none());
    }

    #[test]
    fn reads_with_replicas_fall_back_to_primary() {
        let (primary, replicas, router) = router(1);

        let op = router.read(CommandName::HGet).unwrap();
        assert_eq!(op.primary().node().endpoint(), replicas[0].endpoint());
        assert_eq!(op.fallback_ref().map(|call| call.node().endpoint()), Some(primary.endpoint()));
    }

    #[test]
    fn selector_index_wraps() {
        let primary = MockNode::new("primary:6379");
        let replica = primary.mirror("replica:6380");
        let router = Router::new(Topology::new(primary, vec![replica]), |_count: usize| 7);

        assert_eq!(router.pick_replica().unwrap().endpoint().to_string(), "replica:6380");
    }

    #[test]
    fn by_name_resolution() {
        let (_, _, router) = router(1);

        assert_eq!(router.resolve_for_read("HGET").unwrap().operation(), "hget");
        assert_eq!(router.resolve_for_write("hset").unwrap().operation(), "hset");
        assert_eq!(router.resolve_for_read("flushall").unwrap_err().signal(), Signal::NotSupported);
        assert_eq!(router.resolve_for_write("flushall").unwrap_err().signal(), Signal::NotSupported);
    }

    #[test]
    fn writes_cannot_be_resolved_for_read() {
        let (_, _, router) = router(1);
        assert_eq!(router.resolve_for_read("hset").unwrap_err().signal(), Signal::NotSupported);
    }

    #[test]
    fn unsupported_commands_fail_before_execution() {
        let (primary, replicas, router) = router(1);
        replicas[0].unsupported(CommandName::HKeys);

        let error = router.read(CommandName::HKeys).unwrap_err();
        assert_eq!(error.signal(), Signal::NotSupported);
        assert!(error.to_string().contains("replica-0:6380"), "got: {error}");
        assert!(primary.operations().is_empty());
    }

    #[test]
    fn replica_failure_is_served_by_primary() {
        let (primary, replicas, router) = router(1);
        primary.set_hash_field("users", "42", "Ann");
        replicas[0].fail_all(StoreErrorKind::ConnectionRefused);

        let reply = block_on(router.read(CommandName::HGet).unwrap().execute(args(&["users", "42"]))).unwrap();
        assert_eq!(reply, Reply::Text("Ann".into()));
        assert_eq!(replicas[0].count(CommandName::HGet), 1);
        assert_eq!(primary.count(CommandName::HGet), 1);
    }
}
