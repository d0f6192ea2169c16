// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Policies that choose which replica serves a read.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Chooses a replica for one read.
///
/// `select` is called once per read with the number of replicas, which is
/// never zero. Indices outside `0..replica_count` are wrapped around.
///
/// Closures implement this trait, which is handy for pinning reads in tests:
///
/// ```
/// use failover_cache::ReplicaSelector;
///
/// let first = |_count: usize| 0;
/// assert_eq!(first.select(3), 0);
/// ```
pub trait ReplicaSelector: Send + Sync {
    /// Returns the index of the replica to read from.
    fn select(&self, replica_count: usize) -> usize;
}

impl<F> ReplicaSelector for F
where
    F: Fn(usize) -> usize + Send + Sync,
{
    fn select(&self, replica_count: usize) -> usize {
        self(replica_count)
    }
}

/// Picks a replica uniformly at random for every read.
///
/// This is the default policy: stateless, with no session affinity.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomReplica;

impl ReplicaSelector for RandomReplica {
    fn select(&self, replica_count: usize) -> usize {
        fastrand::usize(..replica_count.max(1))
    }
}

/// Cycles through the replicas in order.
#[derive(Debug, Default)]
pub struct RoundRobin {
    next: AtomicUsize,
}

impl RoundRobin {
    /// Creates a selector that starts at the first replica.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReplicaSelector for RoundRobin {
    fn select(&self, replica_count: usize) -> usize {
        self.next.fetch_add(1, Ordering::Relaxed) % replica_count.max(1)
    }
}
