// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock store node for testing.
//!
//! This module provides `MockNode`, an in-memory node that interprets the
//! command catalog, records every command it receives and supports failure
//! injection for testing error and failover paths.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::{Command, CommandName, Endpoint, Reply, StoreError, StoreErrorKind, StoreNode};

#[derive(Debug, Clone)]
enum Stored {
    Text(String),
    Hash(BTreeMap<String, String>),
}

type Data = Arc<Mutex<HashMap<String, Stored>>>;
type FailPredicate = Box<dyn Fn(&Command) -> bool + Send + Sync>;

/// A configurable in-memory store node for testing.
///
/// Clones share all state. [`MockNode::mirror`] creates a node that shares
/// only the stored data, which models a replica that is always in sync with
/// its primary while keeping its own command log and failure injection.
///
/// # Examples
///
/// ```
/// use failover_cache_node::testing::MockNode;
/// use failover_cache_node::{Command, Reply, StoreNode};
///
/// # futures::executor::block_on(async {
/// let node = MockNode::new("primary:6379");
/// node.execute(Command::hset("users", "42", "Ann")).await.unwrap();
///
/// let reply = node.execute(Command::hget("users", "42")).await.unwrap();
/// assert_eq!(reply, Reply::Text("Ann".to_string()));
/// assert_eq!(node.operations().len(), 2);
/// # });
/// ```
///
/// # Failure Injection
///
/// ```
/// use failover_cache_node::testing::MockNode;
/// use failover_cache_node::{Command, CommandName, StoreErrorKind, StoreNode};
///
/// # futures::executor::block_on(async {
/// let node = MockNode::new("replica:6380");
/// node.fail_when(StoreErrorKind::ConnectionRefused, |cmd| cmd.name() == CommandName::HGet);
///
/// let error = node.execute(Command::hget("users", "42")).await.unwrap_err();
/// assert_eq!(error.kind(), StoreErrorKind::ConnectionRefused);
/// # });
/// ```
pub struct MockNode {
    endpoint: Endpoint,
    data: Data,
    operations: Arc<Mutex<Vec<Command>>>,
    fail_when: Arc<Mutex<Option<(StoreErrorKind, FailPredicate)>>>,
    unsupported: Arc<Mutex<HashSet<CommandName>>>,
    closed: Arc<Mutex<bool>>,
    close_calls: Arc<AtomicUsize>,
}

impl std::fmt::Debug for MockNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockNode")
            .field("endpoint", &self.endpoint)
            .field("operations", &self.operations.lock().len())
            .field("fail_when", &self.fail_when.lock().is_some())
            .field("closed", &*self.closed.lock())
            .finish_non_exhaustive()
    }
}

impl Clone for MockNode {
    fn clone(&self) -> Self {
        Self {
            endpoint: self.endpoint.clone(),
            data: Arc::clone(&self.data),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
            unsupported: Arc::clone(&self.unsupported),
            closed: Arc::clone(&self.closed),
            close_calls: Arc::clone(&self.close_calls),
        }
    }
}

impl MockNode {
    /// Creates an empty node.
    ///
    /// `endpoint` is a `host:port` label; an unparsable label falls back to
    /// port 0 with the whole string as the host.
    #[must_use]
    pub fn new(endpoint: &str) -> Self {
        let endpoint = endpoint.parse().unwrap_or_else(|_| Endpoint::new(endpoint, 0));
        Self::with_data(endpoint, Data::default())
    }

    fn with_data(endpoint: Endpoint, data: Data) -> Self {
        Self {
            endpoint,
            data,
            operations: Arc::default(),
            fail_when: Arc::default(),
            unsupported: Arc::default(),
            closed: Arc::default(),
            close_calls: Arc::default(),
        }
    }

    /// Creates a node that shares this node's data but nothing else.
    #[must_use]
    pub fn mirror(&self, endpoint: &str) -> Self {
        let mut mirror = Self::new(endpoint);
        mirror.data = Arc::clone(&self.data);
        mirror
    }

    /// Sets a predicate that makes matching commands fail with `kind`.
    pub fn fail_when<F>(&self, kind: StoreErrorKind, predicate: F)
    where
        F: Fn(&Command) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some((kind, Box::new(predicate)));
    }

    /// Makes every command fail with `kind`.
    pub fn fail_all(&self, kind: StoreErrorKind) {
        self.fail_when(kind, |_| true);
    }

    /// Clears the failure predicate.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Marks a command as unsupported by this node.
    pub fn unsupported(&self, name: CommandName) {
        self.unsupported.lock().insert(name);
    }

    /// Returns a clone of every command executed, including failed ones.
    #[must_use]
    pub fn operations(&self) -> Vec<Command> {
        self.operations.lock().clone()
    }

    /// Returns how many executed commands had the given name.
    #[must_use]
    pub fn count(&self, name: CommandName) -> usize {
        self.operations.lock().iter().filter(|c| c.name() == name).count()
    }

    /// Clears the command log.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    /// Returns the value of a hash field without recording a command.
    #[must_use]
    pub fn hash_field(&self, hash: &str, field: &str) -> Option<String> {
        match self.data.lock().get(hash) {
            Some(Stored::Hash(fields)) => fields.get(field).cloned(),
            _ => None,
        }
    }

    /// Sets a hash field without recording a command.
    pub fn set_hash_field(&self, hash: &str, field: &str, value: &str) {
        let mut data = self.data.lock();
        let entry = data.entry(hash.to_owned()).or_insert_with(|| Stored::Hash(BTreeMap::new()));
        if matches!(*entry, Stored::Text(_)) {
            *entry = Stored::Hash(BTreeMap::new());
        }
        if let Stored::Hash(fields) = entry {
            fields.insert(field.to_owned(), value.to_owned());
        }
    }

    /// Returns `true` once `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.closed.lock()
    }

    /// Returns how many times `close` has been called.
    #[must_use]
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::Acquire)
    }

    fn injected_failure(&self, command: &Command) -> Option<StoreError> {
        let guard = self.fail_when.lock();
        let (kind, predicate) = guard.as_ref()?;
        predicate(command).then(|| {
            let cause = format!("mock: {} failed on {}", command.name(), self.endpoint);
            StoreError::caused_by(*kind, cause)
        })
    }

    fn apply(&self, command: &Command) -> Result<Reply, StoreError> {
        let name = command.name();
        if !name.arity().accepts(command.args().len()) {
            return Err(StoreError::other(format!("wrong number of arguments for '{name}'")));
        }

        let args = command.args();
        let mut data = self.data.lock();

        match name {
            CommandName::Ping => Ok(args.first().map_or_else(|| Reply::Text("PONG".to_owned()), |m| Reply::Text(m.clone()))),
            CommandName::Get => match data.get(&args[0]) {
                None => Ok(Reply::Nil),
                Some(Stored::Text(value)) => Ok(Reply::Text(value.clone())),
                Some(Stored::Hash(_)) => Err(wrong_type()),
            },
            CommandName::Set => {
                data.insert(args[0].clone(), Stored::Text(args[1].clone()));
                Ok(Reply::Ok)
            }
            CommandName::Del => Ok(Reply::Int(count(args.iter().filter(|k| data.remove(*k).is_some())))),
            CommandName::Exists => Ok(Reply::Int(count(args.iter().filter(|k| data.contains_key(*k))))),
            CommandName::Expire => Ok(Reply::Int(i64::from(data.contains_key(&args[0])))),
            CommandName::Ttl => Ok(Reply::Int(if data.contains_key(&args[0]) { -1 } else { -2 })),
            CommandName::HSet => {
                let pairs = &args[1..];
                if pairs.len() % 2 != 0 {
                    return Err(StoreError::other("wrong number of arguments for 'hset'"));
                }
                let fields = hash_mut(&mut data, &args[0])?;
                let added = pairs
                    .chunks_exact(2)
                    .filter(|pair| fields.insert(pair[0].clone(), pair[1].clone()).is_none())
                    .count();
                Ok(Reply::Int(count_of(added)))
            }
            CommandName::HDel => {
                let Some(fields) = hash_ref_mut(&mut data, &args[0])? else {
                    return Ok(Reply::Int(0));
                };
                Ok(Reply::Int(count(args[1..].iter().filter(|f| fields.remove(*f).is_some()))))
            }
            CommandName::HGet => Ok(hash_ref(&data, &args[0])?.and_then(|fields| fields.get(&args[1]).cloned()).into()),
            CommandName::HExists => {
                let exists = hash_ref(&data, &args[0])?.is_some_and(|fields| fields.contains_key(&args[1]));
                Ok(Reply::Int(i64::from(exists)))
            }
            CommandName::HGetAll => Ok(Reply::List(
                hash_ref(&data, &args[0])?
                    .into_iter()
                    .flat_map(|fields| fields.iter())
                    .flat_map(|(field, value)| [Reply::Text(field.clone()), Reply::Text(value.clone())])
                    .collect(),
            )),
            CommandName::HKeys => Ok(Reply::List(
                hash_ref(&data, &args[0])?
                    .into_iter()
                    .flat_map(|fields| fields.keys())
                    .map(|field| Reply::Text(field.clone()))
                    .collect(),
            )),
            CommandName::HLen => Ok(Reply::Int(count_of(hash_ref(&data, &args[0])?.map_or(0, BTreeMap::len)))),
        }
    }
}

fn wrong_type() -> StoreError {
    StoreError::other("WRONGTYPE Operation against a key holding the wrong kind of value")
}

fn count<I: Iterator>(iter: I) -> i64 {
    count_of(iter.count())
}

fn count_of(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn hash_ref<'a>(data: &'a HashMap<String, Stored>, hash: &str) -> Result<Option<&'a BTreeMap<String, String>>, StoreError> {
    match data.get(hash) {
        None => Ok(None),
        Some(Stored::Hash(fields)) => Ok(Some(fields)),
        Some(Stored::Text(_)) => Err(wrong_type()),
    }
}

fn hash_ref_mut<'a>(data: &'a mut HashMap<String, Stored>, hash: &str) -> Result<Option<&'a mut BTreeMap<String, String>>, StoreError> {
    match data.get_mut(hash) {
        None => Ok(None),
        Some(Stored::Hash(fields)) => Ok(Some(fields)),
        Some(Stored::Text(_)) => Err(wrong_type()),
    }
}

fn hash_mut<'a>(data: &'a mut HashMap<String, Stored>, hash: &str) -> Result<&'a mut BTreeMap<String, String>, StoreError> {
    match data.entry(hash.to_owned()).or_insert_with(|| Stored::Hash(BTreeMap::new())) {
        Stored::Hash(fields) => Ok(fields),
        Stored::Text(_) => Err(wrong_type()),
    }
}

impl StoreNode for MockNode {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn supports(&self, name: CommandName) -> bool {
        !self.unsupported.lock().contains(&name)
    }

    async fn execute(&self, command: Command) -> Result<Reply, StoreError> {
        self.operations.lock().push(command.clone());

        if self.is_closed() {
            return Err(StoreError::closed(format!("mock: {} is closed", self.endpoint)));
        }

        if let Some(error) = self.injected_failure(&command) {
            return Err(error);
        }

        self.apply(&command)
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.close_calls.fetch_add(1, Ordering::AcqRel);
        *self.closed.lock() = true;
        Ok(())
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;

    fn run(node: &MockNode, name: CommandName, args: &[&str]) -> Result<Reply, StoreError> {
        block_on(node.execute(Command::new(name, args.iter().map(ToString::to_string).collect())))
    }

    #[test]
    fn hash_commands() {
        let node = MockNode::new("primary:6379");

        assert_eq!(run(&node, CommandName::HSet, &["h", "a", "1", "b", "2"]).unwrap(), Reply::Int(2));
        assert_eq!(run(&node, CommandName::HSet, &["h", "a", "3"]).unwrap(), Reply::Int(0));
        assert_eq!(run(&node, CommandName::HGet, &["h", "a"]).unwrap(), Reply::Text("3".into()));
        assert_eq!(run(&node, CommandName::HGet, &["h", "zz"]).unwrap(), Reply::Nil);
        assert_eq!(run(&node, CommandName::HLen, &["h"]).unwrap(), Reply::Int(2));
        assert_eq!(run(&node, CommandName::HExists, &["h", "b"]).unwrap(), Reply::Int(1));
        assert_eq!(
            run(&node, CommandName::HKeys, &["h"]).unwrap(),
            Reply::List(vec![Reply::Text("a".into()), Reply::Text("b".into())])
        );
        assert_eq!(
            run(&node, CommandName::HGetAll, &["h"]).unwrap(),
            Reply::List(vec![
                Reply::Text("a".into()),
                Reply::Text("3".into()),
                Reply::Text("b".into()),
                Reply::Text("2".into()),
            ])
        );
        assert_eq!(run(&node, CommandName::HDel, &["h", "a", "missing"]).unwrap(), Reply::Int(1));
        assert_eq!(run(&node, CommandName::HDel, &["nothing", "a"]).unwrap(), Reply::Int(0));
    }

    #[test]
    fn string_commands() {
        let node = MockNode::new("primary:6379");

        assert_eq!(run(&node, CommandName::Ping, &[]).unwrap(), Reply::Text("PONG".into()));
        assert_eq!(run(&node, CommandName::Set, &["k", "v"]).unwrap(), Reply::Ok);
        assert_eq!(run(&node, CommandName::Get, &["k"]).unwrap(), Reply::Text("v".into()));
        assert_eq!(run(&node, CommandName::Exists, &["k", "x"]).unwrap(), Reply::Int(1));
        assert_eq!(run(&node, CommandName::Ttl, &["k"]).unwrap(), Reply::Int(-1));
        assert_eq!(run(&node, CommandName::Del, &["k"]).unwrap(), Reply::Int(1));
        assert_eq!(run(&node, CommandName::Ttl, &["k"]).unwrap(), Reply::Int(-2));
    }

    #[test]
    fn wrong_type_and_arity_fail() {
        let node = MockNode::new("primary:6379");
        run(&node, CommandName::Set, &["k", "v"]).unwrap();

        assert_eq!(run(&node, CommandName::HGet, &["k", "f"]).unwrap_err().kind(), StoreErrorKind::Other);
        assert_eq!(run(&node, CommandName::HGet, &["k"]).unwrap_err().kind(), StoreErrorKind::Other);
        assert_eq!(run(&node, CommandName::HSet, &["h", "a", "1", "b"]).unwrap_err().kind(), StoreErrorKind::Other);
    }

    #[test]
    fn failure_injection_is_recorded() {
        let node = MockNode::new("replica:6380");
        node.fail_when(StoreErrorKind::TimedOut, |cmd| cmd.arg(0) == Some("slow"));

        assert_eq!(run(&node, CommandName::HGet, &["slow", "f"]).unwrap_err().kind(), StoreErrorKind::TimedOut);
        assert!(run(&node, CommandName::HGet, &["fast", "f"]).is_ok());
        assert_eq!(node.count(CommandName::HGet), 2);

        node.clear_failures();
        assert!(run(&node, CommandName::HGet, &["slow", "f"]).is_ok());
    }

    #[test]
    fn mirror_shares_data_only() {
        let primary = MockNode::new("primary:6379");
        let replica = primary.mirror("replica:6380");
        primary.set_hash_field("users", "42", "Ann");
        replica.fail_all(StoreErrorKind::ConnectionRefused);

        assert_eq!(replica.hash_field("users", "42").as_deref(), Some("Ann"));
        assert!(run(&replica, CommandName::HGet, &["users", "42"]).is_err());
        assert!(run(&primary, CommandName::HGet, &["users", "42"]).is_ok());
        assert_eq!(primary.operations().len(), 1);
        assert_eq!(replica.endpoint().to_string(), "replica:6380");
    }

    #[test]
    fn close_is_idempotent_and_rejects_later_commands() {
        let node = MockNode::new("primary:6379");
        block_on(node.close()).unwrap();
        block_on(node.close()).unwrap();

        assert!(node.is_closed());
        assert_eq!(node.close_calls(), 2);
        assert_eq!(run(&node, CommandName::Ping, &[]).unwrap_err().kind(), StoreErrorKind::Closed);
    }

    #[test]
    fn unsupported_commands() {
        let node = MockNode::new("primary:6379");
        node.unsupported(CommandName::HGetAll);
        assert!(!node.supports(CommandName::HGetAll));
        assert!(node.supports(CommandName::HGet));
    }
}
