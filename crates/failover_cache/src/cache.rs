// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use failover_cache_node::{CommandName, Reply, StoreNode};
use futures::future::join_all;
use layered::Service;
use uniflight::Merger;

use crate::classifier::summary;
use crate::load::Loadable;
use crate::schema::{Raw, Schema};
use crate::telemetry::{self, CacheActivity};
use crate::{CacheBuilder, Error, RandomReplica, ReplicaSelector, Result, Router, Topology, classify};

/// Hash, key and the schema type the load is validated against.
type LoadKey = (String, String, &'static str);
type SharedLoad = std::result::Result<String, Arc<Error>>;

/// A read/write cache over one primary store node and its replicas.
///
/// Entries are hash fields identified by a hash name and a key; values are
/// opaque strings. Writes always go to the primary. Each read goes to one
/// replica and falls back to the primary if that replica fails. Without
/// replicas the primary serves everything.
///
/// A read served by a replica may not observe a write that has not
/// replicated yet. Only reads that land on, or fall back to, the primary are
/// guaranteed to see the latest write.
///
/// The cache owns its nodes. Call [`close`](Cache::close) once outstanding
/// operations have completed to release their connections; closing while
/// operations are in flight is the caller's responsibility to avoid.
///
/// # Examples
///
/// ```
/// use failover_cache::Cache;
/// use failover_cache_node::testing::MockNode;
///
/// # futures::executor::block_on(async {
/// let primary = MockNode::new("primary:6379");
/// let replica = primary.mirror("replica:6380");
/// let cache = Cache::builder(primary).replica(replica).build();
///
/// cache.set("users", "42", r#"{"name":"Ann"}"#).await?;
/// assert_eq!(cache.get("users", "42").await?.as_deref(), Some(r#"{"name":"Ann"}"#));
///
/// cache.close().await?;
/// # Ok::<(), failover_cache::Error>(())
/// # }).unwrap();
/// ```
pub struct Cache<N, S = RandomReplica> {
    router: Router<N, S>,
    loads: Option<Merger<LoadKey, SharedLoad>>,
}

impl<N: Debug, S: Debug> Debug for Cache<N, S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("router", &self.router)
            .field("stampede_protection", &self.loads.is_some())
            .finish()
    }
}

impl<N: StoreNode> Cache<N> {
    /// Starts building a cache around `primary`.
    pub fn builder(primary: N) -> CacheBuilder<N> {
        CacheBuilder::new(primary)
    }
}

impl<N, S> Cache<N, S>
where
    N: StoreNode,
    S: ReplicaSelector,
{
    pub(crate) fn from_parts(router: Router<N, S>, stampede_protection: bool) -> Self {
        Self {
            router,
            loads: stampede_protection.then(Merger::new),
        }
    }

    /// Returns the router that binds operations to nodes.
    pub fn router(&self) -> &Router<N, S> {
        &self.router
    }

    /// Returns the nodes of this cache.
    pub fn topology(&self) -> &Topology<N> {
        self.router.topology()
    }

    /// Returns `true` if concurrent misses on the same entry share one load.
    pub fn stampede_protection(&self) -> bool {
        self.loads.is_some()
    }

    /// Stores `value` under `key` in `hash` on the primary.
    ///
    /// # Errors
    ///
    /// Returns the classified failure of the primary.
    pub async fn set(&self, hash: &str, key: &str, value: &str) -> Result<()> {
        self.router
            .write(CommandName::HSet)?
            .execute(vec![hash.to_owned(), key.to_owned(), value.to_owned()])
            .await?;
        Ok(())
    }

    /// Returns the value stored under `key` in `hash`, or `None`.
    ///
    /// # Errors
    ///
    /// Returns the classified failure of the last node tried.
    pub async fn get(&self, hash: &str, key: &str) -> Result<Option<String>> {
        let reply = self
            .router
            .read(CommandName::HGet)?
            .execute(vec![hash.to_owned(), key.to_owned()])
            .await?;

        reply
            .into_optional_text()
            .map_err(|reply| Error::internal(format!("unexpected reply to hget: {reply:?}")))
    }

    /// Returns the stored value, or loads, stores and returns a new one.
    ///
    /// Equivalent to [`get_or_load_with`](Self::get_or_load_with) with the
    /// [`Raw`] schema, so any stored value is a hit.
    ///
    /// # Errors
    ///
    /// Returns store failures as classified errors and loader failures as
    /// [`Signal::InternalError`](crate::Signal::InternalError).
    pub async fn get_or_load<L: Loadable>(&self, hash: &str, key: &str, loader: L) -> Result<String> {
        self.get_or_load_with(hash, key, loader, Raw).await
    }

    /// Returns the stored value parsed with `schema`, or loads, stores and
    /// returns a new one.
    ///
    /// A stored value that fails `schema` is treated as a miss. On a miss the
    /// loader runs once, its payload is checked against `schema`, stored on
    /// the primary and returned parsed. A loaded payload that fails `schema`
    /// is not stored.
    ///
    /// Without stampede protection, concurrent misses on the same entry each
    /// run their loader and the last write wins. With it, concurrent misses
    /// on the same entry validated with the same schema type share one load.
    /// Callers using different schema types load independently.
    ///
    /// # Errors
    ///
    /// Returns store failures as classified errors. Loader failures and
    /// loaded payloads that fail `schema` are
    /// [`Signal::InternalError`](crate::Signal::InternalError).
    ///
    /// # Examples
    ///
    /// ```
    /// use failover_cache::Cache;
    /// use failover_cache::load;
    /// use failover_cache::schema::Json;
    /// use failover_cache_node::testing::MockNode;
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct User {
    ///     name: String,
    /// }
    ///
    /// # futures::executor::block_on(async {
    /// let cache = Cache::builder(MockNode::new("primary:6379")).build();
    /// cache.set("users", "42", "not json").await?;
    ///
    /// let loader = load::from_fn(|| Ok::<_, std::io::Error>(r#"{"name":"Ann"}"#.to_string()));
    /// let user = cache.get_or_load_with("users", "42", loader, Json::<User>::new()).await?;
    ///
    /// assert_eq!(user.name, "Ann");
    /// assert_eq!(cache.get("users", "42").await?.as_deref(), Some(r#"{"name":"Ann"}"#));
    /// # Ok::<(), failover_cache::Error>(())
    /// # }).unwrap();
    /// ```
    pub async fn get_or_load_with<L, Sc>(&self, hash: &str, key: &str, loader: L, schema: Sc) -> Result<Sc::Output>
    where
        L: Loadable,
        Sc: Schema,
    {
        match self.get(hash, key).await? {
            Some(value) => match schema.parse(&value) {
                Ok(output) => {
                    telemetry::record(hash, key, CacheActivity::Hit);
                    return Ok(output);
                }
                Err(_) => telemetry::record(hash, key, CacheActivity::Invalid),
            },
            None => telemetry::record(hash, key, CacheActivity::Miss),
        }

        let schema_ref = &schema;
        let payload = match &self.loads {
            None => self.load_and_store(hash, key, loader, schema_ref).await?,
            Some(loads) => {
                let load_key = (hash.to_owned(), key.to_owned(), std::any::type_name::<Sc>());
                loads
                    .execute(&load_key, move || async move {
                        self.load_and_store(hash, key, loader, schema_ref).await.map_err(Arc::new)
                    })
                    .await
                    .map_err(Error::internal)?
                    .map_err(|shared| Error::caused_by(shared.signal(), shared))?
            }
        };

        schema.parse(&payload).map_err(Error::internal)
    }

    async fn load_and_store<L, Sc>(&self, hash: &str, key: &str, loader: L, schema: &Sc) -> Result<String>
    where
        L: Loadable,
        Sc: Schema,
    {
        let payload = match loader.load().await {
            Ok(payload) => payload,
            Err(cause) => {
                let error = Error::internal(cause);
                tracing::error!(cache.hash = hash, cache.key = key, error = %summary(&error), "cache loader failed");
                return Err(error);
            }
        };

        if let Err(cause) = schema.parse(&payload) {
            let error = Error::internal(cause);
            tracing::error!(cache.hash = hash, cache.key = key, error = %summary(&error), "loaded value failed validation");
            return Err(error);
        }

        self.set(hash, key, &payload).await?;
        telemetry::record(hash, key, CacheActivity::Loaded);
        Ok(payload)
    }

    /// Executes any catalog command by name.
    ///
    /// Write commands go to the primary. Read commands go through replica
    /// selection with primary fallback, like [`get`](Self::get).
    ///
    /// # Errors
    ///
    /// Returns [`Signal::NotSupported`](crate::Signal::NotSupported) for
    /// unknown names, wrong argument counts and commands a node does not
    /// support; store failures are classified.
    ///
    /// # Examples
    ///
    /// ```
    /// use failover_cache::{Cache, Reply, Signal};
    /// use failover_cache_node::testing::MockNode;
    ///
    /// # futures::executor::block_on(async {
    /// let cache = Cache::builder(MockNode::new("primary:6379")).build();
    /// cache.set("users", "42", "Ann").await?;
    ///
    /// let len = cache.command("hlen", vec!["users".into()]).await?;
    /// assert_eq!(len, Reply::Int(1));
    ///
    /// let error = cache.command("flushall", Vec::new()).await.unwrap_err();
    /// assert_eq!(error.signal(), Signal::NotSupported);
    /// # Ok::<(), failover_cache::Error>(())
    /// # }).unwrap();
    /// ```
    pub async fn command(&self, name: &str, args: Vec<String>) -> Result<Reply> {
        let command: CommandName = name.parse().map_err(Error::not_supported)?;

        let arity = command.arity();
        if !arity.accepts(args.len()) {
            return Err(Error::not_supported(format!(
                "'{command}' takes {arity} arguments, got {}",
                args.len()
            )));
        }

        let op = if command.is_write() {
            self.router.write(command)?
        } else {
            self.router.read(command)?
        };

        op.execute(args).await
    }

    /// Releases the connections of the primary and every replica.
    ///
    /// All nodes are closed concurrently and every close is awaited. Closing
    /// an already closed cache succeeds.
    ///
    /// # Errors
    ///
    /// Returns the first node failure, classified, after all nodes finished.
    pub async fn close(&self) -> Result<()> {
        let topology = self.router.topology();
        let results = join_all(topology.nodes().map(StoreNode::close)).await;

        let mut first_error = None;
        let mut failed = 0_usize;
        for (node, result) in topology.nodes().zip(results) {
            if let Err(error) = result {
                tracing::warn!(endpoint = %node.endpoint(), error = %summary(&error), "store node close failed");
                failed += 1;
                first_error.get_or_insert(error);
            }
        }

        tracing::info!(nodes = topology.nodes().count(), failed, "cache close completed");
        first_error.map_or(Ok(()), |error| Err(classify(error)))
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::io;

    use failover_cache_node::StoreErrorKind;
    use failover_cache_node::testing::MockNode;
    use futures::executor::block_on;

    use super::*;
    use crate::load;
    use crate::schema::Json;
    use crate::testing::LogCapture;
    use crate::{RoundRobin, Signal};

    fn topology(replicas: usize) -> (MockNode, Vec<MockNode>) {
        let primary = MockNode::new("primary:6379");
        let replicas = (0..replicas).map(|i| primary.mirror(&format!("replica-{i}:6380"))).collect();
        (primary, replicas)
    }

    fn cache(primary: &MockNode, replicas: &[MockNode]) -> Cache<MockNode, RoundRobin> {
        Cache::builder(primary.clone())
            .replicas(replicas.iter().cloned())
            .selector(RoundRobin::new())
            .build()
    }

    fn loader(value: &str) -> impl Loadable<Error = io::Error> + use<> {
        let value = value.to_owned();
        load::from_fn(move || Ok(value))
    }

    #[test]
    fn replica_failure_falls_back_and_logs_once() {
        let capture = LogCapture::default();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        let (primary, replicas) = topology(1);
        let cache = cache(&primary, &replicas);
        primary.set_hash_field("users", "42", "Ann");
        replicas[0].fail_all(StoreErrorKind::ConnectionRefused);

        assert_eq!(block_on(cache.get("users", "42")).unwrap().as_deref(), Some("Ann"));
        assert_eq!(capture.count("guard.fallback"), 1);
        assert_eq!(capture.count("store operation failed"), 0);
    }

    #[test]
    fn both_failing_classifies_primary_error() {
        let (primary, replicas) = topology(1);
        let cache = cache(&primary, &replicas);
        replicas[0].fail_all(StoreErrorKind::ConnectionRefused);
        primary.fail_all(StoreErrorKind::TimedOut);

        let error = block_on(cache.get("users", "42")).unwrap_err();
        assert_eq!(error.signal(), Signal::GatewayTimeout);
    }

    #[test]
    fn miss_then_hit_logs_events() {
        let capture = LogCapture::default();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        let (primary, _) = topology(0);
        let cache = cache(&primary, &[]);

        assert_eq!(block_on(cache.get_or_load("users", "42", loader("Ann"))).unwrap(), "Ann");
        assert_eq!(block_on(cache.get_or_load("users", "42", loader("Bo"))).unwrap(), "Ann");

        assert_eq!(capture.count("cache.miss"), 1);
        assert_eq!(capture.count("cache.loaded"), 1);
        assert_eq!(capture.count("cache.hit"), 1);
    }

    #[test]
    fn invalid_stored_value_is_replaced() {
        let capture = LogCapture::default();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        let (primary, _) = topology(0);
        let cache = cache(&primary, &[]);
        primary.set_hash_field("users", "42", "garbage");

        let value: serde_json::Value = block_on(cache.get_or_load_with("users", "42", loader(r#"{"name":"Ann"}"#), Json::new())).unwrap();

        assert_eq!(value["name"], "Ann");
        assert_eq!(primary.hash_field("users", "42").as_deref(), Some(r#"{"name":"Ann"}"#));
        assert_eq!(capture.count("cache.invalid"), 1);
    }

    #[test]
    fn invalid_loaded_value_is_not_stored() {
        let (primary, _) = topology(0);
        let cache = cache(&primary, &[]);

        let error = block_on(cache.get_or_load_with("users", "42", loader("garbage"), Json::<serde_json::Value>::new())).unwrap_err();

        assert_eq!(error.signal(), Signal::InternalError);
        assert_eq!(primary.hash_field("users", "42"), None);
        assert_eq!(primary.count(CommandName::HSet), 0);
    }

    #[test]
    fn loader_failure_is_internal_and_nothing_is_stored() {
        let (primary, _) = topology(0);
        let cache = cache(&primary, &[]);
        let failing = load::from_fn(|| Err::<String, _>(io::Error::other("backend down")));

        let error = block_on(cache.get_or_load("users", "42", failing)).unwrap_err();

        assert_eq!(error.signal(), Signal::InternalError);
        assert!(error.to_string().contains("backend down"), "got: {error}");
        assert_eq!(primary.count(CommandName::HSet), 0);
    }

    #[test]
    fn failed_lookup_does_not_load() {
        let (primary, _) = topology(0);
        let cache = cache(&primary, &[]);
        primary.fail_all(StoreErrorKind::ConnectionRefused);

        let error = block_on(cache.get_or_load("users", "42", load::from_fn(|| -> io::Result<String> { panic!("loader must not run") }))).unwrap_err();
        assert_eq!(error.signal(), Signal::ServiceUnavailable);
    }

    #[test]
    fn unsupported_read_fails_before_execution() {
        let (primary, _) = topology(0);
        let cache = cache(&primary, &[]);
        primary.unsupported(CommandName::HGet);

        let error = block_on(cache.get("users", "42")).unwrap_err();
        assert_eq!(error.signal(), Signal::NotSupported);
    }

    #[test]
    fn command_routes_by_kind() {
        let (primary, replicas) = topology(1);
        let cache = cache(&primary, &replicas);

        block_on(cache.command("HSET", vec!["h".into(), "a".into(), "1".into()])).unwrap();
        let len = block_on(cache.command("hlen", vec!["h".into()])).unwrap();

        assert_eq!(len, Reply::Int(1));
        assert_eq!(primary.count(CommandName::HSet), 1);
        assert_eq!(replicas[0].count(CommandName::HSet), 0);
        assert_eq!(replicas[0].count(CommandName::HLen), 1);
        assert_eq!(primary.count(CommandName::HLen), 0);
    }

    #[test]
    fn command_rejects_bad_arity_without_executing() {
        let (primary, _) = topology(0);
        let cache = cache(&primary, &[]);

        let error = block_on(cache.command("hget", vec!["only-hash".into()])).unwrap_err();
        assert_eq!(error.signal(), Signal::NotSupported);
        assert!(error.to_string().contains("exactly 2"), "got: {error}");
        assert!(primary.operations().is_empty());
    }

    #[test]
    fn close_releases_every_node_and_is_idempotent() {
        let (primary, replicas) = topology(2);
        let cache = cache(&primary, &replicas);

        block_on(cache.close()).unwrap();
        block_on(cache.close()).unwrap();

        assert_eq!(primary.close_calls(), 2);
        assert!(replicas.iter().all(MockNode::is_closed));

        let error = block_on(cache.set("h", "k", "v")).unwrap_err();
        assert_eq!(error.signal(), Signal::ServiceUnavailable);
    }

    #[test]
    fn debug_shows_stampede_protection() {
        let (primary, _) = topology(0);
        let cache = Cache::builder(primary).stampede_protection(true).build();
        assert!(format!("{cache:?}").contains("stampede_protection: true"));
        assert!(cache.stampede_protection());
    }
}
