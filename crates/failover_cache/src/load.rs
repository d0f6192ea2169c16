// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Loaders that produce a value on a cache miss.
//!
//! Any type implementing [`Loadable`] can be passed to
//! [`Cache::get_or_load`](crate::Cache::get_or_load). The adapters in this
//! module turn closures into loaders:
//!
//! ```
//! use failover_cache::load;
//!
//! let sync_loader = load::from_fn(|| Ok::<_, std::io::Error>("from disk".to_string()));
//! let async_loader = load::from_async(|| async { Ok::<_, std::io::Error>("from service".to_string()) });
//! # let _ = (sync_loader, async_loader);
//! ```

use std::fmt::{Debug, Formatter};

/// Produces the payload to store when a cache lookup misses.
///
/// `load` consumes the loader, so a loader runs at most once per lookup.
pub trait Loadable: Send {
    /// The error returned when loading fails.
    type Error: Into<Box<dyn std::error::Error + Send + Sync>>;

    /// Produces the payload.
    fn load(self) -> impl Future<Output = Result<String, Self::Error>> + Send;
}

/// A loader backed by a synchronous closure.
///
/// Created by [`from_fn`].
pub struct LoadFn<F>(F);

impl<F> Debug for LoadFn<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("LoadFn")
    }
}

/// A loader backed by a closure returning a future.
///
/// Created by [`from_async`].
pub struct LoadAsync<F>(F);

impl<F> Debug for LoadAsync<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("LoadAsync")
    }
}

/// Creates a loader from a synchronous closure.
pub fn from_fn<F, E>(f: F) -> LoadFn<F>
where
    F: FnOnce() -> Result<String, E> + Send,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    LoadFn(f)
}

/// Creates a loader from a closure returning a future.
pub fn from_async<F, Fut, E>(f: F) -> LoadAsync<F>
where
    F: FnOnce() -> Fut + Send,
    Fut: Future<Output = Result<String, E>> + Send,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    LoadAsync(f)
}

impl<F, E> Loadable for LoadFn<F>
where
    F: FnOnce() -> Result<String, E> + Send,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Error = E;

    async fn load(self) -> Result<String, E> {
        (self.0)()
    }
}

impl<F, Fut, E> Loadable for LoadAsync<F>
where
    F: FnOnce() -> Fut + Send,
    Fut: Future<Output = Result<String, E>> + Send,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Error = E;

    async fn load(self) -> Result<String, E> {
        (self.0)().await
    }
}
