// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Validation of cached payloads.

use std::convert::Infallible;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

use serde::de::DeserializeOwned;

/// Describes the shape a cached payload must have.
///
/// A stored payload that fails [`Schema::parse`] is treated as a miss by
/// [`Cache::get_or_load_with`](crate::Cache::get_or_load_with).
pub trait Schema: Send + Sync {
    /// The parsed form of a valid payload.
    type Output;

    /// The error returned for an invalid payload.
    type Error: Into<Box<dyn std::error::Error + Send + Sync>>;

    /// Parses a payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload does not conform to this schema.
    fn parse(&self, payload: &str) -> Result<Self::Output, Self::Error>;

    /// Returns `true` if the payload conforms to this schema.
    fn validate(&self, payload: &str) -> bool {
        self.parse(payload).is_ok()
    }
}

/// Accepts any payload and returns it unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Raw;

impl Schema for Raw {
    type Output = String;
    type Error = Infallible;

    fn parse(&self, payload: &str) -> Result<String, Infallible> {
        Ok(payload.to_owned())
    }
}

/// Accepts JSON payloads that deserialize into `T`.
///
/// # Examples
///
/// ```
/// use failover_cache::schema::{Json, Schema};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct User {
///     name: String,
/// }
///
/// let schema = Json::<User>::new();
/// assert_eq!(schema.parse(r#"{"name":"Ann"}"#).unwrap().name, "Ann");
/// assert!(!schema.validate("not json"));
/// ```
pub struct Json<T>(PhantomData<fn() -> T>);

impl<T> Json<T> {
    /// Creates a schema for `T`.
    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Json<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Json<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Json<T> {}

impl<T> Debug for Json<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Json<{}>", std::any::type_name::<T>())
    }
}

impl<T: DeserializeOwned> Schema for Json<T> {
    type Output = T;
    type Error = serde_json::Error;

    fn parse(&self, payload: &str) -> Result<T, serde_json::Error> {
        serde_json::from_str(payload)
    }
}
