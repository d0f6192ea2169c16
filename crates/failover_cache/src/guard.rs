// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Failure classification with a single fallback attempt.

use std::borrow::Cow;

use layered::Service;

use crate::classifier::summary;
use crate::{Classify, Error};

/// Wraps an operation so that failures are classified, with an optional
/// fallback operation.
///
/// Invoking a guard runs the primary operation. A success is returned as is.
/// On failure without a fallback, the error is classified and returned. With
/// a fallback, the failure is logged as `guard.fallback`, the fallback runs
/// with the same input, and the fallback's own result is returned, its error
/// classified. There is at most one fallback attempt and no retry loop.
///
/// Both operations are [`Service`]s returning `Result<T, E>` where `E`
/// implements [`Classify`]. Guards are services themselves and can be nested;
/// an inner guard's [`Error`] passes through the outer one unchanged.
///
/// # Examples
///
/// ```
/// use failover_cache::{Guard, Signal};
/// use failover_cache_node::StoreError;
/// use layered::{Execute, Service};
///
/// # futures::executor::block_on(async {
/// let replica = Execute::new(|_key: String| async { Err::<String, _>(StoreError::connection_refused("down")) });
/// let primary = Execute::new(|key: String| async move { Ok::<_, StoreError>(format!("value of {key}")) });
///
/// let read = Guard::new("hget", replica).fallback(primary);
/// assert_eq!(read.execute("42".to_string()).await?, "value of 42");
/// # Ok::<(), failover_cache::Error>(())
/// # }).unwrap();
/// ```
#[derive(Debug)]
pub struct Guard<P, F = P> {
    operation: Cow<'static, str>,
    primary: P,
    fallback: Option<F>,
}

impl<P> Guard<P> {
    /// Creates a guard around `primary` without a fallback.
    ///
    /// `operation` names the guarded operation in logs.
    pub fn new(operation: impl Into<Cow<'static, str>>, primary: P) -> Self {
        Self {
            operation: operation.into(),
            primary,
            fallback: None,
        }
    }
}

impl<P, F> Guard<P, F> {
    /// Sets the operation run when the primary operation fails.
    #[must_use]
    pub fn fallback<G>(self, fallback: G) -> Guard<P, G> {
        Guard {
            operation: self.operation,
            primary: self.primary,
            fallback: Some(fallback),
        }
    }

    /// Returns the name of the guarded operation.
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Returns the primary operation.
    pub fn primary(&self) -> &P {
        &self.primary
    }

    /// Returns the fallback operation, if any.
    pub fn fallback_ref(&self) -> Option<&F> {
        self.fallback.as_ref()
    }
}

impl<In, T, P, F, PE, FE> Service<In> for Guard<P, F>
where
    In: Clone + Send,
    P: Service<In, Out = Result<T, PE>>,
    F: Service<In, Out = Result<T, FE>>,
    PE: Classify,
    FE: Classify,
{
    type Out = Result<T, Error>;

    async fn execute(&self, input: In) -> Self::Out {
        let Some(fallback) = &self.fallback else {
            return self.primary.execute(input).await.map_err(Classify::classify);
        };

        {
            let error = match self.primary.execute(input.clone()).await {
                Ok(output) => return Ok(output),
                Err(error) => error,
            };
            tracing::warn!(operation = %self.operation, error = %summary(&error), "guard.fallback");
        }

        fallback.execute(input).await.map_err(Classify::classify)
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use failover_cache_node::StoreError;
    use futures::executor::block_on;
    use layered::Execute;

    use super::*;
    use crate::Signal;
    use crate::testing::LogCapture;

    type Outcome = Result<String, StoreError>;

    fn counted(calls: &Arc<AtomicUsize>, outcome: fn(String) -> Outcome) -> impl Service<String, Out = Outcome> + use<> {
        let calls = Arc::clone(calls);
        Execute::new(move |input: String| {
            calls.fetch_add(1, Ordering::SeqCst);
            let result = outcome(input);
            async move { result }
        })
    }

    fn ok(input: String) -> Outcome {
        Ok(format!("ok:{input}"))
    }

    fn refused(_: String) -> Outcome {
        Err(StoreError::connection_refused("replica refused"))
    }

    fn timed_out(_: String) -> Outcome {
        Err(StoreError::timed_out("primary timed out"))
    }

    #[test]
    fn success_passes_through_without_fallback() {
        let fallback_calls = Arc::new(AtomicUsize::new(0));
        let guard = Guard::new("hget", counted(&Arc::default(), ok)).fallback(counted(&fallback_calls, ok));

        assert_eq!(block_on(guard.execute("a".into())).unwrap(), "ok:a");
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failure_without_fallback_is_classified() {
        let guard = Guard::new("hset", counted(&Arc::default(), timed_out));

        let error = block_on(guard.execute("a".into())).unwrap_err();
        assert_eq!(error.signal(), Signal::GatewayTimeout);
    }

    #[test]
    fn fallback_result_is_returned_and_logged_once() {
        let capture = LogCapture::default();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        let primary_calls = Arc::new(AtomicUsize::new(0));
        let fallback_calls = Arc::new(AtomicUsize::new(0));
        let guard = Guard::new("hget", counted(&primary_calls, refused)).fallback(counted(&fallback_calls, ok));

        assert_eq!(block_on(guard.execute("a".into())).unwrap(), "ok:a");
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
        assert_eq!(capture.count("guard.fallback"), 1);
        capture.assert_contains("operation=hget");
        capture.assert_contains("replica refused");
        assert_eq!(capture.count("store operation failed"), 0);
    }

    #[test]
    fn fallback_error_wins_over_primary_error() {
        let guard = Guard::new("hget", counted(&Arc::default(), refused)).fallback(counted(&Arc::default(), timed_out));

        let error = block_on(guard.execute("a".into())).unwrap_err();
        assert_eq!(error.signal(), Signal::GatewayTimeout);
        assert!(error.to_string().contains("primary timed out"), "got: {error}");
    }

    #[test]
    fn fallback_receives_same_input() {
        let guard = Guard::new("hget", counted(&Arc::default(), refused)).fallback(counted(&Arc::default(), ok));
        assert_eq!(block_on(guard.execute("same".into())).unwrap(), "ok:same");
    }

    #[test]
    fn nested_guards_do_not_reclassify() {
        let capture = LogCapture::default();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        let inner = Guard::new("inner", counted(&Arc::default(), timed_out));
        let outer = Guard::new("outer", counted(&Arc::default(), refused)).fallback(inner);

        let error = block_on(outer.execute("a".into())).unwrap_err();
        assert_eq!(error.signal(), Signal::GatewayTimeout);
        assert_eq!(capture.count("store operation failed"), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn guarded_calls_run_on_spawned_tasks() {
        let guard = Arc::new(Guard::new("hget", counted(&Arc::default(), refused)).fallback(counted(&Arc::default(), ok)));

        let task = tokio::spawn({
            let guard = Arc::clone(&guard);
            async move { guard.execute("a".to_string()).await }
        });

        assert_eq!(task.await.unwrap().unwrap(), "ok:a");
    }

    #[test]
    fn accessors() {
        let guard = Guard::new("hget", counted(&Arc::default(), ok));
        assert_eq!(guard.operation(), "hget");
        assert!(guard.fallback_ref().is_none());
    }
}
