use crate::retry::{classify, Disposition, RetryError, RetryPolicy};
use crate::traits::{ApiError, RequestContext};
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, error, instrument, warn};

/// A remote call that ended in a failure the calling work unit cannot absorb.
#[derive(Error, Debug, Clone)]
#[error("{operation} in {region} failed ({disposition}): {source}")]
pub struct CallFailed {
    pub operation: &'static str,
    pub region: String,
    pub disposition: Disposition,
    pub source: RetryError,
}

/// Gateway for every remote call made during a harvest cycle.
///
/// Applies the cycle's [`RetryPolicy`], classifies terminal failures and
/// keeps call diagnostics. Cloning is cheap; clones share policy, limiter and
/// counters.
#[derive(Debug, Clone)]
pub struct CallExecutor {
    policy: Arc<RetryPolicy>,
    semaphore: Option<Arc<Semaphore>>,
    diagnostics: Arc<Diagnostics>,
}

impl CallExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy: Arc::new(policy),
            semaphore: None,
            diagnostics: Arc::new(Diagnostics::default()),
        }
    }

    /// Caps the number of attempts in flight at once across all work units.
    ///
    /// The permit is held for a single attempt, never across a backoff sleep.
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.semaphore = Some(Arc::new(Semaphore::new(limit.max(1))));
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    /// Issues a call under the retry policy.
    ///
    /// Returns `Ok(None)` when the terminal failure is absorbable
    /// (stale cache, throttled, not found): the call contributes nothing and
    /// the caller carries on.
    ///
    /// # Errors
    ///
    /// Returns [`CallFailed`] for fatal failures, including exhausted retry
    /// budgets.
    #[instrument(skip(self, ctx, operation), fields(region = %ctx.region))]
    pub async fn call<T, F, Fut>(
        &self,
        ctx: &RequestContext,
        operation_name: &'static str,
        operation: F,
    ) -> Result<Option<T>, CallFailed>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        match self.attempt(operation).await {
            Ok(value) => Ok(Some(value)),
            Err(source) => {
                let disposition = classify(&source);
                self.diagnostics.record_disposition(disposition);
                match disposition {
                    Disposition::StaleCache => {
                        warn!(
                            operation = operation_name,
                            "Redirected to a cached resource, nothing new to record"
                        );
                        Ok(None)
                    }
                    Disposition::Throttled => {
                        error!(
                            operation = operation_name,
                            error = %source,
                            "Too many API requests, abandoning call"
                        );
                        Ok(None)
                    }
                    Disposition::NotFound => {
                        warn!(
                            operation = operation_name,
                            error = %source,
                            "Resource not found or not authorized, skipping"
                        );
                        Ok(None)
                    }
                    Disposition::Fatal => Err(CallFailed {
                        operation: operation_name,
                        region: ctx.region.clone(),
                        disposition,
                        source,
                    }),
                }
            }
        }
    }

    /// Like [`CallExecutor::call`] for list operations: an absorbed failure
    /// reads as an empty listing.
    pub async fn call_list<T, F, Fut>(
        &self,
        ctx: &RequestContext,
        operation_name: &'static str,
        operation: F,
    ) -> Result<Vec<T>, CallFailed>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Vec<T>, ApiError>>,
    {
        Ok(self
            .call(ctx, operation_name, operation)
            .await?
            .unwrap_or_default())
    }

    /// Issues a call whose result is mandatory: every terminal failure is
    /// returned, whatever its classification.
    pub async fn call_required<T, F, Fut>(
        &self,
        ctx: &RequestContext,
        operation_name: &'static str,
        operation: F,
    ) -> Result<T, CallFailed>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        self.attempt(operation).await.map_err(|source| {
            let disposition = classify(&source);
            self.diagnostics.record_disposition(disposition);
            CallFailed {
                operation: operation_name,
                region: ctx.region.clone(),
                disposition,
                source,
            }
        })
    }

    async fn attempt<T, F, Fut>(&self, mut operation: F) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let semaphore = self.semaphore.clone();
        let result = self
            .policy
            .execute(|| {
                let semaphore = semaphore.clone();
                let call = operation();
                async move {
                    let _permit = match semaphore {
                        Some(semaphore) => Some(semaphore.acquire_owned().await.map_err(|e| {
                            ApiError::Transport(format!("call limiter closed: {e}"))
                        })?),
                        None => None,
                    };
                    call.await
                }
            })
            .await;

        let attempts = match &result {
            Ok(done) => done.attempts,
            Err(failed) => failed.attempts,
        };
        self.diagnostics.record_call(attempts);
        if attempts > 1 {
            debug!(attempts, succeeded = result.is_ok(), "Remote call needed retries");
        }

        result.map(|done| done.value)
    }
}

/// Call counters shared by every work unit of a cycle.
#[derive(Debug, Default)]
pub struct Diagnostics {
    calls: AtomicU64,
    attempts: AtomicU64,
    retried_calls: AtomicU64,
    stale_cache: AtomicU64,
    throttled: AtomicU64,
    not_found: AtomicU64,
    fatal: AtomicU64,
}

impl Diagnostics {
    fn record_call(&self, attempts: u32) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.attempts.fetch_add(u64::from(attempts), Ordering::Relaxed);
        if attempts > 1 {
            self.retried_calls.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_disposition(&self, disposition: Disposition) {
        let counter = match disposition {
            Disposition::StaleCache => &self.stale_cache,
            Disposition::Throttled => &self.throttled,
            Disposition::NotFound => &self.not_found,
            Disposition::Fatal => &self.fatal,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
            retried_calls: self.retried_calls.load(Ordering::Relaxed),
            stale_cache: self.stale_cache.load(Ordering::Relaxed),
            throttled: self.throttled.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            fatal: self.fatal.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`Diagnostics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticsSnapshot {
    /// Logical calls issued
    pub calls: u64,
    /// Attempts across all calls, first tries included
    pub attempts: u64,
    /// Calls that needed more than one attempt
    pub retried_calls: u64,
    pub stale_cache: u64,
    pub throttled: u64,
    pub not_found: u64,
    pub fatal: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    fn ctx() -> RequestContext {
        RequestContext::new("ocid1.tenancy.oc1..t", "eu-frankfurt-1")
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttled_twice_then_success_records_three_attempts() {
        let executor = CallExecutor::new(RetryPolicy::default());
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let records = executor
            .call_list(&ctx(), "list_instances", || {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err(ApiError::service(429, "TooManyRequests", "slow down"))
                    } else {
                        Ok(vec!["ocid1.instance.oc1..a"])
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(records, vec!["ocid1.instance.oc1..a"]);
        let diagnostics = executor.diagnostics();
        assert_eq!(diagnostics.calls, 1);
        assert_eq!(diagnostics.attempts, 3);
        assert_eq!(diagnostics.retried_calls, 1);
        assert_eq!(diagnostics.fatal, 0);
        assert_eq!(diagnostics.throttled, 0);
    }

    #[tokio::test]
    async fn test_absorbed_failures_read_as_nothing() {
        let executor = CallExecutor::new(RetryPolicy::for_testing());

        let stale: Option<u32> = executor
            .call(&ctx(), "get_tenancy", || async {
                Err(ApiError::service(304, "NotModified", ""))
            })
            .await
            .unwrap();
        assert!(stale.is_none());

        let missing: Vec<u32> = executor
            .call_list(&ctx(), "list_db_homes", || async {
                Err(ApiError::service(404, "NotAuthorizedOrNotFound", ""))
            })
            .await
            .unwrap();
        assert!(missing.is_empty());

        let diagnostics = executor.diagnostics();
        assert_eq!(diagnostics.stale_cache, 1);
        assert_eq!(diagnostics.not_found, 1);
        assert_eq!(diagnostics.attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_are_fatal() {
        let executor = CallExecutor::new(RetryPolicy::for_testing());

        let err = executor
            .call(&ctx(), "list_volumes", || async {
                Err::<Vec<u32>, _>(ApiError::service(500, "InternalServerError", ""))
            })
            .await
            .unwrap_err();

        assert_eq!(err.operation, "list_volumes");
        assert_eq!(err.region, "eu-frankfurt-1");
        assert_eq!(err.disposition, Disposition::Fatal);
        assert_eq!(err.source.attempts, 3);
        assert_eq!(executor.diagnostics().fatal, 1);
    }

    #[tokio::test]
    async fn test_required_call_surfaces_absorbable_failures() {
        let executor = CallExecutor::new(RetryPolicy::for_testing());

        let err = executor
            .call_required(&ctx(), "get_tenancy", || async {
                Err::<u32, _>(ApiError::service(404, "NotAuthorizedOrNotFound", ""))
            })
            .await
            .unwrap_err();

        assert_eq!(err.disposition, Disposition::NotFound);
    }

    #[tokio::test]
    async fn test_concurrency_limit_bounds_in_flight_attempts() {
        let executor = CallExecutor::new(RetryPolicy::for_testing()).with_concurrency_limit(2);
        let in_flight = Arc::new(AtomicU32::new(0));
        let peak = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let executor = executor.clone();
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                executor
                    .call(&ctx(), "list_images", || {
                        let in_flight = Arc::clone(&in_flight);
                        let peak = Arc::clone(&peak);
                        async move {
                            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(5)).await;
                            in_flight.fetch_sub(1, Ordering::SeqCst);
                            Ok::<_, ApiError>(())
                        }
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(executor.diagnostics().calls, 8);
    }
}
