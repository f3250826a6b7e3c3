//! Hard deadline around a single external call.
//!
//! The call runs as its own spawned task, so a stuck dependency can never
//! hold the caller past the deadline. Every
//! outcome other than success is folded into a [`Sentinel`] value of the
//! call's own output type.

use crate::models::SearchHit;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    TimedOut(Duration),
    Failed(String),
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::TimedOut(after) => write!(f, "timed out after {}s", after.as_secs_f64()),
            Fault::Failed(message) => write!(f, "failed: {message}"),
        }
    }
}

/// An output type that can stand in for a failed call.
pub trait Sentinel {
    fn from_fault(label: &str, fault: &Fault) -> Self;
}

impl Sentinel for String {
    fn from_fault(label: &str, fault: &Fault) -> Self {
        format!("ERROR: {label} {fault}")
    }
}

impl Sentinel for Vec<SearchHit> {
    fn from_fault(label: &str, fault: &Fault) -> Self {
        vec![SearchHit::error(String::from_fault(label, fault))]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BoundedExecutor {
    label: &'static str,
    timeout: Duration,
}

impl BoundedExecutor {
    pub fn new(label: &'static str, timeout: Duration) -> Self {
        Self { label, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs an async operation as its own task, aborting it on timeout.
    pub async fn execute<T, Fut>(&self, operation: Fut) -> T
    where
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Sentinel + Send + 'static,
    {
        let handle = tokio::spawn(operation);
        let abort = handle.abort_handle();
        let output = self.settle(handle).await;
        abort.abort();
        output
    }

    async fn settle<T>(&self, handle: JoinHandle<anyhow::Result<T>>) -> T
    where
        T: Sentinel,
    {
        let fault = match tokio::time::timeout(self.timeout, handle).await {
            Ok(Ok(Ok(output))) => return output,
            Ok(Ok(Err(err))) => Fault::Failed(format!("{err:#}")),
            Ok(Err(join)) if join.is_panic() => Fault::Failed(panic_message(join.into_panic())),
            Ok(Err(join)) => Fault::Failed(join.to_string()),
            Err(_) => Fault::TimedOut(self.timeout),
        };
        warn!(tool = self.label, %fault, "bounded call degraded to sentinel");
        T::from_fault(self.label, &fault)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    async fn explode() -> anyhow::Result<String> {
        panic!("boom")
    }

    #[tokio::test]
    async fn slow_operation_yields_timeout_sentinel() {
        let executor = BoundedExecutor::new("Search", Duration::from_millis(100));
        let started = Instant::now();
        let hits: Vec<SearchHit> = executor
            .execute(async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Ok(vec![SearchHit {
                    title: "late".into(),
                    link: "https://late.example".into(),
                    snippet: "too late".into(),
                }])
            })
            .await;
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(
            hits,
            vec![SearchHit::error("ERROR: Search timed out after 0.1s")]
        );
    }

    #[tokio::test]
    async fn slow_async_operation_yields_timeout_sentinel() {
        let executor = BoundedExecutor::new("Search", Duration::from_secs(2));
        let hits: Vec<SearchHit> = tokio::time::timeout(
            Duration::from_secs(3),
            executor.execute(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Vec::new())
            }),
        )
        .await
        .expect("executor must return before its deadline plus slack");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].snippet, "ERROR: Search timed out after 2s");
        assert!(hits[0].link.is_empty());
    }

    #[tokio::test]
    async fn operation_error_is_interpolated() {
        let executor = BoundedExecutor::new("Search", Duration::from_secs(1));
        let hits: Vec<SearchHit> = executor
            .execute(async { Err(anyhow::anyhow!("connection refused")) })
            .await;
        assert_eq!(hits[0].snippet, "ERROR: Search failed: connection refused");
    }

    #[tokio::test]
    async fn panicking_operation_is_contained() {
        let executor = BoundedExecutor::new("Wikipedia", Duration::from_secs(1));
        let text: String = executor.execute(explode()).await;
        assert_eq!(text, "ERROR: Wikipedia failed: boom");
    }

    #[tokio::test]
    async fn success_passes_through() {
        let executor = BoundedExecutor::new("Wikipedia", Duration::from_secs(1));
        let text: String = executor.execute(async { Ok("fine".to_string()) }).await;
        assert_eq!(text, "fine");
        assert_eq!(executor.timeout(), Duration::from_secs(1));
    }
}
