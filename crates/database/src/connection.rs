use crate::error::DbError;
use crate::repository::{MongoGateway, ReportStore};
use crate::state::ConnectionMonitor;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Everything needed to open the store connection.
#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    /// Overrides the database named in the URI.
    pub database: Option<String>,
    pub collection: String,
    pub server_selection_timeout: Duration,
}

/// Bounds of the startup connect loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(6, Duration::from_secs(5))
    }
}

/// A single connection attempt to the report store.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn ReportStore>, DbError>;
}

/// Connects to MongoDB. Every attempt shares the same `ConnectionMonitor`, so
/// the state stays observable across retries and after the gateway is built.
#[derive(Debug, Clone)]
pub struct MongoConnector {
    config: MongoConfig,
    monitor: ConnectionMonitor,
}

impl MongoConnector {
    pub fn new(config: MongoConfig) -> Self {
        Self {
            config,
            monitor: ConnectionMonitor::new(),
        }
    }

    pub fn monitor(&self) -> &ConnectionMonitor {
        &self.monitor
    }
}

#[async_trait]
impl Connector for MongoConnector {
    async fn connect(&self) -> Result<Arc<dyn ReportStore>, DbError> {
        let gateway = MongoGateway::connect(&self.config, self.monitor.clone()).await?;
        Ok(Arc::new(gateway))
    }
}

/// Runs `connector` until it succeeds or `policy.max_attempts` is reached.
///
/// Sleeps `policy.delay` between attempts, never after the last one. On
/// exhaustion the last error is wrapped in `DbError::RetriesExhausted`; the
/// caller must treat that as fatal.
pub async fn connect_with_retry<C>(
    connector: &C,
    policy: RetryPolicy,
) -> Result<Arc<dyn ReportStore>, DbError>
where
    C: Connector + ?Sized,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        tracing::info!(attempt, max_attempts, "Mongo attempt {} - connecting...", attempt);
        match connector.connect().await {
            Ok(store) => {
                tracing::info!(attempt, "MongoDB connected.");
                return Ok(store);
            }
            Err(e) if attempt < max_attempts => {
                tracing::error!(attempt, error = %e, "Mongo connect attempt failed.");
                tracing::info!(delay_ms = policy.delay.as_millis() as u64, "Retrying after delay.");
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(attempt, error = %e, "All Mongo connection attempts failed.");
                return Err(DbError::RetriesExhausted {
                    attempts: attempt,
                    source: Box::new(e),
                });
            }
        }
    }
}
