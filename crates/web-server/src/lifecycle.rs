//! Ordered service startup and graceful shutdown.
//!
//! ```text
//! Init -> ValidatingConfig -> Connecting -> Serving -> ShuttingDown -> Terminated
//! ```
//!
//! Missing configuration and exhausted connect retries jump straight to
//! `Terminated`.
//!
//! The listener is only bound once the store connection exists: a `Server`
//! can only be built from a connected `ReportStore`, so no request is ever
//! accepted while the store is unreachable at boot.

use crate::{app, AppState};
use configuration::{error::ConfigError, Settings};
use database::{
    connect_with_retry, Connector, DbError, MongoConfig, MongoConnector, ReportStore, RetryPolicy,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    ValidatingConfig,
    Connecting,
    Serving,
    ShuttingDown,
    Terminated,
}

/// Fatal errors that stop the process before (or instead of) serving.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to start app - DB connection failed: {0}")]
    Connect(#[from] DbError),
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

impl StartupError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> u8 {
        1
    }
}

/// Store settings that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub mongo: MongoConfig,
    pub retry: RetryPolicy,
}

/// Tracks the current `Stage`. Clones share the same stage.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    stage: Arc<watch::Sender<Stage>>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        let (stage, _) = watch::channel(Stage::Init);
        Self {
            stage: Arc::new(stage),
        }
    }

    pub fn stage(&self) -> Stage {
        *self.stage.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Stage> {
        self.stage.subscribe()
    }

    fn advance(&self, next: Stage) {
        let previous = self.stage.send_replace(next);
        tracing::info!(from = ?previous, to = ?next, "Lifecycle transition.");
    }

    fn fail<E: Into<StartupError>>(&self, err: E) -> StartupError {
        let err = err.into();
        tracing::error!(error = %err, stage = ?self.stage(), "Fatal startup error.");
        self.advance(Stage::Terminated);
        err
    }

    /// `ValidatingConfig`: the store connection string must be present.
    pub fn validate(&self, settings: &Settings) -> Result<ValidatedConfig, StartupError> {
        self.advance(Stage::ValidatingConfig);
        let uri = settings.require_mongo_uri().map_err(|e| self.fail(e))?;
        Ok(ValidatedConfig {
            mongo: MongoConfig {
                uri: uri.to_string(),
                database: settings.mongo_db_name.clone(),
                collection: settings.mongo_collection.clone(),
                server_selection_timeout: settings.server_selection_timeout(),
            },
            retry: RetryPolicy::new(settings.mongo_connect_retries, settings.retry_delay()),
        })
    }

    /// `Connecting`: bounded connect loop; exhaustion is fatal.
    pub async fn connect<C>(
        &self,
        connector: &C,
        retry: RetryPolicy,
    ) -> Result<Arc<dyn ReportStore>, StartupError>
    where
        C: Connector + ?Sized,
    {
        self.advance(Stage::Connecting);
        connect_with_retry(connector, retry)
            .await
            .map_err(|e| self.fail(e))
    }

    /// Binds the listener for a connected store and enters `Serving`.
    pub async fn listen(
        self,
        addr: &str,
        store: Arc<dyn ReportStore>,
    ) -> Result<Server, StartupError> {
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(source) => {
                let _ = store.disconnect().await;
                return Err(self.fail(StartupError::Bind {
                    addr: addr.to_string(),
                    source,
                }));
            }
        };
        self.advance(Stage::Serving);
        match listener.local_addr() {
            Ok(local) => tracing::info!(addr = %local, "Server listening on port {}.", local.port()),
            Err(_) => tracing::info!(addr, "Server listening."),
        }
        Ok(Server {
            listener,
            store,
            lifecycle: self,
        })
    }
}

/// A bound listener with its connected store, ready to serve.
pub struct Server {
    listener: TcpListener,
    store: Arc<dyn ReportStore>,
    lifecycle: Lifecycle,
}

impl Server {
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Serves until `shutdown` resolves, then drains in-flight requests and
    /// closes the store.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), StartupError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Server {
            listener,
            store,
            lifecycle,
        } = self;

        let router = app(AppState::new(store.clone()));
        let signal_lifecycle = lifecycle.clone();
        let signal = async move {
            shutdown.await;
            signal_lifecycle.advance(Stage::ShuttingDown);
            tracing::info!("No longer accepting connections; draining in-flight requests.");
        };

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(signal)
            .await;

        if lifecycle.stage() != Stage::ShuttingDown {
            lifecycle.advance(Stage::ShuttingDown);
        }
        if let Err(e) = store.disconnect().await {
            tracing::error!(error = %e, "Failed to disconnect from the database.");
        }
        lifecycle.advance(Stage::Terminated);

        served.map_err(StartupError::Serve)
    }
}

/// Runs the whole service: validate, connect, listen, serve until `shutdown`.
pub async fn run<F>(settings: &Settings, shutdown: F) -> Result<(), StartupError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let lifecycle = Lifecycle::new();
    let config = lifecycle.validate(settings)?;
    let connector = MongoConnector::new(config.mongo);
    let store = lifecycle.connect(&connector, config.retry).await?;
    let server = lifecycle.listen(&settings.listen_addr(), store).await?;
    server.serve(shutdown).await
}
