use crate::connection::MongoConfig;
use crate::error::DbError;
use crate::state::{ConnectionMonitor, ConnectionState};
use async_trait::async_trait;
use chrono::{DateTime, Duration, DurationRound, Utc};
use core_types::{NewReport, Report};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, DateTime as BsonDateTime};
use mongodb::event::sdam::SdamEvent;
use mongodb::event::EventHandler;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::RwLock;

/// Database used when neither the settings nor the URI name one.
const DEFAULT_DATABASE: &str = "test";
const APP_NAME: &str = "reportdesk";

/// The persistence gateway the request handlers program against.
///
/// Implementations must be `Send + Sync + 'static` to live in the axum
/// application state.
#[async_trait]
pub trait ReportStore: Send + Sync + 'static {
    /// Non-blocking snapshot of store reachability. Never touches the network.
    fn connection_state(&self) -> ConnectionState;

    /// Persists a validated report, stamping its identity and creation time.
    async fn create(&self, report: NewReport) -> Result<Report, DbError>;

    /// Returns every stored report in store-native order.
    async fn find_all(&self) -> Result<Vec<Report>, DbError>;

    /// Closes the connection. Calling it again is a no-op.
    async fn disconnect(&self) -> Result<(), DbError>;
}

/// `ReportStore` backed by a MongoDB collection.
pub struct MongoGateway {
    client: RwLock<Option<Client>>,
    database: String,
    collection: String,
    monitor: ConnectionMonitor,
}

impl MongoGateway {
    /// Makes one connection attempt: builds the client and pings the database.
    ///
    /// The driver connects lazily, so the ping is what proves reachability.
    pub async fn connect(config: &MongoConfig, monitor: ConnectionMonitor) -> Result<Self, DbError> {
        monitor.disarm();
        monitor.set(ConnectionState::Connecting);
        match Self::open(config, &monitor).await {
            Ok(gateway) => {
                monitor.set(ConnectionState::Connected);
                monitor.arm();
                Ok(gateway)
            }
            Err(e) => {
                monitor.set(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    async fn open(config: &MongoConfig, monitor: &ConnectionMonitor) -> Result<Self, DbError> {
        let mut options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|e| DbError::ConnectionConfigError(e.to_string()))?;
        options.server_selection_timeout = Some(config.server_selection_timeout);
        if options.app_name.is_none() {
            options.app_name = Some(APP_NAME.to_string());
        }
        let topology_monitor = monitor.clone();
        options.sdam_event_handler = Some(EventHandler::callback(move |event: SdamEvent| {
            topology_monitor.observe(&event)
        }));

        let client = Client::with_options(options).map_err(DbError::ConnectionError)?;
        let database = config
            .database
            .clone()
            .or_else(|| client.default_database().map(|db| db.name().to_string()))
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        client
            .database(&database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(DbError::ConnectionError)?;

        tracing::info!(database = %database, collection = %config.collection, "MongoDB ping succeeded.");
        Ok(Self {
            client: RwLock::new(Some(client)),
            database,
            collection: config.collection.clone(),
            monitor: monitor.clone(),
        })
    }

    async fn reports(&self) -> Result<Collection<ReportDocument>, DbError> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or(DbError::NotConnected)?;
        Ok(client
            .database(&self.database)
            .collection::<ReportDocument>(&self.collection))
    }
}

#[async_trait]
impl ReportStore for MongoGateway {
    fn connection_state(&self) -> ConnectionState {
        self.monitor.get()
    }

    async fn create(&self, report: NewReport) -> Result<Report, DbError> {
        let collection = self.reports().await?;
        let document = ReportDocument::new(report, Utc::now())?;
        collection.insert_one(&document).await?;
        document.try_into()
    }

    async fn find_all(&self) -> Result<Vec<Report>, DbError> {
        let collection = self.reports().await?;
        let documents: Vec<ReportDocument> = collection.find(doc! {}).await?.try_collect().await?;
        documents.into_iter().map(Report::try_from).collect()
    }

    async fn disconnect(&self) -> Result<(), DbError> {
        let Some(client) = self.client.write().await.take() else {
            return Ok(());
        };
        self.monitor.disarm();
        self.monitor.set(ConnectionState::Disconnecting);
        client.shutdown().await;
        self.monitor.set(ConnectionState::Disconnected);
        tracing::info!("MongoDB disconnected.");
        Ok(())
    }
}

/// The stored shape of a report, with the same field names the client submits.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReportDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    #[serde(rename = "fullName")]
    full_name: String,
    #[serde(rename = "orderId", deserialize_with = "deserialize_order_id")]
    order_id: i64,
    issue: String,
    #[serde(rename = "reportProblem", default, skip_serializing_if = "Option::is_none")]
    report_problem: Option<String>,
    #[serde(rename = "createdAt")]
    created_at: BsonDateTime,
}

impl ReportDocument {
    fn new(report: NewReport, now: DateTime<Utc>) -> Result<Self, DbError> {
        Ok(Self {
            id: ObjectId::new(),
            full_name: report.full_name,
            order_id: report.order_id,
            issue: report.issue,
            report_problem: report.report_problem,
            created_at: BsonDateTime::from_millis(ceil_to_millis(now)?.timestamp_millis()),
        })
    }
}

/// BSON dates carry milliseconds; rounding up keeps `createdAt` at or after `now`.
fn ceil_to_millis(now: DateTime<Utc>) -> Result<DateTime<Utc>, DbError> {
    let millisecond = Duration::milliseconds(1);
    let truncated = now
        .duration_trunc(millisecond)
        .map_err(|e| DbError::MalformedDocument(format!("createdAt {now}: {e}")))?;
    Ok(if truncated < now {
        truncated + millisecond
    } else {
        truncated
    })
}

impl TryFrom<ReportDocument> for Report {
    type Error = DbError;

    fn try_from(document: ReportDocument) -> Result<Self, Self::Error> {
        let created_at = DateTime::<Utc>::from_timestamp_millis(document.created_at.timestamp_millis())
            .ok_or_else(|| {
                DbError::MalformedDocument(format!("createdAt out of range for {}", document.id))
            })?;
        Ok(Report {
            id: document.id.to_hex(),
            full_name: document.full_name,
            order_id: document.order_id,
            issue: document.issue,
            report_problem: document.report_problem,
            created_at,
        })
    }
}

/// Older writers stored `orderId` as a double or a 32-bit integer.
fn deserialize_order_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match Bson::deserialize(deserializer)? {
        Bson::Int32(n) => Ok(i64::from(n)),
        Bson::Int64(n) => Ok(n),
        Bson::Double(f) if f.fract() == 0.0 => Ok(f as i64),
        other => Err(serde::de::Error::custom(format!(
            "orderId is not an integer: {other}"
        ))),
    }
}
