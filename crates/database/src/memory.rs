//! In-process `ReportStore` used by tests that cannot reach a real MongoDB.

use crate::error::DbError;
use crate::repository::ReportStore;
use crate::state::{ConnectionMonitor, ConnectionState};
use async_trait::async_trait;
use chrono::Utc;
use core_types::{FieldErrors, NewReport, Report};
use mongodb::bson::oid::ObjectId;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::sync::Mutex;

pub struct InMemoryReportStore {
    reports: Mutex<Vec<Report>>,
    monitor: ConnectionMonitor,
    rejected_fields: Mutex<Option<FieldErrors>>,
    fail_reads: AtomicBool,
    disconnects: AtomicU32,
}

impl Default for InMemoryReportStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryReportStore {
    /// A connected, empty store.
    pub fn new() -> Self {
        let monitor = ConnectionMonitor::new();
        monitor.set(ConnectionState::Connected);
        Self {
            reports: Mutex::new(Vec::new()),
            monitor,
            rejected_fields: Mutex::new(None),
            fail_reads: AtomicBool::new(false),
            disconnects: AtomicU32::new(0),
        }
    }

    pub fn set_state(&self, state: ConnectionState) {
        self.monitor.set(state);
    }

    /// Makes every subsequent `create` fail with a store-side validation error.
    pub async fn reject_writes_with(&self, details: FieldErrors) {
        *self.rejected_fields.lock().await = Some(details);
    }

    /// Makes every subsequent `find_all` fail.
    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    /// Number of `disconnect` calls that actually closed the store.
    pub fn disconnects(&self) -> u32 {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.reports.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.reports.lock().await.is_empty()
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    fn connection_state(&self) -> ConnectionState {
        self.monitor.get()
    }

    async fn create(&self, report: NewReport) -> Result<Report, DbError> {
        if !self.monitor.get().is_connected() {
            return Err(DbError::NotConnected);
        }
        if let Some(details) = self.rejected_fields.lock().await.clone() {
            return Err(DbError::ValidationError(details));
        }
        let stored = report.into_report(ObjectId::new().to_hex(), Utc::now());
        self.reports.lock().await.push(stored.clone());
        Ok(stored)
    }

    async fn find_all(&self) -> Result<Vec<Report>, DbError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DbError::MalformedDocument("simulated read failure".to_string()));
        }
        if !self.monitor.get().is_connected() {
            return Err(DbError::NotConnected);
        }
        Ok(self.reports.lock().await.clone())
    }

    async fn disconnect(&self) -> Result<(), DbError> {
        match self.monitor.get() {
            ConnectionState::Disconnected | ConnectionState::Disconnecting => Ok(()),
            _ => {
                self.monitor.set(ConnectionState::Disconnecting);
                self.monitor.set(ConnectionState::Disconnected);
                self.disconnects.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_report() -> NewReport {
        NewReport {
            full_name: "A".to_string(),
            order_id: 1234,
            issue: "broken".to_string(),
            report_problem: None,
        }
    }

    #[tokio::test]
    async fn create_assigns_identity_and_timestamp() {
        let store = InMemoryReportStore::new();
        let before = Utc::now();
        let stored = store.create(new_report()).await.unwrap();
        assert!(!stored.id.is_empty());
        assert!(stored.created_at >= before);
        assert_eq!(store.find_all().await.unwrap(), vec![stored]);
    }

    #[tokio::test]
    async fn disconnect_twice_is_not_an_error() {
        let store = InMemoryReportStore::new();
        store.disconnect().await.unwrap();
        store.disconnect().await.unwrap();
        assert_eq!(store.disconnects(), 1);
        assert_eq!(store.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn writes_fail_once_disconnected() {
        let store = InMemoryReportStore::new();
        store.disconnect().await.unwrap();
        assert!(matches!(
            store.create(new_report()).await,
            Err(DbError::NotConnected)
        ));
    }
}
