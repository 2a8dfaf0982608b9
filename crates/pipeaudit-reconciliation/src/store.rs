//! Event store gateway.
//!
//! The reconciliation engine only reads events through [`EventStore`]. Two
//! backends ship with the crate: [`PgEventStore`] over the
//! `pipeline_audit_events` table and [`InMemoryEventStore`] for tests and
//! embedded use.

use chrono::{DateTime, Duration, Utc};
use pipeaudit_core::{CorrelationId, EventId};
use pipeaudit_db::{AuditEvent, DbError, EventFilter, EventStatus, NewAuditEvent};
use sqlx::PgPool;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

/// Gateway failure. Propagated unchanged to engine callers.
#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("Event store database error: {0}")]
    Database(#[from] DbError),

    #[error("Event store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only storage of audit events with the queries reconciliation needs.
///
/// `find_*` results come back in arrival order.
#[async_trait::async_trait]
pub trait EventStore: Send + Sync {
    async fn insert(&self, event: NewAuditEvent) -> Result<AuditEvent, EventStoreError>;

    async fn find_by_correlation_id(
        &self,
        correlation_id: &CorrelationId,
    ) -> Result<Vec<AuditEvent>, EventStoreError>;

    /// Events with `event_timestamp` in `[start, end]`; a missing bound is open.
    async fn find_by_time_range(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        filter: &EventFilter,
    ) -> Result<Vec<AuditEvent>, EventStoreError>;

    async fn count_by_correlation_id_and_status(
        &self,
        correlation_id: &CorrelationId,
        status: EventStatus,
    ) -> Result<i64, EventStoreError>;
}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl EventStore for PgEventStore {
    async fn insert(&self, event: NewAuditEvent) -> Result<AuditEvent, EventStoreError> {
        Ok(AuditEvent::insert(&self.pool, &event)
            .await
            .map_err(DbError::from)?)
    }

    async fn find_by_correlation_id(
        &self,
        correlation_id: &CorrelationId,
    ) -> Result<Vec<AuditEvent>, EventStoreError> {
        Ok(AuditEvent::find_by_correlation_id(&self.pool, correlation_id)
            .await
            .map_err(DbError::from)?)
    }

    async fn find_by_time_range(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        filter: &EventFilter,
    ) -> Result<Vec<AuditEvent>, EventStoreError> {
        Ok(AuditEvent::find_by_time_range(&self.pool, start, end, filter)
            .await
            .map_err(DbError::from)?)
    }

    async fn count_by_correlation_id_and_status(
        &self,
        correlation_id: &CorrelationId,
        status: EventStatus,
    ) -> Result<i64, EventStoreError> {
        Ok(
            AuditEvent::count_by_correlation_id_and_status(&self.pool, correlation_id, status)
                .await
                .map_err(DbError::from)?,
        )
    }
}

/// In-memory store. Keeps events in arrival order.
pub struct InMemoryEventStore {
    events: RwLock<Vec<AuditEvent>>,
    unavailable: AtomicBool,
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Seeds the store with already-materialized events, kept in the given
    /// order.
    pub fn with_events(events: impl IntoIterator<Item = AuditEvent>) -> Self {
        Self {
            events: RwLock::new(events.into_iter().collect()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// While set, every operation fails with [`EventStoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }

    fn check_available(&self) -> Result<(), EventStoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(EventStoreError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl EventStore for InMemoryEventStore {
    async fn insert(&self, event: NewAuditEvent) -> Result<AuditEvent, EventStoreError> {
        self.check_available()?;

        let mut events = self.events.write().await;
        // Arrival times are strictly increasing so arrival order survives a
        // sort on created_at.
        let now = Utc::now();
        let created_at = match events.last() {
            Some(last) if last.created_at >= now => last.created_at + Duration::microseconds(1),
            _ => now,
        };
        let stored = event.into_event(EventId::new(), created_at);

        debug!(
            event_id = %stored.id,
            correlation_id = %stored.correlation_id,
            stage = %stored.checkpoint_stage,
            status = %stored.status,
            "Audit event stored in memory"
        );

        events.push(stored.clone());
        Ok(stored)
    }

    async fn find_by_correlation_id(
        &self,
        correlation_id: &CorrelationId,
    ) -> Result<Vec<AuditEvent>, EventStoreError> {
        self.check_available()?;
        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|e| &e.correlation_id == correlation_id)
            .cloned()
            .collect())
    }

    async fn find_by_time_range(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        filter: &EventFilter,
    ) -> Result<Vec<AuditEvent>, EventStoreError> {
        self.check_available()?;
        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|e| start.is_none_or(|s| e.event_timestamp >= s))
            .filter(|e| end.is_none_or(|t| e.event_timestamp <= t))
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    async fn count_by_correlation_id_and_status(
        &self,
        correlation_id: &CorrelationId,
        status: EventStatus,
    ) -> Result<i64, EventStoreError> {
        self.check_available()?;
        let events = self.events.read().await;
        let count = events
            .iter()
            .filter(|e| &e.correlation_id == correlation_id && e.status == status)
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }
}
