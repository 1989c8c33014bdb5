//! Ticket service: business rules over a [`TicketStore`] plus notifications.
//!
//! Store calls run on the blocking pool. Notifications are spawned as
//! detached tasks after the store write has succeeded: they never delay the
//! caller, are never retried, and failures are only logged. Use
//! [`TicketService::flush_notifications`] to wait for outstanding deliveries
//! (e.g. before a short-lived process exits).

use crate::config::ServerConfig;
use crate::id::generate_id;
use crate::notify::{self, Notifier};
use crate::store::{FileStore, StoreError, TicketStore};
use crate::types::{
    DEFAULT_STATUS, NewTicket, Ticket, TicketFilter, TicketPage, TicketUpdate, TrackView,
};
use chrono::Utc;
use eyre::{Context, Result};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;

/// Attempts at generating a fresh id before giving up.
const ID_ATTEMPTS: usize = 3;

/// Orchestrates store writes and staff notifications.
#[derive(Clone)]
pub struct TicketService {
    store: Arc<dyn TicketStore>,
    notifier: Arc<dyn Notifier>,
    pending: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl TicketService {
    pub fn new(store: Arc<dyn TicketStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            pending: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// File-backed service with the configured notification channel.
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let store = FileStore::open(&config.data_file)
            .with_context(|| format!("Failed to open ticket store {}", config.data_file.display()))?;
        Ok(Self::new(
            Arc::new(store),
            notify::notifier_for(config.telegram.clone()),
        ))
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn TicketStore> {
        &self.store
    }

    /// Run a store call on the blocking pool.
    async fn with_store<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn TicketStore) -> Result<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .context("Store task failed")?
    }

    /// File a new ticket.
    pub async fn submit(&self, input: NewTicket) -> Result<Ticket> {
        input
            .validate()
            .map_err(|e| eyre::eyre!(StoreError::Validation(e)))?;

        let mut attempt = 0;
        let ticket = loop {
            attempt += 1;
            let now = Utc::now();
            let ticket = Ticket {
                id: generate_id(now),
                name: input.name.trim().to_string(),
                department: input.department.trim().to_string(),
                urgency: input.urgency.trim().to_string(),
                issue: input.issue.trim().to_string(),
                status: DEFAULT_STATUS.to_string(),
                notes: Vec::new(),
                assign_to: None,
                created_at: now,
                updated_at: now,
            };

            match self.with_store(move |store| store.create(ticket)).await {
                Ok(ticket) => break ticket,
                Err(e)
                    if attempt < ID_ATTEMPTS
                        && matches!(e.downcast_ref::<StoreError>(), Some(StoreError::DuplicateId(_))) =>
                {
                    log::warn!("Generated id collided ({}), retrying", e);
                }
                Err(e) => return Err(e.wrap_err("Failed to save ticket")),
            }
        };

        self.announce(notify::render_new_ticket(&ticket));
        Ok(ticket)
    }

    /// Public-safe view of a ticket.
    pub async fn track(&self, id: &str) -> Result<TrackView> {
        Ok(self.get_full(id).await?.track_view())
    }

    /// The full record, notes included.
    pub async fn get_full(&self, id: &str) -> Result<Ticket> {
        let key = id.to_string();
        self.with_store(move |store| store.get(&key))
            .await?
            .ok_or_else(|| eyre::eyre!(StoreError::TicketNotFound(id.trim().to_string())))
    }

    /// Filtered, paged listing.
    pub async fn list(&self, filter: TicketFilter) -> Result<TicketPage> {
        self.with_store(move |store| store.list(&filter)).await
    }

    /// Apply a staff update and announce the result.
    pub async fn apply_update(&self, id: &str, update: TicketUpdate) -> Result<Ticket> {
        let key = id.to_string();
        let changes = update.clone();
        let ticket = self
            .with_store(move |store| store.update(&key, &changes))
            .await?;

        self.announce(notify::render_update(&ticket, &update));
        Ok(ticket)
    }

    /// Remove a ticket.
    pub async fn delete(&self, id: &str) -> Result<Ticket> {
        let key = id.to_string();
        self.with_store(move |store| store.delete(&key)).await
    }

    /// Deliver `text` in the background.
    fn announce(&self, text: String) {
        let notifier = Arc::clone(&self.notifier);
        let handle = tokio::spawn(async move {
            if let Err(e) = notifier.notify(&text).await {
                log::warn!("Notification failed: {}", e);
            }
        });

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Wait for every notification spawned so far.
    pub async fn flush_notifications(&self) {
        let handles: Vec<_> = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            pending.drain(..).collect()
        };
        for handle in handles {
            if let Err(e) = handle.await {
                log::warn!("Notification task failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::LogNotifier;
    use crate::store::MemoryStore;

    fn setup_service() -> TicketService {
        TicketService::new(Arc::new(MemoryStore::new()), Arc::new(LogNotifier))
    }

    #[tokio::test]
    async fn test_submit_builds_open_ticket() {
        let service = setup_service();

        let ticket = service
            .submit(NewTicket::new(" Alice ", "HR", "Low", "Printer broken"))
            .await
            .unwrap();

        assert!(ticket.id.starts_with("TOM-"));
        assert_eq!(ticket.name, "Alice");
        assert_eq!(ticket.status, "open");
        assert!(ticket.notes.is_empty());
        assert_eq!(ticket.created_at, ticket.updated_at);
        service.flush_notifications().await;
    }

    #[tokio::test]
    async fn test_submit_rejects_missing_field() {
        let service = setup_service();

        let err = service
            .submit(NewTicket::new("Alice", "HR", "Low", "  "))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "validation error: issue is required");
        assert_eq!(service.list(TicketFilter::new()).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_get_full_missing() {
        let service = setup_service();
        let err = service.get_full("TOM-404").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::TicketNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_flush_with_nothing_pending() {
        setup_service().flush_notifications().await;
    }
}
