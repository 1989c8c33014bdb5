//! Shared test infrastructure for helpdesk integration tests.
//!
//! Provides TestEnv helper for consistent test setup/teardown.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use helpdesk::{DeliveryError, FileStore, NewTicket, Notifier, Ticket, TicketService, TicketStore};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Notifier that keeps every message it is asked to deliver.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, text: &str) -> Result<(), DeliveryError> {
        self.messages.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Notifier whose channel is always down.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _text: &str) -> Result<(), DeliveryError> {
        Err(DeliveryError::Api {
            status: 502,
            message: "bad gateway".to_string(),
        })
    }
}

/// Test environment with automatic cleanup.
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub store: Arc<FileStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub service: TicketService,
}

impl TestEnv {
    /// Create a new test environment with an empty file store.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            FileStore::open(&temp_dir.path().join("tickets.json")).expect("Failed to open store"),
        );
        let notifier = Arc::new(RecordingNotifier::default());
        let service = TicketService::new(store.clone(), notifier.clone());
        Self {
            temp_dir,
            store,
            notifier,
            service,
        }
    }

    /// Path of the store document.
    pub fn store_path(&self) -> PathBuf {
        self.temp_dir.path().join("tickets.json")
    }

    /// Build a ticket record directly, bypassing the service.
    pub fn ticket(id: &str, name: &str, department: &str, issue: &str) -> Ticket {
        let now = Utc::now();
        Ticket {
            id: id.to_string(),
            name: name.to_string(),
            department: department.to_string(),
            urgency: "Low".to_string(),
            issue: issue.to_string(),
            status: "open".to_string(),
            notes: vec![],
            assign_to: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Insert a ticket straight into the store.
    pub fn insert(&self, id: &str, department: &str) -> Ticket {
        self.store
            .create(Self::ticket(id, "Alice", department, "Printer broken"))
            .expect("Failed to create ticket")
    }

    /// Submit a ticket through the service.
    pub async fn submit(&self, name: &str, department: &str, issue: &str) -> Ticket {
        self.service
            .submit(NewTicket::new(name, department, "Low", issue))
            .await
            .expect("Failed to submit ticket")
    }

    /// Wait for background notifications, then return what was sent.
    pub async fn sent_messages(&self) -> Vec<String> {
        self.service.flush_notifications().await;
        self.notifier.messages()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// True if `id` looks like `TOM-<digits>-<5 uppercase base36 chars>`.
pub fn is_ticket_id(id: &str) -> bool {
    let mut parts = id.split('-');
    let (Some("TOM"), Some(millis), Some(token), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    !millis.is_empty()
        && millis.chars().all(|c| c.is_ascii_digit())
        && token.len() == 5
        && token.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
}
