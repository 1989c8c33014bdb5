//! Helpdesk: an IT-support ticket service.
//!
//! Tickets live in a single JSON document that is rewritten whole on every
//! change. Staff are told about new and updated tickets through a Telegram
//! bot, on a best-effort basis.
//!
//! # Example
//!
//! ```no_run
//! use helpdesk::{FileStore, LogNotifier, NewTicket, TicketService, TicketUpdate};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn demo() -> eyre::Result<()> {
//! let store = FileStore::open(Path::new("data/tickets.json"))?;
//! let service = TicketService::new(Arc::new(store), Arc::new(LogNotifier));
//!
//! // File a ticket
//! let ticket = service
//!     .submit(NewTicket::new("Alice", "HR", "Low", "Printer broken"))
//!     .await?;
//! assert_eq!(ticket.status, "open");
//!
//! // Staff pick it up
//! let ticket = service
//!     .apply_update(&ticket.id, TicketUpdate::new().status("resolved").note("Replaced toner"))
//!     .await?;
//! assert_eq!(ticket.notes.len(), 1);
//!
//! service.flush_notifications().await;
//! # Ok(())
//! # }
//! ```

mod id;
mod storage;
mod store;
mod types;

pub mod api;
pub mod config;
pub mod notify;
pub mod protocol;
pub mod seed;
pub mod service;

// Re-export public API
pub use api::{AppState, router, serve};
pub use config::ServerConfig;
pub use notify::{DeliveryError, LogNotifier, Notifier, TelegramConfig, TelegramNotifier};
pub use service::TicketService;
pub use storage::{Storage, TICKETS_FILE};
pub use store::{FileStore, MemoryStore, StoreError, TicketStore};
pub use types::{
    NewTicket, Note, NoteInput, Ticket, TicketFilter, TicketPage, TicketUpdate, TrackView, ValidationError,
};
