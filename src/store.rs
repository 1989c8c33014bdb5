//! Ticket store: create, get, list and merge-update over a ticket collection.
//!
//! [`TicketStore`] is the capability the service depends on. [`FileStore`]
//! keeps the collection in a JSON document and serializes every
//! read-modify-write cycle behind a mutex; [`MemoryStore`] keeps it in memory.

use crate::storage::Storage;
use crate::types::{Ticket, TicketFilter, TicketPage, TicketUpdate, ValidationError};
use chrono::{DateTime, TimeDelta, Utc};
use eyre::{Context, Result};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Errors that can occur during store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Ticket not found.
    TicketNotFound(String),
    /// A ticket with this id already exists.
    DuplicateId(String),
    /// Validation error.
    Validation(ValidationError),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::TicketNotFound(id) => write!(f, "ticket not found: {}", id),
            StoreError::DuplicateId(id) => write!(f, "ticket already exists: {}", id),
            StoreError::Validation(e) => write!(f, "validation error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

/// Persistence capability for tickets.
///
/// Implementations must apply each call atomically with respect to other
/// calls on the same store: a failed call leaves the collection untouched.
pub trait TicketStore: Send + Sync {
    /// Insert a new ticket at the front of the collection.
    fn create(&self, ticket: Ticket) -> Result<Ticket>;

    /// Look a ticket up by id (surrounding whitespace ignored).
    fn get(&self, id: &str) -> Result<Option<Ticket>>;

    /// Filter, then page, the collection.
    fn list(&self, filter: &TicketFilter) -> Result<TicketPage>;

    /// Merge the allow-listed fields of `update` into a ticket.
    fn update(&self, id: &str, update: &TicketUpdate) -> Result<Ticket>;

    /// Remove a ticket, returning it.
    fn delete(&self, id: &str) -> Result<Ticket>;

    /// Replace the whole collection.
    fn replace_all(&self, tickets: Vec<Ticket>) -> Result<()>;
}

/// Ticket store backed by a JSON document on disk.
pub struct FileStore {
    storage: Storage,
    lock: Mutex<()>,
}

impl FileStore {
    /// Open (or initialize) the store document at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let storage = Storage::open(path).context("Failed to open ticket storage")?;
        Ok(Self {
            storage,
            lock: Mutex::new(()),
        })
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        self.storage.path()
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        // The guarded state lives on disk, so a panicked holder leaves nothing
        // half-updated in memory.
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read<T>(&self, f: impl FnOnce(&[Ticket]) -> T) -> Result<T> {
        let _guard = self.guard();
        let tickets = self.storage.load()?;
        Ok(f(&tickets))
    }

    /// Load, apply `f`, and write back only if `f` succeeded.
    fn mutate<T>(&self, f: impl FnOnce(&mut Vec<Ticket>) -> Result<T>) -> Result<T> {
        let _guard = self.guard();
        let mut tickets = self.storage.load()?;
        let out = f(&mut tickets)?;
        self.storage
            .save(&tickets)
            .context("Failed to persist tickets")?;
        Ok(out)
    }
}

impl TicketStore for FileStore {
    fn create(&self, ticket: Ticket) -> Result<Ticket> {
        let created = self.mutate(|tickets| insert(tickets, ticket))?;
        log::info!("Created ticket {}", created.id);
        Ok(created)
    }

    fn get(&self, id: &str) -> Result<Option<Ticket>> {
        self.read(|tickets| find(tickets, id).cloned())
    }

    fn list(&self, filter: &TicketFilter) -> Result<TicketPage> {
        self.read(|tickets| page(tickets, filter))
    }

    fn update(&self, id: &str, update: &TicketUpdate) -> Result<Ticket> {
        let updated = self.mutate(|tickets| merge(tickets, id, update, Utc::now()))?;
        log::info!("Updated ticket {} (status {})", updated.id, updated.status);
        Ok(updated)
    }

    fn delete(&self, id: &str) -> Result<Ticket> {
        let removed = self.mutate(|tickets| remove(tickets, id))?;
        log::info!("Deleted ticket {}", removed.id);
        Ok(removed)
    }

    fn replace_all(&self, tickets: Vec<Ticket>) -> Result<()> {
        let count = tickets.len();
        self.mutate(move |current| {
            *current = tickets;
            Ok(())
        })?;
        log::info!("Replaced ticket collection ({} tickets)", count);
        Ok(())
    }
}

/// Ticket store held in memory; contents are lost on drop.
#[derive(Default)]
pub struct MemoryStore {
    tickets: Mutex<Vec<Ticket>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<Ticket>> {
        self.tickets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Work on a copy so a failed mutation leaves the collection as it was.
    fn mutate<T>(&self, f: impl FnOnce(&mut Vec<Ticket>) -> Result<T>) -> Result<T> {
        let mut guard = self.guard();
        let mut tickets = guard.clone();
        let out = f(&mut tickets)?;
        *guard = tickets;
        Ok(out)
    }
}

impl TicketStore for MemoryStore {
    fn create(&self, ticket: Ticket) -> Result<Ticket> {
        self.mutate(|tickets| insert(tickets, ticket))
    }

    fn get(&self, id: &str) -> Result<Option<Ticket>> {
        Ok(find(&self.guard(), id).cloned())
    }

    fn list(&self, filter: &TicketFilter) -> Result<TicketPage> {
        Ok(page(&self.guard(), filter))
    }

    fn update(&self, id: &str, update: &TicketUpdate) -> Result<Ticket> {
        self.mutate(|tickets| merge(tickets, id, update, Utc::now()))
    }

    fn delete(&self, id: &str) -> Result<Ticket> {
        self.mutate(|tickets| remove(tickets, id))
    }

    fn replace_all(&self, tickets: Vec<Ticket>) -> Result<()> {
        *self.guard() = tickets;
        Ok(())
    }
}

fn find<'a>(tickets: &'a [Ticket], id: &str) -> Option<&'a Ticket> {
    let id = id.trim();
    tickets.iter().find(|t| t.id.trim() == id)
}

fn position(tickets: &[Ticket], id: &str) -> Result<usize> {
    let id = id.trim();
    tickets
        .iter()
        .position(|t| t.id.trim() == id)
        .ok_or_else(|| eyre::eyre!(StoreError::TicketNotFound(id.to_string())))
}

fn insert(tickets: &mut Vec<Ticket>, mut ticket: Ticket) -> Result<Ticket> {
    ticket
        .validate()
        .map_err(|e| eyre::eyre!(StoreError::Validation(e)))?;

    ticket.id = ticket.id.trim().to_string();
    if find(tickets, &ticket.id).is_some() {
        return Err(eyre::eyre!(StoreError::DuplicateId(ticket.id)));
    }

    tickets.insert(0, ticket.clone());
    Ok(ticket)
}

fn page(tickets: &[Ticket], filter: &TicketFilter) -> TicketPage {
    let matching: Vec<&Ticket> = tickets.iter().filter(|t| filter.matches(t)).collect();
    let total = matching.len();
    let items = matching
        .into_iter()
        .skip(filter.offset())
        .take(filter.limit)
        .cloned()
        .collect();

    TicketPage {
        items,
        total,
        page: filter.page,
        limit: filter.limit,
    }
}

fn merge(tickets: &mut [Ticket], id: &str, update: &TicketUpdate, now: DateTime<Utc>) -> Result<Ticket> {
    let index = position(tickets, id)?;
    let ticket = &mut tickets[index];

    if let Some(status) = update.status.as_deref().map(str::trim)
        && !status.is_empty()
    {
        ticket.status = status.to_string();
    }

    if let Some(assignee) = update.assign_to.as_deref().map(str::trim) {
        ticket.assign_to = (!assignee.is_empty()).then(|| assignee.to_string());
    }

    ticket
        .notes
        .extend(update.notes.iter().cloned().map(|note| note.into_note(now)));

    // updatedAt only moves forward, even if the clock does not.
    ticket.updated_at = if now > ticket.updated_at {
        now
    } else {
        ticket.updated_at + TimeDelta::milliseconds(1)
    };

    Ok(ticket.clone())
}

fn remove(tickets: &mut Vec<Ticket>, id: &str) -> Result<Ticket> {
    let index = position(tickets, id)?;
    Ok(tickets.remove(index))
}
