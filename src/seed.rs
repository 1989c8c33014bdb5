//! Sample data for demos and local testing.

use crate::store::TicketStore;
use crate::types::Ticket;
use chrono::{DateTime, Utc};
use eyre::{Context, Result};

/// Two fixed tickets covering distinct departments and statuses.
pub fn sample_tickets(now: DateTime<Utc>) -> Vec<Ticket> {
    let ticket = |id: &str, name: &str, department: &str, urgency: &str, issue: &str, status: &str| Ticket {
        id: id.to_string(),
        name: name.to_string(),
        department: department.to_string(),
        urgency: urgency.to_string(),
        issue: issue.to_string(),
        status: status.to_string(),
        notes: Vec::new(),
        assign_to: None,
        created_at: now,
        updated_at: now,
    };

    vec![
        ticket(
            "TOM-TEST-1",
            "Alice",
            "HR",
            "Low",
            "Printer not working on 3rd floor",
            "open",
        ),
        ticket(
            "TOM-TEST-2",
            "Bob",
            "Finance",
            "High",
            "Cannot access accounting app",
            "in_progress",
        ),
    ]
}

/// Replace the store's contents with the sample tickets.
pub fn seed(store: &dyn TicketStore) -> Result<usize> {
    let tickets = sample_tickets(Utc::now());
    let count = tickets.len();
    store.replace_all(tickets).context("Failed to seed tickets")?;
    Ok(count)
}
