//! HTTP payload types.
//!
//! Older clients use `ticketId`, `created_at` and a `tickets` list key. Those
//! names are produced and accepted here only; the store and service use the
//! canonical shape.

use crate::types::{Ticket, TicketFilter, TicketPage, TicketUpdate, TrackView};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Query string carrying a ticket id (`?id=`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

impl IdQuery {
    /// The id, if present and not blank.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }
}

/// Query string for the ticket listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub department: String,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ListQuery {
    pub fn into_filter(self) -> TicketFilter {
        TicketFilter::new()
            .query(self.q)
            .status(self.status)
            .department(self.department)
            .with_page_params(self.page.as_deref(), self.limit.as_deref())
    }
}

/// Body of `POST /update-ticket`: `{id, updates: {...}}`, or the older flat
/// `{id, status, ...}` form.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    pub id: String,
    pub update: TicketUpdate,
}

impl UpdateRequest {
    pub fn from_value(mut body: Value) -> Result<Self, String> {
        let id = match body.get("id").or_else(|| body.get("ticketId")) {
            Some(Value::String(id)) if !id.trim().is_empty() => id.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err("Missing ticket ID".to_string()),
        };

        let nested = body
            .get_mut("updates")
            .filter(|updates| updates.is_object())
            .map(Value::take);
        let fields = nested.unwrap_or(body);
        let update = serde_json::from_value::<TicketUpdate>(fields)
            .map_err(|e| format!("Invalid updates: {}", e))?;

        Ok(Self { id, update })
    }
}

/// A ticket with its legacy aliases alongside the canonical fields.
#[derive(Debug, Clone, Serialize)]
pub struct TicketBody {
    #[serde(flatten)]
    pub ticket: Ticket,
    #[serde(rename = "ticketId")]
    pub ticket_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Ticket> for TicketBody {
    fn from(ticket: Ticket) -> Self {
        Self {
            ticket_id: ticket.id.clone(),
            created_at: ticket.created_at,
            updated_at: ticket.updated_at,
            ticket,
        }
    }
}

/// Response to `GET /`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

/// Response to `POST /submit-ticket`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    pub id: String,
    pub ticket_id: String,
    pub created_at: DateTime<Utc>,
    pub message: &'static str,
}

impl From<&Ticket> for SubmitResponse {
    fn from(ticket: &Ticket) -> Self {
        Self {
            success: true,
            id: ticket.id.clone(),
            ticket_id: ticket.id.clone(),
            created_at: ticket.created_at,
            message: "Ticket submitted successfully!",
        }
    }
}

/// Response to `GET /track`.
#[derive(Debug, Clone, Serialize)]
pub struct TrackResponse {
    pub success: bool,
    pub ticket: TrackView,
}

/// Response carrying one full ticket.
#[derive(Debug, Clone, Serialize)]
pub struct TicketResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub ticket: TicketBody,
}

/// Response to `GET /tickets`.
#[derive(Debug, Clone, Serialize)]
pub struct ListResponse {
    pub success: bool,
    pub items: Vec<TicketBody>,
    /// Same records as `items`, under the older key.
    pub tickets: Vec<TicketBody>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

impl From<TicketPage> for ListResponse {
    fn from(page: TicketPage) -> Self {
        let items: Vec<TicketBody> = page.items.into_iter().map(TicketBody::from).collect();
        Self {
            success: true,
            tickets: items.clone(),
            items,
            total: page.total,
            page: page.page,
            limit: page.limit,
        }
    }
}

/// Plain acknowledgement or failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
