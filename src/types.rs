//! Core data types for helpdesk tickets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Status given to every new ticket, and assumed when a record has none.
pub const DEFAULT_STATUS: &str = "open";

/// Author recorded on notes that don't name one.
pub const DEFAULT_NOTE_AUTHOR: &str = "admin";

/// Default page size for listings.
pub const DEFAULT_PAGE_LIMIT: usize = 50;

/// Number of characters of the issue shown on the public tracking view.
pub const ISSUE_PREVIEW_CHARS: usize = 400;

/// A support request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Unique identifier: "TOM-" + unix millis + "-" + 5 base36 chars
    pub id: String,

    /// Who filed the ticket
    pub name: String,

    /// Requesting department
    pub department: String,

    /// Free-form urgency label ("Low", "High", ...)
    pub urgency: String,

    /// Problem description
    pub issue: String,

    /// Lifecycle status, free-form ("open", "in_progress", "resolved", ...)
    #[serde(default = "default_status")]
    pub status: String,

    /// Staff notes, oldest first. Append-only.
    #[serde(default)]
    pub notes: Vec<Note>,

    /// Staff member the ticket is assigned to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assign_to: Option<String>,

    /// When created
    pub created_at: DateTime<Utc>,

    /// Last modification
    pub updated_at: DateTime<Utc>,
}

fn default_status() -> String {
    DEFAULT_STATUS.to_string()
}

impl Ticket {
    /// Status used for filtering; a blank status counts as open.
    pub fn effective_status(&self) -> &str {
        let status = self.status.trim();
        if status.is_empty() { DEFAULT_STATUS } else { status }
    }

    /// Validate the fields the store relies on.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        for (field, value) in [
            ("name", &self.name),
            ("department", &self.department),
            ("urgency", &self.urgency),
            ("issue", &self.issue),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField(field));
            }
        }
        if self.updated_at < self.created_at {
            return Err(ValidationError::InvalidTimestamp);
        }
        Ok(())
    }

    /// The public-safe projection of this ticket.
    pub fn track_view(&self) -> TrackView {
        TrackView {
            id: self.id.clone(),
            status: self.effective_status().to_string(),
            department: self.department.clone(),
            urgency: self.urgency.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            issue_preview: preview(&self.issue, ISSUE_PREVIEW_CHARS),
        }
    }
}

/// Truncate on a char boundary, marking the cut with an ellipsis.
fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

/// A staff note attached to a ticket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub text: String,
    pub by: String,
    pub when: DateTime<Utc>,
}

/// A note as supplied by a caller: bare text or a partial note.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum NoteInput {
    Text(String),
    Entry {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        by: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        when: Option<DateTime<Utc>>,
    },
}

impl NoteInput {
    /// Fill in the author and timestamp defaults.
    pub fn into_note(self, now: DateTime<Utc>) -> Note {
        match self {
            NoteInput::Text(text) => Note {
                text,
                by: DEFAULT_NOTE_AUTHOR.to_string(),
                when: now,
            },
            NoteInput::Entry { text, by, when } => Note {
                text,
                by: by
                    .filter(|b| !b.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_NOTE_AUTHOR.to_string()),
                when: when.unwrap_or(now),
            },
        }
    }
}

impl From<&str> for NoteInput {
    fn from(text: &str) -> Self {
        NoteInput::Text(text.to_string())
    }
}

/// The fields a caller may change on an existing ticket.
///
/// Anything else in an update payload is dropped when deserializing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TicketUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Empty string clears the assignment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assign_to: Option<String>,

    /// Notes to append; accepts a single note or a list.
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<NoteInput>,
}

impl TicketUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn assign_to(mut self, assignee: impl Into<String>) -> Self {
        self.assign_to = Some(assignee.into());
        self
    }

    pub fn note(mut self, note: impl Into<NoteInput>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// True if applying this update would only bump `updatedAt`.
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.assign_to.is_none() && self.notes.is_empty()
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<NoteInput>, D::Error>
where
    D: Deserializer<'de>,
{
    // Many is tried first: a short array of strings could otherwise be read
    // as the positional form of a single Entry.
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<NoteInput>),
        One(NoteInput),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::Many(notes)) => notes,
        Some(OneOrMany::One(note)) => vec![note],
        None => Vec::new(),
    })
}

/// Input for filing a ticket.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewTicket {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub urgency: String,
    #[serde(default)]
    pub issue: String,
}

impl NewTicket {
    pub fn new(
        name: impl Into<String>,
        department: impl Into<String>,
        urgency: impl Into<String>,
        issue: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            department: department.into(),
            urgency: urgency.into(),
            issue: issue.into(),
        }
    }

    /// Check that every required field is present, in declaration order.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("name", &self.name),
            ("department", &self.department),
            ("urgency", &self.urgency),
            ("issue", &self.issue),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField(field));
            }
        }
        Ok(())
    }
}

/// Listing filter. Empty strings match everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketFilter {
    /// Case-insensitive substring over id, name and issue
    pub query: String,
    /// Case-insensitive exact status
    pub status: String,
    /// Case-insensitive exact department
    pub department: String,
    /// 1-based page number
    pub page: usize,
    /// Page size
    pub limit: usize,
}

impl Default for TicketFilter {
    fn default() -> Self {
        Self {
            query: String::new(),
            status: String::new(),
            department: String::new(),
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl TicketFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn department(mut self, department: impl Into<String>) -> Self {
        self.department = department.into();
        self
    }

    /// Set the page; non-positive values become 1.
    pub fn page(mut self, page: i64) -> Self {
        self.page = floor_to_one(page);
        self
    }

    /// Set the page size; non-positive values become 1.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = floor_to_one(limit);
        self
    }

    /// Apply raw `page`/`limit` parameters as they arrive in a query string.
    ///
    /// Absent parameters keep the defaults; anything that is not a positive
    /// integer becomes 1.
    pub fn with_page_params(mut self, page: Option<&str>, limit: Option<&str>) -> Self {
        if let Some(raw) = page {
            self.page = parse_positive(raw);
        }
        if let Some(raw) = limit {
            self.limit = parse_positive(raw);
        }
        self
    }

    /// Offset of the first item on the requested page.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    /// Apply the query, status and department filters, in that order.
    pub fn matches(&self, ticket: &Ticket) -> bool {
        let query = self.query.trim().to_lowercase();
        if !query.is_empty()
            && ![&ticket.id, &ticket.name, &ticket.issue]
                .iter()
                .any(|field| field.to_lowercase().contains(&query))
        {
            return false;
        }

        let status = self.status.trim();
        if !status.is_empty() && !same_ignoring_case(ticket.effective_status(), status) {
            return false;
        }

        let department = self.department.trim();
        if !department.is_empty() && !same_ignoring_case(ticket.department.trim(), department) {
            return false;
        }

        true
    }
}

/// Unicode case-insensitive equality.
fn same_ignoring_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn floor_to_one(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0).max(1)
}

fn parse_positive(raw: &str) -> usize {
    raw.trim().parse::<i64>().map(floor_to_one).unwrap_or(1)
}

/// One page of a filtered listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TicketPage {
    pub items: Vec<Ticket>,
    /// Matches before paging
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

/// What an anonymous caller may see about a ticket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackView {
    pub id: String,
    pub status: String,
    pub department: String,
    pub urgency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub issue_preview: String,
}

/// Validation errors for ticket input.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyId,
    MissingField(&'static str),
    InvalidTimestamp,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyId => write!(f, "ticket id cannot be empty"),
            ValidationError::MissingField(field) => write!(f, "{} is required", field),
            ValidationError::InvalidTimestamp => write!(f, "updatedAt cannot be before createdAt"),
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_ticket(id: &str, name: &str, department: &str, issue: &str) -> Ticket {
        let now = Utc::now();
        Ticket {
            id: id.to_string(),
            name: name.to_string(),
            department: department.to_string(),
            urgency: "Low".to_string(),
            issue: issue.to_string(),
            status: DEFAULT_STATUS.to_string(),
            notes: vec![],
            assign_to: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_ticket_validation_valid() {
        let ticket = make_ticket("TOM-1-ABCDE", "Alice", "HR", "Printer broken");
        assert!(ticket.validate().is_ok());
    }

    #[test]
    fn test_ticket_validation_blank_id() {
        let ticket = make_ticket("   ", "Alice", "HR", "Printer broken");
        assert_eq!(ticket.validate(), Err(ValidationError::EmptyId));
    }

    #[test]
    fn test_ticket_validation_missing_field() {
        let ticket = make_ticket("TOM-1-ABCDE", "Alice", "", "Printer broken");
        assert_eq!(ticket.validate(), Err(ValidationError::MissingField("department")));
    }

    #[test]
    fn test_new_ticket_reports_first_missing_field() {
        let input = NewTicket::new("Alice", "HR", " ", "");
        assert_eq!(input.validate(), Err(ValidationError::MissingField("urgency")));
    }

    #[test]
    fn test_missing_status_defaults_to_open() {
        let json = r#"{
            "id": "TOM-LEGACY",
            "name": "Bob",
            "department": "Finance",
            "urgency": "High",
            "issue": "No access",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        }"#;
        let ticket: Ticket = serde_json::from_str(json).unwrap();
        assert_eq!(ticket.status, "open");
        assert!(ticket.notes.is_empty());
        assert_eq!(ticket.assign_to, None);
    }

    #[test]
    fn test_ticket_serializes_camel_case() {
        let mut ticket = make_ticket("TOM-1-ABCDE", "Alice", "HR", "Printer broken");
        ticket.assign_to = Some("sam".to_string());
        let value = serde_json::to_value(&ticket).unwrap();
        assert!(value.get("createdAt").is_some());
        assert!(value.get("updatedAt").is_some());
        assert_eq!(value["assignTo"], "sam");
    }

    #[test]
    fn test_update_accepts_single_string_note() {
        let update: TicketUpdate = serde_json::from_str(r#"{"notes": "called user"}"#).unwrap();
        assert_eq!(update.notes, vec![NoteInput::Text("called user".to_string())]);
    }

    #[test]
    fn test_update_accepts_single_object_note() {
        let update: TicketUpdate =
            serde_json::from_str(r#"{"notes": {"text": "replaced toner", "by": "sam"}}"#).unwrap();
        assert_eq!(
            update.notes,
            vec![NoteInput::Entry {
                text: "replaced toner".to_string(),
                by: Some("sam".to_string()),
                when: None,
            }]
        );
    }

    #[test]
    fn test_update_accepts_mixed_note_list() {
        let update: TicketUpdate = serde_json::from_str(
            r#"{"notes": ["first", {"text": "second"}, "2024-01-01T00:00:00Z"]}"#,
        )
        .unwrap();
        assert_eq!(update.notes.len(), 3);
        assert_eq!(update.notes[0], NoteInput::Text("first".to_string()));
        assert_eq!(update.notes[2], NoteInput::Text("2024-01-01T00:00:00Z".to_string()));
    }

    #[test]
    fn test_update_ignores_fields_outside_allow_list() {
        let update: TicketUpdate =
            serde_json::from_str(r#"{"name": "x", "createdAt": "2020-01-01T00:00:00Z", "notes": null}"#)
                .unwrap();
        assert!(update.is_empty());
    }

    #[test]
    fn test_note_defaults() {
        let now = Utc::now();
        let note = NoteInput::from("hello").into_note(now);
        assert_eq!(note.by, "admin");
        assert_eq!(note.when, now);

        let note = NoteInput::Entry {
            text: "hi".to_string(),
            by: Some("  ".to_string()),
            when: None,
        }
        .into_note(now);
        assert_eq!(note.by, "admin");
    }

    #[test]
    fn test_filter_matching() {
        let ticket = make_ticket("TOM-1-ABCDE", "Alice", "HR", "Printer broken");

        assert!(TicketFilter::new().matches(&ticket));
        assert!(TicketFilter::new().query("PRINTER").matches(&ticket));
        assert!(TicketFilter::new().query("abcde").matches(&ticket));
        assert!(TicketFilter::new().query("alice").matches(&ticket));
        assert!(!TicketFilter::new().query("laptop").matches(&ticket));
        assert!(TicketFilter::new().status("OPEN").matches(&ticket));
        assert!(!TicketFilter::new().status("resolved").matches(&ticket));
        assert!(TicketFilter::new().department("hr").matches(&ticket));
        assert!(!TicketFilter::new().department("h").matches(&ticket));
    }

    #[test]
    fn test_filter_folds_non_ascii_case() {
        let mut ticket = make_ticket("TOM-1-ABCDE", "Ärger", "ФИНАНСЫ", "Drucker kaputt");
        ticket.status = "RÉSOLU".to_string();

        assert!(TicketFilter::new().department("финансы").matches(&ticket));
        assert!(TicketFilter::new().status("résolu").matches(&ticket));
        assert!(TicketFilter::new().query("ärger").matches(&ticket));
        assert!(!TicketFilter::new().department("финанс").matches(&ticket));
    }

    #[test]
    fn test_filter_blank_status_counts_as_open() {
        let mut ticket = make_ticket("TOM-1-ABCDE", "Alice", "HR", "Printer broken");
        ticket.status = String::new();
        assert!(TicketFilter::new().status("open").matches(&ticket));
    }

    #[test]
    fn test_page_params() {
        let filter = TicketFilter::new();
        assert_eq!((filter.page, filter.limit), (1, 50));

        let filter = TicketFilter::new().with_page_params(Some("3"), Some("20"));
        assert_eq!((filter.page, filter.limit), (3, 20));
        assert_eq!(filter.offset(), 40);

        let filter = TicketFilter::new().with_page_params(Some("0"), Some("abc"));
        assert_eq!((filter.page, filter.limit), (1, 1));

        let filter = TicketFilter::new().page(-4).limit(0);
        assert_eq!((filter.page, filter.limit), (1, 1));
    }

    #[test]
    fn test_track_view_truncates_issue() {
        let long_issue = "é".repeat(ISSUE_PREVIEW_CHARS + 10);
        let ticket = make_ticket("TOM-1-ABCDE", "Alice", "HR", &long_issue);
        let view = ticket.track_view();
        assert_eq!(view.issue_preview.chars().count(), ISSUE_PREVIEW_CHARS + 1);
        assert!(view.issue_preview.ends_with('…'));

        let short = make_ticket("TOM-1-ABCDE", "Alice", "HR", "short");
        assert_eq!(short.track_view().issue_preview, "short");
    }
}
