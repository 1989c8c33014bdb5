//! CLI argument parsing for helpdesk.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "helpdesk",
    about = "IT-support ticket service with a JSON file store",
    version,
    after_help = "Logs are written to: ~/.local/share/helpdesk/logs/helpdesk.log (serve logs to stderr)"
)]
pub struct Cli {
    /// Path to the ticket store document (default: data/tickets.json)
    #[arg(short = 'd', long, global = true, env = "HELPDESK_DATA")]
    pub data: Option<PathBuf>,

    /// Telegram bot token for staff notifications
    #[arg(long, global = true, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub telegram_token: Option<String>,

    /// Telegram chat that receives notifications
    #[arg(long, global = true, env = "TELEGRAM_CHAT_ID")]
    pub telegram_chat: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve {
        /// Listen address (default: 0.0.0.0:3000)
        #[arg(short, long, env = "HELPDESK_BIND")]
        bind: Option<SocketAddr>,

        /// Listen port on all interfaces, used when --bind is not given
        #[arg(long, env = "PORT")]
        port: Option<u16>,

        /// Shared secret required by staff routes
        #[arg(long, env = "ADMIN_SECRET", hide_env_values = true)]
        admin_secret: Option<String>,
    },

    /// File a new ticket
    Submit {
        /// Name of the requester
        #[arg(short, long)]
        name: String,

        /// Requesting department
        #[arg(short = 'D', long)]
        department: String,

        /// Urgency (e.g. Low, Medium, High)
        #[arg(short, long, default_value = "Medium")]
        urgency: String,

        /// Problem description
        issue: String,
    },

    /// List tickets
    List {
        /// Case-insensitive text to look for in id, name or issue
        #[arg(short, long)]
        query: Option<String>,

        /// Filter by status
        #[arg(short, long)]
        status: Option<String>,

        /// Filter by department
        #[arg(short = 'D', long)]
        department: Option<String>,

        /// Page number
        #[arg(short, long, default_value = "1", allow_negative_numbers = true)]
        page: i64,

        /// Page size
        #[arg(short, long, default_value = "50", allow_negative_numbers = true)]
        limit: i64,
    },

    /// Show a ticket with its notes
    Get {
        /// Ticket ID
        id: String,
    },

    /// Show the public view of a ticket
    Track {
        /// Ticket ID
        id: String,
    },

    /// Update status, assignee or notes
    Update {
        /// Ticket ID
        id: String,

        /// New status
        #[arg(short, long)]
        status: Option<String>,

        /// Assign to a staff member (empty string clears)
        #[arg(short, long)]
        assign: Option<String>,

        /// Note to append (repeatable)
        #[arg(short, long)]
        note: Vec<String>,

        /// Author recorded on the notes
        #[arg(short, long)]
        by: Option<String>,
    },

    /// Delete a ticket
    Delete {
        /// Ticket ID
        id: String,
    },

    /// Replace all tickets with sample data
    Seed {
        /// Required, since seeding discards existing tickets
        #[arg(long)]
        force: bool,
    },
}
