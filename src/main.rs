//! Helpdesk CLI - run the ticket server or work on the store directly.

use clap::Parser;
use colored::*;
use eyre::{Context, Result, bail};
use helpdesk::config::{ServerConfig, default_data_file, resolve_bind};
use helpdesk::{NewTicket, NoteInput, TelegramConfig, Ticket, TicketFilter, TicketService, TicketUpdate, seed};
use log::info;
use std::fs;
use std::path::PathBuf;

mod cli;

use cli::{Cli, Command};

fn setup_logging(to_stderr: bool) -> Result<()> {
    if to_stderr {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        return Ok(());
    }

    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("helpdesk")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("helpdesk.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn server_config(cli: &Cli) -> ServerConfig {
    let data_file = cli.data.clone().unwrap_or_else(default_data_file);
    ServerConfig::new(data_file).telegram(TelegramConfig::from_parts(
        cli.telegram_token.clone(),
        cli.telegram_chat.clone(),
    ))
}

fn format_status(status: &str) -> ColoredString {
    match status.to_lowercase().as_str() {
        "open" => status.green(),
        "in_progress" | "in progress" | "pending" => status.yellow(),
        "resolved" | "closed" => status.blue(),
        _ => status.normal(),
    }
}

fn print_ticket(ticket: &Ticket) {
    println!("{}: {}", "ID".bold(), ticket.id.cyan());
    println!("{}: {}", "Name".bold(), ticket.name);
    println!("{}: {}", "Department".bold(), ticket.department);
    println!("{}: {}", "Urgency".bold(), ticket.urgency);
    println!("{}: {}", "Status".bold(), format_status(ticket.effective_status()));
    if let Some(assignee) = &ticket.assign_to {
        println!("{}: {}", "Assigned To".bold(), assignee);
    }
    println!("{}: {}", "Issue".bold(), ticket.issue);
    println!("{}: {}", "Created".bold(), ticket.created_at);
    println!("{}: {}", "Updated".bold(), ticket.updated_at);
    if !ticket.notes.is_empty() {
        println!("{}:", "Notes".bold());
        for note in &ticket.notes {
            println!(
                "  {} {} {}",
                note.when.format("%Y-%m-%d %H:%M").to_string().dimmed(),
                note.by.cyan(),
                note.text
            );
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = server_config(&cli);

    match cli.command {
        Command::Serve {
            bind,
            port,
            admin_secret,
        } => {
            config = config.bind(resolve_bind(bind, port)).admin_secret(admin_secret);
            println!("{} Serving {} on {}", "→".blue(), config.data_file.display(), config.bind);
            helpdesk::serve(config).await.context("Server error")?;
        }

        Command::Submit {
            name,
            department,
            urgency,
            issue,
        } => {
            let service = TicketService::from_config(&config)?;
            let ticket = service
                .submit(NewTicket::new(name, department, urgency, issue))
                .await
                .context("Failed to submit ticket")?;
            service.flush_notifications().await;

            println!("{} Created: {} {}", "✓".green(), ticket.id.cyan(), ticket.issue);
        }

        Command::List {
            query,
            status,
            department,
            page,
            limit,
        } => {
            let service = TicketService::from_config(&config)?;
            let filter = TicketFilter::new()
                .query(query.unwrap_or_default())
                .status(status.unwrap_or_default())
                .department(department.unwrap_or_default())
                .page(page)
                .limit(limit);

            let page = service.list(filter).await.context("Failed to list tickets")?;

            if page.items.is_empty() {
                println!("{}", "No tickets found".dimmed());
            } else {
                for ticket in &page.items {
                    let assignee = ticket
                        .assign_to
                        .as_ref()
                        .map(|a| format!(" @{}", a))
                        .unwrap_or_default();
                    println!(
                        "{} {} [{}] {} {}{}",
                        format_status(ticket.effective_status()),
                        ticket.id.cyan(),
                        ticket.department,
                        ticket.urgency,
                        ticket.name,
                        assignee.dimmed()
                    );
                }
                println!(
                    "{}",
                    format!(
                        "page {} · {} of {} ticket(s)",
                        page.page,
                        page.items.len(),
                        page.total
                    )
                    .dimmed()
                );
            }
        }

        Command::Get { id } => {
            let service = TicketService::from_config(&config)?;
            let ticket = service.get_full(&id).await.context("Failed to get ticket")?;
            print_ticket(&ticket);
        }

        Command::Track { id } => {
            let service = TicketService::from_config(&config)?;
            let view = service.track(&id).await.context("Failed to track ticket")?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }

        Command::Update {
            id,
            status,
            assign,
            note,
            by,
        } => {
            let update = TicketUpdate {
                status,
                assign_to: assign,
                notes: note
                    .into_iter()
                    .map(|text| NoteInput::Entry {
                        text,
                        by: by.clone(),
                        when: None,
                    })
                    .collect(),
            };
            if update.is_empty() {
                bail!("Nothing to update: pass --status, --assign or --note");
            }

            let service = TicketService::from_config(&config)?;
            let ticket = service
                .apply_update(&id, update)
                .await
                .context("Failed to update ticket")?;
            service.flush_notifications().await;

            println!(
                "{} Updated: {} {}",
                "✓".green(),
                ticket.id.cyan(),
                format_status(ticket.effective_status())
            );
        }

        Command::Delete { id } => {
            let service = TicketService::from_config(&config)?;
            let ticket = service.delete(&id).await.context("Failed to delete ticket")?;
            println!("{} Deleted: {}", "✓".green(), ticket.id.cyan());
        }

        Command::Seed { force } => {
            if !force {
                bail!("Seeding replaces every ticket in {}; pass --force", config.data_file.display());
            }
            let service = TicketService::from_config(&config)?;
            let count = seed::seed(service.store().as_ref())?;
            println!("{} Seeded {} sample ticket(s)", "✓".green(), count);
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(matches!(cli.command, Command::Serve { .. })).context("Failed to setup logging")?;
    // Never log argv: it can carry --admin-secret and --telegram-token.
    info!("helpdesk {} starting", env!("CARGO_PKG_VERSION"));

    let rt = tokio::runtime::Runtime::new().context("Failed to create runtime")?;
    if let Err(e) = rt.block_on(run(cli)) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
