// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! recall main entry point - CLI and interactive review.

use std::io;
use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;

use recall::cli::{self, render, PromptOptions, Terminal};
use recall::config::{self, CliOptions, ResolvedConfig};
use recall::error::RecordKind;
use recall::session::SessionService;
use recall::telemetry::{init_telemetry, TelemetryConfig, GLOBAL_METRICS};
use recall::types::Card;
use recall::ReviewError;

/// recall version string.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// recall - spaced-repetition flashcards in the terminal.
#[derive(Parser)]
#[command(name = "recall")]
#[command(author, version, about = "Spaced-repetition flashcards in the terminal", long_about = None)]
struct Cli {
    /// SQLite database to use
    #[arg(short, long, env = "RECALL_DATABASE")]
    database: Option<PathBuf>,

    /// Reviewer whose items are scheduled
    #[arg(short, long, env = "RECALL_REVIEWER")]
    reviewer: Option<String>,

    /// Most items pulled into one review session
    #[arg(short = 'n', long)]
    max_items: Option<usize>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "RECALL_LOG")]
    log_level: Option<String>,

    /// Shorthand for --log-level debug
    #[arg(long)]
    debug: bool,

    /// Print operation metrics on exit
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Subcommands for recall.
#[derive(Subcommand)]
enum Commands {
    /// Review every item that is due
    Review {
        /// Resume a started session instead of opening a new one
        #[arg(long)]
        session: Option<String>,
    },

    /// Manage cards
    Cards {
        #[command(subcommand)]
        action: CardsAction,
    },

    /// Manage the reviewer's scheduled items
    Items {
        #[command(subcommand)]
        action: ItemsAction,
    },

    /// Inspect past review sessions
    Sessions {
        #[command(subcommand)]
        action: SessionsAction,
    },

    /// Show or create configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum CardsAction {
    /// Create a card
    Add {
        front: String,
        back: String,
        #[arg(long)]
        notes: Option<String>,
        /// Also schedule the card for review
        #[arg(short, long)]
        track: bool,
        /// Starting stage when tracked
        #[arg(long)]
        stage: Option<i64>,
    },
    /// List all cards
    List,
    /// Show a card and its schedule
    Show { id: String },
    /// Change a card's text
    Edit {
        id: String,
        #[arg(long)]
        front: Option<String>,
        #[arg(long)]
        back: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Delete a card and every item tracking it
    Delete { id: String },
}

#[derive(Subcommand)]
enum ItemsAction {
    /// Schedule a card for review
    Add {
        card_id: String,
        #[arg(long)]
        stage: Option<i64>,
    },
    /// List items that are due now
    Due {
        #[arg(long)]
        json: bool,
    },
    /// List all items
    List {
        #[arg(long)]
        json: bool,
    },
    /// Stop reviewing an item
    Delete { id: String },
}

#[derive(Subcommand)]
enum SessionsAction {
    /// List review sessions, newest first
    List,
    /// Show the reviews recorded in a session
    Summary {
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Cancel a started session without recording reviews
    Cancel { id: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the resolved configuration
    Show,
    /// Write a starter .recall.json in the current directory
    Init,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        Some("debug".to_string())
    } else {
        cli.log_level
    };
    let cli_options = CliOptions {
        database: cli.database,
        reviewer: cli.reviewer,
        max_items: cli.max_items,
        log_level,
    };

    let command = cli.command.unwrap_or(Commands::Review { session: None });
    if let Commands::Version = command {
        println!("recall {}", VERSION);
        return Ok(());
    }

    let cwd = std::env::current_dir()?;
    let workspace_root = config::find_workspace_root(&cwd).unwrap_or(cwd);

    if let Commands::Config {
        action: Some(ConfigAction::Init),
    } = command
    {
        let path = config::init_config(&workspace_root, None)?;
        println!("Created config file: {}", path.display());
        return Ok(());
    }

    let config = config::load_config(&workspace_root, cli_options)?;
    let _telemetry = init_telemetry(&TelemetryConfig::from_level_name(&config.log_level))?;

    let result = handle_command(command, &config).await;

    if cli.metrics {
        eprintln!("{}", GLOBAL_METRICS.snapshot().format_report());
    }

    if let Err(e) = &result {
        if let Some(review) = e.downcast_ref::<ReviewError>() {
            eprintln!("{} {}", format!("[{}]", review.code()).red(), review);
            std::process::exit(1);
        }
    }
    result
}

async fn handle_command(command: Commands, config: &ResolvedConfig) -> anyhow::Result<()> {
    match command {
        Commands::Config { .. } => {
            println!("{}", serde_json::to_string_pretty(config)?);
            Ok(())
        }
        Commands::Version => Ok(()),
        command => {
            let service = cli::open_service(config)?;
            match command {
                Commands::Review { session } => handle_review(&service, config, session).await,
                Commands::Cards { action } => handle_cards(&service, action).await,
                Commands::Items { action } => handle_items(&service, action).await,
                Commands::Sessions { action } => handle_sessions(&service, action).await,
                Commands::Config { .. } | Commands::Version => Ok(()),
            }
        }
    }
}

async fn handle_review(
    service: &SessionService,
    config: &ResolvedConfig,
    resume: Option<String>,
) -> anyhow::Result<()> {
    let op = recall::timed!("cli.review");

    let (session, mut queue) = match resume {
        Some(needle) => {
            let id = cli::resolve_session(service, &needle).await?;
            let session = service.get_session(&id).await?;
            let queue = service.start_queue(&id).await?;
            (session, queue)
        }
        None => match service.start_due_session(Utc::now()).await? {
            Some(started) => started,
            None => {
                println!("{}", "Nothing is due. Come back later.".cyan());
                return Ok(());
            }
        },
    };
    println!(
        "{} {} items",
        "Reviewing".bright_blue().bold(),
        session.item_ids.len()
    );

    let mut input = Terminal::new()?;
    let options = PromptOptions {
        show_notes: config.show_notes,
    };
    let finished =
        match cli::run_review(service, &mut queue, &mut input, &mut io::stdout(), options).await {
            Ok(finished) => finished,
            Err(e) => {
                let left_open = e
                    .downcast_ref::<ReviewError>()
                    .is_some_and(ReviewError::is_retryable);
                if left_open {
                    eprintln!(
                        "{} recall review --session {}",
                        "Session left open. Resume with:".yellow(),
                        render::short_id(&session.id)
                    );
                }
                return Err(e);
            }
        };
    op.finish();

    if config.show_summary {
        let summary = service.session_summary(&finished.id).await?;
        if !summary.rows.is_empty() {
            println!("\n{}", render::summary_table(&summary));
        }
    }
    Ok(())
}

async fn handle_cards(service: &SessionService, action: CardsAction) -> anyhow::Result<()> {
    let store = service.store();
    let now = service.scheduler().now();

    match action {
        CardsAction::Add {
            front,
            back,
            notes,
            track,
            stage,
        } => {
            let mut card = Card::new(front, back);
            if let Some(notes) = notes {
                card = card.with_notes(notes);
            }
            store.create_card(&card).await?;
            println!("{} {}", "Created".green(), render::card_line(&card));

            if track || stage.is_some() {
                let item = service.add_item(&card.id, stage).await?;
                println!("{}", render::item_line(&item, Some(&card.front), now));
            }
        }
        CardsAction::List => {
            let cards = store.list_cards().await?;
            if cards.is_empty() {
                println!("{}", "No cards yet. Add one with: recall cards add FRONT BACK".dimmed());
            }
            for card in &cards {
                println!("{}", render::card_line(card));
            }
        }
        CardsAction::Show { id } => {
            let id = cli::resolve_card(service, &id).await?;
            let card = store
                .get_card(&id)
                .await?
                .ok_or_else(|| ReviewError::not_found(RecordKind::Card, &id))?;
            let item = store
                .find_item(&service.config().reviewer_id, &card.id)
                .await?;
            print!("{}", render::card_details(&card, item.as_ref(), now));
        }
        CardsAction::Edit {
            id,
            front,
            back,
            notes,
        } => {
            let id = cli::resolve_card(service, &id).await?;
            let mut card = store
                .get_card(&id)
                .await?
                .ok_or_else(|| ReviewError::not_found(RecordKind::Card, &id))?;
            if let Some(front) = front {
                card.front = front;
            }
            if let Some(back) = back {
                card.back = back;
            }
            if let Some(notes) = notes {
                card.notes = (!notes.is_empty()).then_some(notes);
            }
            card.updated_at = now;
            store.update_card(&card).await?;
            println!("{} {}", "Updated".green(), render::card_line(&card));
        }
        CardsAction::Delete { id } => {
            let id = cli::resolve_card(service, &id).await?;
            store.delete_card(&id).await?;
            println!("{} card {}", "Deleted".yellow(), render::short_id(&id));
        }
    }
    Ok(())
}

async fn handle_items(service: &SessionService, action: ItemsAction) -> anyhow::Result<()> {
    let store = service.store();
    let reviewer = &service.config().reviewer_id;
    let now = service.scheduler().now();

    match action {
        ItemsAction::Add { card_id, stage } => {
            let card_id = cli::resolve_card(service, &card_id).await?;
            let item = service.add_item(&card_id, stage).await?;
            let card = store.get_card(&card_id).await?;
            println!(
                "{}",
                render::item_line(&item, card.as_ref().map(|c| c.front.as_str()), now)
            );
        }
        ItemsAction::Due { json } => {
            let items = service.get_due_items(now).await?;
            print_items(service, &items, json).await?;
        }
        ItemsAction::List { json } => {
            let items = store.list_items(reviewer).await?;
            print_items(service, &items, json).await?;
        }
        ItemsAction::Delete { id } => {
            let id = cli::resolve_item(service, &id).await?;
            store.delete_item(&id).await?;
            println!("{} item {}", "Deleted".yellow(), render::short_id(&id));
        }
    }
    Ok(())
}

async fn print_items(
    service: &SessionService,
    items: &[recall::types::Item],
    json: bool,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(items)?);
        return Ok(());
    }
    if items.is_empty() {
        println!("{}", "No items.".dimmed());
        return Ok(());
    }

    let now = service.scheduler().now();
    for item in items {
        let card = service.store().get_card(&item.card_id).await?;
        println!(
            "{}",
            render::item_line(item, card.as_ref().map(|c| c.front.as_str()), now)
        );
    }
    Ok(())
}

async fn handle_sessions(service: &SessionService, action: SessionsAction) -> anyhow::Result<()> {
    match action {
        SessionsAction::List => {
            let sessions = service.list_sessions().await?;
            if sessions.is_empty() {
                println!("{}", "No review sessions yet.".dimmed());
            }
            for session in &sessions {
                println!("{}", render::session_line(session));
            }
        }
        SessionsAction::Summary { id, json } => {
            let id = cli::resolve_session(service, &id).await?;
            let summary = service.session_summary(&id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", render::summary_table(&summary));
            }
        }
        SessionsAction::Cancel { id } => {
            let id = cli::resolve_session(service, &id).await?;
            let session = service.cancel_session(&id, None, &[]).await?;
            println!("{} {}", "Cancelled".yellow(), render::session_line(&session));
        }
    }
    Ok(())
}
