//! Command-line front end
//! Opens a shared snippet link in the terminal and exposes the like, copy and
//! open-in-editor actions as subcommands.

pub mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use snipshare::SharedSnippetApp;
use snipshare::config::Config;
use snipshare::gateway::{HttpGateway, InMemoryGateway, SnippetGatewayRef};
use snipshare::handlers::clipboard::SystemClipboard;
use snipshare::models::{EngagementLedger, FileLedgerStorage, SharedSnippet, SnippetLanguage};

#[derive(Debug, Parser)]
#[command(name = "snipshare", version, about = "View and like shared code snippets")]
pub struct Cli {
    /// Config file (defaults to <config_dir>/snipshare/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Use a built-in demo store instead of the remote one
    #[arg(long, global = true)]
    pub offline: bool,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Display a shared snippet
    #[command(alias = "view")]
    Show { link: String },
    /// Like a shared snippet (once per machine)
    Like { link: String },
    /// Copy a shared snippet's code to the clipboard
    Copy { link: String },
    /// Print the editor route for a shared snippet
    Open { link: String },
    /// List snippets liked from this machine
    Liked,
}

/// Runs a parsed command. Returns `false` when the command could not do what
/// was asked (unavailable snippet, failed like, ...).
pub async fn execute_cli(cli: Cli, config: Config) -> Result<bool> {
    let storage = match &config.ledger.path {
        Some(path) => FileLedgerStorage::at(path)?,
        None => FileLedgerStorage::new()?,
    };
    let ledger = EngagementLedger::new(Arc::new(storage));

    let app = |offline: bool| -> Result<SharedSnippetApp> {
        let gateway: SnippetGatewayRef = if offline {
            Arc::new(demo_gateway())
        } else {
            Arc::new(HttpGateway::new(&config.gateway)?)
        };
        Ok(SharedSnippetApp::new(
            gateway,
            ledger.clone(),
            Arc::new(SystemClipboard),
            &config.ui,
        ))
    };

    let ok = match cli.command {
        Command::Liked => commands::list_liked(&ledger)?,
        Command::Show { link } => {
            commands::show_snippet(app(cli.offline)?, &link, &config.ui.theme).await
        }
        Command::Like { link } => commands::like_snippet(app(cli.offline)?, &link).await,
        Command::Copy { link } => commands::copy_snippet(app(cli.offline)?, &link).await,
        Command::Open { link } => commands::open_in_editor(app(cli.offline)?, &link).await,
    };

    Ok(ok)
}

const DEMO_CODE: &str = "\
fn fib(n: u64) -> u64 {
    let (mut a, mut b) = (0, 1);
    for _ in 0..n {
        (a, b) = (b, a + b);
    }
    a
}
";

/// Store with a single public snippet under the link `demo`.
fn demo_gateway() -> InMemoryGateway {
    let gateway = InMemoryGateway::new();
    let created = chrono::Utc::now() - chrono::Duration::days(3);
    gateway.insert(&SharedSnippet {
        id: "demo-snippet".to_string(),
        shareable_link: "demo".to_string(),
        title: "Fibonacci".to_string(),
        description: Some("Iterative Fibonacci numbers".to_string()),
        code: DEMO_CODE.to_string(),
        language: SnippetLanguage::Rust,
        is_public: true,
        created_at: created,
        updated_at: created,
        views: 41,
        likes: 7,
        creator_username: Some("snipshare".to_string()),
        creator_name: Some("Snipshare Demo".to_string()),
        creator_photo_url: None,
        user_id: None,
    });
    gateway
}
