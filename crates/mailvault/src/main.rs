//! `mailvault` - command-line browser for Got Your Back mail archives
//!
//! Every command prints pretty JSON on stdout; logs go to stderr.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mailvault_core::{ArchiveConfig, ArchiveService, MessageQuery, SortField, SortOrder};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "mailvault", version, about = "Browse exported mail archives read-only")]
struct Cli {
    /// Configuration file (JSON).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding one sub-directory per account.
    #[arg(long, global = true)]
    accounts_dir: Option<PathBuf>,
    /// Account to open before running the command.
    #[arg(long, global = true)]
    account: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List accounts in the archive.
    Accounts,
    /// Open an account and report it.
    Select { name: String },
    /// List labels of the open account.
    Labels,
    /// List messages carrying a label.
    List {
        label: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        page_size: Option<u32>,
        /// `date`, `from` or `subject`.
        #[arg(long, default_value = "date")]
        sort: String,
        /// `asc` or `desc`.
        #[arg(long, default_value = "desc")]
        order: String,
    },
    /// Show one message with its raw source.
    Show { uid: String },
    /// Save the raw message file.
    Download {
        uid: String,
        /// Destination; defaults to `<uid>.eml` in the current directory.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Show store metadata and per-label counts.
    Info,
    /// Search sender addresses.
    Senders { query: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailvault=info,mailvault_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    debug!("Archive root: {}", config.accounts_dir.display());

    let service = ArchiveService::new(&config);
    if let Some(account) = &cli.account {
        service.select_account(account).await?;
    }

    let outcome = run(&service, cli.command).await;
    service.session().close().await;
    outcome
}

fn load_config(cli: &Cli) -> Result<ArchiveConfig> {
    let config = match &cli.config {
        Some(path) => ArchiveConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => ArchiveConfig::load_or_default(ArchiveConfig::default_path().as_deref())?,
    };
    let mut config = config.with_env()?;
    if let Some(dir) = &cli.accounts_dir {
        config.accounts_dir.clone_from(dir);
    }
    config.validate()?;
    Ok(config)
}

async fn run(service: &ArchiveService, command: Command) -> Result<()> {
    match command {
        Command::Accounts => print_json(&service.list_accounts().await?),
        Command::Select { name } => print_json(&service.select_account(&name).await?),
        Command::Labels => print_json(&service.list_labels().await?),
        Command::List {
            label,
            page,
            page_size,
            sort,
            order,
        } => {
            let query = MessageQuery {
                label,
                page: Some(page),
                page_size,
                sort_field: Some(sort.parse::<SortField>()?),
                sort_order: Some(order.parse::<SortOrder>()?),
            };
            print_json(&service.list_messages(&query).await?)
        }
        Command::Show { uid } => print_json(&service.get_message(&uid).await?),
        Command::Download { uid, output } => {
            let download = service.download_message(&uid).await?;
            let path = output.unwrap_or_else(|| PathBuf::from(&download.filename));
            tokio::fs::write(&path, &download.bytes)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(
                "Saved {} ({}, {} bytes) to {}",
                download.filename,
                download.content_type,
                download.bytes.len(),
                path.display()
            );
            Ok(())
        }
        Command::Info => print_json(&service.system_info().await?),
        Command::Senders { query } => print_json(&service.search_senders(&query).await?),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
