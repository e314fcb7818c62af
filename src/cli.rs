use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::{Config, ConfigError, load_config};
use crate::model::Category;
use crate::parse::parse_document;
use crate::server::{Daemon, ServerError};
use crate::store::{StoreError, TaskStore};
use crate::title::{HttpFetcher, TitleResolver};

#[derive(Parser)]
#[command(
    name = "gtdd",
    about = concat!("gtdd v", env!("CARGO_PKG_VERSION"), " - your tasks are plain text"),
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to the config file (default: ./gtdd.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the listen port
    #[arg(long)]
    pub port: Option<u16>,

    /// Override the tasks file path
    #[arg(long = "tasks-file")]
    pub tasks_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP daemon (the default)
    Serve,
    /// Parse the tasks file and report what it contains
    Check,
    /// Erase all tasks, leaving the four empty sections
    Clear,
}

/// Error type for CLI dispatch
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Server(#[from] ServerError),
}

pub fn dispatch(cli: Cli) -> Result<(), CliError> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(file) = cli.tasks_file {
        config.tasks.file = file;
    }

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => cmd_serve(config),
        Commands::Check => cmd_check(config),
        Commands::Clear => cmd_clear(config),
    }
}

fn cmd_serve(config: Config) -> Result<(), CliError> {
    let resolver = TitleResolver::new(Box::new(HttpFetcher::new(
        config.title.fetch_timeout(),
        config.title.user_agent.clone(),
    )));
    let store = Arc::new(TaskStore::new(config.tasks.file.clone(), resolver));
    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let daemon = Daemon::bind(&addr, store)?;
    log::info!(
        "listening on {} (tasks file: {})",
        addr,
        config.tasks.file.display()
    );
    println!("GTD task API available at http://{}/api/gtd/tasks", addr);
    daemon.run();
    Ok(())
}

fn cmd_check(config: Config) -> Result<(), CliError> {
    // offline resolver: a check should not hit the network
    let store = TaskStore::new(config.tasks.file.clone(), TitleResolver::offline());
    let text = store.read_markdown()?;
    let (doc, dropped) = parse_document(&text, &TitleResolver::offline());

    for category in Category::ALL {
        let tasks = doc.tasks(category);
        let done = tasks.iter().filter(|t| t.completed).count();
        println!(
            "{:<14} {} task(s), {} done",
            category.heading(),
            tasks.len(),
            done
        );
    }
    if dropped.is_empty() {
        println!("No unparsable lines.");
    } else {
        println!("{} unparsable line(s) would be dropped:", dropped.len());
        for line in &dropped {
            println!("  {}", line);
        }
    }
    Ok(())
}

fn cmd_clear(config: Config) -> Result<(), CliError> {
    let store = TaskStore::new(config.tasks.file.clone(), TitleResolver::offline());
    store.clear()?;
    println!("Tasks cleared.");
    Ok(())
}
