//! scan-agent CLI
//!
//! Runs one scan task, or inspects tasks and configuration.

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use scan_agent::cli;
use scan_agent::config::{Settings, SettingsLoader, DEFAULT_SETTINGS_FILE};
use scan_agent::TaskStatus;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "scan-agent")]
#[command(about = "Run a code-repository security scan through an LLM agent", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Settings file
    #[arg(long, env = "SCAN_AGENT_CONFIG", default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,

    /// Database URL, overrides the settings file
    #[arg(long, env = "SCAN_DATABASE_URL")]
    database_url: Option<String>,

    /// Environment variable holding the encryption key, overrides the settings file
    #[arg(long, env = "ENCRYPTION_KEY_NAME")]
    encryption_key_name: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan one task (default)
    Run {
        /// Task to scan
        #[arg(long, env = "TITVO_SCAN_TASK_ID")]
        task_id: Option<String>,
    },

    /// Task management commands
    #[command(subcommand)]
    Task(TaskCommands),

    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum TaskCommands {
    /// Create a pending task
    Create {
        /// Source: github, bitbucket, cli
        #[arg(short, long, default_value = "cli")]
        source: String,
        /// Task argument as key=value (repeatable)
        #[arg(short, long = "arg")]
        args: Vec<String>,
        /// Correlation id passed through unchanged
        #[arg(long)]
        hint_id: Option<String>,
    },
    /// Show task details
    Show {
        /// Task ID
        id: String,
    },
    /// List recent tasks
    List {
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Store a configuration value
    Set {
        name: String,
        value: String,
        /// Encrypt the value before storing
        #[arg(long)]
        secret: bool,
    },
    /// Read a configuration value
    Get {
        name: String,
        /// Read an encrypted value
        #[arg(long)]
        secret: bool,
    },
}

async fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = SettingsLoader::new(&cli.config)
        .load()
        .await
        .with_context(|| format!("Failed to load settings from {}", cli.config.display()))?;

    if let Some(url) = &cli.database_url {
        settings.database.url = url.clone();
    }
    if let Some(name) = &cli.encryption_key_name {
        settings.secrets.encryption_key_name = name.clone();
    }
    Ok(settings)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli).await?;
    scan_agent::logging::init(&settings.logging.level, &settings.logging.format)?;

    match cli.command {
        None => run(&settings, std::env::var("TITVO_SCAN_TASK_ID").ok()).await,
        Some(Commands::Run { task_id }) => run(&settings, task_id).await,
        Some(Commands::Task(command)) => {
            let db = cli::open_database(&settings).await?;
            match command {
                TaskCommands::Create {
                    source,
                    args,
                    hint_id,
                } => {
                    cli::task::handle_create(db, &source, &args, hint_id).await?;
                }
                TaskCommands::Show { id } => {
                    cli::task::handle_show(db, &id).await?;
                }
                TaskCommands::List { limit } => cli::task::handle_list(db, limit).await?,
            }
            Ok(())
        }
        Some(Commands::Config(command)) => {
            let db = cli::open_database(&settings).await?;
            let provider = cli::configuration_provider(&settings, db);
            match command {
                ConfigCommands::Set {
                    name,
                    value,
                    secret,
                } => cli::config::handle_set(&provider, &name, &value, secret).await?,
                ConfigCommands::Get { name, secret } => {
                    cli::config::handle_get(&provider, &name, secret).await?
                }
            }
            Ok(())
        }
    }
}

async fn run(settings: &Settings, task_id: Option<String>) -> anyhow::Result<()> {
    let task = cli::run::handle_run(settings, task_id)
        .await
        .context("Scan could not be carried out")?;

    println!(
        "Task {}: {} ({} files scanned)",
        task.id,
        cli::task::colorize_status(task.status),
        task.scaned_files
    );

    if task.status == TaskStatus::Error {
        eprintln!("{}", "Scan ended in ERROR, see logs for the cause".red());
        std::process::exit(1);
    }
    Ok(())
}
