use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use sessionlog::config::{self, LogConfig};
use sessionlog::logging::{LogLevel, Logger};

#[derive(Parser)]
#[command(name = "sessionlog", version, about = "Inspect and write session log files")]
struct Cli {
    /// Config file (defaults to ~/.sessionlog/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the log base directory
    #[arg(long, global = true)]
    dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List log files, newest first
    List,
    /// Print a log file
    Read { name: String },
    /// Print the active session file
    Active,
    /// Delete a log file
    Delete { name: String },
    /// Delete every log file except the active one
    Prune,
    /// Run the retention sweep now
    Cleanup,
    /// End the current session (an empty active file is removed)
    Reset,
    /// Append an entry to the session log
    Log {
        /// debug, info, warn, or error
        level: LogLevel,
        message: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sessionlog=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(config::config_file_path);
    let mut log_config = LogConfig::load_from(&config_path)?;
    if let Some(dir) = cli.dir {
        log_config.log_directory_base = Some(dir);
    }
    tracing::debug!(config = %config_path.display(), "Loaded configuration");

    let logger = Logger::new(&log_config);
    let files = logger.files();

    match cli.command {
        Commands::List => {
            for name in files.list_files().await {
                let marker = if files.active_file_name().as_deref() == Some(name.as_str()) {
                    " (active)"
                } else {
                    ""
                };
                println!("{}{}", name, marker);
            }
        }
        Commands::Read { name } => match files.read_file(&name).await {
            Some(content) => print!("{}", content),
            None => bail!("No readable log file named {}", name),
        },
        Commands::Active => match files.read_active_session_file().await {
            Some(content) => print!("{}", content),
            None => bail!("No active session file"),
        },
        Commands::Delete { name } => {
            if !files.delete_file(&name).await {
                bail!("Could not delete {}", name);
            }
        }
        Commands::Prune => {
            if !files.delete_all_except_active().await {
                bail!("Some log files could not be deleted");
            }
        }
        Commands::Cleanup => match files.cleanup_now().await {
            Some(count) => println!("Deleted {} log file(s)", count),
            None => bail!("File logging is unavailable"),
        },
        Commands::Reset => files.reset_session().await,
        Commands::Log { level, message } => {
            logger
                .log(level, message.into_iter().map(Into::into).collect())
                .await;
        }
    }

    logger.await_background_work().await;
    Ok(())
}
