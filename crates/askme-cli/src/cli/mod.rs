//! CLI entry and dispatch.

use anyhow::{Context, Result};
use askme_core::{config, logging};
use clap::Parser;

mod commands;

#[derive(Parser)]
#[command(name = "askme")]
#[command(version)]
#[command(about = "Ask Gemini questions from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Never speak answers or listen for dictation
    #[arg(long = "no-speech", global = true)]
    no_speech: bool,

    /// Override the model from config
    #[arg(short, long, global = true)]
    model: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Ask a single question and print the answer
    Ask {
        /// The question to send
        #[arg(value_name = "PROMPT", required = true, num_args = 1..)]
        prompt: Vec<String>,
    },
    /// Manage past questions
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// Show or set the color theme
    Theme {
        /// New theme
        #[arg(value_name = "THEME", value_parser = ["dark", "light"])]
        theme: Option<String>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum HistoryCommands {
    /// Lists past questions, most recent first
    List,
    /// Removes every stored question
    Clear,
    /// Asks a past question again
    Ask {
        /// Position in `history list` (1 is the most recent)
        #[arg(value_name = "N")]
        index: usize,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Set a single value, e.g. `askme config set speech.enabled false`
    Set {
        /// Dotted key
        #[arg(value_name = "KEY")]
        key: String,
        #[arg(value_name = "VALUE")]
        value: String,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let Cli {
        command,
        no_speech,
        model,
    } = cli;

    let config = config::Config::load().context("load config")?;
    let _log_guard = logging::init(&config.logging, &config::paths::logs_dir())
        .context("initialize logging")?;
    tracing::info!(command = command_name(command.as_ref()), "askme starting");

    let session = commands::SessionOptions {
        config: &config,
        model_override: model.as_deref(),
        no_speech,
    };

    let Some(command) = command else {
        return commands::chat::run(&session).await;
    };

    match command {
        Commands::Ask { prompt } => commands::ask::run(&session, &prompt.join(" ")).await,
        Commands::History { command } => match command {
            HistoryCommands::List => commands::history::list(),
            HistoryCommands::Clear => commands::history::clear(),
            HistoryCommands::Ask { index } => commands::history::ask(&session, index).await,
        },
        Commands::Theme { theme } => commands::theme::run(theme.as_deref()),
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::Set { key, value } => commands::config::set(&key, &value),
        },
    }
}

fn command_name(command: Option<&Commands>) -> &'static str {
    match command {
        None => "chat",
        Some(Commands::Ask { .. }) => "ask",
        Some(Commands::History { .. }) => "history",
        Some(Commands::Theme { .. }) => "theme",
        Some(Commands::Config { .. }) => "config",
    }
}
