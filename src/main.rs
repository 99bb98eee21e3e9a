mod api;
mod app;
mod catalog;
mod commands;
mod config;
mod errors;
mod logging;
mod modal;
mod orchestrator;
mod output;
mod parse;
mod persona;
mod store;
mod tui;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::app::Runtime;
use crate::commands::catalog::CatalogCommand;
use crate::commands::chat::ChatArgs;
use crate::commands::config::ConfigCommand;
use crate::commands::history::HistoryCommand;
use crate::commands::routine::RoutineArgs;
use crate::commands::selection::SelectionCommand;
use crate::commands::tui::TuiArgs;
use crate::errors::CliError;
use crate::output::{OutputMode, print_error};

#[derive(Debug, Parser)]
#[command(
    name = "glowguide",
    version,
    about = "Browse a skincare catalog, pick products and chat with an advisor about a routine."
)]
struct Cli {
    #[arg(long, global = true)]
    profile: Option<String>,
    /// Chat proxy endpoint (overrides GLOWGUIDE_PROXY_URL and the profile)
    #[arg(long = "proxy-url", global = true)]
    proxy_url: Option<String>,
    /// Catalog file path or http(s) URL
    #[arg(long, global = true)]
    catalog: Option<String>,
    /// Where selections, the conversation and the log live
    #[arg(long = "data-dir", global = true)]
    data_dir: Option<PathBuf>,
    /// glow, derm, minimal or luxe
    #[arg(long, global = true)]
    persona: Option<String>,
    #[arg(long, global = true)]
    json: bool,
    #[arg(long, global = true)]
    quiet: bool,
    #[arg(long, global = true, default_value_t = 60_000)]
    timeout: u64,
    #[arg(long, global = true)]
    verbose: bool,
    #[arg(long, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Interactive screen (default)
    Tui(TuiArgs),
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },
    Selection {
        #[command(subcommand)]
        command: SelectionCommand,
    },
    /// Send one message to the advisor
    Chat(ChatArgs),
    /// Ask the advisor for a routine built from the selected products
    Routine(RoutineArgs),
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let output = OutputMode {
        json: cli.json,
        quiet: cli.quiet,
        verbose: cli.verbose,
        debug: cli.debug,
    };

    let result = run(cli, output.clone()).await;
    if let Err(err) = result {
        print_error(&err, &output);
        std::process::exit(err.exit_code());
    }
}

async fn run(cli: Cli, output: OutputMode) -> Result<(), CliError> {
    let config_path = config::config_path()?;
    let config = config::load_config(&config_path)?;

    let mut runtime = Runtime {
        output,
        config,
        config_path,
        profile_override: cli.profile,
        proxy_url_override: cli.proxy_url,
        catalog_override: cli.catalog,
        data_dir_override: cli.data_dir,
        persona_override: cli.persona,
        timeout_ms: cli.timeout,
    };

    let command = cli
        .command
        .unwrap_or(Commands::Tui(TuiArgs { category: None }));
    match &command {
        Commands::Tui(_) => logging::init_file(&runtime.data_dir()?, runtime.output.debug)?,
        _ => logging::init_stderr(runtime.output.verbose, runtime.output.debug),
    }

    match command {
        Commands::Tui(args) => commands::tui::handle(&runtime, args).await,
        Commands::Catalog { command } => commands::catalog::handle(&runtime, command).await,
        Commands::Selection { command } => commands::selection::handle(&runtime, command).await,
        Commands::Chat(args) => commands::chat::handle(&runtime, args).await,
        Commands::Routine(args) => commands::routine::handle(&runtime, args).await,
        Commands::History { command } => commands::history::handle(&runtime, command).await,
        Commands::Config { command } => commands::config::handle(&mut runtime, command).await,
    }
}
