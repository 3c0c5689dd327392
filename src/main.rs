mod config;
mod context;
mod entities;
mod error;
mod knowledge;
mod logging;
mod retriever;
mod server;
mod speech;
mod utils;
mod vector_db;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::AppConfig;
use context::AppState;

/// Answers questions from a fixed question/answer knowledge base
#[derive(Parser, Debug)]
#[command(name = "faqbot", version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Question/answer dataset (.csv or .json)
    #[arg(short, long, global = true)]
    dataset: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Address to bind, e.g. 127.0.0.1:5000
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Answer a single question and print the reply as JSON
    Ask {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Interactive question loop on stdin
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let bind = match &cli.command {
        Commands::Serve { bind } => bind.clone(),
        _ => None,
    };
    let config = AppConfig::load(cli.config.as_deref())?.with_overrides(
        cli.dataset,
        bind,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;
    tracing::debug!(dataset = ?config.dataset, "starting faqbot");

    // The index is built once, before anything is served.
    let state = Arc::new(AppState::from_config(&config)?);

    match cli.command {
        Commands::Serve { .. } => server::serve(state, &config.bind).await?,
        Commands::Ask { query } => {
            let reply = state.answer(&query.join(" "));
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
        Commands::Chat => chat_loop(&state)?,
    }

    Ok(())
}

fn chat_loop(state: &AppState) -> Result<()> {
    println!("Ask a question (type 'quit' or press Ctrl+D to exit)");

    loop {
        let mut query = String::new();
        print!("> ");
        std::io::stdout().flush()?;

        if std::io::stdin().read_line(&mut query)? == 0 {
            break; // EOF (Ctrl+D)
        }

        let query = query.trim();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("quit") {
            break;
        }

        let reply = state.answer(query);
        println!("{}", reply.answer);
        if !reply.entities.is_empty() {
            println!("  entities: {}", reply.entities.join(", "));
        }
    }

    Ok(())
}
