//! `busline`: build the travel-data vector store and ask it questions.
//!
//! # Commands
//!
//! - `build`: chunk `data/`, embed, and replace the persisted store
//! - `ask <question>`: answer one question
//! - `search <query> -k N`: print raw hits as JSON lines
//! - `chunks`: print the chunk texts a build would embed
//! - `chat`: interactive loop

use std::process::ExitCode;

use clap::Parser;

mod cli;
mod commands;
mod telemetry;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    telemetry::init_telemetry(cli.log_format);

    let result = match &cli.command {
        Commands::Build { data_dir } => commands::build(&cli.store, data_dir).await,
        Commands::Ask { question } => commands::ask(&cli.store, &question.join(" ")).await,
        Commands::Search { query, k } => commands::search(&cli.store, &query.join(" "), *k).await,
        Commands::Chunks { data_dir } => commands::chunks(data_dir),
        Commands::Chat => commands::chat(&cli.store).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
