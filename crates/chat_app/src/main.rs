mod platform;
mod server;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "chat_app", about = "Streaming chat proxy and console client")]
struct Cli {
    /// RON config file (defaults to ./chat.ron when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP proxy and login endpoints.
    Serve,
    /// Run the terminal chat client against a running proxy.
    Console,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = platform::config::load(cli.config.as_deref())?;
    platform::logging::initialize(config.log);

    match cli.command {
        Command::Serve => server::run(&config),
        Command::Console => platform::app::run_console(&config),
    }
}
