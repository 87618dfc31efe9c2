use clap::Parser;
use pathwarden::Settings;
use pathwarden::cli::commands::{init, watch};
use pathwarden::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let config = loaded.unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        eprintln!("Using default configuration.");
        Settings::default()
    });

    pathwarden::logging::init_with_config(&config.logging);

    match cli.command {
        Commands::Init { force } => init::run_init(force),
        Commands::Config => init::run_config(&config),
        Commands::Watch { path, mode, json } => watch::run_watch(path, mode, json, &config).await,
        Commands::Run { json } => watch::run_all(json, &config).await,
    }
}
