use clap::{Parser, Subcommand};
use hotboard_core::types::RankingKind;

mod commands;
use commands::{
    handle_cache_command, handle_config_command, handle_top_command, utils::print_error,
    CacheCommands, ConfigCommands, TopOptions,
};

#[derive(Parser)]
#[command(name = "hotboard-cli")]
#[command(about = "Hotboard CLI - maintenance client for the gallery ranking service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank cache maintenance through the admin API
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Print the current gallery ranking
    Top {
        /// Public API base URL
        #[arg(long, default_value = "http://127.0.0.1:3030", env = "HOTBOARD_URL")]
        url: String,

        /// Number of rows
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Ranking to show (hot or most_voted)
        #[arg(short, long, default_value = "hot")]
        ranking: RankingKind,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Cache(command) => handle_cache_command(command).await,
        Commands::Config(command) => handle_config_command(command).await,
        Commands::Top { url, limit, ranking } => {
            handle_top_command(TopOptions { url, limit, ranking }).await
        }
    };

    if let Err(e) = result {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}
