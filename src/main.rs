use clap::{Parser, Subcommand};
use photomapper::cli::{CliApp, CliCommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "photomapper")]
#[command(about = "Maps survey photos onto mesh tiles and sorts them by coverage", long_about = None)]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sort photos into per-tile folders from a coverage CSV
    Sort {
        /// Coverage CSV with "Photo Index" and " Image Path" columns
        csv: PathBuf,
    },

    /// Compute per-tile coverage percentages and write a coverage CSV
    Coverage {
        /// Photo block manifest (JSON)
        block: PathBuf,

        /// Tile layout manifest (JSON)
        #[arg(short, long)]
        tiles: PathBuf,

        /// Destination for the coverage CSV
        #[arg(short, long)]
        output: PathBuf,

        /// Restrict mapping to the photo indices listed in this file
        #[arg(long)]
        only_indices: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let app = match CliApp::new(cli.config) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Failed to initialize: {}", e);
            std::process::exit(1);
        }
    };

    let command = match cli.command {
        Commands::Sort { csv } => CliCommand::Sort { csv },
        Commands::Coverage {
            block,
            tiles,
            output,
            only_indices,
        } => CliCommand::Coverage {
            block,
            tiles,
            output,
            only_indices,
        },
    };

    if let Err(e) = app.execute(command).await {
        eprintln!("Command failed: {}", e);
        std::process::exit(1);
    }
}
