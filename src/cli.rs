/// CLI entry point for coverage mapping and tile sorting
use crate::{
    config::Config,
    core::{load_photo_indices, CoverageMapper, PhotoBlock, TileLayout, TileSorter},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
pub enum CliCommand {
    Sort {
        csv: PathBuf,
    },
    Coverage {
        block: PathBuf,
        tiles: PathBuf,
        output: PathBuf,
        only_indices: Option<PathBuf>,
    },
}

pub struct CliApp {
    config: Arc<parking_lot::RwLock<Config>>,
}

impl CliApp {
    /// Initialize the CLI application with minimal setup
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, Box<dyn std::error::Error>> {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "photomapper=info".into()),
            )
            .init();

        // Load environment variables
        dotenv::dotenv().ok();

        let config = Config::load(config_path.as_deref())?;
        info!(
            "Configuration loaded (threshold {}%, sample step {})",
            config.coverage_threshold, config.sample_step
        );

        Ok(Self {
            config: Arc::new(parking_lot::RwLock::new(config)),
        })
    }

    /// Execute a CLI command
    pub async fn execute(&self, command: CliCommand) -> Result<(), Box<dyn std::error::Error>> {
        match command {
            CliCommand::Sort { csv } => {
                info!("Sorting coverage CSV: {}", csv.display());

                let sorter = TileSorter::new(self.config.clone());
                let summary = sorter.sort(&csv).await?;

                for tile in &summary.tiles {
                    println!(
                        "{} → {} copied, {} skipped, {} failed",
                        tile.tile, tile.copied, tile.skipped, tile.failed
                    );
                }
                println!(
                    "✓ Sorted {} rows into {} ({} copies, {} failures)",
                    summary.rows,
                    summary.images_root,
                    summary.total_copied(),
                    summary.total_failed()
                );
            }

            CliCommand::Coverage {
                block,
                tiles,
                output,
                only_indices,
            } => {
                info!("Computing coverage for block: {}", block.display());

                let only = match only_indices {
                    Some(path) => Some(load_photo_indices(&path).await?),
                    None => None,
                };

                let layout = TileLayout::load(&tiles).await?;
                let block = PhotoBlock::load(&block).await?;

                let mapper = CoverageMapper::new(self.config.clone(), layout);
                let (records, summary) = mapper.map_block(&block, only.as_ref())?;
                mapper.write_csv(&output, &records)?;

                println!(
                    "✓ Mapped {} photos ({} transit, {} filtered, {} rays) to {}",
                    summary.photos_mapped,
                    summary.photos_skipped_altitude,
                    summary.photos_filtered,
                    summary.rays_cast,
                    output.display()
                );
            }
        }

        Ok(())
    }
}
