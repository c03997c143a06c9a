use crate::config::Config;
use crate::error::{AppError, Result};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Required coverage CSV columns, matched exactly and case-sensitively.
/// The leading space in the image path column comes from the upstream CSV
/// writer and is part of the format.
pub const PHOTO_INDEX_COLUMN: &str = "Photo Index";
pub const IMAGE_PATH_COLUMN: &str = " Image Path";

/// Why a (row, tile) pair produced no copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    EmptyCell,
    NotNumeric,
    BelowThreshold,
}

/// Outcome of one (row, tile) pair
#[derive(Debug, Clone, PartialEq)]
pub enum SortOutcome {
    Copied { destination: PathBuf },
    Skipped(SkipReason),
    Failed { message: String },
}

/// Per-tile totals for one run
#[derive(Debug, Clone, Serialize)]
pub struct TileSummary {
    pub tile: String,
    pub copied: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Result of one sorting run
#[derive(Debug, Clone, Serialize)]
pub struct SortSummary {
    pub csv_path: String,
    pub images_root: String,
    pub rows: usize,
    pub tiles: Vec<TileSummary>,
    pub started_at: i64,
    pub elapsed_ms: u128,
}

impl SortSummary {
    pub fn total_copied(&self) -> usize {
        self.tiles.iter().map(|t| t.copied).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.tiles.iter().map(|t| t.failed).sum()
    }
}

struct TileState {
    name: String,
    column: usize,
    dir: PathBuf,
    log: fs::File,
    copied: usize,
    skipped: usize,
    failed: usize,
}

/// Sorts photo files into per-tile folders driven by a coverage CSV.
///
/// Every header column after ` Image Path` is a tile; a row's photo is copied
/// into each tile folder whose percentage cell strictly exceeds the
/// configured threshold, and the row's photo index is appended to that tile's
/// index log. Logs are truncated at the start of each run, so they always
/// describe the latest run only.
pub struct TileSorter {
    config: Arc<parking_lot::RwLock<Config>>,
}

impl TileSorter {
    pub fn new(config: Arc<parking_lot::RwLock<Config>>) -> Self {
        Self { config }
    }

    pub async fn sort(&self, csv_path: &Path) -> Result<SortSummary> {
        let started = Instant::now();
        let started_at = Utc::now().timestamp();

        let (threshold, images_dir_name, index_log_name) = {
            let config = self.config.read();
            (
                config.coverage_threshold,
                config.images_dir_name.clone(),
                config.index_log_name.clone(),
            )
        };

        fs::metadata(csv_path)
            .await
            .map_err(|_| AppError::FileNotFound {
                path: csv_path.display().to_string(),
            })?;

        // The output tree is a sibling of the CSV file
        let csv_dir = csv_path.parent().unwrap_or_else(|| Path::new(""));
        let images_root = csv_dir.join(&images_dir_name);
        fs::create_dir_all(&images_root).await?;

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(csv_path)?;
        let headers = reader.headers()?.clone();

        let photo_index_index = Self::find_column(&headers, PHOTO_INDEX_COLUMN)?;
        let image_path_index = Self::find_column(&headers, IMAGE_PATH_COLUMN)?;

        // Tile folders and index logs are set up once, before the row loop;
        // log handles stay open for the whole run.
        let mut tiles = Vec::new();
        for column in (image_path_index + 1)..headers.len() {
            let name = headers[column].to_string();
            let dir = images_root.join(&name);
            fs::create_dir_all(&dir).await?;

            let log = fs::File::create(dir.join(&index_log_name)).await?;
            tiles.push(TileState {
                name,
                column,
                dir,
                log,
                copied: 0,
                skipped: 0,
                failed: 0,
            });
        }

        info!(
            "Sorting {} into {} tile folders under {}",
            csv_path.display(),
            tiles.len(),
            images_root.display()
        );

        let mut rows = 0;
        for (row, result) in reader.records().enumerate() {
            let record = result?;
            rows += 1;

            let image_path = record
                .get(image_path_index)
                .ok_or_else(|| AppError::ProcessingError {
                    message: format!("row {} has no image path cell", row + 1),
                })?
                .to_string();
            let photo_index = record
                .get(photo_index_index)
                .ok_or_else(|| AppError::ProcessingError {
                    message: format!("row {} has no photo index cell", row + 1),
                })?
                .to_string();

            for tile in &mut tiles {
                let outcome = match evaluate_cell(record.get(tile.column), threshold) {
                    Err(reason) => SortOutcome::Skipped(reason),
                    Ok(_) => {
                        Self::copy_into_tile(&image_path, &photo_index, tile).await?
                    }
                };

                match outcome {
                    SortOutcome::Copied { .. } => tile.copied += 1,
                    SortOutcome::Skipped(_) => tile.skipped += 1,
                    SortOutcome::Failed { message } => {
                        tile.failed += 1;
                        warn!(
                            "Copy failed for row {} (photo index {}) into tile {}: {}",
                            row + 1,
                            photo_index,
                            tile.name,
                            message
                        );
                    }
                }
            }
        }

        // Flush and close every index log; dropping the handles closes them
        // on the error paths above as well.
        for tile in &mut tiles {
            tile.log.flush().await?;
        }

        let summary = SortSummary {
            csv_path: csv_path.display().to_string(),
            images_root: images_root.display().to_string(),
            rows,
            tiles: tiles
                .iter()
                .map(|tile| TileSummary {
                    tile: tile.name.clone(),
                    copied: tile.copied,
                    skipped: tile.skipped,
                    failed: tile.failed,
                })
                .collect(),
            started_at,
            elapsed_ms: started.elapsed().as_millis(),
        };

        info!(
            "Sorted {} rows: {} copies, {} failures in {} ms",
            summary.rows,
            summary.total_copied(),
            summary.total_failed(),
            summary.elapsed_ms
        );

        Ok(summary)
    }

    fn find_column(headers: &csv::StringRecord, name: &str) -> Result<usize> {
        headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| AppError::ColumnNotFound {
                name: name.to_string(),
            })
    }

    /// Copy the photo into the tile folder and append its index to the log.
    ///
    /// A failed copy is reported as an outcome and leaves no log line; a
    /// failed log write is an error on our side of the contract and aborts
    /// the run.
    async fn copy_into_tile(
        image_path: &str,
        photo_index: &str,
        tile: &mut TileState,
    ) -> Result<SortOutcome> {
        let basename = match Path::new(image_path).file_name() {
            Some(name) => name,
            None => {
                return Ok(SortOutcome::Failed {
                    message: format!("image path '{}' has no file name", image_path),
                })
            }
        };
        let destination = tile.dir.join(basename);

        if let Err(e) = fs::copy(image_path, &destination).await {
            return Ok(SortOutcome::Failed {
                message: format!("{}: {}", image_path, e),
            });
        }

        println!("Copied {} to {}", image_path, destination.display());

        tile.log
            .write_all(format!("{}\n", photo_index).as_bytes())
            .await?;

        Ok(SortOutcome::Copied { destination })
    }
}

/// Decide what to do with one percentage cell.
///
/// Cells are trimmed before parsing, the way the original runtime's float
/// conversion tolerated surrounding whitespace. The threshold comparison is
/// strict: a cell equal to the threshold does not qualify.
pub(crate) fn evaluate_cell(
    cell: Option<&str>,
    threshold: f64,
) -> std::result::Result<f64, SkipReason> {
    let raw = match cell {
        Some(cell) => cell.trim(),
        None => return Err(SkipReason::EmptyCell),
    };
    if raw.is_empty() {
        return Err(SkipReason::EmptyCell);
    }

    let value: f64 = raw.parse().map_err(|_| SkipReason::NotNumeric)?;
    if value > threshold {
        Ok(value)
    } else {
        Err(SkipReason::BelowThreshold)
    }
}

/// Read a `photo_indices.txt` written by the sorter back into a set.
///
/// Used to restrict a coverage run to the photos previously sorted into one
/// tile.
pub async fn load_photo_indices(path: &Path) -> Result<HashSet<i64>> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|_| AppError::FileNotFound {
            path: path.display().to_string(),
        })?;

    let mut indices = HashSet::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let index: i64 = line.parse().map_err(|_| AppError::ParseError {
            message: format!("invalid photo index {:?} in {}", line, path.display()),
        })?;
        indices.insert(index);
    }

    Ok(indices)
}
