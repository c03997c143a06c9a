use crate::config::Config;
use crate::core::camera::{Camera, PhotoBlock};
use crate::core::scene::{TileBounds, TileLayout};
use crate::core::sorter::{IMAGE_PATH_COLUMN, PHOTO_INDEX_COLUMN};
use crate::error::Result;
use chrono::Utc;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Share of a photo's sampled rays whose closest hit landed on one tile
#[derive(Debug, Clone, Serialize)]
pub struct TileCoverage {
    pub tile: String,
    pub percentage: f64,
}

/// One coverage CSV row in the making
#[derive(Debug, Clone, Serialize)]
pub struct PhotoRecord {
    pub index: usize,
    pub image_path: String,
    pub coverage: Vec<TileCoverage>,
}

/// Statistics for one coverage run
#[derive(Debug, Clone, Serialize)]
pub struct CoverageSummary {
    pub photos_mapped: usize,
    pub photos_skipped_altitude: usize,
    pub photos_filtered: usize,
    pub rays_cast: usize,
    pub started_at: i64,
    pub elapsed_ms: u128,
}

/// Maps photos onto tiles by casting sampled pixel rays against tile bounds
pub struct CoverageMapper {
    config: Arc<parking_lot::RwLock<Config>>,
    layout: TileLayout,
}

impl CoverageMapper {
    pub fn new(config: Arc<parking_lot::RwLock<Config>>, layout: TileLayout) -> Self {
        Self { config, layout }
    }

    /// Compute coverage records for every photo in the block, in manifest
    /// order, using each photo's manifest position as its photo index.
    ///
    /// Photos outside `only_indices` (when given) are not mapped; photos
    /// flying higher than the layout's height threshold plus the configured
    /// margin are treated as transit shots and skipped.
    pub fn map_block(
        &self,
        block: &PhotoBlock,
        only_indices: Option<&HashSet<i64>>,
    ) -> Result<(Vec<PhotoRecord>, CoverageSummary)> {
        let started = Instant::now();
        let started_at = Utc::now().timestamp();

        let (sample_step, ray_length, frustum_near, frustum_far, altitude_margin) = {
            let config = self.config.read();
            (
                config.sample_step,
                config.ray_length,
                config.frustum_near,
                config.frustum_far,
                config.altitude_margin,
            )
        };

        let height_threshold = self.layout.height_threshold();
        debug!("Layout height threshold: {:.3}", height_threshold);

        let mut records = Vec::new();
        let mut summary = CoverageSummary {
            photos_mapped: 0,
            photos_skipped_altitude: 0,
            photos_filtered: 0,
            rays_cast: 0,
            started_at,
            elapsed_ms: 0,
        };

        for (index, photo) in block.photos.iter().enumerate() {
            if let Some(only) = only_indices {
                if !only.contains(&(index as i64)) {
                    summary.photos_filtered += 1;
                    continue;
                }
            }

            let camera = Camera::new(photo.clone())?;

            if camera.altitude() > height_threshold + altitude_margin {
                debug!(
                    "Skipping photo {} ({}): altitude {:.2} above threshold {:.2}",
                    index,
                    photo.image_path,
                    camera.altitude(),
                    height_threshold + altitude_margin
                );
                summary.photos_skipped_altitude += 1;
                continue;
            }

            let frustum = camera.frustum_bounds(frustum_near, frustum_far);
            let candidates: Vec<&TileBounds> = self
                .layout
                .tiles
                .iter()
                .filter(|tile| frustum.intersects(&tile.bounds()))
                .collect();

            let rays = camera.pixel_rays(sample_step, ray_length);
            debug!(
                "Calculated {} rays for photo {} ({} candidate tiles)",
                rays.len(),
                photo.image_path,
                candidates.len()
            );
            summary.rays_cast += rays.len();

            let coverage = Self::intersect_rays(&rays, &candidates);
            records.push(PhotoRecord {
                index,
                image_path: photo.image_path.clone(),
                coverage,
            });
            summary.photos_mapped += 1;
        }

        summary.elapsed_ms = started.elapsed().as_millis();
        info!(
            "Mapped {} photos ({} rays) in {} ms",
            summary.photos_mapped, summary.rays_cast, summary.elapsed_ms
        );

        Ok((records, summary))
    }

    /// Closest-hit accounting: each ray credits exactly the candidate tile it
    /// enters first; the percentage is hits over total rays.
    fn intersect_rays(
        rays: &[(nalgebra::Vector3<f64>, nalgebra::Vector3<f64>)],
        candidates: &[&TileBounds],
    ) -> Vec<TileCoverage> {
        let mut hit_counts: HashMap<&str, usize> = candidates
            .iter()
            .map(|tile| (tile.name.as_str(), 0))
            .collect();

        for (origin, end) in rays {
            let mut closest: Option<(&str, f64)> = None;

            for tile in candidates {
                if let Some(distance) = tile.bounds().entry_distance(origin, end) {
                    match closest {
                        Some((_, best)) if distance >= best => {}
                        _ => closest = Some((tile.name.as_str(), distance)),
                    }
                }
            }

            if let Some((name, _)) = closest {
                if let Some(count) = hit_counts.get_mut(name) {
                    *count += 1;
                }
            }
        }

        let total_rays = rays.len().max(1);
        candidates
            .iter()
            .map(|tile| TileCoverage {
                tile: tile.name.clone(),
                percentage: (hit_counts[tile.name.as_str()] as f64 / total_rays as f64) * 100.0,
            })
            .collect()
    }

    /// Write coverage records as the sorter's input CSV.
    ///
    /// Header cells are `Photo Index`, ` Image Path` (the leading space is
    /// part of the downstream column contract), then one column per tile in
    /// layout order. Tiles a photo never became a candidate for render as 0.
    pub fn write_csv(&self, path: &Path, records: &[PhotoRecord]) -> Result<()> {
        let precision = self.config.read().coverage_precision;
        let tile_names = self.layout.tile_names();

        let mut writer = csv::Writer::from_path(path)?;

        let mut header = vec![PHOTO_INDEX_COLUMN.to_string(), IMAGE_PATH_COLUMN.to_string()];
        header.extend(tile_names.iter().cloned());
        writer.write_record(&header)?;

        for record in records {
            let percentages: HashMap<&str, f64> = record
                .coverage
                .iter()
                .map(|c| (c.tile.as_str(), c.percentage))
                .collect();

            let mut row = vec![record.index.to_string(), record.image_path.clone()];
            for name in &tile_names {
                let percentage = percentages.get(name.as_str()).copied().unwrap_or(0.0);
                row.push(format!("{:.*}", precision, percentage));
            }
            writer.write_record(&row)?;
        }

        writer.flush()?;
        info!("Wrote {} coverage rows to {}", records.len(), path.display());

        Ok(())
    }
}
