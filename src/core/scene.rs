use crate::error::{AppError, Result};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Axis-aligned bounding box in ENU world coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Aabb {
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Self { min, max }
    }

    /// An inverted box that expands to the first point added to it
    pub fn empty() -> Self {
        Self {
            min: [f64::INFINITY; 3],
            max: [f64::NEG_INFINITY; 3],
        }
    }

    pub fn is_valid(&self) -> bool {
        (0..3).all(|i| self.min[i] <= self.max[i])
    }

    pub fn expand(&mut self, point: &Vector3<f64>) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(point[i]);
            self.max[i] = self.max[i].max(point[i]);
        }
    }

    /// Overlap test used to prefilter tiles against a photo's frustum bounds
    pub fn intersects(&self, other: &Aabb) -> bool {
        (0..3).all(|i| self.min[i] <= other.max[i] && self.max[i] >= other.min[i])
    }

    /// Clip the segment `origin..end` against the box (slab method).
    ///
    /// Returns the world-space distance from `origin` to the entry point, or
    /// `None` when the segment misses the box entirely. An origin inside the
    /// box yields distance 0.
    pub fn entry_distance(&self, origin: &Vector3<f64>, end: &Vector3<f64>) -> Option<f64> {
        let direction = end - origin;
        let mut t_min: f64 = 0.0;
        let mut t_max: f64 = 1.0;

        for i in 0..3 {
            if direction[i].abs() < f64::EPSILON {
                if origin[i] < self.min[i] || origin[i] > self.max[i] {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / direction[i];
            let mut t0 = (self.min[i] - origin[i]) * inv;
            let mut t1 = (self.max[i] - origin[i]) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }

            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }

        Some(t_min * direction.norm())
    }
}

/// A named mesh tile reduced to its bounding box. The name doubles as the
/// coverage CSV column header and the destination folder name during sorting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileBounds {
    pub name: String,
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl TileBounds {
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.min, self.max)
    }
}

/// The set of tiles a survey block was reconstructed into
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileLayout {
    pub tiles: Vec<TileBounds>,
}

impl TileLayout {
    /// Load a tile layout manifest from a JSON file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|_| AppError::FileNotFound {
                path: path.display().to_string(),
            })?;

        let layout: Self = serde_json::from_str(&content)?;
        layout.validate()?;

        Ok(layout)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tiles.is_empty() {
            return Err(AppError::ProcessingError {
                message: "tile layout contains no tiles".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for tile in &self.tiles {
            if tile.name.is_empty() {
                return Err(AppError::ProcessingError {
                    message: "tile layout contains a tile with an empty name".to_string(),
                });
            }
            if !seen.insert(tile.name.as_str()) {
                return Err(AppError::ProcessingError {
                    message: format!("duplicate tile name in layout: {}", tile.name),
                });
            }
            if !tile.bounds().is_valid() {
                return Err(AppError::ProcessingError {
                    message: format!("tile {} has inverted bounds", tile.name),
                });
            }
        }

        Ok(())
    }

    pub fn tile_names(&self) -> Vec<String> {
        self.tiles.iter().map(|t| t.name.clone()).collect()
    }

    /// Highest tile top (ENU z) across the layout.
    ///
    /// Cameras flying more than a configured margin above this are treated as
    /// transit shots and skipped during coverage mapping.
    pub fn height_threshold(&self) -> f64 {
        self.tiles
            .iter()
            .map(|t| t.max[2])
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Bounds of the whole layout
    pub fn total_bounds(&self) -> Aabb {
        let mut total = Aabb::empty();
        for tile in &self.tiles {
            total.expand(&Vector3::from(tile.min));
            total.expand(&Vector3::from(tile.max));
        }
        total
    }
}
