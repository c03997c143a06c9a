pub mod camera;
pub mod coverage;
pub mod scene;
pub mod sorter;

#[cfg(test)]
mod sorter_tests;

pub use camera::{Camera, CameraPose, Distortion, PhotoBlock, PhotoInfo};
pub use coverage::{CoverageMapper, CoverageSummary, PhotoRecord, TileCoverage};
pub use scene::{Aabb, TileBounds, TileLayout};
pub use sorter::{
    load_photo_indices, SortOutcome, SortSummary, TileSorter, TileSummary,
    IMAGE_PATH_COLUMN, PHOTO_INDEX_COLUMN,
};
