use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Sorting Settings
    pub coverage_threshold: f64,
    pub images_dir_name: String,
    pub index_log_name: String,

    // Coverage Sampling Settings
    pub sample_step: u32,
    pub ray_length: f64,
    pub frustum_near: f64,
    pub frustum_far: f64,
    pub altitude_margin: f64,
    pub coverage_precision: usize,

    // Advanced Settings
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Sorting Settings
            coverage_threshold: 20.0,
            images_dir_name: "images".to_string(),
            index_log_name: "photo_indices.txt".to_string(),

            // Coverage Sampling Settings
            sample_step: 128,
            ray_length: 5.0,
            frustum_near: 0.1,
            frustum_far: 8.0,
            altitude_margin: 30.0,
            coverage_precision: 5,

            // Advanced Settings
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration with environment variable overrides.
    ///
    /// When `path` is given the file must exist and parse; without a path the
    /// defaults carry the upstream pipeline's literals (threshold 20, sample
    /// step 128, ray length 5.0).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content =
                    std::fs::read_to_string(path).map_err(|_| AppError::FileNotFound {
                        path: path.display().to_string(),
                    })?;
                serde_json::from_str(&content)?
            }
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(threshold) = std::env::var("PHOTOMAPPER_THRESHOLD") {
            match threshold.parse::<f64>() {
                Ok(value) => self.coverage_threshold = value,
                Err(e) => {
                    tracing::warn!(
                        "Invalid PHOTOMAPPER_THRESHOLD value '{}': {}. Using default.",
                        threshold,
                        e
                    );
                }
            }
        }
        if let Ok(step) = std::env::var("PHOTOMAPPER_SAMPLE_STEP") {
            match step.parse::<u32>() {
                Ok(value) => self.sample_step = value,
                Err(e) => {
                    tracing::warn!(
                        "Invalid PHOTOMAPPER_SAMPLE_STEP value '{}': {}. Using default.",
                        step,
                        e
                    );
                }
            }
        }
        if let Ok(level) = std::env::var("PHOTOMAPPER_LOG_LEVEL") {
            self.log_level = level;
        }
    }

    /// Validate configuration values before any filesystem work starts
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.coverage_threshold) {
            return Err(AppError::ConfigError {
                message: format!(
                    "coverage_threshold must be a percentage between 0 and 100, got {}",
                    self.coverage_threshold
                ),
            });
        }
        if self.images_dir_name.is_empty() || self.index_log_name.is_empty() {
            return Err(AppError::ConfigError {
                message: "images_dir_name and index_log_name must not be empty".to_string(),
            });
        }
        if self.sample_step == 0 {
            return Err(AppError::ConfigError {
                message: "sample_step must be at least 1 pixel".to_string(),
            });
        }
        if self.ray_length <= 0.0 {
            return Err(AppError::ConfigError {
                message: format!("ray_length must be positive, got {}", self.ray_length),
            });
        }
        if self.frustum_far <= self.frustum_near || self.frustum_near <= 0.0 {
            return Err(AppError::ConfigError {
                message: format!(
                    "frustum planes must satisfy 0 < near < far, got near={} far={}",
                    self.frustum_near, self.frustum_far
                ),
            });
        }
        if self.coverage_precision > 17 {
            return Err(AppError::ConfigError {
                message: format!(
                    "coverage_precision beyond 17 digits is meaningless for f64, got {}",
                    self.coverage_precision
                ),
            });
        }

        Ok(())
    }
}
