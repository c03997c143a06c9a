use crate::core::scene::Aabb;
use crate::error::{AppError, Result};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Brown-Conrady distortion coefficients carried through from the block
/// metadata. Ray sampling works on the ideal pinhole model and does not apply
/// them, matching the upstream reconstruction export.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Distortion {
    pub k1: f64,
    pub k2: f64,
    pub k3: f64,
    pub p1: f64,
    pub p2: f64,
}

/// World-from-camera rotation (row-major) and camera center in ENU
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraPose {
    pub rotation: [[f64; 3]; 3],
    pub center: [f64; 3],
}

/// Per-photo metadata from the survey block manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoInfo {
    pub image_path: String,
    pub image_width: u32,
    pub image_height: u32,
    pub focal_length_mm: f64,
    pub focal_length_35mm_eq: f64,
    pub principal_point: [f64; 2],
    #[serde(default)]
    pub distortion: Distortion,
    pub pose: CameraPose,
}

/// Root of the photo block manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoBlock {
    pub photos: Vec<PhotoInfo>,
}

impl PhotoBlock {
    /// Load a photo block manifest from a JSON file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|_| AppError::FileNotFound {
                path: path.display().to_string(),
            })?;

        let block: Self = serde_json::from_str(&content)?;
        if block.photos.is_empty() {
            return Err(AppError::ProcessingError {
                message: "photo block contains no photos".to_string(),
            });
        }

        Ok(block)
    }
}

/// Pinhole camera derived from a photo's metadata.
///
/// Sensor size is estimated from the 35mm-equivalent crop factor against a
/// full-frame 36x24mm sensor; the intrinsic parameters and fields of view
/// follow from it. All directions are expressed in ENU world coordinates.
#[derive(Debug, Clone)]
pub struct Camera {
    info: PhotoInfo,
    fx: f64,
    fy: f64,
    cx: f64,
    cy: f64,
    fov_y_deg: f64,
    aspect_ratio: f64,
    rotation: Matrix3<f64>,
    center: Vector3<f64>,
}

impl Camera {
    pub fn new(info: PhotoInfo) -> Result<Self> {
        if info.image_width == 0 || info.image_height == 0 {
            return Err(AppError::ProcessingError {
                message: format!(
                    "photo {} has degenerate dimensions {}x{}",
                    info.image_path, info.image_width, info.image_height
                ),
            });
        }
        if info.focal_length_mm <= 0.0 || info.focal_length_35mm_eq <= 0.0 {
            return Err(AppError::ProcessingError {
                message: format!(
                    "photo {} has a nonpositive focal length",
                    info.image_path
                ),
            });
        }

        let crop_factor = info.focal_length_35mm_eq / info.focal_length_mm;
        let sensor_width_mm = 36.0 / crop_factor;
        let sensor_height_mm = 24.0 / crop_factor;

        let width = f64::from(info.image_width);
        let height = f64::from(info.image_height);

        let fov_y_deg =
            2.0 * ((sensor_height_mm / 2.0) / info.focal_length_mm).atan().to_degrees();
        let aspect_ratio = width / height;

        let fx = info.focal_length_mm * (width / sensor_width_mm);
        let fy = info.focal_length_mm * (height / sensor_height_mm);
        let cx = info.principal_point[0];
        let cy = info.principal_point[1];

        let rotation = Matrix3::from_fn(|r, c| info.pose.rotation[r][c]);
        let center = Vector3::from(info.pose.center);

        Ok(Self {
            info,
            fx,
            fy,
            cx,
            cy,
            fov_y_deg,
            aspect_ratio,
            rotation,
            center,
        })
    }

    pub fn info(&self) -> &PhotoInfo {
        &self.info
    }

    pub fn center(&self) -> Vector3<f64> {
        self.center
    }

    /// ENU height of the camera center
    pub fn altitude(&self) -> f64 {
        self.center[2]
    }

    /// Inverse-intrinsics projection of a pixel onto the z=1 image plane
    fn pixel_to_normalized(&self, x: f64, y: f64) -> Vector3<f64> {
        Vector3::new((x - self.cx) / self.fx, (y - self.cy) / self.fy, 1.0)
    }

    /// Rotate a camera-space direction into ENU world coordinates
    fn to_world(&self, direction: &Vector3<f64>) -> Vector3<f64> {
        self.rotation.transpose() * direction
    }

    /// World-space direction of the ray through pixel (x, y).
    ///
    /// The direction is left unnormalized (z=1 on the image plane before
    /// rotation), so segment lengths grow towards the image edges the same
    /// way the upstream sampler's did.
    pub fn ray_through_pixel(&self, x: f64, y: f64) -> Vector3<f64> {
        self.to_world(&self.pixel_to_normalized(x, y))
    }

    /// Rays through the four image corners
    pub fn corner_rays(&self) -> Vec<Vector3<f64>> {
        let width = f64::from(self.info.image_width);
        let height = f64::from(self.info.image_height);
        let corners = [
            (0.0, 0.0),
            (width - 1.0, 0.0),
            (0.0, height - 1.0),
            (width - 1.0, height - 1.0),
        ];

        corners
            .iter()
            .map(|&(x, y)| self.ray_through_pixel(x, y))
            .collect()
    }

    /// Segments through every `step`-th pixel, row-major, each scaled by
    /// `length` world units along its (unnormalized) direction
    pub fn pixel_rays(&self, step: u32, length: f64) -> Vec<(Vector3<f64>, Vector3<f64>)> {
        let step = step.max(1) as usize;
        let width = self.info.image_width as usize;
        let height = self.info.image_height as usize;

        let mut rays = Vec::with_capacity((width / step + 1) * (height / step + 1));
        for y in (0..height).step_by(step) {
            for x in (0..width).step_by(step) {
                let direction = self.ray_through_pixel(x as f64, y as f64);
                let end = self.center + direction * length;
                rays.push((self.center, end));
            }
        }

        rays
    }

    /// Axis-aligned bounds of the view frustum between `near` and `far`
    pub fn frustum_bounds(&self, near: f64, far: f64) -> Aabb {
        let tan_half_fov_y = (self.fov_y_deg.to_radians() / 2.0).tan();
        let tan_half_fov_x = tan_half_fov_y * self.aspect_ratio;

        let mut bounds = Aabb::empty();
        for depth in [near, far] {
            for sx in [-1.0, 1.0] {
                for sy in [-1.0, 1.0] {
                    let corner = Vector3::new(
                        sx * tan_half_fov_x * depth,
                        sy * tan_half_fov_y * depth,
                        depth,
                    );
                    bounds.expand(&(self.center + self.to_world(&corner)));
                }
            }
        }

        bounds
    }
}
