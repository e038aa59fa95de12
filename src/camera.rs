//! Radial and poloidal pixel positions of the camera view.

use ndarray::Array2;

/// Field-of-view angle [deg] of the reference camera installation.
pub const FOV_ANGLE_DEG: f64 = 21.485;

#[derive(thiserror::Error, Debug)]
pub enum CameraError {
    #[error("pixel coordinate grids have shapes {r:?} and {z:?}")]
    ShapeMismatch {
        r: (usize, usize),
        z: (usize, usize),
    },
}

/// Radial and poloidal pixel positions [cm], indexed by (row, column).
///
/// Positions are relative to the reference corner pixel (last row, first
/// column) and rotated into the flux-surface frame by the camera
/// field-of-view angle.
#[derive(Debug, Clone)]
pub struct PixelGrid {
    pub r: Array2<f64>,
    pub z: Array2<f64>,
}

impl PixelGrid {
    /// Rotate raw camera coordinates by `fov_angle_deg` about the reference
    /// corner pixel.
    pub fn from_raw(
        r_raw: &Array2<f64>,
        z_raw: &Array2<f64>,
        fov_angle_deg: f64,
    ) -> Result<Self, CameraError> {
        if r_raw.dim() != z_raw.dim() {
            return Err(CameraError::ShapeMismatch {
                r: r_raw.dim(),
                z: z_raw.dim(),
            });
        }
        let (rows, cols) = r_raw.dim();
        let beta = fov_angle_deg.to_radians();
        let (sin_b, cos_b) = beta.sin_cos();
        let r_ref = r_raw[(rows - 1, 0)];
        let z_ref = z_raw[(rows - 1, 0)];
        let mut r = Array2::zeros((rows, cols));
        let mut z = Array2::zeros((rows, cols));
        for i in 0..rows {
            for j in 0..cols {
                let dr = r_raw[(i, j)] - r_ref;
                let dz = z_raw[(i, j)] - z_ref;
                r[(i, j)] = cos_b * dr - sin_b * dz;
                z[(i, j)] = sin_b * dr + cos_b * dz;
            }
        }
        Ok(Self { r, z })
    }

    pub fn shape(&self) -> (usize, usize) {
        self.r.dim()
    }
}
