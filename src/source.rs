//! Collaborator interfaces for per-shot diagnostic data.
//!
//! The computational components never talk to an acquisition system
//! directly; they pull arrays from the traits below. [`ShotFiles`] is a
//! file-backed implementation reading per-shot npz archives and gzipped
//! CSV time series.

mod files;
pub use files::{PlasmaSignal, ShotFiles};

use crate::archive::ArchiveError;
use crate::timeseries::TimeSeries;
use ndarray::{Array1, Array2, Array3};

/// Shot identifier, e.g. `1160616009` on Alcator C-Mod.
pub type Shot = u32;

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("no data for shot {shot}: {reason}")]
    NoData { shot: Shot, reason: String },
    #[error("time base is not strictly increasing at index {index}")]
    TimeNotIncreasing { index: usize },
    #[error("requested time {t}s outside the available range [{t_min}, {t_max}]s")]
    TimeOutOfRange { t: f64, t_min: f64, t_max: f64 },
    #[error("`{name}` has {got} samples, expected {expected}")]
    ShapeMismatch {
        name: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("failed to read the shot file")]
    Io(#[from] std::io::Error),
    #[error("failed to deserialize the CSV time series")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Separatrix curves for every reconstruction time slice, on the
/// reconstruction (EFIT) time base.
///
/// `r` and `z` are indexed by (time slice, boundary point); positions in
/// meters.
#[derive(Debug, Clone)]
pub struct Separatrix {
    pub r: Array2<f64>,
    pub z: Array2<f64>,
    pub time: Array1<f64>,
}

impl Separatrix {
    /// Number of reconstruction time slices.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// Camera frame stack indexed by (time, row, column), with the frame time
/// base index-aligned to the leading axis.
#[derive(Debug, Clone)]
pub struct FrameStack {
    pub time: Array1<f64>,
    pub frames: Array3<f64>,
}

impl FrameStack {
    pub fn len(&self) -> usize {
        self.frames.shape()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spatial shape of a single frame, (rows, columns).
    pub fn spatial_shape(&self) -> (usize, usize) {
        let s = self.frames.shape();
        (s[1], s[2])
    }
}

/// Magnetic-geometry collaborator (equilibrium reconstructions).
pub trait GeometrySource {
    /// Limiter contour (R, Z) in meters; fixed structure, time independent.
    fn limiter_coordinates(&self, shot: Shot) -> Result<(Array1<f64>, Array1<f64>), SourceError>;
    /// Limiter contour resampled onto the fine poloidal grid.
    fn interpolated_limiter(
        &self,
        r: &Array1<f64>,
        z: &Array1<f64>,
    ) -> Result<(Array1<f64>, Array1<f64>), SourceError>;
    /// Separatrix curves for all reconstruction time slices.
    fn separatrix_coordinates(&self, shot: Shot) -> Result<Separatrix, SourceError>;
    /// One boundary curve (R, Z) at `time_point`, interpolated in time by the
    /// collaborator.
    fn interpolated_boundary(
        &self,
        time_point: f64,
        separatrix: &Separatrix,
    ) -> Result<(Array1<f64>, Array1<f64>), SourceError>;
}

/// Bulk plasma parameter collaborator.
pub trait PlasmaSource {
    fn toroidal_magnetic_field(&self, shot: Shot) -> Result<TimeSeries, SourceError>;
    fn plasma_current(&self, shot: Shot) -> Result<TimeSeries, SourceError>;
    fn line_integrated_density(&self, shot: Shot) -> Result<TimeSeries, SourceError>;
    fn line_averaged_density(&self, shot: Shot) -> Result<TimeSeries, SourceError>;
}

/// Imaging diagnostic collaborator.
pub trait ImagingSource {
    fn frames(&self, shot: Shot) -> Result<FrameStack, SourceError>;
}
