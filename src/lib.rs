//! Post-processing toolkit for gas-puff-imaging (GPI) diagnostics on
//! magnetic-confinement experiments.
//!
//! The crate derives physical quantities from per-shot diagnostic data:
//! the time-averaged envelope of the last-closed-flux-surface ([`EnvelopeEstimator`]),
//! a dead-pixel map of the APD camera ([`DeadPixelFinder`]), the Greenwald
//! fraction ([`greenwald_fraction`]) and running-window normalization of
//! camera frame stacks ([`running_normalize`]). Raw data comes from
//! collaborator traits ([`GeometrySource`], [`PlasmaSource`], [`ImagingSource`]);
//! a file-backed implementation ([`ShotFiles`]) reads per-shot npz archives
//! and gzipped CSV time series.

mod archive;
pub use archive::ArchiveError;
mod error;
pub use error::Error;
mod timeseries;
pub use timeseries::TimeSeries;
pub mod source;
pub use source::{
    FrameStack, GeometrySource, ImagingSource, PlasmaSource, Separatrix, Shot, ShotFiles,
    SourceError,
};
mod lcfs;
pub use lcfs::{EnvelopeEstimator, EnvelopeError, LcfsEnvelope, DEFAULT_TIME_SAMPLES};
mod dead_pixels;
pub use dead_pixels::{DeadPixelError, DeadPixelFinder, DeadPixelMap, WARM_UP_FRAMES};
mod greenwald;
pub use greenwald::{greenwald_fraction, GreenwaldError, DEFAULT_MINOR_RADIUS};
mod normalize;
pub use normalize::{running_mean, running_normalize, NormalizeError};
mod camera;
pub use camera::{CameraError, PixelGrid, FOV_ANGLE_DEG};
mod batch;
pub use batch::{process_shots, ShotReport, ShotSummary};
#[cfg(feature = "plot")]
mod plot;
#[cfg(feature = "plot")]
pub use plot::{plot_velocity_field, VelocityField};

/// Number of points on the fine poloidal grid shared by the interpolated
/// limiter and boundary curves.
pub const BOUNDARY_POINTS: usize = 100;
