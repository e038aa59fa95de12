//! Dead-pixel classification for the APD camera.
//!
//! A pixel is dead when its mean background-subtracted response over the
//! whole shot is anomalously low compared to the frame-wide average. The
//! baseline is taken from a fixed warm-up window at the start of the stack,
//! before the gas puff lights up the view.

use crate::archive::{self, ArchiveError};
use crate::source::{ImagingSource, Shot, SourceError};
use log::warn;
use ndarray::{s, Array2, Axis};
use std::ops::Deref;
use std::path::{Path, PathBuf};

/// Number of leading frames used for the per-pixel baseline.
pub const WARM_UP_FRAMES: usize = 200;

/// A pixel is dead when its mean response is at or below this fraction of
/// the frame-wide average.
const DEAD_FRACTION: f64 = 0.05;

#[derive(thiserror::Error, Debug)]
pub enum DeadPixelError {
    #[error("{got} frames is too few for a {warm_up}-frame warm-up baseline")]
    ShapeMismatch { warm_up: usize, got: usize },
    #[error(transparent)]
    Upstream(#[from] SourceError),
    #[error("failed to round-trip the dead-pixel archive")]
    Archive(#[from] ArchiveError),
}

/// Boolean mask over the camera view; `true` marks a dead pixel.
///
/// The mask is mirrored along the column axis so that it overlays the
/// plotting orientation of the view directly.
#[derive(Debug, Clone)]
pub struct DeadPixelMap {
    shot: Shot,
    mask: Array2<bool>,
}

impl Deref for DeadPixelMap {
    type Target = Array2<bool>;

    fn deref(&self) -> &Self::Target {
        &self.mask
    }
}

impl DeadPixelMap {
    pub fn shot(&self) -> Shot {
        self.shot
    }

    /// Number of pixels flagged dead.
    pub fn n_dead(&self) -> usize {
        self.mask.iter().filter(|&&dead| dead).count()
    }

    fn filename(shot: Shot) -> String {
        format!("dead_pixels_shot_{shot}.npz")
    }

    /// Persist the mask as a single-array npz archive in `dir`, keyed by
    /// shot number in the filename. Returns the path written.
    pub fn to_npz<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf, DeadPixelError> {
        let path = dir.as_ref().join(Self::filename(self.shot));
        let mut npz = archive::create(&path)?;
        let (rows, cols) = self.mask.dim();
        archive::write_array(
            &mut npz,
            "dead_pix_arr",
            &[rows as u64, cols as u64],
            self.mask.iter().copied(),
        )?;
        npz.zip_writer()
            .finish()
            .map_err(|e| ArchiveError::Io(e.into()))?;
        Ok(path)
    }

    /// Read a mask archive written by [`DeadPixelMap::to_npz`].
    pub fn from_npz<P: AsRef<Path>>(dir: P, shot: Shot) -> Result<Self, DeadPixelError> {
        let path = dir.as_ref().join(Self::filename(shot));
        let mut npz = archive::open(&path)?;
        Ok(Self {
            shot,
            mask: archive::read_mask(&mut npz, "dead_pix_arr")?,
        })
    }
}

/// Builder for the dead-pixel classification of one shot.
pub struct DeadPixelFinder<'a, I> {
    imaging: &'a I,
    shot: Shot,
    warm_up: usize,
    threshold: f64,
}

impl<'a, I: ImagingSource> DeadPixelFinder<'a, I> {
    pub fn new(imaging: &'a I, shot: Shot) -> Self {
        Self {
            imaging,
            shot,
            warm_up: WARM_UP_FRAMES,
            threshold: DEAD_FRACTION,
        }
    }

    /// Override the warm-up window length (default [`WARM_UP_FRAMES`]).
    pub fn warm_up(self, frames: usize) -> Self {
        Self {
            warm_up: frames,
            ..self
        }
    }

    /// Override the dead fraction of the frame-wide average (default 5%).
    pub fn threshold(self, fraction: f64) -> Self {
        Self {
            threshold: fraction,
            ..self
        }
    }

    /// Classify every pixel of the shot as dead or alive.
    ///
    /// A stack shorter than the warm-up window is rejected rather than
    /// silently truncating the baseline.
    pub fn find(self) -> Result<DeadPixelMap, DeadPixelError> {
        let stack = self.imaging.frames(self.shot)?;
        let t_len = stack.len();
        if t_len < self.warm_up || self.warm_up == 0 {
            return Err(DeadPixelError::ShapeMismatch {
                warm_up: self.warm_up,
                got: t_len,
            });
        }

        let baseline = stack
            .frames
            .slice(s![..self.warm_up, .., ..])
            .mean_axis(Axis(0))
            .ok_or(DeadPixelError::ShapeMismatch {
                warm_up: self.warm_up,
                got: 0,
            })?;
        // Response is baseline minus frame (not the other way around), so a
        // pixel that never departs from its baseline has zero mean response.
        let mean_frame = stack
            .frames
            .mean_axis(Axis(0))
            .ok_or(DeadPixelError::ShapeMismatch {
                warm_up: self.warm_up,
                got: 0,
            })?;
        let mean_response = &baseline - &mean_frame;

        let frame_average = mean_response.sum() / mean_response.len() as f64;
        if frame_average <= 0.0 {
            warn!(
                "shot {}: frame-wide mean response {frame_average:.3e} is not positive, \
                 the dead-pixel threshold is unreliable",
                self.shot
            );
        }
        let cutoff = frame_average * self.threshold;
        let flagged = mean_response.mapv(|m| m <= cutoff);
        // Orientation-correction flip along the column axis.
        let mask = flagged.slice(s![.., ..;-1]).to_owned();

        Ok(DeadPixelMap {
            shot: self.shot,
            mask,
        })
    }
}
