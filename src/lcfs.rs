//! Time-averaged envelope of the last-closed-flux-surface (LCFS).
//!
//! The LCFS is not stationary, so a single reconstruction is a poor overlay
//! for velocity plots. The estimator samples the boundary at evenly spaced
//! instants inside a time window, stacks the curves index-aligned by
//! poloidal position and reduces the radial coordinate to a per-index
//! (mean, min, max) band.

use crate::archive::{self, ArchiveError};
use crate::source::{GeometrySource, Shot, SourceError};
use log::info;
use ndarray::{Array1, Array2, Axis};
use std::path::{Path, PathBuf};

/// Default number of sample instants inside the time window.
pub const DEFAULT_TIME_SAMPLES: usize = 50;

const M_TO_CM: f64 = 100.0;

#[derive(thiserror::Error, Debug)]
pub enum EnvelopeError {
    #[error("empty time window [{t_start}, {t_end}]s")]
    EmptyWindow { t_start: f64, t_end: f64 },
    #[error("at least one sample instant is required")]
    NoSamples,
    #[error("boundary curve at t={t}s has {got} points, expected {expected}")]
    ShapeMismatch { t: f64, expected: usize, got: usize },
    #[error(transparent)]
    Upstream(#[from] SourceError),
    #[error("failed to round-trip the envelope archive")]
    Archive(#[from] ArchiveError),
}

/// Time-averaged plasma boundary envelope together with the limiter contour,
/// all positions in centimeters.
///
/// The three envelope arrays are index-aligned with `z_lcfs`; at every index
/// `r_min <= r_mean <= r_max`.
#[derive(Debug, Clone)]
pub struct LcfsEnvelope {
    pub shot: Shot,
    /// Per-poloidal-index mean radial position of the LCFS.
    pub r_mean: Array1<f64>,
    pub r_min: Array1<f64>,
    pub r_max: Array1<f64>,
    /// Representative boundary curve (last sample instant).
    pub r_lcfs: Array1<f64>,
    pub z_lcfs: Array1<f64>,
    pub r_limiter: Array1<f64>,
    pub z_limiter: Array1<f64>,
}

impl LcfsEnvelope {
    /// Number of points on the poloidal grid.
    pub fn len(&self) -> usize {
        self.z_lcfs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.z_lcfs.is_empty()
    }

    fn filename(shot: Shot) -> String {
        format!("LCFS_limiter_coordinates_{shot}.npz")
    }

    /// Persist the envelope as a single npz archive in `dir`, keyed by shot
    /// number in the filename. Returns the path written.
    pub fn to_npz<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf, EnvelopeError> {
        let path = dir.as_ref().join(Self::filename(self.shot));
        let mut npz = archive::create(&path)?;
        for (name, data) in [
            ("R_limiter", &self.r_limiter),
            ("Z_limiter", &self.z_limiter),
            ("R_LCFS", &self.r_lcfs),
            ("Z_LCFS", &self.z_lcfs),
            ("R_LCFS_mean", &self.r_mean),
            ("R_LCFS_min", &self.r_min),
            ("R_LCFS_max", &self.r_max),
        ] {
            archive::write_array(&mut npz, name, &[data.len() as u64], data.iter().copied())?;
        }
        npz.zip_writer()
            .finish()
            .map_err(|e| ArchiveError::Io(e.into()))?;
        Ok(path)
    }

    /// Read an envelope archive written by [`LcfsEnvelope::to_npz`].
    pub fn from_npz<P: AsRef<Path>>(dir: P, shot: Shot) -> Result<Self, EnvelopeError> {
        let path = dir.as_ref().join(Self::filename(shot));
        let mut npz = archive::open(&path)?;
        Ok(Self {
            shot,
            r_limiter: archive::read_1d(&mut npz, "R_limiter")?,
            z_limiter: archive::read_1d(&mut npz, "Z_limiter")?,
            r_lcfs: archive::read_1d(&mut npz, "R_LCFS")?,
            z_lcfs: archive::read_1d(&mut npz, "Z_LCFS")?,
            r_mean: archive::read_1d(&mut npz, "R_LCFS_mean")?,
            r_min: archive::read_1d(&mut npz, "R_LCFS_min")?,
            r_max: archive::read_1d(&mut npz, "R_LCFS_max")?,
        })
    }
}

/// Builder for the boundary envelope of one shot.
///
/// ```no_run
/// # use gpi_analysis::{EnvelopeEstimator, ShotFiles};
/// let files = ShotFiles::new("/data/cmod");
/// let envelope = EnvelopeEstimator::new(&files, 1160616009)
///     .start_time(1.1)
///     .end_time(1.3)
///     .estimate()?;
/// # Ok::<(), gpi_analysis::EnvelopeError>(())
/// ```
pub struct EnvelopeEstimator<'a, G> {
    geometry: &'a G,
    shot: Shot,
    time_range: (f64, f64),
    samples: usize,
}

impl<'a, G: GeometrySource> EnvelopeEstimator<'a, G> {
    pub fn new(geometry: &'a G, shot: Shot) -> Self {
        Self {
            geometry,
            shot,
            time_range: (0f64, 0f64),
            samples: DEFAULT_TIME_SAMPLES,
        }
    }

    pub fn start_time(self, time: f64) -> Self {
        Self {
            time_range: (time, self.time_range.1),
            ..self
        }
    }

    pub fn end_time(self, time: f64) -> Self {
        Self {
            time_range: (self.time_range.0, time),
            ..self
        }
    }

    /// Number of sample instants (default [`DEFAULT_TIME_SAMPLES`]).
    pub fn samples(self, n: usize) -> Self {
        Self { samples: n, ..self }
    }

    /// Sample the boundary and reduce it to the (mean, min, max) envelope.
    ///
    /// Any failure of the geometry collaborator (missing shot, instant
    /// outside the reconstructed range) propagates unchanged; there is no
    /// fallback and no retry.
    pub fn estimate(self) -> Result<LcfsEnvelope, EnvelopeError> {
        let (t_start, t_end) = self.time_range;
        if !(t_start < t_end) {
            return Err(EnvelopeError::EmptyWindow { t_start, t_end });
        }
        if self.samples == 0 {
            return Err(EnvelopeError::NoSamples);
        }

        // The limiter is a fixed structure; one fetch covers all instants.
        let (r_raw, z_raw) = self.geometry.limiter_coordinates(self.shot)?;
        let (r_limiter, z_limiter) = self.geometry.interpolated_limiter(&r_raw, &z_raw)?;
        let separatrix = self.geometry.separatrix_coordinates(self.shot)?;

        let instants = Array1::linspace(t_start, t_end, self.samples);
        let mut r_stack: Option<Array2<f64>> = None;
        let mut last_curve: Option<(Array1<f64>, Array1<f64>)> = None;
        for (idx, &t) in instants.iter().enumerate() {
            let (r_lcfs, z_lcfs) = self.geometry.interpolated_boundary(t, &separatrix)?;
            let stack = r_stack
                .get_or_insert_with(|| Array2::zeros((r_lcfs.len(), self.samples)));
            if r_lcfs.len() != stack.nrows() || z_lcfs.len() != stack.nrows() {
                return Err(EnvelopeError::ShapeMismatch {
                    t,
                    expected: stack.nrows(),
                    got: r_lcfs.len().max(z_lcfs.len()),
                });
            }
            stack.column_mut(idx).assign(&r_lcfs);
            last_curve = Some((r_lcfs, z_lcfs));
        }
        // samples >= 1, so both are set by now
        let r_stack = r_stack.ok_or(EnvelopeError::NoSamples)?;
        let (r_lcfs, z_lcfs) = last_curve.ok_or(EnvelopeError::NoSamples)?;

        let n_points = r_stack.nrows();
        let mut r_mean = Array1::zeros(n_points);
        let mut r_min = Array1::zeros(n_points);
        let mut r_max = Array1::zeros(n_points);
        for (j, row) in r_stack.axis_iter(Axis(0)).enumerate() {
            r_mean[j] = row.sum() / row.len() as f64;
            r_min[j] = row.iter().cloned().fold(f64::INFINITY, f64::min);
            r_max[j] = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        }

        info!(
            "shot {}: envelope over [{t_start}, {t_end}]s from {} instants complete",
            self.shot, self.samples
        );

        Ok(LcfsEnvelope {
            shot: self.shot,
            r_mean: r_mean * M_TO_CM,
            r_min: r_min * M_TO_CM,
            r_max: r_max * M_TO_CM,
            r_lcfs: r_lcfs * M_TO_CM,
            z_lcfs: z_lcfs * M_TO_CM,
            r_limiter: r_limiter * M_TO_CM,
            z_limiter: z_limiter * M_TO_CM,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Separatrix;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};

    /// Analytic boundary: the radial position at poloidal index `j` moves as
    /// `base * (r0 + dr * j + amplitude * t)`.
    struct SyntheticGeometry {
        points: usize,
        amplitude: f64,
        scale: f64,
    }

    impl SyntheticGeometry {
        fn new(points: usize, amplitude: f64) -> Self {
            Self {
                points,
                amplitude,
                scale: 1.0,
            }
        }
    }

    impl GeometrySource for SyntheticGeometry {
        fn limiter_coordinates(
            &self,
            _shot: Shot,
        ) -> Result<(Array1<f64>, Array1<f64>), SourceError> {
            Ok((
                Array1::from_elem(self.points, 0.91 * self.scale),
                Array1::linspace(-0.08 * self.scale, 0.08 * self.scale, self.points),
            ))
        }

        fn interpolated_limiter(
            &self,
            r: &Array1<f64>,
            z: &Array1<f64>,
        ) -> Result<(Array1<f64>, Array1<f64>), SourceError> {
            Ok((r.clone(), z.clone()))
        }

        fn separatrix_coordinates(&self, _shot: Shot) -> Result<Separatrix, SourceError> {
            Ok(Separatrix {
                r: Array2::zeros((2, self.points)),
                z: Array2::zeros((2, self.points)),
                time: array![0.0, 10.0],
            })
        }

        fn interpolated_boundary(
            &self,
            time_point: f64,
            _separatrix: &Separatrix,
        ) -> Result<(Array1<f64>, Array1<f64>), SourceError> {
            let r = Array1::from_iter((0..self.points).map(|j| {
                self.scale * (0.88 + 1e-4 * j as f64 + self.amplitude * time_point)
            }));
            let z = Array1::linspace(-0.08 * self.scale, 0.08 * self.scale, self.points);
            Ok((r, z))
        }
    }

    #[test]
    fn min_mean_max_ordering_holds_at_every_index() {
        let geometry = SyntheticGeometry::new(20, 0.01);
        let envelope = EnvelopeEstimator::new(&geometry, 1)
            .start_time(1.0)
            .end_time(2.0)
            .samples(17)
            .estimate()
            .unwrap();
        assert_eq!(envelope.len(), 20);
        for j in 0..envelope.len() {
            assert!(envelope.r_min[j] <= envelope.r_mean[j]);
            assert!(envelope.r_mean[j] <= envelope.r_max[j]);
        }
        // Radius grows with time, so the extremes are the window edges.
        assert_relative_eq!(envelope.r_min[0], (0.88 + 0.01) * 100.0, epsilon = 1e-9);
        assert_relative_eq!(envelope.r_max[0], (0.88 + 0.02) * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn single_sample_collapses_the_band() {
        let geometry = SyntheticGeometry::new(10, 0.05);
        let envelope = EnvelopeEstimator::new(&geometry, 2)
            .start_time(0.4)
            .end_time(0.6)
            .samples(1)
            .estimate()
            .unwrap();
        for j in 0..envelope.len() {
            assert_relative_eq!(envelope.r_min[j], envelope.r_mean[j]);
            assert_relative_eq!(envelope.r_max[j], envelope.r_mean[j]);
        }
        // One instant at t_start
        assert_relative_eq!(envelope.r_mean[0], (0.88 + 0.05 * 0.4) * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn outputs_scale_linearly_with_input_positions() {
        let reference = SyntheticGeometry::new(8, 0.02);
        let mut doubled = SyntheticGeometry::new(8, 0.02);
        doubled.scale = 2.0;
        let make = |g: &SyntheticGeometry| {
            EnvelopeEstimator::new(g, 3)
                .start_time(0.0)
                .end_time(1.0)
                .samples(5)
                .estimate()
                .unwrap()
        };
        let a = make(&reference);
        let b = make(&doubled);
        for j in 0..a.len() {
            assert_relative_eq!(b.r_mean[j], 2.0 * a.r_mean[j], epsilon = 1e-9);
            assert_relative_eq!(b.r_min[j], 2.0 * a.r_min[j], epsilon = 1e-9);
            assert_relative_eq!(b.r_max[j], 2.0 * a.r_max[j], epsilon = 1e-9);
            assert_relative_eq!(b.r_limiter[j], 2.0 * a.r_limiter[j], epsilon = 1e-9);
        }
    }

    #[test]
    fn inverted_window_is_rejected() {
        let geometry = SyntheticGeometry::new(4, 0.0);
        assert!(matches!(
            EnvelopeEstimator::new(&geometry, 3)
                .start_time(2.0)
                .end_time(1.0)
                .estimate(),
            Err(EnvelopeError::EmptyWindow { .. })
        ));
        assert!(matches!(
            EnvelopeEstimator::new(&geometry, 3).estimate(),
            Err(EnvelopeError::EmptyWindow { .. })
        ));
    }

    #[test]
    fn zero_samples_is_rejected() {
        let geometry = SyntheticGeometry::new(4, 0.0);
        assert!(matches!(
            EnvelopeEstimator::new(&geometry, 3)
                .start_time(0.0)
                .end_time(1.0)
                .samples(0)
                .estimate(),
            Err(EnvelopeError::NoSamples)
        ));
    }

    #[test]
    fn npz_round_trip_preserves_the_seven_arrays() {
        let geometry = SyntheticGeometry::new(6, 0.01);
        let envelope = EnvelopeEstimator::new(&geometry, 11)
            .start_time(0.0)
            .end_time(1.0)
            .samples(4)
            .estimate()
            .unwrap();
        let dir = std::env::temp_dir().join("gpi_lcfs_round_trip");
        std::fs::create_dir_all(&dir).unwrap();
        let path = envelope.to_npz(&dir).unwrap();
        assert!(path.ends_with("LCFS_limiter_coordinates_11.npz"));
        let back = LcfsEnvelope::from_npz(&dir, 11).unwrap();
        assert_eq!(back.r_mean, envelope.r_mean);
        assert_eq!(back.r_min, envelope.r_min);
        assert_eq!(back.r_max, envelope.r_max);
        assert_eq!(back.z_lcfs, envelope.z_lcfs);
        assert_eq!(back.r_limiter, envelope.r_limiter);
    }
}
