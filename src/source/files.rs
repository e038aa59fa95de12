use super::{FrameStack, GeometrySource, ImagingSource, PlasmaSource, Separatrix, Shot, SourceError};
use crate::archive;
use crate::timeseries::TimeSeries;
use crate::BOUNDARY_POINTS;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use itertools::Itertools;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// The per-shot plasma parameter files, one gzipped CSV per signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlasmaSignal {
    ToroidalMagneticField,
    PlasmaCurrent,
    LineIntegratedDensity,
    LineAveragedDensity,
}

impl PlasmaSignal {
    fn file_stem(self) -> &'static str {
        match self {
            PlasmaSignal::ToroidalMagneticField => "toroidal_magnetic_field",
            PlasmaSignal::PlasmaCurrent => "plasma_current",
            PlasmaSignal::LineIntegratedDensity => "line_integrated_density",
            PlasmaSignal::LineAveragedDensity => "line_averaged_density",
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
struct Record {
    #[serde(rename = "Time [s]")]
    time: f64,
    #[serde(rename = "Value")]
    value: f64,
}

/// File-backed shot data repository.
///
/// One directory holds, per shot, a geometry archive
/// (`geometry_{shot}.npz`: `R_limiter`, `Z_limiter`, `rbbbs`, `zbbbs`,
/// `efit_time`), a frame archive (`apd_frames_{shot}.npz`: `time`, `frames`)
/// and one `{signal}_{shot}.csv.gz` per plasma parameter.
///
/// Boundary and limiter curves are resampled onto a fine poloidal grid of
/// [`BOUNDARY_POINTS`] points; time interpolation of the boundary is linear
/// between the two bracketing reconstruction slices.
pub struct ShotFiles {
    path: PathBuf,
    boundary_points: usize,
}

impl ShotFiles {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            boundary_points: BOUNDARY_POINTS,
        }
    }

    /// Override the fine poloidal grid size (default [`BOUNDARY_POINTS`]).
    pub fn boundary_points(self, n: usize) -> Self {
        Self {
            boundary_points: n,
            ..self
        }
    }

    fn geometry_path(&self, shot: Shot) -> PathBuf {
        self.path.join(format!("geometry_{shot}.npz"))
    }

    fn frames_path(&self, shot: Shot) -> PathBuf {
        self.path.join(format!("apd_frames_{shot}.npz"))
    }

    fn series_path(&self, signal: PlasmaSignal, shot: Shot) -> PathBuf {
        self.path.join(format!("{}_{shot}.csv.gz", signal.file_stem()))
    }

    fn open_shot_file(&self, shot: Shot, path: &Path) -> Result<File, SourceError> {
        File::open(path).map_err(|e| SourceError::NoData {
            shot,
            reason: format!("{}: {e}", path.display()),
        })
    }

    fn read_series(&self, signal: PlasmaSignal, shot: Shot) -> Result<TimeSeries, SourceError> {
        let path = self.series_path(signal, shot);
        let file = self.open_shot_file(shot, &path)?;
        let mut contents = String::new();
        GzDecoder::new(file).read_to_string(&mut contents)?;
        let mut rdr = csv::Reader::from_reader(contents.as_bytes());
        let mut time = Vec::new();
        let mut values = Vec::new();
        for result in rdr.deserialize() {
            let row: Record = result?;
            time.push(row.time);
            values.push(row.value);
        }
        check_increasing(&time)?;
        Ok(TimeSeries::new(Array1::from(time), Array1::from(values)))
    }

    /// Write one plasma parameter series as a gzipped CSV file.
    pub fn write_series(
        &self,
        signal: PlasmaSignal,
        shot: Shot,
        series: &TimeSeries,
    ) -> Result<(), SourceError> {
        let gz = GzEncoder::new(File::create(self.series_path(signal, shot))?, Compression::default());
        let mut wtr = csv::Writer::from_writer(gz);
        for (&time, &value) in series.time.iter().zip(series.values.iter()) {
            wtr.serialize(Record { time, value })?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write the geometry archive for a shot.
    pub fn write_geometry(
        &self,
        shot: Shot,
        r_limiter: &Array1<f64>,
        z_limiter: &Array1<f64>,
        separatrix: &Separatrix,
    ) -> Result<(), SourceError> {
        let mut npz = archive::create(&self.geometry_path(shot))?;
        let n_lim = r_limiter.len() as u64;
        archive::write_array(&mut npz, "R_limiter", &[n_lim], r_limiter.iter().copied())?;
        archive::write_array(&mut npz, "Z_limiter", &[n_lim], z_limiter.iter().copied())?;
        let (n_t, n_b) = separatrix.r.dim();
        archive::write_array(
            &mut npz,
            "rbbbs",
            &[n_t as u64, n_b as u64],
            separatrix.r.iter().copied(),
        )?;
        archive::write_array(
            &mut npz,
            "zbbbs",
            &[n_t as u64, n_b as u64],
            separatrix.z.iter().copied(),
        )?;
        archive::write_array(
            &mut npz,
            "efit_time",
            &[n_t as u64],
            separatrix.time.iter().copied(),
        )?;
        npz.zip_writer()
            .finish()
            .map_err(|e| SourceError::Io(e.into()))?;
        Ok(())
    }

    /// Write the camera frame archive for a shot.
    pub fn write_frames(&self, shot: Shot, stack: &FrameStack) -> Result<(), SourceError> {
        let mut npz = archive::create(&self.frames_path(shot))?;
        let shape: Vec<u64> = stack.frames.shape().iter().map(|&d| d as u64).collect();
        archive::write_array(
            &mut npz,
            "time",
            &[stack.time.len() as u64],
            stack.time.iter().copied(),
        )?;
        archive::write_array(&mut npz, "frames", &shape, stack.frames.iter().copied())?;
        npz.zip_writer()
            .finish()
            .map_err(|e| SourceError::Io(e.into()))?;
        Ok(())
    }
}

fn check_increasing(time: &[f64]) -> Result<(), SourceError> {
    for (index, (a, b)) in time.iter().tuple_windows().enumerate() {
        if b <= a {
            return Err(SourceError::TimeNotIncreasing { index });
        }
    }
    Ok(())
}

/// Resample a curve onto `n` points, linearly in the normalized point index.
fn resample(curve: ArrayView1<f64>, n: usize) -> Array1<f64> {
    let len = curve.len();
    if len == n || len < 2 {
        return curve.to_owned();
    }
    let step = (len - 1) as f64 / (n - 1).max(1) as f64;
    Array1::from_iter((0..n).map(|i| {
        let s = i as f64 * step;
        let j = (s.floor() as usize).min(len - 2);
        let frac = s - j as f64;
        curve[j] * (1.0 - frac) + curve[j + 1] * frac
    }))
}

impl GeometrySource for ShotFiles {
    fn limiter_coordinates(&self, shot: Shot) -> Result<(Array1<f64>, Array1<f64>), SourceError> {
        let path = self.geometry_path(shot);
        self.open_shot_file(shot, &path)?;
        let mut npz = archive::open(&path)?;
        let r = archive::read_1d(&mut npz, "R_limiter")?;
        let z = archive::read_1d(&mut npz, "Z_limiter")?;
        if r.len() != z.len() {
            return Err(SourceError::ShapeMismatch {
                name: "Z_limiter",
                expected: r.len(),
                got: z.len(),
            });
        }
        Ok((r, z))
    }

    fn interpolated_limiter(
        &self,
        r: &Array1<f64>,
        z: &Array1<f64>,
    ) -> Result<(Array1<f64>, Array1<f64>), SourceError> {
        if r.len() != z.len() {
            return Err(SourceError::ShapeMismatch {
                name: "limiter",
                expected: r.len(),
                got: z.len(),
            });
        }
        Ok((
            resample(r.view(), self.boundary_points),
            resample(z.view(), self.boundary_points),
        ))
    }

    fn separatrix_coordinates(&self, shot: Shot) -> Result<Separatrix, SourceError> {
        let path = self.geometry_path(shot);
        self.open_shot_file(shot, &path)?;
        let mut npz = archive::open(&path)?;
        let r = archive::read_2d(&mut npz, "rbbbs")?;
        let z = archive::read_2d(&mut npz, "zbbbs")?;
        let time = archive::read_1d(&mut npz, "efit_time")?;
        if z.dim() != r.dim() {
            return Err(SourceError::ShapeMismatch {
                name: "zbbbs",
                expected: r.dim().0 * r.dim().1,
                got: z.dim().0 * z.dim().1,
            });
        }
        if time.len() != r.dim().0 {
            return Err(SourceError::ShapeMismatch {
                name: "efit_time",
                expected: r.dim().0,
                got: time.len(),
            });
        }
        check_increasing(&time.to_vec())?;
        Ok(Separatrix { r, z, time })
    }

    fn interpolated_boundary(
        &self,
        time_point: f64,
        separatrix: &Separatrix,
    ) -> Result<(Array1<f64>, Array1<f64>), SourceError> {
        let time = &separatrix.time;
        let n_t = time.len();
        if n_t == 0 {
            return Err(SourceError::ShapeMismatch {
                name: "efit_time",
                expected: 1,
                got: 0,
            });
        }
        let (t_min, t_max) = (time[0], time[n_t - 1]);
        if time_point < t_min || time_point > t_max {
            return Err(SourceError::TimeOutOfRange {
                t: time_point,
                t_min,
                t_max,
            });
        }
        // Bracketing slice pair; degenerate to the last slice at t_max.
        let i = time
            .iter()
            .position(|&t| t >= time_point)
            .unwrap_or(n_t - 1);
        let (r, z) = if i == 0 || time[i] == time_point {
            (separatrix.r.row(i).to_owned(), separatrix.z.row(i).to_owned())
        } else {
            let frac = (time_point - time[i - 1]) / (time[i] - time[i - 1]);
            (
                separatrix.r.row(i - 1).to_owned() * (1.0 - frac)
                    + separatrix.r.row(i).to_owned() * frac,
                separatrix.z.row(i - 1).to_owned() * (1.0 - frac)
                    + separatrix.z.row(i).to_owned() * frac,
            )
        };
        Ok((
            resample(r.view(), self.boundary_points),
            resample(z.view(), self.boundary_points),
        ))
    }
}

impl PlasmaSource for ShotFiles {
    fn toroidal_magnetic_field(&self, shot: Shot) -> Result<TimeSeries, SourceError> {
        self.read_series(PlasmaSignal::ToroidalMagneticField, shot)
    }

    fn plasma_current(&self, shot: Shot) -> Result<TimeSeries, SourceError> {
        self.read_series(PlasmaSignal::PlasmaCurrent, shot)
    }

    fn line_integrated_density(&self, shot: Shot) -> Result<TimeSeries, SourceError> {
        self.read_series(PlasmaSignal::LineIntegratedDensity, shot)
    }

    fn line_averaged_density(&self, shot: Shot) -> Result<TimeSeries, SourceError> {
        self.read_series(PlasmaSignal::LineAveragedDensity, shot)
    }
}

impl ImagingSource for ShotFiles {
    fn frames(&self, shot: Shot) -> Result<FrameStack, SourceError> {
        let path = self.frames_path(shot);
        self.open_shot_file(shot, &path)?;
        let mut npz = archive::open(&path)?;
        let time = archive::read_1d(&mut npz, "time")?;
        let frames = archive::read_3d(&mut npz, "frames")?;
        if time.len() != frames.shape()[0] {
            return Err(SourceError::ShapeMismatch {
                name: "time",
                expected: frames.shape()[0],
                got: time.len(),
            });
        }
        Ok(FrameStack { time, frames })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2, Array3};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(name);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn plasma_series_round_trip() {
        let files = ShotFiles::new(scratch_dir("gpi_files_series"));
        let series = TimeSeries::new(array![0.0, 0.5, 1.0], array![1e5, 2e5, 1.5e5]);
        files
            .write_series(PlasmaSignal::PlasmaCurrent, 42, &series)
            .unwrap();
        let back = files.plasma_current(42).unwrap();
        assert_eq!(back.time, series.time);
        assert_eq!(back.values, series.values);
    }

    #[test]
    fn missing_shot_is_no_data() {
        let files = ShotFiles::new(scratch_dir("gpi_files_missing"));
        assert!(matches!(
            files.plasma_current(999_999_999),
            Err(SourceError::NoData { shot: 999_999_999, .. })
        ));
    }

    #[test]
    fn frames_round_trip() {
        let files = ShotFiles::new(scratch_dir("gpi_files_frames"));
        let frames = Array3::from_shape_fn((4, 2, 3), |(t, y, x)| (t * 100 + y * 10 + x) as f64);
        let stack = FrameStack {
            time: array![0.0, 0.1, 0.2, 0.3],
            frames,
        };
        files.write_frames(7, &stack).unwrap();
        let back = files.frames(7).unwrap();
        assert_eq!(back.frames, stack.frames);
        assert_eq!(back.spatial_shape(), (2, 3));
    }

    #[test]
    fn boundary_is_linearly_interpolated_in_time() {
        let dir = scratch_dir("gpi_files_boundary");
        let files = ShotFiles::new(&dir).boundary_points(5);
        // Two slices, five boundary points, radius grows linearly in time.
        let separatrix = Separatrix {
            r: Array2::from_shape_fn((2, 5), |(t, j)| 1.0 + t as f64 + 0.01 * j as f64),
            z: Array2::from_shape_fn((2, 5), |(_, j)| -0.1 + 0.05 * j as f64),
            time: array![0.0, 1.0],
        };
        files
            .write_geometry(3, &array![0.9, 0.9], &array![-0.2, 0.2], &separatrix)
            .unwrap();
        let separatrix = files.separatrix_coordinates(3).unwrap();
        let (r, z) = files.interpolated_boundary(0.25, &separatrix).unwrap();
        assert_eq!(r.len(), 5);
        assert_relative_eq!(r[0], 1.25);
        assert_relative_eq!(r[4], 1.25 + 0.04);
        assert_relative_eq!(z[2], 0.0);
    }

    #[test]
    fn boundary_outside_reconstruction_range_fails() {
        let files = ShotFiles::new(scratch_dir("gpi_files_range"));
        let separatrix = Separatrix {
            r: Array2::zeros((2, 3)),
            z: Array2::zeros((2, 3)),
            time: array![0.5, 1.0],
        };
        assert!(matches!(
            files.interpolated_boundary(0.1, &separatrix),
            Err(SourceError::TimeOutOfRange { .. })
        ));
    }

    #[test]
    fn limiter_resampled_onto_fine_grid() {
        let files = ShotFiles::new(scratch_dir("gpi_files_limiter")).boundary_points(9);
        let r = array![0.0, 1.0, 2.0];
        let z = array![0.0, 2.0, 0.0];
        let (r_fine, z_fine) = files.interpolated_limiter(&r, &z).unwrap();
        assert_eq!(r_fine.len(), 9);
        assert_relative_eq!(r_fine[4], 1.0);
        assert_relative_eq!(z_fine[4], 2.0);
        assert_relative_eq!(z_fine[8], 0.0);
    }

    #[test]
    fn non_increasing_time_base_is_rejected() {
        let files = ShotFiles::new(scratch_dir("gpi_files_nonmono"));
        let series = TimeSeries::new(array![0.0, 1.0, 0.5], array![1.0, 2.0, 3.0]);
        files
            .write_series(PlasmaSignal::LineAveragedDensity, 5, &series)
            .unwrap();
        assert!(matches!(
            files.line_averaged_density(5),
            Err(SourceError::TimeNotIncreasing { index: 1 })
        ));
    }
}
