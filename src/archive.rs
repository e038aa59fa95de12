//! Helpers around the npz shot archives.
//!
//! Every persisted product of this crate is a single compressed archive of
//! named arrays, one archive per shot; consumers read the arrays back by
//! fixed key names.

use ndarray::{Array1, Array2, Array3};
use npyz::npz::{NpzArchive, NpzWriter};
use npyz::WriterBuilder;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Seek, Write};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum ArchiveError {
    #[error("failed to access the npz archive")]
    Io(#[from] io::Error),
    #[error("array `{name}` missing from the npz archive")]
    MissingKey { name: String },
    #[error("array `{name}` has rank {got}, expected {expected}")]
    WrongRank {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("array dimensions are inconsistent")]
    Shape(#[from] ndarray::ShapeError),
}

pub type Reader = NpzArchive<BufReader<File>>;

pub fn open(path: &Path) -> Result<Reader, ArchiveError> {
    Ok(NpzArchive::open(path)?)
}

fn raw<T: npyz::Deserialize>(
    npz: &mut Reader,
    name: &str,
    rank: usize,
) -> Result<(Vec<usize>, Vec<T>), ArchiveError> {
    let npy = npz.by_name(name)?.ok_or_else(|| ArchiveError::MissingKey {
        name: name.to_string(),
    })?;
    let shape: Vec<usize> = npy.shape().iter().map(|&d| d as usize).collect();
    if shape.len() != rank {
        return Err(ArchiveError::WrongRank {
            name: name.to_string(),
            expected: rank,
            got: shape.len(),
        });
    }
    Ok((shape, npy.into_vec::<T>()?))
}

pub fn read_1d(npz: &mut Reader, name: &str) -> Result<Array1<f64>, ArchiveError> {
    let (_, data) = raw::<f64>(npz, name, 1)?;
    Ok(Array1::from(data))
}

pub fn read_2d(npz: &mut Reader, name: &str) -> Result<Array2<f64>, ArchiveError> {
    let (shape, data) = raw::<f64>(npz, name, 2)?;
    Ok(Array2::from_shape_vec((shape[0], shape[1]), data)?)
}

pub fn read_3d(npz: &mut Reader, name: &str) -> Result<Array3<f64>, ArchiveError> {
    let (shape, data) = raw::<f64>(npz, name, 3)?;
    Ok(Array3::from_shape_vec(
        (shape[0], shape[1], shape[2]),
        data,
    )?)
}

pub fn read_mask(npz: &mut Reader, name: &str) -> Result<Array2<bool>, ArchiveError> {
    let (shape, data) = raw::<bool>(npz, name, 2)?;
    Ok(Array2::from_shape_vec((shape[0], shape[1]), data)?)
}

pub fn create(path: &Path) -> Result<NpzWriter<BufWriter<File>>, ArchiveError> {
    Ok(NpzWriter::create(path)?)
}

pub fn write_array<W, T, I>(
    npz: &mut NpzWriter<W>,
    name: &str,
    shape: &[u64],
    data: I,
) -> Result<(), ArchiveError>
where
    W: Write + Seek,
    T: npyz::AutoSerialize,
    I: IntoIterator<Item = T>,
{
    let mut writer = npz
        .array(name, Default::default())?
        .default_dtype()
        .shape(shape)
        .begin_nd()?;
    writer.extend(data)?;
    writer.finish()?;
    Ok(())
}
