//! Loading precomputed embeddings from NumPy `.npy` files.

use std::path::Path;

use ndarray::Array2;
use ndarray_npy::{ReadNpyError, ReadNpyExt};
use tracing::debug;

use crate::error::{Error, Result};

/// Read a 2-D `float32` or `float64` array, one row per point.
///
/// `float64` data is narrowed to `f32`.
///
/// # Errors
///
/// [`Error::Io`] if the file cannot be read (a missing file keeps
/// [`std::io::ErrorKind::NotFound`]); [`Error::InvalidFormat`] if it is not a
/// 2-D floating point `.npy` array.
pub fn load_embedding<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<f32>>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;

    let array = match Array2::<f32>::read_npy(bytes.as_slice()) {
        Ok(array) => array,
        Err(ReadNpyError::WrongDescriptor(_)) => Array2::<f64>::read_npy(bytes.as_slice())
            .map_err(|e| invalid_npy(path, e))?
            .mapv(|v| v as f32),
        Err(e) => return Err(invalid_npy(path, e)),
    };

    debug!(path = %path.display(), rows = array.nrows(), cols = array.ncols(), "loaded embeddings");
    Ok(array.outer_iter().map(|row| row.to_vec()).collect())
}

fn invalid_npy(path: &Path, err: ReadNpyError) -> Error {
    Error::InvalidFormat(format!("{}: {err}", path.display()))
}
