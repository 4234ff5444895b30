use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use ndarray::Array2;
use npyz::WriterBuilder;

use super::error::{MnistError, Result};

// Trait for saving/loading converted arrays into/from cache files
pub trait Recorder {
    const EXTENSION: &'static str;

    fn save(array: &Array2<u8>, file_path: &Path) -> Result<()>;

    fn load(file_path: &Path) -> Result<Array2<u8>>;
}

/// NumPy `.npy` files, dtype `|u1`, C order.
pub struct NpyRecorder;

impl Recorder for NpyRecorder {
    const EXTENSION: &'static str = "npy";

    fn save(array: &Array2<u8>, file_path: &Path) -> Result<()> {
        let file = File::create(file_path).map_err(MnistError::io(file_path))?;
        let mut out = BufWriter::new(file);
        let (rows, cols) = array.dim();

        let mut writer = npyz::WriteOptions::new()
            .default_dtype()
            .shape(&[rows as u64, cols as u64])
            .writer(&mut out)
            .begin_nd()
            .map_err(MnistError::io(file_path))?;
        writer
            .extend(array.iter().copied())
            .map_err(MnistError::io(file_path))?;
        writer.finish().map_err(MnistError::io(file_path))?;

        out.flush().map_err(MnistError::io(file_path))
    }

    fn load(file_path: &Path) -> Result<Array2<u8>> {
        let file = File::open(file_path).map_err(MnistError::io(file_path))?;
        let npy = npyz::NpyFile::new(BufReader::new(file)).map_err(MnistError::io(file_path))?;

        let shape = npy.shape().to_vec();
        let bad_cache = |reason: String| MnistError::BadCache {
            path: file_path.to_path_buf(),
            reason,
        };
        let [rows, cols] = shape[..] else {
            return Err(bad_cache(format!("expected a 2-D array, found shape {:?}", shape)));
        };
        if !matches!(npy.order(), npyz::Order::C) {
            return Err(bad_cache("array is not in C order".into()));
        }

        let data: Vec<u8> = npy.into_vec().map_err(MnistError::io(file_path))?;
        Ok(Array2::from_shape_vec((rows as usize, cols as usize), data)?)
    }
}

/// Whitespace-delimited integers, one array row per line.
///
/// An empty file loads as a `(0, 0)` array since the row width is not
/// recorded anywhere.
pub struct TextRecorder;

impl Recorder for TextRecorder {
    const EXTENSION: &'static str = "txt";

    fn save(array: &Array2<u8>, file_path: &Path) -> Result<()> {
        let file = File::create(file_path).map_err(MnistError::io(file_path))?;
        let mut out = BufWriter::new(file);
        for row in array.outer_iter() {
            let line = row
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(out, "{}", line).map_err(MnistError::io(file_path))?;
        }
        out.flush().map_err(MnistError::io(file_path))
    }

    fn load(file_path: &Path) -> Result<Array2<u8>> {
        let text = fs::read_to_string(file_path).map_err(MnistError::io(file_path))?;

        let mut values = Vec::new();
        let mut shape = (0, 0);
        for (lineno, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let before = values.len();
            for token in line.split_whitespace() {
                let v = token.parse::<u8>().map_err(|e| MnistError::BadCache {
                    path: file_path.to_path_buf(),
                    reason: format!("line {}: {:?}: {}", lineno + 1, token, e),
                })?;
                values.push(v);
            }

            let width = values.len() - before;
            if shape.0 > 0 && width != shape.1 {
                return Err(MnistError::BadCache {
                    path: file_path.to_path_buf(),
                    reason: format!(
                        "line {} has {} values, expected {}",
                        lineno + 1,
                        width,
                        shape.1
                    ),
                });
            }
            shape = (shape.0 + 1, width);
        }

        Ok(Array2::from_shape_vec(shape, values)?)
    }
}
