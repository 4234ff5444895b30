use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{info, warn};
use ndarray::Array2;

use super::common::*;
use super::error::{MnistError, Result};
use super::idx::{self, Header, IdxFile};
use super::recorders::{NpyRecorder, Recorder, TextRecorder};

/// Summary of one raw file turned into a cached array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Converted {
    pub role: Role,
    pub shape: (usize, usize),
    pub npy_path: PathBuf,
    pub txt_path: Option<PathBuf>,
}

#[derive(Debug)]
pub struct ConvertReport {
    pub file: RawFile,
    pub result: Result<Converted>,
}

/// Reshapes an image payload into `count` rows of `rows * cols` pixels.
pub fn decode_images(header: &Header, payload: Vec<u8>) -> Result<ImageArray> {
    let expected = match (*header, header.payload_len()) {
        (_, Some(len)) => len,
        (Header::Images { count, rows, cols }, None) => {
            return Err(MnistError::DimensionOverflow { count, rows, cols })
        }
        (Header::Labels { count }, None) => {
            return Err(MnistError::DimensionOverflow { count, rows: 1, cols: 1 })
        }
    };
    if payload.len() != expected {
        return Err(MnistError::ShapeMismatch {
            expected,
            actual: payload.len(),
        });
    }
    let record_len = header.record_len().unwrap_or_default();
    Ok(Array2::from_shape_vec((header.count(), record_len), payload)?)
}

/// Expands class indices into one-hot rows of width `NUM_CLASSES`.
pub fn decode_labels(header: &Header, payload: &[u8]) -> Result<LabelArray> {
    if payload.len() != header.count() {
        return Err(MnistError::ShapeMismatch {
            expected: header.count(),
            actual: payload.len(),
        });
    }

    let identity = LabelArray::eye(NUM_CLASSES);
    let mut one_hot = LabelArray::zeros((payload.len(), NUM_CLASSES));
    for (index, (&value, mut row)) in payload.iter().zip(one_hot.outer_iter_mut()).enumerate() {
        if value as usize >= NUM_CLASSES {
            return Err(MnistError::LabelOutOfRange { index, value });
        }
        row.assign(&identity.row(value as usize));
    }
    Ok(one_hot)
}

/// Decodes a parsed IDX file into the array its header describes.
pub fn decode(idx: IdxFile) -> Result<(Role, Array2<u8>)> {
    let IdxFile { header, payload } = idx;
    match header {
        Header::Images { .. } => Ok((Role::Images, decode_images(&header, payload)?)),
        Header::Labels { .. } => Ok((Role::Labels, decode_labels(&header, &payload)?)),
    }
}

/// Converts one compressed IDX file into `<cache_stem>.npy`, plus
/// `<cache_stem>.txt` when `emit_text` is set.
pub fn convert_file(raw_path: &Path, cache_stem: &Path, emit_text: bool) -> Result<Converted> {
    convert_checked(raw_path, cache_stem, emit_text, None)
}

fn convert_checked(
    raw_path: &Path,
    cache_stem: &Path,
    emit_text: bool,
    expected: Option<Role>,
) -> Result<Converted> {
    let npy_path = cache_stem.with_extension(NpyRecorder::EXTENSION);
    info!(
        "reading from {}, output will be {}",
        raw_path.display(),
        npy_path.display()
    );

    let idx = idx::read_gz_idx(raw_path)?;
    let magic = idx.header.magic();
    let (role, array) = decode(idx)?;
    // cache names are fixed per role
    if expected.is_some_and(|r| r != role) {
        return Err(MnistError::BadMagic(magic));
    }
    info!("{:?} decoded, shape = {:?}", role, array.dim());

    let txt_path = emit_text.then(|| cache_stem.with_extension(TextRecorder::EXTENSION));
    persist(&array, &npy_path, txt_path.as_deref())?;
    info!("finished writing to file");

    Ok(Converted {
        role,
        shape: array.dim(),
        npy_path,
        txt_path,
    })
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

// Both files are staged under `.tmp` names and renamed into place only after
// every write succeeded.
fn persist(array: &Array2<u8>, npy_path: &Path, txt_path: Option<&Path>) -> Result<()> {
    let staged_npy = tmp_path(npy_path);
    let staged_txt = txt_path.map(tmp_path);

    let written = NpyRecorder::save(array, &staged_npy).and_then(|()| match &staged_txt {
        Some(staged) => TextRecorder::save(array, staged),
        None => Ok(()),
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&staged_npy);
        if let Some(staged) = &staged_txt {
            let _ = fs::remove_file(staged);
        }
        return Err(e);
    }

    fs::rename(&staged_npy, npy_path).map_err(MnistError::io(npy_path))?;
    if let (Some(staged), Some(txt_path)) = (&staged_txt, txt_path) {
        fs::rename(staged, txt_path).map_err(MnistError::io(txt_path))?;
    }
    Ok(())
}

/// Converts all four raw files in `data_dir`.
///
/// A file that fails to convert is reported and logged; the others are
/// still processed. A failed file gets neither its `.npy` nor its `.txt`
/// cache written.
pub fn convert_all(data_dir: &Path, emit_text: bool) -> Vec<ConvertReport> {
    RAW_FILES
        .iter()
        .map(|file| {
            let raw_path = data_dir.join(file.remote_name);
            let cache_stem = data_dir.join(file.cache_stem);
            let result = convert_checked(&raw_path, &cache_stem, emit_text, Some(file.role));
            if let Err(e) = &result {
                warn!("conversion of {} failed: {}", raw_path.display(), e);
            }
            ConvertReport { file: *file, result }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, io::Write};

    use flate2::{write::GzEncoder, Compression};
    use ndarray::{array, Axis};

    fn label_header(count: u32) -> Header {
        Header::Labels { count }
    }

    fn write_gz(path: &Path, words: &[u32], payload: &[u8]) {
        let mut enc = GzEncoder::new(fs::File::create(path).unwrap(), Compression::default());
        for w in words {
            enc.write_all(&w.to_be_bytes()).unwrap();
        }
        enc.write_all(payload).unwrap();
        enc.finish().unwrap();
    }

    #[test]
    fn labels_become_one_hot_rows() {
        let one_hot = decode_labels(&label_header(3), &[3, 0, 9]).unwrap();
        assert_eq!(
            one_hot,
            array![
                [0, 0, 0, 1, 0, 0, 0, 0, 0, 0],
                [1, 0, 0, 0, 0, 0, 0, 0, 0, 0],
                [0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
            ]
        );
        assert!(one_hot.sum_axis(Axis(1)).iter().all(|&s| s == 1));
    }

    #[test]
    fn images_are_reshaped_row_per_record() {
        let header = Header::Images { count: 2, rows: 2, cols: 2 };
        let images = decode_images(&header, (0..8).collect()).unwrap();
        assert_eq!(images, array![[0, 1, 2, 3], [4, 5, 6, 7]]);
    }

    #[test]
    fn zero_count_gives_zero_rows() {
        let header = Header::Images { count: 0, rows: 28, cols: 28 };
        assert_eq!(decode_images(&header, vec![]).unwrap().dim(), (0, 784));
        assert_eq!(decode_labels(&label_header(0), &[]).unwrap().dim(), (0, NUM_CLASSES));
    }

    #[test]
    fn short_image_payload_is_a_shape_mismatch() {
        let header = Header::Images { count: 2, rows: 28, cols: 28 };
        let err = decode_images(&header, vec![0; 784 + 10]).unwrap_err();
        assert!(matches!(err, MnistError::ShapeMismatch { expected: 1568, actual: 794 }));
    }

    #[test]
    fn overflowing_dimensions_are_reported_as_such() {
        let header = Header::Images {
            count: u32::MAX,
            rows: u32::MAX,
            cols: u32::MAX,
        };
        let err = decode_images(&header, vec![]).unwrap_err();
        assert!(matches!(
            err,
            MnistError::DimensionOverflow { count: u32::MAX, rows: u32::MAX, cols: u32::MAX }
        ));
    }

    #[test]
    fn failed_text_write_leaves_no_npy_cache() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("t10k-images-idx3-ubyte.gz");
        write_gz(&raw, &[idx::IMAGE_FILE, 1, 2, 2], &[1, 2, 3, 4]);
        // a directory where the staged text file would go makes its create fail
        fs::create_dir(dir.path().join("mnist-test-images.txt.tmp")).unwrap();

        let stem = dir.path().join("mnist-test-images");
        assert!(convert_file(&raw, &stem, true).is_err());
        assert!(!dir.path().join("mnist-test-images.npy").exists());
        assert!(!dir.path().join("mnist-test-images.npy.tmp").exists());
        assert!(!dir.path().join("mnist-test-images.txt").exists());

        let converted = convert_file(&raw, &stem, false).unwrap();
        assert_eq!(NpyRecorder::load(&converted.npy_path).unwrap(), array![[1u8, 2, 3, 4]]);
    }

    #[test]
    fn label_count_must_match_payload() {
        let err = decode_labels(&label_header(4), &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, MnistError::ShapeMismatch { expected: 4, actual: 3 }));
    }

    #[test]
    fn out_of_range_label_is_rejected() {
        let err = decode_labels(&label_header(3), &[1, 10, 2]).unwrap_err();
        assert!(matches!(err, MnistError::LabelOutOfRange { index: 1, value: 10 }));
    }

    #[test]
    fn decode_dispatches_on_header_kind() {
        let idx = IdxFile {
            header: label_header(1),
            payload: vec![4],
        };
        let (role, array) = decode(idx).unwrap();
        assert_eq!(role, Role::Labels);
        assert_eq!(array.dim(), (1, NUM_CLASSES));
    }

    #[test]
    fn convert_file_writes_npy_and_optional_text() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("t10k-labels-idx1-ubyte.gz");
        write_gz(&raw, &[idx::LABEL_FILE, 2], &[1, 0]);

        let stem = dir.path().join("mnist-test-labels");
        let converted = convert_file(&raw, &stem, true).unwrap();
        assert_eq!(converted.shape, (2, NUM_CLASSES));
        assert_eq!(converted.npy_path, dir.path().join("mnist-test-labels.npy"));
        assert_eq!(
            NpyRecorder::load(&converted.npy_path).unwrap(),
            TextRecorder::load(converted.txt_path.as_ref().unwrap()).unwrap()
        );
    }

    #[test]
    fn bad_magic_fails_only_that_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path();
        write_gz(&p.join("train-images-idx3-ubyte.gz"), &[idx::IMAGE_FILE, 1, 2, 2], &[1, 2, 3, 4]);
        write_gz(&p.join("train-labels-idx1-ubyte.gz"), &[1234, 1], &[7]);
        write_gz(&p.join("t10k-images-idx3-ubyte.gz"), &[idx::IMAGE_FILE, 0, 2, 2], &[]);
        write_gz(&p.join("t10k-labels-idx1-ubyte.gz"), &[idx::LABEL_FILE, 0], &[]);

        let reports = convert_all(p, false);
        assert_eq!(reports.len(), 4);
        assert!(matches!(reports[1].result, Err(MnistError::BadMagic(1234))));
        for i in [0, 2, 3] {
            assert!(reports[i].result.is_ok(), "{:?}", reports[i]);
        }
        assert!(!p.join("mnist-train-labels.npy").exists());
        assert!(!p.join("mnist-train-images.txt").exists());
    }

    #[test]
    fn labels_stored_under_image_name_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("train-images-idx3-ubyte.gz");
        write_gz(&raw, &[idx::LABEL_FILE, 1], &[3]);

        let reports = convert_all(dir.path(), false);
        assert!(matches!(reports[0].result, Err(MnistError::BadMagic(idx::LABEL_FILE))));
        assert!(!dir.path().join("mnist-train-images.npy").exists());
        assert!(reports[1].result.as_ref().unwrap_err().is_not_found());
    }

    #[test]
    fn converting_twice_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("train-images-idx3-ubyte.gz");
        write_gz(&raw, &[idx::IMAGE_FILE, 3, 2, 2], &(0..12).collect::<Vec<u8>>());
        let stem = dir.path().join("mnist-train-images");

        let first = convert_file(&raw, &stem, true).unwrap();
        let npy = fs::read(&first.npy_path).unwrap();
        let txt = fs::read(first.txt_path.as_ref().unwrap()).unwrap();

        let second = convert_file(&raw, &stem, true).unwrap();
        assert_eq!(fs::read(&second.npy_path).unwrap(), npy);
        assert_eq!(fs::read(second.txt_path.as_ref().unwrap()).unwrap(), txt);
    }
}
