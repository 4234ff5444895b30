use std::{
    io,
    path::{Path, PathBuf},
};

use log::{info, warn};

use super::common::*;
use super::error::{MnistError, Result};
use super::recorders::{NpyRecorder, Recorder};

#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(LoadedDataset),
    // A cache file of the split has not been written yet
    Missing {
        path: PathBuf,
        source: io::Error,
    },
}

impl LoadOutcome {
    pub fn dataset(self) -> Option<LoadedDataset> {
        match self {
            LoadOutcome::Loaded(ds) => Some(ds),
            LoadOutcome::Missing { .. } => None,
        }
    }
}

/// Loads the cached `.npy` arrays of the training split, or of the test
/// split when `test_set` is set.
pub fn load_mnist(data_dir: &Path, test_set: bool) -> Result<LoadOutcome> {
    load_mnist_with::<NpyRecorder>(data_dir, Split::from_test_flag(test_set))
}

pub fn load_mnist_with<R: Recorder>(data_dir: &Path, split: Split) -> Result<LoadOutcome> {
    let path_of = |role| {
        data_dir
            .join(RawFile::lookup(split, role).cache_stem)
            .with_extension(R::EXTENSION)
    };

    let data = match R::load(&path_of(Role::Images)) {
        Ok(array) => array,
        Err(e) => return missing_or_err(data_dir, e),
    };
    let labels = match R::load(&path_of(Role::Labels)) {
        Ok(array) => array,
        Err(e) => return missing_or_err(data_dir, e),
    };
    info!(
        "loaded {:?} split from {}: data {:?}, labels {:?}",
        split,
        data_dir.display(),
        data.dim(),
        labels.dim()
    );

    Ok(LoadOutcome::Loaded(LoadedDataset::new(data, labels)?))
}

fn missing_or_err(data_dir: &Path, err: MnistError) -> Result<LoadOutcome> {
    match err {
        MnistError::Io { path, source } if source.kind() == io::ErrorKind::NotFound => {
            warn!(
                "can't read formatted MNIST input file from {}",
                data_dir.display()
            );
            warn!("{}: {}", path.display(), source);
            Ok(LoadOutcome::Missing { path, source })
        }
        e => Err(e),
    }
}
