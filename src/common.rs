use std::iter;

use ndarray::{Array2, ArrayView1, Axis};

use super::error::{MnistError, Result};

pub type ImageArray = Array2<u8>;
pub type LabelArray = Array2<u8>;

pub const NUM_CLASSES: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn from_test_flag(test_set: bool) -> Self {
        if test_set { Split::Test } else { Split::Train }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Images,
    Labels,
}

/// One of the four compressed files making up the dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawFile {
    pub split: Split,
    pub role: Role,
    /// Name on the download site, also used for the local copy.
    pub remote_name: &'static str,
    /// File name of the converted array, without extension.
    pub cache_stem: &'static str,
}

pub const RAW_FILES: [RawFile; 4] = [
    RawFile {
        split: Split::Train,
        role: Role::Images,
        remote_name: "train-images-idx3-ubyte.gz",
        cache_stem: "mnist-train-images",
    },
    RawFile {
        split: Split::Train,
        role: Role::Labels,
        remote_name: "train-labels-idx1-ubyte.gz",
        cache_stem: "mnist-train-labels",
    },
    RawFile {
        split: Split::Test,
        role: Role::Images,
        remote_name: "t10k-images-idx3-ubyte.gz",
        cache_stem: "mnist-test-images",
    },
    RawFile {
        split: Split::Test,
        role: Role::Labels,
        remote_name: "t10k-labels-idx1-ubyte.gz",
        cache_stem: "mnist-test-labels",
    },
];

impl RawFile {
    pub fn lookup(split: Split, role: Role) -> &'static RawFile {
        let index = match (split, role) {
            (Split::Train, Role::Images) => 0,
            (Split::Train, Role::Labels) => 1,
            (Split::Test, Role::Images) => 2,
            (Split::Test, Role::Labels) => 3,
        };
        &RAW_FILES[index]
    }
}

/// Images and one-hot labels of one split, row for row.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadedDataset {
    pub data: ImageArray,
    pub labels: LabelArray,
}

impl LoadedDataset {
    pub fn new(data: ImageArray, labels: LabelArray) -> Result<Self> {
        let (rows, classes) = (data.len_of(Axis(0)), labels.len_of(Axis(0)));
        if rows != classes {
            return Err(MnistError::RowCountMismatch {
                data: rows,
                labels: classes,
            });
        }
        Ok(LoadedDataset { data, labels })
    }

    pub fn len(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn elem(&self, index: usize) -> (ArrayView1<u8>, ArrayView1<u8>) {
        (
            self.data.index_axis(Axis(0), index),
            self.labels.index_axis(Axis(0), index),
        )
    }

    /// Position of the hot entry in a label row.
    pub fn class_of(&self, index: usize) -> Option<usize> {
        self.labels
            .index_axis(Axis(0), index)
            .iter()
            .position(|&v| v == 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArrayView1<u8>, Option<usize>)> {
        iter::zip(
            self.data.outer_iter(),
            self.labels.outer_iter().map(|row| row.iter().position(|&v| v == 1)),
        )
    }
}
