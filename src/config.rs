use std::{fs::File, path::{Path, PathBuf}};

use serde::{Deserialize, Serialize};

use super::converter::{self, ConvertReport};
use super::data_loader::{self, LoadOutcome};
use super::error::{MnistError, Result};
use super::fetcher::{self, FetchReport};

/// Where the dataset comes from and where it is cached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MnistConfig {
    pub base_url: String,
    pub data_dir: PathBuf,
    /// Re-download files that already exist locally.
    pub force_download: bool,
    /// Also write `.txt` renderings next to the `.npy` caches.
    pub text_format: bool,
}

impl Default for MnistConfig {
    fn default() -> Self {
        MnistConfig {
            base_url: "http://yann.lecun.com/exdb/mnist/".into(),
            data_dir: PathBuf::from("./mnist/"),
            force_download: true,
            text_format: false,
        }
    }
}

impl MnistConfig {
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        MnistConfig {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    pub fn from_json_file(file_path: &Path) -> Result<Self> {
        let file = File::open(file_path).map_err(MnistError::io(file_path))?;
        Ok(serde_json::from_reader(file)?)
    }

    pub fn save_json(&self, file_path: &Path) -> Result<()> {
        let file = File::create(file_path).map_err(MnistError::io(file_path))?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn fetch(&self) -> Result<Vec<FetchReport>> {
        fetcher::fetch_all(&self.base_url, &self.data_dir, self.force_download)
    }

    pub fn convert(&self) -> Vec<ConvertReport> {
        converter::convert_all(&self.data_dir, self.text_format)
    }

    pub fn load(&self, test_set: bool) -> Result<LoadOutcome> {
        data_loader::load_mnist(&self.data_dir, test_set)
    }
}
