pub mod common;
pub mod config;
pub mod converter;
pub mod data_loader;
pub mod error;
pub mod fetcher;
pub mod idx;
pub mod recorders;

pub use common::{LoadedDataset, RawFile, Role, Split, RAW_FILES};
pub use config::MnistConfig;
pub use converter::convert_all;
pub use data_loader::{load_mnist, LoadOutcome};
pub use error::{MnistError, Result};
pub use fetcher::fetch_all;
