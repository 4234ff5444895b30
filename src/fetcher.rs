use std::{
    fs,
    io::Read,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};

use super::common::{RawFile, RAW_FILES};
use super::error::{MnistError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    Written { bytes: usize },
    // Local copy kept because overwriting was not requested
    Skipped,
    // No status for transport-level failures
    Failed { status: Option<u16>, reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchReport {
    pub file: RawFile,
    pub url: String,
    pub path: PathBuf,
    pub outcome: FetchOutcome,
}

impl FetchReport {
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, FetchOutcome::Failed { .. })
    }
}

pub fn file_url(base_url: &str, name: &str) -> String {
    if base_url.ends_with('/') {
        format!("{}{}", base_url, name)
    } else {
        format!("{}/{}", base_url, name)
    }
}

/// Downloads the four compressed dataset files into `data_dir`.
///
/// `data_dir` has to exist already. A file whose request fails is reported
/// as `FetchOutcome::Failed` and the remaining files are still fetched; only
/// a missing directory or a local write error aborts the batch.
pub fn fetch_all(
    base_url: &str,
    data_dir: &Path,
    force_download: bool,
) -> Result<Vec<FetchReport>> {
    if !data_dir.is_dir() {
        warn!("can't find data directory {}", data_dir.display());
        return Err(MnistError::MissingDirectory(data_dir.to_path_buf()));
    }

    let agent = ureq::Agent::new();
    let reports = RAW_FILES
        .iter()
        .map(|file| fetch_one(&agent, base_url, data_dir, file, force_download))
        .collect::<Result<Vec<_>>>()?;
    info!("done");
    Ok(reports)
}

fn fetch_one(
    agent: &ureq::Agent,
    base_url: &str,
    data_dir: &Path,
    file: &RawFile,
    force_download: bool,
) -> Result<FetchReport> {
    let path = data_dir.join(file.remote_name);
    let url = file_url(base_url, file.remote_name);

    let outcome = if path.exists() && !force_download {
        info!("output file already exists, skipping download {}", path.display());
        FetchOutcome::Skipped
    } else {
        info!("downloading {}", url);
        match agent.get(&url).call() {
            Ok(response) if response.status() == 200 => {
                let mut body = Vec::new();
                match response.into_reader().read_to_end(&mut body) {
                    Ok(bytes) => {
                        info!("writing to {}", path.display());
                        fs::write(&path, &body).map_err(MnistError::io(&path))?;
                        debug!("wrote {} bytes", bytes);
                        FetchOutcome::Written { bytes }
                    }
                    Err(e) => {
                        warn!("reading response from {} failed: {}", url, e);
                        FetchOutcome::Failed {
                            status: Some(200),
                            reason: e.to_string(),
                        }
                    }
                }
            }
            Ok(response) | Err(ureq::Error::Status(_, response)) => bad_response(response),
            Err(ureq::Error::Transport(transport)) => {
                warn!("request to {} failed: {}", url, transport);
                FetchOutcome::Failed {
                    status: None,
                    reason: transport.to_string(),
                }
            }
        }
    };

    Ok(FetchReport {
        file: *file,
        url,
        path,
        outcome,
    })
}

fn bad_response(response: ureq::Response) -> FetchOutcome {
    let status = response.status();
    warn!("bad response {}", status);
    for name in response.headers_names() {
        if let Some(value) = response.header(&name) {
            warn!("  {}: {}", name, value);
        }
    }
    FetchOutcome::Failed {
        status: Some(status),
        reason: response.status_text().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_with_single_slash() {
        assert_eq!(
            file_url("http://host/mnist/", "a.gz"),
            "http://host/mnist/a.gz"
        );
        assert_eq!(file_url("http://host/mnist", "a.gz"), "http://host/mnist/a.gz");
    }

    #[test]
    fn missing_directory_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("not-there");
        let err = fetch_all("http://127.0.0.1:9/", &missing, true).unwrap_err();
        assert!(matches!(err, MnistError::MissingDirectory(p) if p == missing));
    }

    #[test]
    fn existing_files_are_skipped_without_force() {
        let dir = tempfile::tempdir().unwrap();
        for file in RAW_FILES.iter() {
            fs::write(dir.path().join(file.remote_name), b"cached").unwrap();
        }

        // Nothing listens on the discard port, so any request would fail.
        let reports = fetch_all("http://127.0.0.1:9/", dir.path(), false).unwrap();
        assert_eq!(reports.len(), 4);
        assert!(reports.iter().all(|r| r.outcome == FetchOutcome::Skipped));
        let kept = fs::read(dir.path().join(RAW_FILES[0].remote_name)).unwrap();
        assert_eq!(kept, b"cached");
    }
}
