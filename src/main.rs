use std::time::Instant;

use log::{error, info, warn};

use mnist_cache::{LoadOutcome, MnistConfig, RAW_FILES};

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = MnistConfig {
        force_download: false,
        ..MnistConfig::with_data_dir("tmp/mnist")
    };

    let start_time = Instant::now();
    match config.fetch() {
        Ok(reports) => {
            for r in reports.iter().filter(|r| r.is_failed()) {
                warn!("{} not fetched: {:?}", r.url, r.outcome);
            }
        }
        Err(e) => {
            error!("{}", e);
            return;
        }
    }

    let failed = config.convert().iter().filter(|r| r.result.is_err()).count();
    if failed > 0 {
        warn!("{} of {} files failed to convert", failed, RAW_FILES.len());
    }

    match config.load(false) {
        Ok(LoadOutcome::Loaded(ds)) => info!(
            "training set: data {:?}, labels {:?}",
            ds.data.dim(),
            ds.labels.dim()
        ),
        Ok(LoadOutcome::Missing { path, .. }) => warn!("no cache at {}", path.display()),
        Err(e) => error!("{}", e),
    }
    info!("Done: time({:?})", start_time.elapsed());
}
