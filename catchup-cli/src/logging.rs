use anyhow::{anyhow, Result};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

const DEFAULT_LOG_FILTER: &str = "youtrack_catchup=info,catchup_youtrack=info,warn";
const VERBOSE_LOG_FILTER: &str =
    "youtrack_catchup=debug,catchup_youtrack=debug,catchup_summary=debug,warn";

pub fn init(verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose),
        )
        .with(filter)
        .try_init()
        .map_err(|error| anyhow!("failed to install log subscriber: {error}"))
}

fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    }
}
