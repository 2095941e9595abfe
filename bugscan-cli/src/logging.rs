use color_eyre::eyre::Result;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_ENV: &str = "BUGSCAN_LOGLEVEL";

/// Default filter for a `-v` count when neither `RUST_LOG` nor
/// `BUGSCAN_LOGLEVEL` is set.
fn default_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "bugscan=warn",
        1 => "bugscan=info",
        _ => "bugscan=debug",
    }
}

/// Initializes stderr logging using the tracing subscriber.
///
/// Stdout is left to the scan output.
pub fn initialize_logging(verbose: u8) -> Result<()> {
    let log_level = std::env::var("RUST_LOG")
        .or_else(|_| std::env::var(LOG_ENV))
        .unwrap_or_else(|_| default_level(verbose).to_string());

    let stderr_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::try_new(log_level)?);

    tracing_subscriber::registry()
        .with(stderr_subscriber)
        .with(ErrorLayer::default())
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_raises_default_level() {
        assert_eq!(default_level(0), "bugscan=warn");
        assert_eq!(default_level(1), "bugscan=info");
        assert_eq!(default_level(2), "bugscan=debug");
        assert_eq!(default_level(9), "bugscan=debug");
    }
}
