//! Logging setup for processes embedding the shipper.

use tracing_subscriber::EnvFilter;

fn filter(verbose: bool) -> EnvFilter {
    let default = if verbose {
        "eventship=debug,eventship_dispatch=debug,eventship_core=debug"
    } else {
        "eventship=info,eventship_dispatch=info,eventship_core=info"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install a human-readable subscriber. `RUST_LOG` overrides the default
/// filter. Returns `false` if a global subscriber was already set.
pub fn init(verbose: bool) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_target(false)
        .try_init()
        .is_ok()
}

/// Same as [`init`] but one JSON object per line.
pub fn init_json(verbose: bool) -> bool {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter(verbose))
        .try_init()
        .is_ok()
}
