use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global fmt subscriber once. `RUST_LOG` is honoured unless
/// `quiet` is set, in which case all output is suppressed.
pub fn init_tracing(quiet: bool) {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = if quiet {
            EnvFilter::new("off")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        };
        let _ = fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .try_init();
    });
}
