//! Logging initialization.
//!
//! The library only emits `tracing` events; binaries call [`init`] once to install a
//! subscriber. Output goes to stderr so stdout stays free for the summary.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT_ONCE: Once = Once::new();

/// Default filter directive for the given verbosity
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "fataar_attrs=debug"
    } else {
        "fataar_attrs=info"
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over `verbose`.
/// Later calls are no-ops.
pub fn init(verbose: bool) {
    INIT_ONCE.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

        // Another subscriber may already be installed by an embedding host
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_idempotent() {
        init(false);
        init(true);
        init(false);
    }

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(false), "fataar_attrs=info");
        assert_eq!(default_directive(true), "fataar_attrs=debug");
    }
}
