//! Diagnostic logging setup.
//!
//! Logs go to stderr through `tracing-subscriber`; stdout is reserved for
//! the per-file progress lines.

use tracing_subscriber::EnvFilter;

/// Builds the log filter: `RUST_LOG` wins, otherwise `info` or `debug`.
pub fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

/// Installs the global subscriber. Safe to call more than once.
pub fn init(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "audiogen_batch=debug,info"
    } else {
        "info"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_raises_crate_level() {
        assert_eq!(default_directive(false), "info");
        assert!(default_directive(true).contains("audiogen_batch=debug"));
    }

    #[test]
    fn init_twice_does_not_panic() {
        init(false);
        init(true);
    }
}
