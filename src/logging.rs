//! Diagnostic logging for the binary.
//!
//! Library code only emits `tracing` events; the subscriber is installed
//! once by `main`.  User-facing messages go through `cli::output` instead.

use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the log filter.
pub const LOG_ENV: &str = "FOLDERVAULT_LOG";

/// Filter directive for a `-v` count: warnings by default, then info,
/// debug, trace.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "foldervault=info,warn",
        2 => "foldervault=debug,info",
        _ => "trace",
    }
}

/// Install a stderr fmt subscriber.
///
/// `FOLDERVAULT_LOG` takes precedence over `verbosity`.  Calling this
/// twice is harmless: the second install is ignored.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_level() {
        assert_eq!(default_directive(0), "warn");
        assert!(default_directive(1).contains("info"));
        assert!(default_directive(2).contains("debug"));
        assert_eq!(default_directive(9), "trace");
    }

    #[test]
    fn every_directive_parses() {
        for v in 0..4 {
            assert!(EnvFilter::try_new(default_directive(v)).is_ok());
        }
    }
}
