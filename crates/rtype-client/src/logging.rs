//! Tracing setup for binaries and tests.

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` (e.g. `"rtype_client=info"`) when it is unset or
/// invalid.
///
/// Returns `false` if a global subscriber was already installed, which
/// makes it safe to call from every test.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_second_call_is_harmless() {
        init_tracing("rtype_client=debug");
        assert!(!init_tracing("rtype_client=debug"));
    }
}
