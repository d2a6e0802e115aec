//! Logging setup
//!
//! The renderer only talks to the `log` facade. Hosts pick the logger; the
//! helpers here install `env_logger` for binaries and tests.

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    env_logger::init();
}

/// Initialize logging for unit tests
///
/// Safe to call from every test; only the first call installs the logger.
pub fn init_for_tests() {
    let _ = env_logger::builder().is_test(true).try_init();
}
