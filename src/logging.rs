//! Logging setup.
//!
//! The library only emits through the `log` facade. Binaries and test suites
//! install `env_logger` through the helpers here.

use std::sync::Once;

/// Filter used when neither an explicit level nor `RUST_LOG` is given.
pub const DEFAULT_LOG_LEVEL: &str = "info";

static TEST_INIT: Once = Once::new();

/// Installs `env_logger`. `RUST_LOG` takes precedence over `level`.
///
/// Calling this more than once is a no-op.
pub fn init_logging(level: Option<&str>) {
    let default = level.unwrap_or(DEFAULT_LOG_LEVEL);
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, default),
    )
    .try_init();
}

/// Installs a test-friendly logger that writes through the test harness.
pub fn init_test_logging() {
    TEST_INIT.call_once(|| {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init()
            .unwrap_or(());
    });
}
