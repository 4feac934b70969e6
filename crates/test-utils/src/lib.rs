pub mod builders;
pub mod events;
pub mod scripts;

use std::sync::Once;
use std::time::Duration;

use renderq::engine::EngineOptions;
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Run a future with a 10-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(10), f)
        .await
        .expect("Test timed out after 10 seconds")
}

/// Engine options with short intervals, writing logs under `logs_dir`.
pub fn fast_options(logs_dir: &std::path::Path) -> EngineOptions {
    EngineOptions {
        logs_dir: logs_dir.to_path_buf(),
        poll_interval: Duration::from_millis(20),
        status_interval: Duration::from_millis(50),
        drain_timeout: Duration::from_millis(500),
    }
}
