//! Common test utilities, fixtures, and mocks shared by the integration tests.

#![allow(dead_code)]

pub mod fixtures;
pub mod mocks;

/// Common test setup and utilities
pub mod test_utils {
    use std::sync::Once;
    use tracing::Level;

    static INIT: Once = Once::new();

    /// Initialize tracing once per test binary so pipeline logs show up with
    /// `--nocapture`.
    pub fn init() {
        INIT.call_once(|| {
            tracing_subscriber::fmt()
                .with_max_level(Level::DEBUG)
                .with_test_writer()
                .init();
        });
    }
}
