//! Shared test utilities for open-metadata Rust clients.
//!
//! This crate provides:
//! - Proptest generators for session inputs
//! - A wiremock-backed mock platform with response envelopes

pub mod fixtures;
pub mod generators;

pub use fixtures::*;
pub use generators::*;

/// Install a test subscriber once; later calls are no-ops.
pub fn init_test_tracing() {
    let config = platform_common::TracingConfig::default()
        .with_service_name("open-metadata-tests")
        .with_log_level("open_metadata_client=debug")
        .for_tests();
    let _ = platform_common::init_tracing(&config);
}
