//! Public surface for promptvault.
//!
//! Re-exports the workspace crates and provides the logging setup shared by
//! the binary and embedders.

/// Re-export for convenience.
pub use promptvault_config as config;
pub use promptvault_core as core;
/// Re-export for convenience.
pub use promptvault_protocol as protocol;
pub use promptvault_store as store;

/// Install `env_logger` with millisecond timestamps, honouring `RUST_LOG`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();
}
