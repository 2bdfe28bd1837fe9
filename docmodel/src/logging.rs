//! Tracing bootstrap for applications built on docmodel.
//!
//! The library itself only emits `tracing` events (`debug!` for store round trips,
//! `warn!` for skipped fields while decoding external payloads). Call [`init`] once
//! at startup to print them.

use std::io;
use tracing_subscriber::{
    EnvFilter, fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Installs a global fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` (e.g. `"docmodel=debug"`).
///
/// Returns `false` if a global subscriber was already installed; the existing one is
/// left in place.
pub fn init(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(Layer::new().with_writer(io::stderr).with_target(true))
        .try_init()
        .is_ok()
}
