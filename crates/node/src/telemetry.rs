// Path: crates/node/src/telemetry.rs
//! Wires the global `tracing` subscriber once at process start. No
//! separate "logging setup" subsystem exists beyond this: every engine
//! crate emits `tracing` events directly and relies on whatever subscriber
//! the binary installed here.

use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber: an `EnvFilter` defaulting to `info`
/// (override with `RUST_LOG`), and either plain or JSON-formatted output to
/// stderr. JSON formatting is meant for production log aggregation; plain
/// text is easier to read while developing against a local node.
pub fn init(json: bool) -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().try_init().map_err(|e| anyhow::anyhow!(e))?;
    } else {
        builder.try_init().map_err(|e| anyhow::anyhow!(e))?;
    }
    Ok(())
}
