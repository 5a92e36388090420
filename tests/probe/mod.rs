//! Probe scenarios against an in-memory server that applies the same
//! flow-control rules the probe models.


use tracing::Level;

/// Route probe and server logs through the test harness.
pub(crate) fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}
