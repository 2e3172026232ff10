/*
 * Logging Module
 *
 * Thin wrapper around env_logger so the binary, the viewer and the tests
 * all configure logging the same way. RUST_LOG still wins when it is set.
 */

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Initializes the global logger.
///
/// With `verbose` every state transition is logged at debug level,
/// otherwise only info and above are shown.
pub fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let env = Env::default().default_filter_or(level.to_string());
    let mut builder = Builder::from_env(env);

    // A second call (tests, viewer restarts) finds a logger already set.
    let _ = builder.try_init();
}
