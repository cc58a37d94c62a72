use std::io;

use tracing_subscriber::EnvFilter;

use crate::global::Config;

/// Sends `tracing` events to stderr, filtered by the session's directive.
/// A second call keeps the subscriber that is already installed.
pub fn init(config: &Config) {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::new(&config.log_directive))
		.with_writer(io::stderr)
		.with_target(false)
		.try_init();
}
