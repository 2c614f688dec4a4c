//! Tracing subscriber setup for the binary.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use vitrine_core::settings::DEFAULT_LOG_FILTER;

/// Builds the filter for `directives`, falling back to
/// [`DEFAULT_LOG_FILTER`] when they do not parse.
pub fn env_filter(directives: &str) -> EnvFilter {
	EnvFilter::try_new(directives).unwrap_or_else(|err| {
		eprintln!("ignoring invalid log filter {directives:?}: {err}");
		EnvFilter::new(DEFAULT_LOG_FILTER)
	})
}

/// Installs the global `fmt` subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init(directives: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
	tracing_subscriber::registry()
		.with(tracing_subscriber::fmt::layer())
		.with(env_filter(directives))
		.try_init()
}
