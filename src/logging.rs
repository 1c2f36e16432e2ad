//! Logger setup for binaries and tests built on this crate.

use std::sync::Once;


/// `env_filter` follows the `env_logger` filter syntax, e.g. `"info"` or `"gl_resources=debug"`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
	pub env_filter: Option<String>,
	pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		LoggingConfig {
			env_filter: None,
			write_style: env_logger::WriteStyle::Auto,
		}
	}
}


static INIT: Once = Once::new();

/// Installs the global logger. Later calls are ignored.
///
/// Without an explicit filter `RUST_LOG` is honoured, falling back to `info`.
pub fn init_logging(config: LoggingConfig) {
	INIT.call_once(|| {
		let mut builder = env_logger::Builder::new();

		if let Some(filter) = config.env_filter {
			builder.parse_filters(&filter);
		} else if let Ok(filter) = std::env::var("RUST_LOG") {
			builder.parse_filters(&filter);
		} else {
			builder.filter_level(log::LevelFilter::Info);
		}

		builder.write_style(config.write_style);

		// Another logger may already be installed by the host.
		if builder.try_init().is_err() {
			return
		}

		log::debug!("logging initialized");
	});
}
