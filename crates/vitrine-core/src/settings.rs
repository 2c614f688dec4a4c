//! Process settings.
//!
//! Vitrine has no configuration file and no command line flags. Everything is
//! read from the environment:
//!
//! | Variable | Default |
//! |---|---|
//! | `PORT` | `3000` |
//! | `VITRINE_JSON_ROOT` | `jsons` |
//! | `VITRINE_ASSETS_DIR` | `public/images` |
//! | `RUST_LOG` | `vitrine=info` |

use crate::env::{Env, EnvError};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Port used when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 3000;

/// Cache lifetime advertised for static assets (one day).
pub const DEFAULT_ASSET_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "vitrine=info";

/// Runtime settings for the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
	/// Interface the listener binds to.
	pub host: IpAddr,
	/// Listen port.
	pub port: u16,
	/// Directory tree holding `{category}/{file}.json` documents.
	pub json_root: PathBuf,
	/// Directory served under `/assets/`.
	pub assets_dir: PathBuf,
	/// `max-age` sent with static assets.
	pub asset_max_age: Duration,
	/// `tracing-subscriber` filter directives.
	pub log_filter: String,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
			port: DEFAULT_PORT,
			json_root: PathBuf::from("jsons"),
			assets_dir: PathBuf::from("public").join("images"),
			asset_max_age: DEFAULT_ASSET_MAX_AGE,
			log_filter: DEFAULT_LOG_FILTER.to_string(),
		}
	}
}

impl Settings {
	/// Loads settings from the process environment.
	///
	/// # Errors
	///
	/// Returns [`EnvError::ParseError`] when a variable is set to an invalid
	/// value, for example a non-numeric `PORT`.
	pub fn from_env() -> Result<Self, EnvError> {
		let defaults = Self::default();
		let plain = Env::new();
		let prefixed = Env::new().with_prefix("VITRINE_");

		Ok(Self {
			port: plain.port_with_default("PORT", defaults.port)?,
			json_root: prefixed.path_with_default("JSON_ROOT", defaults.json_root)?,
			assets_dir: prefixed.path_with_default("ASSETS_DIR", defaults.assets_dir)?,
			log_filter: plain.str_with_default("RUST_LOG", Some(&defaults.log_filter))?,
			..defaults
		})
	}

	/// Returns the socket address to listen on.
	pub fn listen_addr(&self) -> SocketAddr {
		SocketAddr::new(self.host, self.port)
	}

	/// Sets the JSON root directory.
	pub fn with_json_root(mut self, path: impl Into<PathBuf>) -> Self {
		self.json_root = path.into();
		self
	}

	/// Sets the assets directory.
	pub fn with_assets_dir(mut self, path: impl Into<PathBuf>) -> Self {
		self.assets_dir = path.into();
		self
	}
}
