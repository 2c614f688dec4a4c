//! Environment variable access with optional prefix support.

use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading environment variables.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvError {
	/// A required variable is not set.
	#[error("missing environment variable: {0}")]
	MissingVariable(String),

	/// A variable is set but cannot be parsed.
	///
	/// Only the length of the offending value is kept so secrets never end up
	/// in logs.
	#[error("failed to parse {key} (value length {value_len}): {error}")]
	ParseError {
		/// Full variable name.
		key: String,
		/// Length of the rejected value.
		value_len: usize,
		/// Parser message.
		error: String,
	},

	/// The variable name is not a valid environment key.
	#[error("invalid environment variable name: {0}")]
	InvalidName(String),
}

/// Environment variable reader.
#[derive(Debug, Clone, Default)]
pub struct Env {
	/// Optional prefix for every lookup (e.g. `VITRINE_`).
	pub prefix: Option<String>,
}

impl Env {
	/// Creates a reader without prefix.
	pub fn new() -> Self {
		Self { prefix: None }
	}

	/// Sets a prefix for all lookups.
	///
	/// # Examples
	///
	/// ```
	/// use vitrine_core::Env;
	///
	/// let env = Env::new().with_prefix("VITRINE_");
	/// assert_eq!(env.prefix.as_deref(), Some("VITRINE_"));
	/// ```
	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = Some(prefix.into());
		self
	}

	fn key_name(&self, key: &str) -> String {
		match &self.prefix {
			Some(prefix) => format!("{}{}", prefix, key),
			None => key.to_string(),
		}
	}

	fn lookup(&self, key: &str) -> Result<Option<(String, String)>, EnvError> {
		let full_key = self.key_name(key);
		validate_name(&full_key)?;
		Ok(env::var(&full_key).ok().map(|value| (full_key, value)))
	}

	/// Reads a string value, falling back to `default`.
	pub fn str_with_default(&self, key: &str, default: Option<&str>) -> Result<String, EnvError> {
		match self.lookup(key)? {
			Some((_, value)) => Ok(value),
			None => default
				.map(str::to_string)
				.ok_or_else(|| EnvError::MissingVariable(self.key_name(key))),
		}
	}

	/// Reads a port number, falling back to `default` when the variable is
	/// unset or blank.
	pub fn port_with_default(&self, key: &str, default: u16) -> Result<u16, EnvError> {
		match self.lookup(key)? {
			Some((full_key, value)) if !value.trim().is_empty() => {
				value
					.trim()
					.parse::<u16>()
					.map_err(|e| EnvError::ParseError {
						key: full_key,
						value_len: value.len(),
						error: e.to_string(),
					})
			}
			_ => Ok(default),
		}
	}

	/// Reads a filesystem path, falling back to `default`.
	pub fn path_with_default(&self, key: &str, default: PathBuf) -> Result<PathBuf, EnvError> {
		match self.lookup(key)? {
			Some((_, value)) if !value.is_empty() => Ok(PathBuf::from(value)),
			_ => Ok(default),
		}
	}
}

fn validate_name(name: &str) -> Result<(), EnvError> {
	let valid = !name.is_empty()
		&& name
			.chars()
			.all(|c| c.is_ascii_alphanumeric() || c == '_');
	if valid {
		Ok(())
	} else {
		Err(EnvError::InvalidName(name.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serial_test::serial;

	#[rstest]
	#[serial]
	fn test_port_default_when_unset() {
		unsafe { env::remove_var("VITRINE_TEST_PORT") };
		let port = Env::new().port_with_default("VITRINE_TEST_PORT", 3000).unwrap();
		assert_eq!(port, 3000);
	}

	#[rstest]
	#[case("")]
	#[case("  ")]
	#[serial]
	fn test_port_default_when_blank(#[case] value: &str) {
		unsafe { env::set_var("VITRINE_TEST_PORT", value) };
		let port = Env::new().port_with_default("VITRINE_TEST_PORT", 3000);
		unsafe { env::remove_var("VITRINE_TEST_PORT") };
		assert_eq!(port.unwrap(), 3000);
	}

	#[rstest]
	#[serial]
	fn test_port_parsed() {
		unsafe { env::set_var("VITRINE_TEST_PORT", "8081") };
		let port = Env::new().port_with_default("VITRINE_TEST_PORT", 3000).unwrap();
		unsafe { env::remove_var("VITRINE_TEST_PORT") };
		assert_eq!(port, 8081);
	}

	#[rstest]
	#[serial]
	fn test_port_invalid_value() {
		unsafe { env::set_var("VITRINE_TEST_PORT", "http") };
		let err = Env::new()
			.port_with_default("VITRINE_TEST_PORT", 3000)
			.unwrap_err();
		unsafe { env::remove_var("VITRINE_TEST_PORT") };
		assert!(matches!(err, EnvError::ParseError { value_len: 4, .. }));
	}

	#[rstest]
	#[serial]
	fn test_prefixed_path() {
		unsafe { env::set_var("VITRINE_TEST_DIR", "/srv/content") };
		let path = Env::new()
			.with_prefix("VITRINE_")
			.path_with_default("TEST_DIR", PathBuf::from("fallback"))
			.unwrap();
		unsafe { env::remove_var("VITRINE_TEST_DIR") };
		assert_eq!(path, PathBuf::from("/srv/content"));
	}

	#[rstest]
	fn test_missing_required_string() {
		let err = Env::new()
			.with_prefix("VITRINE_")
			.str_with_default("SURELY_UNSET_VARIABLE", None)
			.unwrap_err();
		assert_eq!(
			err,
			EnvError::MissingVariable("VITRINE_SURELY_UNSET_VARIABLE".to_string())
		);
	}

	#[rstest]
	fn test_invalid_name() {
		let err = Env::new().str_with_default("BAD-NAME", Some("x")).unwrap_err();
		assert_eq!(err, EnvError::InvalidName("BAD-NAME".to_string()));
	}
}
