//! # Vitrine Core
//!
//! Shared building blocks for the Vitrine content server:
//!
//! - [`error`] - the [`ContentError`] taxonomy and its mapping to HTTP status codes
//! - [`resolver`] - root-contained path resolution ([`RootDir`], [`JsonRoot`])
//! - [`settings`] - process settings loaded from environment variables
//!
//! ## Example
//!
//! ```rust,no_run
//! use vitrine_core::{JsonRoot, Settings};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::from_env()?;
//! let root = JsonRoot::open(&settings.json_root)?;
//! let path = root.resolve("categories", "pages").await?;
//! println!("{}", path.as_path().display());
//! # Ok(())
//! # }
//! ```

#![warn(rustdoc::broken_intra_doc_links)]

pub mod env;
pub mod error;
pub mod resolver;
pub mod settings;

pub use env::{Env, EnvError};
pub use error::{ContentError, ErrorKind, Result, status_for};
pub use resolver::{DocumentPath, JsonRoot, RootDir, normalize_lexically};
pub use settings::Settings;
