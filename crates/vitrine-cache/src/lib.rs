//! # Vitrine Cache
//!
//! In-memory cache of parsed JSON documents, invalidated by filesystem
//! notifications.
//!
//! ## Components
//!
//! - [`JsonCache`]: concurrent map from canonical path to parsed document
//! - [`DocumentSource`]: where bytes come from on a miss ([`FsSource`] by default)
//! - [`ChangeWatcher`]: recursive `notify` subscription on the JSON root
//! - [`Invalidator`]: single consumer task that evicts changed entries
//!
//! ## Example
//!
//! ```rust,no_run
//! use vitrine_cache::{ChangeWatcher, Invalidator, JsonCache};
//! use vitrine_core::JsonRoot;
//!
//! # async fn example() -> vitrine_core::Result<()> {
//! let root = JsonRoot::open("jsons")?;
//! let cache = JsonCache::new();
//!
//! let (watcher, events) = ChangeWatcher::new(&root)?;
//! let _task = Invalidator::new(cache.clone(), root.clone()).spawn(events);
//!
//! let path = root.resolve("categories", "pages").await?;
//! let document = cache.get(&path).await?;
//! # drop((watcher, document));
//! # Ok(())
//! # }
//! ```

pub mod invalidator;
pub mod source;
pub mod store;
pub mod watcher;

pub use invalidator::Invalidator;
pub use source::{DocumentSource, FsSource};
pub use store::{CacheStatistics, JsonCache};
pub use watcher::{ChangeWatcher, WatchEvent};
