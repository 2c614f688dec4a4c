//! Concurrent store of parsed JSON documents.

use dashmap::DashMap;
use serde_json::Value;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use vitrine_core::{ContentError, DocumentPath, Result};

use crate::source::{DocumentSource, FsSource};

/// Point-in-time view of the cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatistics {
	/// Lookups answered from memory.
	pub hits: u64,
	/// Lookups that went to the source.
	pub misses: u64,
	/// Misses that read and parsed successfully.
	pub loads: u64,
	/// Entries removed by invalidation.
	pub evictions: u64,
	/// Entries currently stored.
	pub entries: usize,
}

impl CacheStatistics {
	/// Hit rate in `[0.0, 1.0]`, or `0.0` before the first lookup.
	pub fn hit_rate(&self) -> f64 {
		let total = self.hits + self.misses;
		if total == 0 {
			0.0
		} else {
			self.hits as f64 / total as f64
		}
	}
}

struct Inner {
	entries: DashMap<PathBuf, Arc<Value>>,
	source: Arc<dyn DocumentSource>,
	hits: AtomicU64,
	misses: AtomicU64,
	loads: AtomicU64,
	evictions: AtomicU64,
	generation: AtomicU64,
	/// Generation of the latest invalidation of each path.
	invalidated: DashMap<PathBuf, u64>,
	/// Generation of the latest [`JsonCache::clear`].
	cleared: AtomicU64,
}

impl Inner {
	/// Returns true if `key` or one of its ancestors was invalidated after
	/// `generation`.
	fn invalidated_since(&self, key: &Path, generation: u64) -> bool {
		if self.cleared.load(Ordering::SeqCst) > generation {
			return true;
		}
		key.ancestors().any(|prefix| {
			self.invalidated
				.get(prefix)
				.is_some_and(|latest| *latest > generation)
		})
	}
}

/// Cache of parsed JSON documents keyed by canonical path.
///
/// Cloning is cheap; all clones share the same entries. Documents are handed
/// out as `Arc<Value>` and never mutated in place.
///
/// Entries have no TTL and no size bound. They live until [`invalidate`]
/// removes them.
///
/// Concurrent misses for the same key may both read the source; the last
/// insert wins. A miss whose read overlaps an invalidation of its key (or of a
/// directory containing it) returns its document to the caller but does not
/// keep it, so the next lookup after an invalidation always reaches the
/// source. Invalidations of unrelated paths do not affect a fill.
///
/// [`invalidate`]: JsonCache::invalidate
#[derive(Clone)]
pub struct JsonCache {
	inner: Arc<Inner>,
}

impl JsonCache {
	/// Creates an empty cache reading from the local filesystem.
	pub fn new() -> Self {
		Self::with_source(Arc::new(FsSource))
	}

	/// Creates an empty cache reading from `source`.
	pub fn with_source(source: Arc<dyn DocumentSource>) -> Self {
		Self {
			inner: Arc::new(Inner {
				entries: DashMap::new(),
				source,
				hits: AtomicU64::new(0),
				misses: AtomicU64::new(0),
				loads: AtomicU64::new(0),
				evictions: AtomicU64::new(0),
				generation: AtomicU64::new(0),
				invalidated: DashMap::new(),
				cleared: AtomicU64::new(0),
			}),
		}
	}

	/// Returns the document at `path`, loading and parsing it on a miss.
	///
	/// # Errors
	///
	/// - [`ContentError::NotFound`] if the file does not exist
	/// - [`ContentError::Io`] if it cannot be read
	/// - [`ContentError::Parse`] if it is not valid JSON
	///
	/// No entry is created on failure.
	pub async fn get(&self, path: &DocumentPath) -> Result<Arc<Value>> {
		let key = path.as_path();

		if let Some(document) = self.inner.entries.get(key).map(|entry| Arc::clone(entry.value())) {
			self.inner.hits.fetch_add(1, Ordering::Relaxed);
			tracing::debug!(path = %key.display(), "cache hit");
			return Ok(document);
		}

		self.inner.misses.fetch_add(1, Ordering::Relaxed);
		tracing::debug!(path = %key.display(), "cache miss");

		let generation = self.inner.generation.load(Ordering::SeqCst);
		let bytes = self.inner.source.read(key).await?;
		let document: Value = serde_json::from_slice(&bytes).map_err(|source| ContentError::Parse {
			path: key.to_path_buf(),
			source,
		})?;
		let document = Arc::new(document);
		self.inner.loads.fetch_add(1, Ordering::Relaxed);

		self.inner.entries.insert(key.to_path_buf(), Arc::clone(&document));
		// Invalidation records its generation before removing, so a newer
		// record covering this key means our bytes may predate it.
		if self.inner.invalidated_since(key, generation) {
			self.inner
				.entries
				.remove_if(key, |_, stored| Arc::ptr_eq(stored, &document));
			tracing::debug!(path = %key.display(), "discarded load that overlapped an invalidation");
		}

		Ok(document)
	}

	/// Removes the entry for `path` and every entry below it.
	///
	/// Passing a directory evicts all documents inside it. Returns the number
	/// of entries removed.
	pub fn invalidate(&self, path: &Path) -> usize {
		let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
		self.inner
			.invalidated
			.entry(path.to_path_buf())
			.and_modify(|latest| *latest = (*latest).max(generation))
			.or_insert(generation);

		let mut removed = 0;
		self.inner.entries.retain(|key, _| {
			let stale = key.starts_with(path);
			if stale {
				removed += 1;
			}
			!stale
		});

		if removed > 0 {
			self.inner
				.evictions
				.fetch_add(removed as u64, Ordering::Relaxed);
		}
		removed
	}

	/// Returns true if a document for `path` is stored.
	pub fn contains(&self, path: &Path) -> bool {
		self.inner.entries.contains_key(path)
	}

	/// Number of stored documents.
	pub fn len(&self) -> usize {
		self.inner.entries.len()
	}

	/// Returns true if nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.inner.entries.is_empty()
	}

	/// Drops every entry.
	pub fn clear(&self) {
		let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
		self.inner.cleared.fetch_max(generation, Ordering::SeqCst);
		self.inner.invalidated.clear();
		self.inner.entries.clear();
	}

	/// Snapshot of the counters.
	pub fn statistics(&self) -> CacheStatistics {
		CacheStatistics {
			hits: self.inner.hits.load(Ordering::Relaxed),
			misses: self.inner.misses.load(Ordering::Relaxed),
			loads: self.inner.loads.load(Ordering::Relaxed),
			evictions: self.inner.evictions.load(Ordering::Relaxed),
			entries: self.inner.entries.len(),
		}
	}
}

impl Default for JsonCache {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for JsonCache {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("JsonCache")
			.field("statistics", &self.statistics())
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use rstest::{fixture, rstest};
	use serde_json::json;
	use std::collections::HashMap;
	use std::sync::Mutex;
	use std::sync::atomic::AtomicUsize;
	use tempfile::TempDir;
	use tokio::sync::Notify;
	use vitrine_core::{ErrorKind, JsonRoot};

	/// In-memory source that counts reads.
	#[derive(Default)]
	struct MemorySource {
		files: Mutex<HashMap<PathBuf, Vec<u8>>>,
		reads: AtomicUsize,
	}

	impl MemorySource {
		fn put(&self, path: &DocumentPath, contents: &str) {
			self.files
				.lock()
				.unwrap()
				.insert(path.as_path().to_path_buf(), contents.as_bytes().to_vec());
		}

		fn reads(&self) -> usize {
			self.reads.load(Ordering::SeqCst)
		}
	}

	#[async_trait]
	impl DocumentSource for MemorySource {
		async fn read(&self, path: &Path) -> Result<Vec<u8>> {
			self.reads.fetch_add(1, Ordering::SeqCst);
			self.files
				.lock()
				.unwrap()
				.get(path)
				.cloned()
				.ok_or_else(|| ContentError::NotFound {
					path: path.to_path_buf(),
				})
		}
	}

	/// Source whose reads block until released.
	#[derive(Default)]
	struct GatedSource {
		started: Notify,
		release: Notify,
		reads: AtomicUsize,
	}

	#[async_trait]
	impl DocumentSource for GatedSource {
		async fn read(&self, _path: &Path) -> Result<Vec<u8>> {
			let n = self.reads.fetch_add(1, Ordering::SeqCst);
			if n == 0 {
				self.started.notify_one();
				self.release.notified().await;
				return Ok(br#"{"version":"old"}"#.to_vec());
			}
			Ok(br#"{"version":"new"}"#.to_vec())
		}
	}

	struct Fixture {
		_dir: TempDir,
		root: JsonRoot,
		source: Arc<MemorySource>,
		cache: JsonCache,
	}

	#[fixture]
	fn fixture() -> Fixture {
		let dir = TempDir::new().unwrap();
		let root = JsonRoot::open(dir.path()).unwrap();
		let source = Arc::new(MemorySource::default());
		let cache = JsonCache::with_source(source.clone());
		Fixture {
			_dir: dir,
			root,
			source,
			cache,
		}
	}

	#[rstest]
	#[tokio::test]
	async fn test_miss_then_hit(fixture: Fixture) {
		let path = fixture.root.resolve("categories", "pages").await.unwrap();
		fixture.source.put(&path, r#"{"a":1}"#);

		let first = fixture.cache.get(&path).await.unwrap();
		let second = fixture.cache.get(&path).await.unwrap();

		assert_eq!(*first, json!({"a": 1}));
		assert_eq!(first, second);
		assert_eq!(fixture.source.reads(), 1);
		assert!(fixture.cache.contains(path.as_path()));

		let stats = fixture.cache.statistics();
		assert_eq!((stats.hits, stats.misses, stats.loads), (1, 1, 1));
		assert_eq!(stats.entries, 1);
		assert_eq!(stats.hit_rate(), 0.5);
	}

	#[rstest]
	#[tokio::test]
	async fn test_not_found_creates_no_entry(fixture: Fixture) {
		let path = fixture.root.resolve("books", "missing").await.unwrap();

		let err = fixture.cache.get(&path).await.unwrap_err();

		assert_eq!(err.kind(), ErrorKind::NotFound);
		assert!(fixture.cache.is_empty());
	}

	#[rstest]
	#[tokio::test]
	async fn test_parse_error_creates_no_entry(fixture: Fixture) {
		let path = fixture.root.resolve("books", "broken").await.unwrap();
		fixture.source.put(&path, r#"{"a":"#);

		let err = fixture.cache.get(&path).await.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Parse);
		assert!(fixture.cache.is_empty());

		// Errors are not cached: a second lookup reads again.
		let _ = fixture.cache.get(&path).await;
		assert_eq!(fixture.source.reads(), 2);
	}

	#[rstest]
	#[tokio::test]
	async fn test_invalidate_forces_reread_of_identical_bytes(fixture: Fixture) {
		let path = fixture.root.resolve("categories", "pages").await.unwrap();
		fixture.source.put(&path, r#"{"a":1}"#);

		let first = fixture.cache.get(&path).await.unwrap();
		assert_eq!(fixture.cache.invalidate(path.as_path()), 1);
		let second = fixture.cache.get(&path).await.unwrap();

		assert_eq!(first, second);
		assert!(!Arc::ptr_eq(&first, &second));
		assert_eq!(fixture.source.reads(), 2);
		assert_eq!(fixture.cache.statistics().evictions, 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_invalidate_returns_new_content(fixture: Fixture) {
		let path = fixture.root.resolve("categories", "pages").await.unwrap();
		fixture.source.put(&path, r#"{"a":1}"#);
		fixture.cache.get(&path).await.unwrap();

		fixture.source.put(&path, r#"{"a":2}"#);
		assert_eq!(*fixture.cache.get(&path).await.unwrap(), json!({"a": 1}));

		fixture.cache.invalidate(path.as_path());
		assert_eq!(*fixture.cache.get(&path).await.unwrap(), json!({"a": 2}));
	}

	#[rstest]
	#[tokio::test]
	async fn test_invalidate_directory_evicts_descendants(fixture: Fixture) {
		let pages = fixture.root.resolve("categories", "pages").await.unwrap();
		let index = fixture.root.resolve("categories", "index").await.unwrap();
		let other = fixture.root.resolve("books", "index").await.unwrap();
		for path in [&pages, &index, &other] {
			fixture.source.put(path, "[]");
			fixture.cache.get(path).await.unwrap();
		}

		let removed = fixture.cache.invalidate(&fixture.root.path().join("categories"));

		assert_eq!(removed, 2);
		assert_eq!(fixture.cache.len(), 1);
		assert!(fixture.cache.contains(other.as_path()));
	}

	#[rstest]
	#[tokio::test]
	async fn test_invalidate_unknown_key_is_noop(fixture: Fixture) {
		let path = fixture.root.resolve("categories", "pages").await.unwrap();
		fixture.source.put(&path, "{}");
		fixture.cache.get(&path).await.unwrap();

		let removed = fixture
			.cache
			.invalidate(&fixture.root.path().join("categories/pages-old.json"));

		assert_eq!(removed, 0);
		assert_eq!(fixture.cache.len(), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_clones_share_entries(fixture: Fixture) {
		let path = fixture.root.resolve("categories", "pages").await.unwrap();
		fixture.source.put(&path, "{}");

		let clone = fixture.cache.clone();
		clone.get(&path).await.unwrap();
		assert!(fixture.cache.contains(path.as_path()));

		fixture.cache.clear();
		assert!(clone.is_empty());
	}

	#[rstest]
	#[tokio::test]
	async fn test_load_overlapping_invalidation_is_not_kept() {
		let dir = TempDir::new().unwrap();
		let root = JsonRoot::open(dir.path()).unwrap();
		let path = root.resolve("categories", "pages").await.unwrap();
		let source = Arc::new(GatedSource::default());
		let cache = JsonCache::with_source(source.clone());

		let pending = {
			let cache = cache.clone();
			let path = path.clone();
			tokio::spawn(async move { cache.get(&path).await })
		};

		source.started.notified().await;
		cache.invalidate(path.as_path());
		source.release.notify_one();

		let stale = pending.await.unwrap().unwrap();
		assert_eq!(*stale, json!({"version": "old"}));
		assert!(!cache.contains(path.as_path()));

		let fresh = cache.get(&path).await.unwrap();
		assert_eq!(*fresh, json!({"version": "new"}));
		assert_eq!(source.reads.load(Ordering::SeqCst), 2);
	}

	#[rstest]
	#[case::same_file("categories/pages.json", false)]
	#[case::parent_directory("categories", false)]
	#[case::unrelated_file("books/other.json", true)]
	#[case::sibling_prefix("categories/pages-old.json", true)]
	#[tokio::test]
	async fn test_load_overlapping_invalidation_scope(#[case] invalidated: &str, #[case] kept: bool) {
		let dir = TempDir::new().unwrap();
		let root = JsonRoot::open(dir.path()).unwrap();
		let path = root.resolve("categories", "pages").await.unwrap();
		let source = Arc::new(GatedSource::default());
		let cache = JsonCache::with_source(source.clone());

		let pending = {
			let cache = cache.clone();
			let path = path.clone();
			tokio::spawn(async move { cache.get(&path).await })
		};

		source.started.notified().await;
		cache.invalidate(&root.path().join(invalidated));
		source.release.notify_one();

		let loaded = pending.await.unwrap().unwrap();
		assert_eq!(*loaded, json!({"version": "old"}));
		assert_eq!(cache.contains(path.as_path()), kept);
	}

	#[rstest]
	#[tokio::test]
	async fn test_load_overlapping_clear_is_not_kept() {
		let dir = TempDir::new().unwrap();
		let root = JsonRoot::open(dir.path()).unwrap();
		let path = root.resolve("categories", "pages").await.unwrap();
		let source = Arc::new(GatedSource::default());
		let cache = JsonCache::with_source(source.clone());

		let pending = {
			let cache = cache.clone();
			let path = path.clone();
			tokio::spawn(async move { cache.get(&path).await })
		};

		source.started.notified().await;
		cache.clear();
		source.release.notify_one();

		pending.await.unwrap().unwrap();
		assert!(cache.is_empty());
	}

	#[rstest]
	#[tokio::test]
	async fn test_document_key_order_is_preserved(fixture: Fixture) {
		let path = fixture.root.resolve("categories", "pages").await.unwrap();
		fixture.source.put(&path, r#"{"z":1,"a":2,"m":3}"#);

		let document = fixture.cache.get(&path).await.unwrap();
		let keys: Vec<_> = document.as_object().unwrap().keys().cloned().collect();

		assert_eq!(keys, ["z", "a", "m"]);
	}
}
