//! Applies watcher events to the cache.

use std::collections::BTreeSet;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use vitrine_core::JsonRoot;

use crate::store::JsonCache;
use crate::watcher::WatchEvent;

/// Sole consumer of the watcher channel and sole remover of cache entries.
#[derive(Debug, Clone)]
pub struct Invalidator {
	cache: JsonCache,
	root: JsonRoot,
}

impl Invalidator {
	pub fn new(cache: JsonCache, root: JsonRoot) -> Self {
		Self { cache, root }
	}

	/// Evicts the cache entries for `paths`.
	///
	/// Relative paths are taken relative to the JSON root. Paths that resolve
	/// outside the root are skipped. Returns the number of entries removed.
	pub async fn apply<I>(&self, paths: I) -> usize
	where
		I: IntoIterator<Item = PathBuf>,
	{
		let mut evicted = 0;
		for reported in paths {
			let Some(path) = self.root.locate(&reported).await else {
				tracing::debug!(path = %reported.display(), "ignoring change outside JSON root");
				continue;
			};

			let removed = self.cache.invalidate(&path);
			if removed > 0 {
				tracing::info!(path = %path.display(), entries = removed, "invalidated cache");
			}
			evicted += removed;
		}
		evicted
	}

	/// Drops every cached document.
	///
	/// Used when the watcher reports lost events, since any entry may then be
	/// stale. Returns the number of entries removed.
	pub fn rescan(&self) -> usize {
		let removed = self.cache.len();
		self.cache.clear();
		tracing::warn!(
			root = %self.root.path().display(),
			entries = removed,
			"filesystem events were lost, cleared cache"
		);
		removed
	}

	/// Consumes events until the channel closes.
	///
	/// Events already queued when one arrives are drained and their paths
	/// deduplicated before being applied. A rescan in the batch clears the
	/// whole cache instead.
	pub async fn run(self, mut events: mpsc::UnboundedReceiver<WatchEvent>) {
		while let Some(event) = events.recv().await {
			let mut batch = Batch::default();
			self.collect(event, &mut batch);
			while let Ok(event) = events.try_recv() {
				self.collect(event, &mut batch);
			}

			if batch.rescan {
				self.rescan();
			} else if !batch.paths.is_empty() {
				self.apply(batch.paths).await;
			}
		}
		tracing::debug!("watch channel closed, invalidator stopping");
	}

	/// Runs [`Invalidator::run`] on a new task.
	pub fn spawn(self, events: mpsc::UnboundedReceiver<WatchEvent>) -> JoinHandle<()> {
		tokio::spawn(self.run(events))
	}

	fn collect(&self, event: WatchEvent, batch: &mut Batch) {
		match event {
			WatchEvent::Error(reason) => {
				tracing::warn!(root = %self.root.path().display(), %reason, "filesystem watcher error");
			}
			WatchEvent::Rescan => batch.rescan = true,
			event => {
				if let Some(path) = event.into_path() {
					batch.paths.insert(path);
				}
			}
		}
	}
}

/// Events drained from the channel in one pass.
#[derive(Default)]
struct Batch {
	paths: BTreeSet<PathBuf>,
	rescan: bool,
}
