//! Filesystem watcher for the JSON root.
//!
//! Wraps a recursive `notify` subscription and forwards the paths it reports
//! through an unbounded channel. The subscription lives as long as the
//! [`ChangeWatcher`] value; dropping it stops notifications and closes the
//! channel.

use notify::event::{AccessKind, AccessMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use vitrine_core::{ContentError, JsonRoot, Result};

/// Events emitted by the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
	/// A file or directory was created.
	Created(PathBuf),
	/// Contents, metadata or name changed. Both sides of a rename are reported.
	Modified(PathBuf),
	/// A file or directory was removed.
	Removed(PathBuf),
	/// The backend dropped events; any cached document may be stale.
	Rescan,
	/// The backend reported an error.
	Error(String),
}

impl WatchEvent {
	/// Path affected by the event, if any.
	pub fn path(&self) -> Option<&Path> {
		match self {
			Self::Created(path) | Self::Modified(path) | Self::Removed(path) => Some(path),
			Self::Rescan | Self::Error(_) => None,
		}
	}

	/// Consumes the event and returns its path, if any.
	pub fn into_path(self) -> Option<PathBuf> {
		match self {
			Self::Created(path) | Self::Modified(path) | Self::Removed(path) => Some(path),
			Self::Rescan | Self::Error(_) => None,
		}
	}
}

/// Translates one backend notification into watcher events.
///
/// Notifications flagged for rescan (inotify queue overflow and the like)
/// become a single [`WatchEvent::Rescan`]. Otherwise notifications without
/// paths produce nothing. Pure access events are dropped, except
/// close-after-write which some backends send instead of a modify.
pub(crate) fn translate(event: Event) -> Vec<WatchEvent> {
	if event.need_rescan() {
		return vec![WatchEvent::Rescan];
	}
	let make: fn(PathBuf) -> WatchEvent = match event.kind {
		EventKind::Create(_) => WatchEvent::Created,
		EventKind::Modify(_) | EventKind::Any => WatchEvent::Modified,
		EventKind::Access(AccessKind::Close(AccessMode::Write)) => WatchEvent::Modified,
		EventKind::Remove(_) => WatchEvent::Removed,
		_ => return Vec::new(),
	};
	event.paths.into_iter().map(make).collect()
}

/// Recursive subscription on a [`JsonRoot`].
pub struct ChangeWatcher {
	_watcher: RecommendedWatcher,
	root: PathBuf,
}

impl ChangeWatcher {
	/// Starts watching `root` recursively.
	///
	/// Returns the watcher, which must be kept alive, and the receiving end of
	/// the event channel.
	///
	/// # Errors
	///
	/// Returns [`ContentError::WatchSetup`] if the backend cannot be created or
	/// the directory cannot be watched.
	pub fn new(root: &JsonRoot) -> Result<(Self, mpsc::UnboundedReceiver<WatchEvent>)> {
		let root_path = root.path().to_path_buf();
		let setup_error = |err: notify::Error| ContentError::WatchSetup {
			path: root_path.clone(),
			reason: err.to_string(),
		};

		let (tx, rx) = mpsc::unbounded_channel();
		let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
			let events = match res {
				Ok(event) => translate(event),
				Err(err) => vec![WatchEvent::Error(err.to_string())],
			};
			for event in events {
				// Receiver gone means the invalidator stopped; nothing to do.
				let _ = tx.send(event);
			}
		})
		.map_err(setup_error)?;

		watcher
			.watch(&root_path, RecursiveMode::Recursive)
			.map_err(setup_error)?;

		tracing::debug!(root = %root_path.display(), "watching JSON root");

		Ok((
			Self {
				_watcher: watcher,
				root: root_path,
			},
			rx,
		))
	}

	/// Directory being watched.
	pub fn root(&self) -> &Path {
		&self.root
	}
}

impl std::fmt::Debug for ChangeWatcher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ChangeWatcher")
			.field("root", &self.root)
			.finish_non_exhaustive()
	}
}
