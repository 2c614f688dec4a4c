//! Graceful shutdown coordination.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, broadcast};

/// Broadcasts a shutdown request to the accept loop and every connection.
///
/// Clones share state. After [`shutdown`](Self::shutdown) the server stops
/// accepting, asks open connections to finish their current request and waits
/// at most [`timeout`](Self::timeout) for them.
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
	sender: broadcast::Sender<()>,
	triggered: Arc<AtomicBool>,
	complete: Arc<Notify>,
	completed: Arc<AtomicBool>,
	timeout: Duration,
}

impl ShutdownCoordinator {
	/// Creates a coordinator with the given grace period.
	///
	/// # Examples
	///
	/// ```
	/// use std::time::Duration;
	/// use vitrine_server::ShutdownCoordinator;
	///
	/// let coordinator = ShutdownCoordinator::new(Duration::from_secs(30));
	/// assert!(!coordinator.is_shutting_down());
	/// coordinator.shutdown();
	/// assert!(coordinator.is_shutting_down());
	/// ```
	pub fn new(timeout: Duration) -> Self {
		let (sender, _) = broadcast::channel(1);
		Self {
			sender,
			triggered: Arc::new(AtomicBool::new(false)),
			complete: Arc::new(Notify::new()),
			completed: Arc::new(AtomicBool::new(false)),
			timeout,
		}
	}

	/// Grace period for in-flight connections.
	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	/// Returns a receiver that yields once shutdown is requested.
	pub fn subscribe(&self) -> broadcast::Receiver<()> {
		self.sender.subscribe()
	}

	/// Requests shutdown. Repeated calls are no-ops.
	pub fn shutdown(&self) {
		if !self.triggered.swap(true, Ordering::SeqCst) {
			// No receivers just means nothing is running yet.
			let _ = self.sender.send(());
		}
	}

	/// Returns true once [`shutdown`](Self::shutdown) has been called.
	pub fn is_shutting_down(&self) -> bool {
		self.triggered.load(Ordering::SeqCst)
	}

	/// Waits until shutdown is requested. Returns immediately if it already was.
	pub async fn requested(&self) {
		let mut receiver = self.subscribe();
		if self.is_shutting_down() {
			return;
		}
		let _ = receiver.recv().await;
	}

	/// Called by the server once every connection has drained.
	pub fn notify_shutdown_complete(&self) {
		self.completed.store(true, Ordering::SeqCst);
		self.complete.notify_waiters();
	}

	/// Waits until the server reports completion.
	pub async fn wait_for_shutdown(&self) {
		let notified = self.complete.notified();
		if self.completed.load(Ordering::SeqCst) {
			return;
		}
		notified.await;
	}
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(err) = tokio::signal::ctrl_c().await {
			tracing::error!(error = %err, "failed to listen for ctrl-c");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			}
			Err(err) => {
				tracing::error!(error = %err, "failed to listen for SIGTERM");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => tracing::info!("received ctrl-c"),
		_ = terminate => tracing::info!("received SIGTERM"),
	}
}
