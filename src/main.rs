use anyhow::Context;
use std::time::Duration;
use tokio::net::TcpListener;
use vitrine::{App, Settings, ShutdownCoordinator, logging};
use vitrine::server::shutdown_signal;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let settings = Settings::from_env().context("invalid environment")?;
	logging::init(&settings.log_filter).context("failed to install tracing subscriber")?;

	let addr = settings.listen_addr();
	let port = settings.port;
	let app = App::new(settings).context("failed to start application")?;
	let listener = TcpListener::bind(addr)
		.await
		.with_context(|| format!("failed to bind {addr}"))?;

	tracing::info!("Server running on http://localhost:{port}");
	tracing::info!("Assets available at http://localhost:{port}/assets/");

	let coordinator = ShutdownCoordinator::new(SHUTDOWN_GRACE);
	let trigger = coordinator.clone();
	tokio::spawn(async move {
		shutdown_signal().await;
		trigger.shutdown();
	});

	app.serve(listener, coordinator).await?;
	Ok(())
}
