pub mod routes;
pub mod state;

pub use mood_cli::Args;

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::state::AppState;

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = mood_config::load(&args.config)?;

	mood_worker::init_tracing(&config);

	let http_addr: SocketAddr = config.service.http_bind.parse()?;
	let in_process_dispatch = config.storage.backend == "memory";
	let state = AppState::new(config).await?;

	// The memory backend is process-local, so its change feed is drained here.
	if in_process_dispatch {
		let service = state.service.clone();

		tokio::spawn(async move {
			if let Err(err) = mood_worker::worker::run_worker(service).await {
				tracing::error!(error = %err, "In-process change dispatcher stopped.");
			}
		});
	}

	let app = routes::router(state);
	let http_listener = TcpListener::bind(http_addr).await?;

	tracing::info!(%http_addr, "HTTP server listening.");

	axum::serve(http_listener, app).await?;

	Ok(())
}
