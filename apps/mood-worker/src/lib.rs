pub mod worker;

mod error;

pub use error::{Error, Result};
pub use mood_cli::Args;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use mood_providers::HttpGenerator;
use mood_service::MoodService;

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = mood_config::load(&args.config)?;

	init_tracing(&config);

	let service = build_service(config).await?;

	worker::run_worker(service).await
}

/// Opens the configured store and generator. Shared with the API binary, which runs the
/// dispatcher in-process on the memory backend.
pub async fn build_service(config: mood_config::Config) -> color_eyre::Result<Arc<MoodService>> {
	let store = mood_storage::open(&config.storage).await?;
	let generator = HttpGenerator::new(config.providers.generator.clone())?;

	if config.providers.generator.api_key.is_none() {
		tracing::warn!("No generator api_key configured. Running in fallback-only mode.");
	}

	Ok(Arc::new(MoodService::new(config, store, Arc::new(generator))))
}

pub fn init_tracing(config: &mood_config::Config) {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();
}
