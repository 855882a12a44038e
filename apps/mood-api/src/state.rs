use std::sync::Arc;

use mood_service::MoodService;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<MoodService>,
}
impl AppState {
	pub async fn new(config: mood_config::Config) -> color_eyre::Result<Self> {
		let service = mood_worker::build_service(config).await?;

		Ok(Self { service })
	}

	pub fn from_service(service: Arc<MoodService>) -> Self {
		Self { service }
	}
}
