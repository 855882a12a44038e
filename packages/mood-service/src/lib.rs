pub mod chat;
pub mod cleanup;
pub mod daily;
pub mod entries;
pub mod mood;
pub mod persona;
pub mod reflection;
pub mod summary;

mod error;

pub use chat::{SendMessageRequest, SendMessageResponse};
pub use cleanup::{AccountPurgeReport, PurgeReport};
pub use daily::DailyReflectionRequest;
pub use entries::{CreateEntryRequest, UpdateEntryRequest};
pub use error::{Error, ErrorKind, Result};
pub use reflection::{ReflectionOutcome, ReflectionPath};
pub use summary::{DigestRefresh, DigestSource};

use std::sync::Arc;

use mood_config::Config;
use mood_providers::{RetryPolicy, TextGenerator};
use mood_storage::Store;

/// Enrichment handlers and the conversation endpoints over one store and one text generator.
/// Handlers hold no state of their own between calls.
pub struct MoodService {
	pub cfg: Config,
	pub store: Arc<dyn Store>,
	pub generator: Arc<dyn TextGenerator>,
}
impl MoodService {
	pub fn new(cfg: Config, store: Arc<dyn Store>, generator: Arc<dyn TextGenerator>) -> Self {
		Self { cfg, store, generator }
	}

	pub(crate) fn retry_policy(&self) -> RetryPolicy {
		RetryPolicy::from_config(&self.cfg.enrichment)
	}
}
