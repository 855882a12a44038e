use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub enrichment: Enrichment,
	#[serde(default)]
	pub chat: Chat,
	#[serde(default)]
	pub cleanup: Cleanup,
	#[serde(default)]
	pub worker: Worker,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	#[serde(default = "default_backend")]
	pub backend: String,
	pub postgres: Option<Postgres>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub generator: GeneratorProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	/// Absent or blank keys put every handler into its degraded, fallback-only mode.
	#[serde(default)]
	pub api_key: Option<String>,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Enrichment {
	pub min_journal_chars: usize,
	pub reflection_max_attempts: u32,
	pub rate_limit_cooldown_ms: u64,
	pub summary_window_days: i64,
	pub summary_min_entries: usize,
	pub summary_max_chars: usize,
}
impl Default for Enrichment {
	fn default() -> Self {
		Self {
			min_journal_chars: 10,
			reflection_max_attempts: 2,
			rate_limit_cooldown_ms: 30_000,
			summary_window_days: 7,
			summary_min_entries: 2,
			summary_max_chars: 220,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Chat {
	pub recent_window: u32,
	pub compaction_every: u64,
	pub compaction_max_words: u32,
}
impl Default for Chat {
	fn default() -> Self {
		Self { recent_window: 10, compaction_every: 3, compaction_max_words: 30 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Cleanup {
	pub batch_size: u32,
}
impl Default for Cleanup {
	fn default() -> Self {
		Self { batch_size: 500 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Worker {
	pub poll_interval_ms: u64,
	/// Upper bound on events handled concurrently by one dispatcher.
	pub max_in_flight: usize,
	pub claim_lease_seconds: i64,
	pub mood_timeout_ms: u64,
	pub reflection_timeout_ms: u64,
	pub summary_timeout_ms: u64,
	pub cleanup_timeout_ms: u64,
}
impl Default for Worker {
	fn default() -> Self {
		Self {
			poll_interval_ms: 500,
			max_in_flight: 16,
			claim_lease_seconds: 30,
			mood_timeout_ms: 60_000,
			reflection_timeout_ms: 300_000,
			summary_timeout_ms: 180_000,
			cleanup_timeout_ms: 540_000,
		}
	}
}

fn default_backend() -> String {
	"postgres".to_string()
}
