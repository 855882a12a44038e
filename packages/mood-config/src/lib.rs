mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Chat, Cleanup, Config, Enrichment, GeneratorProviderConfig, Postgres, Providers, Service,
	Storage, Worker,
};

use std::{fs, path::Path};

pub const MAX_BATCH_SIZE: u32 = 500;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}

	match cfg.storage.backend.as_str() {
		"memory" => {},
		"postgres" => {
			let Some(postgres) = cfg.storage.postgres.as_ref() else {
				return Err(Error::Validation {
					message: "storage.postgres is required when storage.backend is postgres."
						.to_string(),
				});
			};

			if postgres.dsn.trim().is_empty() {
				return Err(Error::Validation {
					message: "storage.postgres.dsn must be non-empty.".to_string(),
				});
			}
			if postgres.pool_max_conns == 0 {
				return Err(Error::Validation {
					message: "storage.postgres.pool_max_conns must be greater than zero."
						.to_string(),
				});
			}
		},
		_ => {
			return Err(Error::Validation {
				message: "storage.backend must be one of postgres or memory.".to_string(),
			});
		},
	}

	let generator = &cfg.providers.generator;

	if generator.api_base.trim().is_empty() || generator.model.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.generator.api_base and model must be non-empty.".to_string(),
		});
	}
	if !generator.temperature.is_finite() {
		return Err(Error::Validation {
			message: "providers.generator.temperature must be a finite number.".to_string(),
		});
	}
	if generator.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.generator.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if generator.default_headers.values().any(|value| !value.is_string()) {
		return Err(Error::Validation {
			message: "providers.generator.default_headers values must be strings.".to_string(),
		});
	}
	if cfg.enrichment.reflection_max_attempts == 0 {
		return Err(Error::Validation {
			message: "enrichment.reflection_max_attempts must be greater than zero.".to_string(),
		});
	}
	if cfg.enrichment.summary_window_days <= 0 {
		return Err(Error::Validation {
			message: "enrichment.summary_window_days must be greater than zero.".to_string(),
		});
	}
	if cfg.enrichment.summary_min_entries == 0 {
		return Err(Error::Validation {
			message: "enrichment.summary_min_entries must be greater than zero.".to_string(),
		});
	}
	if cfg.chat.recent_window == 0 {
		return Err(Error::Validation {
			message: "chat.recent_window must be greater than zero.".to_string(),
		});
	}
	if cfg.chat.compaction_every == 0 {
		return Err(Error::Validation {
			message: "chat.compaction_every must be greater than zero.".to_string(),
		});
	}
	if cfg.cleanup.batch_size == 0 || cfg.cleanup.batch_size > MAX_BATCH_SIZE {
		return Err(Error::Validation {
			message: format!("cleanup.batch_size must be in the range 1-{MAX_BATCH_SIZE}."),
		});
	}

	for (label, value) in [
		("worker.poll_interval_ms", cfg.worker.poll_interval_ms),
		("worker.mood_timeout_ms", cfg.worker.mood_timeout_ms),
		("worker.reflection_timeout_ms", cfg.worker.reflection_timeout_ms),
		("worker.summary_timeout_ms", cfg.worker.summary_timeout_ms),
		("worker.cleanup_timeout_ms", cfg.worker.cleanup_timeout_ms),
	] {
		if value == 0 {
			return Err(Error::Validation { message: format!("{label} must be greater than zero.") });
		}
	}

	if cfg.worker.max_in_flight == 0 {
		return Err(Error::Validation {
			message: "worker.max_in_flight must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.claim_lease_seconds <= 0 {
		return Err(Error::Validation {
			message: "worker.claim_lease_seconds must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg
		.providers
		.generator
		.api_key
		.as_deref()
		.map(|key| key.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.providers.generator.api_key = None;
	}

	cfg.storage.backend = cfg.storage.backend.trim().to_ascii_lowercase();
}
