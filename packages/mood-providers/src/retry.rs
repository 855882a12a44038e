use std::time::Duration;

use crate::{Result, TextGenerator};

/// Bounded retry for rate-limited calls: a fixed cooldown between attempts, nothing else is
/// retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
	pub max_attempts: u32,
	pub cooldown: Duration,
}
impl RetryPolicy {
	pub const fn once() -> Self {
		Self { max_attempts: 1, cooldown: Duration::ZERO }
	}

	pub fn from_config(cfg: &mood_config::Enrichment) -> Self {
		Self {
			max_attempts: cfg.reflection_max_attempts.max(1),
			cooldown: Duration::from_millis(cfg.rate_limit_cooldown_ms),
		}
	}
}

pub async fn generate_with_retry(
	generator: &dyn TextGenerator,
	prompt: &str,
	policy: RetryPolicy,
) -> Result<String> {
	let mut attempt = 1;

	loop {
		match generator.generate(prompt).await {
			Ok(text) => return Ok(text),
			Err(err) if err.is_rate_limited() && attempt < policy.max_attempts => {
				tracing::warn!(
					attempt,
					cooldown_ms = policy.cooldown.as_millis() as u64,
					"Text generation rate limited. Backing off."
				);
				tokio::time::sleep(policy.cooldown).await;

				attempt += 1;
			},
			Err(err) => return Err(err),
		}
	}
}
