use time::OffsetDateTime;
use uuid::Uuid;

use crate::{MoodService, Result};
use mood_domain::{JournalEntry, lifecycle, prompts};
use mood_providers::generate_with_retry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReflectionPath {
	Create,
	Update,
}
impl ReflectionPath {
	fn busy_text(self) -> &'static str {
		match self {
			Self::Create => prompts::REFLECTION_BUSY_ON_CREATE,
			Self::Update => prompts::REFLECTION_BUSY_ON_UPDATE,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReflectionOutcome {
	/// The entry is not ready: missing owner, text or classified mood.
	Skipped,
	/// A reflection was already present, possibly written by a concurrent delivery.
	AlreadyReflected,
	Generated,
	Fallback,
}

impl MoodService {
	pub async fn reflect_created(&self, entry: &JournalEntry) -> Result<ReflectionOutcome> {
		if !lifecycle::should_reflect_on_create(entry) {
			return Ok(skipped_outcome(entry));
		}

		self.reflect(entry.entry_id, ReflectionPath::Create).await
	}

	pub async fn reflect_updated(
		&self,
		before: &JournalEntry,
		after: &JournalEntry,
	) -> Result<ReflectionOutcome> {
		if !lifecycle::should_reflect_on_update(before, after) {
			return Ok(skipped_outcome(after));
		}

		self.reflect(after.entry_id, ReflectionPath::Update).await
	}

	async fn reflect(&self, entry_id: Uuid, path: ReflectionPath) -> Result<ReflectionOutcome> {
		// The event snapshot may be stale; the guard is re-checked against the stored entry.
		let Some(current) = self.store.get_entry(entry_id).await? else {
			return Ok(ReflectionOutcome::Skipped);
		};

		if !lifecycle::is_ready_for_reflection(&current) {
			return Ok(skipped_outcome(&current));
		}

		let Some(mood) = current.mood else {
			return Ok(ReflectionOutcome::Skipped);
		};
		let (text, outcome) = if self.generator.is_configured() {
			let persona = self.resolve_persona(&current.user_id).await;
			let prompt = prompts::reflection(persona, mood, current.journal_text.trim());

			match generate_with_retry(self.generator.as_ref(), &prompt, self.retry_policy()).await {
				Ok(text) if !text.trim().is_empty() =>
					(text.trim().to_string(), ReflectionOutcome::Generated),
				Ok(_) => {
					tracing::warn!(%entry_id, "Reflection came back empty. Writing fallback.");

					(path.busy_text().to_string(), ReflectionOutcome::Fallback)
				},
				Err(err) => {
					tracing::error!(%entry_id, error = %err, "Reflection failed. Writing fallback.");

					(path.busy_text().to_string(), ReflectionOutcome::Fallback)
				},
			}
		} else {
			tracing::warn!(%entry_id, "No generator credential. Writing missing-key reflection.");

			(prompts::REFLECTION_MISSING_KEY.to_string(), ReflectionOutcome::Fallback)
		};
		let written =
			self.store.set_reflection_if_absent(entry_id, &text, OffsetDateTime::now_utc()).await?;

		if !written {
			tracing::debug!(%entry_id, "Reflection written concurrently. Discarding result.");

			return Ok(ReflectionOutcome::AlreadyReflected);
		}

		Ok(outcome)
	}
}

fn skipped_outcome(entry: &JournalEntry) -> ReflectionOutcome {
	if entry.reflection.is_some() {
		ReflectionOutcome::AlreadyReflected
	} else {
		ReflectionOutcome::Skipped
	}
}
