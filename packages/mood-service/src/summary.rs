use time::{Duration, OffsetDateTime};

use crate::{MoodService, Result};
use mood_domain::{JournalEntry, PersonaId, SummaryDigest, UserProfile, prompts};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestSource {
	/// Too few entries in the window; the persona's encouragement line was stored.
	Encouragement,
	Generated,
	Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DigestRefresh {
	pub digest: SummaryDigest,
	pub source: DigestSource,
}

impl MoodService {
	pub async fn summarize_on_entry(&self, entry: &JournalEntry) -> Result<Option<DigestRefresh>> {
		if entry.user_id.trim().is_empty() {
			return Ok(None);
		}

		let persona = self.resolve_persona(&entry.user_id).await;

		self.refresh_digest(&entry.user_id, persona, OffsetDateTime::now_utc()).await.map(Some)
	}

	/// Regenerates the digest in the new persona's voice. Clearing the preference or writing the
	/// same value again does not count as a change.
	pub async fn summarize_on_persona_change(
		&self,
		user_id: &str,
		before: Option<&UserProfile>,
		after: &UserProfile,
	) -> Result<Option<DigestRefresh>> {
		let Some(new_persona) = after.ai_persona.as_deref() else {
			return Ok(None);
		};
		let old_persona = before.and_then(|profile| profile.ai_persona.as_deref());

		if old_persona == Some(new_persona) {
			return Ok(None);
		}

		let persona = PersonaId::from_preference(Some(new_persona));

		tracing::info!(user_id, persona = %persona, "Persona changed. Regenerating digest.");

		self.refresh_digest(user_id, persona, OffsetDateTime::now_utc()).await.map(Some)
	}

	/// Recomputes the digest from the trailing window and overwrites the stored one.
	pub async fn refresh_digest(
		&self,
		user_id: &str,
		persona: PersonaId,
		now: OffsetDateTime,
	) -> Result<DigestRefresh> {
		let cfg = &self.cfg.enrichment;
		let period_start = now - Duration::days(cfg.summary_window_days);
		let entries = self.store.list_entries_between(user_id, period_start, now).await?;
		let (recommendation, source) = if entries.len() < cfg.summary_min_entries {
			(prompts::encouragement(persona).to_string(), DigestSource::Encouragement)
		} else if !self.generator.is_configured() {
			tracing::warn!(user_id, "No generator credential. Storing fallback digest.");

			(prompts::summary_fallback(persona).to_string(), DigestSource::Fallback)
		} else {
			self.generate_recommendation(user_id, persona, &entries).await
		};
		let digest = SummaryDigest {
			user_id: user_id.to_string(),
			recommendation,
			generated_at: now,
			entry_count: entries.len() as u32,
			period_start: Some(period_start),
		};

		self.store.put_digest(&digest).await?;

		Ok(DigestRefresh { digest, source })
	}

	async fn generate_recommendation(
		&self,
		user_id: &str,
		persona: PersonaId,
		entries: &[JournalEntry],
	) -> (String, DigestSource) {
		let prompt = prompts::summary(persona, &prompts::digest(entries));
		let fallback = || (prompts::summary_fallback(persona).to_string(), DigestSource::Fallback);

		match self.generator.generate(&prompt).await {
			Ok(text) => {
				let text = text.trim();

				if text.is_empty() || text.chars().count() > self.cfg.enrichment.summary_max_chars {
					tracing::warn!(
						user_id,
						chars = text.chars().count(),
						"Digest out of bounds. Storing fallback digest."
					);

					return fallback();
				}

				(text.to_string(), DigestSource::Generated)
			},
			Err(err) => {
				tracing::error!(user_id, error = %err, "Digest generation failed. Storing fallback.");

				fallback()
			},
		}
	}
}
