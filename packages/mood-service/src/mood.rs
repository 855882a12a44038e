use time::OffsetDateTime;
use uuid::Uuid;

use crate::{MoodService, Result};
use mood_domain::{EntryPatch, JournalEntry, Mood, lifecycle, prompts};

impl MoodService {
	/// Create trigger. Returns the mood written, or `None` when the guard skipped the entry.
	pub async fn classify_created(&self, entry: &JournalEntry) -> Result<Option<Mood>> {
		let Some(current) = self.store.get_entry(entry.entry_id).await? else {
			tracing::debug!(entry_id = %entry.entry_id, "Entry is gone. Skipping classification.");

			return Ok(None);
		};

		if !lifecycle::should_classify_on_create(&current) {
			tracing::debug!(entry_id = %entry.entry_id, "Mood already set. Skipping classification.");

			return Ok(None);
		}

		self.classify(&current).await.map(Some)
	}

	/// Update trigger: the mood was reset to pending or the journal text changed.
	pub async fn classify_updated(
		&self,
		before: &JournalEntry,
		after: &JournalEntry,
	) -> Result<Option<Mood>> {
		if !lifecycle::should_classify_on_update(before, after) {
			return Ok(None);
		}

		let Some(current) = self.store.get_entry(after.entry_id).await? else {
			return Ok(None);
		};
		let reset_pending = current.mood.is_some_and(Mood::is_pending);
		let text_current = current.journal_text == after.journal_text;

		if !reset_pending && !text_current {
			tracing::debug!(
				entry_id = %after.entry_id,
				"Entry moved on since this change. Skipping classification."
			);

			return Ok(None);
		}

		self.classify(&current).await.map(Some)
	}

	async fn classify(&self, entry: &JournalEntry) -> Result<Mood> {
		let journal = entry.journal_text.trim();

		if journal.chars().count() < self.cfg.enrichment.min_journal_chars {
			tracing::debug!(entry_id = %entry.entry_id, "Journal too short. Writing neutral mood.");

			return self.write_mood(entry.entry_id, Mood::Neutral, None).await;
		}
		if !self.generator.is_configured() {
			tracing::warn!(entry_id = %entry.entry_id, "No generator credential. Writing neutral mood.");

			return self.write_mood(entry.entry_id, Mood::Neutral, None).await;
		}

		let prompt = prompts::mood_classification(journal);

		match self.generator.generate(&prompt).await {
			Ok(raw) => {
				let mood = Mood::from_classifier_output(&raw);

				self.write_mood(entry.entry_id, mood, Some(OffsetDateTime::now_utc())).await
			},
			Err(err) => {
				tracing::error!(
					entry_id = %entry.entry_id,
					error = %err,
					"Mood classification failed. Writing neutral mood."
				);

				self.write_mood(entry.entry_id, Mood::Neutral, None).await
			},
		}
	}

	async fn write_mood(
		&self,
		entry_id: Uuid,
		mood: Mood,
		detected_at: Option<OffsetDateTime>,
	) -> Result<Mood> {
		self.store.patch_entry(entry_id, &EntryPatch::mood(mood, detected_at)).await?;

		Ok(mood)
	}
}
