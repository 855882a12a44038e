use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, MoodService, Result};
use mood_domain::{EntryPatch, JournalEntry, Mood};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateEntryRequest {
	pub user_id: String,
	pub journal_text: String,
	/// A client-supplied mood is kept as written and never reclassified on create.
	#[serde(default)]
	pub mood: Option<Mood>,
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub created_at: Option<OffsetDateTime>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UpdateEntryRequest {
	pub user_id: String,
	#[serde(default)]
	pub journal_text: Option<String>,
	#[serde(default)]
	pub reset_mood: bool,
	#[serde(default)]
	pub clear_reflection: bool,
}

impl MoodService {
	pub async fn create_entry(&self, req: CreateEntryRequest) -> Result<JournalEntry> {
		let user_id = req.user_id.trim();

		if user_id.is_empty() || req.journal_text.trim().is_empty() {
			return Err(Error::invalid("user_id and journal_text are required."));
		}

		let mut entry = JournalEntry::new(
			user_id,
			req.journal_text,
			req.created_at.unwrap_or_else(OffsetDateTime::now_utc),
		);

		if let Some(mood) = req.mood {
			entry.mood = Some(mood);
		}

		self.store.insert_entry(&entry).await?;

		Ok(entry)
	}

	/// Partial update by the entry's owner. Resetting the mood re-runs classification, and
	/// clearing the reflection asks for a new one.
	pub async fn update_entry(
		&self,
		entry_id: Uuid,
		req: UpdateEntryRequest,
	) -> Result<JournalEntry> {
		let owned = self
			.store
			.get_entry(entry_id)
			.await?
			.is_some_and(|entry| entry.user_id == req.user_id.trim());

		if !owned {
			return Err(Error::not_found("Entry not found."));
		}

		let patch = EntryPatch {
			journal_text: req.journal_text,
			mood: req.reset_mood.then_some(Some(Mood::Pending)),
			reflection: req.clear_reflection.then_some(None),
			..Default::default()
		};

		if patch.is_empty() {
			return Err(Error::invalid("Nothing to update."));
		}

		Ok(self.store.patch_entry(entry_id, &patch).await?)
	}
}
