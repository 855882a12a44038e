use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{mood::Mood, persona::PersonaId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
	pub entry_id: Uuid,
	pub user_id: String,
	pub journal_text: String,
	pub mood: Option<Mood>,
	/// `None` doubles as the "regenerate me" signal once a reflection has been written.
	pub reflection: Option<String>,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339::option")]
	pub mood_detected_at: Option<OffsetDateTime>,
	#[serde(with = "time::serde::rfc3339::option")]
	pub reflected_at: Option<OffsetDateTime>,
}
impl JournalEntry {
	pub fn new(
		user_id: impl Into<String>,
		journal_text: impl Into<String>,
		now: OffsetDateTime,
	) -> Self {
		Self {
			entry_id: Uuid::new_v4(),
			user_id: user_id.into(),
			journal_text: journal_text.into(),
			mood: Some(Mood::Pending),
			reflection: None,
			created_at: now,
			mood_detected_at: None,
			reflected_at: None,
		}
	}
}

/// Partial-field update for a journal entry. Only fields set to `Some` are written, so sibling
/// handlers never clobber each other's columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryPatch {
	pub journal_text: Option<String>,
	pub mood: Option<Option<Mood>>,
	pub mood_detected_at: Option<OffsetDateTime>,
	pub reflection: Option<Option<String>>,
	pub reflected_at: Option<OffsetDateTime>,
}
impl EntryPatch {
	pub fn mood(mood: Mood, detected_at: Option<OffsetDateTime>) -> Self {
		Self { mood: Some(Some(mood)), mood_detected_at: detected_at, ..Default::default() }
	}

	pub fn is_empty(&self) -> bool {
		self == &Self::default()
	}

	pub fn apply(&self, entry: &mut JournalEntry) {
		if let Some(text) = &self.journal_text {
			entry.journal_text = text.clone();
		}
		if let Some(mood) = self.mood {
			entry.mood = mood;
		}
		if let Some(at) = self.mood_detected_at {
			entry.mood_detected_at = Some(at);
		}
		if let Some(reflection) = &self.reflection {
			entry.reflection = reflection.clone();
		}
		if let Some(at) = self.reflected_at {
			entry.reflected_at = Some(at);
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
	pub user_id: String,
	/// Raw stored preference. Unknown values are kept as written and resolved to the default.
	pub ai_persona: Option<String>,
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryDigest {
	pub user_id: String,
	pub recommendation: String,
	#[serde(with = "time::serde::rfc3339")]
	pub generated_at: OffsetDateTime,
	pub entry_count: u32,
	#[serde(with = "time::serde::rfc3339::option")]
	pub period_start: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
	pub session_id: Uuid,
	pub user_id: String,
	#[serde(with = "time::serde::rfc3339")]
	pub started_at: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339")]
	pub last_message_at: OffsetDateTime,
	pub message_count: u64,
	pub summary: String,
	pub persona_at_start: PersonaId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
	User,
	Agent,
}
impl ChatRole {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::User => "user",
			Self::Agent => "agent",
		}
	}

	pub fn speaker(self) -> &'static str {
		match self {
			Self::User => "User",
			Self::Agent => "MoodBuddy",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
	pub message_id: Uuid,
	pub session_id: Uuid,
	pub role: ChatRole,
	pub text: String,
	/// Session message count right after this message was appended.
	pub seq: u64,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
}
