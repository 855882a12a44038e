use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Change, ChangeEvent, Error, Result};
use mood_domain::{
	ChatMessage, ChatRole, ChatSession, JournalEntry, Mood, PersonaId, SummaryDigest, UserProfile,
};

#[derive(Debug, sqlx::FromRow)]
pub struct EntryRow {
	pub entry_id: Uuid,
	pub user_id: String,
	pub journal_text: String,
	pub mood: Option<String>,
	pub reflection: Option<String>,
	pub created_at: OffsetDateTime,
	pub mood_detected_at: Option<OffsetDateTime>,
	pub reflected_at: Option<OffsetDateTime>,
}
impl TryFrom<EntryRow> for JournalEntry {
	type Error = Error;

	fn try_from(row: EntryRow) -> Result<Self> {
		let mood = row
			.mood
			.map(|raw| raw.parse::<Mood>().map_err(|err| Error::Corrupt(err.to_string())))
			.transpose()?;

		Ok(Self {
			entry_id: row.entry_id,
			user_id: row.user_id,
			journal_text: row.journal_text,
			mood,
			reflection: row.reflection,
			created_at: row.created_at,
			mood_detected_at: row.mood_detected_at,
			reflected_at: row.reflected_at,
		})
	}
}

#[derive(Debug, sqlx::FromRow)]
pub struct ProfileRow {
	pub user_id: String,
	pub ai_persona: Option<String>,
	pub updated_at: OffsetDateTime,
}
impl From<ProfileRow> for UserProfile {
	fn from(row: ProfileRow) -> Self {
		Self { user_id: row.user_id, ai_persona: row.ai_persona, updated_at: row.updated_at }
	}
}

#[derive(Debug, sqlx::FromRow)]
pub struct DigestRow {
	pub user_id: String,
	pub recommendation: String,
	pub generated_at: OffsetDateTime,
	pub entry_count: i32,
	pub period_start: Option<OffsetDateTime>,
}
impl From<DigestRow> for SummaryDigest {
	fn from(row: DigestRow) -> Self {
		Self {
			user_id: row.user_id,
			recommendation: row.recommendation,
			generated_at: row.generated_at,
			entry_count: row.entry_count.max(0) as u32,
			period_start: row.period_start,
		}
	}
}

#[derive(Debug, sqlx::FromRow)]
pub struct SessionRow {
	pub session_id: Uuid,
	pub user_id: String,
	pub started_at: OffsetDateTime,
	pub last_message_at: OffsetDateTime,
	pub message_count: i64,
	pub summary: String,
	pub persona_at_start: String,
}
impl TryFrom<SessionRow> for ChatSession {
	type Error = Error;

	fn try_from(row: SessionRow) -> Result<Self> {
		let persona_at_start = row
			.persona_at_start
			.parse::<PersonaId>()
			.map_err(|err| Error::Corrupt(err.to_string()))?;

		Ok(Self {
			session_id: row.session_id,
			user_id: row.user_id,
			started_at: row.started_at,
			last_message_at: row.last_message_at,
			message_count: row.message_count.max(0) as u64,
			summary: row.summary,
			persona_at_start,
		})
	}
}

#[derive(Debug, sqlx::FromRow)]
pub struct MessageRow {
	pub message_id: Uuid,
	pub session_id: Uuid,
	pub role: String,
	pub text: String,
	pub seq: i64,
	pub created_at: OffsetDateTime,
}
impl TryFrom<MessageRow> for ChatMessage {
	type Error = Error;

	fn try_from(row: MessageRow) -> Result<Self> {
		let role = match row.role.as_str() {
			"user" => ChatRole::User,
			"agent" => ChatRole::Agent,
			other => return Err(Error::Corrupt(format!("Unknown chat role {other:?}."))),
		};

		Ok(Self {
			message_id: row.message_id,
			session_id: row.session_id,
			role,
			text: row.text,
			seq: row.seq.max(0) as u64,
			created_at: row.created_at,
		})
	}
}

#[derive(Debug, sqlx::FromRow)]
pub struct ChangeRow {
	pub change_id: Uuid,
	pub payload: Value,
	pub attempts: i32,
	pub created_at: OffsetDateTime,
}
impl TryFrom<ChangeRow> for ChangeEvent {
	type Error = Error;

	fn try_from(row: ChangeRow) -> Result<Self> {
		let change: Change = serde_json::from_value(row.payload)?;

		Ok(Self {
			change_id: row.change_id,
			change,
			attempts: row.attempts,
			created_at: row.created_at,
		})
	}
}
