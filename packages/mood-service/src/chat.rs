use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, MoodService, Result};
use mood_domain::{ChatRole, ChatSession, PersonaId, prompts};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SendMessageRequest {
	pub user_id: String,
	pub message: String,
	#[serde(default)]
	pub session_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SendMessageResponse {
	pub reply: String,
	pub session_id: Uuid,
}

/// True when any message count reached during a turn is a non-zero multiple of `every`.
pub fn compaction_due(counts: &[u64], every: u64) -> bool {
	every > 0 && counts.iter().any(|count| *count > 0 && count % every == 0)
}

impl MoodService {
	pub async fn send_message(&self, req: SendMessageRequest) -> Result<SendMessageResponse> {
		let user_id = req.user_id.trim();
		let message = req.message.trim();

		if user_id.is_empty() || message.is_empty() {
			return Err(Error::invalid("user_id and message are required."));
		}

		let session_id = req
			.session_id
			.as_deref()
			.map(str::trim)
			.filter(|raw| !raw.is_empty())
			.map(|raw| {
				Uuid::parse_str(raw).map_err(|_| Error::invalid("session_id must be a UUID."))
			})
			.transpose()?;

		if !self.generator.is_configured() {
			return Err(Error::Internal {
				message: "Text generation is not configured.".to_string(),
			});
		}

		let persona = self.resolve_persona(user_id).await;
		let session = match session_id {
			Some(session_id) => self.existing_session(user_id, session_id).await?,
			None => self.start_session(user_id, persona).await?,
		};
		let session_id = session.session_id;
		let user_turn = self
			.store
			.append_message(session_id, ChatRole::User, message, OffsetDateTime::now_utc())
			.await?;
		let history = self.store.recent_messages(session_id, self.cfg.chat.recent_window).await?;
		let prompt = prompts::chat_reply(persona, &session.summary, &history, message);
		let reply = self.generator.generate(&prompt).await.map_err(|err| {
			tracing::error!(user_id, %session_id, error = %err, "Chat reply failed.");

			Error::Internal { message: format!("Failed to send message: {err}") }
		})?;
		let reply = match reply.trim() {
			"" => prompts::FALLBACK_REPLY.to_string(),
			text => text.to_string(),
		};
		let agent_turn = self
			.store
			.append_message(session_id, ChatRole::Agent, &reply, OffsetDateTime::now_utc())
			.await?;

		if compaction_due(&[user_turn.seq, agent_turn.seq], self.cfg.chat.compaction_every)
			&& let Err(err) = self.compact_session(session_id).await
		{
			tracing::error!(%session_id, error = %err, "Session compaction failed. Keeping summary.");
		}

		Ok(SendMessageResponse { reply, session_id })
	}

	/// Replaces the session summary with a one-sentence compression of the full log.
	pub async fn compact_session(&self, session_id: Uuid) -> Result<String> {
		let history = self.store.all_messages(session_id).await?;
		let prompt = prompts::compaction(&history, self.cfg.chat.compaction_max_words);
		let summary = self.generator.generate(&prompt).await?;
		let summary = summary.trim();

		if summary.is_empty() {
			return Err(Error::Internal { message: "Compaction returned no text.".to_string() });
		}

		self.store.set_session_summary(session_id, summary).await?;

		tracing::debug!(%session_id, messages = history.len(), "Session compacted.");

		Ok(summary.to_string())
	}

	async fn existing_session(&self, user_id: &str, session_id: Uuid) -> Result<ChatSession> {
		self.store
			.get_session(session_id)
			.await?
			.filter(|session| session.user_id == user_id)
			.ok_or_else(|| Error::not_found("Chat session not found."))
	}

	async fn start_session(&self, user_id: &str, persona: PersonaId) -> Result<ChatSession> {
		let now = OffsetDateTime::now_utc();
		let session = ChatSession {
			session_id: Uuid::new_v4(),
			user_id: user_id.to_string(),
			started_at: now,
			last_message_at: now,
			message_count: 0,
			summary: prompts::SESSION_SEED_SUMMARY.to_string(),
			persona_at_start: persona,
		};

		self.store.create_session(&session).await?;

		tracing::info!(user_id, session_id = %session.session_id, %persona, "Chat session started.");

		Ok(session)
	}
}
