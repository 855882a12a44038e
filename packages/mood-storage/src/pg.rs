use sqlx::{PgExecutor, PgPool, postgres::PgPoolOptions};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	BoxFuture, Change, ChangeEvent, ChangeStatus, Error, Result, Store,
	models::{ChangeRow, DigestRow, EntryRow, MessageRow, ProfileRow, SessionRow},
	schema,
};
use mood_domain::{
	ChatMessage, ChatRole, ChatSession, EntryPatch, JournalEntry, SummaryDigest, UserProfile,
};

const ENTRY_COLUMNS: &str = "\
entry_id, user_id, journal_text, mood, reflection, created_at, mood_detected_at, reflected_at";
const SESSION_COLUMNS: &str = "\
session_id, user_id, started_at, last_message_at, message_count, summary, persona_at_start";
const MESSAGE_COLUMNS: &str = "message_id, session_id, role, text, seq, created_at";

pub struct PgStore {
	pub pool: PgPool,
}
impl PgStore {
	pub async fn connect(cfg: &mood_config::Postgres) -> Result<Self> {
		let pool =
			PgPoolOptions::new().max_connections(cfg.pool_max_conns).connect(&cfg.dsn).await?;

		Ok(Self { pool })
	}

	pub fn from_pool(pool: PgPool) -> Self {
		Self { pool }
	}

	pub async fn ensure_schema(&self) -> Result<()> {
		let sql = schema::render_schema();
		let lock_id: i64 = 6_231_447;
		// Advisory locks are held per connection, so keep the lock inside one transaction.
		let mut tx = self.pool.begin().await?;

		sqlx::query("SELECT pg_advisory_xact_lock($1)").bind(lock_id).execute(&mut *tx).await?;

		for statement in sql.split(';') {
			let trimmed = statement.trim();

			if trimmed.is_empty() {
				continue;
			}

			sqlx::query(trimmed).execute(&mut *tx).await?;
		}

		tx.commit().await?;

		Ok(())
	}

	async fn insert_entry_inner(&self, entry: &JournalEntry) -> Result<()> {
		let mut tx = self.pool.begin().await?;
		let inserted = sqlx::query(
			"\
INSERT INTO journal_entries (
\tentry_id,
\tuser_id,
\tjournal_text,
\tmood,
\treflection,
\tcreated_at,
\tmood_detected_at,
\treflected_at
)
VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
ON CONFLICT (entry_id) DO NOTHING",
		)
		.bind(entry.entry_id)
		.bind(entry.user_id.as_str())
		.bind(entry.journal_text.as_str())
		.bind(entry.mood.map(|mood| mood.as_str()))
		.bind(entry.reflection.as_deref())
		.bind(entry.created_at)
		.bind(entry.mood_detected_at)
		.bind(entry.reflected_at)
		.execute(&mut *tx)
		.await?
		.rows_affected();

		if inserted == 0 {
			return Err(Error::Conflict(format!("Entry {} already exists.", entry.entry_id)));
		}

		enqueue_change(&mut *tx, &Change::EntryCreated { after: entry.clone() }).await?;

		tx.commit().await?;

		Ok(())
	}

	async fn patch_entry_inner(&self, entry_id: Uuid, patch: &EntryPatch) -> Result<JournalEntry> {
		let mut tx = self.pool.begin().await?;
		let before = lock_entry(&mut *tx, entry_id)
			.await?
			.ok_or_else(|| Error::NotFound(format!("Entry {entry_id} not found.")))?;
		let mut after = before.clone();

		patch.apply(&mut after);

		if after == before {
			tx.commit().await?;

			return Ok(after);
		}

		sqlx::query(
			"\
UPDATE journal_entries
SET journal_text = $1,
\tmood = $2,
\tmood_detected_at = $3,
\treflection = $4,
\treflected_at = $5
WHERE entry_id = $6",
		)
		.bind(after.journal_text.as_str())
		.bind(after.mood.map(|mood| mood.as_str()))
		.bind(after.mood_detected_at)
		.bind(after.reflection.as_deref())
		.bind(after.reflected_at)
		.bind(entry_id)
		.execute(&mut *tx)
		.await?;
		enqueue_change(&mut *tx, &Change::EntryUpdated { before, after: after.clone() }).await?;

		tx.commit().await?;

		Ok(after)
	}

	async fn set_reflection_inner(
		&self,
		entry_id: Uuid,
		reflection: &str,
		reflected_at: OffsetDateTime,
	) -> Result<bool> {
		let mut tx = self.pool.begin().await?;
		let before = lock_entry(&mut *tx, entry_id)
			.await?
			.ok_or_else(|| Error::NotFound(format!("Entry {entry_id} not found.")))?;

		if before.reflection.is_some() {
			tx.commit().await?;

			return Ok(false);
		}

		let updated = sqlx::query(
			"\
UPDATE journal_entries
SET reflection = $1, reflected_at = $2
WHERE entry_id = $3 AND reflection IS NULL",
		)
		.bind(reflection)
		.bind(reflected_at)
		.bind(entry_id)
		.execute(&mut *tx)
		.await?
		.rows_affected();

		if updated == 0 {
			tx.commit().await?;

			return Ok(false);
		}

		let mut after = before.clone();

		after.reflection = Some(reflection.to_string());
		after.reflected_at = Some(reflected_at);

		enqueue_change(&mut *tx, &Change::EntryUpdated { before, after }).await?;

		tx.commit().await?;

		Ok(true)
	}

	async fn list_entries_between_inner(
		&self,
		user_id: &str,
		since: OffsetDateTime,
		until: OffsetDateTime,
	) -> Result<Vec<JournalEntry>> {
		let sql = format!(
			"\
SELECT {ENTRY_COLUMNS}
FROM journal_entries
WHERE user_id = $1 AND created_at >= $2 AND created_at <= $3
ORDER BY created_at DESC"
		);
		let rows = sqlx::query_as::<_, EntryRow>(&sql)
			.bind(user_id)
			.bind(since)
			.bind(until)
			.fetch_all(&self.pool)
			.await?;

		rows.into_iter().map(JournalEntry::try_from).collect()
	}

	async fn set_persona_inner(
		&self,
		user_id: &str,
		persona: Option<&str>,
		now: OffsetDateTime,
	) -> Result<UserProfile> {
		let mut tx = self.pool.begin().await?;
		let before = sqlx::query_as::<_, ProfileRow>(
			"\
SELECT user_id, ai_persona, updated_at
FROM user_profiles
WHERE user_id = $1
FOR UPDATE",
		)
		.bind(user_id)
		.fetch_optional(&mut *tx)
		.await?
		.map(UserProfile::from);
		let after: UserProfile = sqlx::query_as::<_, ProfileRow>(
			"\
INSERT INTO user_profiles (user_id, ai_persona, updated_at)
VALUES ($1,$2,$3)
ON CONFLICT (user_id) DO UPDATE
SET ai_persona = EXCLUDED.ai_persona, updated_at = EXCLUDED.updated_at
RETURNING user_id, ai_persona, updated_at",
		)
		.bind(user_id)
		.bind(persona)
		.bind(now)
		.fetch_one(&mut *tx)
		.await?
		.into();

		enqueue_change(
			&mut *tx,
			&Change::ProfileUpdated { user_id: user_id.to_string(), before, after: after.clone() },
		)
		.await?;

		tx.commit().await?;

		Ok(after)
	}

	async fn delete_session_inner(&self, session_id: Uuid) -> Result<Option<ChatSession>> {
		let mut tx = self.pool.begin().await?;
		let sql =
			format!("DELETE FROM chat_sessions WHERE session_id = $1 RETURNING {SESSION_COLUMNS}");
		let row = sqlx::query_as::<_, SessionRow>(&sql)
			.bind(session_id)
			.fetch_optional(&mut *tx)
			.await?;
		let Some(row) = row else {
			tx.commit().await?;

			return Ok(None);
		};
		let session = ChatSession::try_from(row)?;

		enqueue_change(
			&mut *tx,
			&Change::SessionDeleted { user_id: session.user_id.clone(), session_id },
		)
		.await?;

		tx.commit().await?;

		Ok(Some(session))
	}

	async fn append_message_inner(
		&self,
		session_id: Uuid,
		role: ChatRole,
		text: &str,
		now: OffsetDateTime,
	) -> Result<ChatMessage> {
		let mut tx = self.pool.begin().await?;
		let count: Option<i64> = sqlx::query_scalar(
			"\
UPDATE chat_sessions
SET message_count = message_count + 1, last_message_at = $1
WHERE session_id = $2
RETURNING message_count",
		)
		.bind(now)
		.bind(session_id)
		.fetch_optional(&mut *tx)
		.await?;
		let Some(count) = count else {
			return Err(Error::NotFound(format!("Session {session_id} not found.")));
		};
		let message = ChatMessage {
			message_id: Uuid::new_v4(),
			session_id,
			role,
			text: text.to_string(),
			seq: count.max(0) as u64,
			created_at: now,
		};

		sqlx::query(
			"\
INSERT INTO chat_messages (message_id, session_id, role, text, seq, created_at)
VALUES ($1,$2,$3,$4,$5,$6)",
		)
		.bind(message.message_id)
		.bind(session_id)
		.bind(role.as_str())
		.bind(message.text.as_str())
		.bind(count)
		.bind(now)
		.execute(&mut *tx)
		.await?;

		tx.commit().await?;

		Ok(message)
	}

	async fn claim_change_inner(
		&self,
		now: OffsetDateTime,
		lease_seconds: i64,
	) -> Result<Option<ChangeEvent>> {
		let mut tx = self.pool.begin().await?;
		let row = sqlx::query_as::<_, ChangeRow>(
			"\
SELECT change_id, payload, attempts, created_at
FROM change_outbox
WHERE status IN ('PENDING','CLAIMED') AND available_at <= $1
ORDER BY available_at ASC, created_at ASC
LIMIT 1
FOR UPDATE SKIP LOCKED",
		)
		.bind(now)
		.fetch_optional(&mut *tx)
		.await?;
		let event = if let Some(row) = row {
			let lease_until = now + time::Duration::seconds(lease_seconds);

			sqlx::query(
				"\
UPDATE change_outbox
SET status = $1, attempts = attempts + 1, available_at = $2, updated_at = $3
WHERE change_id = $4",
			)
			.bind(ChangeStatus::Claimed.as_str())
			.bind(lease_until)
			.bind(now)
			.bind(row.change_id)
			.execute(&mut *tx)
			.await?;

			let mut event = ChangeEvent::try_from(row)?;

			event.attempts += 1;

			Some(event)
		} else {
			None
		};

		tx.commit().await?;

		Ok(event)
	}
}
impl Store for PgStore {
	fn insert_entry<'a>(&'a self, entry: &'a JournalEntry) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.insert_entry_inner(entry))
	}

	fn get_entry(&self, entry_id: Uuid) -> BoxFuture<'_, Result<Option<JournalEntry>>> {
		Box::pin(async move {
			let sql = format!("SELECT {ENTRY_COLUMNS} FROM journal_entries WHERE entry_id = $1");
			let row = sqlx::query_as::<_, EntryRow>(&sql)
				.bind(entry_id)
				.fetch_optional(&self.pool)
				.await?;

			row.map(JournalEntry::try_from).transpose()
		})
	}

	fn patch_entry<'a>(
		&'a self,
		entry_id: Uuid,
		patch: &'a EntryPatch,
	) -> BoxFuture<'a, Result<JournalEntry>> {
		Box::pin(self.patch_entry_inner(entry_id, patch))
	}

	fn set_reflection_if_absent<'a>(
		&'a self,
		entry_id: Uuid,
		reflection: &'a str,
		reflected_at: OffsetDateTime,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(self.set_reflection_inner(entry_id, reflection, reflected_at))
	}

	fn list_entries_between<'a>(
		&'a self,
		user_id: &'a str,
		since: OffsetDateTime,
		until: OffsetDateTime,
	) -> BoxFuture<'a, Result<Vec<JournalEntry>>> {
		Box::pin(self.list_entries_between_inner(user_id, since, until))
	}

	fn list_entry_ids<'a>(
		&'a self,
		user_id: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<Uuid>>> {
		Box::pin(async move {
			let ids = sqlx::query_scalar(
				"SELECT entry_id FROM journal_entries WHERE user_id = $1 LIMIT $2",
			)
			.bind(user_id)
			.bind(i64::from(limit))
			.fetch_all(&self.pool)
			.await?;

			Ok(ids)
		})
	}

	fn delete_entries<'a>(&'a self, entry_ids: &'a [Uuid]) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			let deleted = sqlx::query("DELETE FROM journal_entries WHERE entry_id = ANY($1)")
				.bind(entry_ids)
				.execute(&self.pool)
				.await?
				.rows_affected();

			Ok(deleted)
		})
	}

	fn get_profile<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Option<UserProfile>>> {
		Box::pin(async move {
			let row = sqlx::query_as::<_, ProfileRow>(
				"SELECT user_id, ai_persona, updated_at FROM user_profiles WHERE user_id = $1",
			)
			.bind(user_id)
			.fetch_optional(&self.pool)
			.await?;

			Ok(row.map(UserProfile::from))
		})
	}

	fn set_persona<'a>(
		&'a self,
		user_id: &'a str,
		persona: Option<&'a str>,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<UserProfile>> {
		Box::pin(self.set_persona_inner(user_id, persona, now))
	}

	fn delete_profile<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			let deleted = sqlx::query("DELETE FROM user_profiles WHERE user_id = $1")
				.bind(user_id)
				.execute(&self.pool)
				.await?
				.rows_affected();

			Ok(deleted > 0)
		})
	}

	fn get_digest<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Option<SummaryDigest>>> {
		Box::pin(async move {
			let row = sqlx::query_as::<_, DigestRow>(
				"\
SELECT user_id, recommendation, generated_at, entry_count, period_start
FROM summary_digests
WHERE user_id = $1",
			)
			.bind(user_id)
			.fetch_optional(&self.pool)
			.await?;

			Ok(row.map(SummaryDigest::from))
		})
	}

	fn put_digest<'a>(&'a self, digest: &'a SummaryDigest) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			sqlx::query(
				"\
INSERT INTO summary_digests (user_id, recommendation, generated_at, entry_count, period_start)
VALUES ($1,$2,$3,$4,$5)
ON CONFLICT (user_id) DO UPDATE
SET recommendation = EXCLUDED.recommendation,
\tgenerated_at = EXCLUDED.generated_at,
\tentry_count = EXCLUDED.entry_count,
\tperiod_start = EXCLUDED.period_start",
			)
			.bind(digest.user_id.as_str())
			.bind(digest.recommendation.as_str())
			.bind(digest.generated_at)
			.bind(i32::try_from(digest.entry_count).unwrap_or(i32::MAX))
			.bind(digest.period_start)
			.execute(&self.pool)
			.await?;

			Ok(())
		})
	}

	fn delete_digest<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			let deleted = sqlx::query("DELETE FROM summary_digests WHERE user_id = $1")
				.bind(user_id)
				.execute(&self.pool)
				.await?
				.rows_affected();

			Ok(deleted > 0)
		})
	}

	fn create_session<'a>(&'a self, session: &'a ChatSession) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let inserted = sqlx::query(
				"\
INSERT INTO chat_sessions (
\tsession_id,
\tuser_id,
\tstarted_at,
\tlast_message_at,
\tmessage_count,
\tsummary,
\tpersona_at_start
)
VALUES ($1,$2,$3,$4,$5,$6,$7)
ON CONFLICT (session_id) DO NOTHING",
			)
			.bind(session.session_id)
			.bind(session.user_id.as_str())
			.bind(session.started_at)
			.bind(session.last_message_at)
			.bind(i64::try_from(session.message_count).unwrap_or(i64::MAX))
			.bind(session.summary.as_str())
			.bind(session.persona_at_start.as_str())
			.execute(&self.pool)
			.await?
			.rows_affected();

			if inserted == 0 {
				return Err(Error::Conflict(format!(
					"Session {} already exists.",
					session.session_id
				)));
			}

			Ok(())
		})
	}

	fn get_session(&self, session_id: Uuid) -> BoxFuture<'_, Result<Option<ChatSession>>> {
		Box::pin(async move {
			let sql = format!("SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE session_id = $1");
			let row = sqlx::query_as::<_, SessionRow>(&sql)
				.bind(session_id)
				.fetch_optional(&self.pool)
				.await?;

			row.map(ChatSession::try_from).transpose()
		})
	}

	fn delete_session(&self, session_id: Uuid) -> BoxFuture<'_, Result<Option<ChatSession>>> {
		Box::pin(self.delete_session_inner(session_id))
	}

	fn list_session_ids<'a>(
		&'a self,
		user_id: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<Uuid>>> {
		Box::pin(async move {
			let ids =
				sqlx::query_scalar("SELECT session_id FROM chat_sessions WHERE user_id = $1 LIMIT $2")
					.bind(user_id)
					.bind(i64::from(limit))
					.fetch_all(&self.pool)
					.await?;

			Ok(ids)
		})
	}

	fn delete_sessions<'a>(&'a self, session_ids: &'a [Uuid]) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			let deleted = sqlx::query("DELETE FROM chat_sessions WHERE session_id = ANY($1)")
				.bind(session_ids)
				.execute(&self.pool)
				.await?
				.rows_affected();

			Ok(deleted)
		})
	}

	fn append_message<'a>(
		&'a self,
		session_id: Uuid,
		role: ChatRole,
		text: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<ChatMessage>> {
		Box::pin(self.append_message_inner(session_id, role, text, now))
	}

	fn set_session_summary<'a>(
		&'a self,
		session_id: Uuid,
		summary: &'a str,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let updated = sqlx::query("UPDATE chat_sessions SET summary = $1 WHERE session_id = $2")
				.bind(summary)
				.bind(session_id)
				.execute(&self.pool)
				.await?
				.rows_affected();

			if updated == 0 {
				return Err(Error::NotFound(format!("Session {session_id} not found.")));
			}

			Ok(())
		})
	}

	fn recent_messages(
		&self,
		session_id: Uuid,
		limit: u32,
	) -> BoxFuture<'_, Result<Vec<ChatMessage>>> {
		Box::pin(async move {
			let sql = format!(
				"\
SELECT {MESSAGE_COLUMNS}
FROM chat_messages
WHERE session_id = $1
ORDER BY seq DESC
LIMIT $2"
			);
			let rows = sqlx::query_as::<_, MessageRow>(&sql)
				.bind(session_id)
				.bind(i64::from(limit))
				.fetch_all(&self.pool)
				.await?;
			let mut messages =
				rows.into_iter().map(ChatMessage::try_from).collect::<Result<Vec<_>>>()?;

			messages.reverse();

			Ok(messages)
		})
	}

	fn all_messages(&self, session_id: Uuid) -> BoxFuture<'_, Result<Vec<ChatMessage>>> {
		Box::pin(async move {
			let sql = format!(
				"SELECT {MESSAGE_COLUMNS} FROM chat_messages WHERE session_id = $1 ORDER BY seq ASC"
			);
			let rows =
				sqlx::query_as::<_, MessageRow>(&sql).bind(session_id).fetch_all(&self.pool).await?;

			rows.into_iter().map(ChatMessage::try_from).collect()
		})
	}

	fn list_message_ids(&self, session_id: Uuid, limit: u32) -> BoxFuture<'_, Result<Vec<Uuid>>> {
		Box::pin(async move {
			let ids = sqlx::query_scalar(
				"\
SELECT message_id
FROM chat_messages
WHERE session_id = $1
ORDER BY seq ASC
LIMIT $2",
			)
			.bind(session_id)
			.bind(i64::from(limit))
			.fetch_all(&self.pool)
			.await?;

			Ok(ids)
		})
	}

	fn delete_messages<'a>(&'a self, message_ids: &'a [Uuid]) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			let deleted = sqlx::query("DELETE FROM chat_messages WHERE message_id = ANY($1)")
				.bind(message_ids)
				.execute(&self.pool)
				.await?
				.rows_affected();

			Ok(deleted)
		})
	}

	fn enqueue_change<'a>(&'a self, change: &'a Change) -> BoxFuture<'a, Result<Uuid>> {
		Box::pin(enqueue_change(&self.pool, change))
	}

	fn claim_change(
		&self,
		now: OffsetDateTime,
		lease_seconds: i64,
	) -> BoxFuture<'_, Result<Option<ChangeEvent>>> {
		Box::pin(self.claim_change_inner(now, lease_seconds))
	}

	fn finish_change<'a>(
		&'a self,
		change_id: Uuid,
		error: Option<&'a str>,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let status = if error.is_some() { ChangeStatus::Failed } else { ChangeStatus::Done };

			sqlx::query(
				"\
UPDATE change_outbox
SET status = $1, last_error = $2, available_at = $3, updated_at = $3
WHERE change_id = $4",
			)
			.bind(status.as_str())
			.bind(error)
			.bind(now)
			.bind(change_id)
			.execute(&self.pool)
			.await?;

			Ok(())
		})
	}
}

async fn lock_entry<'e, E>(executor: E, entry_id: Uuid) -> Result<Option<JournalEntry>>
where
	E: PgExecutor<'e>,
{
	let sql =
		format!("SELECT {ENTRY_COLUMNS} FROM journal_entries WHERE entry_id = $1 FOR UPDATE");
	let row =
		sqlx::query_as::<_, EntryRow>(&sql).bind(entry_id).fetch_optional(executor).await?;

	row.map(JournalEntry::try_from).transpose()
}

async fn enqueue_change<'e, E>(executor: E, change: &Change) -> Result<Uuid>
where
	E: PgExecutor<'e>,
{
	let change_id = Uuid::new_v4();
	let now = OffsetDateTime::now_utc();

	sqlx::query(
		"\
INSERT INTO change_outbox (
\tchange_id,
\tkind,
\tpayload,
\tstatus,
\tattempts,
\tavailable_at,
\tcreated_at,
\tupdated_at
)
VALUES ($1,$2,$3,$4,0,$5,$5,$5)",
	)
	.bind(change_id)
	.bind(change.kind())
	.bind(serde_json::to_value(change)?)
	.bind(ChangeStatus::Pending.as_str())
	.bind(now)
	.execute(executor)
	.await?;

	Ok(change_id)
}
