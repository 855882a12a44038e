use std::collections::{BTreeMap, HashMap};

use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{BoxFuture, Change, ChangeEvent, ChangeStatus, Error, Result, Store};
use mood_domain::{
	ChatMessage, ChatRole, ChatSession, EntryPatch, JournalEntry, SummaryDigest, UserProfile,
};

/// Outbox row as seen by tests of the in-memory backend.
#[derive(Debug, Clone)]
pub struct ChangeRecord {
	pub change_id: Uuid,
	pub change: Change,
	pub status: ChangeStatus,
	pub attempts: i32,
	pub last_error: Option<String>,
	pub available_at: OffsetDateTime,
	pub created_at: OffsetDateTime,
}

#[derive(Default)]
struct Tables {
	entries: HashMap<Uuid, JournalEntry>,
	profiles: HashMap<String, UserProfile>,
	digests: HashMap<String, SummaryDigest>,
	sessions: HashMap<Uuid, ChatSession>,
	messages: BTreeMap<(Uuid, u64), ChatMessage>,
	message_keys: HashMap<Uuid, (Uuid, u64)>,
	changes: Vec<ChangeRecord>,
}
impl Tables {
	fn push_change(&mut self, change: Change) -> Uuid {
		let now = OffsetDateTime::now_utc();
		let change_id = Uuid::new_v4();

		self.changes.push(ChangeRecord {
			change_id,
			change,
			status: ChangeStatus::Pending,
			attempts: 0,
			last_error: None,
			available_at: now,
			created_at: now,
		});

		change_id
	}

	fn session_messages(
		&self,
		session_id: Uuid,
	) -> impl DoubleEndedIterator<Item = &ChatMessage> {
		self.messages.range((session_id, 0)..=(session_id, u64::MAX)).map(|(_, message)| message)
	}
}

/// Process-local store. Every operation runs under one lock, which gives it the same
/// per-operation atomicity as a Postgres transaction.
#[derive(Default)]
pub struct MemoryStore {
	tables: RwLock<Tables>,
}
impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn changes(&self) -> Vec<ChangeRecord> {
		self.tables.read().await.changes.clone()
	}

	pub async fn message_count(&self, session_id: Uuid) -> usize {
		self.tables.read().await.session_messages(session_id).count()
	}

	async fn insert_entry_inner(&self, entry: &JournalEntry) -> Result<()> {
		let mut tables = self.tables.write().await;

		if tables.entries.contains_key(&entry.entry_id) {
			return Err(Error::Conflict(format!("Entry {} already exists.", entry.entry_id)));
		}

		tables.entries.insert(entry.entry_id, entry.clone());
		tables.push_change(Change::EntryCreated { after: entry.clone() });

		Ok(())
	}

	async fn patch_entry_inner(&self, entry_id: Uuid, patch: &EntryPatch) -> Result<JournalEntry> {
		let mut tables = self.tables.write().await;
		let Some(current) = tables.entries.get_mut(&entry_id) else {
			return Err(Error::NotFound(format!("Entry {entry_id} not found.")));
		};
		let before = current.clone();

		patch.apply(current);

		let after = current.clone();

		if before != after {
			tables.push_change(Change::EntryUpdated { before, after: after.clone() });
		}

		Ok(after)
	}

	async fn set_reflection_inner(
		&self,
		entry_id: Uuid,
		reflection: &str,
		reflected_at: OffsetDateTime,
	) -> Result<bool> {
		let mut tables = self.tables.write().await;
		let Some(current) = tables.entries.get_mut(&entry_id) else {
			return Err(Error::NotFound(format!("Entry {entry_id} not found.")));
		};

		if current.reflection.is_some() {
			return Ok(false);
		}

		let before = current.clone();

		current.reflection = Some(reflection.to_string());
		current.reflected_at = Some(reflected_at);

		let after = current.clone();

		tables.push_change(Change::EntryUpdated { before, after });

		Ok(true)
	}

	async fn set_persona_inner(
		&self,
		user_id: &str,
		persona: Option<&str>,
		now: OffsetDateTime,
	) -> Result<UserProfile> {
		let mut tables = self.tables.write().await;
		let before = tables.profiles.get(user_id).cloned();
		let after = UserProfile {
			user_id: user_id.to_string(),
			ai_persona: persona.map(str::to_string),
			updated_at: now,
		};

		tables.profiles.insert(user_id.to_string(), after.clone());
		tables.push_change(Change::ProfileUpdated {
			user_id: user_id.to_string(),
			before,
			after: after.clone(),
		});

		Ok(after)
	}

	async fn append_message_inner(
		&self,
		session_id: Uuid,
		role: ChatRole,
		text: &str,
		now: OffsetDateTime,
	) -> Result<ChatMessage> {
		let mut tables = self.tables.write().await;
		let Some(session) = tables.sessions.get_mut(&session_id) else {
			return Err(Error::NotFound(format!("Session {session_id} not found.")));
		};

		session.message_count += 1;
		session.last_message_at = now;

		let message = ChatMessage {
			message_id: Uuid::new_v4(),
			session_id,
			role,
			text: text.to_string(),
			seq: session.message_count,
			created_at: now,
		};

		tables.message_keys.insert(message.message_id, (session_id, message.seq));
		tables.messages.insert((session_id, message.seq), message.clone());

		Ok(message)
	}

	async fn claim_change_inner(
		&self,
		now: OffsetDateTime,
		lease_seconds: i64,
	) -> Result<Option<ChangeEvent>> {
		let mut tables = self.tables.write().await;
		let next = tables
			.changes
			.iter_mut()
			.filter(|record| {
				matches!(record.status, ChangeStatus::Pending | ChangeStatus::Claimed)
					&& record.available_at <= now
			})
			.min_by_key(|record| record.available_at);
		let Some(record) = next else {
			return Ok(None);
		};

		record.status = ChangeStatus::Claimed;
		record.attempts += 1;
		record.available_at = now + time::Duration::seconds(lease_seconds);

		Ok(Some(ChangeEvent {
			change_id: record.change_id,
			change: record.change.clone(),
			attempts: record.attempts,
			created_at: record.created_at,
		}))
	}

	async fn finish_change_inner(
		&self,
		change_id: Uuid,
		error: Option<&str>,
		now: OffsetDateTime,
	) -> Result<()> {
		let mut tables = self.tables.write().await;
		let Some(index) = tables.changes.iter().position(|record| record.change_id == change_id)
		else {
			return Err(Error::NotFound(format!("Change {change_id} not found.")));
		};

		// Only failures are kept for inspection.
		let Some(error) = error else {
			tables.changes.remove(index);

			return Ok(());
		};
		let record = &mut tables.changes[index];

		record.status = ChangeStatus::Failed;
		record.last_error = Some(error.to_string());
		record.available_at = now;

		Ok(())
	}
}
impl Store for MemoryStore {
	fn insert_entry<'a>(&'a self, entry: &'a JournalEntry) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.insert_entry_inner(entry))
	}

	fn get_entry(&self, entry_id: Uuid) -> BoxFuture<'_, Result<Option<JournalEntry>>> {
		Box::pin(async move { Ok(self.tables.read().await.entries.get(&entry_id).cloned()) })
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
		Box::pin(async move {
			let tables = self.tables.read().await;
			let mut entries = tables
				.entries
				.values()
				.filter(|entry| {
					entry.user_id == user_id && entry.created_at >= since && entry.created_at <= until
				})
				.cloned()
				.collect::<Vec<_>>();

			entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));

			Ok(entries)
		})
	}

	fn list_entry_ids<'a>(
		&'a self,
		user_id: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<Uuid>>> {
		Box::pin(async move {
			let tables = self.tables.read().await;

			Ok(tables
				.entries
				.values()
				.filter(|entry| entry.user_id == user_id)
				.map(|entry| entry.entry_id)
				.take(limit as usize)
				.collect())
		})
	}

	fn delete_entries<'a>(&'a self, entry_ids: &'a [Uuid]) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			let mut tables = self.tables.write().await;

			Ok(entry_ids.iter().filter(|id| tables.entries.remove(*id).is_some()).count() as u64)
		})
	}

	fn get_profile<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Option<UserProfile>>> {
		Box::pin(async move { Ok(self.tables.read().await.profiles.get(user_id).cloned()) })
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
		Box::pin(async move { Ok(self.tables.write().await.profiles.remove(user_id).is_some()) })
	}

	fn get_digest<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Option<SummaryDigest>>> {
		Box::pin(async move { Ok(self.tables.read().await.digests.get(user_id).cloned()) })
	}

	fn put_digest<'a>(&'a self, digest: &'a SummaryDigest) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.tables.write().await.digests.insert(digest.user_id.clone(), digest.clone());

			Ok(())
		})
	}

	fn delete_digest<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move { Ok(self.tables.write().await.digests.remove(user_id).is_some()) })
	}

	fn create_session<'a>(&'a self, session: &'a ChatSession) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut tables = self.tables.write().await;

			if tables.sessions.contains_key(&session.session_id) {
				return Err(Error::Conflict(format!(
					"Session {} already exists.",
					session.session_id
				)));
			}

			tables.sessions.insert(session.session_id, session.clone());

			Ok(())
		})
	}

	fn get_session(&self, session_id: Uuid) -> BoxFuture<'_, Result<Option<ChatSession>>> {
		Box::pin(async move { Ok(self.tables.read().await.sessions.get(&session_id).cloned()) })
	}

	fn delete_session(&self, session_id: Uuid) -> BoxFuture<'_, Result<Option<ChatSession>>> {
		Box::pin(async move {
			let mut tables = self.tables.write().await;
			let removed = tables.sessions.remove(&session_id);

			if let Some(session) = &removed {
				tables.push_change(Change::SessionDeleted {
					user_id: session.user_id.clone(),
					session_id,
				});
			}

			Ok(removed)
		})
	}

	fn list_session_ids<'a>(
		&'a self,
		user_id: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<Uuid>>> {
		Box::pin(async move {
			let tables = self.tables.read().await;

			Ok(tables
				.sessions
				.values()
				.filter(|session| session.user_id == user_id)
				.map(|session| session.session_id)
				.take(limit as usize)
				.collect())
		})
	}

	fn delete_sessions<'a>(&'a self, session_ids: &'a [Uuid]) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			let mut tables = self.tables.write().await;

			Ok(session_ids.iter().filter(|id| tables.sessions.remove(*id).is_some()).count() as u64)
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
			let mut tables = self.tables.write().await;
			let Some(session) = tables.sessions.get_mut(&session_id) else {
				return Err(Error::NotFound(format!("Session {session_id} not found.")));
			};

			session.summary = summary.to_string();

			Ok(())
		})
	}

	fn recent_messages(
		&self,
		session_id: Uuid,
		limit: u32,
	) -> BoxFuture<'_, Result<Vec<ChatMessage>>> {
		Box::pin(async move {
			let tables = self.tables.read().await;
			let mut recent = tables
				.session_messages(session_id)
				.rev()
				.take(limit as usize)
				.cloned()
				.collect::<Vec<_>>();

			recent.reverse();

			Ok(recent)
		})
	}

	fn all_messages(&self, session_id: Uuid) -> BoxFuture<'_, Result<Vec<ChatMessage>>> {
		Box::pin(async move {
			Ok(self.tables.read().await.session_messages(session_id).cloned().collect())
		})
	}

	fn list_message_ids(&self, session_id: Uuid, limit: u32) -> BoxFuture<'_, Result<Vec<Uuid>>> {
		Box::pin(async move {
			let tables = self.tables.read().await;

			Ok(tables
				.session_messages(session_id)
				.take(limit as usize)
				.map(|message| message.message_id)
				.collect())
		})
	}

	fn delete_messages<'a>(&'a self, message_ids: &'a [Uuid]) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			let mut tables = self.tables.write().await;
			let mut deleted = 0;

			for message_id in message_ids {
				if let Some(key) = tables.message_keys.remove(message_id)
					&& tables.messages.remove(&key).is_some()
				{
					deleted += 1;
				}
			}

			Ok(deleted)
		})
	}

	fn enqueue_change<'a>(&'a self, change: &'a Change) -> BoxFuture<'a, Result<Uuid>> {
		Box::pin(async move { Ok(self.tables.write().await.push_change(change.clone())) })
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
		Box::pin(self.finish_change_inner(change_id, error, now))
	}
}
