use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};

use serde_json::Map;
use time::OffsetDateTime;
use uuid::Uuid;

use mood_config::{
	Chat, Cleanup, Config, Enrichment, GeneratorProviderConfig, Providers, Service, Storage,
	Worker,
};
use mood_domain::{
	ChatMessage, ChatRole, ChatSession, EntryPatch, JournalEntry, Mood, SummaryDigest,
	UserProfile,
};
use mood_service::{MoodService, SendMessageRequest};
use mood_storage::{BoxFuture, Change, ChangeEvent, MemoryStore, Result, Store};
use mood_testkit::ScriptedGenerator;

/// Lets a rival purger delete every batch between our fetch and our delete.
struct RivalPurgeStore {
	inner: Arc<MemoryStore>,
	lost_batches: AtomicUsize,
}
impl RivalPurgeStore {
	fn new(inner: Arc<MemoryStore>) -> Self {
		Self { inner, lost_batches: AtomicUsize::new(0) }
	}

	fn lost(&self, removed_by_us: u64) -> u64 {
		if removed_by_us == 0 {
			self.lost_batches.fetch_add(1, Ordering::SeqCst);
		}

		removed_by_us
	}
}
impl Store for RivalPurgeStore {
	fn insert_entry<'a>(&'a self, entry: &'a JournalEntry) -> BoxFuture<'a, Result<()>> {
		self.inner.insert_entry(entry)
	}

	fn get_entry(&self, entry_id: Uuid) -> BoxFuture<'_, Result<Option<JournalEntry>>> {
		self.inner.get_entry(entry_id)
	}

	fn patch_entry<'a>(
		&'a self,
		entry_id: Uuid,
		patch: &'a EntryPatch,
	) -> BoxFuture<'a, Result<JournalEntry>> {
		self.inner.patch_entry(entry_id, patch)
	}

	fn set_reflection_if_absent<'a>(
		&'a self,
		entry_id: Uuid,
		reflection: &'a str,
		reflected_at: OffsetDateTime,
	) -> BoxFuture<'a, Result<bool>> {
		self.inner.set_reflection_if_absent(entry_id, reflection, reflected_at)
	}

	fn list_entries_between<'a>(
		&'a self,
		user_id: &'a str,
		since: OffsetDateTime,
		until: OffsetDateTime,
	) -> BoxFuture<'a, Result<Vec<JournalEntry>>> {
		self.inner.list_entries_between(user_id, since, until)
	}

	fn list_entry_ids<'a>(
		&'a self,
		user_id: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<Uuid>>> {
		self.inner.list_entry_ids(user_id, limit)
	}

	fn delete_entries<'a>(&'a self, entry_ids: &'a [Uuid]) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			self.inner.delete_entries(entry_ids).await?;

			Ok(self.lost(self.inner.delete_entries(entry_ids).await?))
		})
	}

	fn get_profile<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Option<UserProfile>>> {
		self.inner.get_profile(user_id)
	}

	fn set_persona<'a>(
		&'a self,
		user_id: &'a str,
		persona: Option<&'a str>,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<UserProfile>> {
		self.inner.set_persona(user_id, persona, now)
	}

	fn delete_profile<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<bool>> {
		self.inner.delete_profile(user_id)
	}

	fn get_digest<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Option<SummaryDigest>>> {
		self.inner.get_digest(user_id)
	}

	fn put_digest<'a>(&'a self, digest: &'a SummaryDigest) -> BoxFuture<'a, Result<()>> {
		self.inner.put_digest(digest)
	}

	fn delete_digest<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<bool>> {
		self.inner.delete_digest(user_id)
	}

	fn create_session<'a>(&'a self, session: &'a ChatSession) -> BoxFuture<'a, Result<()>> {
		self.inner.create_session(session)
	}

	fn get_session(&self, session_id: Uuid) -> BoxFuture<'_, Result<Option<ChatSession>>> {
		self.inner.get_session(session_id)
	}

	fn delete_session(&self, session_id: Uuid) -> BoxFuture<'_, Result<Option<ChatSession>>> {
		self.inner.delete_session(session_id)
	}

	fn list_session_ids<'a>(
		&'a self,
		user_id: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<Uuid>>> {
		self.inner.list_session_ids(user_id, limit)
	}

	fn delete_sessions<'a>(&'a self, session_ids: &'a [Uuid]) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			self.inner.delete_sessions(session_ids).await?;

			Ok(self.lost(self.inner.delete_sessions(session_ids).await?))
		})
	}

	fn append_message<'a>(
		&'a self,
		session_id: Uuid,
		role: ChatRole,
		text: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<ChatMessage>> {
		self.inner.append_message(session_id, role, text, now)
	}

	fn set_session_summary<'a>(
		&'a self,
		session_id: Uuid,
		summary: &'a str,
	) -> BoxFuture<'a, Result<()>> {
		self.inner.set_session_summary(session_id, summary)
	}

	fn recent_messages(
		&self,
		session_id: Uuid,
		limit: u32,
	) -> BoxFuture<'_, Result<Vec<ChatMessage>>> {
		self.inner.recent_messages(session_id, limit)
	}

	fn all_messages(&self, session_id: Uuid) -> BoxFuture<'_, Result<Vec<ChatMessage>>> {
		self.inner.all_messages(session_id)
	}

	fn list_message_ids(&self, session_id: Uuid, limit: u32) -> BoxFuture<'_, Result<Vec<Uuid>>> {
		self.inner.list_message_ids(session_id, limit)
	}

	fn delete_messages<'a>(&'a self, message_ids: &'a [Uuid]) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			self.inner.delete_messages(message_ids).await?;

			Ok(self.lost(self.inner.delete_messages(message_ids).await?))
		})
	}

	fn enqueue_change<'a>(&'a self, change: &'a Change) -> BoxFuture<'a, Result<Uuid>> {
		self.inner.enqueue_change(change)
	}

	fn claim_change(
		&self,
		now: OffsetDateTime,
		lease_seconds: i64,
	) -> BoxFuture<'_, Result<Option<ChangeEvent>>> {
		self.inner.claim_change(now, lease_seconds)
	}

	fn finish_change<'a>(
		&'a self,
		change_id: Uuid,
		error: Option<&'a str>,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>> {
		self.inner.finish_change(change_id, error, now)
	}
}

fn test_config() -> Config {
	Config {
		service: Service { http_bind: "127.0.0.1:0".to_string(), log_level: "info".to_string() },
		storage: Storage { backend: "memory".to_string(), postgres: None },
		providers: Providers {
			generator: GeneratorProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: Some("test-key".to_string()),
				path: "/chat/completions".to_string(),
				model: "test-model".to_string(),
				temperature: 0.0,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
		},
		enrichment: Enrichment { rate_limit_cooldown_ms: 0, ..Default::default() },
		chat: Chat::default(),
		cleanup: Cleanup::default(),
		worker: Worker::default(),
	}
}

#[tokio::test]
async fn purges_finish_cleanly_when_a_rival_deletes_first() {
	let inner = Arc::new(MemoryStore::new());
	let store = Arc::new(RivalPurgeStore::new(inner.clone()));
	let service =
		MoodService::new(test_config(), store.clone(), Arc::new(ScriptedGenerator::always("Hi!")));
	let mut entry = JournalEntry::new("u1", "Rainy walk to the market.", OffsetDateTime::now_utc());

	entry.mood = Some(Mood::Neutral);

	inner.insert_entry(&entry).await.expect("Insert failed.");
	inner.set_persona("u1", Some("coach"), OffsetDateTime::now_utc()).await.expect("Set failed.");

	let chat = service
		.send_message(SendMessageRequest {
			user_id: "u1".to_string(),
			message: "Hello".to_string(),
			session_id: None,
		})
		.await
		.expect("Send failed.");
	let session_report = service
		.purge_session_messages(chat.session_id)
		.await
		.expect("Session purge must tolerate a rival.");

	assert!(session_report.batches.is_empty());
	assert_eq!(inner.message_count(chat.session_id).await, 0);

	let account_report =
		service.purge_account("u1").await.expect("Account purge must tolerate a rival.");

	assert_eq!(account_report.entries.deleted(), 0);
	assert_eq!(account_report.sessions.deleted(), 0);
	assert!(account_report.profile_deleted);
	assert!(inner.get_entry(entry.entry_id).await.expect("Get failed.").is_none());
	assert!(inner.get_session(chat.session_id).await.expect("Get failed.").is_none());
	assert!(inner.get_profile("u1").await.expect("Get failed.").is_none());
	assert_eq!(store.lost_batches.load(Ordering::SeqCst), 3);
}
