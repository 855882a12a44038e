pub mod memory;
pub mod pg;

mod error;
mod models;
mod schema;

pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use pg::PgStore;

use std::{future::Future, pin::Pin, sync::Arc};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use mood_domain::{
	ChatMessage, ChatRole, ChatSession, EntryPatch, JournalEntry, SummaryDigest, UserProfile,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A change notification with before/after snapshots, written to the outbox in the same
/// transaction as the mutation it describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
	EntryCreated { after: JournalEntry },
	EntryUpdated { before: JournalEntry, after: JournalEntry },
	ProfileUpdated { user_id: String, before: Option<UserProfile>, after: UserProfile },
	SessionDeleted { user_id: String, session_id: Uuid },
	AccountDeleted { user_id: String },
}
impl Change {
	pub fn kind(&self) -> &'static str {
		match self {
			Self::EntryCreated { .. } => "entry_created",
			Self::EntryUpdated { .. } => "entry_updated",
			Self::ProfileUpdated { .. } => "profile_updated",
			Self::SessionDeleted { .. } => "session_deleted",
			Self::AccountDeleted { .. } => "account_deleted",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
	Pending,
	Claimed,
	Done,
	Failed,
}
impl ChangeStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "PENDING",
			Self::Claimed => "CLAIMED",
			Self::Done => "DONE",
			Self::Failed => "FAILED",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"PENDING" => Some(Self::Pending),
			"CLAIMED" => Some(Self::Claimed),
			"DONE" => Some(Self::Done),
			"FAILED" => Some(Self::Failed),
			_ => None,
		}
	}
}

#[derive(Debug, Clone)]
pub struct ChangeEvent {
	pub change_id: Uuid,
	pub change: Change,
	pub attempts: i32,
	pub created_at: OffsetDateTime,
}

/// Typed document-store port. Entry and profile writes are partial and emit change events;
/// bulk deletes used by the cascade emit nothing.
pub trait Store
where
	Self: Send + Sync,
{
	fn insert_entry<'a>(&'a self, entry: &'a JournalEntry) -> BoxFuture<'a, Result<()>>;

	fn get_entry(&self, entry_id: Uuid) -> BoxFuture<'_, Result<Option<JournalEntry>>>;

	/// Writes only the fields named by `patch` and returns the updated entry. No event is
	/// emitted when the patch leaves the entry unchanged.
	fn patch_entry<'a>(
		&'a self,
		entry_id: Uuid,
		patch: &'a EntryPatch,
	) -> BoxFuture<'a, Result<JournalEntry>>;

	/// Compare-and-set on an absent reflection. Returns `false` when a reflection was already
	/// present and nothing was written.
	fn set_reflection_if_absent<'a>(
		&'a self,
		entry_id: Uuid,
		reflection: &'a str,
		reflected_at: OffsetDateTime,
	) -> BoxFuture<'a, Result<bool>>;

	/// Entries with `since <= created_at <= until`, newest first.
	fn list_entries_between<'a>(
		&'a self,
		user_id: &'a str,
		since: OffsetDateTime,
		until: OffsetDateTime,
	) -> BoxFuture<'a, Result<Vec<JournalEntry>>>;

	fn list_entry_ids<'a>(
		&'a self,
		user_id: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<Uuid>>>;

	fn delete_entries<'a>(&'a self, entry_ids: &'a [Uuid]) -> BoxFuture<'a, Result<u64>>;

	fn get_profile<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Option<UserProfile>>>;

	/// Upserts the profile's persona preference and emits `ProfileUpdated`.
	fn set_persona<'a>(
		&'a self,
		user_id: &'a str,
		persona: Option<&'a str>,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<UserProfile>>;

	fn delete_profile<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<bool>>;

	fn get_digest<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Option<SummaryDigest>>>;

	fn put_digest<'a>(&'a self, digest: &'a SummaryDigest) -> BoxFuture<'a, Result<()>>;

	fn delete_digest<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<bool>>;

	fn create_session<'a>(&'a self, session: &'a ChatSession) -> BoxFuture<'a, Result<()>>;

	fn get_session(&self, session_id: Uuid) -> BoxFuture<'_, Result<Option<ChatSession>>>;

	/// Removes the session record and emits `SessionDeleted`. Its messages are left for the
	/// cascade.
	fn delete_session(&self, session_id: Uuid) -> BoxFuture<'_, Result<Option<ChatSession>>>;

	fn list_session_ids<'a>(
		&'a self,
		user_id: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<Uuid>>>;

	fn delete_sessions<'a>(&'a self, session_ids: &'a [Uuid]) -> BoxFuture<'a, Result<u64>>;

	/// Appends a message and bumps the session counter atomically. The returned message's `seq`
	/// is the new `message_count`.
	fn append_message<'a>(
		&'a self,
		session_id: Uuid,
		role: ChatRole,
		text: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<ChatMessage>>;

	fn set_session_summary<'a>(
		&'a self,
		session_id: Uuid,
		summary: &'a str,
	) -> BoxFuture<'a, Result<()>>;

	/// The last `limit` messages in chronological order.
	fn recent_messages(
		&self,
		session_id: Uuid,
		limit: u32,
	) -> BoxFuture<'_, Result<Vec<ChatMessage>>>;

	fn all_messages(&self, session_id: Uuid) -> BoxFuture<'_, Result<Vec<ChatMessage>>>;

	fn list_message_ids(&self, session_id: Uuid, limit: u32) -> BoxFuture<'_, Result<Vec<Uuid>>>;

	fn delete_messages<'a>(&'a self, message_ids: &'a [Uuid]) -> BoxFuture<'a, Result<u64>>;

	fn enqueue_change<'a>(&'a self, change: &'a Change) -> BoxFuture<'a, Result<Uuid>>;

	/// Claims the oldest available event and leases it until `now + lease_seconds`. An expired
	/// lease makes the event claimable again.
	fn claim_change(
		&self,
		now: OffsetDateTime,
		lease_seconds: i64,
	) -> BoxFuture<'_, Result<Option<ChangeEvent>>>;

	/// Marks the event done, or failed when `error` is set. Failed events are terminal.
	fn finish_change<'a>(
		&'a self,
		change_id: Uuid,
		error: Option<&'a str>,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>>;
}

/// Opens the configured backend. Postgres schemas are bootstrapped before returning.
pub async fn open(cfg: &mood_config::Storage) -> Result<Arc<dyn Store>> {
	match cfg.backend.as_str() {
		"memory" => Ok(Arc::new(MemoryStore::new())),
		"postgres" => {
			let Some(postgres) = cfg.postgres.as_ref() else {
				return Err(Error::InvalidArgument(
					"storage.postgres is required for the postgres backend.".to_string(),
				));
			};
			let store = PgStore::connect(postgres).await?;

			store.ensure_schema().await?;

			Ok(Arc::new(store))
		},
		other => Err(Error::InvalidArgument(format!("Unknown storage backend {other:?}."))),
	}
}
