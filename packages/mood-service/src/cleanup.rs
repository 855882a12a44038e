use uuid::Uuid;

use crate::{Error, MoodService, Result};
use mood_storage::{BoxFuture, Change};

/// Shape of one bounded purge: the size of every batch deleted and how many fetches it took,
/// including the final empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
	pub batches: Vec<u64>,
	pub fetches: u32,
}
impl PurgeReport {
	pub fn deleted(&self) -> u64 {
		self.batches.iter().sum()
	}

	fn absorb(&mut self, other: PurgeReport) {
		self.batches.extend(other.batches);
		self.fetches += other.fetches;
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountPurgeReport {
	pub entries: PurgeReport,
	pub messages: PurgeReport,
	pub sessions: PurgeReport,
	pub digest_deleted: bool,
	pub profile_deleted: bool,
}

#[derive(Clone, Copy)]
enum Collection<'a> {
	Entries { user_id: &'a str },
	Messages { session_id: Uuid },
}

impl MoodService {
	/// Session delete route. The message log is purged later by the change it emits.
	pub async fn delete_session(&self, user_id: &str, session_id: Uuid) -> Result<()> {
		let owned = self
			.store
			.get_session(session_id)
			.await?
			.is_some_and(|session| session.user_id == user_id);

		if !owned {
			return Err(Error::not_found("Chat session not found."));
		}

		self.store.delete_session(session_id).await?;

		Ok(())
	}

	/// Account delete route: records the deletion for the cascade and returns its change id.
	pub async fn request_account_deletion(&self, user_id: &str) -> Result<Uuid> {
		let user_id = user_id.trim();

		if user_id.is_empty() {
			return Err(Error::invalid("user_id is required."));
		}

		let change = Change::AccountDeleted { user_id: user_id.to_string() };
		let change_id = self.store.enqueue_change(&change).await?;

		tracing::info!(user_id, %change_id, "Account deletion requested.");

		Ok(change_id)
	}

	pub async fn purge_session_messages(&self, session_id: Uuid) -> Result<PurgeReport> {
		let report = self.purge(Collection::Messages { session_id }).await?;

		tracing::info!(%session_id, deleted = report.deleted(), "Session messages purged.");

		Ok(report)
	}

	/// Entries first, then every session's messages, then the sessions, the digest and finally
	/// the profile. Safe to re-run after a partial failure.
	pub async fn purge_account(&self, user_id: &str) -> Result<AccountPurgeReport> {
		let batch_size = self.cfg.cleanup.batch_size;
		let mut report = AccountPurgeReport {
			entries: self.purge(Collection::Entries { user_id }).await?,
			..Default::default()
		};

		loop {
			let session_ids = self.store.list_session_ids(user_id, batch_size).await?;

			report.sessions.fetches += 1;

			if session_ids.is_empty() {
				break;
			}

			for session_id in &session_ids {
				let purged = self.purge(Collection::Messages { session_id: *session_id }).await?;

				report.messages.absorb(purged);
			}

			let deleted = self.store.delete_sessions(&session_ids).await?;

			if deleted == 0 {
				tracing::debug!(user_id, "Sessions already purged elsewhere. Stopping.");

				break;
			}

			report.sessions.batches.push(deleted);
		}

		report.digest_deleted = self.store.delete_digest(user_id).await?;
		report.profile_deleted = self.store.delete_profile(user_id).await?;

		tracing::info!(
			user_id,
			entries = report.entries.deleted(),
			sessions = report.sessions.deleted(),
			messages = report.messages.deleted(),
			"Account purged."
		);

		Ok(report)
	}

	async fn purge(&self, collection: Collection<'_>) -> Result<PurgeReport> {
		let batch_size = self.cfg.cleanup.batch_size;
		let mut report = PurgeReport::default();

		loop {
			let fetch: BoxFuture<'_, mood_storage::Result<Vec<Uuid>>> = match collection {
				Collection::Entries { user_id } => self.store.list_entry_ids(user_id, batch_size),
				Collection::Messages { session_id } =>
					self.store.list_message_ids(session_id, batch_size),
			};
			let ids = fetch.await?;

			report.fetches += 1;

			if ids.is_empty() {
				break;
			}

			let deleted = match collection {
				Collection::Entries { .. } => self.store.delete_entries(&ids).await?,
				Collection::Messages { .. } => self.store.delete_messages(&ids).await?,
			};

			// Zero means a concurrent purge removed this batch first.
			if deleted == 0 {
				tracing::debug!(fetched = ids.len(), "Batch already purged elsewhere. Stopping.");

				break;
			}

			report.batches.push(deleted);
		}

		Ok(report)
	}
}
