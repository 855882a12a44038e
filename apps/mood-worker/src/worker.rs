use std::{fmt::Debug, future::Future, sync::Arc, time::Duration as StdDuration};

use time::OffsetDateTime;
use tokio::{
	task::{JoinError, JoinSet},
	time as tokio_time,
};
use uuid::Uuid;

use crate::{Error, Result};
use mood_service::MoodService;
use mood_storage::{Change, ChangeEvent};

const MAX_CHANGE_ERROR_CHARS: usize = 1_024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
	Done,
	/// Terminal. The sanitized error is stored as the event's `last_error`.
	Failed(String),
}

#[derive(Debug, Clone)]
pub struct Processed {
	pub change_id: Uuid,
	pub kind: &'static str,
	pub disposition: Disposition,
}

pub async fn run_worker(service: Arc<MoodService>) -> color_eyre::Result<()> {
	let poll = StdDuration::from_millis(service.cfg.worker.poll_interval_ms);
	let max_in_flight = service.cfg.worker.max_in_flight.max(1);
	let mut in_flight = JoinSet::new();

	tracing::info!(
		poll_ms = service.cfg.worker.poll_interval_ms,
		max_in_flight,
		"Change dispatcher started."
	);

	loop {
		while in_flight.len() < max_in_flight {
			match claim_next(&service).await {
				Ok(Some(event)) => {
					let service = service.clone();

					in_flight.spawn(async move { process_event(&service, event).await });
				},
				Ok(None) => break,
				Err(err) => {
					tracing::error!(error = %err, "Change feed claim failed.");

					break;
				},
			}
		}

		tokio::select! {
			Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => log_joined(joined),
			_ = tokio_time::sleep(poll) => {},
		}
	}
}

/// Claims one change event and runs it to completion. Returns `None` when nothing was claimable.
pub async fn process_change_once(service: &MoodService) -> Result<Option<Processed>> {
	let Some(event) = claim_next(service).await? else {
		return Ok(None);
	};

	process_event(service, event).await.map(Some)
}

/// The lease outlives the slowest handler chain so an event still in flight is never redelivered.
pub async fn claim_next(service: &MoodService) -> Result<Option<ChangeEvent>> {
	let limits = &service.cfg.worker;
	let slowest_ms = [
		limits.mood_timeout_ms.saturating_add(limits.summary_timeout_ms),
		limits.reflection_timeout_ms,
		limits.cleanup_timeout_ms,
	]
	.into_iter()
	.max()
	.unwrap_or(0);
	let lease_seconds =
		limits.claim_lease_seconds.saturating_add(slowest_ms.div_ceil(1_000) as i64);

	Ok(service.store.claim_change(OffsetDateTime::now_utc(), lease_seconds).await?)
}

/// Runs every handler subscribed to a claimed event and records the result.
pub async fn process_event(service: &MoodService, event: ChangeEvent) -> Result<Processed> {
	let kind = event.change.kind();
	let disposition = match dispatch(service, &event.change).await {
		Ok(()) => {
			service.store.finish_change(event.change_id, None, OffsetDateTime::now_utc()).await?;

			Disposition::Done
		},
		Err(err) => {
			let message = sanitize_error(&err.to_string());

			tracing::error!(
				change_id = %event.change_id,
				kind,
				attempts = event.attempts,
				error = %message,
				"Change handler failed."
			);

			service
				.store
				.finish_change(event.change_id, Some(&message), OffsetDateTime::now_utc())
				.await?;

			Disposition::Failed(message)
		},
	};

	Ok(Processed { change_id: event.change_id, kind, disposition })
}

fn log_joined(joined: std::result::Result<Result<Processed>, JoinError>) {
	match joined {
		Ok(Ok(processed)) => tracing::debug!(
			change_id = %processed.change_id,
			kind = processed.kind,
			disposition = ?processed.disposition,
			"Change event settled."
		),
		Ok(Err(err)) => tracing::error!(error = %err, "Change feed processing failed."),
		Err(err) => tracing::error!(error = %err, "Change task aborted."),
	}
}

async fn dispatch(service: &MoodService, change: &Change) -> Result<()> {
	let limits = &service.cfg.worker;

	match change {
		Change::EntryCreated { after } => {
			// The digest reads stored moods, so it waits for the classifier.
			let classify_then_summarize = async {
				let mood =
					bounded("mood", limits.mood_timeout_ms, service.classify_created(after)).await;
				let summary =
					bounded("summary", limits.summary_timeout_ms, service.summarize_on_entry(after))
						.await;

				settle([mood.map(drop), summary.map(drop)])
			};
			let (mood_and_summary, reflection) = tokio::join!(
				classify_then_summarize,
				bounded("reflection", limits.reflection_timeout_ms, service.reflect_created(after)),
			);

			settle([mood_and_summary, reflection.map(drop)])
		},
		Change::EntryUpdated { before, after } => {
			let (mood, reflection) = tokio::join!(
				bounded("mood", limits.mood_timeout_ms, service.classify_updated(before, after)),
				bounded(
					"reflection",
					limits.reflection_timeout_ms,
					service.reflect_updated(before, after)
				),
			);

			settle([mood.map(drop), reflection.map(drop)])
		},
		Change::ProfileUpdated { user_id, before, after } => bounded(
			"summary",
			limits.summary_timeout_ms,
			service.summarize_on_persona_change(user_id, before.as_ref(), after),
		)
		.await
		.map(drop),
		Change::SessionDeleted { session_id, .. } => bounded(
			"cleanup",
			limits.cleanup_timeout_ms,
			service.purge_session_messages(*session_id),
		)
		.await
		.map(drop),
		Change::AccountDeleted { user_id } =>
			bounded("cleanup", limits.cleanup_timeout_ms, service.purge_account(user_id))
				.await
				.map(drop),
	}
}

async fn bounded<T, F>(handler: &'static str, limit_ms: u64, fut: F) -> Result<T>
where
	T: Debug,
	F: Future<Output = mood_service::Result<T>>,
{
	match tokio_time::timeout(StdDuration::from_millis(limit_ms), fut).await {
		Ok(Ok(outcome)) => {
			tracing::debug!(handler, ?outcome, "Handler finished.");

			Ok(outcome)
		},
		Ok(Err(source)) => Err(Error::Handler { handler, source }),
		Err(_) => Err(Error::Timeout { handler, limit_ms }),
	}
}

/// Every handler has already run to completion; the first failure decides the event.
fn settle<const N: usize>(results: [Result<()>; N]) -> Result<()> {
	let mut first = None;

	for result in results {
		let Err(err) = result else {
			continue;
		};

		if first.is_none() {
			first = Some(err);
		} else {
			tracing::error!(error = %err, "Sibling handler also failed.");
		}
	}

	first.map_or(Ok(()), Err)
}

fn sanitize_error(text: &str) -> String {
	let mut parts = Vec::new();
	let mut redact_next = false;

	for raw in text.split_whitespace() {
		if redact_next {
			parts.push("[REDACTED]".to_string());
			redact_next = false;

			continue;
		}
		if raw.eq_ignore_ascii_case("bearer") {
			redact_next = true;
		}

		parts.push(redact_assignment(raw).unwrap_or_else(|| raw.to_string()));
	}

	let mut out = parts.join(" ");

	if out.chars().count() > MAX_CHANGE_ERROR_CHARS {
		out = out.chars().take(MAX_CHANGE_ERROR_CHARS).collect();
		out.push_str("...");
	}

	out
}

fn redact_assignment(word: &str) -> Option<String> {
	let lowered = word.to_ascii_lowercase();
	let sep = ['=', ':'].into_iter().find(|sep| word.contains(*sep))?;

	["api_key", "apikey", "password", "secret", "token"]
		.iter()
		.any(|key| lowered.contains(key))
		.then(|| format!("{}{sep}[REDACTED]", word.split(sep).next().unwrap_or(word)))
}
