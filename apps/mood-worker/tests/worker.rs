use std::{
	sync::Arc,
	time::{Duration, Instant},
};

use serde_json::Map;
use time::OffsetDateTime;

use mood_config::{
	Chat, Cleanup, Config, Enrichment, GeneratorProviderConfig, Providers, Service, Storage,
	Worker,
};
use mood_domain::{Mood, PersonaId, prompts};
use mood_service::{CreateEntryRequest, MoodService, SendMessageRequest};
use mood_storage::{ChangeStatus, MemoryStore, Store};
use mood_testkit::ScriptedGenerator;
use mood_worker::worker::{self, Disposition, Processed};

fn test_config(worker: Worker) -> Config {
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
		worker,
	}
}

fn build(
	generator: ScriptedGenerator,
	worker: Worker,
) -> (MoodService, Arc<MemoryStore>, Arc<ScriptedGenerator>) {
	let store = Arc::new(MemoryStore::new());
	let generator = Arc::new(generator);
	let service = MoodService::new(test_config(worker), store.clone(), generator.clone());

	(service, store, generator)
}

async fn drain(service: &MoodService) -> Vec<Processed> {
	let mut processed = Vec::new();

	while let Some(next) = worker::process_change_once(service).await.expect("Dispatch failed.") {
		processed.push(next);

		assert!(processed.len() < 32, "Change feed did not settle.");
	}

	processed
}

#[tokio::test]
async fn created_entry_is_classified_then_reflected() {
	let (service, store, generator) = build(ScriptedGenerator::always("good"), Worker::default());
	let entry = service
		.create_entry(CreateEntryRequest {
			user_id: "u1".to_string(),
			journal_text: "Finished the garden fence with my brother.".to_string(),
			mood: None,
			created_at: None,
		})
		.await
		.expect("Create failed.");
	let processed = drain(&service).await;
	let current = store.get_entry(entry.entry_id).await.expect("Get failed.").expect("Missing.");

	assert_eq!(
		processed.iter().map(|p| p.kind).collect::<Vec<_>>(),
		vec!["entry_created", "entry_updated", "entry_updated"]
	);
	assert!(processed.iter().all(|p| p.disposition == Disposition::Done));
	assert_eq!(current.mood, Some(Mood::Good));
	assert_eq!(current.reflection.as_deref(), Some("good"));
	assert_eq!(generator.calls(), 2);

	let digest = store.get_digest("u1").await.expect("Get failed.").expect("Digest missing.");

	assert_eq!(digest.recommendation, prompts::encouragement(PersonaId::Friendly));
}

#[tokio::test]
async fn digest_reads_the_mood_classified_for_the_new_entry() {
	let generator = ScriptedGenerator::always("bad").with_delay(Duration::from_millis(50));
	let (service, _store, generator) = build(generator, Worker::default());

	for text in ["Missed the bus and the interview.", "Argued with my landlord again."] {
		service
			.create_entry(CreateEntryRequest {
				user_id: "u1".to_string(),
				journal_text: text.to_string(),
				mood: None,
				created_at: None,
			})
			.await
			.expect("Create failed.");
		drain(&service).await;
	}

	let digest_prompts = generator
		.prompts()
		.into_iter()
		.filter(|prompt| prompt.contains("journals from the last 7 days"))
		.collect::<Vec<_>>();

	assert_eq!(digest_prompts.len(), 1);
	assert!(digest_prompts[0].contains("(bad): Argued with my landlord again."));
	assert!(!digest_prompts[0].contains("(neutral)"), "Digest saw a pending mood.");
}

#[tokio::test]
async fn dispatcher_handles_claimed_events_concurrently() {
	let generator = ScriptedGenerator::always("good").with_delay(Duration::from_millis(300));
	let (service, store, _generator) =
		build(generator, Worker { poll_interval_ms: 10, max_in_flight: 8, ..Default::default() });
	let mut entry_ids = Vec::new();

	for user_id in ["u1", "u2", "u3"] {
		let entry = service
			.create_entry(CreateEntryRequest {
				user_id: user_id.to_string(),
				journal_text: "Cooked dinner for friends tonight.".to_string(),
				mood: None,
				created_at: None,
			})
			.await
			.expect("Create failed.");

		entry_ids.push(entry.entry_id);
	}

	let dispatcher = tokio::spawn(worker::run_worker(Arc::new(service)));
	let started = Instant::now();

	loop {
		let mut classified = 0;

		for entry_id in &entry_ids {
			let entry = store.get_entry(*entry_id).await.expect("Get failed.").expect("Missing.");

			if entry.mood.is_some_and(|mood| !mood.is_pending()) {
				classified += 1;
			}
		}
		if classified == entry_ids.len() {
			break;
		}

		assert!(
			started.elapsed() < Duration::from_millis(750),
			"Only {classified} of {} entries classified; events ran one at a time.",
			entry_ids.len()
		);

		tokio::time::sleep(Duration::from_millis(10)).await;
	}

	dispatcher.abort();
}

#[tokio::test]
async fn claim_lease_outlives_the_slowest_handler() {
	let (service, store, _generator) = build(ScriptedGenerator::always("good"), Worker::default());

	service.request_account_deletion("u1").await.expect("Request failed.");

	let event =
		worker::claim_next(&service).await.expect("Claim failed.").expect("Nothing claimed.");
	let after_base_lease = OffsetDateTime::now_utc() + time::Duration::seconds(31);

	assert!(store.claim_change(after_base_lease, 30).await.expect("Claim failed.").is_none());

	let after_full_lease = OffsetDateTime::now_utc() + time::Duration::seconds(30 + 540 + 1);
	let redelivered = store
		.claim_change(after_full_lease, 30)
		.await
		.expect("Claim failed.")
		.expect("Lease should have expired.");

	assert_eq!(redelivered.change_id, event.change_id);
}

#[tokio::test]
async fn redelivered_events_do_not_regenerate() {
	let (service, store, generator) = build(ScriptedGenerator::always("good"), Worker::default());
	let entry = service
		.create_entry(CreateEntryRequest {
			user_id: "u1".to_string(),
			journal_text: "Finished the garden fence with my brother.".to_string(),
			mood: Some(Mood::Good),
			created_at: None,
		})
		.await
		.expect("Create failed.");

	drain(&service).await;

	let calls = generator.calls();
	let snapshot = store.get_entry(entry.entry_id).await.expect("Get failed.").expect("Missing.");

	store
		.enqueue_change(&mood_storage::Change::EntryCreated { after: entry.clone() })
		.await
		.expect("Enqueue failed.");
	drain(&service).await;

	let current = store.get_entry(entry.entry_id).await.expect("Get failed.").expect("Missing.");

	assert_eq!(generator.calls(), calls);
	assert_eq!(current.reflection, snapshot.reflection);
	assert_eq!(current.reflected_at, snapshot.reflected_at);
}

#[tokio::test]
async fn hung_handler_fails_the_event_terminally() {
	let generator = ScriptedGenerator::always("good").with_delay(Duration::from_millis(500));
	let (service, store, _generator) =
		build(generator, Worker { mood_timeout_ms: 20, ..Default::default() });

	service
		.create_entry(CreateEntryRequest {
			user_id: "u1".to_string(),
			journal_text: "A long day of meetings and errands.".to_string(),
			mood: None,
			created_at: None,
		})
		.await
		.expect("Create failed.");

	let processed = worker::process_change_once(&service)
		.await
		.expect("Dispatch failed.")
		.expect("Nothing claimed.");

	let Disposition::Failed(message) = &processed.disposition else {
		panic!("Expected failure, got {:?}.", processed.disposition);
	};

	assert!(message.contains("mood handler timed out"));

	let records = store.changes().await;
	let record = records
		.iter()
		.find(|record| record.change_id == processed.change_id)
		.expect("Record missing.");

	assert_eq!(record.status, ChangeStatus::Failed);
	assert!(worker::process_change_once(&service).await.expect("Dispatch failed.").is_none());
}

#[tokio::test]
async fn session_and_account_deletes_cascade() {
	let (service, store, _generator) = build(ScriptedGenerator::always("Hi!"), Worker::default());
	let first = service
		.send_message(SendMessageRequest {
			user_id: "u1".to_string(),
			message: "Hello".to_string(),
			session_id: None,
		})
		.await
		.expect("Send failed.");
	let second = service
		.send_message(SendMessageRequest {
			user_id: "u1".to_string(),
			message: "Hello again".to_string(),
			session_id: None,
		})
		.await
		.expect("Send failed.");

	service.delete_session("u1", first.session_id).await.expect("Delete failed.");
	drain(&service).await;

	assert_eq!(store.message_count(first.session_id).await, 0);
	assert_eq!(store.message_count(second.session_id).await, 2);

	service.set_persona("u1", Some(PersonaId::Coach)).await.expect("Persona failed.");
	service.request_account_deletion("u1").await.expect("Request failed.");

	let processed = drain(&service).await;

	assert_eq!(
		processed.iter().map(|p| p.kind).collect::<Vec<_>>(),
		vec!["profile_updated", "account_deleted"]
	);
	assert_eq!(store.message_count(second.session_id).await, 0);
	assert!(store.get_session(second.session_id).await.expect("Get failed.").is_none());
	assert!(store.get_profile("u1").await.expect("Get failed.").is_none());
	assert!(store.get_digest("u1").await.expect("Get failed.").is_none());
}
