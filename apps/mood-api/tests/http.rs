use std::sync::Arc;

use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::{Map, Value};
use tower::util::ServiceExt;

use mood_api::{routes, state::AppState};
use mood_config::{
	Chat, Cleanup, Config, Enrichment, GeneratorProviderConfig, Providers, Service, Storage,
	Worker,
};
use mood_service::MoodService;
use mood_storage::{Change, MemoryStore};
use mood_testkit::ScriptedGenerator;

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

fn test_app(generator: ScriptedGenerator) -> (Router, Arc<MemoryStore>) {
	let store = Arc::new(MemoryStore::new());
	let service = MoodService::new(test_config(), store.clone(), Arc::new(generator));
	let app = routes::router(AppState::from_service(Arc::new(service)));

	(app, store)
}

async fn call(
	app: &Router,
	method: &str,
	uri: &str,
	payload: Option<Value>,
) -> (StatusCode, Value) {
	let mut builder = Request::builder().method(method).uri(uri);
	let body = match payload {
		Some(payload) => {
			builder = builder.header("content-type", "application/json");

			Body::from(payload.to_string())
		},
		None => Body::empty(),
	};
	let response = app
		.clone()
		.oneshot(builder.body(body).expect("Failed to build request."))
		.await
		.expect("Failed to call router.");
	let status = response.status();
	let bytes = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");
	let json = if bytes.is_empty() {
		Value::Null
	} else {
		serde_json::from_slice(&bytes).expect("Failed to parse response.")
	};

	(status, json)
}

#[tokio::test]
async fn health_ok() {
	let (app, _store) = test_app(ScriptedGenerator::always("ok"));
	let (status, _) = call(&app, "GET", "/health", None).await;

	assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn chat_send_starts_a_session() {
	let (app, _store) = test_app(ScriptedGenerator::always("Hey there, how was your day?"));
	let payload = serde_json::json!({ "user_id": "u1", "message": "Hi" });
	let (status, json) = call(&app, "POST", "/v1/chat/send", Some(payload)).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["reply"], "Hey there, how was your day?");
	assert!(json["session_id"].as_str().is_some_and(|id| id.len() == 36));
}

#[tokio::test]
async fn chat_send_maps_error_kinds() {
	let (app, _store) = test_app(ScriptedGenerator::always("ok"));
	let missing = serde_json::json!({ "user_id": "u1", "message": "" });
	let unknown = serde_json::json!({
		"user_id": "u1",
		"message": "Hi",
		"session_id": "0b0e7c0c-5d59-4a53-9d1e-6a3f8f0d2a11"
	});
	let (status, json) = call(&app, "POST", "/v1/chat/send", Some(missing)).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json["error_code"], "invalid-argument");

	let (status, json) = call(&app, "POST", "/v1/chat/send", Some(unknown)).await;

	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(json["error_code"], "not-found");

	let (app, _store) = test_app(ScriptedGenerator::unconfigured());
	let payload = serde_json::json!({ "user_id": "u1", "message": "Hi" });
	let (status, json) = call(&app, "POST", "/v1/chat/send", Some(payload)).await;

	assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(json["error_code"], "internal");
}

#[tokio::test]
async fn entries_are_created_and_patched_by_owner() {
	let (app, _store) = test_app(ScriptedGenerator::always("ok"));
	let payload = serde_json::json!({ "user_id": "u1", "journal_text": "Baked bread today." });
	let (status, created) = call(&app, "POST", "/v1/entries", Some(payload)).await;

	assert_eq!(status, StatusCode::CREATED);
	assert_eq!(created["mood"], "pending");

	let uri = format!("/v1/entries/{}", created["entry_id"].as_str().expect("Missing entry_id."));
	let patch = serde_json::json!({ "user_id": "u1", "journal_text": "Baked sourdough today." });
	let (status, updated) = call(&app, "PATCH", &uri, Some(patch)).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(updated["journal_text"], "Baked sourdough today.");

	let foreign = serde_json::json!({ "user_id": "u2", "reset_mood": true });
	let (status, json) = call(&app, "PATCH", &uri, Some(foreign)).await;

	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(json["error_code"], "not-found");
}

#[tokio::test]
async fn persona_route_validates_the_value() {
	let (app, _store) = test_app(ScriptedGenerator::always("ok"));
	let (status, json) = call(
		&app,
		"PUT",
		"/v1/users/u1/persona",
		Some(serde_json::json!({ "ai_persona": "pirate" })),
	)
	.await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json["error_code"], "invalid-argument");

	let (status, json) = call(
		&app,
		"PUT",
		"/v1/users/u1/persona",
		Some(serde_json::json!({ "ai_persona": "coach" })),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["ai_persona"], "coach");
}

#[tokio::test]
async fn deletes_are_accepted_and_recorded() {
	let (app, store) = test_app(ScriptedGenerator::always("Hello!"));
	let (_, chat) = call(
		&app,
		"POST",
		"/v1/chat/send",
		Some(serde_json::json!({ "user_id": "u1", "message": "Hi" })),
	)
	.await;
	let session_id = chat["session_id"].as_str().expect("Missing session_id.");
	let (status, _) =
		call(&app, "DELETE", &format!("/v1/users/u2/sessions/{session_id}"), None).await;

	assert_eq!(status, StatusCode::NOT_FOUND);

	let (status, _) =
		call(&app, "DELETE", &format!("/v1/users/u1/sessions/{session_id}"), None).await;

	assert_eq!(status, StatusCode::NO_CONTENT);

	let (status, json) = call(&app, "DELETE", "/v1/users/u1", None).await;

	assert_eq!(status, StatusCode::ACCEPTED);
	assert!(json["change_id"].is_string());

	let kinds: Vec<_> = store.changes().await.iter().map(|record| record.change.kind()).collect();

	assert!(kinds.contains(&"session_deleted"));
	assert!(kinds.contains(&"account_deleted"));
	assert!(store.changes().await.iter().any(|record| matches!(
		&record.change,
		Change::AccountDeleted { user_id } if user_id == "u1"
	)));
}

#[tokio::test]
async fn daily_reflection_rejects_malformed_dates() {
	let (app, _store) = test_app(ScriptedGenerator::always("{}"));
	let payload = serde_json::json!({ "user_id": "u1", "date": "yesterday" });
	let (status, json) = call(&app, "POST", "/v1/reflection/daily", Some(payload)).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json["error_code"], "invalid-argument");

	let payload = serde_json::json!({ "user_id": "u1", "date": "2024-01-15" });
	let (status, json) = call(&app, "POST", "/v1/reflection/daily", Some(payload)).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["summary"][0], "No journal entries yet today.");
}
