use axum::{
	Json, Router,
	extract::{Path, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{delete, get, patch, post, put},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::AppState;
use mood_domain::{JournalEntry, PersonaId, UserProfile, daily::DailyReflection};
use mood_service::{
	CreateEntryRequest, DailyReflectionRequest, Error as ServiceError, ErrorKind,
	SendMessageRequest, SendMessageResponse, UpdateEntryRequest,
};

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/chat/send", post(send_message))
		.route("/v1/reflection/daily", post(daily_reflection))
		.route("/v1/entries", post(create_entry))
		.route("/v1/entries/{entry_id}", patch(update_entry))
		.route("/v1/users/{user_id}/persona", put(set_persona))
		.route("/v1/users/{user_id}/sessions/{session_id}", delete(delete_session))
		.route("/v1/users/{user_id}", delete(delete_account))
		.with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct PersonaRequest {
	#[serde(default)]
	pub ai_persona: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccountDeletionResponse {
	pub change_id: Uuid,
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn send_message(
	State(state): State<AppState>,
	Json(payload): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
	let response = state.service.send_message(payload).await?;

	Ok(Json(response))
}

async fn daily_reflection(
	State(state): State<AppState>,
	Json(payload): Json<DailyReflectionRequest>,
) -> Result<Json<DailyReflection>, ApiError> {
	let response = state.service.daily_reflection(payload).await?;

	Ok(Json(response))
}

async fn create_entry(
	State(state): State<AppState>,
	Json(payload): Json<CreateEntryRequest>,
) -> Result<(StatusCode, Json<JournalEntry>), ApiError> {
	let entry = state.service.create_entry(payload).await?;

	Ok((StatusCode::CREATED, Json(entry)))
}

async fn update_entry(
	State(state): State<AppState>,
	Path(entry_id): Path<Uuid>,
	Json(payload): Json<UpdateEntryRequest>,
) -> Result<Json<JournalEntry>, ApiError> {
	let entry = state.service.update_entry(entry_id, payload).await?;

	Ok(Json(entry))
}

async fn set_persona(
	State(state): State<AppState>,
	Path(user_id): Path<String>,
	Json(payload): Json<PersonaRequest>,
) -> Result<Json<UserProfile>, ApiError> {
	let persona = payload
		.ai_persona
		.as_deref()
		.map(str::parse::<PersonaId>)
		.transpose()
		.map_err(|err| ApiError::new(StatusCode::BAD_REQUEST, ErrorKind::InvalidArgument, err))?;
	let profile = state.service.set_persona(&user_id, persona).await?;

	Ok(Json(profile))
}

async fn delete_session(
	State(state): State<AppState>,
	Path((user_id, session_id)): Path<(String, Uuid)>,
) -> Result<StatusCode, ApiError> {
	state.service.delete_session(&user_id, session_id).await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn delete_account(
	State(state): State<AppState>,
	Path(user_id): Path<String>,
) -> Result<(StatusCode, Json<AccountDeletionResponse>), ApiError> {
	let change_id = state.service.request_account_deletion(&user_id).await?;

	Ok((StatusCode::ACCEPTED, Json(AccountDeletionResponse { change_id })))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: &'static str,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	kind: ErrorKind,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, kind: ErrorKind, message: impl ToString) -> Self {
		Self { status, kind, message: message.to_string() }
	}
}
impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let status = match err.kind() {
			ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
			ErrorKind::NotFound => StatusCode::NOT_FOUND,
			ErrorKind::Internal => {
				tracing::error!(error = %err, "Request failed.");

				StatusCode::INTERNAL_SERVER_ERROR
			},
		};

		Self::new(status, err.kind(), err.message())
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.kind.as_str(), message: self.message };

		(self.status, Json(body)).into_response()
	}
}
