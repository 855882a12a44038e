use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::{BoxFuture, Error, Result, TextGenerator};
use mood_config::GeneratorProviderConfig;

/// OpenAI-compatible chat-completions client.
pub struct HttpGenerator {
	cfg: GeneratorProviderConfig,
	client: Client,
}
impl HttpGenerator {
	pub fn new(cfg: GeneratorProviderConfig) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;

		Ok(Self { cfg, client })
	}

	async fn complete(&self, prompt: &str) -> Result<String> {
		let Some(api_key) = self.cfg.api_key.as_deref() else {
			return Err(Error::Unconfigured);
		};
		let url = format!("{}{}", self.cfg.api_base, self.cfg.path);
		let body = serde_json::json!({
			"model": self.cfg.model,
			"temperature": self.cfg.temperature,
			"messages": [{ "role": "user", "content": prompt }],
		});
		let res = self
			.client
			.post(&url)
			.headers(crate::auth_headers(api_key, &self.cfg.default_headers)?)
			.json(&body)
			.send()
			.await?;

		if res.status() == StatusCode::TOO_MANY_REQUESTS {
			let message = res.text().await.unwrap_or_default();

			return Err(Error::RateLimited { message: truncate(&message, 200) });
		}

		let json: Value = res.error_for_status()?.json().await?;

		parse_completion(&json)
	}
}
impl TextGenerator for HttpGenerator {
	fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>> {
		Box::pin(self.complete(prompt))
	}

	fn is_configured(&self) -> bool {
		self.cfg.api_key.is_some()
	}
}

fn parse_completion(json: &Value) -> Result<String> {
	json.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.map(|content| content.trim().to_string())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Completion response is missing message content.".to_string(),
		})
}

fn truncate(text: &str, max_chars: usize) -> String {
	text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_and_trims_choice_content() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "content": "  good \n" } }
			]
		});

		assert_eq!(parse_completion(&json).expect("parse failed"), "good");
	}

	#[test]
	fn rejects_response_without_choices() {
		let json = serde_json::json!({ "error": "boom" });

		assert!(matches!(parse_completion(&json), Err(Error::InvalidResponse { .. })));
	}
}
