pub mod generator;
pub mod retry;

mod error;

pub use error::{Error, Result};
pub use generator::HttpGenerator;
pub use retry::{RetryPolicy, generate_with_retry};

use std::{future::Future, pin::Pin};

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName};
use serde_json::{Map, Value};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The external generative-text service. It has no session of its own, so every call carries
/// its full context in the prompt.
pub trait TextGenerator
where
	Self: Send + Sync,
{
	fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>>;

	/// `false` when no credential is configured and every call would fail with
	/// [`Error::Unconfigured`].
	fn is_configured(&self) -> bool {
		true
	}
}

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}
