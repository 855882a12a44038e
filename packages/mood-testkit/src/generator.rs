use std::{
	collections::VecDeque,
	sync::{
		Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use mood_providers::{BoxFuture, Error, Result, TextGenerator};

#[derive(Debug, Clone)]
pub enum Reply {
	Text(String),
	RateLimited,
	Fail(String),
}
impl Reply {
	pub fn text(text: impl Into<String>) -> Self {
		Self::Text(text.into())
	}

	fn into_result(self) -> Result<String> {
		match self {
			Self::Text(text) => Ok(text),
			Self::RateLimited => Err(Error::RateLimited { message: "scripted".to_string() }),
			Self::Fail(message) => Err(Error::InvalidResponse { message }),
		}
	}
}

/// Text generator that plays back a fixed script and records every prompt it receives. Once the
/// script runs out, every call returns the fallback reply.
pub struct ScriptedGenerator {
	script: Mutex<VecDeque<Reply>>,
	fallback: Reply,
	configured: bool,
	delay: Duration,
	calls: AtomicUsize,
	prompts: Mutex<Vec<String>>,
}
impl ScriptedGenerator {
	pub fn always(text: impl Into<String>) -> Self {
		Self::sequence(Vec::new()).with_fallback(Reply::text(text))
	}

	pub fn sequence(replies: Vec<Reply>) -> Self {
		Self {
			script: Mutex::new(replies.into()),
			fallback: Reply::Fail("Script exhausted.".to_string()),
			configured: true,
			delay: Duration::ZERO,
			calls: AtomicUsize::new(0),
			prompts: Mutex::new(Vec::new()),
		}
	}

	/// Behaves like a client with no API key.
	pub fn unconfigured() -> Self {
		Self { configured: false, ..Self::sequence(Vec::new()) }
	}

	pub fn with_fallback(mut self, reply: Reply) -> Self {
		self.fallback = reply;

		self
	}

	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = delay;

		self
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn prompts(&self) -> Vec<String> {
		self.prompts.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	fn next_reply(&self, prompt: &str) -> Result<String> {
		if !self.configured {
			return Err(Error::Unconfigured);
		}

		self.calls.fetch_add(1, Ordering::SeqCst);
		self.prompts.lock().unwrap_or_else(|err| err.into_inner()).push(prompt.to_string());

		let next = self.script.lock().unwrap_or_else(|err| err.into_inner()).pop_front();

		next.unwrap_or_else(|| self.fallback.clone()).into_result()
	}
}
impl TextGenerator for ScriptedGenerator {
	fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move {
			if !self.delay.is_zero() {
				tokio::time::sleep(self.delay).await;
			}

			self.next_reply(prompt)
		})
	}

	fn is_configured(&self) -> bool {
		self.configured
	}
}
