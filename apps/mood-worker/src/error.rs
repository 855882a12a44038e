pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{handler} handler timed out after {limit_ms} ms.")]
	Timeout { handler: &'static str, limit_ms: u64 },
	#[error("{handler} handler failed: {source}")]
	Handler {
		handler: &'static str,
		#[source]
		source: mood_service::Error,
	},
	#[error(transparent)]
	Storage(#[from] mood_storage::Error),
}
