pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Stable error kinds surfaced to RPC callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	InvalidArgument,
	NotFound,
	Internal,
}
impl ErrorKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::InvalidArgument => "invalid-argument",
			Self::NotFound => "not-found",
			Self::Internal => "internal",
		}
	}
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid argument: {message}")]
	InvalidArgument { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Internal error: {message}")]
	Internal { message: String },
}
impl Error {
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
			Self::NotFound { .. } => ErrorKind::NotFound,
			Self::Internal { .. } => ErrorKind::Internal,
		}
	}

	/// The message without its kind prefix.
	pub fn message(&self) -> &str {
		match self {
			Self::InvalidArgument { message }
			| Self::NotFound { message }
			| Self::Internal { message } => message,
		}
	}

	pub(crate) fn invalid(message: impl Into<String>) -> Self {
		Self::InvalidArgument { message: message.into() }
	}

	pub(crate) fn not_found(message: impl Into<String>) -> Self {
		Self::NotFound { message: message.into() }
	}
}

impl From<mood_storage::Error> for Error {
	fn from(err: mood_storage::Error) -> Self {
		match err {
			mood_storage::Error::InvalidArgument(message) => Self::InvalidArgument { message },
			mood_storage::Error::NotFound(message) => Self::NotFound { message },
			other => Self::Internal { message: other.to_string() },
		}
	}
}

impl From<mood_providers::Error> for Error {
	fn from(err: mood_providers::Error) -> Self {
		Self::Internal { message: err.to_string() }
	}
}
