pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("MOOD_PG_DSN is not a usable Postgres DSN: {0}")]
	InvalidDsn(String),

	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
}
