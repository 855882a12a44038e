//! Scratch Postgres databases for the ignored storage tests.

use std::{env, str::FromStr};

use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection},
};
use uuid::Uuid;

use crate::{Error, Result};

pub const DSN_VAR: &str = "MOOD_PG_DSN";

const MAINTENANCE_DATABASE: &str = "postgres";

/// Returns the base DSN, treating a blank variable as unset.
pub fn env_dsn() -> Option<String> {
	env::var(DSN_VAR).ok().filter(|dsn| !dsn.trim().is_empty())
}

/// A database created on the server behind `MOOD_PG_DSN`. Call [`TestDatabase::cleanup`] when
/// done; a panicking test leaves it behind.
pub struct TestDatabase {
	name: String,
	dsn: String,
	maintenance: PgConnectOptions,
}
impl TestDatabase {
	pub async fn new(base_dsn: &str) -> Result<Self> {
		let base = PgConnectOptions::from_str(base_dsn)
			.map_err(|err| Error::InvalidDsn(err.to_string()))?;
		let maintenance = base.clone().database(MAINTENANCE_DATABASE);
		let name = scratch_name();
		let mut conn = PgConnection::connect_with(&maintenance).await?;

		conn.execute(format!(r#"CREATE DATABASE "{name}""#).as_str()).await?;
		conn.close().await?;

		let dsn = base.database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, maintenance })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	/// Drops the database, disconnecting pools that still point at it.
	pub async fn cleanup(self) -> Result<()> {
		let mut conn = PgConnection::connect_with(&self.maintenance).await?;

		conn.execute(format!(r#"DROP DATABASE IF EXISTS "{}" WITH (FORCE)"#, self.name).as_str())
			.await?;
		conn.close().await?;

		Ok(())
	}
}

fn scratch_name() -> String {
	format!("mood_test_{}", Uuid::new_v4().simple())
}
