pub mod database;
pub mod generator;

mod error;

pub use database::{TestDatabase, env_dsn};
pub use error::{Error, Result};
pub use generator::{Reply, ScriptedGenerator};
