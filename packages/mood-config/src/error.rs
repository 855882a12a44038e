use std::{
	io,
	path::{Path, PathBuf},
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Cannot read MoodBuddy config {path:?}: {source}")]
	ReadConfig { path: PathBuf, source: io::Error },
	#[error("Cannot parse MoodBuddy config {path:?}: {source}")]
	ParseConfig { path: PathBuf, source: toml::de::Error },
	#[error("Invalid MoodBuddy config: {message}")]
	Validation { message: String },
}
impl Error {
	/// The file being loaded, absent for validation of an in-memory config.
	pub fn path(&self) -> Option<&Path> {
		match self {
			Self::ReadConfig { path, .. } | Self::ParseConfig { path, .. } => Some(path),
			Self::Validation { .. } => None,
		}
	}
}
