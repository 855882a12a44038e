use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Writing and conversation style applied to every piece of generated text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonaId {
	Formal,
	Tough,
	#[default]
	Friendly,
	Coach,
	Motherly,
	Bestie,
}
impl PersonaId {
	pub const ALL: [Self; 6] =
		[Self::Formal, Self::Tough, Self::Friendly, Self::Coach, Self::Motherly, Self::Bestie];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Formal => "formal",
			Self::Tough => "tough",
			Self::Friendly => "friendly",
			Self::Coach => "coach",
			Self::Motherly => "motherly",
			Self::Bestie => "bestie",
		}
	}

	/// Reads a stored preference, treating anything outside the known set as unset.
	pub fn from_preference(raw: Option<&str>) -> Self {
		raw.and_then(|value| value.parse().ok()).unwrap_or_default()
	}
}
impl fmt::Display for PersonaId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for PersonaId {
	type Err = UnknownPersona;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|persona| persona.as_str() == s)
			.ok_or_else(|| UnknownPersona(s.to_string()))
	}
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown persona {0:?}.")]
pub struct UnknownPersona(pub String);
