use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Stored mood value: a point on the five-step ordinal scale, or the `pending` sentinel that
/// asks the classifier to run again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mood {
	VeryGood,
	Good,
	Neutral,
	Bad,
	VeryBad,
	Pending,
}
impl Mood {
	/// Classification labels, best to worst.
	pub const LABELS: [Self; 5] =
		[Self::VeryGood, Self::Good, Self::Neutral, Self::Bad, Self::VeryBad];

	// Compound labels come first so "very-bad" never matches as "bad".
	const MATCH_ORDER: [Self; 5] =
		[Self::VeryGood, Self::VeryBad, Self::Good, Self::Bad, Self::Neutral];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::VeryGood => "very-good",
			Self::Good => "good",
			Self::Neutral => "neutral",
			Self::Bad => "bad",
			Self::VeryBad => "very-bad",
			Self::Pending => "pending",
		}
	}

	pub fn is_pending(self) -> bool {
		matches!(self, Self::Pending)
	}

	/// Extracts a label from free-form classifier output. Falls back to `Neutral` when nothing
	/// recognizable appears.
	pub fn from_classifier_output(raw: &str) -> Self {
		let normalized: String = raw
			.trim()
			.to_lowercase()
			.chars()
			.map(|ch| if ch == ' ' || ch == '_' { '-' } else { ch })
			.collect();

		Self::MATCH_ORDER
			.into_iter()
			.find(|label| normalized.contains(label.as_str()))
			.unwrap_or(Self::Neutral)
	}
}
impl fmt::Display for Mood {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for Mood {
	type Err = UnknownMood;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"very-good" => Ok(Self::VeryGood),
			"good" => Ok(Self::Good),
			"neutral" => Ok(Self::Neutral),
			"bad" => Ok(Self::Bad),
			"very-bad" => Ok(Self::VeryBad),
			"pending" => Ok(Self::Pending),
			other => Err(UnknownMood(other.to_string())),
		}
	}
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown mood {0:?}.")]
pub struct UnknownMood(pub String);
