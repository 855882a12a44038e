use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::JournalEntry;

pub const MAX_SUMMARY_ITEMS: usize = 5;
pub const MAX_FALLBACK_ITEM_CHARS: usize = 120;
pub const DEFAULT_MOTIVATION: &str = "Keep going!";
pub const ENTRY_SEPARATOR: &str = "\n---\n";

const FENCE_PATTERN: &str = r"```(?:json)?";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyReflection {
	pub summary: Vec<String>,
	pub motivation: String,
}
impl DailyReflection {
	pub fn empty_day() -> Self {
		Self {
			summary: vec!["No journal entries yet today.".to_string()],
			motivation: "Start writing down how you feel now!".to_string(),
		}
	}
}

#[derive(Debug, Deserialize)]
struct RawReflection {
	#[serde(default)]
	summary: Option<serde_json::Value>,
	#[serde(default)]
	motivation: Option<String>,
}

/// `mood: journal` blocks for the day, newest first.
pub fn day_lines(entries: &[JournalEntry]) -> Vec<String> {
	entries
		.iter()
		.map(|entry| {
			let mood = entry.mood.map(|mood| mood.as_str()).unwrap_or("neutral");

			format!("{mood}: {}", entry.journal_text)
		})
		.collect()
}

/// Parses the structured daily reflection. When the response is not the expected JSON the
/// journal lines themselves become the summary.
pub fn parse_daily_reflection(raw: &str, lines: &[String]) -> DailyReflection {
	let cleaned = Regex::new(FENCE_PATTERN)
		.map(|re| re.replace_all(raw, "").into_owned())
		.unwrap_or_else(|_| raw.to_string());

	match serde_json::from_str::<RawReflection>(cleaned.trim()) {
		Ok(parsed) => {
			let summary = match parsed.summary {
				Some(serde_json::Value::Array(items)) => items
					.into_iter()
					.filter_map(|item| item.as_str().map(str::to_string))
					.take(MAX_SUMMARY_ITEMS)
					.collect(),
				_ => Vec::new(),
			};
			let motivation = parsed
				.motivation
				.filter(|text| !text.trim().is_empty())
				.unwrap_or_else(|| DEFAULT_MOTIVATION.to_string());

			DailyReflection { summary, motivation }
		},
		Err(_) => DailyReflection {
			summary: lines
				.iter()
				.take(MAX_SUMMARY_ITEMS)
				.map(|line| line.chars().take(MAX_FALLBACK_ITEM_CHARS).collect())
				.collect(),
			motivation: DEFAULT_MOTIVATION.to_string(),
		},
	}
}
