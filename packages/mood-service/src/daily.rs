use serde::{Deserialize, Serialize};
use time::{Date, Duration, macros::format_description};

use crate::{Error, MoodService, Result};
use mood_domain::{
	daily::{self, DailyReflection},
	prompts,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DailyReflectionRequest {
	pub user_id: String,
	/// Calendar day as `YYYY-MM-DD`, interpreted in UTC.
	pub date: String,
}

impl MoodService {
	pub async fn daily_reflection(&self, req: DailyReflectionRequest) -> Result<DailyReflection> {
		let user_id = req.user_id.trim();
		let date = req.date.trim();

		if user_id.is_empty() || date.is_empty() {
			return Err(Error::invalid("user_id and date are required."));
		}
		if !self.generator.is_configured() {
			return Err(Error::Internal {
				message: "Text generation is not configured.".to_string(),
			});
		}

		let day = Date::parse(date, format_description!("[year]-[month]-[day]"))
			.map_err(|_| Error::invalid("date must be formatted as YYYY-MM-DD."))?;
		let start = day.midnight().assume_utc();
		let end = start + Duration::days(1) - Duration::nanoseconds(1);
		let entries = self.store.list_entries_between(user_id, start, end).await?;

		if entries.is_empty() {
			return Ok(DailyReflection::empty_day());
		}

		let lines = daily::day_lines(&entries);
		let prompt = prompts::daily_reflection(&lines.join(daily::ENTRY_SEPARATOR));
		let raw = self.generator.generate(&prompt).await.map_err(|err| {
			tracing::error!(user_id, error = %err, "Daily reflection failed.");

			Error::Internal { message: "Failed to generate the daily reflection.".to_string() }
		})?;

		Ok(daily::parse_daily_reflection(&raw, &lines))
	}
}
