use time::OffsetDateTime;

use crate::{Error, MoodService, Result};
use mood_domain::{PersonaId, UserProfile};

impl MoodService {
	/// Never fails: a missing, unknown or unreadable preference resolves to the default persona.
	pub async fn resolve_persona(&self, user_id: &str) -> PersonaId {
		match self.store.get_profile(user_id).await {
			Ok(profile) => PersonaId::from_preference(
				profile.as_ref().and_then(|profile| profile.ai_persona.as_deref()),
			),
			Err(err) => {
				tracing::warn!(user_id, error = %err, "Persona lookup failed. Using default persona.");

				PersonaId::default()
			},
		}
	}

	pub async fn set_persona(
		&self,
		user_id: &str,
		persona: Option<PersonaId>,
	) -> Result<UserProfile> {
		let user_id = user_id.trim();

		if user_id.is_empty() {
			return Err(Error::invalid("user_id is required."));
		}

		let profile = self
			.store
			.set_persona(user_id, persona.map(PersonaId::as_str), OffsetDateTime::now_utc())
			.await?;

		Ok(profile)
	}
}
