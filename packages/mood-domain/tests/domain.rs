use time::macros::datetime;

use mood_domain::{
	EntryState, JournalEntry, Mood, PersonaId,
	daily::{self, DailyReflection},
	lifecycle, prompts,
};

fn entry(mood: Option<Mood>, reflection: Option<&str>) -> JournalEntry {
	let mut entry = JournalEntry::new("u1", "A long enough journal text.", datetime!(2025-01-02 08:00 UTC));

	entry.mood = mood;
	entry.reflection = reflection.map(str::to_string);

	entry
}

#[test]
fn persona_preference_defaults_to_friendly() {
	assert_eq!(PersonaId::from_preference(None), PersonaId::Friendly);
	assert_eq!(PersonaId::from_preference(Some("pirate")), PersonaId::Friendly);
	assert_eq!(PersonaId::from_preference(Some("Coach")), PersonaId::Friendly);
	assert_eq!(PersonaId::from_preference(Some("coach")), PersonaId::Coach);
}

#[test]
fn persona_round_trips_through_its_name() {
	for persona in PersonaId::ALL {
		assert_eq!(persona.as_str().parse::<PersonaId>().ok(), Some(persona));
	}
}

#[test]
fn classifier_output_with_one_label_is_extracted() {
	let cases = [
		("good", Mood::Good),
		("I think the mood is: neutral.", Mood::Neutral),
		("BAD", Mood::Bad),
		("very-good!", Mood::VeryGood),
		("Mood = very bad", Mood::VeryBad),
	];

	for (raw, expected) in cases {
		assert_eq!(Mood::from_classifier_output(raw), expected, "raw = {raw:?}");
	}
}

#[test]
fn classifier_output_without_label_is_neutral() {
	assert_eq!(Mood::from_classifier_output("cheerful"), Mood::Neutral);
	assert_eq!(Mood::from_classifier_output(""), Mood::Neutral);
}

#[test]
fn entry_state_follows_mood_and_reflection() {
	assert_eq!(EntryState::of(&entry(None, None)), EntryState::Unclassified);
	assert_eq!(EntryState::of(&entry(Some(Mood::Pending), None)), EntryState::Unclassified);
	assert_eq!(EntryState::of(&entry(Some(Mood::Good), None)), EntryState::Classified);
	assert_eq!(EntryState::of(&entry(Some(Mood::Good), Some("nice"))), EntryState::Reflected);
}

#[test]
fn create_classification_respects_client_supplied_mood() {
	assert!(lifecycle::should_classify_on_create(&entry(Some(Mood::Pending), None)));
	assert!(lifecycle::should_classify_on_create(&entry(None, None)));
	assert!(!lifecycle::should_classify_on_create(&entry(Some(Mood::Bad), None)));
}

#[test]
fn update_classification_fires_on_reset_or_text_change() {
	let before = entry(Some(Mood::Good), Some("r"));
	let mut reset = before.clone();

	reset.mood = Some(Mood::Pending);

	assert!(lifecycle::should_classify_on_update(&before, &reset));
	assert!(!lifecycle::should_classify_on_update(&reset, &reset));

	let mut edited = before.clone();

	edited.journal_text.push_str(" More.");

	assert!(lifecycle::should_classify_on_update(&before, &edited));
	assert!(!lifecycle::should_classify_on_update(&before, &before));
}

#[test]
fn reflected_entries_are_never_reflected_again() {
	let reflected = entry(Some(Mood::Good), Some("already"));

	assert!(!lifecycle::should_reflect_on_create(&reflected));
	assert!(!lifecycle::should_reflect_on_update(&reflected, &reflected));
}

#[test]
fn cleared_reflection_is_regenerated_on_update() {
	let before = entry(Some(Mood::Good), Some("old"));
	let after = entry(Some(Mood::Good), None);

	assert!(lifecycle::should_reflect_on_update(&before, &after));
	assert!(!lifecycle::should_reflect_on_update(&after, &after));
}

#[test]
fn pending_mood_blocks_reflection() {
	assert!(!lifecycle::should_reflect_on_create(&entry(Some(Mood::Pending), None)));
	assert!(lifecycle::should_reflect_on_update(
		&entry(Some(Mood::Pending), None),
		&entry(Some(Mood::Neutral), None)
	));
}

#[test]
fn every_persona_has_distinct_encouragement() {
	let mut seen = std::collections::HashSet::new();

	for persona in PersonaId::ALL {
		assert!(seen.insert(prompts::encouragement(persona)));
		assert!(!prompts::summary_fallback(persona).is_empty());
	}
}

#[test]
fn chat_prompt_carries_summary_and_history() {
	let prompt = prompts::chat_reply(PersonaId::Tough, "User is stressed.", &[], "Hi");

	assert!(prompt.contains("User is stressed."));
	assert!(prompt.contains(prompts::chat_style(PersonaId::Tough)));
	assert!(prompt.ends_with("DO NOT repeat the context or introduce yourself."));
}

#[test]
fn daily_reflection_parses_fenced_json() {
	let raw = "```json\n{\"summary\": [\"a\", \"b\", \"c\", \"d\", \"e\", \"f\"], \"motivation\": \"Go!\"}\n```";
	let parsed = daily::parse_daily_reflection(raw, &[]);

	assert_eq!(parsed.summary, vec!["a", "b", "c", "d", "e"]);
	assert_eq!(parsed.motivation, "Go!");
}

#[test]
fn daily_reflection_falls_back_to_journal_lines() {
	let long = "x".repeat(200);
	let lines = vec![format!("good: {long}"), "bad: rough day".to_string()];
	let parsed = daily::parse_daily_reflection("not json at all", &lines);

	assert_eq!(parsed.summary.len(), 2);
	assert_eq!(parsed.summary[0].chars().count(), daily::MAX_FALLBACK_ITEM_CHARS);
	assert_eq!(parsed.summary[1], "bad: rough day");
	assert_eq!(parsed.motivation, daily::DEFAULT_MOTIVATION);
}

#[test]
fn empty_day_has_fixed_message() {
	let empty = DailyReflection::empty_day();

	assert_eq!(empty.summary.len(), 1);
	assert!(!empty.motivation.is_empty());
}
