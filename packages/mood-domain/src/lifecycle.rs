//! Enrichment lifecycle of a journal entry.
//!
//! `Unclassified -> Classified -> (reflecting) -> Reflected`. The reflecting step only exists
//! inside a running handler; storage sees the entry move straight from `Classified` to
//! `Reflected` through a compare-and-set write. Clearing the reflection moves an entry back to
//! `Classified`, and resetting the mood to `pending` moves it back to `Unclassified`.

use crate::model::JournalEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
	Unclassified,
	Classified,
	Reflected,
}
impl EntryState {
	pub fn of(entry: &JournalEntry) -> Self {
		if entry.reflection.is_some() {
			return Self::Reflected;
		}

		match entry.mood {
			Some(mood) if !mood.is_pending() => Self::Classified,
			_ => Self::Unclassified,
		}
	}
}

/// A freshly created entry needs a mood unless the client already supplied one.
pub fn should_classify_on_create(entry: &JournalEntry) -> bool {
	if entry.journal_text.trim().is_empty() {
		return false;
	}

	entry.mood.is_none_or(|mood| mood.is_pending())
}

pub fn should_classify_on_update(before: &JournalEntry, after: &JournalEntry) -> bool {
	let mood_reset = after.mood.is_some_and(|mood| mood.is_pending())
		&& !before.mood.is_some_and(|mood| mood.is_pending());
	let journal_changed = before.journal_text != after.journal_text;

	mood_reset || journal_changed
}

/// Guard shared by both reflection paths: the owner, text and a real mood are present and no
/// reflection has been written yet.
pub fn is_ready_for_reflection(entry: &JournalEntry) -> bool {
	!entry.user_id.trim().is_empty()
		&& !entry.journal_text.trim().is_empty()
		&& EntryState::of(entry) == EntryState::Classified
}

pub fn should_reflect_on_create(entry: &JournalEntry) -> bool {
	is_ready_for_reflection(entry)
}

/// Fires when an update leaves the entry ready for reflection and something the reflection
/// depends on moved: the mood, the text, or an explicit clear of the old reflection.
pub fn should_reflect_on_update(before: &JournalEntry, after: &JournalEntry) -> bool {
	if !is_ready_for_reflection(after) {
		return false;
	}

	before.mood != after.mood
		|| before.journal_text != after.journal_text
		|| before.reflection.is_some()
}
