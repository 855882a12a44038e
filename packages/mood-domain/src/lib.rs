pub mod daily;
pub mod lifecycle;
pub mod model;
pub mod mood;
pub mod persona;
pub mod prompts;

pub use lifecycle::EntryState;
pub use model::{
	ChatMessage, ChatRole, ChatSession, EntryPatch, JournalEntry, SummaryDigest, UserProfile,
};
pub use mood::Mood;
pub use persona::PersonaId;
