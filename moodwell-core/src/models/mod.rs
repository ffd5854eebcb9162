pub mod mood;
pub mod turn;

pub use mood::{MoodCategory, MoodClassification, MoodEntry};
pub use turn::{ConversationTurn, Role};
