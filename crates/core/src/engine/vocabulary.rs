//! Fixed word lists used to classify chat messages.
//!
//! The lists are carried in a [`Vocabulary`] value rather than read from module state, so an
//! engine can be built with alternative lists without touching the defaults.

/// Phrases that mark a conversation opener.
pub const GREETINGS: &[&str] = &["hello", "hi", "hey", "good morning", "good afternoon"];

/// Keywords that escalate an otherwise unrecognised message to the emergency reply.
pub const EMERGENCY_KEYWORDS: &[&str] = &[
    "emergency",
    "severe",
    "critical",
    "heart attack",
    "stroke",
    "bleeding",
];

/// Filler phrases removed during normalisation, in removal order.
///
/// Removal is plain substring replacement, so `"is"` is also removed from inside words such as
/// `"discomfort"` or `"this"`.
pub const FILLER_PHRASES: &[&str] = &["i have", "i'm experiencing", "i feel", "am", "is", "are"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vocabulary {
    pub greetings: Vec<String>,
    pub emergency_keywords: Vec<String>,
    pub filler_phrases: Vec<String>,
}

impl Vocabulary {
    pub fn new(
        greetings: impl IntoIterator<Item = impl Into<String>>,
        emergency_keywords: impl IntoIterator<Item = impl Into<String>>,
        filler_phrases: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            greetings: greetings.into_iter().map(Into::into).collect(),
            emergency_keywords: emergency_keywords.into_iter().map(Into::into).collect(),
            filler_phrases: filler_phrases.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new(
            GREETINGS.iter().copied(),
            EMERGENCY_KEYWORDS.iter().copied(),
            FILLER_PHRASES.iter().copied(),
        )
    }
}
