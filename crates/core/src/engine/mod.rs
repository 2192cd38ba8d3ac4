//! # Symptom-Response Engine
//!
//! A rule engine that maps a chat message, or a checklist of symptom ids, onto a bounded set of
//! conditions, medications and advice from a fixed knowledge table.
//!
//! The engine is pure: it reads only its immutable [`KnowledgeBase`] and [`Vocabulary`] and the
//! arguments it is given. It never fails. Unrecognised input resolves to a clarification reply.
//!
//! ## Reply selection
//!
//! For [`SymptomEngine::get_medical_response`] the first matching rule wins:
//!
//! 1. a greeting in the normalised message of a new conversation → fixed greeting;
//! 2. one or more detected symptoms → symptom analysis;
//! 3. an emergency keyword in the lower-cased message → fixed emergency escalation;
//! 4. anything else → a request for more detail.
//!
//! Symptom detection outranks emergency wording, so "severe chest pain" is analysed rather than
//! escalated.

mod analysis;
mod detect;
mod follow_up;
mod knowledge;
mod response;
mod vocabulary;

pub use analysis::{
    canonical_symptom_id, ConfidenceLevel, ConsultationAnalysis, ANALYSIS_WARNING,
    MAX_ANALYSIS_ADVICE, MAX_ANALYSIS_CONDITIONS, MAX_ANALYSIS_MEDICATIONS,
};
pub use detect::{contains_any, normalize_text};
pub use follow_up::{follow_up_questions, MAX_FOLLOW_UP_QUESTIONS};
pub use knowledge::{Findings, KnowledgeBase, SymptomEntry, SymptomVariation};
pub use response::{
    AIResponse, ChatTurn, MessageType, ResponseKind, MAX_REPLY_ADVICE, MAX_REPLY_MEDICATIONS,
};
pub use vocabulary::{Vocabulary, EMERGENCY_KEYWORDS, FILLER_PHRASES, GREETINGS};

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Cheap to clone; clones share the same tables.
#[derive(Clone, Debug)]
pub struct SymptomEngine {
    knowledge: Arc<KnowledgeBase>,
    vocabulary: Arc<Vocabulary>,
}

impl Default for SymptomEngine {
    fn default() -> Self {
        Self::new(KnowledgeBase::standard().clone(), Vocabulary::default())
    }
}

impl SymptomEngine {
    pub fn new(knowledge: KnowledgeBase, vocabulary: Vocabulary) -> Self {
        Self {
            knowledge: Arc::new(knowledge),
            vocabulary: Arc::new(vocabulary),
        }
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Normalises `text` with this engine's filler phrases.
    pub fn normalize(&self, text: &str) -> String {
        normalize_text(text, &self.vocabulary.filler_phrases)
    }

    /// Canonical symptom ids found in free text, in first-seen order.
    pub fn detect_symptoms(&self, text: &str) -> Vec<String> {
        detect::detect_symptoms(&self.normalize(text), &self.knowledge)
    }

    /// Replies to one chat message given the prior turns of the conversation.
    pub fn get_medical_response(&self, message: &str, history: &[ChatTurn]) -> AIResponse {
        self.get_medical_response_at(message, history, Utc::now())
    }

    /// As [`Self::get_medical_response`], stamping the reply with `now`.
    pub fn get_medical_response_at(
        &self,
        message: &str,
        history: &[ChatTurn],
        now: DateTime<Utc>,
    ) -> AIResponse {
        let normalised = self.normalize(message);

        if history.is_empty() && contains_any(&normalised, &self.vocabulary.greetings) {
            return AIResponse::greeting(now);
        }

        let symptoms = detect::detect_symptoms(&normalised, &self.knowledge);
        if !symptoms.is_empty() {
            return AIResponse::symptom_analysis(self.knowledge.collect(&symptoms), now);
        }

        if contains_any(&message.to_lowercase(), &self.vocabulary.emergency_keywords) {
            return AIResponse::emergency(now);
        }

        AIResponse::clarification(now)
    }

    /// Analyses a checklist of symptom ids.
    ///
    /// `age` and `gender` are accepted for the record but do not affect the result.
    pub fn analyze_symptoms(
        &self,
        symptoms: &[String],
        age: Option<u32>,
        gender: Option<&str>,
    ) -> ConsultationAnalysis {
        self.analyze_symptoms_at(symptoms, age, gender, Utc::now())
    }

    pub fn analyze_symptoms_at(
        &self,
        symptoms: &[String],
        _age: Option<u32>,
        _gender: Option<&str>,
        now: DateTime<Utc>,
    ) -> ConsultationAnalysis {
        analysis::analyze(symptoms, &self.knowledge, now)
    }

    /// Follow-up questions for whatever symptoms `text` mentions.
    pub fn follow_up_questions(&self, text: &str) -> Vec<String> {
        follow_up_questions(&self.detect_symptoms(text))
    }

    /// Builds a prescription from every user turn in `history`.
    pub fn prescription_from_history(&self, history: &[ChatTurn]) -> AIResponse {
        self.prescription_from_history_at(history, Utc::now())
    }

    pub fn prescription_from_history_at(
        &self,
        history: &[ChatTurn],
        now: DateTime<Utc>,
    ) -> AIResponse {
        let transcript = history
            .iter()
            .filter(|turn| turn.role == MessageType::User)
            .map(|turn| turn.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let symptoms = self.detect_symptoms(&transcript);
        AIResponse::prescription(self.knowledge.collect(&symptoms), now)
    }
}
