//! Chat replies produced by the engine.

use super::knowledge::Findings;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum medications listed in a reply.
pub const MAX_REPLY_MEDICATIONS: usize = 3;
/// Maximum advice lines listed in a reply.
pub const MAX_REPLY_ADVICE: usize = 2;
/// Conditions and medications named in the reply sentence.
const MENTIONED_IN_TEXT: usize = 2;

const GREETING_TEXT: &str = "Hello! I'm Dr. Sarah Chen, your AI medical assistant. I'm here to help you with your health concerns. Please describe your symptoms or ask any health-related questions.";
const GREETING_ADVICE: &str = "I'm ready to help diagnose and treat your symptoms.";

const EMERGENCY_TEXT: &str = "This sounds like a medical emergency. Please call emergency services (911) immediately or go to the nearest emergency room. Your symptoms require immediate medical attention.";
const EMERGENCY_ADVICE: &str = "Call emergency services immediately - this is urgent";

const CLARIFICATION_TEXT: &str = "I understand you have health concerns. Could you please describe your symptoms in more detail? Tell me about any pain, fever, nausea, or other discomfort you're experiencing.";
const CLARIFICATION_ADVICE: &str =
    "Please provide more details about your symptoms for better diagnosis";

const DEFAULT_RECOMMENDATION: &str = "rest and monitoring";
const FALLBACK_CONDITION: &str = "General health concern";
const FALLBACK_ADVICE: &str = "Rest and monitor symptoms";

/// Who wrote a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    User,
    Ai,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::User => "user",
            MessageType::Ai => "ai",
        }
    }
}

impl std::str::FromStr for MessageType {
    type Err = crate::HealthBotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(MessageType::User),
            "ai" => Ok(MessageType::Ai),
            other => Err(crate::HealthBotError::InvalidInput(format!(
                "unknown message type: '{}'",
                other
            ))),
        }
    }
}

/// One prior exchange in a conversation, as seen by the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: MessageType,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageType::User,
            content: content.into(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: MessageType::Ai,
            content: content.into(),
        }
    }
}

/// Which rule produced a reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Greeting,
    SymptomAnalysis,
    Emergency,
    Clarification,
    Prescription,
}

impl ResponseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Greeting => "greeting",
            ResponseKind::SymptomAnalysis => "symptom_analysis",
            ResponseKind::Emergency => "emergency",
            ResponseKind::Clarification => "clarification",
            ResponseKind::Prescription => "prescription",
        }
    }
}

/// A reply to one chat message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AIResponse {
    pub response: String,
    pub medications: Vec<String>,
    pub advice: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub requires_follow_up: bool,
    pub kind: ResponseKind,
}

impl AIResponse {
    pub(crate) fn greeting(now: DateTime<Utc>) -> Self {
        Self::fixed(ResponseKind::Greeting, GREETING_TEXT, GREETING_ADVICE, false, now)
    }

    pub(crate) fn emergency(now: DateTime<Utc>) -> Self {
        Self::fixed(ResponseKind::Emergency, EMERGENCY_TEXT, EMERGENCY_ADVICE, false, now)
    }

    pub(crate) fn clarification(now: DateTime<Utc>) -> Self {
        Self::fixed(
            ResponseKind::Clarification,
            CLARIFICATION_TEXT,
            CLARIFICATION_ADVICE,
            true,
            now,
        )
    }

    fn fixed(
        kind: ResponseKind,
        text: &str,
        advice: &str,
        requires_follow_up: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            response: text.to_owned(),
            medications: Vec::new(),
            advice: vec![advice.to_owned()],
            timestamp: now,
            requires_follow_up,
            kind,
        }
    }

    /// Builds the symptom analysis reply from accumulated findings.
    ///
    /// Lists are trimmed but not de-duplicated.
    pub(crate) fn symptom_analysis(findings: Findings, now: DateTime<Utc>) -> Self {
        let conditions = head(&findings.conditions, MENTIONED_IN_TEXT).join(", ");
        let recommendation = findings
            .advice
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_RECOMMENDATION);
        let medications = head(&findings.medications, MENTIONED_IN_TEXT).join(", ");

        let response = format!(
            "Based on your symptoms, you appear to have {conditions}. I recommend {recommendation}. You can take {medications} to help manage your symptoms. Let me know if your symptoms worsen or persist beyond a few days."
        );

        Self {
            response,
            medications: truncated(findings.medications, MAX_REPLY_MEDICATIONS),
            advice: truncated(findings.advice, MAX_REPLY_ADVICE),
            timestamp: now,
            requires_follow_up: true,
            kind: ResponseKind::SymptomAnalysis,
        }
    }

    /// Builds a prescription reply; empty findings fall back to a general recommendation.
    pub(crate) fn prescription(mut findings: Findings, now: DateTime<Utc>) -> Self {
        if findings.conditions.is_empty() {
            findings.conditions = vec![FALLBACK_CONDITION.to_owned()];
            findings.advice = vec![FALLBACK_ADVICE.to_owned()];
        }

        let medications = head(&findings.medications, MAX_REPLY_MEDICATIONS).join(", ");
        let conditions = head(&findings.conditions, MENTIONED_IN_TEXT).join(", ");
        let advice = findings
            .advice
            .first()
            .map(String::as_str)
            .unwrap_or(FALLBACK_ADVICE);

        let response = format!(
            "Based on your symptoms, here's your prescription: {medications}. Take as directed for {conditions}. {advice}. Follow up with me if symptoms persist or worsen."
        );

        Self {
            response,
            medications: truncated(findings.medications, MAX_REPLY_MEDICATIONS),
            advice: truncated(findings.advice, MAX_REPLY_ADVICE),
            timestamp: now,
            requires_follow_up: false,
            kind: ResponseKind::Prescription,
        }
    }
}

fn head(items: &[String], n: usize) -> &[String] {
    &items[..items.len().min(n)]
}

fn truncated(mut items: Vec<String>, n: usize) -> Vec<String> {
    items.truncate(n);
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn findings() -> Findings {
        Findings {
            conditions: vec!["Flu".into(), "Migraine".into(), "Sinusitis".into()],
            medications: vec![
                "Ibuprofen".into(),
                "Ibuprofen".into(),
                "Aspirin".into(),
                "Honey".into(),
            ],
            advice: vec!["Rest".into(), "Rest".into(), "Hydrate".into()],
        }
    }

    #[test]
    fn symptom_analysis_fills_template() {
        let reply = AIResponse::symptom_analysis(findings(), Utc::now());
        assert_eq!(
            reply.response,
            "Based on your symptoms, you appear to have Flu, Migraine. I recommend Rest. You can take Ibuprofen, Ibuprofen to help manage your symptoms. Let me know if your symptoms worsen or persist beyond a few days."
        );
    }

    #[test]
    fn symptom_analysis_trims_without_dedup() {
        let reply = AIResponse::symptom_analysis(findings(), Utc::now());
        assert_eq!(reply.medications, vec!["Ibuprofen", "Ibuprofen", "Aspirin"]);
        assert_eq!(reply.advice, vec!["Rest", "Rest"]);
        assert!(reply.requires_follow_up);
        assert_eq!(reply.kind, ResponseKind::SymptomAnalysis);
    }

    #[test]
    fn symptom_analysis_without_advice_recommends_rest() {
        let reply = AIResponse::symptom_analysis(Findings::default(), Utc::now());
        assert!(reply.response.contains("I recommend rest and monitoring."));
    }

    #[test]
    fn prescription_falls_back_to_general_concern() {
        let reply = AIResponse::prescription(Findings::default(), Utc::now());
        assert!(reply.response.contains("Take as directed for General health concern."));
        assert_eq!(reply.advice, vec!["Rest and monitor symptoms"]);
        assert!(!reply.requires_follow_up);
    }

    #[test]
    fn fixed_replies_carry_single_advice_line() {
        let now = Utc::now();
        for (reply, follow_up) in [
            (AIResponse::greeting(now), false),
            (AIResponse::emergency(now), false),
            (AIResponse::clarification(now), true),
        ] {
            assert!(reply.medications.is_empty());
            assert_eq!(reply.advice.len(), 1);
            assert_eq!(reply.requires_follow_up, follow_up);
        }
    }

    #[test]
    fn message_type_parses_case_insensitively() {
        assert_eq!("USER".parse::<MessageType>().unwrap(), MessageType::User);
        assert_eq!("ai".parse::<MessageType>().unwrap(), MessageType::Ai);
        assert!("doctor".parse::<MessageType>().is_err());
    }
}
