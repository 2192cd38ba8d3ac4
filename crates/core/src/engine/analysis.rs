//! Batch analysis of a symptom checklist.

use super::knowledge::KnowledgeBase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub const MAX_ANALYSIS_CONDITIONS: usize = 3;
pub const MAX_ANALYSIS_MEDICATIONS: usize = 3;
pub const MAX_ANALYSIS_ADVICE: usize = 2;

/// Disclaimer attached to every checklist analysis.
pub const ANALYSIS_WARNING: &str = "Monitor symptoms and follow up if they worsen";

/// Coarse label derived only from how many symptoms were supplied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// Three or more symptoms → high, two → medium, otherwise low.
    pub fn from_symptom_count(count: usize) -> Self {
        match count {
            n if n >= 3 => ConfidenceLevel::High,
            2 => ConfidenceLevel::Medium,
            _ => ConfidenceLevel::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::High => "high",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConfidenceLevel {
    type Err = crate::HealthBotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(ConfidenceLevel::Low),
            "medium" => Ok(ConfidenceLevel::Medium),
            "high" => Ok(ConfidenceLevel::High),
            other => Err(crate::HealthBotError::InvalidInput(format!(
                "unknown confidence level: '{}'",
                other
            ))),
        }
    }
}

/// Result of analysing a symptom checklist.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultationAnalysis {
    pub conditions: Vec<String>,
    pub medications: Vec<String>,
    pub advice: Vec<String>,
    pub warnings: Vec<String>,
    pub confidence_level: ConfidenceLevel,
    pub timestamp: DateTime<Utc>,
}

/// Maps a checklist id to its table key: trimmed, lower-cased, underscores read as spaces.
///
/// Form checklists submit ids such as `chest_pain`; the table keys them as `chest pain`.
pub fn canonical_symptom_id(id: &str) -> String {
    id.trim().to_lowercase().replace('_', " ")
}

pub(crate) fn analyze(
    symptoms: &[String],
    knowledge: &KnowledgeBase,
    now: DateTime<Utc>,
) -> ConsultationAnalysis {
    let ids: Vec<String> = symptoms.iter().map(|s| canonical_symptom_id(s)).collect();
    let findings = knowledge.collect(&ids);

    ConsultationAnalysis {
        conditions: dedup_take(findings.conditions, MAX_ANALYSIS_CONDITIONS),
        medications: dedup_take(findings.medications, MAX_ANALYSIS_MEDICATIONS),
        advice: dedup_take(findings.advice, MAX_ANALYSIS_ADVICE),
        warnings: vec![ANALYSIS_WARNING.to_owned()],
        confidence_level: ConfidenceLevel::from_symptom_count(symptoms.len()),
        timestamp: now,
    }
}

/// Drops repeated items, keeping first occurrences in order, then keeps the first `n`.
fn dedup_take(items: Vec<String>, n: usize) -> Vec<String> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .take(n)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(symptoms: &[&str]) -> ConsultationAnalysis {
        let symptoms: Vec<String> = symptoms.iter().map(|s| s.to_string()).collect();
        analyze(&symptoms, KnowledgeBase::standard(), Utc::now())
    }

    #[test]
    fn confidence_follows_symptom_count() {
        assert_eq!(run(&["fever", "headache", "cough"]).confidence_level, ConfidenceLevel::High);
        assert_eq!(run(&["fever", "headache"]).confidence_level, ConfidenceLevel::Medium);
        assert_eq!(run(&["fever"]).confidence_level, ConfidenceLevel::Low);
        assert_eq!(run(&[]).confidence_level, ConfidenceLevel::Low);
    }

    #[test]
    fn unknown_symptoms_still_count_towards_confidence() {
        let analysis = run(&["rash", "itch", "hives"]);
        assert_eq!(analysis.confidence_level, ConfidenceLevel::High);
        assert!(analysis.conditions.is_empty());
        assert_eq!(analysis.warnings, vec![ANALYSIS_WARNING]);
    }

    #[test]
    fn outputs_are_deduplicated_in_first_seen_order() {
        let analysis = run(&["fever", "headache", "cough"]);
        assert_eq!(
            analysis.conditions,
            vec!["Common cold", "Flu", "Tension headache"]
        );
        assert_eq!(
            analysis.medications,
            vec!["Acetaminophen", "Ibuprofen", "Cough suppressants"]
        );
        assert_eq!(
            analysis.advice,
            vec![
                "Rest, stay hydrated, monitor temperature",
                "Rest in a quiet, dark room, stay hydrated"
            ]
        );
    }

    #[test]
    fn caps_hold_for_the_whole_table() {
        let all: Vec<&str> = KnowledgeBase::standard()
            .entries()
            .iter()
            .map(|e| e.key.as_str())
            .collect();
        let analysis = run(&all);
        assert_eq!(analysis.conditions.len(), MAX_ANALYSIS_CONDITIONS);
        assert_eq!(analysis.medications.len(), MAX_ANALYSIS_MEDICATIONS);
        assert_eq!(analysis.advice.len(), MAX_ANALYSIS_ADVICE);
        let unique: HashSet<_> = analysis.medications.iter().collect();
        assert_eq!(unique.len(), analysis.medications.len());
    }

    #[test]
    fn checklist_ids_are_canonicalised() {
        let analysis = run(&[" Chest_Pain "]);
        assert_eq!(analysis.conditions, vec!["Costochondritis", "Muscle strain"]);
    }

    #[test]
    fn confidence_level_round_trips_through_str() {
        for level in [ConfidenceLevel::Low, ConfidenceLevel::Medium, ConfidenceLevel::High] {
            assert_eq!(level.as_str().parse::<ConfidenceLevel>().unwrap(), level);
        }
    }
}
