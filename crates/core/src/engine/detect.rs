//! Text normalisation and symptom detection.
//!
//! Matching is substring based throughout. A symptom key or variation phrase matches wherever
//! it occurs in the normalised text, including inside longer words.

use super::knowledge::KnowledgeBase;

/// Lower-cases and trims `text`, then removes each filler phrase in order.
pub fn normalize_text<S: AsRef<str>>(text: &str, filler_phrases: &[S]) -> String {
    let mut normalised = text.trim().to_lowercase();
    for filler in filler_phrases {
        let filler = filler.as_ref();
        if !filler.is_empty() {
            normalised = normalised.replace(filler, "");
        }
    }
    normalised
}

/// True if `text` contains any of `words` as a substring.
pub fn contains_any<S: AsRef<str>>(text: &str, words: &[S]) -> bool {
    words.iter().any(|w| text.contains(w.as_ref()))
}

/// Detects canonical symptoms in already-normalised text.
///
/// Table keys are checked first in table order; then each variation list is scanned until its
/// first matching phrase. A symptom is recorded once, at the position it was first seen.
pub fn detect_symptoms(normalised: &str, knowledge: &KnowledgeBase) -> Vec<String> {
    let mut detected: Vec<String> = Vec::new();

    for entry in knowledge.entries() {
        if normalised.contains(entry.key.as_str()) {
            detected.push(entry.key.clone());
        }
    }

    for variation in knowledge.variations() {
        let matched = variation
            .phrases
            .iter()
            .any(|p| normalised.contains(p.as_str()));
        if matched && !detected.contains(&variation.symptom) {
            detected.push(variation.symptom.clone());
        }
    }

    detected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::knowledge::{SymptomEntry, SymptomVariation};
    use crate::engine::vocabulary::FILLER_PHRASES;

    fn normalise(text: &str) -> String {
        normalize_text(text, FILLER_PHRASES)
    }

    #[test]
    fn normalize_strips_fillers_and_case() {
        assert_eq!(normalise("  I have a Fever "), " a fever");
        assert_eq!(normalise("I feel dizzy"), " dizzy");
    }

    #[test]
    fn normalize_removes_fillers_inside_words() {
        // Substring removal is not word-boundary aware.
        assert_eq!(normalise("this discomfort"), "th dcomfort");
        assert_eq!(normalise("Amazing"), "azing");
    }

    #[test]
    fn detects_keys_in_table_order() {
        let kb = KnowledgeBase::standard();
        let detected = detect_symptoms(&normalise("I have a headache and fever"), kb);
        // "headache" also contains the "ache" variation of "pain", found in the variation pass.
        assert_eq!(detected, vec!["fever", "headache", "pain"]);
    }

    #[test]
    fn variation_adds_canonical_symptom_once() {
        let kb = KnowledgeBase::standard();
        let detected = detect_symptoms(&normalise("severe chest pain"), kb);
        // "chest pain" and "pain" are both table keys; the variation pass adds nothing new.
        assert_eq!(detected, vec!["chest pain", "pain"]);
    }

    #[test]
    fn variation_only_match_is_appended_after_keys() {
        let kb = KnowledgeBase::standard();
        let detected = detect_symptoms(&normalise("fever and shortness of breath"), kb);
        assert_eq!(detected, vec!["fever", "difficulty breathing"]);
    }

    #[test]
    fn wheezing_maps_to_asthma() {
        let kb = KnowledgeBase::standard();
        assert_eq!(detect_symptoms(&normalise("wheezing at night"), kb), vec!["asthma"]);
    }

    #[test]
    fn filler_removal_can_hide_a_variation() {
        let kb = KnowledgeBase::standard();
        // "discomfort" loses its "is" during normalisation and no longer matches.
        assert!(detect_symptoms(&normalise("some discomfort"), kb).is_empty());
    }

    #[test]
    fn nothing_detected_in_unrelated_text() {
        let kb = KnowledgeBase::standard();
        assert!(detect_symptoms(&normalise("what are your opening hours"), kb).is_empty());
    }

    #[test]
    fn first_matching_variation_wins() {
        let kb = KnowledgeBase::new(
            vec![],
            vec![SymptomVariation {
                symptom: "rash".into(),
                phrases: vec!["red".into(), "itchy".into()],
            }],
        )
        .unwrap();
        assert_eq!(detect_symptoms("red and itchy", &kb), vec!["rash"]);
    }

    #[test]
    fn keys_from_custom_table_are_detected() {
        let kb = KnowledgeBase::new(
            vec![SymptomEntry {
                key: "rash".into(),
                conditions: vec![],
                medications: vec![],
                advice: String::new(),
            }],
            vec![],
        )
        .unwrap();
        assert_eq!(detect_symptoms("a rash on my arm", &kb), vec!["rash"]);
    }

    #[test]
    fn contains_any_matches_substrings() {
        assert!(contains_any("this is severe", &["severe"]));
        assert!(!contains_any("mild", &["severe", "critical"]));
    }
}
