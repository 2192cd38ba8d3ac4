//! The symptom knowledge table.
//!
//! A [`KnowledgeBase`] pairs an ordered list of [`SymptomEntry`] values with an ordered
//! variation map (canonical symptom → synonym phrases). Both orders are observable: detection
//! reports symptoms in table order first, then variation order.
//!
//! The built-in table is constructed once on first use and shared read-only
//! ([`KnowledgeBase::standard`]). Alternative tables can be loaded from YAML:
//!
//! ```yaml
//! symptoms:
//!   - key: fever
//!     conditions: [Common cold, Flu]
//!     medications: [Acetaminophen]
//!     advice: Rest, stay hydrated, monitor temperature
//! variations:
//!   - symptom: fever
//!     phrases: [high temperature, feverish]
//! ```

use crate::{HealthBotError, HealthBotResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

/// Conditions and medications contributed per matched symptom.
const PER_SYMPTOM_TAKE: usize = 2;

/// One row of the knowledge table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomEntry {
    /// Canonical symptom id, e.g. `"fever"` or `"chest pain"`.
    pub key: String,
    pub conditions: Vec<String>,
    pub medications: Vec<String>,
    pub advice: String,
}

/// Free-text phrases that map back to a canonical symptom id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomVariation {
    pub symptom: String,
    pub phrases: Vec<String>,
}

/// Conditions, medications and advice accumulated from a list of symptoms, before any
/// trimming or de-duplication.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Findings {
    pub conditions: Vec<String>,
    pub medications: Vec<String>,
    pub advice: Vec<String>,
}

impl Findings {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.medications.is_empty() && self.advice.is_empty()
    }
}

#[derive(Deserialize)]
struct KnowledgeFile {
    symptoms: Vec<SymptomEntry>,
    #[serde(default)]
    variations: Vec<SymptomVariation>,
}

/// Immutable symptom lookup table.
#[derive(Clone, Debug)]
pub struct KnowledgeBase {
    entries: Vec<SymptomEntry>,
    variations: Vec<SymptomVariation>,
    index: HashMap<String, usize>,
}

impl KnowledgeBase {
    /// Builds a knowledge base, rejecting empty or duplicate symptom keys.
    ///
    /// Keys are matched against lower-cased text, so they are stored lower-cased. Variations
    /// naming a symptom with no table entry are kept (they still count as detected symptoms,
    /// they just contribute nothing to an analysis) but are logged.
    ///
    /// # Errors
    ///
    /// Returns [`HealthBotError::InvalidInput`] for an empty key, a duplicate key, or an empty
    /// variation phrase.
    pub fn new(
        entries: Vec<SymptomEntry>,
        variations: Vec<SymptomVariation>,
    ) -> HealthBotResult<Self> {
        let mut index = HashMap::with_capacity(entries.len());
        let mut normalised = Vec::with_capacity(entries.len());

        for mut entry in entries {
            entry.key = entry.key.trim().to_lowercase();
            if entry.key.is_empty() {
                return Err(HealthBotError::InvalidInput(
                    "symptom key cannot be empty".into(),
                ));
            }
            if index.insert(entry.key.clone(), normalised.len()).is_some() {
                return Err(HealthBotError::InvalidInput(format!(
                    "duplicate symptom key: '{}'",
                    entry.key
                )));
            }
            normalised.push(entry);
        }

        let mut checked = Vec::with_capacity(variations.len());
        for mut variation in variations {
            variation.symptom = variation.symptom.trim().to_lowercase();
            variation.phrases = variation
                .phrases
                .into_iter()
                .map(|p| p.trim().to_lowercase())
                .collect();
            if variation.phrases.iter().any(String::is_empty) {
                return Err(HealthBotError::InvalidInput(format!(
                    "empty variation phrase for '{}'",
                    variation.symptom
                )));
            }
            if !index.contains_key(&variation.symptom) {
                tracing::warn!(
                    "variation list for '{}' has no knowledge entry",
                    variation.symptom
                );
            }
            checked.push(variation);
        }

        Ok(Self {
            entries: normalised,
            variations: checked,
            index,
        })
    }

    /// The built-in table, constructed on first use.
    pub fn standard() -> &'static KnowledgeBase {
        &STANDARD
    }

    /// Parses a knowledge table from YAML.
    pub fn from_yaml_str(yaml: &str) -> HealthBotResult<Self> {
        let file: KnowledgeFile =
            serde_yaml::from_str(yaml).map_err(HealthBotError::YamlDeserialization)?;
        Self::new(file.symptoms, file.variations)
    }

    /// Reads and parses a knowledge table from a YAML file.
    pub fn from_yaml_file(path: &Path) -> HealthBotResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(HealthBotError::FileRead)?;
        Self::from_yaml_str(&contents)
    }

    /// Entries in table order.
    pub fn entries(&self) -> &[SymptomEntry] {
        &self.entries
    }

    /// Variation lists in map order.
    pub fn variations(&self) -> &[SymptomVariation] {
        &self.variations
    }

    pub fn entry(&self, key: &str) -> Option<&SymptomEntry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Accumulates findings for `symptoms` in the given order.
    ///
    /// Each symptom with a table entry contributes its first two conditions, its first two
    /// medications and its advice line. Unknown symptoms contribute nothing. Nothing is trimmed
    /// or de-duplicated here.
    pub fn collect<S: AsRef<str>>(&self, symptoms: &[S]) -> Findings {
        let mut findings = Findings::default();
        for symptom in symptoms {
            if let Some(entry) = self.entry(symptom.as_ref()) {
                findings
                    .conditions
                    .extend(entry.conditions.iter().take(PER_SYMPTOM_TAKE).cloned());
                findings
                    .medications
                    .extend(entry.medications.iter().take(PER_SYMPTOM_TAKE).cloned());
                findings.advice.push(entry.advice.clone());
            }
        }
        findings
    }
}

type StandardRow = (&'static str, &'static [&'static str], &'static [&'static str], &'static str);

const STANDARD_ENTRIES: &[StandardRow] = &[
    (
        "fever",
        &["Common cold", "Flu", "COVID-19", "Bacterial infection"],
        &["Acetaminophen", "Ibuprofen", "Aspirin"],
        "Rest, stay hydrated, monitor temperature",
    ),
    (
        "headache",
        &["Tension headache", "Migraine", "Sinusitis", "Dehydration"],
        &["Acetaminophen", "Ibuprofen", "Aspirin", "Caffeine"],
        "Rest in a quiet, dark room, stay hydrated",
    ),
    (
        "cough",
        &["Common cold", "Bronchitis", "Pneumonia", "Allergies"],
        &["Cough suppressants", "Expectorants", "Honey"],
        "Stay hydrated, use humidifier, avoid irritants",
    ),
    (
        "fatigue",
        &["Anemia", "Depression", "Sleep disorders", "Chronic fatigue"],
        &["Iron supplements", "Vitamin B12", "Melatonin"],
        "Improve sleep hygiene, exercise regularly, balanced diet",
    ),
    (
        "nausea",
        &["Gastritis", "Food poisoning", "Migraine", "Pregnancy"],
        &["Antiemetics", "Ginger", "Peppermint"],
        "Small frequent meals, avoid strong odors, rest",
    ),
    (
        "sore throat",
        &["Strep throat", "Viral infection", "Allergies", "Acid reflux"],
        &["Throat lozenges", "Salt water gargle", "Honey", "Pain relievers"],
        "Rest voice, stay hydrated, avoid irritants",
    ),
    (
        "runny nose",
        &["Common cold", "Allergies", "Sinusitis", "Viral infection"],
        &["Decongestants", "Antihistamines", "Saline spray"],
        "Stay hydrated, use humidifier, avoid allergens",
    ),
    (
        "muscle aches",
        &["Flu", "Overexertion", "Fibromyalgia", "Viral infection"],
        &["Ibuprofen", "Acetaminophen", "Muscle relaxants"],
        "Rest, gentle stretching, warm compress",
    ),
    (
        "dizziness",
        &["Dehydration", "Low blood pressure", "Inner ear problems", "Anxiety"],
        &["Anti-nausea medication", "Electrolytes"],
        "Stay hydrated, avoid sudden movements, rest",
    ),
    (
        "chest pain",
        &["Costochondritis", "Muscle strain", "Heartburn", "Anxiety"],
        &["Antacids", "Ibuprofen", "Pain relievers"],
        "Rest, avoid heavy meals, and monitor your symptoms. If pain is severe or radiates to your arm/jaw, seek immediate medical attention.",
    ),
    (
        "difficulty breathing",
        &["Asthma", "Anxiety", "Respiratory infection", "Costochondritis"],
        &["Bronchodilators", "Anti-anxiety medication", "Pain relievers"],
        "Sit upright, practice deep breathing, avoid triggers",
    ),
    (
        "pain",
        &["Muscle strain", "Inflammation", "Nerve irritation", "Tissue damage"],
        &["Ibuprofen", "Acetaminophen", "Anti-inflammatory drugs"],
        "Rest the affected area, apply ice/heat, avoid aggravating movements",
    ),
    (
        "asthma",
        &["Asthma exacerbation", "Respiratory inflammation", "Bronchial spasm"],
        &["Albuterol inhaler", "Inhaled corticosteroids", "Bronchodilators"],
        "Use rescue inhaler as prescribed, avoid triggers, monitor symptoms",
    ),
];

const STANDARD_VARIATIONS: &[(&str, &[&str])] = &[
    (
        "chest pain",
        &[
            "chest pain",
            "chest ache",
            "chest discomfort",
            "pain in chest",
            "left chest pain",
            "right chest pain",
        ],
    ),
    (
        "difficulty breathing",
        &[
            "difficulty breathing",
            "breathing problems",
            "shortness of breath",
            "breathless",
            "can't breathe",
            "hard to breathe",
        ],
    ),
    (
        "pain",
        &["pain", "ache", "discomfort", "soreness", "tenderness", "hurts"],
    ),
    (
        "asthma",
        &["asthma", "asthmatic", "breathing difficulty", "wheezing", "tight chest"],
    ),
];

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

static STANDARD: LazyLock<KnowledgeBase> = LazyLock::new(|| {
    let entries = STANDARD_ENTRIES
        .iter()
        .map(|(key, conditions, medications, advice)| SymptomEntry {
            key: (*key).to_owned(),
            conditions: owned(conditions),
            medications: owned(medications),
            advice: (*advice).to_owned(),
        })
        .collect();
    let variations = STANDARD_VARIATIONS
        .iter()
        .map(|(symptom, phrases)| SymptomVariation {
            symptom: (*symptom).to_owned(),
            phrases: owned(phrases),
        })
        .collect();

    // The built-in rows are unique, lower-case and non-empty.
    match KnowledgeBase::new(entries, variations) {
        Ok(kb) => kb,
        Err(e) => unreachable!("built-in knowledge table is invalid: {e}"),
    }
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_keeps_declaration_order() {
        let keys: Vec<&str> = KnowledgeBase::standard()
            .entries()
            .iter()
            .map(|e| e.key.as_str())
            .collect();
        assert_eq!(keys.first(), Some(&"fever"));
        assert_eq!(keys[1], "headache");
        assert_eq!(keys.last(), Some(&"asthma"));
        assert_eq!(keys.len(), 13);
    }

    #[test]
    fn every_standard_variation_has_an_entry() {
        let kb = KnowledgeBase::standard();
        for variation in kb.variations() {
            assert!(kb.contains(&variation.symptom), "{}", variation.symptom);
        }
    }

    #[test]
    fn collect_takes_two_of_each_and_skips_unknown() {
        let kb = KnowledgeBase::standard();
        let findings = kb.collect(&["fever", "rash", "headache"]);

        assert_eq!(
            findings.conditions,
            vec!["Common cold", "Flu", "Tension headache", "Migraine"]
        );
        assert_eq!(
            findings.medications,
            vec!["Acetaminophen", "Ibuprofen", "Acetaminophen", "Ibuprofen"]
        );
        assert_eq!(findings.advice.len(), 2);
    }

    #[test]
    fn new_rejects_duplicate_keys() {
        let entry = SymptomEntry {
            key: "Fever".into(),
            conditions: vec![],
            medications: vec![],
            advice: "rest".into(),
        };
        let mut dup = entry.clone();
        dup.key = " fever ".into();

        let err = KnowledgeBase::new(vec![entry, dup], vec![]).unwrap_err();
        assert!(matches!(err, HealthBotError::InvalidInput(msg) if msg.contains("duplicate")));
    }

    #[test]
    fn new_rejects_empty_key() {
        let entry = SymptomEntry {
            key: "  ".into(),
            conditions: vec![],
            medications: vec![],
            advice: String::new(),
        };
        assert!(KnowledgeBase::new(vec![entry], vec![]).is_err());
    }

    #[test]
    fn from_yaml_str_loads_entries_and_variations() {
        let yaml = r#"
symptoms:
  - key: Rash
    conditions: [Eczema, Contact dermatitis, Hives]
    medications: [Hydrocortisone cream]
    advice: Keep the area clean and dry
variations:
  - symptom: rash
    phrases: [Itchy skin, red spots]
"#;
        let kb = KnowledgeBase::from_yaml_str(yaml).expect("valid yaml");
        assert!(kb.contains("rash"));
        assert_eq!(kb.variations()[0].phrases, vec!["itchy skin", "red spots"]);
        assert_eq!(kb.entry("rash").unwrap().medications.len(), 1);
    }

    #[test]
    fn from_yaml_str_reports_parse_errors() {
        let err = KnowledgeBase::from_yaml_str("symptoms: 12").unwrap_err();
        assert!(matches!(err, HealthBotError::YamlDeserialization(_)));
    }
}
