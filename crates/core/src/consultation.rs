//! Consultation records submitted through the symptom checklist.

use crate::account::{parse_optional_gender, Entitlement, Gender};
use crate::billing::ConsultationCost;
use crate::engine::{canonical_symptom_id, ConsultationAnalysis};
use crate::validation::validate_age;
use crate::{HealthBotError, HealthBotResult};
use chrono::{DateTime, Utc};
use healthbot_uuid::{RecordId, TimestampId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
        }
    }
}

impl FromStr for Severity {
    type Err = HealthBotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mild" => Ok(Severity::Mild),
            "moderate" => Ok(Severity::Moderate),
            "severe" => Ok(Severity::Severe),
            other => Err(HealthBotError::InvalidInput(format!(
                "unknown severity: '{}'",
                other
            ))),
        }
    }
}

/// How long the symptoms have lasted, as offered on the checklist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymptomDuration {
    #[serde(rename = "less_than_day")]
    LessThanDay,
    #[serde(rename = "1_3_days")]
    OneToThreeDays,
    #[serde(rename = "4_7_days")]
    FourToSevenDays,
    #[serde(rename = "1_2_weeks")]
    OneToTwoWeeks,
    #[serde(rename = "2_4_weeks")]
    TwoToFourWeeks,
    #[serde(rename = "more_than_month")]
    MoreThanMonth,
}

impl SymptomDuration {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymptomDuration::LessThanDay => "less_than_day",
            SymptomDuration::OneToThreeDays => "1_3_days",
            SymptomDuration::FourToSevenDays => "4_7_days",
            SymptomDuration::OneToTwoWeeks => "1_2_weeks",
            SymptomDuration::TwoToFourWeeks => "2_4_weeks",
            SymptomDuration::MoreThanMonth => "more_than_month",
        }
    }
}

impl FromStr for SymptomDuration {
    type Err = HealthBotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "less_than_day" => Ok(SymptomDuration::LessThanDay),
            "1_3_days" => Ok(SymptomDuration::OneToThreeDays),
            "4_7_days" => Ok(SymptomDuration::FourToSevenDays),
            "1_2_weeks" => Ok(SymptomDuration::OneToTwoWeeks),
            "2_4_weeks" => Ok(SymptomDuration::TwoToFourWeeks),
            "more_than_month" => Ok(SymptomDuration::MoreThanMonth),
            other => Err(HealthBotError::InvalidInput(format!(
                "unknown duration: '{}'",
                other
            ))),
        }
    }
}

/// Symptoms that make a consultation urgent whatever the reported severity.
const HIGH_URGENCY_SYMPTOMS: &[&str] = &[
    "chest pain",
    "shortness of breath",
    "difficulty breathing",
    "severe abdominal pain",
    "confusion",
    "severe headache",
];

const MEDIUM_URGENCY_SYMPTOMS: &[&str] = &["fever", "persistent vomiting", "severe pain", "dizziness"];

/// How soon the user should seek care. Triage only; it never feeds the analysis confidence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    Low,
    Medium,
    High,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
        }
    }

    /// Red-flag symptoms win, then the reported severity, then the medium-urgency symptoms.
    ///
    /// `symptoms` are canonical ids as produced by form validation.
    pub fn assess(symptoms: &[String], severity: Severity) -> Self {
        let any_of = |list: &[&str]| symptoms.iter().any(|s| list.contains(&s.as_str()));

        if any_of(HIGH_URGENCY_SYMPTOMS) {
            return Urgency::High;
        }
        match severity {
            Severity::Severe => Urgency::High,
            Severity::Moderate => Urgency::Medium,
            Severity::Mild if any_of(MEDIUM_URGENCY_SYMPTOMS) => Urgency::Medium,
            Severity::Mild => Urgency::Low,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Free,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Free => "free",
        }
    }

    /// Status a new consultation starts in for a given entitlement.
    pub fn for_entitlement(entitlement: Entitlement) -> Self {
        match entitlement {
            Entitlement::FreeAllowance => PaymentStatus::Free,
            Entitlement::Subscription => PaymentStatus::Paid,
            Entitlement::PaymentRequired => PaymentStatus::Pending,
        }
    }
}

/// Raw checklist submission.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultationForm {
    pub symptoms: Vec<String>,
    pub severity: String,
    pub duration: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub additional_info: Option<String>,
}

/// A checklist submission that passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ValidForm {
    pub symptoms: Vec<String>,
    pub severity: Severity,
    pub duration: SymptomDuration,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub additional_info: Option<String>,
}

impl ConsultationForm {
    /// Checks the form; symptom ids are canonicalised and blank ones dropped.
    pub(crate) fn validate(self) -> HealthBotResult<ValidForm> {
        let symptoms: Vec<String> = self
            .symptoms
            .iter()
            .map(|s| canonical_symptom_id(s))
            .filter(|s| !s.is_empty())
            .collect();
        if symptoms.is_empty() {
            return Err(HealthBotError::InvalidInput(
                "Please select at least one symptom".into(),
            ));
        }

        let gender = match self.gender.as_deref() {
            Some(g) => parse_optional_gender(g)?,
            None => None,
        };

        Ok(ValidForm {
            symptoms,
            severity: self.severity.parse()?,
            duration: self.duration.parse()?,
            age: self.age.map(validate_age).transpose()?,
            gender,
            additional_info: self
                .additional_info
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consultation {
    pub id: TimestampId,
    pub user_id: RecordId,
    pub symptoms: Vec<String>,
    pub severity: Severity,
    pub duration: SymptomDuration,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub additional_info: Option<String>,
    #[serde(default)]
    pub analysis: Option<ConsultationAnalysis>,
    pub created_at: DateTime<Utc>,
    pub payment_required: bool,
    pub payment_status: PaymentStatus,
}

impl Consultation {
    pub fn is_unlocked(&self) -> bool {
        self.payment_status != PaymentStatus::Pending
    }

    /// The record as callers may see it: the analysis is withheld until payment.
    pub fn redacted(mut self) -> Self {
        if !self.is_unlocked() {
            self.analysis = None;
        }
        self
    }
}

/// One page of consultation history, newest first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultationPage {
    pub consultations: Vec<Consultation>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
}

impl ConsultationPage {
    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.per_page.max(1))
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }
}

/// Summary shown on a user's landing page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    pub recent_consultations: Vec<Consultation>,
    pub total_consultations: usize,
    pub cost: ConsultationCost,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ConfidenceLevel, ANALYSIS_WARNING};

    fn form() -> ConsultationForm {
        ConsultationForm {
            symptoms: vec!["fever".into(), "sore_throat".into(), "  ".into()],
            severity: "moderate".into(),
            duration: "1_3_days".into(),
            age: None,
            gender: None,
            additional_info: Some("   ".into()),
        }
    }

    #[test]
    fn validate_canonicalises_symptoms() {
        let valid = form().validate().unwrap();
        assert_eq!(valid.symptoms, vec!["fever", "sore throat"]);
        assert_eq!(valid.severity, Severity::Moderate);
        assert_eq!(valid.duration, SymptomDuration::OneToThreeDays);
        assert_eq!(valid.additional_info, None);
    }

    #[test]
    fn validate_requires_a_symptom() {
        let mut f = form();
        f.symptoms = vec![" ".into()];
        let err = f.validate().unwrap_err();
        assert!(matches!(err, HealthBotError::InvalidInput(msg) if msg.contains("at least one")));
    }

    #[test]
    fn validate_rejects_unknown_choices() {
        let mut f = form();
        f.severity = "unbearable".into();
        assert!(f.validate().is_err());

        let mut f = form();
        f.duration = "forever".into();
        assert!(f.validate().is_err());

        let mut f = form();
        f.age = Some(130);
        assert!(f.validate().is_err());
    }

    #[test]
    fn duration_uses_checklist_codes_on_the_wire() {
        let json = serde_json::to_string(&SymptomDuration::TwoToFourWeeks).unwrap();
        assert_eq!(json, "\"2_4_weeks\"");
        assert_eq!(
            "more_than_month".parse::<SymptomDuration>().unwrap(),
            SymptomDuration::MoreThanMonth
        );
    }

    #[test]
    fn pending_consultations_hide_their_analysis() {
        let now = Utc::now();
        let consultation = Consultation {
            id: TimestampId::generate(None),
            user_id: RecordId::new(),
            symptoms: vec!["fever".into()],
            severity: Severity::Mild,
            duration: SymptomDuration::LessThanDay,
            urgency: Urgency::Medium,
            age: None,
            gender: None,
            additional_info: None,
            analysis: Some(ConsultationAnalysis {
                conditions: vec!["Flu".into()],
                medications: vec![],
                advice: vec![],
                warnings: vec![ANALYSIS_WARNING.into()],
                confidence_level: ConfidenceLevel::Low,
                timestamp: now,
            }),
            created_at: now,
            payment_required: true,
            payment_status: PaymentStatus::Pending,
        };

        assert!(consultation.clone().redacted().analysis.is_none());

        let mut paid = consultation;
        paid.payment_status = PaymentStatus::Paid;
        assert!(paid.redacted().analysis.is_some());
    }

    fn ids(symptoms: &[&str]) -> Vec<String> {
        symptoms.iter().map(|s| canonical_symptom_id(s)).collect()
    }

    #[test]
    fn red_flag_symptoms_are_urgent_even_when_mild() {
        assert_eq!(Urgency::assess(&ids(&["chest_pain"]), Severity::Mild), Urgency::High);
        assert_eq!(
            Urgency::assess(&ids(&["cough", "difficulty breathing"]), Severity::Mild),
            Urgency::High
        );
    }

    #[test]
    fn severity_sets_urgency_without_red_flags() {
        assert_eq!(Urgency::assess(&ids(&["cough"]), Severity::Severe), Urgency::High);
        assert_eq!(Urgency::assess(&ids(&["cough"]), Severity::Moderate), Urgency::Medium);
    }

    #[test]
    fn mild_urgency_depends_on_the_symptoms() {
        assert_eq!(Urgency::assess(&ids(&["fever"]), Severity::Mild), Urgency::Medium);
        assert_eq!(Urgency::assess(&ids(&["dizziness"]), Severity::Mild), Urgency::Medium);
        assert_eq!(Urgency::assess(&ids(&["cough"]), Severity::Mild), Urgency::Low);
    }

    #[test]
    fn records_without_urgency_read_as_low() {
        let json = serde_json::json!({
            "id": TimestampId::generate(None).to_string(),
            "user_id": RecordId::new().to_string(),
            "symptoms": ["cough"],
            "severity": "mild",
            "duration": "1_3_days",
            "created_at": Utc::now(),
            "payment_required": false,
            "payment_status": "free"
        });
        let consultation: Consultation = serde_json::from_value(json).unwrap();
        assert_eq!(consultation.urgency, Urgency::Low);
    }

    #[test]
    fn page_arithmetic() {
        let page = ConsultationPage {
            consultations: vec![],
            page: 2,
            per_page: 10,
            total: 21,
        };
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());
    }
}
