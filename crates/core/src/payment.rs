//! Payment ledger.
//!
//! A [`Payment`] is written once the payment provider has confirmed a charge, either for a
//! single pending consultation or for a pricing plan. Records are never edited afterwards.

use crate::billing::PricingPlan;
use crate::consultation::Consultation;
use crate::{HealthBotError, HealthBotResult};
use chrono::{DateTime, Utc};
use healthbot_uuid::{RecordId, TimestampId};
use serde::{Deserialize, Serialize};

/// Longest transaction reference accepted from a payment provider.
const MAX_TRANSACTION_ID_LEN: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Consultation,
    Subscription,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Consultation => "consultation",
            PaymentType::Subscription => "subscription",
        }
    }
}

/// Ledger state of a payment. Only confirmed charges are recorded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentState {
    #[default]
    Completed,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Completed => "completed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: TimestampId,
    pub user_id: RecordId,
    /// Minor currency units.
    pub amount: u64,
    pub currency: String,
    pub payment_type: PaymentType,
    #[serde(default)]
    pub status: PaymentState,
    pub transaction_id: String,
    #[serde(default)]
    pub consultation_id: Option<TimestampId>,
    #[serde(default)]
    pub plan_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl Payment {
    /// A confirmed charge for one pending consultation.
    pub fn for_consultation(
        consultation: &Consultation,
        amount: u64,
        currency: &str,
        transaction_id: String,
        now: DateTime<Utc>,
        last: Option<&TimestampId>,
    ) -> Self {
        Self {
            id: TimestampId::generate_at(now, last),
            user_id: consultation.user_id,
            amount,
            currency: currency.to_owned(),
            payment_type: PaymentType::Consultation,
            status: PaymentState::Completed,
            transaction_id,
            consultation_id: Some(consultation.id.clone()),
            plan_id: None,
            created_at: now,
            completed_at: now,
        }
    }

    /// A confirmed plan purchase.
    pub fn for_plan(
        user_id: RecordId,
        plan: &PricingPlan,
        transaction_id: String,
        now: DateTime<Utc>,
        last: Option<&TimestampId>,
    ) -> Self {
        Self {
            id: TimestampId::generate_at(now, last),
            user_id,
            amount: plan.price,
            currency: plan.currency.clone(),
            payment_type: PaymentType::Subscription,
            status: PaymentState::Completed,
            transaction_id,
            consultation_id: None,
            plan_id: Some(plan.id.clone()),
            created_at: now,
            completed_at: now,
        }
    }
}

/// Checks a provider reference, or issues a local `txn_` reference when none was given.
pub(crate) fn transaction_id_or_new(transaction_id: Option<&str>) -> HealthBotResult<String> {
    let Some(raw) = transaction_id.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(format!("txn_{}", RecordId::new()));
    };
    if raw.len() > MAX_TRANSACTION_ID_LEN
        || !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(HealthBotError::InvalidInput(format!(
            "invalid transaction id: '{}'",
            raw
        )));
    }
    Ok(raw.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::find_plan;

    #[test]
    fn plan_payments_carry_the_plan_price() {
        let plan = find_plan("yearly_premium").unwrap();
        let now = Utc::now();
        let payment = Payment::for_plan(RecordId::new(), plan, "pi_123".into(), now, None);
        assert_eq!(payment.amount, 29999);
        assert_eq!(payment.currency, "USD");
        assert_eq!(payment.payment_type, PaymentType::Subscription);
        assert_eq!(payment.plan_id.as_deref(), Some("yearly_premium"));
        assert_eq!(payment.consultation_id, None);
        assert_eq!(payment.completed_at, now);
    }

    #[test]
    fn ledger_values_use_lowercase_names() {
        assert_eq!(
            serde_json::to_string(&PaymentType::Consultation).unwrap(),
            "\"consultation\""
        );
        assert_eq!(PaymentState::default().as_str(), "completed");
    }

    #[test]
    fn transaction_ids_are_checked_or_issued() {
        let issued = transaction_id_or_new(None).unwrap();
        assert!(issued.starts_with("txn_"));
        assert_eq!(issued.len(), 4 + 32);
        assert_eq!(transaction_id_or_new(Some("   ")).unwrap().len(), 36);

        assert_eq!(transaction_id_or_new(Some(" pi_3Mx-1.a ")).unwrap(), "pi_3Mx-1.a");
        assert!(matches!(
            transaction_id_or_new(Some("../escape")),
            Err(HealthBotError::InvalidInput(_))
        ));
        assert!(transaction_id_or_new(Some(&"a".repeat(101))).is_err());
    }
}
