//! Pricing plans and consultation cost.
//!
//! Prices are held in minor currency units. Payment capture happens outside this crate; the
//! service only records its outcome.

use crate::account::{Entitlement, SubscriptionStatus, UserAccount};
use crate::config::CoreConfig;
use crate::constants::DEFAULT_CURRENCY;
use crate::{HealthBotError, HealthBotResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPlan {
    pub id: String,
    pub name: String,
    /// Minor currency units.
    pub price: u64,
    pub currency: String,
    pub consultations_limit: u32,
    pub duration_days: u32,
    pub features: Vec<String>,
    pub is_active: bool,
}

fn plan(
    id: &str,
    name: &str,
    price: u64,
    consultations_limit: u32,
    duration_days: u32,
    features: &[&str],
) -> PricingPlan {
    PricingPlan {
        id: id.to_owned(),
        name: name.to_owned(),
        price,
        currency: DEFAULT_CURRENCY.to_owned(),
        consultations_limit,
        duration_days,
        features: features.iter().map(|f| (*f).to_owned()).collect(),
        is_active: true,
    }
}

static DEFAULT_PLANS: LazyLock<Vec<PricingPlan>> = LazyLock::new(|| {
    vec![
        plan(
            "single_consultation",
            "Single Consultation",
            999,
            1,
            1,
            &["One symptom analysis", "Chat follow-up for 24 hours"],
        ),
        plan(
            "monthly_premium",
            "Monthly Premium",
            2999,
            10,
            30,
            &["Up to 10 consultations", "Unlimited chat", "Consultation history"],
        ),
        plan(
            "yearly_premium",
            "Yearly Premium",
            29999,
            120,
            365,
            &["Up to 120 consultations", "Unlimited chat", "Consultation history"],
        ),
    ]
});

/// The plans on offer, cheapest first.
pub fn pricing_plans() -> &'static [PricingPlan] {
    &DEFAULT_PLANS
}

/// Looks up an active plan by id.
pub fn find_plan(plan_id: &str) -> HealthBotResult<&'static PricingPlan> {
    pricing_plans()
        .iter()
        .find(|p| p.is_active && p.id == plan_id.trim())
        .ok_or_else(|| {
            HealthBotError::InvalidInput(format!("unknown pricing plan: '{}'", plan_id))
        })
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultationCost {
    /// Minor currency units; zero when covered.
    pub cost: u64,
    pub currency: String,
    pub payment_required: bool,
    pub entitlement: Entitlement,
    pub message: String,
}

/// What the next consultation would cost `account`.
pub fn consultation_cost(
    account: &UserAccount,
    cfg: &CoreConfig,
    now: DateTime<Utc>,
) -> ConsultationCost {
    let entitlement = account.entitlement(cfg.free_consultation_allowance(), now);
    let (cost, message) = match entitlement {
        Entitlement::FreeAllowance => (0, "Free consultation available"),
        Entitlement::Subscription => (0, "Covered by active subscription"),
        Entitlement::PaymentRequired => {
            (cfg.consultation_price(), "Payment required for consultation")
        }
    };

    ConsultationCost {
        cost,
        currency: cfg.currency().to_owned(),
        payment_required: entitlement == Entitlement::PaymentRequired,
        entitlement,
        message: message.to_owned(),
    }
}

/// Puts `account` on premium until `now` plus the plan's duration.
///
/// An unexpired subscription is replaced rather than extended.
pub(crate) fn apply_plan(account: &mut UserAccount, plan: &PricingPlan, now: DateTime<Utc>) {
    account.subscription_status = SubscriptionStatus::Premium;
    account.subscription_expires = Some(now + Duration::days(i64::from(plan.duration_days)));
}

/// Formats minor units for display, e.g. `999` → `9.99 USD`.
pub fn format_price(minor_units: u64, currency: &str) -> String {
    format!("{}.{:02} {}", minor_units / 100, minor_units % 100, currency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::NewUser;
    use std::path::PathBuf;

    fn cfg() -> CoreConfig {
        CoreConfig::new(PathBuf::from("unused"), 1, 999, "USD").unwrap()
    }

    fn account() -> UserAccount {
        NewUser {
            email: "sam@example.com".into(),
            first_name: "Sam".into(),
            last_name: "Jones".into(),
            ..Default::default()
        }
        .into_account(Utc::now())
        .unwrap()
    }

    #[test]
    fn default_plans_match_published_prices() {
        let ids: Vec<(&str, u64, u32, u32)> = pricing_plans()
            .iter()
            .map(|p| (p.id.as_str(), p.price, p.consultations_limit, p.duration_days))
            .collect();
        assert_eq!(
            ids,
            vec![
                ("single_consultation", 999, 1, 1),
                ("monthly_premium", 2999, 10, 30),
                ("yearly_premium", 29999, 120, 365),
            ]
        );
    }

    #[test]
    fn unknown_plan_is_invalid_input() {
        assert!(find_plan("monthly_premium").is_ok());
        assert!(matches!(
            find_plan("lifetime"),
            Err(HealthBotError::InvalidInput(_))
        ));
    }

    #[test]
    fn cost_follows_entitlement() {
        let now = Utc::now();
        let mut account = account();

        let cost = consultation_cost(&account, &cfg(), now);
        assert_eq!(cost.cost, 0);
        assert_eq!(cost.message, "Free consultation available");

        account.free_consultations_used = 1;
        let cost = consultation_cost(&account, &cfg(), now);
        assert_eq!(cost.cost, 999);
        assert!(cost.payment_required);
        assert_eq!(cost.message, "Payment required for consultation");

        apply_plan(&mut account, find_plan("monthly_premium").unwrap(), now);
        let cost = consultation_cost(&account, &cfg(), now);
        assert_eq!(cost.cost, 0);
        assert_eq!(cost.entitlement, Entitlement::Subscription);
        assert_eq!(cost.message, "Covered by active subscription");
    }

    #[test]
    fn plan_sets_expiry_from_duration() {
        let now = Utc::now();
        let mut account = account();
        apply_plan(&mut account, find_plan("yearly_premium").unwrap(), now);
        assert_eq!(account.subscription_expires, Some(now + Duration::days(365)));
        assert!(account.has_active_subscription(now + Duration::days(364)));
        assert!(!account.has_active_subscription(now + Duration::days(365)));
    }

    #[test]
    fn prices_format_with_two_decimals() {
        assert_eq!(format_price(999, "USD"), "9.99 USD");
        assert_eq!(format_price(29999, "USD"), "299.99 USD");
        assert_eq!(format_price(5, "EUR"), "0.05 EUR");
    }
}
