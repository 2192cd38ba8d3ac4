//! User accounts and consultation entitlement.

use crate::validation::{validate_age, validate_name};
use crate::{HealthBotError, HealthBotResult};
use chrono::{DateTime, Utc};
use healthbot_types::{EmailAddress, NonEmptyText};
use healthbot_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
    PreferNotToSay,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
            Gender::PreferNotToSay => "prefer_not_to_say",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = HealthBotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            "prefer_not_to_say" => Ok(Gender::PreferNotToSay),
            other => Err(HealthBotError::InvalidInput(format!(
                "unknown gender: '{}'",
                other
            ))),
        }
    }
}

/// Parses an optional gender field where blank means "not given".
pub fn parse_optional_gender(value: &str) -> HealthBotResult<Option<Gender>> {
    if value.trim().is_empty() {
        Ok(None)
    } else {
        value.parse().map(Some)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    #[default]
    Free,
    Premium,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Free => "free",
            SubscriptionStatus::Premium => "premium",
        }
    }
}

/// How the next consultation would be paid for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entitlement {
    /// The account still has free consultations left.
    FreeAllowance,
    /// An unexpired premium subscription covers it.
    Subscription,
    /// Neither applies.
    PaymentRequired,
}

impl Entitlement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Entitlement::FreeAllowance => "free_allowance",
            Entitlement::Subscription => "subscription",
            Entitlement::PaymentRequired => "payment_required",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: RecordId,
    pub email: EmailAddress,
    pub first_name: NonEmptyText,
    pub last_name: NonEmptyText,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<Gender>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub free_consultations_used: u32,
    #[serde(default)]
    pub subscription_status: SubscriptionStatus,
    #[serde(default)]
    pub subscription_expires: Option<DateTime<Utc>>,
}

impl UserAccount {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// True while fewer than `allowance` free consultations have been used.
    pub fn can_use_free_consultation(&self, allowance: u32) -> bool {
        self.free_consultations_used < allowance
    }

    /// True for a premium account whose expiry lies strictly after `now`.
    pub fn has_active_subscription(&self, now: DateTime<Utc>) -> bool {
        self.subscription_status == SubscriptionStatus::Premium
            && self.subscription_expires.is_some_and(|expires| expires > now)
    }

    pub fn needs_payment(&self, allowance: u32, now: DateTime<Utc>) -> bool {
        self.entitlement(allowance, now) == Entitlement::PaymentRequired
    }

    /// The free allowance is spent before a subscription is relied on.
    pub fn entitlement(&self, allowance: u32, now: DateTime<Utc>) -> Entitlement {
        if self.can_use_free_consultation(allowance) {
            Entitlement::FreeAllowance
        } else if self.has_active_subscription(now) {
            Entitlement::Subscription
        } else {
            Entitlement::PaymentRequired
        }
    }
}

/// Registration details for a new account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
}

impl NewUser {
    /// Validates the registration and builds the account record.
    pub(crate) fn into_account(self, now: DateTime<Utc>) -> HealthBotResult<UserAccount> {
        let email = EmailAddress::parse(&self.email)
            .map_err(|e| HealthBotError::InvalidInput(format!("email: {}", e)))?;
        let first_name = validate_name("first_name", &self.first_name)?;
        let last_name = validate_name("last_name", &self.last_name)?;
        let age = self.age.map(validate_age).transpose()?;
        let gender = match self.gender.as_deref() {
            Some(g) => parse_optional_gender(g)?,
            None => None,
        };

        Ok(UserAccount {
            id: RecordId::new(),
            email,
            first_name,
            last_name,
            age,
            gender,
            created_at: now,
            free_consultations_used: 0,
            subscription_status: SubscriptionStatus::Free,
            subscription_expires: None,
        })
    }
}

/// Partial profile update; `None` leaves a field unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
}

impl ProfileUpdate {
    /// Validates every supplied field before touching `account`.
    pub(crate) fn apply(self, account: &mut UserAccount) -> HealthBotResult<()> {
        let first_name = self
            .first_name
            .map(|v| validate_name("first_name", &v))
            .transpose()?;
        let last_name = self
            .last_name
            .map(|v| validate_name("last_name", &v))
            .transpose()?;
        let age = self.age.map(validate_age).transpose()?;
        let gender = self
            .gender
            .map(|g| parse_optional_gender(&g))
            .transpose()?;

        if let Some(first_name) = first_name {
            account.first_name = first_name;
        }
        if let Some(last_name) = last_name {
            account.last_name = last_name;
        }
        if let Some(age) = age {
            account.age = Some(age);
        }
        if let Some(gender) = gender {
            account.gender = gender;
        }
        Ok(())
    }
}
