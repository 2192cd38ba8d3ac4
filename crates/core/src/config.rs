//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services, so
//! request handling never reads process-wide environment variables. Every binary resolves it
//! through [`service_from_env`], so the variable names below are the only ones read.

use crate::constants::{
    DEFAULT_CONSULTATION_PRICE, DEFAULT_CURRENCY, DEFAULT_DATA_DIR, DEFAULT_FREE_CONSULTATIONS,
    USERS_DIR_NAME,
};
use crate::engine::{KnowledgeBase, SymptomEngine, Vocabulary};
use crate::{HealthBotError, HealthBotResult, HealthBotService};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

pub const DATA_DIR_ENV: &str = "HEALTHBOT_DATA_DIR";
pub const FREE_CONSULTATIONS_ENV: &str = "HEALTHBOT_FREE_CONSULTATIONS";
pub const CONSULTATION_PRICE_ENV: &str = "HEALTHBOT_CONSULTATION_PRICE";
/// Optional YAML file replacing the built-in symptom table.
pub const KNOWLEDGE_FILE_ENV: &str = "HEALTHBOT_KNOWLEDGE_FILE";

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    free_consultation_allowance: u32,
    consultation_price: u64,
    currency: String,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// `consultation_price` is in minor units of `currency`, which must be a three-letter code.
    pub fn new(
        data_dir: PathBuf,
        free_consultation_allowance: u32,
        consultation_price: u64,
        currency: &str,
    ) -> HealthBotResult<Self> {
        let currency = currency.trim().to_uppercase();
        if currency.len() != 3 || !currency.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(HealthBotError::InvalidInput(format!(
                "currency must be a three-letter code, got '{}'",
                currency
            )));
        }

        Ok(Self {
            data_dir,
            free_consultation_allowance,
            consultation_price,
            currency,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn users_dir(&self) -> PathBuf {
        self.data_dir.join(USERS_DIR_NAME)
    }

    pub fn free_consultation_allowance(&self) -> u32 {
        self.free_consultation_allowance
    }

    pub fn consultation_price(&self) -> u64 {
        self.consultation_price
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }
}

/// Build a [`CoreConfig`] from raw environment values.
///
/// Missing or blank values take their defaults: `healthbot_data`, one free consultation and a
/// price of 999 USD minor units.
///
/// # Errors
///
/// Returns [`HealthBotError::InvalidInput`] if a numeric value does not parse.
pub fn core_config_from_env_values(
    data_dir: Option<String>,
    free_consultations: Option<String>,
    consultation_price: Option<String>,
) -> HealthBotResult<CoreConfig> {
    let data_dir = non_blank(data_dir).unwrap_or_else(|| DEFAULT_DATA_DIR.to_owned());
    let free = number_from_env_value(
        FREE_CONSULTATIONS_ENV,
        free_consultations,
        DEFAULT_FREE_CONSULTATIONS,
    )?;
    let price = number_from_env_value(
        CONSULTATION_PRICE_ENV,
        consultation_price,
        DEFAULT_CONSULTATION_PRICE,
    )?;

    CoreConfig::new(PathBuf::from(data_dir), free, price, DEFAULT_CURRENCY)
}

/// Load the symptom knowledge table.
///
/// With no path the built-in table is used; otherwise the YAML file at `path` replaces it.
pub fn knowledge_from_env_value(path: Option<String>) -> HealthBotResult<KnowledgeBase> {
    match non_blank(path) {
        None => Ok(KnowledgeBase::standard().clone()),
        Some(path) => {
            let kb = KnowledgeBase::from_yaml_file(Path::new(&path))?;
            tracing::info!(
                "loaded {} knowledge entries from {}",
                kb.entries().len(),
                path
            );
            Ok(kb)
        }
    }
}

/// Builds the shared [`HealthBotService`] from process environment.
///
/// Binaries call this once at startup, after `dotenvy::dotenv()`.
pub fn service_from_env() -> HealthBotResult<HealthBotService> {
    service_from_lookup(|name| std::env::var(name).ok())
}

fn service_from_lookup(
    lookup: impl Fn(&str) -> Option<String>,
) -> HealthBotResult<HealthBotService> {
    let cfg = core_config_from_env_values(
        lookup(DATA_DIR_ENV),
        lookup(FREE_CONSULTATIONS_ENV),
        lookup(CONSULTATION_PRICE_ENV),
    )?;
    let knowledge = knowledge_from_env_value(lookup(KNOWLEDGE_FILE_ENV))?;

    tracing::info!("data directory: {}", cfg.data_dir().display());
    let engine = SymptomEngine::new(knowledge, Vocabulary::default());
    Ok(HealthBotService::new(Arc::new(cfg), engine))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn number_from_env_value<T>(name: &str, value: Option<String>, default: T) -> HealthBotResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_blank(value) {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|e| {
            HealthBotError::InvalidInput(format!(
                "{} must be a whole number ('{}'): {}",
                name, raw, e
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_values_are_missing_or_blank() {
        let cfg = core_config_from_env_values(None, Some("  ".into()), None).unwrap();
        assert_eq!(cfg.data_dir(), Path::new(DEFAULT_DATA_DIR));
        assert_eq!(cfg.users_dir(), Path::new(DEFAULT_DATA_DIR).join(USERS_DIR_NAME));
        assert_eq!(cfg.free_consultation_allowance(), 1);
        assert_eq!(cfg.consultation_price(), 999);
        assert_eq!(cfg.currency(), "USD");
    }

    #[test]
    fn explicit_values_override_defaults() {
        let cfg = core_config_from_env_values(
            Some("/tmp/hb".into()),
            Some("3".into()),
            Some("1500".into()),
        )
        .unwrap();
        assert_eq!(cfg.data_dir(), Path::new("/tmp/hb"));
        assert_eq!(cfg.free_consultation_allowance(), 3);
        assert_eq!(cfg.consultation_price(), 1500);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = core_config_from_env_values(None, Some("one".into()), None).unwrap_err();
        assert!(
            matches!(err, HealthBotError::InvalidInput(msg) if msg.contains(FREE_CONSULTATIONS_ENV))
        );
        assert!(core_config_from_env_values(None, None, Some("-5".into())).is_err());
    }

    #[test]
    fn service_reads_the_healthbot_variables() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let data_dir = dir.path().display().to_string();
        let service = service_from_lookup(|name| match name {
            DATA_DIR_ENV => Some(data_dir.clone()),
            FREE_CONSULTATIONS_ENV => Some("2".into()),
            CONSULTATION_PRICE_ENV => Some("450".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(service.config().data_dir(), dir.path());
        assert_eq!(service.config().free_consultation_allowance(), 2);
        assert_eq!(service.config().consultation_price(), 450);
        assert!(service.engine().knowledge().contains("fever"));

        let err = service_from_lookup(|name| {
            (name == KNOWLEDGE_FILE_ENV).then(|| "/definitely/not/here.yaml".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, HealthBotError::FileRead(_)));
    }

    #[test]
    fn currency_must_be_three_letters() {
        assert!(CoreConfig::new(PathBuf::from("x"), 1, 999, "usd").is_ok());
        assert!(CoreConfig::new(PathBuf::from("x"), 1, 999, "dollars").is_err());
    }

    #[test]
    fn knowledge_defaults_to_standard_table() {
        let kb = knowledge_from_env_value(None).unwrap();
        assert_eq!(kb.entries().len(), KnowledgeBase::standard().entries().len());
    }

    #[test]
    fn knowledge_loads_from_yaml_file() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("knowledge.yaml");
        std::fs::write(
            &path,
            "symptoms:\n  - key: rash\n    conditions: [Eczema]\n    medications: [Emollient]\n    advice: Keep skin moisturised\n",
        )
        .unwrap();

        let kb = knowledge_from_env_value(Some(path.display().to_string())).unwrap();
        assert!(kb.contains("rash"));
        assert!(!kb.contains("fever"));
    }

    #[test]
    fn missing_knowledge_file_is_a_read_error() {
        let err = knowledge_from_env_value(Some("/definitely/not/here.yaml".into())).unwrap_err();
        assert!(matches!(err, HealthBotError::FileRead(_)));
    }
}
