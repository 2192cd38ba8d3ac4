//! # HealthBot Core
//!
//! Core business logic for the HealthBot symptom assistant.
//!
//! This crate contains pure data operations and file/folder management:
//! - The rule-based symptom engine (detection, analysis, replies, follow-up questions)
//! - User accounts, consultations and chat sessions with sharded JSON storage
//! - Pricing plans, the free consultation allowance, subscription checks and the payment ledger
//!
//! **No API concerns**: Authentication, HTTP/gRPC servers, or service interfaces belong in
//! `api-grpc`, `api-rest`, or `api-shared`.

pub mod account;
pub mod billing;
pub mod chat;
pub mod config;
pub mod constants;
pub mod consultation;
pub mod engine;
mod error;
pub mod payment;
pub mod service;
pub mod store;
pub mod validation;

pub use config::CoreConfig;
pub use engine::SymptomEngine;
pub use error::{HealthBotError, HealthBotResult};
pub use service::HealthBotService;

pub use healthbot_types::{EmailAddress, NonEmptyText, TextError};
pub use healthbot_uuid::{RecordId, TimestampId};
