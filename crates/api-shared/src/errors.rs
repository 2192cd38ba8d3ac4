//! Transport-neutral classification of core errors.
//!
//! Both servers map [`HealthBotError`] through [`classify`] so the REST status codes and the
//! gRPC codes always agree. Only client-caused kinds carry their message out; everything else
//! is logged by the caller and reported as an opaque internal error.

use healthbot_core::HealthBotError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Forbidden,
    PaymentRequired,
    Conflict,
    /// The target exists but no longer accepts writes, e.g. a closed chat session.
    Closed,
    Internal,
}

pub fn classify(err: &HealthBotError) -> ErrorKind {
    match err {
        HealthBotError::InvalidInput(_) | HealthBotError::Uuid(_) | HealthBotError::Text(_) => {
            ErrorKind::InvalidInput
        }
        HealthBotError::NotFound(_) => ErrorKind::NotFound,
        HealthBotError::Forbidden(_) => ErrorKind::Forbidden,
        HealthBotError::PaymentRequired(_) => ErrorKind::PaymentRequired,
        HealthBotError::Conflict(_) => ErrorKind::Conflict,
        HealthBotError::SessionClosed(_) => ErrorKind::Closed,
        HealthBotError::StorageDirCreation(_)
        | HealthBotError::FileWrite(_)
        | HealthBotError::FileRead(_)
        | HealthBotError::Serialization(_)
        | HealthBotError::Deserialization(_)
        | HealthBotError::YamlDeserialization(_)
        | HealthBotError::LockPoisoned => ErrorKind::Internal,
    }
}

/// Maps a core error onto a gRPC status.
///
/// Internal failures are logged here with their detail; the caller only sees `context`.
pub fn to_status(err: HealthBotError, context: &str) -> tonic::Status {
    match classify(&err) {
        ErrorKind::InvalidInput => tonic::Status::invalid_argument(err.to_string()),
        ErrorKind::NotFound => tonic::Status::not_found(err.to_string()),
        ErrorKind::Forbidden => tonic::Status::permission_denied(err.to_string()),
        ErrorKind::PaymentRequired => tonic::Status::failed_precondition(err.to_string()),
        ErrorKind::Conflict => tonic::Status::already_exists(err.to_string()),
        ErrorKind::Closed => tonic::Status::failed_precondition(err.to_string()),
        ErrorKind::Internal => {
            tracing::error!("{}: {:?}", context, err);
            tonic::Status::internal(context.to_owned())
        }
    }
}
