#[derive(Debug, thiserror::Error)]
pub enum HealthBotError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("payment required: {0}")]
    PaymentRequired(String),
    #[error("chat session {0} is closed")]
    SessionClosed(String),
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write record file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read record file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize record: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize record: {0}")]
    Deserialization(serde_json::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),

    #[error("invalid identifier: {0}")]
    Uuid(#[from] healthbot_uuid::UuidError),
    #[error("invalid text: {0}")]
    Text(#[from] healthbot_types::TextError),

    #[error("record store lock poisoned")]
    LockPoisoned,
}

pub type HealthBotResult<T> = std::result::Result<T, HealthBotError>;
