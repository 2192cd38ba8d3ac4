//! Constants used throughout the HealthBot core crate.
//!
//! Storage layout names live here so the record store and its tests agree on them.

/// Default directory for record storage when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "healthbot_data";

/// Directory name for user account storage.
pub const USERS_DIR_NAME: &str = "users";

/// Filename for the account record inside a user directory.
pub const USER_JSON_FILENAME: &str = "user.json";

/// Directory name for consultation records inside a user directory.
pub const CONSULTATIONS_DIR_NAME: &str = "consultations";

/// Directory name for chat sessions inside a user directory.
pub const SESSIONS_DIR_NAME: &str = "sessions";

/// Filename for the session record inside a session directory.
pub const SESSION_JSON_FILENAME: &str = "session.json";

/// Directory name for chat messages inside a session directory.
pub const MESSAGES_DIR_NAME: &str = "messages";

/// Directory name for payment records inside a user directory.
pub const PAYMENTS_DIR_NAME: &str = "payments";

/// Extension used for every stored record.
pub const RECORD_EXTENSION: &str = "json";

/// Free consultations granted to each new account.
pub const DEFAULT_FREE_CONSULTATIONS: u32 = 1;

/// Price of a single consultation in minor currency units.
pub const DEFAULT_CONSULTATION_PRICE: u64 = 999;

pub const DEFAULT_CURRENCY: &str = "USD";

/// Default page size for consultation history.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: usize = 100;

/// Consultations shown on the dashboard.
pub const DASHBOARD_RECENT_CONSULTATIONS: usize = 5;

pub const MIN_NAME_LEN: usize = 2;
pub const MAX_NAME_LEN: usize = 50;
pub const MIN_AGE: u32 = 1;
pub const MAX_AGE: u32 = 120;
