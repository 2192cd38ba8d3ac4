//! File-backed record store.
//!
//! Every record is a pretty-printed JSON file under the configured data directory:
//!
//! ```text
//! <data_dir>/users/<s1>/<s2>/<user_id>/user.json
//! <data_dir>/users/<s1>/<s2>/<user_id>/consultations/<timestamp_id>.json
//! <data_dir>/users/<s1>/<s2>/<user_id>/sessions/<session_id>/session.json
//! <data_dir>/users/<s1>/<s2>/<user_id>/sessions/<session_id>/messages/<timestamp_id>.json
//! <data_dir>/users/<s1>/<s2>/<user_id>/payments/<timestamp_id>.json
//! ```
//!
//! where `s1`/`s2` are the first four hex characters of the user id. Consultations, messages and
//! payments are named by [`TimestampId`], so sorting file names yields creation order.
//!
//! Writes go to a temporary sibling first and are renamed into place, so a reader never sees a
//! half-written record. The store does no locking of its own; read-modify-write sequences are
//! serialised by the service.

use crate::account::UserAccount;
use crate::chat::{ChatMessage, ChatSession};
use crate::config::CoreConfig;
use crate::constants::{
    CONSULTATIONS_DIR_NAME, MESSAGES_DIR_NAME, PAYMENTS_DIR_NAME, RECORD_EXTENSION,
    SESSIONS_DIR_NAME, SESSION_JSON_FILENAME, USER_JSON_FILENAME,
};
use crate::consultation::Consultation;
use crate::payment::Payment;
use crate::{HealthBotError, HealthBotResult};
use healthbot_uuid::{RecordId, TimestampId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

const MAX_ALLOCATION_ATTEMPTS: usize = 5;

#[derive(Clone, Debug)]
pub struct RecordStore {
    users_dir: PathBuf,
}

impl RecordStore {
    pub fn new(cfg: &CoreConfig) -> Self {
        Self {
            users_dir: cfg.users_dir(),
        }
    }

    pub fn users_dir(&self) -> &Path {
        &self.users_dir
    }

    fn user_dir(&self, user_id: &RecordId) -> PathBuf {
        user_id.sharded_dir(&self.users_dir)
    }

    fn consultations_dir(&self, user_id: &RecordId) -> PathBuf {
        self.user_dir(user_id).join(CONSULTATIONS_DIR_NAME)
    }

    fn session_dir(&self, user_id: &RecordId, session_id: &RecordId) -> PathBuf {
        self.user_dir(user_id)
            .join(SESSIONS_DIR_NAME)
            .join(session_id.to_string())
    }

    fn messages_dir(&self, user_id: &RecordId, session_id: &RecordId) -> PathBuf {
        self.session_dir(user_id, session_id).join(MESSAGES_DIR_NAME)
    }

    fn payments_dir(&self, user_id: &RecordId) -> PathBuf {
        self.user_dir(user_id).join(PAYMENTS_DIR_NAME)
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Stores a new account under a freshly allocated directory.
    ///
    /// The account id is replaced by the id of the allocated directory. A new id is drawn (up to
    /// five times) if the directory already exists. If writing the record fails the directory is
    /// removed again.
    pub fn create_user(&self, mut account: UserAccount) -> HealthBotResult<UserAccount> {
        let (id, dir) = allocate_sharded_dir(&self.users_dir, RecordId::new)?;
        account.id = id;

        if let Err(e) = write_json(&dir.join(USER_JSON_FILENAME), &account) {
            if let Err(cleanup) = fs::remove_dir_all(&dir) {
                tracing::warn!(
                    "failed to remove partially created user dir {}: {}",
                    dir.display(),
                    cleanup
                );
            }
            return Err(e);
        }

        Ok(account)
    }

    pub fn read_user(&self, user_id: &RecordId) -> HealthBotResult<UserAccount> {
        read_json(&self.user_dir(user_id).join(USER_JSON_FILENAME), || {
            format!("user {}", user_id)
        })
    }

    /// Overwrites an existing account record.
    pub fn write_user(&self, account: &UserAccount) -> HealthBotResult<()> {
        let dir = self.user_dir(&account.id);
        if !dir.is_dir() {
            return Err(HealthBotError::NotFound(format!("user {}", account.id)));
        }
        write_json(&dir.join(USER_JSON_FILENAME), account)
    }

    /// Lists every stored account.
    ///
    /// Traverses `<users_dir>/<s1>/<s2>/<id>/user.json`. Records that cannot be parsed are logged
    /// and skipped.
    pub fn list_users(&self) -> Vec<UserAccount> {
        let mut users = Vec::new();

        let s1_iter = match fs::read_dir(&self.users_dir) {
            Ok(it) => it,
            Err(_) => return users,
        };
        for s1 in s1_iter.flatten() {
            let s1_path = s1.path();
            if !s1_path.is_dir() {
                continue;
            }

            let s2_iter = match fs::read_dir(&s1_path) {
                Ok(it) => it,
                Err(_) => continue,
            };

            for s2 in s2_iter.flatten() {
                let s2_path = s2.path();
                if !s2_path.is_dir() {
                    continue;
                }

                let id_iter = match fs::read_dir(&s2_path) {
                    Ok(it) => it,
                    Err(_) => continue,
                };

                for id_ent in id_iter.flatten() {
                    let user_path = id_ent.path().join(USER_JSON_FILENAME);
                    if !user_path.is_file() {
                        continue;
                    }

                    match read_json::<UserAccount>(&user_path, || user_path.display().to_string())
                    {
                        Ok(account) => users.push(account),
                        Err(e) => {
                            tracing::warn!(
                                "failed to parse user.json: {} - {}",
                                user_path.display(),
                                e
                            );
                        }
                    }
                }
            }
        }

        users
    }

    // ------------------------------------------------------------------
    // Consultations
    // ------------------------------------------------------------------

    pub fn write_consultation(&self, consultation: &Consultation) -> HealthBotResult<()> {
        let dir = self.consultations_dir(&consultation.user_id);
        fs::create_dir_all(&dir).map_err(HealthBotError::StorageDirCreation)?;
        write_json(&record_path(&dir, &consultation.id), consultation)
    }

    pub fn read_consultation(
        &self,
        user_id: &RecordId,
        consultation_id: &TimestampId,
    ) -> HealthBotResult<Consultation> {
        let path = record_path(&self.consultations_dir(user_id), consultation_id);
        read_json(&path, || format!("consultation {}", consultation_id))
    }

    /// All consultations of a user, oldest first.
    pub fn list_consultations(&self, user_id: &RecordId) -> HealthBotResult<Vec<Consultation>> {
        list_json_dir(&self.consultations_dir(user_id))
    }

    /// Deletes a consultation record. A record that is already gone is not an error.
    pub fn remove_consultation(
        &self,
        user_id: &RecordId,
        consultation_id: &TimestampId,
    ) -> HealthBotResult<()> {
        remove_record(&record_path(&self.consultations_dir(user_id), consultation_id))
    }

    // ------------------------------------------------------------------
    // Payments
    // ------------------------------------------------------------------

    pub fn write_payment(&self, payment: &Payment) -> HealthBotResult<()> {
        let dir = self.payments_dir(&payment.user_id);
        fs::create_dir_all(&dir).map_err(HealthBotError::StorageDirCreation)?;
        write_json(&record_path(&dir, &payment.id), payment)
    }

    /// All payments of a user, oldest first.
    pub fn list_payments(&self, user_id: &RecordId) -> HealthBotResult<Vec<Payment>> {
        list_json_dir(&self.payments_dir(user_id))
    }

    pub fn remove_payment(&self, user_id: &RecordId, payment_id: &TimestampId) -> HealthBotResult<()> {
        remove_record(&record_path(&self.payments_dir(user_id), payment_id))
    }

    // ------------------------------------------------------------------
    // Chat
    // ------------------------------------------------------------------

    pub fn write_session(&self, session: &ChatSession) -> HealthBotResult<()> {
        let dir = self.session_dir(&session.user_id, &session.id);
        fs::create_dir_all(&dir).map_err(HealthBotError::StorageDirCreation)?;
        write_json(&dir.join(SESSION_JSON_FILENAME), session)
    }

    pub fn read_session(
        &self,
        user_id: &RecordId,
        session_id: &RecordId,
    ) -> HealthBotResult<ChatSession> {
        let path = self
            .session_dir(user_id, session_id)
            .join(SESSION_JSON_FILENAME);
        read_json(&path, || format!("chat session {}", session_id))
    }

    /// All sessions of a user, most recently active first.
    pub fn list_sessions(&self, user_id: &RecordId) -> HealthBotResult<Vec<ChatSession>> {
        let sessions_dir = self.user_dir(user_id).join(SESSIONS_DIR_NAME);
        let entries = match fs::read_dir(&sessions_dir) {
            Ok(it) => it,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(HealthBotError::FileRead(e)),
        };

        let mut sessions = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path().join(SESSION_JSON_FILENAME);
            if !path.is_file() {
                continue;
            }
            match read_json::<ChatSession>(&path, || path.display().to_string()) {
                Ok(session) => sessions.push(session),
                Err(e) => tracing::warn!("skipping session {}: {}", path.display(), e),
            }
        }

        sessions.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        Ok(sessions)
    }

    pub fn write_message(&self, user_id: &RecordId, message: &ChatMessage) -> HealthBotResult<()> {
        let dir = self.messages_dir(user_id, &message.session_id);
        fs::create_dir_all(&dir).map_err(HealthBotError::StorageDirCreation)?;
        write_json(&record_path(&dir, &message.id), message)
    }

    pub fn remove_message(&self, user_id: &RecordId, message: &ChatMessage) -> HealthBotResult<()> {
        remove_record(&record_path(
            &self.messages_dir(user_id, &message.session_id),
            &message.id,
        ))
    }

    /// Messages of a session in send order.
    pub fn list_messages(
        &self,
        user_id: &RecordId,
        session_id: &RecordId,
    ) -> HealthBotResult<Vec<ChatMessage>> {
        list_json_dir(&self.messages_dir(user_id, session_id))
    }
}

/// Creates a unique sharded directory under `base_dir`.
///
/// Guards against identifier collisions or directories left by external interference by
/// drawing a new identifier, up to five times.
fn allocate_sharded_dir(
    base_dir: &Path,
    mut id_source: impl FnMut() -> RecordId,
) -> HealthBotResult<(RecordId, PathBuf)> {
    for _attempt in 0..MAX_ALLOCATION_ATTEMPTS {
        let id = id_source();
        let candidate = id.sharded_dir(base_dir);

        if candidate.exists() {
            continue;
        }

        if let Some(parent) = candidate.parent() {
            fs::create_dir_all(parent).map_err(HealthBotError::StorageDirCreation)?;
        }

        match fs::create_dir(&candidate) {
            Ok(()) => return Ok((id, candidate)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(HealthBotError::StorageDirCreation(e)),
        }
    }

    Err(HealthBotError::StorageDirCreation(io::Error::new(
        ErrorKind::AlreadyExists,
        "failed to allocate a unique record directory after 5 attempts",
    )))
}

fn record_path(dir: &Path, id: &TimestampId) -> PathBuf {
    dir.join(format!("{}.{}", id, RECORD_EXTENSION))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> HealthBotResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(HealthBotError::Serialization)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json).map_err(HealthBotError::FileWrite)?;
    fs::rename(&tmp, path).map_err(HealthBotError::FileWrite)
}

fn remove_record(path: &Path) -> HealthBotResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(HealthBotError::FileWrite(e)),
    }
}

fn read_json<T: DeserializeOwned>(
    path: &Path,
    describe: impl FnOnce() -> String,
) -> HealthBotResult<T> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(HealthBotError::NotFound(describe()))
        }
        Err(e) => return Err(HealthBotError::FileRead(e)),
    };
    serde_json::from_str(&contents).map_err(HealthBotError::Deserialization)
}

/// Reads every `*.json` record in `dir`, ordered by file name.
///
/// A missing directory is an empty list. Unparseable records are logged and skipped.
fn list_json_dir<T: DeserializeOwned>(dir: &Path) -> HealthBotResult<Vec<T>> {
    let entries = match fs::read_dir(dir) {
        Ok(it) => it,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(HealthBotError::FileRead(e)),
    };

    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == RECORD_EXTENSION))
        .collect();
    paths.sort();

    let mut records = Vec::with_capacity(paths.len());
    for path in paths {
        match read_json::<T>(&path, || path.display().to_string()) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!("skipping unreadable record {}: {}", path.display(), e),
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::NewUser;
    use crate::billing::find_plan;
    use crate::consultation::{PaymentStatus, Severity, SymptomDuration, Urgency};
    use crate::constants::USERS_DIR_NAME;
    use crate::engine::MessageType;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn test_store(dir: &Path) -> RecordStore {
        let cfg = CoreConfig::new(dir.to_path_buf(), 1, 999, "USD")
            .expect("CoreConfig::new should succeed");
        RecordStore::new(&cfg)
    }

    fn account(email: &str) -> UserAccount {
        NewUser {
            email: email.into(),
            first_name: "Test".into(),
            last_name: "User".into(),
            ..Default::default()
        }
        .into_account(Utc::now())
        .expect("valid registration")
    }

    fn consultation(user_id: RecordId, last: Option<&TimestampId>) -> Consultation {
        let now = Utc::now();
        Consultation {
            id: TimestampId::generate_at(now, last),
            user_id,
            symptoms: vec!["cough".into()],
            severity: Severity::Mild,
            duration: SymptomDuration::OneToThreeDays,
            urgency: Urgency::Low,
            age: None,
            gender: None,
            additional_info: None,
            analysis: None,
            created_at: now,
            payment_required: false,
            payment_status: PaymentStatus::Free,
        }
    }

    #[test]
    fn create_user_writes_sharded_record() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(temp_dir.path());

        let created = store.create_user(account("a@example.com")).unwrap();
        let expected = created
            .id
            .sharded_dir(&temp_dir.path().join(USERS_DIR_NAME))
            .join(USER_JSON_FILENAME);
        assert!(expected.is_file(), "user.json should exist");

        let read = store.read_user(&created.id).unwrap();
        assert_eq!(read, created);
    }

    #[test]
    fn allocation_retries_on_existing_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let taken = RecordId::new();
        fs::create_dir_all(taken.sharded_dir(temp_dir.path())).unwrap();

        let fresh = RecordId::new();
        let mut ids = vec![fresh, taken];
        let (id, dir) = allocate_sharded_dir(temp_dir.path(), || ids.pop().unwrap()).unwrap();
        assert_eq!(id, fresh);
        assert!(dir.is_dir());
    }

    #[test]
    fn allocation_gives_up_after_five_collisions() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let taken = RecordId::new();
        fs::create_dir_all(taken.sharded_dir(temp_dir.path())).unwrap();

        let err = allocate_sharded_dir(temp_dir.path(), || taken).unwrap_err();
        assert!(matches!(err, HealthBotError::StorageDirCreation(_)));
    }

    #[test]
    fn missing_user_is_not_found() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(temp_dir.path());
        let err = store.read_user(&RecordId::new()).unwrap_err();
        assert!(matches!(err, HealthBotError::NotFound(_)));

        let err = store.write_user(&account("ghost@example.com")).unwrap_err();
        assert!(matches!(err, HealthBotError::NotFound(_)));
    }

    #[test]
    fn list_users_skips_invalid_records() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(temp_dir.path());
        store.create_user(account("valid@example.com")).unwrap();

        let broken = RecordId::new().sharded_dir(store.users_dir());
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join(USER_JSON_FILENAME), "{ not json").unwrap();

        let users = store.list_users();
        assert_eq!(users.len(), 1, "should skip the invalid record");
        assert_eq!(users[0].email.as_str(), "valid@example.com");
    }

    #[test]
    fn list_users_is_empty_without_data_dir() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(&temp_dir.path().join("nowhere"));
        assert!(store.list_users().is_empty());
    }

    #[test]
    fn consultations_list_in_creation_order() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(temp_dir.path());
        let user = store.create_user(account("c@example.com")).unwrap();

        let first = consultation(user.id, None);
        let second = consultation(user.id, Some(&first.id));
        store.write_consultation(&second).unwrap();
        store.write_consultation(&first).unwrap();

        let listed = store.list_consultations(&user.id).unwrap();
        let ids: Vec<_> = listed.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, vec![first.id.clone(), second.id.clone()]);

        let read = store.read_consultation(&user.id, &first.id).unwrap();
        assert_eq!(read, first);

        store.remove_consultation(&user.id, &first.id).unwrap();
        store.remove_consultation(&user.id, &first.id).unwrap();
        assert_eq!(store.list_consultations(&user.id).unwrap(), vec![second]);
    }

    #[test]
    fn payments_live_under_the_user() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(temp_dir.path());
        let user = store.create_user(account("ledger@example.com")).unwrap();
        let plan = find_plan("monthly_premium").unwrap();

        let now = Utc::now();
        let first = Payment::for_plan(user.id, plan, "txn_a".into(), now, None);
        let second = Payment::for_plan(user.id, plan, "txn_b".into(), now, Some(&first.id));
        store.write_payment(&first).unwrap();
        store.write_payment(&second).unwrap();

        let path = record_path(
            &user.id.sharded_dir(store.users_dir()).join(PAYMENTS_DIR_NAME),
            &first.id,
        );
        assert!(path.is_file());

        let listed = store.list_payments(&user.id).unwrap();
        assert_eq!(listed, vec![first.clone(), second]);

        store.remove_payment(&user.id, &first.id).unwrap();
        assert_eq!(store.list_payments(&user.id).unwrap().len(), 1);
        assert!(store.list_payments(&RecordId::new()).unwrap().is_empty());
    }

    #[test]
    fn sessions_and_messages_round_trip() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(temp_dir.path());
        let user = store.create_user(account("m@example.com")).unwrap();

        let now = Utc::now();
        let older = ChatSession::open(user.id, now - Duration::hours(1));
        let newer = ChatSession::open(user.id, now);
        store.write_session(&older).unwrap();
        store.write_session(&newer).unwrap();

        let sessions = store.list_sessions(&user.id).unwrap();
        assert_eq!(sessions[0].id, newer.id);
        assert_eq!(sessions.len(), 2);

        let mut last = None;
        for (i, text) in ["hi", "I have a cough", "thanks"].iter().enumerate() {
            let id = TimestampId::generate_at(now, last.as_ref());
            let message = ChatMessage {
                id: id.clone(),
                session_id: newer.id,
                message_type: if i % 2 == 0 { MessageType::User } else { MessageType::Ai },
                content: (*text).into(),
                timestamp: now,
            };
            store.write_message(&user.id, &message).unwrap();
            last = Some(id);
        }

        let messages = store.list_messages(&user.id, &newer.id).unwrap();
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["hi", "I have a cough", "thanks"]);
        assert!(store.list_messages(&user.id, &older.id).unwrap().is_empty());
    }
}
