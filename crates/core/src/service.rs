//! HealthBot service: accounts, consultations, chat and billing on top of the engine.
//!
//! Pure operations - no API concerns. Transports parse their requests, call into
//! [`HealthBotService`] and map [`HealthBotError`] kinds onto their own status codes.

use crate::account::{Entitlement, NewUser, ProfileUpdate, UserAccount};
use crate::billing::{apply_plan, consultation_cost, find_plan, ConsultationCost};
use crate::chat::{history, ChatExchange, ChatMessage, ChatSession, PrescriptionReply};
use crate::config::CoreConfig;
use crate::constants::DASHBOARD_RECENT_CONSULTATIONS;
use crate::consultation::{
    Consultation, ConsultationForm, ConsultationPage, Dashboard, PaymentStatus, Urgency,
};
use crate::engine::{
    AIResponse, ChatTurn, ConsultationAnalysis, MessageType, ResponseKind, SymptomEngine,
};
use crate::payment::{transaction_id_or_new, Payment};
use crate::store::RecordStore;
use crate::validation::validate_page;
use crate::{HealthBotError, HealthBotResult};
use chrono::{DateTime, Utc};
use healthbot_uuid::{RecordId, TimestampId};
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared application service.
///
/// Cheap to clone; clones share the store, the engine tables and the write lock.
#[derive(Clone, Debug)]
pub struct HealthBotService {
    cfg: Arc<CoreConfig>,
    engine: SymptomEngine,
    store: RecordStore,
    write_lock: Arc<Mutex<()>>,
}

impl HealthBotService {
    pub fn new(cfg: Arc<CoreConfig>, engine: SymptomEngine) -> Self {
        let store = RecordStore::new(&cfg);
        Self {
            cfg,
            engine,
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    pub fn engine(&self) -> &SymptomEngine {
        &self.engine
    }

    /// Serialises read-modify-write sequences across all clones of this service.
    fn lock(&self) -> HealthBotResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| HealthBotError::LockPoisoned)
    }

    // ------------------------------------------------------------------
    // Stateless doctor
    // ------------------------------------------------------------------

    /// Answers a message without storing anything.
    pub fn ask_doctor(&self, message: &str, history: &[ChatTurn]) -> AIResponse {
        self.engine.get_medical_response(message, history)
    }

    pub fn analyze_symptoms(
        &self,
        symptoms: &[String],
        age: Option<u32>,
        gender: Option<&str>,
    ) -> ConsultationAnalysis {
        self.engine.analyze_symptoms(symptoms, age, gender)
    }

    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    /// Registers a new account.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a malformed registration and `Conflict` if the email address
    /// is already registered.
    pub fn create_user(&self, new_user: NewUser) -> HealthBotResult<UserAccount> {
        let account = new_user.into_account(Utc::now())?;

        let _guard = self.lock()?;
        if self
            .store
            .list_users()
            .iter()
            .any(|existing| existing.email == account.email)
        {
            return Err(HealthBotError::Conflict(format!(
                "email {} is already registered",
                account.email
            )));
        }

        let account = self.store.create_user(account)?;
        tracing::info!("created user {}", account.id);
        Ok(account)
    }

    pub fn get_user(&self, user_id: &str) -> HealthBotResult<UserAccount> {
        let user_id = RecordId::parse(user_id)?;
        self.store.read_user(&user_id)
    }

    pub fn update_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> HealthBotResult<UserAccount> {
        let user_id = RecordId::parse(user_id)?;

        let _guard = self.lock()?;
        let mut account = self.store.read_user(&user_id)?;
        update.apply(&mut account)?;
        self.store.write_user(&account)?;
        Ok(account)
    }

    // ------------------------------------------------------------------
    // Billing
    // ------------------------------------------------------------------

    pub fn consultation_cost(&self, user_id: &str) -> HealthBotResult<ConsultationCost> {
        let account = self.get_user(user_id)?;
        Ok(consultation_cost(&account, &self.cfg, Utc::now()))
    }

    /// Records a completed plan purchase: the payment goes into the ledger and the account
    /// becomes premium for the plan's duration.
    ///
    /// `transaction_id` is the provider's reference; a local one is issued when it is absent.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an unknown plan or malformed reference and `Conflict` if the
    /// reference is already in the user's ledger.
    pub fn activate_subscription(
        &self,
        user_id: &str,
        plan_id: &str,
        transaction_id: Option<&str>,
    ) -> HealthBotResult<UserAccount> {
        let user_id = RecordId::parse(user_id)?;
        let plan = find_plan(plan_id)?;
        let transaction_id = transaction_id_or_new(transaction_id)?;

        let _guard = self.lock()?;
        let mut account = self.store.read_user(&user_id)?;
        let now = Utc::now();
        let last_id = self.ledger_tail(&user_id, &transaction_id)?;
        let payment = Payment::for_plan(user_id, plan, transaction_id, now, last_id.as_ref());
        apply_plan(&mut account, plan, now);

        self.store.write_payment(&payment)?;
        if let Err(e) = self.store.write_user(&account) {
            rollback("payment", self.store.remove_payment(&user_id, &payment.id));
            return Err(e);
        }

        tracing::info!(
            "user {} subscribed to {} ({})",
            account.id,
            plan.id,
            payment.transaction_id
        );
        Ok(account)
    }

    /// Records payment for a pending consultation, unlocking its analysis.
    ///
    /// The charge is the configured consultation price. Consultations that are already free or
    /// paid are returned unchanged and nothing is added to the ledger.
    pub fn mark_consultation_paid(
        &self,
        user_id: &str,
        consultation_id: &str,
        transaction_id: Option<&str>,
    ) -> HealthBotResult<Consultation> {
        let user_id = RecordId::parse(user_id)?;
        let consultation_id: TimestampId = consultation_id.parse()?;
        let transaction_id = transaction_id_or_new(transaction_id)?;

        let _guard = self.lock()?;
        let mut consultation = self.store.read_consultation(&user_id, &consultation_id)?;
        if consultation.payment_status != PaymentStatus::Pending {
            return Ok(consultation);
        }

        let last_id = self.ledger_tail(&user_id, &transaction_id)?;
        let payment = Payment::for_consultation(
            &consultation,
            self.cfg.consultation_price(),
            self.cfg.currency(),
            transaction_id,
            Utc::now(),
            last_id.as_ref(),
        );
        consultation.payment_status = PaymentStatus::Paid;

        self.store.write_payment(&payment)?;
        if let Err(e) = self.store.write_consultation(&consultation) {
            rollback("payment", self.store.remove_payment(&user_id, &payment.id));
            return Err(e);
        }

        tracing::info!(
            "consultation {} marked paid ({})",
            consultation.id,
            payment.transaction_id
        );
        Ok(consultation)
    }

    /// A user's payments, newest first.
    pub fn list_payments(&self, user_id: &str) -> HealthBotResult<Vec<Payment>> {
        let account = self.get_user(user_id)?;
        let mut payments = self.store.list_payments(&account.id)?;
        payments.reverse();
        Ok(payments)
    }

    /// Id of the newest ledger entry, after checking `transaction_id` is not already recorded.
    fn ledger_tail(
        &self,
        user_id: &RecordId,
        transaction_id: &str,
    ) -> HealthBotResult<Option<TimestampId>> {
        let payments = self.store.list_payments(user_id)?;
        if payments.iter().any(|p| p.transaction_id == transaction_id) {
            return Err(HealthBotError::Conflict(format!(
                "transaction {} is already recorded",
                transaction_id
            )));
        }
        Ok(payments.last().map(|p| p.id.clone()))
    }

    // ------------------------------------------------------------------
    // Consultations
    // ------------------------------------------------------------------

    /// Validates and analyses a checklist submission, then stores it.
    ///
    /// Missing age and gender are taken from the account. The free allowance is spent first,
    /// then an active subscription; otherwise the consultation is stored pending payment and
    /// its analysis is withheld from the returned record.
    ///
    /// The account is written after the consultation. If that write fails the consultation is
    /// removed again, so an allowance is never granted without being spent.
    pub fn submit_consultation(
        &self,
        user_id: &str,
        form: ConsultationForm,
    ) -> HealthBotResult<Consultation> {
        let user_id = RecordId::parse(user_id)?;
        let form = form.validate()?;

        let _guard = self.lock()?;
        let mut account = self.store.read_user(&user_id)?;
        let now = Utc::now();

        let age = form.age.or(account.age);
        let gender = form.gender.or(account.gender);
        let analysis = self.engine.analyze_symptoms_at(
            &form.symptoms,
            age,
            gender.as_ref().map(|g| g.as_str()),
            now,
        );

        let urgency = Urgency::assess(&form.symptoms, form.severity);
        let entitlement = account.entitlement(self.cfg.free_consultation_allowance(), now);
        let last_id = self
            .store
            .list_consultations(&user_id)?
            .last()
            .map(|c| c.id.clone());

        let consultation = Consultation {
            id: TimestampId::generate_at(now, last_id.as_ref()),
            user_id,
            symptoms: form.symptoms,
            severity: form.severity,
            duration: form.duration,
            urgency,
            age,
            gender,
            additional_info: form.additional_info,
            analysis: Some(analysis),
            created_at: now,
            payment_required: entitlement == Entitlement::PaymentRequired,
            payment_status: PaymentStatus::for_entitlement(entitlement),
        };

        self.store.write_consultation(&consultation)?;
        if entitlement == Entitlement::FreeAllowance {
            account.free_consultations_used += 1;
            if let Err(e) = self.store.write_user(&account) {
                rollback(
                    "consultation",
                    self.store.remove_consultation(&user_id, &consultation.id),
                );
                return Err(e);
            }
        }

        tracing::info!(
            "consultation {} stored for user {} ({}, {} urgency)",
            consultation.id,
            user_id,
            consultation.payment_status.as_str(),
            consultation.urgency.as_str()
        );
        Ok(consultation.redacted())
    }

    pub fn get_consultation(
        &self,
        user_id: &str,
        consultation_id: &str,
    ) -> HealthBotResult<Consultation> {
        let user_id = RecordId::parse(user_id)?;
        let consultation_id: TimestampId = consultation_id.parse()?;
        let consultation = self.store.read_consultation(&user_id, &consultation_id)?;
        Ok(consultation.redacted())
    }

    /// One page of a user's consultations, newest first. Pages start at 1.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a zero page, a page size outside 1 to 100, or a page number
    /// whose offset does not fit in `usize`.
    pub fn list_consultations(
        &self,
        user_id: &str,
        page: usize,
        per_page: usize,
    ) -> HealthBotResult<ConsultationPage> {
        validate_page(page, per_page)?;
        let skip = (page - 1).checked_mul(per_page).ok_or_else(|| {
            HealthBotError::InvalidInput(format!("page {} is out of range", page))
        })?;
        let user_id = RecordId::parse(user_id)?;
        // Existence check so an unknown user is NotFound rather than an empty history.
        self.store.read_user(&user_id)?;

        let all = self.store.list_consultations(&user_id)?;
        let total = all.len();
        let consultations = all
            .into_iter()
            .rev()
            .skip(skip)
            .take(per_page)
            .map(Consultation::redacted)
            .collect();

        Ok(ConsultationPage {
            consultations,
            page,
            per_page,
            total,
        })
    }

    pub fn dashboard(&self, user_id: &str) -> HealthBotResult<Dashboard> {
        let account = self.get_user(user_id)?;
        let all = self.store.list_consultations(&account.id)?;
        let total_consultations = all.len();
        let recent_consultations = all
            .into_iter()
            .rev()
            .take(DASHBOARD_RECENT_CONSULTATIONS)
            .map(Consultation::redacted)
            .collect();

        Ok(Dashboard {
            recent_consultations,
            total_consultations,
            cost: consultation_cost(&account, &self.cfg, Utc::now()),
        })
    }

    // ------------------------------------------------------------------
    // Chat
    // ------------------------------------------------------------------

    pub fn start_session(&self, user_id: &str) -> HealthBotResult<ChatSession> {
        let account = self.get_user(user_id)?;
        let session = ChatSession::open(account.id, Utc::now());
        self.store.write_session(&session)?;
        tracing::info!("chat session {} started for user {}", session.id, account.id);
        Ok(session)
    }

    pub fn list_sessions(&self, user_id: &str) -> HealthBotResult<Vec<ChatSession>> {
        let account = self.get_user(user_id)?;
        self.store.list_sessions(&account.id)
    }

    pub fn close_session(&self, user_id: &str, session_id: &str) -> HealthBotResult<ChatSession> {
        let (user_id, session_id) = parse_session_ids(user_id, session_id)?;

        let _guard = self.lock()?;
        let mut session = self.owned_session(&user_id, &session_id)?;
        if session.is_active {
            session.is_active = false;
            self.store.write_session(&session)?;
        }
        Ok(session)
    }

    pub fn list_messages(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> HealthBotResult<Vec<ChatMessage>> {
        let (user_id, session_id) = parse_session_ids(user_id, session_id)?;
        self.owned_session(&user_id, &session_id)?;
        self.store.list_messages(&user_id, &session_id)
    }

    /// Sends one user message to an open session and stores the exchange.
    ///
    /// A symptom analysis reply is a consultation: it spends the free allowance or needs an
    /// active subscription. Without either the call fails with `PaymentRequired` and the
    /// session is left untouched.
    ///
    /// The spent allowance is saved after the messages and the session. If any of those writes
    /// fails the messages are removed and the session restored, so nothing is charged.
    pub fn send_message(
        &self,
        user_id: &str,
        session_id: &str,
        text: &str,
    ) -> HealthBotResult<ChatExchange> {
        let (user_id, session_id) = parse_session_ids(user_id, session_id)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(HealthBotError::InvalidInput("message cannot be empty".into()));
        }

        let _guard = self.lock()?;
        let mut session = self.owned_session(&user_id, &session_id)?;
        if !session.is_active {
            return Err(HealthBotError::SessionClosed(session.id.to_string()));
        }

        let messages = self.store.list_messages(&user_id, &session_id)?;
        let now = Utc::now();
        let reply = self
            .engine
            .get_medical_response_at(text, &history(&messages), now);

        let charged = if reply.kind == ResponseKind::SymptomAnalysis {
            self.analysis_charge(&user_id, now)?
        } else {
            None
        };

        let last_id = messages.last().map(|m| m.id.clone());
        let user_message = new_message(session_id, MessageType::User, text, now, last_id.as_ref());
        let ai_message = new_message(
            session_id,
            MessageType::Ai,
            &reply.response,
            now,
            Some(&user_message.id),
        );

        let previous = session.clone();
        session.last_activity = now;
        let stored = self
            .store
            .write_message(&user_id, &user_message)
            .and_then(|()| self.store.write_message(&user_id, &ai_message))
            .and_then(|()| self.store.write_session(&session))
            .and_then(|()| match &charged {
                Some(account) => self.store.write_user(account),
                None => Ok(()),
            });
        if let Err(e) = stored {
            rollback("chat message", self.store.remove_message(&user_id, &user_message));
            rollback("chat message", self.store.remove_message(&user_id, &ai_message));
            rollback("chat session", self.store.write_session(&previous));
            return Err(e);
        }

        Ok(ChatExchange {
            user_message,
            ai_message,
            reply,
        })
    }

    /// Builds a prescription from everything the user has said in the session and stores it
    /// as an AI message.
    pub fn request_prescription(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> HealthBotResult<PrescriptionReply> {
        let (user_id, session_id) = parse_session_ids(user_id, session_id)?;

        let _guard = self.lock()?;
        let mut session = self.owned_session(&user_id, &session_id)?;
        if !session.is_active {
            return Err(HealthBotError::SessionClosed(session.id.to_string()));
        }

        let messages = self.store.list_messages(&user_id, &session_id)?;
        let now = Utc::now();
        let reply = self
            .engine
            .prescription_from_history_at(&history(&messages), now);

        let last_id = messages.last().map(|m| m.id.clone());
        let ai_message = new_message(
            session_id,
            MessageType::Ai,
            &reply.response,
            now,
            last_id.as_ref(),
        );
        self.store.write_message(&user_id, &ai_message)?;

        session.last_activity = now;
        if let Err(e) = self.store.write_session(&session) {
            rollback("chat message", self.store.remove_message(&user_id, &ai_message));
            return Err(e);
        }

        Ok(PrescriptionReply { ai_message, reply })
    }

    /// Decides how a symptom analysis is paid for without writing anything.
    ///
    /// Returns the account to save when the free allowance is spent, `None` when an active
    /// subscription covers it. Caller holds the write lock.
    fn analysis_charge(
        &self,
        user_id: &RecordId,
        now: DateTime<Utc>,
    ) -> HealthBotResult<Option<UserAccount>> {
        let mut account = self.store.read_user(user_id)?;
        match account.entitlement(self.cfg.free_consultation_allowance(), now) {
            Entitlement::FreeAllowance => {
                account.free_consultations_used += 1;
                Ok(Some(account))
            }
            Entitlement::Subscription => Ok(None),
            Entitlement::PaymentRequired => Err(HealthBotError::PaymentRequired(
                "free consultation used; subscribe or pay to continue".into(),
            )),
        }
    }

    /// Reads a session from the user's own directory.
    ///
    /// Another user's session id is simply `NotFound` there. The stored owner is checked too,
    /// so a session file copied in from another account is refused with `Forbidden`.
    fn owned_session(
        &self,
        user_id: &RecordId,
        session_id: &RecordId,
    ) -> HealthBotResult<ChatSession> {
        let session = self.store.read_session(user_id, session_id)?;
        if session.user_id != *user_id {
            return Err(HealthBotError::Forbidden(format!(
                "chat session {} does not belong to user {}",
                session_id, user_id
            )));
        }
        Ok(session)
    }
}

/// Undo step after a failed write. The caller returns the original error, so a failure here is
/// only logged.
fn rollback(what: &str, result: HealthBotResult<()>) {
    if let Err(e) = result {
        tracing::warn!("failed to roll back {}: {}", what, e);
    }
}

fn parse_session_ids(user_id: &str, session_id: &str) -> HealthBotResult<(RecordId, RecordId)> {
    Ok((RecordId::parse(user_id)?, RecordId::parse(session_id)?))
}

fn new_message(
    session_id: RecordId,
    message_type: MessageType,
    content: &str,
    now: DateTime<Utc>,
    last: Option<&TimestampId>,
) -> ChatMessage {
    let id = TimestampId::generate_at(now, last);
    ChatMessage {
        timestamp: id.timestamp(),
        id,
        session_id,
        message_type,
        content: content.to_owned(),
    }
}
