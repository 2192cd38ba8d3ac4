//! Conversions between core records and wire types.
//!
//! Outbound conversions are infallible `From` impls. Inbound requests become the core's raw
//! input types (`NewUser`, `ConsultationForm`, ...) and are validated by the service, so only
//! chat history, whose roles are parsed here, needs `TryFrom`.

use crate::pb;
use chrono::{DateTime, Utc};
use healthbot_core::account::{NewUser, ProfileUpdate, UserAccount};
use healthbot_core::billing::{ConsultationCost, PricingPlan};
use healthbot_core::chat::{ChatExchange, ChatMessage, ChatSession, PrescriptionReply};
use healthbot_core::consultation::{
    Consultation, ConsultationForm, ConsultationPage, Dashboard,
};
use healthbot_core::engine::{AIResponse, ChatTurn, ConsultationAnalysis};
use healthbot_core::payment::Payment;
use healthbot_core::{HealthBotError, HealthBotResult};

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

impl From<AIResponse> for pb::AiResponse {
    fn from(r: AIResponse) -> Self {
        Self {
            response: r.response,
            medications: r.medications,
            advice: r.advice,
            timestamp: timestamp(r.timestamp),
            requires_follow_up: r.requires_follow_up,
            kind: r.kind.as_str().to_owned(),
        }
    }
}

impl From<ConsultationAnalysis> for pb::ConsultationAnalysis {
    fn from(a: ConsultationAnalysis) -> Self {
        Self {
            conditions: a.conditions,
            medications: a.medications,
            advice: a.advice,
            warnings: a.warnings,
            confidence_level: a.confidence_level.as_str().to_owned(),
            timestamp: timestamp(a.timestamp),
        }
    }
}

impl TryFrom<pb::ChatTurn> for ChatTurn {
    type Error = HealthBotError;

    fn try_from(turn: pb::ChatTurn) -> Result<Self, Self::Error> {
        Ok(ChatTurn {
            role: turn.role.parse()?,
            content: turn.content,
        })
    }
}

/// Parses the history sent with a stateless doctor question.
pub fn history_from_pb(turns: Vec<pb::ChatTurn>) -> HealthBotResult<Vec<ChatTurn>> {
    turns.into_iter().map(ChatTurn::try_from).collect()
}

impl From<UserAccount> for pb::User {
    fn from(u: UserAccount) -> Self {
        Self {
            id: u.id.to_string(),
            email: u.email.to_string(),
            first_name: u.first_name.to_string(),
            last_name: u.last_name.to_string(),
            age: u.age,
            gender: u.gender.map(|g| g.as_str().to_owned()),
            created_at: timestamp(u.created_at),
            free_consultations_used: u.free_consultations_used,
            subscription_status: u.subscription_status.as_str().to_owned(),
            subscription_expires: u.subscription_expires.map(timestamp),
        }
    }
}

impl From<pb::CreateUserReq> for NewUser {
    fn from(req: pb::CreateUserReq) -> Self {
        Self {
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            age: req.age,
            gender: req.gender,
        }
    }
}

impl From<pb::UpdateUserReq> for ProfileUpdate {
    fn from(req: pb::UpdateUserReq) -> Self {
        Self {
            first_name: req.first_name,
            last_name: req.last_name,
            age: req.age,
            gender: req.gender,
        }
    }
}

impl From<&PricingPlan> for pb::PricingPlan {
    fn from(p: &PricingPlan) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            price: p.price,
            currency: p.currency.clone(),
            consultations_limit: p.consultations_limit,
            duration_days: p.duration_days,
            features: p.features.clone(),
            is_active: p.is_active,
        }
    }
}

pub fn plans_to_pb(plans: &[PricingPlan]) -> pb::ListPricingPlansRes {
    pb::ListPricingPlansRes {
        plans: plans.iter().map(pb::PricingPlan::from).collect(),
    }
}

impl From<ConsultationCost> for pb::ConsultationCost {
    fn from(c: ConsultationCost) -> Self {
        Self {
            cost: c.cost,
            currency: c.currency,
            payment_required: c.payment_required,
            entitlement: c.entitlement.as_str().to_owned(),
            message: c.message,
        }
    }
}

impl From<Payment> for pb::Payment {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id.to_string(),
            user_id: p.user_id.to_string(),
            amount: p.amount,
            currency: p.currency,
            payment_type: p.payment_type.as_str().to_owned(),
            status: p.status.as_str().to_owned(),
            transaction_id: p.transaction_id,
            consultation_id: p.consultation_id.map(|id| id.to_string()),
            plan_id: p.plan_id,
            created_at: timestamp(p.created_at),
            completed_at: timestamp(p.completed_at),
        }
    }
}

pub fn payments_to_pb(payments: Vec<Payment>) -> pb::ListPaymentsRes {
    pb::ListPaymentsRes {
        payments: payments.into_iter().map(Into::into).collect(),
    }
}

impl From<pb::ConsultationForm> for ConsultationForm {
    fn from(f: pb::ConsultationForm) -> Self {
        Self {
            symptoms: f.symptoms,
            severity: f.severity,
            duration: f.duration,
            age: f.age,
            gender: f.gender,
            additional_info: f.additional_info,
        }
    }
}

impl From<Consultation> for pb::Consultation {
    fn from(c: Consultation) -> Self {
        Self {
            id: c.id.to_string(),
            user_id: c.user_id.to_string(),
            symptoms: c.symptoms,
            severity: c.severity.as_str().to_owned(),
            duration: c.duration.as_str().to_owned(),
            age: c.age,
            gender: c.gender.map(|g| g.as_str().to_owned()),
            additional_info: c.additional_info,
            analysis: c.analysis.map(Into::into),
            created_at: timestamp(c.created_at),
            payment_required: c.payment_required,
            payment_status: c.payment_status.as_str().to_owned(),
            urgency: c.urgency.as_str().to_owned(),
        }
    }
}

impl From<ConsultationPage> for pb::ListConsultationsRes {
    fn from(p: ConsultationPage) -> Self {
        let total_pages = saturating_u32(p.total_pages());
        let has_next = p.has_next();
        Self {
            consultations: p.consultations.into_iter().map(Into::into).collect(),
            page: saturating_u32(p.page),
            per_page: saturating_u32(p.per_page),
            total: p.total as u64,
            total_pages,
            has_next,
        }
    }
}

impl From<Dashboard> for pb::Dashboard {
    fn from(d: Dashboard) -> Self {
        Self {
            recent_consultations: d.recent_consultations.into_iter().map(Into::into).collect(),
            total_consultations: d.total_consultations as u64,
            cost: Some(d.cost.into()),
        }
    }
}

impl From<ChatSession> for pb::ChatSession {
    fn from(s: ChatSession) -> Self {
        Self {
            id: s.id.to_string(),
            user_id: s.user_id.to_string(),
            created_at: timestamp(s.created_at),
            last_activity: timestamp(s.last_activity),
            is_active: s.is_active,
        }
    }
}

impl From<ChatMessage> for pb::ChatMessage {
    fn from(m: ChatMessage) -> Self {
        Self {
            id: m.id.to_string(),
            session_id: m.session_id.to_string(),
            message_type: m.message_type.as_str().to_owned(),
            content: m.content,
            timestamp: timestamp(m.timestamp),
        }
    }
}

impl From<ChatExchange> for pb::SendChatMessageRes {
    fn from(e: ChatExchange) -> Self {
        Self {
            user_message: Some(e.user_message.into()),
            ai_message: Some(e.ai_message.into()),
            reply: Some(e.reply.into()),
        }
    }
}

impl From<PrescriptionReply> for pb::PrescriptionRes {
    fn from(p: PrescriptionReply) -> Self {
        Self {
            ai_message: Some(p.ai_message.into()),
            reply: Some(p.reply.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use healthbot_core::engine::{MessageType, ResponseKind};
    use healthbot_core::SymptomEngine;

    #[test]
    fn reply_kind_travels_as_snake_case() {
        let reply = SymptomEngine::default().get_medical_response("I have a fever", &[]);
        let wire = pb::AiResponse::from(reply);
        assert_eq!(wire.kind, ResponseKind::SymptomAnalysis.as_str());
        assert_eq!(wire.kind, "symptom_analysis");
        assert!(wire.requires_follow_up);
    }

    #[test]
    fn history_roles_are_parsed() {
        let history = history_from_pb(vec![
            pb::ChatTurn {
                role: "user".into(),
                content: "hi".into(),
            },
            pb::ChatTurn {
                role: "AI".into(),
                content: "hello".into(),
            },
        ])
        .unwrap();
        assert_eq!(history[0].role, MessageType::User);
        assert_eq!(history[1].role, MessageType::Ai);

        let bad = history_from_pb(vec![pb::ChatTurn {
            role: "doctor".into(),
            content: String::new(),
        }]);
        assert!(matches!(bad, Err(HealthBotError::InvalidInput(_))));
    }

    #[test]
    fn payments_keep_their_references() {
        let plan = healthbot_core::billing::find_plan("monthly_premium").unwrap();
        let payment = Payment::for_plan(
            healthbot_core::RecordId::new(),
            plan,
            "pi_42".into(),
            chrono::Utc::now(),
            None,
        );
        let res = payments_to_pb(vec![payment]);
        let wire = &res.payments[0];
        assert_eq!(wire.payment_type, "subscription");
        assert_eq!(wire.status, "completed");
        assert_eq!(wire.transaction_id, "pi_42");
        assert_eq!(wire.plan_id.as_deref(), Some("monthly_premium"));
        assert_eq!(wire.consultation_id, None);
        assert_eq!(wire.amount, 2999);
    }

    #[test]
    fn plans_keep_their_order() {
        let res = plans_to_pb(healthbot_core::billing::pricing_plans());
        let ids: Vec<&str> = res.plans.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["single_consultation", "monthly_premium", "yearly_premium"]);
    }
}
