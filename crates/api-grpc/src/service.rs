// Re-export the proto module from the shared `api-shared` crate so callers
// can reference `api_grpc::pb`.
pub use api_shared::pb;

use api_shared::auth::{self, API_KEY_HEADER};
use api_shared::convert::history_from_pb;
use api_shared::errors::to_status;
use api_shared::HealthService;
use healthbot_core::constants::DEFAULT_PAGE_SIZE;
use healthbot_core::consultation::ConsultationForm;
use healthbot_core::HealthBotService;
use tonic::{Request, Response, Status};

use api_shared::pb::health_bot_server::HealthBot;

/// Authentication interceptor for gRPC requests
#[allow(clippy::result_large_err)]
pub fn auth_interceptor(req: Request<()>) -> Result<Request<()>, Status> {
    let api_key = req
        .metadata()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Status::unauthenticated("Missing x-api-key header"))?;

    auth::validate_api_key(api_key)?;
    Ok(req)
}

/// gRPC front end over the shared [`HealthBotService`].
#[derive(Clone)]
pub struct HealthBotGrpc {
    service: HealthBotService,
}

impl HealthBotGrpc {
    pub fn new(service: HealthBotService) -> Self {
        Self { service }
    }
}

/// Zero means "use the default" on the wire.
fn or_default(value: u32, default: usize) -> usize {
    if value == 0 {
        default
    } else {
        value as usize
    }
}

#[tonic::async_trait]
impl HealthBot for HealthBotGrpc {
    async fn health(&self, _req: Request<()>) -> Result<Response<pb::HealthRes>, Status> {
        Ok(Response::new(HealthService::check_health()))
    }

    async fn ask_doctor(
        &self,
        req: Request<pb::AskDoctorReq>,
    ) -> Result<Response<pb::AiResponse>, Status> {
        let req = req.into_inner();
        let history =
            history_from_pb(req.history).map_err(|e| to_status(e, "Failed to read history"))?;
        let reply = self.service.ask_doctor(&req.message, &history);
        Ok(Response::new(reply.into()))
    }

    async fn analyze_symptoms(
        &self,
        req: Request<pb::AnalyzeSymptomsReq>,
    ) -> Result<Response<pb::ConsultationAnalysis>, Status> {
        let req = req.into_inner();
        let analysis =
            self.service
                .analyze_symptoms(&req.symptoms, req.age, req.gender.as_deref());
        Ok(Response::new(analysis.into()))
    }

    async fn create_user(
        &self,
        req: Request<pb::CreateUserReq>,
    ) -> Result<Response<pb::User>, Status> {
        match self.service.create_user(req.into_inner().into()) {
            Ok(user) => Ok(Response::new(user.into())),
            Err(e) => Err(to_status(e, "Failed to create user")),
        }
    }

    async fn get_user(&self, req: Request<pb::GetUserReq>) -> Result<Response<pb::User>, Status> {
        match self.service.get_user(&req.into_inner().user_id) {
            Ok(user) => Ok(Response::new(user.into())),
            Err(e) => Err(to_status(e, "Failed to get user")),
        }
    }

    async fn submit_consultation(
        &self,
        req: Request<pb::SubmitConsultationReq>,
    ) -> Result<Response<pb::Consultation>, Status> {
        let req = req.into_inner();
        let form: ConsultationForm = req.form.unwrap_or_default().into();
        match self.service.submit_consultation(&req.user_id, form) {
            Ok(consultation) => Ok(Response::new(consultation.into())),
            Err(e) => Err(to_status(e, "Failed to submit consultation")),
        }
    }

    async fn list_consultations(
        &self,
        req: Request<pb::ListConsultationsReq>,
    ) -> Result<Response<pb::ListConsultationsRes>, Status> {
        let req = req.into_inner();
        let page = or_default(req.page, 1);
        let per_page = or_default(req.per_page, DEFAULT_PAGE_SIZE);
        match self
            .service
            .list_consultations(&req.user_id, page, per_page)
        {
            Ok(page) => Ok(Response::new(page.into())),
            Err(e) => Err(to_status(e, "Failed to list consultations")),
        }
    }

    async fn start_chat_session(
        &self,
        req: Request<pb::StartChatSessionReq>,
    ) -> Result<Response<pb::ChatSession>, Status> {
        match self.service.start_session(&req.into_inner().user_id) {
            Ok(session) => Ok(Response::new(session.into())),
            Err(e) => Err(to_status(e, "Failed to start chat session")),
        }
    }

    async fn send_chat_message(
        &self,
        req: Request<pb::SendChatMessageReq>,
    ) -> Result<Response<pb::SendChatMessageRes>, Status> {
        let req = req.into_inner();
        match self
            .service
            .send_message(&req.user_id, &req.session_id, &req.message)
        {
            Ok(exchange) => Ok(Response::new(exchange.into())),
            Err(e) => Err(to_status(e, "Failed to send chat message")),
        }
    }

    async fn list_pricing_plans(
        &self,
        _req: Request<()>,
    ) -> Result<Response<pb::ListPricingPlansRes>, Status> {
        Ok(Response::new(api_shared::convert::plans_to_pb(
            healthbot_core::billing::pricing_plans(),
        )))
    }

    async fn list_payments(
        &self,
        req: Request<pb::ListPaymentsReq>,
    ) -> Result<Response<pb::ListPaymentsRes>, Status> {
        match self.service.list_payments(&req.into_inner().user_id) {
            Ok(payments) => Ok(Response::new(api_shared::convert::payments_to_pb(payments))),
            Err(e) => Err(to_status(e, "Failed to list payments")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use healthbot_core::{CoreConfig, SymptomEngine};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn grpc(dir: &std::path::Path) -> HealthBotGrpc {
        let cfg = CoreConfig::new(dir.to_path_buf(), 1, 999, "USD").unwrap();
        HealthBotGrpc::new(HealthBotService::new(
            Arc::new(cfg),
            SymptomEngine::default(),
        ))
    }

    #[tokio::test]
    async fn consultation_flow_over_grpc() {
        let temp_dir = TempDir::new().unwrap();
        let api = grpc(temp_dir.path());

        let user = api
            .create_user(Request::new(pb::CreateUserReq {
                email: "grpc@example.com".into(),
                first_name: "Alex".into(),
                last_name: "Kim".into(),
                age: Some(40),
                gender: None,
            }))
            .await
            .unwrap()
            .into_inner();

        let consultation = api
            .submit_consultation(Request::new(pb::SubmitConsultationReq {
                user_id: user.id.clone(),
                form: Some(pb::ConsultationForm {
                    symptoms: vec!["headache".into(), "fever".into()],
                    severity: "mild".into(),
                    duration: "1_3_days".into(),
                    ..Default::default()
                }),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(consultation.payment_status, "free");
        assert_eq!(consultation.urgency, "medium");
        let analysis = consultation.analysis.unwrap();
        assert_eq!(analysis.confidence_level, "medium");

        let page = api
            .list_consultations(Request::new(pb::ListConsultationsReq {
                user_id: user.id,
                page: 0,
                per_page: 0,
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(page.total, 1);
        assert_eq!(page.per_page as usize, DEFAULT_PAGE_SIZE);
    }

    #[tokio::test]
    async fn errors_map_to_grpc_codes() {
        let temp_dir = TempDir::new().unwrap();
        let api = grpc(temp_dir.path());

        let status = api
            .get_user(Request::new(pb::GetUserReq {
                user_id: "nope".into(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let status = api
            .start_chat_session(Request::new(pb::StartChatSessionReq {
                user_id: "0123456789abcdef0123456789abcdef".into(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::NotFound);
    }

    #[tokio::test]
    async fn payment_history_over_grpc() {
        let temp_dir = TempDir::new().unwrap();
        let api = grpc(temp_dir.path());
        let user = api
            .create_user(Request::new(pb::CreateUserReq {
                email: "ledger-grpc@example.com".into(),
                first_name: "Sam".into(),
                last_name: "Ortiz".into(),
                ..Default::default()
            }))
            .await
            .unwrap()
            .into_inner();

        api.service
            .activate_subscription(&user.id, "monthly_premium", Some("pi_grpc_1"))
            .unwrap();

        let res = api
            .list_payments(Request::new(pb::ListPaymentsReq {
                user_id: user.id.clone(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(res.payments.len(), 1);
        assert_eq!(res.payments[0].transaction_id, "pi_grpc_1");
        assert_eq!(res.payments[0].user_id, user.id);

        let status = api
            .list_payments(Request::new(pb::ListPaymentsReq {
                user_id: "0123456789abcdef0123456789abcdef".into(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::NotFound);
    }

    #[tokio::test]
    async fn ask_doctor_is_stateless() {
        let temp_dir = TempDir::new().unwrap();
        let api = grpc(temp_dir.path());
        let reply = api
            .ask_doctor(Request::new(pb::AskDoctorReq {
                message: "hello".into(),
                history: vec![],
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(reply.kind, "greeting");
        assert!(!reply.requires_follow_up);
    }
}
