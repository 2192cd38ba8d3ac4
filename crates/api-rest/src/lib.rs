//! # API REST
//!
//! REST API implementation for HealthBot.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON bodies, status codes, CORS)
//!
//! Request and response bodies are the protobuf types from `api-shared`, serialised as JSON.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use utoipa::{IntoParams, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use api_shared::convert::{history_from_pb, payments_to_pb, plans_to_pb};
use api_shared::{classify, pb, ErrorKind, HealthService};
use healthbot_core::billing::pricing_plans;
use healthbot_core::constants::DEFAULT_PAGE_SIZE;
use healthbot_core::{HealthBotError, HealthBotService};

pub const REST_ADDR_ENV: &str = "HEALTHBOT_REST_ADDR";
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

/// Application state shared by all handlers.
#[derive(Clone)]
struct AppState {
    service: HealthBotService,
}

/// Status code plus a message safe to show the caller.
type ApiError = (StatusCode, String);

/// Maps a core error to a response. Internal failures are logged with their detail and
/// reported as `context` only.
fn api_error(e: HealthBotError, context: &str) -> ApiError {
    let status = match classify(&e) {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
        ErrorKind::Conflict | ErrorKind::Closed => StatusCode::CONFLICT,
        ErrorKind::Internal => {
            tracing::error!("{}: {:?}", context, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, context.to_owned());
        }
    };
    (status, e.to_string())
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number (default 1).
    page: Option<usize>,
    /// Page size, 1 to 100 (default 10).
    per_page: Option<usize>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        ask_doctor,
        analyze_symptoms,
        list_symptoms,
        create_user,
        get_user,
        update_user,
        dashboard,
        consultation_cost,
        activate_subscription,
        list_payments,
        submit_consultation,
        list_consultations,
        get_consultation,
        pay_consultation,
        start_session,
        list_sessions,
        close_session,
        list_messages,
        send_message,
        request_prescription,
        list_pricing_plans,
    ),
    components(schemas(
        pb::HealthRes,
        pb::ChatTurn,
        pb::AskDoctorReq,
        pb::AiResponse,
        pb::AnalyzeSymptomsReq,
        pb::ConsultationAnalysis,
        pb::ListSymptomsRes,
        pb::CreateUserReq,
        pb::UpdateUserReq,
        pb::User,
        pb::PricingPlan,
        pb::ListPricingPlansRes,
        pb::ConsultationCost,
        pb::ActivateSubscriptionReq,
        pb::PayConsultationReq,
        pb::Payment,
        pb::ListPaymentsRes,
        pb::ConsultationForm,
        pb::Consultation,
        pb::ListConsultationsRes,
        pb::Dashboard,
        pb::ChatSession,
        pb::ListChatSessionsRes,
        pb::ChatMessage,
        pb::ListChatMessagesRes,
        pb::ChatMessageBody,
        pb::SendChatMessageRes,
        pb::PrescriptionRes,
    ))
)]
pub struct ApiDoc;

/// Builds the REST application around `service`, including Swagger UI.
pub fn router(service: HealthBotService) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/doctor/ask", post(ask_doctor))
        .route("/doctor/analyze", post(analyze_symptoms))
        .route("/doctor/symptoms", get(list_symptoms))
        .route("/users", post(create_user))
        .route("/users/:id", get(get_user).put(update_user))
        .route("/users/:id/dashboard", get(dashboard))
        .route("/users/:id/consultation-cost", get(consultation_cost))
        .route("/users/:id/subscription", post(activate_subscription))
        .route("/users/:id/payments", get(list_payments))
        .route(
            "/users/:id/consultations",
            post(submit_consultation).get(list_consultations),
        )
        .route("/users/:id/consultations/:cid", get(get_consultation))
        .route("/users/:id/consultations/:cid/payment", post(pay_consultation))
        .route("/users/:id/sessions", post(start_session).get(list_sessions))
        .route("/users/:id/sessions/:sid", delete(close_session))
        .route(
            "/users/:id/sessions/:sid/messages",
            get(list_messages).post(send_message),
        )
        .route(
            "/users/:id/sessions/:sid/prescription",
            post(request_prescription),
        )
        .route("/pricing/plans", get(list_pricing_plans))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(AppState { service })
}

/// Serves the REST API on `addr` until the server fails.
pub async fn serve(service: HealthBotService, addr: &str) -> anyhow::Result<()> {
    tracing::info!("-- Starting HealthBot REST API on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(service)).await?;
    Ok(())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = pb::HealthRes)
    )
)]
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<pb::HealthRes> {
    Json(HealthService::check_health())
}

// ---------------------------------------------------------------------------
// Doctor
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/doctor/ask",
    request_body = pb::AskDoctorReq,
    responses(
        (status = 200, description = "Doctor reply", body = pb::AiResponse),
        (status = 400, description = "Malformed history")
    )
)]
/// Answers a message against caller-supplied history. Nothing is stored.
#[axum::debug_handler]
async fn ask_doctor(
    State(state): State<AppState>,
    Json(req): Json<pb::AskDoctorReq>,
) -> Result<Json<pb::AiResponse>, ApiError> {
    let history = history_from_pb(req.history).map_err(|e| api_error(e, "Invalid history"))?;
    let reply = state.service.ask_doctor(&req.message, &history);
    Ok(Json(reply.into()))
}

#[utoipa::path(
    post,
    path = "/doctor/analyze",
    request_body = pb::AnalyzeSymptomsReq,
    responses(
        (status = 200, description = "Symptom analysis", body = pb::ConsultationAnalysis)
    )
)]
#[axum::debug_handler]
async fn analyze_symptoms(
    State(state): State<AppState>,
    Json(req): Json<pb::AnalyzeSymptomsReq>,
) -> Json<pb::ConsultationAnalysis> {
    let analysis = state
        .service
        .analyze_symptoms(&req.symptoms, req.age, req.gender.as_deref());
    Json(analysis.into())
}

#[utoipa::path(
    get,
    path = "/doctor/symptoms",
    responses(
        (status = 200, description = "Symptom ids the engine knows", body = pb::ListSymptomsRes)
    )
)]
#[axum::debug_handler]
async fn list_symptoms(State(state): State<AppState>) -> Json<pb::ListSymptomsRes> {
    let symptoms = state
        .service
        .engine()
        .knowledge()
        .entries()
        .iter()
        .map(|entry| entry.key.clone())
        .collect();
    Json(pb::ListSymptomsRes { symptoms })
}

// ---------------------------------------------------------------------------
// Accounts and billing
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/users",
    request_body = pb::CreateUserReq,
    responses(
        (status = 201, description = "User created", body = pb::User),
        (status = 400, description = "Bad request"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<pb::CreateUserReq>,
) -> Result<(StatusCode, Json<pb::User>), ApiError> {
    match state.service.create_user(req.into()) {
        Ok(user) => Ok((StatusCode::CREATED, Json(user.into()))),
        Err(e) => Err(api_error(e, "Failed to create user")),
    }
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = pb::User),
        (status = 400, description = "Invalid user id"),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
async fn get_user(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<pb::User>, ApiError> {
    state
        .service
        .get_user(&id)
        .map(|user| Json(user.into()))
        .map_err(|e| api_error(e, "Failed to read user"))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = String, Path, description = "User id")),
    request_body = pb::UpdateUserReq,
    responses(
        (status = 200, description = "Profile updated", body = pb::User),
        (status = 400, description = "Bad request"),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
async fn update_user(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<pb::UpdateUserReq>,
) -> Result<Json<pb::User>, ApiError> {
    state
        .service
        .update_profile(&id, req.into())
        .map(|user| Json(user.into()))
        .map_err(|e| api_error(e, "Failed to update user"))
}

#[utoipa::path(
    get,
    path = "/users/{id}/dashboard",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Recent consultations and entitlement", body = pb::Dashboard),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
async fn dashboard(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<pb::Dashboard>, ApiError> {
    state
        .service
        .dashboard(&id)
        .map(|d| Json(d.into()))
        .map_err(|e| api_error(e, "Failed to build dashboard"))
}

#[utoipa::path(
    get,
    path = "/users/{id}/consultation-cost",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Cost of the next consultation", body = pb::ConsultationCost),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
async fn consultation_cost(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<pb::ConsultationCost>, ApiError> {
    state
        .service
        .consultation_cost(&id)
        .map(|c| Json(c.into()))
        .map_err(|e| api_error(e, "Failed to compute consultation cost"))
}

#[utoipa::path(
    post,
    path = "/users/{id}/subscription",
    params(("id" = String, Path, description = "User id")),
    request_body = pb::ActivateSubscriptionReq,
    responses(
        (status = 200, description = "Subscription active", body = pb::User),
        (status = 400, description = "Unknown plan or malformed transaction id"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Transaction already recorded")
    )
)]
/// Records a completed plan purchase. Payment capture happens before this call.
#[axum::debug_handler]
async fn activate_subscription(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<pb::ActivateSubscriptionReq>,
) -> Result<Json<pb::User>, ApiError> {
    state
        .service
        .activate_subscription(&id, &req.plan_id, req.transaction_id.as_deref())
        .map(|user| Json(user.into()))
        .map_err(|e| api_error(e, "Failed to activate subscription"))
}

#[utoipa::path(
    get,
    path = "/users/{id}/payments",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Recorded payments, newest first", body = pb::ListPaymentsRes),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
async fn list_payments(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<pb::ListPaymentsRes>, ApiError> {
    state
        .service
        .list_payments(&id)
        .map(|payments| Json(payments_to_pb(payments)))
        .map_err(|e| api_error(e, "Failed to list payments"))
}

#[utoipa::path(
    get,
    path = "/pricing/plans",
    responses(
        (status = 200, description = "Plans on offer", body = pb::ListPricingPlansRes)
    )
)]
#[axum::debug_handler]
async fn list_pricing_plans(State(_state): State<AppState>) -> Json<pb::ListPricingPlansRes> {
    Json(plans_to_pb(pricing_plans()))
}

// ---------------------------------------------------------------------------
// Consultations
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/users/{id}/consultations",
    params(("id" = String, Path, description = "User id")),
    request_body = pb::ConsultationForm,
    responses(
        (status = 201, description = "Consultation stored; analysis withheld while payment is pending", body = pb::Consultation),
        (status = 400, description = "Bad request"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn submit_consultation(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(form): Json<pb::ConsultationForm>,
) -> Result<(StatusCode, Json<pb::Consultation>), ApiError> {
    match state.service.submit_consultation(&id, form.into()) {
        Ok(consultation) => Ok((StatusCode::CREATED, Json(consultation.into()))),
        Err(e) => Err(api_error(e, "Failed to submit consultation")),
    }
}

#[utoipa::path(
    get,
    path = "/users/{id}/consultations",
    params(("id" = String, Path, description = "User id"), PageQuery),
    responses(
        (status = 200, description = "Consultations, newest first", body = pb::ListConsultationsRes),
        (status = 400, description = "Bad page parameters"),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
async fn list_consultations(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<pb::ListConsultationsRes>, ApiError> {
    let page = query.page.unwrap_or(1);
    let per_page = query.per_page.unwrap_or(DEFAULT_PAGE_SIZE);
    state
        .service
        .list_consultations(&id, page, per_page)
        .map(|p| Json(p.into()))
        .map_err(|e| api_error(e, "Failed to list consultations"))
}

#[utoipa::path(
    get,
    path = "/users/{id}/consultations/{cid}",
    params(
        ("id" = String, Path, description = "User id"),
        ("cid" = String, Path, description = "Consultation id")
    ),
    responses(
        (status = 200, description = "Consultation", body = pb::Consultation),
        (status = 404, description = "Consultation not found")
    )
)]
#[axum::debug_handler]
async fn get_consultation(
    State(state): State<AppState>,
    AxumPath((id, cid)): AxumPath<(String, String)>,
) -> Result<Json<pb::Consultation>, ApiError> {
    state
        .service
        .get_consultation(&id, &cid)
        .map(|c| Json(c.into()))
        .map_err(|e| api_error(e, "Failed to read consultation"))
}

#[utoipa::path(
    post,
    path = "/users/{id}/consultations/{cid}/payment",
    params(
        ("id" = String, Path, description = "User id"),
        ("cid" = String, Path, description = "Consultation id")
    ),
    request_body = pb::PayConsultationReq,
    responses(
        (status = 200, description = "Consultation unlocked", body = pb::Consultation),
        (status = 404, description = "Consultation not found"),
        (status = 409, description = "Transaction already recorded")
    )
)]
/// Records payment for a pending consultation. The body, carrying the provider's reference, is
/// optional.
#[axum::debug_handler]
async fn pay_consultation(
    State(state): State<AppState>,
    AxumPath((id, cid)): AxumPath<(String, String)>,
    body: Option<Json<pb::PayConsultationReq>>,
) -> Result<Json<pb::Consultation>, ApiError> {
    let transaction_id = body.and_then(|Json(req)| req.transaction_id);
    state
        .service
        .mark_consultation_paid(&id, &cid, transaction_id.as_deref())
        .map(|c| Json(c.into()))
        .map_err(|e| api_error(e, "Failed to record payment"))
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/users/{id}/sessions",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 201, description = "Session opened", body = pb::ChatSession),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
async fn start_session(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<(StatusCode, Json<pb::ChatSession>), ApiError> {
    match state.service.start_session(&id) {
        Ok(session) => Ok((StatusCode::CREATED, Json(session.into()))),
        Err(e) => Err(api_error(e, "Failed to start chat session")),
    }
}

#[utoipa::path(
    get,
    path = "/users/{id}/sessions",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Sessions, most recently active first", body = pb::ListChatSessionsRes),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
async fn list_sessions(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<pb::ListChatSessionsRes>, ApiError> {
    let sessions = state
        .service
        .list_sessions(&id)
        .map_err(|e| api_error(e, "Failed to list chat sessions"))?;
    Ok(Json(pb::ListChatSessionsRes {
        sessions: sessions.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    delete,
    path = "/users/{id}/sessions/{sid}",
    params(
        ("id" = String, Path, description = "User id"),
        ("sid" = String, Path, description = "Session id")
    ),
    responses(
        (status = 200, description = "Session closed", body = pb::ChatSession),
        (status = 404, description = "Session not found")
    )
)]
#[axum::debug_handler]
async fn close_session(
    State(state): State<AppState>,
    AxumPath((id, sid)): AxumPath<(String, String)>,
) -> Result<Json<pb::ChatSession>, ApiError> {
    state
        .service
        .close_session(&id, &sid)
        .map(|s| Json(s.into()))
        .map_err(|e| api_error(e, "Failed to close chat session"))
}

#[utoipa::path(
    get,
    path = "/users/{id}/sessions/{sid}/messages",
    params(
        ("id" = String, Path, description = "User id"),
        ("sid" = String, Path, description = "Session id")
    ),
    responses(
        (status = 200, description = "Messages in send order", body = pb::ListChatMessagesRes),
        (status = 404, description = "Session not found")
    )
)]
#[axum::debug_handler]
async fn list_messages(
    State(state): State<AppState>,
    AxumPath((id, sid)): AxumPath<(String, String)>,
) -> Result<Json<pb::ListChatMessagesRes>, ApiError> {
    let messages = state
        .service
        .list_messages(&id, &sid)
        .map_err(|e| api_error(e, "Failed to list chat messages"))?;
    Ok(Json(pb::ListChatMessagesRes {
        messages: messages.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/users/{id}/sessions/{sid}/messages",
    params(
        ("id" = String, Path, description = "User id"),
        ("sid" = String, Path, description = "Session id")
    ),
    request_body = pb::ChatMessageBody,
    responses(
        (status = 200, description = "Stored exchange and reply", body = pb::SendChatMessageRes),
        (status = 400, description = "Empty message"),
        (status = 402, description = "Symptom analysis needs payment"),
        (status = 404, description = "Session not found"),
        (status = 409, description = "Session closed")
    )
)]
#[axum::debug_handler]
async fn send_message(
    State(state): State<AppState>,
    AxumPath((id, sid)): AxumPath<(String, String)>,
    Json(body): Json<pb::ChatMessageBody>,
) -> Result<Json<pb::SendChatMessageRes>, ApiError> {
    state
        .service
        .send_message(&id, &sid, &body.message)
        .map(|exchange| Json(exchange.into()))
        .map_err(|e| api_error(e, "Failed to send chat message"))
}

#[utoipa::path(
    post,
    path = "/users/{id}/sessions/{sid}/prescription",
    params(
        ("id" = String, Path, description = "User id"),
        ("sid" = String, Path, description = "Session id")
    ),
    responses(
        (status = 200, description = "Prescription stored in the session", body = pb::PrescriptionRes),
        (status = 404, description = "Session not found"),
        (status = 409, description = "Session closed")
    )
)]
#[axum::debug_handler]
async fn request_prescription(
    State(state): State<AppState>,
    AxumPath((id, sid)): AxumPath<(String, String)>,
) -> Result<Json<pb::PrescriptionRes>, ApiError> {
    state
        .service
        .request_prescription(&id, &sid)
        .map(|rx| Json(rx.into()))
        .map_err(|e| api_error(e, "Failed to write prescription"))
}
