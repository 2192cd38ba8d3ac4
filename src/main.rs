use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_grpc::{DEFAULT_GRPC_ADDR, GRPC_ADDR_ENV};
use api_rest::{DEFAULT_REST_ADDR, REST_ADDR_ENV};

/// Main entry point for HealthBot
///
/// Starts both gRPC and REST servers concurrently over one shared service:
/// - gRPC server on port 50051 (configurable via HEALTHBOT_GRPC_ADDR)
/// - REST server on port 3000 (configurable via HEALTHBOT_REST_ADDR)
///
/// The gRPC server requires authentication via the x-api-key header.
///
/// # Environment Variables
/// - `HEALTHBOT_GRPC_ADDR`, `HEALTHBOT_REST_ADDR`: listen addresses
/// - `HEALTHBOT_DATA_DIR`: record storage (default: "healthbot_data")
/// - `HEALTHBOT_KNOWLEDGE_FILE`: optional YAML symptom table
/// - `HEALTHBOT_FREE_CONSULTATIONS`, `HEALTHBOT_CONSULTATION_PRICE`: billing defaults
/// - `API_KEY`: API key for gRPC authentication
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("healthbot=info".parse()?)
                .add_directive("api_grpc=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let grpc_addr: SocketAddr = std::env::var(GRPC_ADDR_ENV)
        .unwrap_or_else(|_| DEFAULT_GRPC_ADDR.into())
        .parse()?;
    let rest_addr = std::env::var(REST_ADDR_ENV).unwrap_or_else(|_| DEFAULT_REST_ADDR.into());

    let service = api_shared::service_from_env()?;

    let rest_service = service.clone();
    let rest_server = tokio::spawn(async move { api_rest::serve(rest_service, &rest_addr).await });
    let grpc_server = api_grpc::serve(service, grpc_addr);

    // Run both; either failing stops the process.
    let (rest_result, grpc_result) = tokio::join!(rest_server, grpc_server);
    rest_result??;
    grpc_result?;

    Ok(())
}
