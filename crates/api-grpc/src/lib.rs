//! # API gRPC
//!
//! gRPC server implementation for HealthBot.
//!
//! Handles:
//! - gRPC service setup and API key authentication
//! - The `healthbot.v1.HealthBot` service, delegating to `healthbot-core`
//! - Optional server reflection
//!
//! Uses `api-shared` for the wire types, conversions and error mapping.

#![warn(rust_2018_idioms)]

pub use service::{auth_interceptor, pb, HealthBotGrpc};

pub mod service;

use api_shared::FILE_DESCRIPTOR_SET;
use healthbot_core::HealthBotService;
use pb::health_bot_server::HealthBotServer;
use std::net::SocketAddr;
use tonic::transport::Server;

pub const GRPC_ADDR_ENV: &str = "HEALTHBOT_GRPC_ADDR";
pub const DEFAULT_GRPC_ADDR: &str = "0.0.0.0:50051";
pub const ENABLE_REFLECTION_ENV: &str = "HEALTHBOT_ENABLE_REFLECTION";

/// Serves the gRPC API on `addr` until the server fails.
pub async fn serve(service: HealthBotService, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("-- Starting HealthBot gRPC on {}", addr);

    let svc = HealthBotServer::with_interceptor(HealthBotGrpc::new(service), auth_interceptor);
    let mut router = Server::builder().add_service(svc);

    if std::env::var(ENABLE_REFLECTION_ENV).unwrap_or_else(|_| "false".to_string()) == "true" {
        let reflection_service = tonic_reflection::server::Builder::configure()
            .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
            .build_v1()?;
        router = router.add_service(reflection_service);
        tracing::info!("gRPC server reflection enabled");
    } else {
        tracing::info!("gRPC server reflection disabled");
    }

    router.serve(addr).await?;
    Ok(())
}
