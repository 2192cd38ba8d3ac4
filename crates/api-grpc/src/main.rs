use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_grpc::{DEFAULT_GRPC_ADDR, GRPC_ADDR_ENV};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("healthbot=info".parse()?)
                .add_directive("api_grpc=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr: SocketAddr = std::env::var(GRPC_ADDR_ENV)
        .unwrap_or_else(|_| DEFAULT_GRPC_ADDR.into())
        .parse()?;

    let service = api_shared::service_from_env()?;
    api_grpc::serve(service, addr).await
}
