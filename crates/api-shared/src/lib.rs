//! # API Shared
//!
//! Shared utilities and definitions for the HealthBot APIs.
//!
//! Contains:
//! - Protobuf-generated types (`pb` module), used on the gRPC wire and as REST JSON bodies
//! - Conversions between `healthbot-core` records and the wire types
//! - Classification of core errors into transport-neutral kinds
//! - Shared services like `HealthService`, API key checking
//!
//! Used by `api-grpc` and `api-rest` for common functionality.

// The generated code is placed into OUT_DIR at build time by the build script.
pub mod pb {
    tonic::include_proto!("healthbot.v1");
}

pub mod auth;
pub mod convert;
pub mod errors;
pub mod health;

pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("proto_descriptor");

pub use healthbot_core::config::service_from_env;
pub use errors::{classify, ErrorKind};
pub use health::HealthService;
pub use pb::*;
