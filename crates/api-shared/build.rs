//! Build script for the `api-shared` crate.
//!
//! ## Purpose
//! Generates Rust protobuf types from `healthbot.proto` and emits a file-descriptor set.
//!
//! ## Intended use
//! The generated types are the wire format of both APIs: gRPC serves them directly and the REST
//! API uses them as JSON bodies, which is why every message also derives serde and a utoipa
//! schema. The descriptor set backs gRPC reflection.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let manifest_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    let proto_file = manifest_dir.join("healthbot.proto");
    let descriptor_path =
        std::path::Path::new(&std::env::var("OUT_DIR")?).join("proto_descriptor.bin");

    println!("cargo:rerun-if-changed={}", proto_file.display());
    tonic_build::configure()
        .build_server(true)
        .build_client(false)
        // Older protoc releases still gate `optional` scalars behind this flag.
        .protoc_arg("--experimental_allow_proto3_optional")
        .type_attribute(
            ".healthbot.v1",
            "#[derive(serde::Serialize, serde::Deserialize, utoipa::ToSchema)]",
        )
        .type_attribute(".healthbot.v1", "#[serde(default)]")
        .file_descriptor_set_path(descriptor_path)
        .compile_protos(std::slice::from_ref(&proto_file), &[manifest_dir])?;

    Ok(())
}
