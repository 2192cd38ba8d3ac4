use std::env;

/// Metadata key / header that carries the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Checks a caller-supplied API key against `API_KEY` from the environment.
///
/// A missing `API_KEY` is a server misconfiguration and reported as internal, not as a
/// client error.
#[allow(clippy::result_large_err)]
pub fn validate_api_key(provided_key: &str) -> Result<(), tonic::Status> {
    let expected_key = env::var("API_KEY")
        .map_err(|_| tonic::Status::internal("API_KEY not set in environment"))?;

    if !expected_key.is_empty() && provided_key == expected_key {
        Ok(())
    } else {
        Err(tonic::Status::unauthenticated("Invalid API key"))
    }
}
