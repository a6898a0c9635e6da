//! Shared-secret verification for the vision telemetry webhook.
//!
//! The vision pipeline authenticates with a pre-shared secret carried in a
//! request header. Comparison is constant-time so response timing leaks
//! nothing about the expected value.

use axum::http::HeaderMap;

use crate::error::ApiError;

/// Header carrying the pre-shared webhook secret.
pub const VISION_SECRET_HEADER: &str = "x-vision-secret";

/// The secret accepted as valid for this server instance.
#[derive(Clone)]
pub struct VisionAuth {
  pub secret: String,
}

/// Verify the shared secret from the request headers.
pub fn verify_secret(headers: &HeaderMap, auth: &VisionAuth) -> Result<(), ApiError> {
  let presented = headers
    .get(VISION_SECRET_HEADER)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  if !constant_time_eq(presented.as_bytes(), auth.secret.as_bytes()) {
    return Err(ApiError::Unauthorized);
  }
  Ok(())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
  if a.len() != b.len() {
    return false;
  }
  a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
  use axum::http::{HeaderMap, HeaderValue};

  use super::*;

  fn auth() -> VisionAuth {
    VisionAuth {
      secret: "topsecret".to_string(),
    }
  }

  fn headers(value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(VISION_SECRET_HEADER, HeaderValue::from_str(value).unwrap());
    headers
  }

  #[test]
  fn correct_secret() {
    assert!(verify_secret(&headers("topsecret"), &auth()).is_ok());
  }

  #[test]
  fn wrong_secret() {
    assert!(matches!(
      verify_secret(&headers("nope"), &auth()),
      Err(ApiError::Unauthorized)
    ));
  }

  #[test]
  fn missing_header() {
    assert!(matches!(
      verify_secret(&HeaderMap::new(), &auth()),
      Err(ApiError::Unauthorized)
    ));
  }

  #[test]
  fn prefix_of_secret_is_rejected() {
    assert!(verify_secret(&headers("topsecre"), &auth()).is_err());
  }
}
