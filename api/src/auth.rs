use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::state::AppState;

/// Extractor enforcing the `x-api-key` header on approval routes.
///
/// A missing or incorrect key fails with 401 before validation runs. When
/// no key is configured the check is skipped entirely (dev mode).
pub struct ApiKeyAuth;

pub fn verify_api_key(expected: Option<&str>, provided: Option<&str>) -> Result<(), AppError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    match provided {
        Some(provided) if provided == expected => Ok(()),
        _ => Err(AppError::Unauthorized {
            message: "Invalid or missing x-api-key header".to_string(),
        }),
    }
}

impl FromRequestParts<AppState> for ApiKeyAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok());
        verify_api_key(state.api_key.as_deref(), provided)?;
        Ok(ApiKeyAuth)
    }
}

#[cfg(test)]
mod tests {
    use super::verify_api_key;

    #[test]
    fn no_configured_key_skips_auth() {
        assert!(verify_api_key(None, None).is_ok());
        assert!(verify_api_key(None, Some("anything")).is_ok());
    }

    #[test]
    fn missing_key_is_unauthorized() {
        assert!(verify_api_key(Some("secret"), None).is_err());
    }

    #[test]
    fn wrong_key_is_unauthorized() {
        assert!(verify_api_key(Some("secret"), Some("guess")).is_err());
    }

    #[test]
    fn correct_key_passes() {
        assert!(verify_api_key(Some("secret"), Some("secret")).is_ok());
    }
}
