use std::fs;

use axum::http::HeaderMap;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::core::config::AppPaths;
use crate::core::errors::ApiError;

const API_TOKEN_HEADER: &str = "x-api-token";

#[derive(Debug, Clone)]
pub struct ApiToken {
    value: String,
}

impl ApiToken {
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Resolves the API token for `POST /chat`. A configured value wins;
/// otherwise a generated token is persisted in the data dir so restarts keep
/// the same secret.
pub fn init_api_token(configured: Option<&str>, paths: &AppPaths) -> ApiToken {
    if let Some(token) = configured {
        if !token.trim().is_empty() {
            return ApiToken {
                value: token.trim().to_string(),
            };
        }
    }

    if let Ok(existing) = fs::read_to_string(&paths.token_path) {
        let existing = existing.trim().to_string();
        if !existing.is_empty() {
            return ApiToken { value: existing };
        }
    }

    let token = format!("{}{}", Uuid::new_v4(), Uuid::new_v4());
    if let Err(err) = fs::write(&paths.token_path, &token) {
        tracing::warn!("Failed to persist generated API token: {}", err);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = fs::metadata(&paths.token_path) {
            let mut perms = metadata.permissions();
            perms.set_mode(0o600);
            let _ = fs::set_permissions(&paths.token_path, perms);
        }
    }

    tracing::warn!(
        "No API token configured; generated one at {}",
        paths.token_path.display()
    );
    ApiToken { value: token }
}

/// Constant-time check of the `X-API-TOKEN` header. Missing or mismatching
/// tokens are both rejected the same way.
pub fn require_api_token(headers: &HeaderMap, expected: &ApiToken) -> Result<(), ApiError> {
    let header_value = headers
        .get(API_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if header_value.is_empty() {
        return Err(ApiError::Forbidden);
    }

    let matches: bool = header_value
        .as_bytes()
        .ct_eq(expected.value.as_bytes())
        .into();
    if !matches {
        return Err(ApiError::Forbidden);
    }

    Ok(())
}
