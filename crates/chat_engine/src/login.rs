use std::time::Duration;

use chat_logging::chat_info;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use url::Url;

use crate::protocol::{LoginRequest, LoginResponse};
use crate::transport::endpoint_url;
use crate::types::map_reqwest_error;
use crate::{ChatError, FailureKind};

const LOGIN_PATH: &str = "api/auth/login";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub success: bool,
    pub error: Option<String>,
}

/// Password check against the login endpoint.
#[derive(Debug, Clone)]
pub struct LoginClient {
    endpoint: Url,
    client: reqwest::Client,
}

impl LoginClient {
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self, ChatError> {
        let endpoint = endpoint_url(server_url, LOGIN_PATH)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ChatError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { endpoint, client })
    }

    /// A rejected password is an `Ok` outcome; only transport trouble and
    /// unexpected statuses are errors.
    pub async fn login(&self, password: &str) -> Result<LoginOutcome, ChatError> {
        let body = serde_json::to_vec(&LoginRequest {
            password: password.to_string(),
        })
        .map_err(|err| ChatError::new(FailureKind::Protocol, err.to_string()))?;
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() && status != StatusCode::UNAUTHORIZED {
            return Err(ChatError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        let parsed: LoginResponse = serde_json::from_slice(&bytes)
            .map_err(|err| ChatError::new(FailureKind::Protocol, err.to_string()))?;
        chat_info!("login answered {} success={}", status.as_u16(), parsed.success);
        Ok(LoginOutcome {
            success: parsed.success && status.is_success(),
            error: parsed.error,
        })
    }
}
