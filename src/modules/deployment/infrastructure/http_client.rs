use crate::modules::deployment::domain::{
    DeploymentClient, DeploymentStatus, JobHandle, UpsertRequest,
};
use crate::shared::config::AppConfig;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::{LogContext, TimedOperation};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};

const USER_AGENT: &str = concat!("metaload/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the metadata loader service
///
/// `POST {base}/upsert` schedules a deployment and answers with a JSON string
/// handle (or `null`); `GET {base}/deployments/{handle}` answers with a
/// `DeploymentStatus`. No call is retried.
pub struct HttpDeploymentClient {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl HttpDeploymentClient {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                AppError::ExternalServiceError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.service_base_url.clone(),
            access_token: config.access_token.clone(),
        })
    }

    fn upsert_url(&self) -> String {
        format!("{}/upsert", self.base_url)
    }

    fn status_url(&self, handle: &JobHandle) -> String {
        format!(
            "{}/deployments/{}",
            self.base_url,
            urlencoding::encode(handle.as_str())
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn check_status(response: Response) -> AppResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AppError::Unauthorized(
                format!("Deployment service rejected credentials ({})", status),
            )),
            StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::BAD_GATEWAY
            | StatusCode::GATEWAY_TIMEOUT => Err(AppError::ExternalServiceError(format!(
                "Deployment service unavailable ({})",
                status
            ))),
            _ => Err(AppError::ApiError(format!(
                "Unexpected status code from deployment service: {}",
                status
            ))),
        }
    }
}

#[async_trait]
impl DeploymentClient for HttpDeploymentClient {
    async fn upsert_records(&self, request: &UpsertRequest) -> AppResult<Option<String>> {
        let url = self.upsert_url();
        LogContext::api_call(&url, "POST", None);
        let timer = TimedOperation::new("upsert_records");

        let response = self
            .authorize(self.client.post(&url).json(request))
            .send()
            .await?;
        let body = Self::check_status(response)?.text().await?;

        timer.finish_with_info(&format!("{} records", request.records.len()));
        parse_handle_body(&body)
    }

    async fn check_deployment(&self, handle: &JobHandle) -> AppResult<DeploymentStatus> {
        let url = self.status_url(handle);
        LogContext::api_call(&url, "GET", None);

        let response = self.authorize(self.client.get(&url)).send().await?;
        let status = Self::check_status(response)?
            .json::<DeploymentStatus>()
            .await?;

        Ok(status)
    }
}

/// Interpret the upsert response body; empty and `null` bodies carry no handle
fn parse_handle_body(body: &str) -> AppResult<Option<String>> {
    let body = body.trim();
    if body.is_empty() {
        return Ok(None);
    }
    Ok(serde_json::from_str::<Option<String>>(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_handle_body() {
        assert_eq!(
            parse_handle_body(r#""0AfB000000abcDE""#).unwrap(),
            Some("0AfB000000abcDE".to_string())
        );
        assert_eq!(parse_handle_body("null").unwrap(), None);
        assert_eq!(parse_handle_body("  ").unwrap(), None);
        assert_eq!(parse_handle_body(r#""""#).unwrap(), Some(String::new()));
    }

    #[test]
    fn test_parse_handle_body_rejects_objects() {
        let err = parse_handle_body(r#"{"id": 1}"#).unwrap_err();
        assert!(matches!(err, AppError::SerializationError(_)));
    }

    #[test]
    fn test_urls_are_built_from_base() {
        let config = AppConfig {
            service_base_url: "https://example.test/cmd".to_string(),
            ..AppConfig::default()
        };
        let client = HttpDeploymentClient::new(&config).unwrap();

        assert_eq!(client.upsert_url(), "https://example.test/cmd/upsert");
        assert_eq!(
            client.status_url(&JobHandle::new("a b/c")),
            "https://example.test/cmd/deployments/a%20b%2Fc"
        );
    }
}
