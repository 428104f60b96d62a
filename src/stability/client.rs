//! REST API client for the Stability image-editing service

use super::options::{OutputFormat, RelightOptions};
use super::types::{
    AcceptMode, ErrorResponse, PollOutcome, ResultPayload, StructuredResult, SubmitResponse,
};
use crate::config::ApiConfig;
use crate::error::{RelightError, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

const RELIGHT_PATH: &str = "/v2beta/stable-image/edit/replace-background-and-relight";
const REMOVE_BACKGROUND_PATH: &str = "/v2beta/stable-image/edit/remove-background";

/// Connect timeout for all requests
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Read timeout for submissions; generation endpoints can be slow to accept
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(90);

/// Read timeout for a single result poll
const POLL_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for job submission and result retrieval
#[derive(Debug, Clone)]
pub struct StabilityClient {
    base_url: String,
    client: Client,
}

impl StabilityClient {
    /// Create a new client for the given API configuration
    pub fn new(config: &ApiConfig) -> Self {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .expect("API key contains invalid header characters");
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            "stability-client-id",
            HeaderValue::from_static(env!("CARGO_PKG_NAME")),
        );
        headers.insert(
            "stability-client-version",
            HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
        );

        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(SUBMIT_TIMEOUT)
            .default_headers(headers)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            base_url: config.host_trimmed().to_string(),
            client,
        }
    }

    /// Submit a replace-background-and-relight job.
    ///
    /// Returns the job identifier the service issued. The identifier is the
    /// exact token to use for every subsequent result request.
    pub async fn submit_relight(
        &self,
        image: Vec<u8>,
        file_name: &str,
        options: &RelightOptions,
    ) -> Result<String> {
        options.validate()?;
        if image.is_empty() {
            return Err(RelightError::Validation(
                "subject image is empty".to_string(),
            ));
        }

        let url = format!("{}{}", self.base_url, RELIGHT_PATH);
        let mut form = Form::new().part(
            "subject_image",
            Part::bytes(image).file_name(file_name.to_string()),
        );
        for (name, value) in options.form_fields() {
            form = form.text(name, value);
        }

        debug!("Submitting relight job to {}", url);
        let response = self
            .client
            .post(&url)
            .header("accept", "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport(&url, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = remote_message(response).await;
            return Err(RelightError::Submission(format!(
                "status {}: {}",
                status, message
            )));
        }

        let submit: SubmitResponse = response
            .json()
            .await
            .map_err(|e| transport(&url, e))?;

        if submit.id.trim().is_empty() {
            return Err(RelightError::UnrecognizedPayload(
                "submission response carried an empty job id".to_string(),
            ));
        }

        Ok(submit.id)
    }

    /// Fetch the result of a previously submitted job.
    ///
    /// 202 and 404 are both non-terminal: a freshly created job may not be
    /// visible at the result endpoint yet. Any other non-success status is
    /// fatal and carries the remote diagnostic.
    pub async fn fetch_result(&self, job_id: &str, accept: AcceptMode) -> Result<PollOutcome> {
        let url = self.result_url(job_id);

        debug!("Polling {} (accept: {})", url, accept.header_value());
        let response = self
            .client
            .get(&url)
            .header("accept", accept.header_value())
            .timeout(POLL_TIMEOUT)
            .send()
            .await
            .map_err(|e| poll_transport(&url, e))?;

        match response.status() {
            StatusCode::ACCEPTED => Ok(PollOutcome::Pending),
            StatusCode::NOT_FOUND => Ok(PollOutcome::NotFound),
            status if status.is_success() => {
                match self.classify_body(&url, response).await? {
                    Some(payload) => Ok(PollOutcome::Ready(payload)),
                    // Ambiguous body: re-request once, forcing raw image bytes.
                    None => self.refetch_as_image(&url).await,
                }
            }
            status => {
                let message = remote_message(response).await;
                Err(RelightError::Remote {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    /// Remove the background of an image. This endpoint is synchronous: the
    /// finished image comes back in the response body.
    pub async fn remove_background(
        &self,
        image: Vec<u8>,
        file_name: &str,
        output_format: OutputFormat,
    ) -> Result<Vec<u8>> {
        if image.is_empty() {
            return Err(RelightError::Validation(
                "subject image is empty".to_string(),
            ));
        }

        let url = format!("{}{}", self.base_url, REMOVE_BACKGROUND_PATH);
        let form = Form::new()
            .part("image", Part::bytes(image).file_name(file_name.to_string()))
            .text("output_format", output_format.as_str());

        debug!("Submitting remove-background request to {}", url);
        let response = self
            .client
            .post(&url)
            .header("accept", "image/*")
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport(&url, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = remote_message(response).await;
            return Err(RelightError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        let content_type = content_type_of(&response);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport(&url, e))?
            .to_vec();

        if !content_type.starts_with("image/") {
            return Err(RelightError::UnrecognizedPayload(format!(
                "expected image bytes, got content type \"{}\"",
                content_type
            )));
        }

        Ok(bytes)
    }

    fn result_url(&self, job_id: &str) -> String {
        format!("{}{}/result/{}", self.base_url, RELIGHT_PATH, job_id)
    }

    /// Decide what a 200 body actually is. The declared content type is a
    /// hint, not a promise: the body wins.
    async fn classify_body(
        &self,
        url: &str,
        response: Response,
    ) -> Result<Option<ResultPayload>> {
        let content_type = content_type_of(&response);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| poll_transport(url, e))?
            .to_vec();

        if content_type.starts_with("image/") {
            return Ok(Some(ResultPayload::Binary {
                content_type,
                bytes,
            }));
        }

        if let Ok(structured) = serde_json::from_slice::<StructuredResult>(&bytes) {
            if !structured.artifacts.is_empty() || content_type.contains("json") {
                return Ok(Some(ResultPayload::Structured(structured)));
            }
        }

        warn!(
            "Result body is neither an image nor structured artifacts (content type \"{}\")",
            content_type
        );
        Ok(None)
    }

    /// Second-chance request after an ambiguous body: force image encoding.
    async fn refetch_as_image(&self, url: &str) -> Result<PollOutcome> {
        let response = self
            .client
            .get(url)
            .header("accept", AcceptMode::Image.header_value())
            .timeout(POLL_TIMEOUT)
            .send()
            .await
            .map_err(|e| poll_transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = remote_message(response).await;
            return Err(RelightError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        let content_type = content_type_of(&response);
        if content_type.starts_with("image/") {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| poll_transport(url, e))?
                .to_vec();
            return Ok(PollOutcome::Ready(ResultPayload::Binary {
                content_type,
                bytes,
            }));
        }

        Err(RelightError::UnrecognizedPayload(format!(
            "service returned content type \"{}\" even when asked for image bytes",
            content_type
        )))
    }
}

#[async_trait::async_trait]
impl crate::poller::ResultSource for StabilityClient {
    async fn poll(&self, job_id: &str, accept: AcceptMode) -> Result<PollOutcome> {
        self.fetch_result(job_id, accept).await
    }
}

fn transport(url: &str, source: reqwest::Error) -> RelightError {
    RelightError::Transport {
        url: url.to_string(),
        source,
    }
}

/// Transport failures during a poll consume one attempt instead of the whole
/// session when they are timeouts or connection errors.
fn poll_transport(url: &str, source: reqwest::Error) -> RelightError {
    if source.is_timeout() || source.is_connect() {
        RelightError::TransientPoll(format!("request to {} failed: {}", url, source))
    } else {
        transport(url, source)
    }
}

fn content_type_of(response: &Response) -> String {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Read the remote diagnostic, flattening the structured error shape when it
/// parses and keeping the raw body verbatim when it does not.
async fn remote_message(response: Response) -> String {
    let raw = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&raw) {
        Ok(parsed) => parsed.into_message(&raw),
        Err(_) => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::stability::options::RelightOptions;

    fn test_client() -> StabilityClient {
        StabilityClient::new(&ApiConfig::new("sk-test"))
    }

    #[test]
    fn result_url_uses_single_documented_endpoint() {
        let client = test_client();
        assert_eq!(
            client.result_url("abc123"),
            "https://api.stability.ai/v2beta/stable-image/edit/replace-background-and-relight/result/abc123"
        );
    }

    #[test]
    fn host_override_reflected_in_urls() {
        let mut config = ApiConfig::new("sk-test");
        config.host = "http://localhost:8080/".to_string();
        let client = StabilityClient::new(&config);
        assert_eq!(
            client.result_url("abc123"),
            "http://localhost:8080/v2beta/stable-image/edit/replace-background-and-relight/result/abc123"
        );
    }

    #[tokio::test]
    async fn empty_image_rejected_before_network() {
        let client = test_client();
        let options = RelightOptions {
            background_prompt: Some("white studio".to_string()),
            ..Default::default()
        };
        let result = client.submit_relight(Vec::new(), "empty.png", &options).await;
        assert!(matches!(result, Err(RelightError::Validation(_))));
    }

    #[tokio::test]
    async fn invalid_options_rejected_before_network() {
        let client = test_client();
        let options = RelightOptions::default();
        let result = client
            .submit_relight(vec![0u8; 16], "subject.png", &options)
            .await;
        assert!(matches!(result, Err(RelightError::Validation(_))));
    }

    #[tokio::test]
    #[ignore] // Requires a live API key in STABILITY_API_KEY
    async fn live_submit_and_poll() {
        dotenvy::dotenv().ok();
        let config = ApiConfig::from_env().unwrap();
        let client = StabilityClient::new(&config);
        let image = std::fs::read("tests/fixtures/subject.png").unwrap();
        let options = RelightOptions {
            background_prompt: Some("white studio backdrop".to_string()),
            ..Default::default()
        };
        let job_id = client
            .submit_relight(image, "subject.png", &options)
            .await
            .unwrap();
        assert!(!job_id.is_empty());

        let outcome = client.fetch_result(&job_id, AcceptMode::Either).await.unwrap();
        match outcome {
            PollOutcome::Ready(_) | PollOutcome::Pending | PollOutcome::NotFound => {}
        }
    }
}
