//! HTTP client for OpenAI-completions-compatible inference endpoints.
//!
//! Mirrors how a human operator drives such an endpoint: list the available
//! models first, take the first entry's id, then issue the completion call
//! with `Authorization: Bearer EMPTY`. Every request — success or failure —
//! produces a fully populated [`DebugEntry`] for the session trace.

use std::time::Duration;

use fimpad_protocol::CandidateSet;
use fimpad_protocol::CompletionError;
use fimpad_protocol::DebugEntry;
use fimpad_protocol::FimPrompt;
use fimpad_protocol::ModelConfig;
use serde::Deserialize;
use serde::Serialize;

/// Placeholder credential: the endpoint requires the header but no real key.
const BEARER_TOKEN: &str = "EMPTY";

#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
}

impl CompletionClient {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("fimpad/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { http })
    }

    /// Issue one completion request for a framed prompt.
    ///
    /// Returns the typed outcome plus the trace entry describing the attempt.
    /// Failures never escape as panics or raw transport errors.
    pub async fn request(
        &self,
        prompt: &FimPrompt,
        model: &ModelConfig,
    ) -> (Result<CandidateSet, CompletionError>, DebugEntry) {
        let base_url = model.base_url();
        let mut debug = DebugEntry::new(
            model.endpoint.clone(),
            prompt.as_str(),
            format!("{base_url}/completions"),
            serde_json::json!({ "prompt": prompt.as_str() }),
        );
        debug.model_label = Some(model.name.clone());

        let result = self.try_request(prompt, model, &base_url, &mut debug).await;
        match &result {
            Ok(candidates) => {
                debug.candidates = candidates.iter().map(str::to_string).collect();
            }
            Err(err) => {
                debug.error = Some(err.to_string());
                if debug.status_code.is_none() {
                    debug.status_code = err.status();
                }
            }
        }
        (result, debug)
    }

    async fn try_request(
        &self,
        prompt: &FimPrompt,
        model: &ModelConfig,
        base_url: &str,
        debug: &mut DebugEntry,
    ) -> Result<CandidateSet, CompletionError> {
        let model_id = self.discover_model(base_url).await?;
        debug.model_label = Some(format!("{} ({model_id})", model.name));

        let body = CompletionCallBody {
            model: model_id,
            prompt: prompt.as_str().to_string(),
            echo: false,
            n: model.candidate_count(),
            logprobs: model.logprobs(),
            max_tokens: model.max_tokens(),
            temperature: model.temperature(),
            top_p: model.top_p(),
        };
        debug.request_body = serde_json::to_value(&body).unwrap_or(serde_json::Value::Null);

        let response = self
            .http
            .post(format!("{base_url}/completions"))
            .bearer_auth(BEARER_TOKEN)
            .json(&body)
            .send()
            .await
            .map_err(|err| CompletionError::EndpointUnavailable {
                message: err.to_string(),
            })?;

        let status = response.status();
        debug.status_code = Some(status.as_u16());
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CompletionError::BadResponse {
                status: Some(status.as_u16()),
                message: format!("completion call failed: {message}"),
            });
        }

        let payload: CompletionResponse =
            response
                .json()
                .await
                .map_err(|err| CompletionError::BadResponse {
                    status: Some(status.as_u16()),
                    message: format!("malformed completion payload: {err}"),
                })?;

        // Backend order is the ranking; only blank candidates are dropped.
        Ok(CandidateSet::from_raw(
            payload
                .choices
                .into_iter()
                .map(|choice| choice.text.unwrap_or_default()),
        ))
    }

    /// Resolve the backend's active model id: `GET {base_url}/models`, first
    /// entry wins. A transport failure here is `EndpointUnavailable`; an
    /// unusable listing is `ModelDiscoveryFailed`, so the two are
    /// distinguishable downstream.
    async fn discover_model(&self, base_url: &str) -> Result<String, CompletionError> {
        let response = self
            .http
            .get(format!("{base_url}/models"))
            .bearer_auth(BEARER_TOKEN)
            .send()
            .await
            .map_err(|err| CompletionError::EndpointUnavailable {
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CompletionError::ModelDiscoveryFailed {
                message: format!("model listing returned status {status}"),
            });
        }

        let payload: ModelsResponse =
            response
                .json()
                .await
                .map_err(|err| CompletionError::ModelDiscoveryFailed {
                    message: format!("malformed model listing: {err}"),
                })?;

        payload
            .data
            .into_iter()
            .next()
            .map(|model| model.id)
            .ok_or_else(|| CompletionError::ModelDiscoveryFailed {
                message: "model listing is empty".to_string(),
            })
    }
}

#[derive(Debug, Serialize)]
struct CompletionCallBody {
    model: String,
    prompt: String,
    echo: bool,
    n: u32,
    logprobs: u32,
    max_tokens: u32,
    temperature: f64,
    top_p: f64,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
struct ModelInfo {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use wiremock::Mock;
    use wiremock::MockServer;
    use wiremock::ResponseTemplate;
    use wiremock::matchers::body_partial_json;
    use wiremock::matchers::header;
    use wiremock::matchers::method;
    use wiremock::matchers::path;

    fn model_for(server: &MockServer) -> ModelConfig {
        ModelConfig {
            name: "StarCoder2 7B".to_string(),
            endpoint: server.uri(),
            api_path: "/v1".to_string(),
            enabled: true,
            max_tokens: None,
            temperature: None,
            top_p: None,
            n: Some(2),
            logprobs: None,
        }
    }

    fn client() -> CompletionClient {
        CompletionClient::new(Duration::from_secs(5)).expect("build client")
    }

    async fn mount_models(server: &MockServer, ids: &[&str]) {
        let data: Vec<_> = ids
            .iter()
            .map(|id| serde_json::json!({ "id": id }))
            .collect();
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .and(header("authorization", "Bearer EMPTY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": data,
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn discovers_first_model_and_extracts_ordered_candidates() {
        let server = MockServer::start().await;
        mount_models(&server, &["starcoder2-7b", "other-model"]).await;
        Mock::given(method("POST"))
            .and(path("/v1/completions"))
            .and(body_partial_json(serde_json::json!({
                "model": "starcoder2-7b",
                "echo": false,
                "n": 2,
                "logprobs": 3,
                "max_tokens": 256,
                "temperature": 0.2,
                "top_p": 0.95,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [
                    { "text": "Math.PI * radius * radius;" },
                    { "text": "   " },
                    { "text": "radius * radius * 3.14;" },
                ],
            })))
            .mount(&server)
            .await;

        let prompt = FimPrompt::frame("return ", 7);
        let (result, debug) = client().request(&prompt, &model_for(&server)).await;

        let candidates = result.expect("candidates");
        assert_eq!(
            candidates.iter().collect::<Vec<_>>(),
            vec!["Math.PI * radius * radius;", "radius * radius * 3.14;"]
        );
        assert_eq!(debug.status_code, Some(200));
        assert_eq!(debug.error, None);
        assert_eq!(
            debug.model_label.as_deref(),
            Some("StarCoder2 7B (starcoder2-7b)")
        );
        assert_eq!(debug.candidates.len(), 2);
        assert_eq!(debug.prompt, prompt.as_str());
        assert_eq!(debug.request_url, format!("{}/v1/completions", server.uri()));
        assert_eq!(debug.request_body["prompt"], prompt.as_str());
    }

    #[tokio::test]
    async fn empty_model_listing_is_a_discovery_failure() {
        let server = MockServer::start().await;
        mount_models(&server, &[]).await;

        let prompt = FimPrompt::frame("x", 1);
        let (result, debug) = client().request(&prompt, &model_for(&server)).await;

        let err = result.expect_err("discovery failure");
        assert!(matches!(err, CompletionError::ModelDiscoveryFailed { .. }));
        assert!(debug.error.expect("error recorded").contains("empty"));
        // Original model name is kept when discovery never resolved an id.
        assert_eq!(debug.model_label.as_deref(), Some("StarCoder2 7B"));
    }

    #[tokio::test]
    async fn completion_error_status_is_surfaced_as_bad_response() {
        let server = MockServer::start().await;
        mount_models(&server, &["starcoder2-7b"]).await;
        Mock::given(method("POST"))
            .and(path("/v1/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend exploded"))
            .mount(&server)
            .await;

        let prompt = FimPrompt::frame("x", 1);
        let (result, debug) = client().request(&prompt, &model_for(&server)).await;

        let err = result.expect_err("completion failure");
        assert_eq!(err.status(), Some(500));
        assert!(matches!(err, CompletionError::BadResponse { .. }));
        assert_eq!(debug.status_code, Some(500));
        assert!(
            debug
                .error
                .expect("error recorded")
                .contains("backend exploded")
        );
    }

    #[tokio::test]
    async fn transport_failure_has_no_status_and_populates_trace() {
        // Nothing listens here; the connection is refused.
        let model = ModelConfig {
            name: "Unreachable".to_string(),
            endpoint: "http://127.0.0.1:1".to_string(),
            api_path: "/v1".to_string(),
            enabled: true,
            max_tokens: None,
            temperature: None,
            top_p: None,
            n: None,
            logprobs: None,
        };

        let prompt = FimPrompt::frame("x", 1);
        let (result, debug) = client().request(&prompt, &model).await;

        let err = result.expect_err("transport failure");
        assert!(matches!(err, CompletionError::EndpointUnavailable { .. }));
        assert_eq!(err.status(), None);
        assert_eq!(debug.status_code, None);
        assert!(debug.error.is_some());
        assert!(debug.candidates.is_empty());
    }
}
