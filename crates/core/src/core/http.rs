//! reqwest-backed client for the GA service's JSON API.

use std::time::Duration;

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::client::GaService;
use crate::error::ClientError;
use crate::types::{
    BestResponse, CompletionResponse, EvolveRequest, EvolveResponse, HistoryEntry, Individual,
    InitializeRequest, InitializeResponse, PopulationResponse, ServiceInfo, Statistics,
    StatusResponse,
};

/// Longest slice of an error body kept in [`ClientError::Status`].
const MAX_ERROR_BODY: usize = 256;

#[derive(Debug, Clone)]
pub struct HttpGaClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpGaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, None)
    }

    /// `timeout` applies per request on native targets; browsers manage their own.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Option<Duration>) -> Self {
        let builder = reqwest::Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = match timeout {
            Some(t) => builder.timeout(t),
            None => builder,
        };
        #[cfg(target_arch = "wasm32")]
        let _ = timeout;

        let http = builder.build().unwrap_or_else(|e| {
            debug!("falling back to default HTTP client: {e}");
            reqwest::Client::new()
        });

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /`: name, version and endpoint list of the service.
    pub async fn info(&self) -> Result<ServiceInfo, ClientError> {
        self.get("/").await
    }

    /// `GET /population`: the `count` fittest individuals of the current generation.
    pub async fn population(&self, count: u32) -> Result<PopulationResponse, ClientError> {
        let endpoint = "/population";
        let resp = self
            .http
            .get(self.url(endpoint))
            .query(&[("count", count)])
            .send()
            .await
            .map_err(|e| transport(endpoint, e))?;
        read(endpoint, resp).await
    }

    pub async fn statistics(&self) -> Result<Statistics, ClientError> {
        self.get("/statistics").await
    }

    /// `GET /is-complete`.
    pub async fn completion(&self) -> Result<CompletionResponse, ClientError> {
        self.get("/is-complete").await
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ClientError> {
        let resp = self
            .http
            .get(self.url(endpoint))
            .send()
            .await
            .map_err(|e| transport(endpoint, e))?;
        read(endpoint, resp).await
    }

    fn post_request<B: Serialize>(&self, endpoint: &str, body: Option<&B>) -> RequestBuilder {
        let req = self.http.post(self.url(endpoint));
        match body {
            Some(body) => req.json(body),
            None => req,
        }
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<T, ClientError> {
        let resp = self
            .post_request(endpoint, body)
            .send()
            .await
            .map_err(|e| transport(endpoint, e))?;
        read(endpoint, resp).await
    }
}

impl GaService for HttpGaClient {
    async fn initialize(
        &self,
        request: &InitializeRequest,
    ) -> Result<Vec<Individual>, ClientError> {
        let resp: InitializeResponse = self.post("/initialize", Some(request)).await?;
        Ok(resp.initial_population)
    }

    async fn evolve(&self, generations: u32) -> Result<EvolveResponse, ClientError> {
        self.post("/evolve", Some(&EvolveRequest { generations }))
            .await
    }

    async fn history(&self) -> Result<Vec<HistoryEntry>, ClientError> {
        self.get("/history").await
    }

    async fn best(&self) -> Result<Option<Individual>, ClientError> {
        let resp: BestResponse = self.get("/best").await?;
        Ok(resp.into_individual())
    }

    async fn reset(&self) -> Result<(), ClientError> {
        let _: StatusResponse = self.post::<(), _>("/reset", None).await?;
        Ok(())
    }

    async fn health(&self) -> Result<(), ClientError> {
        let _: StatusResponse = self.get("/health").await?;
        Ok(())
    }
}

fn transport(endpoint: &str, e: reqwest::Error) -> ClientError {
    ClientError::Transport {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    }
}

async fn read<T: DeserializeOwned>(
    endpoint: &str,
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status().as_u16();
    let body = resp.text().await.map_err(|e| transport(endpoint, e))?;
    decode_body(endpoint, status, &body)
}

/// Turn a raw response into `T`, classifying failures.
pub(crate) fn decode_body<T: DeserializeOwned>(
    endpoint: &str,
    status: u16,
    body: &str,
) -> Result<T, ClientError> {
    if !(200..300).contains(&status) {
        let mut body = body.trim().to_string();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
            body.push('…');
        }
        return Err(ClientError::Status {
            endpoint: endpoint.to_string(),
            status,
            body,
        });
    }

    let value: Value = serde_json::from_str(body).map_err(|e| ClientError::Decode {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })?;

    if let Some(message) = service_error(&value) {
        return Err(ClientError::Service {
            endpoint: endpoint.to_string(),
            message,
        });
    }

    serde_json::from_value(value).map_err(|e| ClientError::Decode {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

/// The service signals "not initialized" with a 2xx body of either
/// `{"error": msg}` or `[{"error": msg}, 400]`.
fn service_error(value: &Value) -> Option<String> {
    let obj = match value {
        Value::Array(items) => items.first()?,
        other => other,
    };
    obj.get("error")?.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_history_list() {
        let body = r#"[
            {"generation": 0, "best_fitness": 0.2, "avg_fitness": 0.05},
            {"generation": 1, "best_fitness": 0.3, "avg_fitness": 0.08}
        ]"#;
        let history: Vec<HistoryEntry> = decode_body("/history", 200, body).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].generation, 1);
    }

    #[test]
    fn tuple_error_envelope_is_a_service_error() {
        let body = r#"[{"error": "GA not initialized. Call /initialize first."}, 400]"#;
        let err = decode_body::<EvolveResponse>("/evolve", 200, body).unwrap_err();
        assert_eq!(
            err,
            ClientError::Service {
                endpoint: "/evolve".to_string(),
                message: "GA not initialized. Call /initialize first.".to_string(),
            }
        );
    }

    #[test]
    fn object_error_envelope_is_a_service_error() {
        let err =
            decode_body::<Statistics>("/statistics", 200, r#"{"error": "GA not initialized"}"#)
                .unwrap_err();
        assert!(matches!(err, ClientError::Service { .. }));
    }

    #[test]
    fn non_success_status_keeps_truncated_body() {
        let body = "x".repeat(1000);
        let err = decode_body::<Statistics>("/statistics", 503, &body).unwrap_err();
        match err {
            ClientError::Status { status, body, .. } => {
                assert_eq!(status, 503);
                assert!(body.chars().count() <= MAX_ERROR_BODY + 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let err = decode_body::<Statistics>("/statistics", 200, "not json").unwrap_err();
        assert!(matches!(err, ClientError::Decode { .. }));
        assert!(!err.is_connectivity());
    }

    #[test]
    fn evolve_response_decodes() {
        let body = r#"{
            "status": "evolved",
            "statistics": {"generation": 3, "best_fitness": 0.6, "avg_fitness": 0.3, "worst_fitness": 0.0},
            "top_individuals": [{"genes": "TO BX", "fitness": 0.6}],
            "is_complete": false
        }"#;
        let resp: EvolveResponse = decode_body("/evolve", 200, body).unwrap();
        assert_eq!(resp.statistics.generation, 3);
        assert_eq!(resp.top_individuals[0].genes, "TO BX");
        assert!(!resp.is_complete);
    }

    #[test]
    fn evolve_posts_one_generation_as_json() {
        let client = HttpGaClient::new("http://localhost:8000");
        let req = client
            .post_request("/evolve", Some(&EvolveRequest { generations: 1 }))
            .build()
            .unwrap();
        assert_eq!(req.method(), reqwest::Method::POST);
        assert_eq!(req.url().as_str(), "http://localhost:8000/evolve");
        let body = req.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(
            serde_json::from_slice::<Value>(body).unwrap(),
            serde_json::json!({ "generations": 1 })
        );
        assert_eq!(
            req.headers()[reqwest::header::CONTENT_TYPE],
            "application/json"
        );
    }

    #[test]
    fn reset_posts_without_a_body() {
        let client = HttpGaClient::new("http://localhost:8000/");
        let req = client.post_request::<()>("/reset", None).build().unwrap();
        assert_eq!(req.method(), reqwest::Method::POST);
        assert_eq!(req.url().path(), "/reset");
        assert!(req.body().is_none());
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        let client = HttpGaClient::new("http://localhost:8000/");
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.url("/health"), "http://localhost:8000/health");
    }
}
