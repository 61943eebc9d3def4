//! Hugging Face Inference API client for zero-shot classification
//!
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::classifier::{LabelScore, ZeroShotRanker};
use crate::error::AgentError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

const INFERENCE_BASE_URL: &str = "https://api-inference.huggingface.co/models";

/// Zero-shot ranker backed by a hosted NLI model.
pub struct HuggingFaceRanker {
    client: Client,
    api_token: String,
    endpoint: String,
}

impl HuggingFaceRanker {
    pub fn new(api_token: String, model: &str) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(4)
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            api_token,
            endpoint: format!("{}/{}", INFERENCE_BASE_URL, model),
        })
    }

    /// Point the client at a different inference endpoint, e.g. a
    /// self-hosted text-classification server.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl ZeroShotRanker for HuggingFaceRanker {
    fn name(&self) -> &'static str {
        "huggingface"
    }

    async fn rank(&self, text: &str, labels: &[&str]) -> crate::Result<Vec<LabelScore>> {
        let request = ZeroShotRequest {
            inputs: text,
            parameters: ZeroShotParameters {
                candidate_labels: labels,
                multi_label: false,
            },
        };

        debug!(endpoint = %self.endpoint, "Calling zero-shot inference API");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Zero-shot request failed: {}", e);
                AgentError::Classification(format!("inference request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, "Zero-shot API error response: {}", body);
            return Err(AgentError::Classification(format!(
                "inference API returned {}: {}",
                status, body
            )));
        }

        let parsed: ZeroShotResponse = response.json().await.map_err(|e| {
            AgentError::Classification(format!("unparsable inference response: {}", e))
        })?;

        Ok(parsed.into_ranking())
    }
}

#[derive(Debug, Serialize)]
struct ZeroShotRequest<'a> {
    inputs: &'a str,
    parameters: ZeroShotParameters<'a>,
}

#[derive(Debug, Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: &'a [&'a str],
    multi_label: bool,
}

/// The hosted pipeline answers with parallel arrays; the newer router
/// answers with a list of label/score pairs.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ZeroShotResponse {
    Parallel { labels: Vec<String>, scores: Vec<f32> },
    Pairs(Vec<LabelScore>),
}

impl ZeroShotResponse {
    fn into_ranking(self) -> Vec<LabelScore> {
        let mut ranking: Vec<LabelScore> = match self {
            ZeroShotResponse::Parallel { labels, scores } => labels
                .into_iter()
                .zip(scores)
                .map(|(label, score)| LabelScore { label, score })
                .collect(),
            ZeroShotResponse::Pairs(pairs) => pairs,
        };

        ranking.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranking
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let labels = ["most_profit", "unknown"];
        let request = ZeroShotRequest {
            inputs: "best day in 2020?",
            parameters: ZeroShotParameters {
                candidate_labels: &labels,
                multi_label: false,
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["inputs"], "best day in 2020?");
        assert_eq!(json["parameters"]["candidate_labels"][1], "unknown");
    }

    #[test]
    fn test_parallel_response_is_ranked() {
        let body = r#"{"sequence":"q","labels":["unknown","worst_day"],"scores":[0.2,0.7]}"#;
        let parsed: ZeroShotResponse = serde_json::from_str(body).unwrap();
        let ranking = parsed.into_ranking();
        assert_eq!(ranking[0].label, "worst_day");
    }

    #[test]
    fn test_pair_response() {
        let body = r#"[{"label":"most_profit","score":0.9},{"label":"unknown","score":0.1}]"#;
        let parsed: ZeroShotResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.into_ranking()[0].label, "most_profit");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_classification_failure() {
        let ranker = HuggingFaceRanker::new("hf_test".to_string(), "facebook/bart-large-mnli")
            .unwrap()
            .with_endpoint("http://127.0.0.1:1/models/facebook/bart-large-mnli");

        let err = ranker.rank("best day in 2020?", &["most_profit", "unknown"]).await;
        assert!(matches!(err, Err(AgentError::Classification(_))));
    }
}
