//! Entity prediction collaborator.
//!
//! The model itself runs in a separate service. [`HttpPredictor`] talks to it over JSON;
//! any transport failure, timeout or non-2xx answer is reported as `Unavailable` and
//! never retried here.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::PredictorConfig;
use crate::domain::Entity;
use crate::errors::{Error, Result};

/// Anything that can find entities in text.
#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, text: &str, labels: &[String], threshold: f64) -> Result<Vec<Entity>>;
}

pub type SharedPredictor = Arc<dyn Predictor>;

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    text: &'a str,
    labels: &'a [String],
    threshold: f64,
}

/// Accepted response bodies: a bare entity array or `{"entities": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PredictResponse {
    Entities(Vec<Entity>),
    Wrapped { entities: Vec<Entity> },
}

impl PredictResponse {
    fn into_entities(self) -> Vec<Entity> {
        match self {
            PredictResponse::Entities(entities) | PredictResponse::Wrapped { entities } => entities,
        }
    }
}

/// Predictor backed by the HTTP prediction service.
#[derive(Debug, Clone)]
pub struct HttpPredictor {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpPredictor {
    pub fn new(config: &PredictorConfig) -> Result<Self> {
        let base = url::Url::parse(&config.url).map_err(|e| {
            Error::config(format!("Invalid predictor URL '{}': {}", config.url, e))
        })?;
        let endpoint = format!("{}/predict", base.as_str().trim_end_matches('/'));

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::config(format!("Failed to build predictor HTTP client: {}", e)))?;

        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Predictor for HttpPredictor {
    #[instrument(skip(self, text, labels), fields(endpoint = %self.endpoint, text_len = text.len()))]
    async fn predict(&self, text: &str, labels: &[String], threshold: f64) -> Result<Vec<Entity>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&PredictRequest { text, labels, threshold })
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "prediction request failed");
                Error::Unavailable {
                    context: "Prediction service request failed".to_string(),
                    source: Some(Box::new(e)),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "prediction service returned an error status");
            return Err(Error::unavailable(format!(
                "Prediction service returned status {}",
                status
            )));
        }

        let body: PredictResponse = response.json().await.map_err(|e| Error::Unavailable {
            context: "Prediction service returned an unreadable body".to_string(),
            source: Some(Box::new(e)),
        })?;

        let entities = body.into_entities();
        debug!(count = entities.len(), "prediction received");
        Ok(entities)
    }
}

/// Predictor that always answers with the same entities. Useful for local runs
/// without a model and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticPredictor {
    entities: Vec<Entity>,
}

impl StaticPredictor {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self { entities }
    }
}

#[async_trait]
impl Predictor for StaticPredictor {
    async fn predict(&self, _text: &str, _labels: &[String], _threshold: f64) -> Result<Vec<Entity>> {
        Ok(self.entities.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoint_is_joined_without_double_slash() {
        let config = PredictorConfig { url: "http://model.local:9000/".into(), ..Default::default() };
        assert_eq!(HttpPredictor::new(&config).unwrap().endpoint(), "http://model.local:9000/predict");

        let nested =
            PredictorConfig { url: "http://model.local/gliner".into(), ..Default::default() };
        assert_eq!(HttpPredictor::new(&nested).unwrap().endpoint(), "http://model.local/gliner/predict");
    }

    #[test]
    fn invalid_url_is_config_error() {
        let config = PredictorConfig { url: "not a url".into(), ..Default::default() };
        assert!(matches!(HttpPredictor::new(&config), Err(Error::Config(_))));
    }

    #[test]
    fn both_response_shapes_parse() {
        let bare: PredictResponse =
            serde_json::from_value(json!([{"label": "Ort", "start": 0, "end": 5, "score": 0.9}]))
                .unwrap();
        let wrapped: PredictResponse = serde_json::from_value(
            json!({"entities": [{"label": "Ort", "start": 0, "end": 5, "score": 0.9}]}),
        )
        .unwrap();
        assert_eq!(bare.into_entities(), wrapped.into_entities());
    }

    #[tokio::test]
    async fn static_predictor_returns_its_entities() {
        let predictor = StaticPredictor::new(vec![Entity::new("Ort", 0, 5, 0.9)]);
        let entities = predictor.predict("Paris", &["Ort".into()], 0.5).await.unwrap();
        assert_eq!(entities, vec![Entity::new("Ort", 0, 5, 0.9)]);
    }
}
