use crate::camera::landmarks::{HandLandmark, LandmarkFrame};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("classifier refused: {0}")]
    Rejected(String),
}

/// Verdict from the external sign classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub matched: bool,
    pub confidence: f64,
    pub prediction: Option<String>,
}

/// External ASL classifier: give it a target letter and a landmark
/// snapshot, get back match/confidence/prediction. Checks run on a
/// worker thread, so implementations must be shareable.
pub trait SignClassifier: Send + Sync {
    fn check(&self, target: char, frame: &LandmarkFrame) -> Result<Classification, ClassifierError>;
}

#[derive(Debug, Serialize)]
struct CheckRequest<'a> {
    target: String,
    landmarks: &'a [HandLandmark],
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    success: bool,
    #[serde(rename = "match")]
    matched: Option<bool>,
    confidence: Option<f64>,
    prediction: Option<String>,
    message: Option<String>,
}

/// Blocking HTTP client for the backend's `/asl/check` endpoint.
pub struct HttpSignClassifier {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpSignClassifier {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.into(),
            client,
        }
    }
}

impl SignClassifier for HttpSignClassifier {
    fn check(&self, target: char, frame: &LandmarkFrame) -> Result<Classification, ClassifierError> {
        let resp: CheckResponse = self
            .client
            .post(format!(
                "{}/asl/check",
                self.base_url.trim_end_matches('/')
            ))
            .json(&CheckRequest {
                target: target.to_ascii_uppercase().to_string(),
                landmarks: &frame.points,
            })
            .send()?
            .json()?;

        if !resp.success {
            return Err(ClassifierError::Rejected(
                resp.message.unwrap_or_else(|| "check failed".into()),
            ));
        }

        // A no-hand result comes back as match=false at zero confidence
        Ok(Classification {
            matched: resp.matched.unwrap_or(false),
            confidence: resp.confidence.unwrap_or(0.0),
            prediction: resp.prediction,
        })
    }
}
