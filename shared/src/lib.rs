use serde::{Deserialize, Serialize};
use strum::{EnumCount as _, IntoEnumIterator};
use strum_macros::{AsRefStr, Display, EnumCount, EnumIter, EnumString, FromRepr};

mod phase;
mod upload;

pub use phase::RequestPhase;
pub use upload::{format_percent, is_accepted_upload, ACCEPTED_EXTENSIONS, ACCEPTED_MIME_TYPES};

pub const CLASS_COUNT: usize = ClassLabel::COUNT;

/// Kidney CT classes, in the index order the models were trained on.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumCount,
    EnumIter,
    EnumString,
    FromRepr,
)]
#[repr(usize)]
pub enum ClassLabel {
    Cyst = 0,
    Normal = 1,
    Stone = 2,
    Tumor = 3,
}

impl ClassLabel {
    pub fn from_index(index: usize) -> Option<Self> {
        Self::from_repr(index)
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn all() -> Vec<ClassLabel> {
        Self::iter().collect()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PredictionResult {
    pub label: ClassLabel,
    /// Value of the winning class, in [0, 1].
    pub confidence: f32,
    pub probabilities: Vec<f32>,
}

impl PredictionResult {
    pub fn confidence_percent(&self) -> f32 {
        self.confidence * 100.0
    }
}

/// One model's answer for one request. Exactly one of `prediction` and
/// `error` is set.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ModelOutcome {
    pub model: String,
    pub prediction: Option<PredictionResult>,
    pub error: Option<String>,
}

impl ModelOutcome {
    pub fn success(model: impl Into<String>, prediction: PredictionResult) -> Self {
        Self {
            model: model.into(),
            prediction: Some(prediction),
            error: None,
        }
    }

    pub fn failure(model: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prediction: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Serialize, Deserialize, Clone)]
pub struct InferenceRequest {
    /// Base64 image bytes, optionally wrapped in a `data:` URL.
    pub image_data: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct InferenceResponse {
    pub request_id: String,
    pub image_hash: String,
    pub width: u32,
    pub height: u32,
    pub outcomes: Vec<ModelOutcome>,
    pub elapsed_ms: u64,
    pub processed_at: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub models: Vec<String>,
}
