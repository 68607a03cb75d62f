use actix_web::error::JsonPayloadError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use shared::ErrorResponse;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    #[error("Image could not be decoded: {0}")]
    Decode(String),
    #[error("Unsupported image format: {0}. Upload a PNG or JPEG image")]
    UnsupportedFormat(String),
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Input is {actual_h}x{actual_w} but the model expects {expected_h}x{expected_w}")]
    ShapeMismatch {
        expected_h: u32,
        expected_w: u32,
        actual_h: u32,
        actual_w: u32,
    },
    #[error("Model returned {actual} values, expected {expected}")]
    OutputLength { expected: usize, actual: usize },
    #[error("Model returned an invalid probability {value} at index {index}")]
    InvalidOutput { index: usize, value: f32 },
    #[error("Model runtime error: {0}")]
    Runtime(#[from] tch::TchError),
    #[error("Model handle is poisoned")]
    Poisoned,
}

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("Model file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Model file {} could not be loaded: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: tch::TchError,
    },
    #[error("No models configured")]
    NoModels,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: {value}")]
    Env { key: &'static str, value: String },
}

/// Request-level failures surfaced to the UI.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error("No image was uploaded")]
    EmptyUpload,
    #[error("Upload is {0} bytes, the limit is {1} bytes")]
    PayloadTooLarge(usize, usize),
    #[error("Request body exceeds the limit of {0} bytes")]
    BodyTooLarge(usize),
    #[error("Malformed JSON request: {0}")]
    Json(String),
    #[error("Invalid base64 image data: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("Malformed upload: {0}")]
    Multipart(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Preprocess(PreprocessError::Decode(_)) => "DECODE_ERROR",
            ApiError::Preprocess(PreprocessError::UnsupportedFormat(_)) => "UNSUPPORTED_FORMAT",
            ApiError::EmptyUpload => "EMPTY_UPLOAD",
            ApiError::PayloadTooLarge(_, _) | ApiError::BodyTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::Json(_) => "MALFORMED_REQUEST",
            ApiError::InvalidBase64(_) => "INVALID_BASE64",
            ApiError::Multipart(_) => "MALFORMED_UPLOAD",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Preprocess(PreprocessError::UnsupportedFormat(_)) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            ApiError::PayloadTooLarge(_, _) | ApiError::BodyTooLarge(_) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
        })
    }
}

impl From<JsonPayloadError> for ApiError {
    fn from(err: JsonPayloadError) -> Self {
        match err {
            JsonPayloadError::OverflowKnownLength { limit, .. }
            | JsonPayloadError::Overflow { limit } => ApiError::BodyTooLarge(limit),
            other => ApiError::Json(other.to_string()),
        }
    }
}
