use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use base64::Engine;
use chrono::Utc;
use futures::{StreamExt, TryStreamExt};
use log::{info, warn};
use sha2::{Digest, Sha256};
use shared::{ClassLabel, HealthResponse, InferenceRequest, InferenceResponse};
use std::path::PathBuf;
use std::time::Instant;
use uuid::Uuid;

use crate::error::ApiError;
use crate::runner::DualModelRunner;

#[derive(Debug, Clone, Copy)]
pub struct UploadLimit(pub usize);

pub fn configure_routes(cfg: &mut web::ServiceConfig, frontend_dir: PathBuf, max_upload_bytes: usize) {
    configure_api(cfg, max_upload_bytes);
    cfg.service(Files::new("/", frontend_dir).index_file("index.html"));
}

pub fn configure_api(cfg: &mut web::ServiceConfig, max_upload_bytes: usize) {
    let body_limit = json_limit(max_upload_bytes);

    cfg.app_data(web::Data::new(UploadLimit(max_upload_bytes)))
        .service(web::resource("/api/predict").route(web::post().to(handle_predict)))
        .service(
            web::resource("/api/predict/base64")
                .app_data(
                    web::JsonConfig::default()
                        .limit(body_limit)
                        .error_handler(|err, _req| ApiError::from(err).into()),
                )
                .route(web::post().to(handle_predict_base64)),
        )
        .service(web::resource("/api/labels").route(web::get().to(labels)))
        .service(web::resource("/api/health").route(web::get().to(health)));
}

/// base64 inflates the payload by 4/3, plus room for the JSON envelope.
fn json_limit(max_upload_bytes: usize) -> usize {
    (max_upload_bytes / 3).saturating_mul(4).saturating_add(4096)
}

async fn handle_predict(
    runner: web::Data<DualModelRunner>,
    limit: web::Data<UploadLimit>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let image_data = read_upload(payload, limit.0).await?;
    let response = run_inference(runner, image_data).await?;
    Ok(HttpResponse::Ok().json(response))
}

async fn handle_predict_base64(
    runner: web::Data<DualModelRunner>,
    limit: web::Data<UploadLimit>,
    body: web::Json<InferenceRequest>,
) -> Result<HttpResponse, ApiError> {
    let image_data = decode_base64_image(&body.image_data)?;
    if image_data.is_empty() {
        return Err(ApiError::EmptyUpload);
    }
    if image_data.len() > limit.0 {
        return Err(ApiError::PayloadTooLarge(image_data.len(), limit.0));
    }

    let response = run_inference(runner, image_data).await?;
    Ok(HttpResponse::Ok().json(response))
}

async fn labels() -> HttpResponse {
    HttpResponse::Ok().json(ClassLabel::all())
}

async fn health(runner: web::Data<DualModelRunner>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        models: runner.model_names(),
    })
}

/// First non-empty file field of the form. Plain text fields are skipped.
async fn read_upload(mut payload: Multipart, limit: usize) -> Result<Vec<u8>, ApiError> {
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| ApiError::Multipart(e.to_string()))?
    {
        let is_file = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .is_some();
        if !is_file {
            while let Some(chunk) = field.next().await {
                chunk.map_err(|e| ApiError::Multipart(e.to_string()))?;
            }
            continue;
        }

        let mut image_data = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk.map_err(|e| ApiError::Multipart(e.to_string()))?;
            let size = image_data.len() + data.len();
            if size > limit {
                return Err(ApiError::PayloadTooLarge(size, limit));
            }
            image_data.extend_from_slice(&data);
        }
        if !image_data.is_empty() {
            return Ok(image_data);
        }
    }
    Err(ApiError::EmptyUpload)
}

/// Accepts bare base64 or a `data:image/...;base64,` URL.
pub fn decode_base64_image(data: &str) -> Result<Vec<u8>, ApiError> {
    let encoded = match data.split_once(',') {
        Some((header, rest)) if header.starts_with("data:") => rest,
        _ => data,
    };
    Ok(base64::engine::general_purpose::STANDARD.decode(encoded.trim())?)
}

async fn run_inference(
    runner: web::Data<DualModelRunner>,
    image_data: Vec<u8>,
) -> Result<InferenceResponse, ApiError> {
    let request_id = Uuid::new_v4();
    let image_hash = hex::encode(Sha256::digest(&image_data));
    let started = Instant::now();
    info!(
        "Request {}: {} bytes, sha256 {}",
        request_id,
        image_data.len(),
        image_hash
    );

    let output = web::block(move || runner.run(&image_data))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| {
            warn!("Request {} rejected: {}", request_id, e);
            ApiError::from(e)
        })?;

    let elapsed_ms = started.elapsed().as_millis() as u64;
    info!(
        "Request {} done in {} ms ({}x{} input)",
        request_id, elapsed_ms, output.width, output.height
    );

    Ok(InferenceResponse {
        request_id: request_id.to_string(),
        image_hash,
        width: output.width,
        height: output.height,
        outcomes: output.outcomes,
        elapsed_ms,
        processed_at: Utc::now().to_rfc3339(),
    })
}
