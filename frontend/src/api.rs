use gloo_file::File as GlooFile;
use gloo_net::http::Request;
use shared::{ErrorResponse, InferenceResponse};

/// Posts the image to the backend. The error string is ready to show to the user.
pub async fn request_prediction(file: &GlooFile) -> Result<InferenceResponse, String> {
    let form_data =
        web_sys::FormData::new().map_err(|_| "Could not build the upload form.".to_string())?;
    form_data
        .append_with_blob_and_filename("image", file.as_ref(), &file.name())
        .map_err(|_| "Could not attach the image to the upload form.".to_string())?;

    let response = Request::post("/api/predict")
        .body(form_data)
        .map_err(|e| format!("Failed to build request: {}", e))?
        .send()
        .await
        .map_err(|e| format!("Network error: {}", e))?;

    if response.ok() {
        return response
            .json::<InferenceResponse>()
            .await
            .map_err(|e| format!("Failed to parse response: {}", e));
    }

    let status = response.status();
    match response.json::<ErrorResponse>().await {
        Ok(body) => Err(body.error),
        Err(_) => Err(format!("Server error: {}", status)),
    }
}
