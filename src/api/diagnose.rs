//! Diagnosis API handler
//!
//! `POST /diagnose/` accepts multipart form data with:
//! - medical_image: optional image file
//! - clinical_text: optional clinical notes
//! - lab_results: optional lab result text

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    Json,
};
use tracing::{debug, info, warn};

use crate::diagnosis::{compose, DiagnosticRequest, DiagnosticResponse, Finding, UploadedImage};
use crate::error::AppError;
use crate::state::AppState;

/// Form field holding the image file
pub const MEDICAL_IMAGE_FIELD: &str = "medical_image";
/// Form field holding clinical notes
pub const CLINICAL_TEXT_FIELD: &str = "clinical_text";
/// Form field holding lab results
pub const LAB_RESULTS_FIELD: &str = "lab_results";

/// Diagnose endpoint
///
/// A body that is not multipart at all is treated as a form with every
/// field absent; a multipart content type without a usable boundary is a
/// malformed request. The text rules run before the image is written, so a
/// request rejected for a malformed lab value leaves nothing on disk.
pub async fn diagnose(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DiagnosticResponse>, AppError> {
    let request = match multipart {
        Ok(multipart) => read_diagnostic_form(multipart, state.max_upload_bytes()).await?,
        Err(rejection) if is_multipart(&headers) => {
            return Err(AppError::InvalidMultipart(rejection.body_text()));
        }
        Err(rejection) => {
            debug!(%rejection, "Request is not multipart, treating all fields as absent");
            DiagnosticRequest::default()
        }
    };

    let text = request.text_findings()?;

    let stored = match &request.medical_image {
        Some(image) => Some(state.uploads.save(&image.file_name, &image.data).await?),
        None => None,
    };

    let image_status = Finding::image_status(stored.as_ref().map(|s| s.file_name.as_str()));
    let response = compose(image_status, text);

    info!(
        image = stored.is_some(),
        clinical_text = request.clinical_text.is_some(),
        lab_results = request.lab_results.is_some(),
        "Diagnosis composed"
    );

    Ok(Json(response))
}

/// Read the multipart form into a [`DiagnosticRequest`]
///
/// Repeated fields keep their last value. Unknown fields are skipped. A
/// file part without a filename counts as no image.
pub async fn read_diagnostic_form(
    mut multipart: Multipart,
    max_upload_bytes: usize,
) -> Result<DiagnosticRequest, AppError> {
    let mut request = DiagnosticRequest::default();
    let field_error = |e: MultipartError| multipart_error(e, max_upload_bytes);

    while let Some(field) = multipart.next_field().await.map_err(field_error)? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            MEDICAL_IMAGE_FIELD => {
                // Get filename first (before moving field)
                let file_name = field.file_name().map(str::to_string);
                let data = field.bytes().await.map_err(field_error)?;

                if data.len() > max_upload_bytes {
                    warn!(size = data.len(), "Medical image exceeds upload limit");
                    return Err(AppError::PayloadTooLarge {
                        limit: max_upload_bytes,
                    });
                }

                match file_name.filter(|name| !name.is_empty()) {
                    Some(file_name) => {
                        debug!(file_name = %file_name, size = data.len(), "Received medical image");
                        request.medical_image = Some(UploadedImage { file_name, data });
                    }
                    None => debug!("Ignoring medical_image part without a filename"),
                }
            }
            CLINICAL_TEXT_FIELD => {
                request.clinical_text = Some(field.text().await.map_err(field_error)?);
            }
            LAB_RESULTS_FIELD => {
                request.lab_results = Some(field.text().await.map_err(field_error)?);
            }
            _ => {
                warn!("Unknown multipart field: {}", field_name);
            }
        }
    }

    Ok(request)
}

/// Whether the request declares a `multipart/*` body
fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            value
                .trim_start()
                .to_ascii_lowercase()
                .starts_with("multipart/")
        })
        .unwrap_or(false)
}

fn multipart_error(err: MultipartError, limit: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge { limit }
    } else {
        AppError::InvalidMultipart(err.body_text())
    }
}
