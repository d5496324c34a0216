use crate::dtos::ClassificationResponse;
use crate::services::metrics::{record_classification, record_inference_duration};
use crate::services::ClassifyError;
use crate::startup::AppState;
use axum::{
    extract::{
        multipart::{Field, MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use std::time::Instant;

/// Multipart field carrying the upload.
pub const IMAGE_FIELD: &str = "image";

const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

pub async fn classify_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ClassificationResponse>, AppError> {
    match classify(&state, multipart).await {
        Ok(response) => {
            record_classification("success");
            Ok(Json(response))
        }
        Err(e) => {
            if e.is_client_error() {
                tracing::info!(reason = %e, "Classification request rejected");
                record_classification("rejected");
            } else {
                record_classification("error");
            }
            Err(e.into())
        }
    }
}

async fn classify(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ClassificationResponse, ClassifyError> {
    let classifier = state.classifier.clone().ok_or(ClassifyError::ModelNotLoaded)?;

    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Request body is not multipart");
        ClassifyError::MissingFile
    })?;

    let upload = read_upload(&mut multipart, state.config.upload.max_bytes).await?;

    tracing::info!(
        filename = %upload.file_name,
        size = upload.bytes.len(),
        "Classifying image"
    );

    let started = Instant::now();
    let bytes = upload.bytes;
    let prediction = tokio::task::spawn_blocking(move || classifier.classify(&bytes))
        .await
        .map_err(|e| ClassifyError::Inference(anyhow::anyhow!("classification task failed: {}", e)))??;
    record_inference_duration(started.elapsed());

    tracing::info!(
        filename = %upload.file_name,
        class_index = prediction.class_index,
        label = %prediction.label,
        confidence = prediction.confidence,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Image classified"
    );

    Ok(prediction.into())
}

/// Find the `image` file part and read it, enforcing name, type and size rules.
async fn read_upload(multipart: &mut Multipart, limit: usize) -> Result<Upload, ClassifyError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        // A part without a filename is a plain form value, not a file.
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };

        if file_name.is_empty() {
            return Err(ClassifyError::EmptyFilename);
        }
        if !allowed_file(&file_name) {
            return Err(ClassifyError::InvalidFileType);
        }

        let bytes = read_limited(field, limit).await?;
        return Ok(Upload { file_name, bytes });
    }

    Err(ClassifyError::MissingFile)
}

async fn read_limited(mut field: Field<'_>, limit: usize) -> Result<Vec<u8>, ClassifyError> {
    let mut data = Vec::new();
    let mut too_large = false;
    // Drain past the limit; the request body limit bounds how much.
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if too_large || data.len() + chunk.len() > limit {
            too_large = true;
            continue;
        }
        data.extend_from_slice(&chunk);
    }

    if too_large {
        return Err(ClassifyError::FileTooLarge { limit });
    }
    Ok(data)
}

fn multipart_error(err: MultipartError, limit: usize) -> ClassifyError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ClassifyError::FileTooLarge { limit }
    } else {
        ClassifyError::Multipart(err.body_text())
    }
}

pub fn allowed_file(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}
