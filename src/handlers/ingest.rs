// src/handlers/ingest.rs

use axum::{
    Json,
    extract::{FromRequest, Multipart, Request, State},
    http::{StatusCode, header::CONTENT_TYPE},
    response::IntoResponse,
};
use serde_json::json;

use crate::{common::error::AppError, config::AppState};

// Limite de tamanho do upload da planilha.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

// POST /upload
// Aceita multipart (o formulário do operador) ou o CSV cru no corpo (curl).
// Substitui o conjunto INTEIRO de registros e devolve a contagem.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "Ingest",
    responses(
        (status = 200, description = "Conjunto de registros substituído"),
        (status = 400, description = "Planilha ausente ou ilegível")
    )
)]
pub async fn upload(
    State(app_state): State<AppState>,
    request: Request,
) -> Result<impl IntoResponse, AppError> {
    let bytes = extract_spreadsheet(request).await?;
    let count = app_state.ingest.replace_from_csv(&bytes).await?;
    Ok((StatusCode::OK, Json(json!({ "count": count }))))
}

async fn extract_spreadsheet(request: Request) -> Result<Vec<u8>, AppError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("multipart/form-data"))
        .unwrap_or(false);

    if is_multipart {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|_| AppError::BadRequest("invalid_multipart".to_string()))?;

        // Primeiro campo que parecer arquivo ganha.
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|_| AppError::BadRequest("invalid_multipart".to_string()))?
        {
            if field.file_name().is_some() || field.name() == Some("file") {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::BadRequest("invalid_multipart".to_string()))?;
                return Ok(bytes.to_vec());
            }
        }
        return Err(AppError::BadRequest("missing_file".to_string()));
    }

    let bytes = axum::body::to_bytes(request.into_body(), MAX_UPLOAD_BYTES)
        .await
        .map_err(|_| AppError::BadRequest("body_too_large".to_string()))?;
    if bytes.is_empty() {
        return Err(AppError::BadRequest("missing_file".to_string()));
    }
    Ok(bytes.to_vec())
}
