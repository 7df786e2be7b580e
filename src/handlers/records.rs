// src/handlers/records.rs

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde_json::Value;

use crate::{common::error::AppError, config::AppState, models::booking::BookingRecord};

// GET /records
#[utoipa::path(
    get,
    path = "/records",
    tag = "Records",
    responses(
        (status = 200, description = "Conjunto completo de registros", body = Vec<BookingRecord>)
    )
)]
pub async fn list_records(State(app_state): State<AppState>) -> impl IntoResponse {
    let records = app_state.store.lock().await.clone();
    (StatusCode::OK, Json(records))
}

// PATCH /records/{bookingId}
// Edição manual da tabela: aplica os campos permitidos e devolve o
// registro atualizado. Last-write-wins, sem checagem de versão.
#[utoipa::path(
    patch,
    path = "/records/{bookingId}",
    tag = "Records",
    params(
        ("bookingId" = String, Path, description = "Identificador do booking")
    ),
    responses(
        (status = 200, description = "Registro atualizado", body = BookingRecord),
        (status = 400, description = "Corpo não é um objeto JSON"),
        (status = 404, description = "bookingId desconhecido")
    )
)]
pub async fn patch_record(
    State(app_state): State<AppState>,
    Path(booking_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let fields = body
        .as_object()
        .ok_or_else(|| AppError::BadRequest("expected_object".to_string()))?;

    let updated = app_state.reconciler.patch_record(&booking_id, fields).await?;
    Ok((StatusCode::OK, Json(updated)))
}

// GET /export
#[utoipa::path(
    get,
    path = "/export",
    tag = "Records",
    responses(
        (status = 200, description = "CSV com o conjunto completo", content_type = "text/csv"),
        (status = 400, description = "Sem dados para exportar")
    )
)]
pub async fn export_csv(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let csv = app_state.export.to_csv().await?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"bookings.csv\""),
        ],
        csv,
    ))
}
