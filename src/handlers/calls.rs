// src/handlers/calls.rs

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    services::scheduler_service::PassOutcome,
};

// Convenção de identidade: a ferramenta de voz não manda campo estruturado,
// manda o header `x-identity: phone:+447700900000`.
const IDENTITY_HEADER: &str = "x-identity";

fn phone_from_identity_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(IDENTITY_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("phone:"))
        .map(|v| v.trim().to_string())
}

// =============================================================================
//  ÁREA 1: SCHEDULER
// =============================================================================

// POST /process
// Roda um pass de agendamento agora. Devolve quantas ligações foram
// despachadas, ou zero com o motivo (fora da janela).
#[utoipa::path(
    post,
    path = "/process",
    tag = "Calls",
    responses(
        (status = 200, description = "Resultado do pass", body = PassOutcome)
    )
)]
pub async fn process(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = app_state.scheduler.run_pass(Utc::now()).await?;
    Ok((StatusCode::OK, Json(outcome)))
}

// =============================================================================
//  ÁREA 2: CALLBACKS DO DESPACHANTE
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CallStatusPayload {
    #[schema(example = "+447700900000")]
    pub phone_number: Option<String>,
    // Alguns despachantes mandam o número no campo "to".
    pub to: Option<String>,
    #[schema(example = "completed")]
    pub status: Option<String>,
}

// POST /callStatus
// Callback assíncrono de status. O despachante só quer o ACK: telefone
// desconhecido ou payload incompleto são ignorados, nunca erro.
#[utoipa::path(
    post,
    path = "/callStatus",
    tag = "Calls",
    request_body = CallStatusPayload,
    responses(
        (status = 200, description = "Recebido")
    )
)]
pub async fn call_status(
    State(app_state): State<AppState>,
    Json(payload): Json<CallStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    let phone = payload.phone_number.or(payload.to);
    if let (Some(phone), Some(status)) = (phone, payload.status) {
        app_state
            .reconciler
            .apply_status_update(&phone, &status, Utc::now())
            .await?;
    }
    Ok((StatusCode::OK, Json(json!({ "received": true }))))
}

// =============================================================================
//  ÁREA 3: FERRAMENTAS DO ASSISTENTE DE VOZ
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct BookingLookupQuery {
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingLookupResponse {
    pub customer_name: String,
    pub booking_details: String,
}

// GET /booking?phone=...
// Lookup no meio da ligação: quem é esse telefone? Aceita o telefone na
// query ou pela convenção de identidade no header.
#[utoipa::path(
    get,
    path = "/booking",
    tag = "Calls",
    params(
        ("phone" = Option<String>, Query, description = "Telefone no formato +..."),
        ("x-identity" = Option<String>, Header, description = "Alternativa: phone:<numero>")
    ),
    responses(
        (status = 200, description = "Dados do booking", body = BookingLookupResponse),
        (status = 400, description = "Telefone ausente"),
        (status = 404, description = "Nenhum registro com esse telefone")
    )
)]
pub async fn booking_lookup(
    State(app_state): State<AppState>,
    Query(query): Query<BookingLookupQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let phone = query
        .phone
        .filter(|p| !p.trim().is_empty())
        .or_else(|| phone_from_identity_header(&headers))
        .ok_or_else(|| AppError::BadRequest("missing_phone".to_string()))?;

    let record = app_state
        .reconciler
        .find_by_phone(&phone)
        .await
        .ok_or(AppError::NotFound)?;

    Ok((
        StatusCode::OK,
        Json(BookingLookupResponse {
            customer_name: record.customer_name,
            booking_details: record.booking_details,
        }),
    ))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveVRegPayload {
    #[schema(example = "+447700900000")]
    pub phone_number: Option<String>,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "AB12CDE")]
    pub v_reg: String,
}

// POST /saveVReg
// A ferramenta de captura por voz reporta a placa que o cliente ditou.
#[utoipa::path(
    post,
    path = "/saveVReg",
    tag = "Calls",
    request_body = SaveVRegPayload,
    params(
        ("x-identity" = Option<String>, Header, description = "Alternativa: phone:<numero>")
    ),
    responses(
        (status = 200, description = "Placa gravada"),
        (status = 400, description = "Telefone ou placa ausente"),
        (status = 404, description = "Nenhum registro com esse telefone")
    )
)]
pub async fn save_v_reg(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SaveVRegPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let phone = payload
        .phone_number
        .filter(|p| !p.trim().is_empty())
        .or_else(|| phone_from_identity_header(&headers))
        .ok_or_else(|| AppError::BadRequest("missing_phone".to_string()))?;

    app_state.reconciler.save_v_reg(&phone, &payload.v_reg).await?;
    Ok((StatusCode::OK, Json(json!({ "ok": true }))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_header_parses_phone_convention() {
        let mut headers = HeaderMap::new();
        headers.insert(IDENTITY_HEADER, "phone:+447700900000".parse().unwrap());
        assert_eq!(
            phone_from_identity_header(&headers).as_deref(),
            Some("+447700900000")
        );

        headers.insert(IDENTITY_HEADER, "email:x@y.z".parse().unwrap());
        assert!(phone_from_identity_header(&headers).is_none());

        assert!(phone_from_identity_header(&HeaderMap::new()).is_none());
    }
}
