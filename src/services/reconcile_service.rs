// src/services/reconcile_service.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::{
    common::error::AppError,
    db::{BookingStore, booking_store},
    models::booking::BookingRecord,
};

// =============================================================================
//  RECONCILIAÇÃO
//  Dois atores assíncronos escrevem no mesmo registro: o subsistema de voz
//  (status de ligação + placa capturada, chaveados por telefone) e o humano
//  editando a tabela (chaveado por bookingId). Política: last-write-wins,
//  sem versão, sem merge.
// =============================================================================

// Allow-list dos campos editáveis via PATCH. Identidade (bookingId) e a
// contabilidade do scheduler (attemptCountToday, lastAttemptDate,
// lastCallTime, lastCallStatus) ficam de fora: ninguém edita isso por fora.
const EDITABLE_FIELDS: [&str; 4] =
    ["customerName", "bookingDetails", "phoneNumber", "vRegCaptured"];

#[derive(Clone)]
pub struct ReconcileService {
    store: Arc<BookingStore>,
}

impl ReconcileService {
    pub fn new(store: Arc<BookingStore>) -> Self {
        Self { store }
    }

    /// Callback assíncrono de status do despachante. Telefone desconhecido é
    /// descartado em silêncio: o colaborador só quer o ACK, não tem o que
    /// fazer com um erro nosso. Idempotente por chamada.
    pub async fn apply_status_update(
        &self,
        phone: &str,
        status: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut records = self.store.lock().await;
        match booking_store::find_by_phone_mut(&mut records, phone) {
            Some(record) => {
                record.last_call_status = Some(status.to_string());
                record.last_call_time = Some(now);
                self.store.persist(&records).await
            }
            None => {
                tracing::debug!("Status '{}' para telefone desconhecido {}; ignorado", status, phone);
                Ok(())
            }
        }
    }

    /// Caminho da captura por voz: grava a placa no primeiro registro com
    /// esse telefone.
    pub async fn save_v_reg(&self, phone: &str, v_reg: &str) -> Result<(), AppError> {
        if phone.trim().is_empty() {
            return Err(AppError::BadRequest("missing_phone".to_string()));
        }
        if v_reg.trim().is_empty() {
            return Err(AppError::BadRequest("missing_v_reg".to_string()));
        }

        let mut records = self.store.lock().await;
        let record = booking_store::find_by_phone_mut(&mut records, phone)
            .ok_or(AppError::NotFound)?;

        record.v_reg_captured = v_reg.trim().to_string();
        tracing::info!("✅ Placa capturada para o booking {}", record.booking_id);
        self.store.persist(&records).await
    }

    /// Caminho da edição manual: aplica só os campos da allow-list; chaves
    /// desconhecidas são ignoradas, não são erro. Retorna o registro já
    /// atualizado.
    pub async fn patch_record(
        &self,
        booking_id: &str,
        fields: &Map<String, Value>,
    ) -> Result<BookingRecord, AppError> {
        let mut records = self.store.lock().await;
        let record = booking_store::find_by_id_mut(&mut records, booking_id)
            .ok_or(AppError::NotFound)?;

        for (key, value) in fields {
            if !EDITABLE_FIELDS.contains(&key.as_str()) {
                tracing::debug!("PATCH ignorou campo não editável '{}'", key);
                continue;
            }
            let Some(text) = value_as_text(value) else { continue };
            match key.as_str() {
                "customerName" => record.customer_name = text,
                "bookingDetails" => record.booking_details = text,
                "phoneNumber" => record.phone_number = text,
                "vRegCaptured" => record.v_reg_captured = text,
                _ => unreachable!(),
            }
        }

        let updated = record.clone();
        self.store.persist(&records).await?;
        Ok(updated)
    }

    /// Lookup da ferramenta de voz no meio da ligação: quem é esse telefone?
    pub async fn find_by_phone(&self, phone: &str) -> Option<BookingRecord> {
        let records = self.store.lock().await;
        booking_store::find_by_phone(&records, phone).cloned()
    }
}

// Os campos editáveis são todos texto; número e booleano viram string,
// null e estruturas são ignorados.
fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    async fn service_with(records: Vec<BookingRecord>) -> (ReconcileService, Arc<BookingStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(BookingStore::open(dir.path().join("bookings.json")).await);
        {
            let mut guard = store.lock().await;
            *guard = records;
        }
        (ReconcileService::new(store.clone()), store, dir)
    }

    fn rec(id: &str, phone: &str) -> BookingRecord {
        BookingRecord {
            booking_id: id.to_string(),
            customer_name: "John Smith".to_string(),
            booking_details: "Airport pickup".to_string(),
            phone_number: phone.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn status_update_is_idempotent() {
        let (service, store, _dir) = service_with(vec![rec("1", "+447700900000")]).await;
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 10, 5, 0).unwrap();

        service.apply_status_update("+447700900000", "completed", now).await.unwrap();
        let first = store.lock().await[0].clone();

        // Mesma atualização de novo: estado observável idêntico.
        service.apply_status_update("+447700900000", "completed", now).await.unwrap();
        let second = store.lock().await[0].clone();

        assert_eq!(first.last_call_status.as_deref(), Some("completed"));
        assert_eq!(first.last_call_time, Some(now));
        assert_eq!(second.last_call_status, first.last_call_status);
        assert_eq!(second.last_call_time, first.last_call_time);
    }

    #[tokio::test]
    async fn status_for_unknown_phone_is_silently_dropped() {
        let (service, store, _dir) = service_with(vec![rec("1", "+447700900000")]).await;
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 10, 5, 0).unwrap();

        service.apply_status_update("+440000000001", "busy", now).await.unwrap();
        assert!(store.lock().await[0].last_call_status.is_none());
    }

    #[tokio::test]
    async fn save_v_reg_happy_path_and_errors() {
        let (service, store, _dir) = service_with(vec![rec("1", "+447700900000")]).await;

        assert!(matches!(
            service.save_v_reg("", "AB12CDE").await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            service.save_v_reg("+447700900000", "   ").await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            service.save_v_reg("+440000000001", "AB12CDE").await,
            Err(AppError::NotFound)
        ));
        // Telefone desconhecido não mutou nada.
        assert_eq!(store.lock().await[0].v_reg_captured, "");

        service.save_v_reg("+447700900000", " AB12CDE ").await.unwrap();
        assert_eq!(store.lock().await[0].v_reg_captured, "AB12CDE");
    }

    #[tokio::test]
    async fn patch_applies_allow_list_only() {
        let (service, store, _dir) = service_with(vec![rec("5", "+447700900000")]).await;

        let body = json!({
            "vRegCaptured": "AB12CDE",
            "customerName": "Maria Silva",
            // Nada disso pode passar:
            "bookingId": "hackeado",
            "attemptCountToday": 99,
            "lastCallStatus": "completed",
            "campoInventado": "x",
        });
        let updated = service
            .patch_record("5", body.as_object().unwrap())
            .await
            .unwrap();

        assert_eq!(updated.v_reg_captured, "AB12CDE");
        assert_eq!(updated.customer_name, "Maria Silva");
        assert_eq!(updated.booking_id, "5");
        assert_eq!(updated.attempt_count_today, 0);
        assert!(updated.last_call_status.is_none());

        let stored = store.lock().await[0].clone();
        assert_eq!(stored.v_reg_captured, "AB12CDE");
    }

    #[tokio::test]
    async fn patch_unknown_booking_id_is_not_found() {
        let (service, _store, _dir) = service_with(vec![rec("5", "+447700900000")]).await;
        let body = json!({"customerName": "X"});
        assert!(matches!(
            service.patch_record("999", body.as_object().unwrap()).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn lookup_returns_first_match_by_phone() {
        let (service, _store, _dir) =
            service_with(vec![rec("1", "+447700900000"), rec("2", "+447700900000")]).await;

        let hit = service.find_by_phone("+447700900000").await.unwrap();
        assert_eq!(hit.booking_id, "1");
        assert!(service.find_by_phone("+441111111111").await.is_none());
    }
}
