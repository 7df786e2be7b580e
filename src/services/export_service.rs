// src/services/export_service.rs

use std::sync::Arc;

use serde_json::Value;

use crate::{common::error::AppError, db::BookingStore, models::booking::BookingRecord};

// =============================================================================
//  EXPORT
//  Serializa o conjunto atual de registros em CSV para o operador baixar.
//  O cabeçalho vem das chaves do primeiro registro (os nomes camelCase do
//  wire); células com vírgula/quebra de linha saem com aspas (o crate csv
//  cuida disso).
// =============================================================================

#[derive(Clone)]
pub struct ExportService {
    store: Arc<BookingStore>,
}

impl ExportService {
    pub fn new(store: Arc<BookingStore>) -> Self {
        Self { store }
    }

    pub async fn to_csv(&self) -> Result<Vec<u8>, AppError> {
        let records = self.store.lock().await;
        export_records(&records)
    }
}

fn export_records(records: &[BookingRecord]) -> Result<Vec<u8>, AppError> {
    // Conjunto vazio é 400 "no_data", não um CSV vazio.
    if records.is_empty() {
        return Err(AppError::BadRequest("no_data".to_string()));
    }

    let keys: Vec<String> = match serde_json::to_value(&records[0])? {
        Value::Object(map) => map.keys().cloned().collect(),
        _ => return Err(AppError::InternalServerError(anyhow::anyhow!("registro não é objeto"))),
    };

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(&keys)
        .map_err(|e| anyhow::anyhow!(e))?;

    for record in records {
        let value = serde_json::to_value(record)?;
        let row: Vec<String> = keys.iter().map(|k| cell_text(&value[k.as_str()])).collect();
        writer.write_record(&row).map_err(|e| anyhow::anyhow!(e))?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::InternalServerError(anyhow::anyhow!(e.to_string())))
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, details: &str) -> BookingRecord {
        BookingRecord {
            booking_id: id.to_string(),
            customer_name: "John Smith".to_string(),
            booking_details: details.to_string(),
            phone_number: "+447700900000".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn empty_set_is_rejected_not_empty_csv() {
        assert!(matches!(export_records(&[]), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn header_comes_from_record_keys() {
        let bytes = export_records(&[rec("1", "Airport pickup")]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let header = text.lines().next().unwrap();

        assert!(header.starts_with("bookingId,"));
        assert!(header.contains("vRegCaptured"));
        assert!(header.contains("attemptCountToday"));
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn cells_with_commas_are_quoted() {
        let bytes = export_records(&[rec("1", "pickup, with luggage")]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\"pickup, with luggage\""));
    }

    #[test]
    fn absent_timestamps_export_as_empty_cells() {
        let bytes = export_records(&[rec("1", "x")]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let row = text.lines().nth(1).unwrap();
        // lastCallTime e lastCallStatus ausentes viram células vazias, não "null".
        assert!(!row.contains("null"));
    }
}
