// src/services/ingest_service.rs

use std::collections::HashSet;
use std::sync::Arc;

use crate::{common::error::AppError, db::BookingStore, models::booking::BookingRecord};

// =============================================================================
//  INGEST
//  Transforma a planilha enviada (CSV) num conjunto COMPLETO de registros e
//  substitui o conjunto anterior inteiro. As colunas são detectadas pelo
//  nome do cabeçalho, porque cada cliente manda a planilha com cabeçalhos
//  diferentes.
// =============================================================================

#[derive(Clone)]
pub struct IngestService {
    store: Arc<BookingStore>,
    // Prefixo de país aplicado a números nacionais ("07700..." → "+447700...").
    default_phone_prefix: String,
}

struct ColumnMap {
    phone: usize,
    id: Option<usize>,
    name: Option<usize>,
    details: Option<usize>,
}

impl IngestService {
    pub fn new(store: Arc<BookingStore>, default_phone_prefix: String) -> Self {
        Self { store, default_phone_prefix }
    }

    /// Parseia o CSV e SUBSTITUI o conjunto inteiro de registros (um guard
    /// só para a troca + persist). Retorna quantos registros entraram.
    pub async fn replace_from_csv(&self, bytes: &[u8]) -> Result<usize, AppError> {
        let records = parse_csv(bytes, &self.default_phone_prefix)?;

        let mut guard = self.store.lock().await;
        *guard = records;
        self.store.persist(&guard).await?;

        tracing::info!("✅ Planilha ingerida: {} registros", guard.len());
        Ok(guard.len())
    }
}

fn parse_csv(bytes: &[u8], default_prefix: &str) -> Result<Vec<BookingRecord>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|_| AppError::BadRequest("unparseable_spreadsheet".to_string()))?
        .clone();
    let columns = sniff_columns(&headers)?;

    let mut records = Vec::new();
    let mut seen_phones = HashSet::new();

    for (index, row) in reader.records().enumerate() {
        let row = row.map_err(|_| AppError::BadRequest("unparseable_spreadsheet".to_string()))?;
        let cell = |col: Option<usize>| col.and_then(|i| row.get(i)).unwrap_or("").to_string();

        let phone = normalize_phone(row.get(columns.phone).unwrap_or(""), default_prefix);
        // Telefone não é único por contrato; avisa para o operador saber
        // que os lookups vão pegar só o primeiro.
        if !phone.is_empty() && !seen_phones.insert(phone.clone()) {
            tracing::warn!("Telefone duplicado na planilha: {}", phone);
        }

        let booking_id = match cell(columns.id) {
            id if id.is_empty() => (index + 1).to_string(),
            id => id,
        };

        records.push(BookingRecord {
            booking_id,
            customer_name: cell(columns.name),
            booking_details: cell(columns.details),
            phone_number: phone,
            ..Default::default()
        });
    }

    // Conjunto vazio não substitui nada: provavelmente é upload errado, e
    // apagar a tabela inteira em silêncio seria bem pior que um 400.
    if records.is_empty() {
        return Err(AppError::BadRequest("empty_spreadsheet".to_string()));
    }

    Ok(records)
}

// Heurística de detecção por nome de cabeçalho. Cada papel é atribuído à
// primeira coluna que bater; a ordem de teste (phone, id, name, details)
// resolve cabeçalhos ambíguos como "Booking ID" vs "Booking Details".
fn sniff_columns(headers: &csv::StringRecord) -> Result<ColumnMap, AppError> {
    let mut phone = None;
    let mut id = None;
    let mut name = None;
    let mut details = None;

    for (i, raw) in headers.iter().enumerate() {
        let h = raw.trim().to_lowercase();
        if phone.is_none() && (h.contains("phone") || h.contains("tel") || h.contains("mobile")) {
            phone = Some(i);
        } else if id.is_none() && (h == "id" || h.ends_with("id") || h.contains("ref")) {
            id = Some(i);
        } else if name.is_none() && (h.contains("name") || h.contains("customer")) {
            name = Some(i);
        } else if details.is_none()
            && (h.contains("detail") || h.contains("booking") || h.contains("vehicle") || h.contains("note"))
        {
            details = Some(i);
        }
    }

    let phone = phone.ok_or_else(|| AppError::BadRequest("no_phone_column".to_string()))?;
    Ok(ColumnMap { phone, id, name, details })
}

/// Normaliza para o formato discável "+<dígitos>": tira espaço, traço e
/// parêntese; "00" internacional vira "+"; número nacional começando em "0"
/// ganha o prefixo de país configurado.
fn normalize_phone(raw: &str, default_prefix: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return String::new();
    }
    if raw.trim_start().starts_with('+') {
        format!("+{digits}")
    } else if let Some(rest) = digits.strip_prefix("00") {
        format!("+{rest}")
    } else if let Some(rest) = digits.strip_prefix('0') {
        format!("{default_prefix}{rest}")
    } else {
        format!("+{digits}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_common_phone_shapes() {
        assert_eq!(normalize_phone("+44 7700 900-000", "+44"), "+447700900000");
        assert_eq!(normalize_phone("00447700900000", "+44"), "+447700900000");
        assert_eq!(normalize_phone("07700 900000", "+44"), "+447700900000");
        assert_eq!(normalize_phone("(447700) 900000", "+44"), "+447700900000");
        assert_eq!(normalize_phone("", "+44"), "");
        assert_eq!(normalize_phone("n/a", "+44"), "");
    }

    #[test]
    fn sniffs_columns_and_generates_sequential_ids() {
        let csv = b"Customer Name,Phone Number,Booking Details\n\
                    John Smith,07700 900000,Airport pickup\n\
                    Maria Silva,+44 7700 900111,Van hire\n";
        let records = parse_csv(csv, "+44").unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].booking_id, "1");
        assert_eq!(records[1].booking_id, "2");
        assert_eq!(records[0].customer_name, "John Smith");
        assert_eq!(records[0].phone_number, "+447700900000");
        assert_eq!(records[1].booking_details, "Van hire");
        // Campos de agendamento nascem zerados.
        assert_eq!(records[0].attempt_count_today, 0);
        assert!(records[0].last_call_time.is_none());
    }

    #[test]
    fn uses_id_column_when_present() {
        let csv = b"Booking ID,Tel,Name,Booking Details\n\
                    B-77,07700900000,John,Airport pickup\n";
        let records = parse_csv(csv, "+44").unwrap();
        assert_eq!(records[0].booking_id, "B-77");
        assert_eq!(records[0].booking_details, "Airport pickup");
    }

    #[test]
    fn missing_phone_column_is_bad_request() {
        let csv = b"Name,Details\nJohn,x\n";
        assert!(matches!(parse_csv(csv, "+44"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn empty_spreadsheet_is_bad_request() {
        let csv = b"Name,Phone\n";
        assert!(matches!(parse_csv(csv, "+44"), Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn replace_swaps_the_whole_set() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(BookingStore::open(dir.path().join("bookings.json")).await);
        {
            let mut guard = store.lock().await;
            guard.push(BookingRecord { booking_id: "velho".into(), ..Default::default() });
        }
        let service = IngestService::new(store.clone(), "+44".to_string());

        let count = service
            .replace_from_csv(b"Phone,Name\n07700900000,John\n")
            .await
            .unwrap();
        assert_eq!(count, 1);

        let records = store.lock().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].booking_id, "1");
    }
}
