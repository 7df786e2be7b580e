// src/models/booking.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Marcador de status gravado no momento em que uma tentativa é contabilizada.
pub const STATUS_QUEUED: &str = "queued";

/// Limite de tentativas por dia (por `last_attempt_date`).
pub const MAX_ATTEMPTS_PER_DAY: u32 = 3;

/// Backoff mínimo entre duas tentativas para o mesmo registro.
pub const RETRY_BACKOFF_SECS: i64 = 60;

// --- O REGISTRO (uma linha da planilha) ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingRecord {
    // Identificador estável, vindo da planilha ou gerado sequencialmente
    // no ingest. Imutável depois de criado.
    pub booking_id: String,

    pub customer_name: String,
    pub booking_details: String,

    // Telefone normalizado ("+" seguido de dígitos) ou vazio.
    // É a chave de junção dos callbacks de status e da captura por voz.
    // ATENÇÃO: não é garantidamente único; os lookups pegam o PRIMEIRO match.
    pub phone_number: String,

    // Placa capturada. Enquanto vazia, o registro continua agendável.
    #[serde(rename = "vRegCaptured")]
    pub v_reg_captured: String,

    // Contabilidade de tentativas: quantas ligações foram feitas na data
    // `last_attempt_date`. Nunca passa de MAX_ATTEMPTS_PER_DAY.
    pub attempt_count_today: u32,
    pub last_attempt_date: Option<NaiveDate>,

    // Momento da última tentativa OU da última atualização de status.
    pub last_call_time: Option<DateTime<Utc>>,

    // Último status conhecido ("queued", "ringing", "completed", ...).
    pub last_call_status: Option<String>,
}

impl Default for BookingRecord {
    fn default() -> Self {
        Self {
            booking_id: String::new(),
            customer_name: String::new(),
            booking_details: String::new(),
            phone_number: String::new(),
            v_reg_captured: String::new(),
            attempt_count_today: 0,
            last_attempt_date: None,
            last_call_time: None,
            last_call_status: None,
        }
    }
}

impl BookingRecord {
    /// O registro já tem placa? Espaços em branco não contam.
    pub fn has_v_reg(&self) -> bool {
        !self.v_reg_captured.trim().is_empty()
    }

    /// Formato mínimo exigido para discar: "+" seguido de 5 ou mais dígitos.
    pub fn has_valid_phone(&self) -> bool {
        match self.phone_number.strip_prefix('+') {
            Some(digits) => digits.len() >= 5 && digits.chars().all(|c| c.is_ascii_digit()),
            None => false,
        }
    }

    /// Virada de dia: se a data da última tentativa ficou para trás, zera o
    /// contador e carimba a data de hoje. Retorna se houve reset.
    ///
    /// Essa mutação acontece DURANTE a avaliação de elegibilidade e vale
    /// mesmo que uma regra posterior reprove o registro.
    pub fn roll_over_if_new_day(&mut self, today: NaiveDate) -> bool {
        if self.last_attempt_date != Some(today) {
            self.attempt_count_today = 0;
            self.last_attempt_date = Some(today);
            return true;
        }
        false
    }

    /// Contabiliza uma tentativa de ligação. Chamado mesmo quando o despacho
    /// falha: a falha transitória consome uma das três tentativas do dia e
    /// evita tempestade de retries contra um downstream quebrado.
    pub fn mark_attempt(&mut self, now: DateTime<Utc>, today: NaiveDate) {
        self.attempt_count_today += 1;
        self.last_attempt_date = Some(today);
        self.last_call_time = Some(now);
        self.last_call_status = Some(STATUS_QUEUED.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn valid_phone_shape() {
        let mut rec = BookingRecord::default();
        rec.phone_number = "+447700900000".into();
        assert!(rec.has_valid_phone());

        rec.phone_number = "+1234".into(); // só 4 dígitos
        assert!(!rec.has_valid_phone());

        rec.phone_number = "447700900000".into(); // sem "+"
        assert!(!rec.has_valid_phone());

        rec.phone_number = "+44 7700".into(); // espaço não é dígito
        assert!(!rec.has_valid_phone());

        rec.phone_number = String::new();
        assert!(!rec.has_valid_phone());
    }

    #[test]
    fn rollover_resets_once_per_date() {
        let d1 = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();

        let mut rec = BookingRecord::default();
        rec.attempt_count_today = 2;
        rec.last_attempt_date = Some(d1);

        assert!(rec.roll_over_if_new_day(d2));
        assert_eq!(rec.attempt_count_today, 0);
        assert_eq!(rec.last_attempt_date, Some(d2));

        // Mesma data de novo: nada muda.
        rec.attempt_count_today = 1;
        assert!(!rec.roll_over_if_new_day(d2));
        assert_eq!(rec.attempt_count_today, 1);
    }

    #[test]
    fn mark_attempt_stamps_bookkeeping() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        let today = now.date_naive();

        let mut rec = BookingRecord::default();
        rec.mark_attempt(now, today);

        assert_eq!(rec.attempt_count_today, 1);
        assert_eq!(rec.last_attempt_date, Some(today));
        assert_eq!(rec.last_call_time, Some(now));
        assert_eq!(rec.last_call_status.as_deref(), Some(STATUS_QUEUED));
    }

    #[test]
    fn wire_names_are_camel_case() {
        let rec = BookingRecord {
            booking_id: "1".into(),
            v_reg_captured: "AB12CDE".into(),
            ..Default::default()
        };
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["bookingId"], "1");
        assert_eq!(v["vRegCaptured"], "AB12CDE");
        assert!(v.get("attemptCountToday").is_some());
    }
}
