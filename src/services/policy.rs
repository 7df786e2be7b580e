// src/services/policy.rs

use chrono::{DateTime, Duration, Timelike, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use crate::models::booking::{BookingRecord, MAX_ATTEMPTS_PER_DAY, RETRY_BACKOFF_SECS};

// =============================================================================
//  POLÍTICA DE ELEGIBILIDADE
//  Decide se um registro pode receber uma ligação AGORA. Sem acesso à store:
//  recebe o registro e o instante, devolve a decisão com o motivo.
// =============================================================================

/// Janela de ligações no fuso de agendamento. `end_hour` é exclusivo:
/// com 8..18, a última ligação possível sai às 17:59.
#[derive(Debug, Clone)]
pub struct ScheduleWindow {
    pub tz: Tz,
    pub start_hour: u32,
    pub end_hour: u32,
}

// Motivos de reprovação. O Display é o CÓDIGO que vai para a resposta
// HTTP, não frase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Ineligible {
    #[error("vreg_already_captured")]
    VRegCaptured,
    #[error("outside_calling_window")]
    OutsideWindow,
    #[error("daily_limit_reached")]
    DailyLimitReached,
    #[error("backoff_not_elapsed")]
    BackoffNotElapsed,
    #[error("invalid_phone")]
    InvalidPhone,
}

/// A hora local de `now` cai dentro da janela configurada?
pub fn within_calling_window(now: DateTime<Utc>, window: &ScheduleWindow) -> bool {
    let hour = now.with_timezone(&window.tz).hour();
    hour >= window.start_hour && hour < window.end_hour
}

/// Avalia as regras na ordem do contrato; a primeira que reprova decide.
///
/// Efeito colateral único e intencional: a virada de dia (regra 3) muta o
/// registro — zera o contador e carimba a data — e essa mutação FICA mesmo
/// que uma regra posterior reprove. Fora isso, função determinística em
/// (registro, now).
pub fn evaluate(
    record: &mut BookingRecord,
    now: DateTime<Utc>,
    window: &ScheduleWindow,
) -> Result<(), Ineligible> {
    // 1. Placa já capturada remove o registro do agendamento para sempre.
    if record.has_v_reg() {
        return Err(Ineligible::VRegCaptured);
    }

    // 2. Janela de ligações.
    if !within_calling_window(now, window) {
        return Err(Ineligible::OutsideWindow);
    }

    // 3. Virada de dia ANTES de checar o contador.
    let today = now.with_timezone(&window.tz).date_naive();
    record.roll_over_if_new_day(today);

    // 4. Máximo de tentativas por dia.
    if record.attempt_count_today >= MAX_ATTEMPTS_PER_DAY {
        return Err(Ineligible::DailyLimitReached);
    }

    // 5. Backoff entre tentativas: elegível de novo exatamente em T+60s.
    if let Some(last) = record.last_call_time {
        if now.signed_duration_since(last) < Duration::seconds(RETRY_BACKOFF_SECS) {
            return Err(Ineligible::BackoffNotElapsed);
        }
    }

    // 6. Precisa ter um telefone discável.
    if !record.has_valid_phone() {
        return Err(Ineligible::InvalidPhone);
    }

    Ok(())
}
