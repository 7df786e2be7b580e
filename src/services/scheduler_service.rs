// src/services/scheduler_service.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    common::error::AppError,
    db::BookingStore,
    services::{
        dispatch::{CallDispatcher, CallRequest},
        policy::{self, ScheduleWindow},
    },
};

// =============================================================================
//  SCHEDULER
//  Um pass: varre todos os registros, aplica a política, despacha as
//  ligações elegíveis e grava a contabilidade. Disparado por demanda
//  (POST /process), nunca por loop próprio. Um pass NÃO é reentrante: ele
//  segura o lock da store do início ao fim.
// =============================================================================

/// Resultado de um pass, no formato que volta para o operador.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PassOutcome {
    pub calls_queued: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Clone)]
pub struct SchedulerService {
    store: Arc<BookingStore>,
    dispatcher: Arc<dyn CallDispatcher>,
    window: ScheduleWindow,
    from_number: String,
    status_callback_url: String,
}

impl SchedulerService {
    pub fn new(
        store: Arc<BookingStore>,
        dispatcher: Arc<dyn CallDispatcher>,
        window: ScheduleWindow,
        from_number: String,
        status_callback_url: String,
    ) -> Self {
        Self { store, dispatcher, window, from_number, status_callback_url }
    }

    /// Executa um pass de agendamento no instante `now`.
    ///
    /// `calls_queued` conta apenas despachos que DERAM CERTO. Um despacho
    /// que falha ainda consome uma tentativa do dia (a contabilidade avança
    /// igual), mas não entra no número reportado.
    pub async fn run_pass(&self, now: DateTime<Utc>) -> Result<PassOutcome, AppError> {
        // Fora da janela global: nem olha os registros.
        if !policy::within_calling_window(now, &self.window) {
            tracing::info!("Pass abortado: fora da janela de ligações");
            return Ok(PassOutcome {
                calls_queued: 0,
                reason: Some("outside_calling_window".to_string()),
            });
        }

        let today = now.with_timezone(&self.window.tz).date_naive();

        // O guard cobre o pass inteiro, inclusive os awaits de despacho:
        // o ciclo read-modify-write é uma seção crítica única.
        let mut records = self.store.lock().await;
        let mut queued = 0usize;

        for record in records.iter_mut() {
            match policy::evaluate(record, now, &self.window) {
                Ok(()) => {
                    let request = CallRequest {
                        to: record.phone_number.clone(),
                        from: self.from_number.clone(),
                        greeting: greeting_for(&record.customer_name),
                        status_callback_url: self.status_callback_url.clone(),
                    };

                    match self.dispatcher.place_call(&request).await {
                        Ok(()) => {
                            tracing::info!("📞 Ligação despachada para {}", record.phone_number);
                            queued += 1;
                        }
                        Err(e) => {
                            // Falha recuperada: loga e segue o pass.
                            tracing::warn!(
                                "Despacho falhou para {} ({}); tentativa consumida mesmo assim",
                                record.phone_number,
                                e
                            );
                        }
                    }

                    // Sucesso ou falha, a tentativa conta.
                    record.mark_attempt(now, today);
                }
                Err(reason) => {
                    tracing::debug!("Registro {} pulado: {}", record.booking_id, reason);
                }
            }
        }

        // Uma escrita só, no fim do pass, ainda sob o guard.
        self.store.persist(&records).await?;

        Ok(PassOutcome { calls_queued: queued, reason: None })
    }
}

fn greeting_for(customer_name: &str) -> String {
    let name = customer_name.trim();
    if name.is_empty() {
        "Hello, we're calling about your booking to confirm your vehicle registration.".to_string()
    } else {
        format!(
            "Hello {name}, we're calling about your booking to confirm your vehicle registration."
        )
    }
}
