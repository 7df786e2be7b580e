// src/config.rs

use std::{env, sync::Arc};

use anyhow::Context;
use chrono_tz::Tz;

use crate::{
    db::BookingStore,
    services::{
        ExportService, IngestService, ReconcileService, SchedulerService,
        dispatch::{CallDispatcher, HttpCallDispatcher, NullDispatcher},
        policy::ScheduleWindow,
    },
};

// O estado compartilhado que será acessível em toda a aplicação.
// A store é o único estado mutável; os serviços são só o grafo de
// dependências montado uma vez no boot.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<BookingStore>,
    pub scheduler: SchedulerService,
    pub reconciler: ReconcileService,
    pub ingest: IngestService,
    pub export: ExportService,
    pub bind_addr: String,
}

impl AppState {
    // A assinatura retorna um Result: se a configuração falhar, a aplicação
    // não deve iniciar.
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let store_path = env::var("STORE_PATH").unwrap_or_else(|_| "bookings.json".to_string());

        // Fuso de agendamento: a janela de ligações é em hora LOCAL.
        let timezone: Tz = env::var("SCHEDULING_TIMEZONE")
            .unwrap_or_else(|_| "Europe/London".to_string())
            .parse()
            .map_err(|e| anyhow::anyhow!("SCHEDULING_TIMEZONE inválida: {e}"))?;

        // Janela padrão 08:00–18:00 (fim exclusivo). A regra do produto é
        // 18, não o 23 que já circulou por aí; quem quiser outra janela
        // configura via env.
        let start_hour = env_hour("CALL_WINDOW_START_HOUR", 8)?;
        let end_hour = env_hour("CALL_WINDOW_END_HOUR", 18)?;
        anyhow::ensure!(
            start_hour < end_hour && end_hour <= 24,
            "Janela de ligações inválida: {start_hour}..{end_hour}"
        );

        let window = ScheduleWindow { tz: timezone, start_hour, end_hour };

        // Sem DISPATCHER_URL o backend sobe mesmo assim, com um despachante
        // que falha tudo (a contabilidade continua funcionando).
        let dispatcher: Arc<dyn CallDispatcher> = match env::var("DISPATCHER_URL") {
            Ok(url) if !url.trim().is_empty() => Arc::new(HttpCallDispatcher::new(url)),
            _ => {
                tracing::warn!("DISPATCHER_URL não definida; ligações não serão despachadas");
                Arc::new(NullDispatcher)
            }
        };

        let from_number = env::var("DISPATCH_FROM_NUMBER").unwrap_or_default();
        let public_base_url =
            env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let status_callback_url =
            format!("{}/callStatus", public_base_url.trim_end_matches('/'));

        let default_phone_prefix =
            env::var("DEFAULT_PHONE_PREFIX").unwrap_or_else(|_| "+44".to_string());

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        // --- Monta o grafo de dependências ---
        let store = Arc::new(BookingStore::open(&store_path).await);

        let scheduler = SchedulerService::new(
            store.clone(),
            dispatcher,
            window,
            from_number,
            status_callback_url,
        );
        let reconciler = ReconcileService::new(store.clone());
        let ingest = IngestService::new(store.clone(), default_phone_prefix);
        let export = ExportService::new(store.clone());

        tracing::info!(
            "✅ Configuração carregada: store={store_path}, janela={start_hour}h–{end_hour}h {timezone}"
        );

        Ok(Self { store, scheduler, reconciler, ingest, export, bind_addr })
    }
}

fn env_hour(var: &str, default: u32) -> anyhow::Result<u32> {
    match env::var(var) {
        Ok(value) => value.parse::<u32>().with_context(|| format!("{var} inválida: {value}")),
        Err(_) => Ok(default),
    }
}
