// src/main.rs

use axum::{
    Router,
    routing::{get, patch, post},
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod models;
mod services;

use crate::config::AppState;

#[tokio::main]
async fn main() {
    // Inicializa o logger.
    tracing_subscriber::fmt().with_target(false).compact().init();

    // Lida com o Result retornado por AppState::new().
    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    let bind_addr = app_state.bind_addr.clone();

    // A superfície HTTP inteira. Os caminhos são o contrato com o operador,
    // com o despachante de ligações e com as ferramentas do assistente de
    // voz; por isso ficam na raiz, sem prefixo.
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        // Operador: upload da planilha, tabela, export
        .route("/upload", post(handlers::ingest::upload))
        .route("/records", get(handlers::records::list_records))
        .route("/records/{bookingId}", patch(handlers::records::patch_record))
        .route("/export", get(handlers::records::export_csv))
        // Scheduler: um pass por demanda
        .route("/process", post(handlers::calls::process))
        // Despachante: callback assíncrono de status
        .route("/callStatus", post(handlers::calls::call_status))
        // Assistente de voz: lookup do booking e captura da placa
        .route("/booking", get(handlers::calls::booking_lookup))
        .route("/saveVReg", post(handlers::calls::save_v_reg))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .with_state(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.expect("Erro no servidor Axum");
}
