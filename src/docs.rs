// src/docs.rs

use utoipa::OpenApi;

use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Ingest ---
        handlers::ingest::upload,

        // --- Records ---
        handlers::records::list_records,
        handlers::records::patch_record,
        handlers::records::export_csv,

        // --- Calls ---
        handlers::calls::process,
        handlers::calls::call_status,
        handlers::calls::booking_lookup,
        handlers::calls::save_v_reg,
    ),
    components(
        schemas(
            models::booking::BookingRecord,
            services::scheduler_service::PassOutcome,
            handlers::calls::CallStatusPayload,
            handlers::calls::BookingLookupResponse,
            handlers::calls::SaveVRegPayload,
        )
    ),
    tags(
        (name = "Ingest", description = "Upload da planilha de bookings"),
        (name = "Records", description = "Tabela editável e export"),
        (name = "Calls", description = "Agendamento e reconciliação de ligações")
    ),
    info(
        title = "VRN Recovery Backend",
        description = "Recuperação de placas de veículo por ligações automáticas",
        version = "0.1.0"
    )
)]
pub struct ApiDoc;
