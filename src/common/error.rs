// src/common/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
// As variantes espelham o contrato da borda HTTP: BadRequest/NotFound viram
// 400/404 com código legível; o resto vira 500 genérico (o detalhe fica
// no log, não na resposta).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Entrada obrigatória ausente ou malformada (sem telefone, sem placa,
    // planilha que não parseia...). O campo é um código curto, não frase.
    #[error("Requisição inválida: {0}")]
    BadRequest(String),

    // Nenhum registro bate com o telefone ou bookingId informado.
    #[error("Registro não encontrado")]
    NotFound,

    // O pedido de ligação externa falhou. Recuperado localmente: o scheduler
    // loga e segue em frente, nunca vira resposta de erro de um pass.
    #[error("Falha ao despachar ligação: {0}")]
    DispatchFailure(String),

    // A store durável não pôde ser lida ou escrita. Fatal para a operação
    // corrente.
    #[error("Erro de I/O da store")]
    StoreIo(#[from] std::io::Error),

    #[error("Erro de serialização da store")]
    StoreSerde(#[from] serde_json::Error),

    // Variante genérica para qualquer outro erro inesperado.
    // `anyhow::Error` é ótimo para capturar o contexto do erro.
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "invalid_fields",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::BadRequest(code) => {
                let body = Json(json!({ "error": code }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::NotFound => (StatusCode::NOT_FOUND, "not_found"),

            // Todos os outros (StoreIo, StoreSerde, DispatchFailure que
            // escapou, InternalServerError) viram 500. O `tracing` loga a
            // mensagem detalhada que `thiserror` nos deu.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        // Resposta padrão para erros simples que só têm um código.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
