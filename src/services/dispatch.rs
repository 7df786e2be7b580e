// src/services/dispatch.rs

use async_trait::async_trait;
use serde::Serialize;

use crate::common::error::AppError;

/// Payload do pedido de ligação para o colaborador externo de telefonia.
/// Ele conecta a ligação ao assistente de voz e depois nos devolve o status
/// pelo callback.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    pub to: String,
    pub from: String,
    pub greeting: String,
    pub status_callback_url: String,
}

// A seam do despachante é um trait para o scheduler não saber se do outro
// lado tem HTTP de verdade ou um fake de teste.
#[async_trait]
pub trait CallDispatcher: Send + Sync {
    async fn place_call(&self, request: &CallRequest) -> Result<(), AppError>;
}

/// Implementação real: POST JSON para a URL configurada do despachante.
pub struct HttpCallDispatcher {
    client: reqwest::Client,
    url: String,
}

impl HttpCallDispatcher {
    pub fn new(url: String) -> Self {
        Self { client: reqwest::Client::new(), url }
    }
}

#[async_trait]
impl CallDispatcher for HttpCallDispatcher {
    async fn place_call(&self, request: &CallRequest) -> Result<(), AppError> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::DispatchFailure(e.to_string()))?;

        response
            .error_for_status()
            .map_err(|e| AppError::DispatchFailure(e.to_string()))?;

        Ok(())
    }
}

/// Sem DISPATCHER_URL configurada: toda ligação "falha" localmente. A
/// contabilidade de tentativas continua avançando, então dá para exercitar
/// o sistema inteiro sem telefonia de verdade.
pub struct NullDispatcher;

#[async_trait]
impl CallDispatcher for NullDispatcher {
    async fn place_call(&self, _request: &CallRequest) -> Result<(), AppError> {
        Err(AppError::DispatchFailure("dispatcher_not_configured".to_string()))
    }
}
