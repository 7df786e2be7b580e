// src/db/booking_store.rs

use std::path::{Path, PathBuf};

use tokio::sync::{Mutex, MutexGuard};

use crate::{common::error::AppError, models::booking::BookingRecord};

// A store é um documento único (um array JSON em disco) espelhado em
// memória. Scheduler, reconciliação de status e edição de campos escrevem
// todos aqui, então o ciclo inteiro de read-modify-write de cada operação
// precisa segurar o lock — soltar entre a leitura e a escrita perderia
// updates (race clássica de documento compartilhado).
pub struct BookingStore {
    path: PathBuf,
    records: Mutex<Vec<BookingRecord>>,
}

impl BookingStore {
    /// Abre a store no caminho dado. Arquivo ausente ou corrompido degrada
    /// para um conjunto vazio (com log de erro) em vez de derrubar o
    /// serviço.
    pub async fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let records = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Vec<BookingRecord>>(&bytes) {
                Ok(records) => {
                    tracing::info!("✅ Store carregada: {} registros de {:?}", records.len(), path);
                    records
                }
                Err(e) => {
                    tracing::error!("🔥 Store ilegível em {:?} ({}); iniciando vazia", path, e);
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                tracing::error!("🔥 Falha ao ler a store {:?} ({}); iniciando vazia", path, e);
                Vec::new()
            }
        };

        Self { path, records: Mutex::new(records) }
    }

    /// Pega o guard do conjunto de registros. O chamador DEVE manter o guard
    /// até depois do `persist` da sua operação.
    pub async fn lock(&self) -> MutexGuard<'_, Vec<BookingRecord>> {
        self.records.lock().await
    }

    /// Grava o conjunto inteiro em disco: escreve num `.tmp` vizinho e faz
    /// rename por cima, então uma escrita que falha no meio nunca deixa um
    /// documento truncado para trás.
    pub async fn persist(&self, records: &[BookingRecord]) -> Result<(), AppError> {
        let bytes = serde_json::to_vec_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

// --- LOOKUPS ---
// Telefone não é chave única: vale o PRIMEIRO registro que bater. Limitação
// conhecida do modelo; o ingest avisa quando vê duplicata.

pub fn find_by_phone<'a>(records: &'a [BookingRecord], phone: &str) -> Option<&'a BookingRecord> {
    records.iter().find(|r| r.phone_number == phone)
}

pub fn find_by_phone_mut<'a>(
    records: &'a mut [BookingRecord],
    phone: &str,
) -> Option<&'a mut BookingRecord> {
    records.iter_mut().find(|r| r.phone_number == phone)
}

pub fn find_by_id_mut<'a>(
    records: &'a mut [BookingRecord],
    booking_id: &str,
) -> Option<&'a mut BookingRecord> {
    records.iter_mut().find(|r| r.booking_id == booking_id)
}
