pub mod dispatch;
pub mod export_service;
pub mod ingest_service;
pub mod policy;
pub mod reconcile_service;
pub mod scheduler_service;

pub use export_service::ExportService;
pub use ingest_service::IngestService;
pub use reconcile_service::ReconcileService;
pub use scheduler_service::SchedulerService;
