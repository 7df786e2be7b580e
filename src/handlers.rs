pub mod calls;
pub mod ingest;
pub mod records;
