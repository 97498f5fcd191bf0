pub mod ingest_items;
pub mod related_items;
