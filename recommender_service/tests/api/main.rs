mod bulk_ingest;
mod related;
mod startup;
mod upsert;
