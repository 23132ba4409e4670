// backfill-common: data model and pure reconciliation logic shared by the engine and CLI.

pub mod events;
pub mod histogram;
pub mod reconcile;
pub mod types;
