pub mod bulk_import_entities;
pub mod bulk_imports;
pub mod import_failures;
pub mod pipeline_batches;
pub mod pipeline_leases;
pub mod pipeline_trackers;
pub mod tracker_status;

pub use bulk_import_entities::{EntityStatus, PortableType};
pub use pipeline_batches::BatchStatus;
pub use tracker_status::{TrackerEvent, TrackerStatus};
