pub mod error;
pub mod generator;
pub mod json_store;
pub mod log;
pub mod notifications;
pub mod plant;
pub mod reconcile;
pub mod recurrence;
pub mod service;
pub mod store;
pub mod task;

pub use crate::error::{CareError, CareResult, StoreError};
pub use crate::service::{CareService, CareServiceBuilder};
