use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::task::{TaskStatus, TaskType};

/// Failures raised at the storage boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: Uuid },

    /// The store refused a second Pending task for the same plant, type and day.
    #[error("pending {task_type} task for plant {plant_id} on {scheduled_date} already exists")]
    DuplicatePendingTask {
        plant_id: Uuid,
        task_type: TaskType,
        scheduled_date: NaiveDate,
    },

    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store contents could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Plant,
    Task,
    LogEntry,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RecordKind::Plant => "plant",
            RecordKind::Task => "care task",
            RecordKind::LogEntry => "care log entry",
        };
        f.write_str(label)
    }
}

/// Errors surfaced by the care-scheduling operations.
#[derive(Debug, Error)]
pub enum CareError {
    #[error("care frequency must be at least one day, got {days}")]
    InvalidCadence { days: i64 },

    #[error("{days} days after {last_performed} is past the last supported date")]
    DueDateOutOfRange { last_performed: NaiveDate, days: u32 },

    #[error("invalid plant: {0}")]
    InvalidPlant(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: Uuid },

    /// The plant's last-performed update failed; nothing else was attempted.
    #[error("failed to record {task_type} on plant {plant_id}: {source}")]
    PrimaryWriteFailed {
        plant_id: Uuid,
        task_type: TaskType,
        #[source]
        source: StoreError,
    },

    /// A best-effort write after the primary update failed.
    #[error("{step} failed for plant {plant_id}: {source}")]
    SecondaryWriteFailed {
        plant_id: Uuid,
        step: SecondaryStep,
        #[source]
        source: StoreError,
    },

    #[error("pending {task_type} task for plant {plant_id} on {scheduled_date} already exists")]
    DuplicatePendingTask {
        plant_id: Uuid,
        task_type: TaskType,
        scheduled_date: NaiveDate,
    },

    #[error("care task {task_id} is {status}, only pending tasks can change state")]
    TaskNotPending { task_id: Uuid, status: TaskStatus },

    #[error(transparent)]
    Store(StoreError),
}

/// The secondary writes of a completion, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondaryStep {
    AppendHistory,
    CompleteTask,
}

impl std::fmt::Display for SecondaryStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecondaryStep::AppendHistory => f.write_str("care history append"),
            SecondaryStep::CompleteTask => f.write_str("care task completion"),
        }
    }
}

impl From<StoreError> for CareError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, id } => CareError::NotFound { kind, id },
            StoreError::DuplicatePendingTask {
                plant_id,
                task_type,
                scheduled_date,
            } => CareError::DuplicatePendingTask {
                plant_id,
                task_type,
                scheduled_date,
            },
            other => CareError::Store(other),
        }
    }
}

pub type CareResult<T> = Result<T, CareError>;
