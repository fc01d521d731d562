use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::task::TaskType;

/// Append-only record of a care action actually performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareLogEntry {
    pub id: Uuid,
    pub plant_id: Uuid,
    pub task_type: TaskType,
    pub performed_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl CareLogEntry {
    pub fn new(
        plant_id: Uuid,
        task_type: TaskType,
        performed_at: DateTime<Utc>,
        notes: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            plant_id,
            task_type,
            performed_at,
            notes: notes.filter(|text| !text.trim().is_empty()),
        }
    }

    pub fn performed_on(&self) -> NaiveDate {
        self.performed_at.date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn blank_notes_are_dropped() {
        let entry = CareLogEntry::new(
            Uuid::new_v4(),
            TaskType::Watering,
            Utc::now(),
            Some("  ".into()),
        );
        assert!(entry.notes.is_none());
    }

    #[test]
    fn performed_on_is_the_utc_calendar_day() {
        let entry = CareLogEntry::new(
            Uuid::new_v4(),
            TaskType::Watering,
            Utc.with_ymd_and_hms(2024, 1, 10, 23, 30, 0).unwrap(),
            None,
        );
        assert_eq!(entry.performed_on(), NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
    }
}
