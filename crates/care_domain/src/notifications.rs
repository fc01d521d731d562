use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::task::CareTask;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderRequest {
    pub task_id: Uuid,
    pub plant_id: Uuid,
    pub title: String,
    pub body: String,
    pub scheduled_for: DateTime<Utc>,
}

impl ReminderRequest {
    /// Reminder for `task` at `hour` o'clock (UTC) on its scheduled date.
    pub fn for_task(task: &CareTask, hour: u32) -> Self {
        let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
        let body = match &task.description {
            Some(description) => format!("Due on {}. {description}", task.scheduled_date),
            None => format!("Due on {}", task.scheduled_date),
        };
        Self {
            task_id: task.id,
            plant_id: task.plant_id,
            title: task.title.clone(),
            body,
            scheduled_for: task.scheduled_date.and_time(time).and_utc(),
        }
    }
}

/// Platform-specific reminder adapters implement this trait.
pub trait NotificationSink: Send + Sync {
    fn schedule(&self, reminder: ReminderRequest);
    fn clear_for_task(&self, task: &CareTask);
    fn clear_for_plant(&self, plant_id: Uuid);
}
