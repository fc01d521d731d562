use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CareError, CareResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Watering,
    Fertilizing,
    Pesticide,
    Pruning,
    Repotting,
    Checking,
}

impl TaskType {
    pub const ALL: [TaskType; 6] = [
        TaskType::Watering,
        TaskType::Fertilizing,
        TaskType::Pesticide,
        TaskType::Pruning,
        TaskType::Repotting,
        TaskType::Checking,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Watering => "watering",
            TaskType::Fertilizing => "fertilizing",
            TaskType::Pesticide => "pesticide",
            TaskType::Pruning => "pruning",
            TaskType::Repotting => "repotting",
            TaskType::Checking => "checking",
        }
    }

    /// Imperative used in generated task titles.
    pub fn verb(self) -> &'static str {
        match self {
            TaskType::Watering => "Water",
            TaskType::Fertilizing => "Fertilize",
            TaskType::Pesticide => "Apply pesticide to",
            TaskType::Pruning => "Prune",
            TaskType::Repotting => "Repot",
            TaskType::Checking => "Check on",
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskType::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown task type `{s}`"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
    Skipped,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
            TaskStatus::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

/// A concrete, dated instance of a care action for one plant.
///
/// `completed_date` is present exactly when the task is completed; the
/// fields are private so the pairing can only change through [`CareTask::complete`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareTask {
    pub id: Uuid,
    pub plant_id: Uuid,
    pub task_type: TaskType,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_date: NaiveDate,
    status: TaskStatus,
    completed_date: Option<DateTime<Utc>>,
}

impl CareTask {
    pub fn pending(
        plant_id: Uuid,
        task_type: TaskType,
        scheduled_date: NaiveDate,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            plant_id,
            task_type,
            title: title.into(),
            description: None,
            scheduled_date,
            status: TaskStatus::Pending,
            completed_date: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn completed_date(&self) -> Option<DateTime<Utc>> {
        self.completed_date
    }

    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }

    pub fn complete(&mut self, at: DateTime<Utc>) -> CareResult<()> {
        self.ensure_pending()?;
        self.status = TaskStatus::Completed;
        self.completed_date = Some(at);
        Ok(())
    }

    pub fn skip(&mut self) -> CareResult<()> {
        self.ensure_pending()?;
        self.status = TaskStatus::Skipped;
        Ok(())
    }

    fn ensure_pending(&self) -> CareResult<()> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(CareError::TaskNotPending {
                task_id: self.id,
                status: self.status,
            })
        }
    }
}

/// Row selection over care tasks. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub plant_id: Option<Uuid>,
    pub task_type: Option<TaskType>,
    pub status: Option<TaskStatus>,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_on_or_before: Option<NaiveDate>,
}

impl TaskFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plant(mut self, plant_id: Uuid) -> Self {
        self.plant_id = Some(plant_id);
        self
    }

    pub fn task_type(mut self, task_type: TaskType) -> Self {
        self.task_type = Some(task_type);
        self
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn pending(self) -> Self {
        self.status(TaskStatus::Pending)
    }

    pub fn scheduled_on(mut self, date: NaiveDate) -> Self {
        self.scheduled_date = Some(date);
        self
    }

    pub fn scheduled_on_or_before(mut self, date: NaiveDate) -> Self {
        self.scheduled_on_or_before = Some(date);
        self
    }

    pub fn matches(&self, task: &CareTask) -> bool {
        self.plant_id.map_or(true, |id| task.plant_id == id)
            && self.task_type.map_or(true, |kind| task.task_type == kind)
            && self.status.map_or(true, |status| task.status == status)
            && self
                .scheduled_date
                .map_or(true, |date| task.scheduled_date == date)
            && self
                .scheduled_on_or_before
                .map_or(true, |date| task.scheduled_date <= date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn task() -> CareTask {
        CareTask::pending(
            Uuid::new_v4(),
            TaskType::Watering,
            NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            "Water Fern",
        )
    }

    #[test]
    fn completion_sets_completed_date() {
        let mut task = task();
        assert!(task.completed_date().is_none());
        let at = Utc.with_ymd_and_hms(2024, 1, 10, 8, 30, 0).unwrap();
        task.complete(at).unwrap();
        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(task.completed_date(), Some(at));
    }

    #[test]
    fn only_pending_tasks_transition() {
        let mut task = task();
        task.skip().unwrap();
        assert_eq!(task.status(), TaskStatus::Skipped);
        assert!(task.completed_date().is_none());

        let err = task.complete(Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            CareError::TaskNotPending {
                status: TaskStatus::Skipped,
                ..
            }
        ));
        assert!(task.skip().is_err());
    }

    #[test]
    fn task_types_use_persisted_spelling() {
        assert_eq!(
            serde_json::to_string(&TaskType::Fertilizing).unwrap(),
            "\"fertilizing\""
        );
        assert_eq!(
            serde_json::to_string(&TaskStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!("Watering".parse::<TaskType>().unwrap(), TaskType::Watering);
        assert!("misting".parse::<TaskType>().is_err());
    }

    #[test]
    fn filter_matches_selected_columns() {
        let task = task();
        let day = task.scheduled_date;
        assert!(TaskFilter::new().matches(&task));
        assert!(TaskFilter::new()
            .plant(task.plant_id)
            .task_type(TaskType::Watering)
            .pending()
            .scheduled_on(day)
            .matches(&task));
        assert!(!TaskFilter::new()
            .task_type(TaskType::Fertilizing)
            .matches(&task));
        assert!(!TaskFilter::new()
            .scheduled_on_or_before(day.pred_opt().unwrap())
            .matches(&task));
    }
}
