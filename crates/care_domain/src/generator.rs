use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::plant::Plant;
use crate::recurrence::{self, Cadence, DueIn};
use crate::task::{CareTask, TaskType};

/// Pending tasks `plant` should gain as of `as_of`.
///
/// Only watering and (when configured) fertilizing recur. A task is proposed
/// when its due date has arrived and no pending task of the same type is
/// already scheduled on that date, so calling this again with the proposals
/// applied yields nothing new.
pub fn tasks_due_for(
    plant: &Plant,
    as_of: NaiveDate,
    existing_pending: &[CareTask],
) -> Vec<CareTask> {
    let mut proposed = Vec::new();
    for (task_type, cadence) in plant.scheduled_task_types() {
        let Some(due) = recurrence::next_due(plant.last_performed(task_type), cadence, as_of)
        else {
            continue;
        };
        if due > as_of {
            continue;
        }
        let already_pending = existing_pending.iter().any(|task| {
            task.is_pending()
                && task.plant_id == plant.id
                && task.task_type == task_type
                && task.scheduled_date == due
        });
        if already_pending {
            continue;
        }
        proposed.push(build_task(plant, task_type, cadence, due));
    }
    proposed
}

fn build_task(plant: &Plant, task_type: TaskType, cadence: Cadence, due: NaiveDate) -> CareTask {
    let title = format!("{} {}", task_type.verb(), plant.name);
    let mut description = format!("Scheduled {} care, {cadence}", task_type.as_str());
    if !plant.location.is_empty() {
        description.push_str(&format!(" ({})", plant.location));
    }
    CareTask::pending(plant.id, task_type, due, title).with_description(description)
}

/// Next occurrence of one recurring care action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingCare {
    pub task_type: TaskType,
    pub due_date: NaiveDate,
    pub due_in: DueIn,
    pub last_performed: Option<NaiveDate>,
}

/// Next due date of every recurring action on `plant`, relative to `today`.
/// Actions whose next date lies beyond the calendar are left out.
pub fn forecast(plant: &Plant, today: NaiveDate) -> Vec<UpcomingCare> {
    plant
        .scheduled_task_types()
        .filter_map(|(task_type, cadence)| {
            let last_performed = plant.last_performed(task_type);
            let due_date = recurrence::next_due(last_performed, cadence, today)?;
            Some(UpcomingCare {
                task_type,
                due_date,
                due_in: DueIn::from_dates(due_date, today),
                last_performed,
            })
        })
        .collect()
}
