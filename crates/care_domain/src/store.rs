use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{RecordKind, StoreError};
use crate::log::CareLogEntry;
use crate::plant::Plant;
use crate::task::{CareTask, TaskFilter};

/// Durable storage behind the care operations.
///
/// Every call is an independent request; nothing spans calls. Implementations
/// must reject a second pending task for the same plant, task type and
/// scheduled date with [`StoreError::DuplicatePendingTask`], and deleting a
/// plant removes its tasks and log entries with it.
pub trait CareStore: Send + Sync {
    fn insert_plant(&self, plant: Plant) -> Result<(), StoreError>;
    fn plant(&self, id: Uuid) -> Result<Plant, StoreError>;
    fn plants(&self) -> Result<Vec<Plant>, StoreError>;
    fn update_plant(&self, plant: &Plant) -> Result<(), StoreError>;
    fn delete_plant(&self, id: Uuid) -> Result<(), StoreError>;

    fn insert_task(&self, task: CareTask) -> Result<(), StoreError>;
    fn task(&self, id: Uuid) -> Result<CareTask, StoreError>;
    fn tasks(&self, filter: &TaskFilter) -> Result<Vec<CareTask>, StoreError>;
    fn update_task(&self, task: &CareTask) -> Result<(), StoreError>;

    fn append_log(&self, entry: CareLogEntry) -> Result<(), StoreError>;
    fn logs_for_plant(&self, plant_id: Uuid) -> Result<Vec<CareLogEntry>, StoreError>;
}

/// The three record sets, with the constraint checks shared by every store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareData {
    pub plants: Vec<Plant>,
    pub care_tasks: Vec<CareTask>,
    pub plant_care_logs: Vec<CareLogEntry>,
}

impl CareData {
    pub fn plant(&self, id: Uuid) -> Result<&Plant, StoreError> {
        self.plants
            .iter()
            .find(|plant| plant.id == id)
            .ok_or(StoreError::NotFound {
                kind: RecordKind::Plant,
                id,
            })
    }

    pub fn task(&self, id: Uuid) -> Result<&CareTask, StoreError> {
        self.care_tasks
            .iter()
            .find(|task| task.id == id)
            .ok_or(StoreError::NotFound {
                kind: RecordKind::Task,
                id,
            })
    }

    pub fn insert_plant(&mut self, plant: Plant) -> Result<(), StoreError> {
        if self.plants.iter().any(|existing| existing.id == plant.id) {
            return Err(StoreError::Unavailable(format!(
                "plant {} is already registered",
                plant.id
            )));
        }
        self.plants.push(plant);
        Ok(())
    }

    pub fn update_plant(&mut self, plant: &Plant) -> Result<(), StoreError> {
        let slot = self
            .plants
            .iter_mut()
            .find(|existing| existing.id == plant.id)
            .ok_or(StoreError::NotFound {
                kind: RecordKind::Plant,
                id: plant.id,
            })?;
        *slot = plant.clone();
        Ok(())
    }

    pub fn delete_plant(&mut self, id: Uuid) -> Result<(), StoreError> {
        self.plant(id)?;
        self.plants.retain(|plant| plant.id != id);
        self.care_tasks.retain(|task| task.plant_id != id);
        self.plant_care_logs.retain(|entry| entry.plant_id != id);
        Ok(())
    }

    pub fn insert_task(&mut self, task: CareTask) -> Result<(), StoreError> {
        self.plant(task.plant_id)?;
        self.ensure_unique_pending(&task)?;
        self.care_tasks.push(task);
        Ok(())
    }

    pub fn update_task(&mut self, task: &CareTask) -> Result<(), StoreError> {
        self.task(task.id)?;
        self.ensure_unique_pending(task)?;
        if let Some(slot) = self.care_tasks.iter_mut().find(|t| t.id == task.id) {
            *slot = task.clone();
        }
        Ok(())
    }

    pub fn tasks(&self, filter: &TaskFilter) -> Vec<CareTask> {
        self.care_tasks
            .iter()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect()
    }

    pub fn append_log(&mut self, entry: CareLogEntry) -> Result<(), StoreError> {
        self.plant(entry.plant_id)?;
        self.plant_care_logs.push(entry);
        Ok(())
    }

    pub fn logs_for_plant(&self, plant_id: Uuid) -> Vec<CareLogEntry> {
        self.plant_care_logs
            .iter()
            .filter(|entry| entry.plant_id == plant_id)
            .cloned()
            .collect()
    }

    fn ensure_unique_pending(&self, task: &CareTask) -> Result<(), StoreError> {
        if !task.is_pending() {
            return Ok(());
        }
        let clash = self.care_tasks.iter().any(|existing| {
            existing.id != task.id
                && existing.is_pending()
                && existing.plant_id == task.plant_id
                && existing.task_type == task.task_type
                && existing.scheduled_date == task.scheduled_date
        });
        if clash {
            return Err(StoreError::DuplicatePendingTask {
                plant_id: task.plant_id,
                task_type: task.task_type,
                scheduled_date: task.scheduled_date,
            });
        }
        Ok(())
    }
}

/// Process-local store; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<CareData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> CareData {
        self.data.read().clone()
    }
}

impl CareStore for MemoryStore {
    fn insert_plant(&self, plant: Plant) -> Result<(), StoreError> {
        self.data.write().insert_plant(plant)
    }

    fn plant(&self, id: Uuid) -> Result<Plant, StoreError> {
        self.data.read().plant(id).cloned()
    }

    fn plants(&self) -> Result<Vec<Plant>, StoreError> {
        Ok(self.data.read().plants.clone())
    }

    fn update_plant(&self, plant: &Plant) -> Result<(), StoreError> {
        self.data.write().update_plant(plant)
    }

    fn delete_plant(&self, id: Uuid) -> Result<(), StoreError> {
        self.data.write().delete_plant(id)
    }

    fn insert_task(&self, task: CareTask) -> Result<(), StoreError> {
        self.data.write().insert_task(task)
    }

    fn task(&self, id: Uuid) -> Result<CareTask, StoreError> {
        self.data.read().task(id).cloned()
    }

    fn tasks(&self, filter: &TaskFilter) -> Result<Vec<CareTask>, StoreError> {
        Ok(self.data.read().tasks(filter))
    }

    fn update_task(&self, task: &CareTask) -> Result<(), StoreError> {
        self.data.write().update_task(task)
    }

    fn append_log(&self, entry: CareLogEntry) -> Result<(), StoreError> {
        self.data.write().append_log(entry)
    }

    fn logs_for_plant(&self, plant_id: Uuid) -> Result<Vec<CareLogEntry>, StoreError> {
        Ok(self.data.read().logs_for_plant(plant_id))
    }
}
