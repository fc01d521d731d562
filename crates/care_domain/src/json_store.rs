use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::log::CareLogEntry;
use crate::plant::Plant;
use crate::store::{CareData, CareStore};
use crate::task::{CareTask, TaskFilter};

/// Store persisted as a single JSON document.
///
/// Each write is applied to a copy of the data, flushed to disk, and only then
/// made visible, so a failed flush leaves both file and memory unchanged.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    data: RwLock<CareData>,
}

impl JsonFileStore {
    /// Opens the store at `path`, starting empty when the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                CareData::default()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            CareData::default()
        };
        tracing::debug!(
            path = %path.display(),
            plants = data.plants.len(),
            tasks = data.care_tasks.len(),
            "opened care store"
        );
        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    fn write<T>(
        &self,
        apply: impl FnOnce(&mut CareData) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.data.write();
        let mut next = (*guard).clone();
        let out = apply(&mut next)?;
        self.flush(&next)?;
        *guard = next;
        Ok(out)
    }

    fn flush(&self, data: &CareData) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let payload = serde_json::to_string_pretty(data)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, payload)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

impl CareStore for JsonFileStore {
    fn insert_plant(&self, plant: Plant) -> Result<(), StoreError> {
        self.write(|data| data.insert_plant(plant))
    }

    fn plant(&self, id: Uuid) -> Result<Plant, StoreError> {
        self.data.read().plant(id).cloned()
    }

    fn plants(&self) -> Result<Vec<Plant>, StoreError> {
        Ok(self.data.read().plants.clone())
    }

    fn update_plant(&self, plant: &Plant) -> Result<(), StoreError> {
        self.write(|data| data.update_plant(plant))
    }

    fn delete_plant(&self, id: Uuid) -> Result<(), StoreError> {
        self.write(|data| data.delete_plant(id))
    }

    fn insert_task(&self, task: CareTask) -> Result<(), StoreError> {
        self.write(|data| data.insert_task(task))
    }

    fn task(&self, id: Uuid) -> Result<CareTask, StoreError> {
        self.data.read().task(id).cloned()
    }

    fn tasks(&self, filter: &TaskFilter) -> Result<Vec<CareTask>, StoreError> {
        Ok(self.data.read().tasks(filter))
    }

    fn update_task(&self, task: &CareTask) -> Result<(), StoreError> {
        self.write(|data| data.update_task(task))
    }

    fn append_log(&self, entry: CareLogEntry) -> Result<(), StoreError> {
        self.write(|data| data.append_log(entry))
    }

    fn logs_for_plant(&self, plant_id: Uuid) -> Result<Vec<CareLogEntry>, StoreError> {
        Ok(self.data.read().logs_for_plant(plant_id))
    }
}
