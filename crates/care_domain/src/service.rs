use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    error::{CareError, CareResult},
    generator::{self, UpcomingCare},
    log::CareLogEntry,
    notifications::{NotificationSink, ReminderRequest},
    plant::{HealthStatus, NewPlant, Plant},
    recurrence::SinceLast,
    reconcile::{self, CompletionOutcome, CompletionRequest},
    store::{CareStore, MemoryStore},
    task::{CareTask, TaskFilter, TaskType},
};

pub const DEFAULT_REMINDER_HOUR: u32 = 9;
pub const WATER_NOW_NOTE: &str = "Manual watering via Water Now button";

/// A task joined with the name of the plant it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskView {
    pub task: CareTask,
    pub plant_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantOverview {
    pub plant: Plant,
    pub last_watered: SinceLast,
    pub upcoming: Vec<UpcomingCare>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareSummary {
    pub plants: usize,
    pub healthy: usize,
    pub needs_attention: usize,
    pub critical: usize,
    pub tasks_today: usize,
    pub overdue: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshReport {
    pub plants_checked: usize,
    pub tasks_created: Vec<CareTask>,
}

pub struct CareService {
    store: Arc<dyn CareStore>,
    notification_sink: Option<Box<dyn NotificationSink>>,
    reminder_hour: u32,
}

pub struct CareServiceBuilder {
    store: Option<Arc<dyn CareStore>>,
    notification_sink: Option<Box<dyn NotificationSink>>,
    reminder_hour: u32,
}

impl CareServiceBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            notification_sink: None,
            reminder_hour: DEFAULT_REMINDER_HOUR,
        }
    }

    pub fn with_store(self, store: impl CareStore + 'static) -> Self {
        self.with_shared_store(Arc::new(store))
    }

    pub fn with_shared_store(mut self, store: Arc<dyn CareStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_notification_sink(mut self, sink: Box<dyn NotificationSink>) -> Self {
        self.notification_sink = Some(sink);
        self
    }

    /// Hour of day (UTC) at which reminders fire. Out-of-range values are ignored.
    pub fn reminder_hour(mut self, hour: u32) -> Self {
        if hour < 24 {
            self.reminder_hour = hour;
        }
        self
    }

    pub fn build(self) -> CareService {
        CareService {
            store: self
                .store
                .unwrap_or_else(|| Arc::new(MemoryStore::new())),
            notification_sink: self.notification_sink,
            reminder_hour: self.reminder_hour,
        }
    }
}

impl Default for CareServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CareService {
    pub fn builder() -> CareServiceBuilder {
        CareServiceBuilder::new()
    }

    pub fn store(&self) -> &dyn CareStore {
        self.store.as_ref()
    }

    /// Validates and stores a new plant, then seeds its first tasks.
    #[instrument(skip(self, new_plant), fields(name = %new_plant.name))]
    pub fn register_plant(&self, new_plant: NewPlant, now: DateTime<Utc>) -> CareResult<Plant> {
        let plant = new_plant.into_plant(now)?;
        self.store.insert_plant(plant.clone())?;
        tracing::info!(plant_id = %plant.id, "plant registered");
        self.generate_care_tasks_for_plant(plant.id, now.date_naive())?;
        Ok(plant)
    }

    /// Inserts whatever pending tasks the plant is missing as of `as_of`.
    ///
    /// A duplicate rejected by the store means another caller generated the
    /// same task first, and is skipped.
    #[instrument(skip(self))]
    pub fn generate_care_tasks_for_plant(
        &self,
        plant_id: Uuid,
        as_of: NaiveDate,
    ) -> CareResult<Vec<CareTask>> {
        let plant = self.store.plant(plant_id)?;
        let pending = self
            .store
            .tasks(&TaskFilter::new().plant(plant_id).pending())?;

        let mut created = Vec::new();
        for task in generator::tasks_due_for(&plant, as_of, &pending) {
            match self.store.insert_task(task.clone()) {
                Ok(()) => {
                    tracing::debug!(
                        task_id = %task.id,
                        task_type = %task.task_type,
                        scheduled = %task.scheduled_date,
                        "care task generated"
                    );
                    if let Some(sink) = &self.notification_sink {
                        sink.schedule(ReminderRequest::for_task(&task, self.reminder_hour));
                    }
                    created.push(task);
                }
                Err(err) => match CareError::from(err) {
                    CareError::DuplicatePendingTask { .. } => {
                        tracing::debug!(task_type = %task.task_type, "care task already generated");
                    }
                    other => return Err(other),
                },
            }
        }
        Ok(created)
    }

    /// Runs generation for every plant.
    #[instrument(skip(self))]
    pub fn refresh_schedule(&self, as_of: NaiveDate) -> CareResult<RefreshReport> {
        let mut report = RefreshReport::default();
        for plant in self.store.plants()? {
            report.plants_checked += 1;
            report
                .tasks_created
                .extend(self.generate_care_tasks_for_plant(plant.id, as_of)?);
        }
        tracing::info!(
            plants = report.plants_checked,
            created = report.tasks_created.len(),
            "schedule refreshed"
        );
        Ok(report)
    }

    pub fn plant(&self, plant_id: Uuid) -> CareResult<Plant> {
        Ok(self.store.plant(plant_id)?)
    }

    /// All plants, most recently added first.
    pub fn plants(&self) -> CareResult<Vec<Plant>> {
        let mut plants = self.store.plants()?;
        plants.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(plants)
    }

    pub fn plant_overview(&self, plant_id: Uuid, today: NaiveDate) -> CareResult<PlantOverview> {
        let plant = self.store.plant(plant_id)?;
        Ok(PlantOverview {
            last_watered: SinceLast::from_dates(plant.last_watered_date, today),
            upcoming: generator::forecast(&plant, today),
            plant,
        })
    }

    #[instrument(skip(self))]
    pub fn update_health_status(&self, plant_id: Uuid, status: HealthStatus) -> CareResult<Plant> {
        let mut plant = self.store.plant(plant_id)?;
        plant.health_status = status;
        self.store.update_plant(&plant)?;
        Ok(plant)
    }

    /// Changes a plant's cadences and regenerates anything now due.
    #[instrument(skip(self))]
    pub fn update_cadence(
        &self,
        plant_id: Uuid,
        watering_days: i64,
        fertilizing_days: Option<i64>,
        as_of: NaiveDate,
    ) -> CareResult<Plant> {
        let mut plant = self.store.plant(plant_id)?;
        plant.set_cadences(watering_days, fertilizing_days)?;
        self.store.update_plant(&plant)?;
        self.generate_care_tasks_for_plant(plant_id, as_of)?;
        Ok(plant)
    }

    /// Deletes the plant along with its tasks and history.
    #[instrument(skip(self))]
    pub fn remove_plant(&self, plant_id: Uuid) -> CareResult<()> {
        self.store.delete_plant(plant_id)?;
        if let Some(sink) = &self.notification_sink {
            sink.clear_for_plant(plant_id);
        }
        tracing::info!(%plant_id, "plant removed");
        Ok(())
    }

    pub fn complete_task(&self, request: CompletionRequest) -> CareResult<CompletionOutcome> {
        let outcome = reconcile::complete_task(self.store.as_ref(), request)?;
        if let (Some(sink), Some(task)) = (&self.notification_sink, &outcome.completed_task) {
            sink.clear_for_task(task);
        }
        Ok(outcome)
    }

    /// The dashboard's one-tap watering.
    pub fn water_now(&self, plant_id: Uuid, now: DateTime<Utc>) -> CareResult<CompletionOutcome> {
        self.complete_task(
            CompletionRequest::new(plant_id, TaskType::Watering, now).with_note(WATER_NOW_NOTE),
        )
    }

    #[instrument(skip(self))]
    pub fn skip_task(&self, task_id: Uuid) -> CareResult<CareTask> {
        let mut task = self.store.task(task_id)?;
        task.skip()?;
        self.store.update_task(&task)?;
        if let Some(sink) = &self.notification_sink {
            sink.clear_for_task(&task);
        }
        Ok(task)
    }

    /// Pending tasks scheduled exactly on `today`.
    pub fn todays_tasks(&self, today: NaiveDate) -> CareResult<Vec<TaskView>> {
        self.task_views(&TaskFilter::new().pending().scheduled_on(today))
    }

    /// Pending tasks whose day has already passed.
    pub fn overdue_tasks(&self, today: NaiveDate) -> CareResult<Vec<TaskView>> {
        let Some(yesterday) = today.pred_opt() else {
            return Ok(Vec::new());
        };
        self.task_views(&TaskFilter::new().pending().scheduled_on_or_before(yesterday))
    }

    /// Care log of a plant, newest first.
    pub fn care_history(&self, plant_id: Uuid) -> CareResult<Vec<CareLogEntry>> {
        self.store.plant(plant_id)?;
        let mut entries = self.store.logs_for_plant(plant_id)?;
        entries.sort_by(|a, b| b.performed_at.cmp(&a.performed_at));
        Ok(entries)
    }

    pub fn summary(&self, today: NaiveDate) -> CareResult<CareSummary> {
        let plants = self.store.plants()?;
        let mut summary = CareSummary {
            plants: plants.len(),
            ..CareSummary::default()
        };
        for plant in &plants {
            match plant.health_status {
                HealthStatus::Healthy => summary.healthy += 1,
                HealthStatus::NeedsAttention => summary.needs_attention += 1,
                HealthStatus::Critical => summary.critical += 1,
            }
        }
        summary.tasks_today = self.todays_tasks(today)?.len();
        summary.overdue = self.overdue_tasks(today)?.len();
        Ok(summary)
    }

    fn task_views(&self, filter: &TaskFilter) -> CareResult<Vec<TaskView>> {
        let plants = self.store.plants()?;
        let mut views: Vec<TaskView> = self
            .store
            .tasks(filter)?
            .into_iter()
            .map(|task| {
                let plant_name = plants
                    .iter()
                    .find(|plant| plant.id == task.plant_id)
                    .map(|plant| plant.name.clone())
                    .unwrap_or_default();
                TaskView { task, plant_name }
            })
            .collect();
        views.sort_by(|a, b| {
            a.task
                .scheduled_date
                .cmp(&b.task.scheduled_date)
                .then_with(|| a.plant_name.cmp(&b.plant_name))
                .then_with(|| a.task.task_type.cmp(&b.task.task_type))
        });
        Ok(views)
    }
}
