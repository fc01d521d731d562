use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{CareError, CareResult, SecondaryStep, StoreError};
use crate::log::CareLogEntry;
use crate::plant::Plant;
use crate::store::CareStore;
use crate::task::{CareTask, TaskFilter, TaskType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub plant_id: Uuid,
    pub task_type: TaskType,
    pub performed_at: DateTime<Utc>,
    pub note: Option<String>,
}

impl CompletionRequest {
    pub fn new(plant_id: Uuid, task_type: TaskType, performed_at: DateTime<Utc>) -> Self {
        Self {
            plant_id,
            task_type,
            performed_at,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Calendar day the action counts for (UTC).
    pub fn performed_on(&self) -> NaiveDate {
        self.performed_at.date_naive()
    }
}

/// What a completion managed to apply.
///
/// The plant update always happened when an outcome is returned; the history
/// entry and task transition are best-effort and their failures are listed in
/// `secondary_failures`.
#[derive(Debug, Serialize)]
pub struct CompletionOutcome {
    pub plant: Plant,
    pub log_entry: Option<CareLogEntry>,
    pub completed_task: Option<CareTask>,
    #[serde(skip)]
    pub secondary_failures: Vec<CareError>,
}

impl CompletionOutcome {
    pub fn is_fully_applied(&self) -> bool {
        self.secondary_failures.is_empty()
    }
}

/// Records that a care action was performed.
///
/// Runs three independently committed writes in order: the plant's
/// last-performed date, the history entry, then the matching pending task.
/// Only the first is allowed to fail the call.
#[instrument(skip(store, request), fields(plant_id = %request.plant_id, task_type = %request.task_type))]
pub fn complete_task<S>(store: &S, request: CompletionRequest) -> CareResult<CompletionOutcome>
where
    S: CareStore + ?Sized,
{
    let day = request.performed_on();
    let plant = record_on_plant(store, &request, day)?;

    let mut secondary_failures = Vec::new();

    let entry = CareLogEntry::new(
        request.plant_id,
        request.task_type,
        request.performed_at,
        request.note.clone(),
    );
    let log_entry = match store.append_log(entry.clone()) {
        Ok(()) => Some(entry),
        Err(source) => {
            secondary_failures.push(degrade(request.plant_id, SecondaryStep::AppendHistory, source));
            None
        }
    };

    let completed_task = match close_matching_task(store, &request, day) {
        Ok(task) => task,
        Err(source) => {
            secondary_failures.push(degrade(request.plant_id, SecondaryStep::CompleteTask, source));
            None
        }
    };

    tracing::info!(
        %day,
        matched_task = completed_task.is_some(),
        logged = log_entry.is_some(),
        "care recorded"
    );

    Ok(CompletionOutcome {
        plant,
        log_entry,
        completed_task,
        secondary_failures,
    })
}

fn record_on_plant<S>(store: &S, request: &CompletionRequest, day: NaiveDate) -> CareResult<Plant>
where
    S: CareStore + ?Sized,
{
    let primary_failed = |source: StoreError| CareError::PrimaryWriteFailed {
        plant_id: request.plant_id,
        task_type: request.task_type,
        source,
    };
    let mut plant = store.plant(request.plant_id).map_err(|err| match err {
        StoreError::NotFound { .. } => CareError::from(err),
        other => primary_failed(other),
    })?;
    if plant.record_performed(request.task_type, day) {
        store.update_plant(&plant).map_err(primary_failed)?;
    }
    Ok(plant)
}

/// Pending task the completion settles: the one scheduled on `day`, or
/// failing that the latest one still open from an earlier day.
fn close_matching_task<S>(
    store: &S,
    request: &CompletionRequest,
    day: NaiveDate,
) -> Result<Option<CareTask>, StoreError>
where
    S: CareStore + ?Sized,
{
    let filter = TaskFilter::new()
        .plant(request.plant_id)
        .task_type(request.task_type)
        .pending()
        .scheduled_on_or_before(day);
    let candidates = store.tasks(&filter)?;
    let Some(mut task) = candidates
        .into_iter()
        .max_by_key(|task| task.scheduled_date)
    else {
        return Ok(None);
    };

    if task.complete(request.performed_at).is_err() {
        return Ok(None);
    }
    store.update_task(&task)?;
    Ok(Some(task))
}

fn degrade(plant_id: Uuid, step: SecondaryStep, source: StoreError) -> CareError {
    tracing::warn!(%plant_id, %step, error = %source, "secondary care write failed");
    CareError::SecondaryWriteFailed {
        plant_id,
        step,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plant::NewPlant;
    use crate::store::MemoryStore;
    use crate::task::TaskStatus;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, 0, 0).unwrap()
    }

    #[derive(Clone, Copy, PartialEq, Eq, Hash)]
    enum Op {
        ReadPlant,
        UpdatePlant,
        AppendLog,
        FindTasks,
        UpdateTask,
    }

    /// Wraps a memory store and fails the selected operations.
    struct FailingStore {
        inner: MemoryStore,
        failing: HashSet<Op>,
    }

    impl FailingStore {
        fn new(inner: MemoryStore, failing: &[Op]) -> Self {
            Self {
                inner,
                failing: failing.iter().copied().collect(),
            }
        }

        fn check(&self, op: Op) -> Result<(), StoreError> {
            if self.failing.contains(&op) {
                Err(StoreError::Unavailable("injected failure".into()))
            } else {
                Ok(())
            }
        }
    }

    impl CareStore for FailingStore {
        fn insert_plant(&self, plant: Plant) -> Result<(), StoreError> {
            self.inner.insert_plant(plant)
        }
        fn plant(&self, id: Uuid) -> Result<Plant, StoreError> {
            self.check(Op::ReadPlant)?;
            self.inner.plant(id)
        }
        fn plants(&self) -> Result<Vec<Plant>, StoreError> {
            self.inner.plants()
        }
        fn update_plant(&self, plant: &Plant) -> Result<(), StoreError> {
            self.check(Op::UpdatePlant)?;
            self.inner.update_plant(plant)
        }
        fn delete_plant(&self, id: Uuid) -> Result<(), StoreError> {
            self.inner.delete_plant(id)
        }
        fn insert_task(&self, task: CareTask) -> Result<(), StoreError> {
            self.inner.insert_task(task)
        }
        fn task(&self, id: Uuid) -> Result<CareTask, StoreError> {
            self.inner.task(id)
        }
        fn tasks(&self, filter: &TaskFilter) -> Result<Vec<CareTask>, StoreError> {
            self.check(Op::FindTasks)?;
            self.inner.tasks(filter)
        }
        fn update_task(&self, task: &CareTask) -> Result<(), StoreError> {
            self.check(Op::UpdateTask)?;
            self.inner.update_task(task)
        }
        fn append_log(&self, entry: CareLogEntry) -> Result<(), StoreError> {
            self.check(Op::AppendLog)?;
            self.inner.append_log(entry)
        }
        fn logs_for_plant(&self, plant_id: Uuid) -> Result<Vec<CareLogEntry>, StoreError> {
            self.inner.logs_for_plant(plant_id)
        }
    }

    fn seeded(scheduled: Option<NaiveDate>) -> (MemoryStore, Plant, Option<CareTask>) {
        let store = MemoryStore::new();
        let plant = NewPlant::new("Fern", 7)
            .last_watered(date(2024, 1, 1))
            .into_plant(Utc::now())
            .unwrap();
        store.insert_plant(plant.clone()).unwrap();
        let task = scheduled.map(|day| {
            let task = CareTask::pending(plant.id, TaskType::Watering, day, "Water Fern");
            store.insert_task(task.clone()).unwrap();
            task
        });
        (store, plant, task)
    }

    #[test]
    fn completes_same_day_task_and_logs() {
        let (store, plant, task) = seeded(Some(date(2024, 1, 8)));
        let performed_at = at(8, 9);
        let outcome = complete_task(
            &store,
            CompletionRequest::new(plant.id, TaskType::Watering, performed_at).with_note("misted too"),
        )
        .unwrap();

        assert!(outcome.is_fully_applied());
        assert_eq!(outcome.plant.last_watered_date, Some(date(2024, 1, 8)));
        assert_eq!(store.plant(plant.id).unwrap().last_watered_date, Some(date(2024, 1, 8)));

        let logs = store.logs_for_plant(plant.id).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].performed_at, performed_at);
        assert_eq!(logs[0].notes.as_deref(), Some("misted too"));

        let stored = store.task(task.unwrap().id).unwrap();
        assert_eq!(stored.status(), TaskStatus::Completed);
        assert_eq!(stored.completed_date(), Some(performed_at));
    }

    #[test]
    fn no_matching_task_is_not_an_error() {
        let (store, plant, _) = seeded(None);
        let outcome =
            complete_task(&store, CompletionRequest::new(plant.id, TaskType::Watering, at(5, 7)))
                .unwrap();
        assert!(outcome.is_fully_applied());
        assert!(outcome.completed_task.is_none());
        assert_eq!(store.plant(plant.id).unwrap().last_watered_date, Some(date(2024, 1, 5)));
        assert_eq!(store.logs_for_plant(plant.id).unwrap().len(), 1);
    }

    #[test]
    fn overdue_task_is_settled_by_late_completion() {
        let (store, plant, task) = seeded(Some(date(2024, 1, 8)));
        let outcome =
            complete_task(&store, CompletionRequest::new(plant.id, TaskType::Watering, at(10, 18)))
                .unwrap();
        let completed = outcome.completed_task.expect("overdue task matched");
        assert_eq!(completed.id, task.unwrap().id);
        assert_eq!(completed.scheduled_date, date(2024, 1, 8));
    }

    #[test]
    fn future_tasks_are_left_alone() {
        let (store, plant, task) = seeded(Some(date(2024, 1, 12)));
        complete_task(&store, CompletionRequest::new(plant.id, TaskType::Watering, at(10, 8)))
            .unwrap();
        assert!(store.task(task.unwrap().id).unwrap().is_pending());
    }

    #[test]
    fn repeated_completion_converges() {
        let (store, plant, task) = seeded(Some(date(2024, 1, 8)));
        let request = CompletionRequest::new(plant.id, TaskType::Watering, at(8, 9));
        complete_task(&store, request.clone()).unwrap();
        let after_first = (store.plant(plant.id).unwrap(), store.task(task.clone().unwrap().id).unwrap());
        let second = complete_task(&store, request).unwrap();

        assert!(second.completed_task.is_none());
        assert_eq!(store.plant(plant.id).unwrap(), after_first.0);
        assert_eq!(store.task(task.unwrap().id).unwrap(), after_first.1);
        // History is append-only; the repeat is kept.
        assert_eq!(store.logs_for_plant(plant.id).unwrap().len(), 2);
    }

    #[test]
    fn backdated_completion_keeps_newest_date() {
        let (store, plant, _) = seeded(None);
        complete_task(&store, CompletionRequest::new(plant.id, TaskType::Watering, at(10, 9)))
            .unwrap();
        let late = complete_task(
            &store,
            CompletionRequest::new(plant.id, TaskType::Watering, at(3, 9)),
        )
        .unwrap();

        assert!(late.is_fully_applied());
        assert_eq!(late.plant.last_watered_date, Some(date(2024, 1, 10)));
        let newest_logged = store
            .logs_for_plant(plant.id)
            .unwrap()
            .iter()
            .map(CareLogEntry::performed_on)
            .max();
        assert_eq!(store.plant(plant.id).unwrap().last_watered_date, newest_logged);
    }

    #[test]
    fn plant_read_failure_is_a_primary_failure() {
        let (inner, plant, task) = seeded(Some(date(2024, 1, 8)));
        let store = FailingStore::new(inner, &[Op::ReadPlant]);
        let err = complete_task(&store, CompletionRequest::new(plant.id, TaskType::Watering, at(8, 9)))
            .unwrap_err();
        assert!(matches!(
            err,
            CareError::PrimaryWriteFailed { task_type: TaskType::Watering, .. }
        ));
        assert!(store.inner.logs_for_plant(plant.id).unwrap().is_empty());
        assert!(store.inner.task(task.unwrap().id).unwrap().is_pending());
    }

    #[test]
    fn primary_failure_aborts_everything() {
        let (inner, plant, task) = seeded(Some(date(2024, 1, 8)));
        let store = FailingStore::new(inner, &[Op::UpdatePlant]);
        let err = complete_task(&store, CompletionRequest::new(plant.id, TaskType::Watering, at(8, 9)))
            .unwrap_err();

        assert!(matches!(err, CareError::PrimaryWriteFailed { .. }));
        assert!(store.logs_for_plant(plant.id).unwrap().is_empty());
        assert!(store.task(task.unwrap().id).unwrap().is_pending());
    }

    #[test]
    fn history_failure_does_not_stop_task_transition() {
        let (inner, plant, task) = seeded(Some(date(2024, 1, 8)));
        let store = FailingStore::new(inner, &[Op::AppendLog]);
        let outcome =
            complete_task(&store, CompletionRequest::new(plant.id, TaskType::Watering, at(8, 9)))
                .unwrap();

        assert!(outcome.log_entry.is_none());
        assert!(matches!(
            outcome.secondary_failures.as_slice(),
            [CareError::SecondaryWriteFailed {
                step: SecondaryStep::AppendHistory,
                ..
            }]
        ));
        assert_eq!(store.plant(plant.id).unwrap().last_watered_date, Some(date(2024, 1, 8)));
        assert_eq!(store.task(task.unwrap().id).unwrap().status(), TaskStatus::Completed);
    }

    #[test]
    fn task_failure_keeps_plant_and_history() {
        let (inner, plant, task) = seeded(Some(date(2024, 1, 8)));
        let store = FailingStore::new(inner, &[Op::UpdateTask]);
        let outcome =
            complete_task(&store, CompletionRequest::new(plant.id, TaskType::Watering, at(8, 9)))
                .unwrap();

        assert!(!outcome.is_fully_applied());
        assert!(outcome.log_entry.is_some());
        assert_eq!(store.logs_for_plant(plant.id).unwrap().len(), 1);
        assert!(store.task(task.unwrap().id).unwrap().is_pending());
    }

    #[test]
    fn both_secondary_failures_are_reported() {
        let (inner, plant, _) = seeded(Some(date(2024, 1, 8)));
        let store = FailingStore::new(inner, &[Op::AppendLog, Op::FindTasks]);
        let outcome =
            complete_task(&store, CompletionRequest::new(plant.id, TaskType::Watering, at(8, 9)))
                .unwrap();
        assert_eq!(outcome.secondary_failures.len(), 2);
        assert_eq!(outcome.plant.last_watered_date, Some(date(2024, 1, 8)));
    }

    #[test]
    fn unknown_plant_is_not_found() {
        let store = MemoryStore::new();
        let err = complete_task(
            &store,
            CompletionRequest::new(Uuid::new_v4(), TaskType::Watering, at(8, 9)),
        )
        .unwrap_err();
        assert!(matches!(err, CareError::NotFound { .. }));
    }

    #[test]
    fn non_recurring_action_only_logs() {
        let (store, plant, _) = seeded(None);
        let before = store.plant(plant.id).unwrap();
        let outcome =
            complete_task(&store, CompletionRequest::new(plant.id, TaskType::Pruning, at(9, 9)))
                .unwrap();
        assert_eq!(outcome.plant, before);
        assert_eq!(store.logs_for_plant(plant.id).unwrap()[0].task_type, TaskType::Pruning);
    }
}
