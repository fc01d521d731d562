use std::sync::Arc;

use care_domain::{
    json_store::JsonFileStore,
    plant::NewPlant,
    reconcile::CompletionRequest,
    store::CareStore,
    task::{TaskFilter, TaskStatus, TaskType},
    CareService,
};
use chrono::{NaiveDate, TimeZone, Utc};
use tempfile::tempdir;

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).expect("valid date")
}

#[test]
fn weekly_watering_cycle_survives_reopen() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("haritpal.json");

    let store: Arc<dyn CareStore> = Arc::new(JsonFileStore::open(&path).expect("open store"));
    let service = CareService::builder()
        .with_shared_store(store.clone())
        .build();

    let plant = service
        .register_plant(
            NewPlant::new("Monstera", 7).last_watered(date(1)),
            Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
        )
        .expect("register plant");
    assert!(service.todays_tasks(date(1)).expect("today").is_empty());

    // Due on the 8th: exactly one pending watering task.
    let created = service.refresh_schedule(date(8)).expect("refresh");
    assert_eq!(created.tasks_created.len(), 1);
    let due = &created.tasks_created[0];
    assert_eq!(due.task_type, TaskType::Watering);
    assert_eq!(due.scheduled_date, date(8));

    // Unattended until the 10th: nothing new, the 8th stays pending.
    assert!(service
        .refresh_schedule(date(10))
        .expect("refresh")
        .tasks_created
        .is_empty());
    let overdue = service.overdue_tasks(date(10)).expect("overdue");
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].plant_name, "Monstera");

    // Watered on the 10th: the 8th's task is settled.
    let performed_at = Utc.with_ymd_and_hms(2024, 1, 10, 17, 45, 0).unwrap();
    let outcome = service
        .complete_task(CompletionRequest::new(plant.id, TaskType::Watering, performed_at))
        .expect("complete");
    assert!(outcome.is_fully_applied());
    assert_eq!(outcome.plant.last_watered_date, Some(date(10)));
    let completed = outcome.completed_task.expect("task matched");
    assert_eq!(completed.id, due.id);
    assert_eq!(completed.scheduled_date, date(8));
    assert_eq!(completed.completed_date(), Some(performed_at));

    assert!(service
        .refresh_schedule(date(10))
        .expect("refresh")
        .tasks_created
        .is_empty());
    let overview = service.plant_overview(plant.id, date(10)).expect("overview");
    assert_eq!(overview.upcoming[0].due_date, date(17));

    drop(service);
    drop(store);

    // Everything above was flushed to disk.
    let reopened = JsonFileStore::open(&path).expect("reopen store");
    let stored = reopened.plant(plant.id).expect("plant persisted");
    assert_eq!(stored.last_watered_date, Some(date(10)));
    let tasks = reopened
        .tasks(&TaskFilter::new().plant(plant.id))
        .expect("tasks");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].status(), TaskStatus::Completed);
    let history = reopened.logs_for_plant(plant.id).expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].performed_at, performed_at);
}

#[test]
fn fertilizing_runs_on_its_own_cadence() {
    let service = CareService::builder().build();
    let plant = service
        .register_plant(
            NewPlant::new("Lemon tree", 3)
                .fertilize_every(14)
                .last_watered(date(1))
                .last_fertilized(date(1)),
            Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap(),
        )
        .expect("register");

    let report = service.refresh_schedule(date(4)).expect("refresh");
    assert_eq!(report.tasks_created.len(), 1);
    assert_eq!(report.tasks_created[0].task_type, TaskType::Watering);

    let report = service.refresh_schedule(date(15)).expect("refresh");
    let kinds: Vec<TaskType> = report.tasks_created.iter().map(|t| t.task_type).collect();
    assert_eq!(kinds, vec![TaskType::Fertilizing]);

    let outcome = service
        .complete_task(CompletionRequest::new(
            plant.id,
            TaskType::Fertilizing,
            Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap(),
        ))
        .expect("complete");
    assert_eq!(outcome.plant.last_fertilized_date, Some(date(15)));
    assert_eq!(outcome.plant.last_watered_date, Some(date(1)));
    // The watering task from the 4th is untouched by fertilizing.
    assert_eq!(service.overdue_tasks(date(15)).expect("overdue").len(), 1);
}
