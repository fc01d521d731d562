use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use care_domain::{
    json_store::JsonFileStore,
    notifications::{NotificationSink, ReminderRequest},
    plant::{NewPlant, Plant},
    reconcile::{CompletionOutcome, CompletionRequest},
    recurrence::{DueIn, SinceLast},
    service::{TaskView, DEFAULT_REMINDER_HOUR},
    task::{CareTask, TaskFilter, TaskType},
    CareService,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::cli::{AddPlant, Cli, Command};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub(crate) data_path: PathBuf,
    pub(crate) reminder_hour: u32,
    pub(crate) today_override: Option<NaiveDate>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("haritpal.json"),
            reminder_hour: DEFAULT_REMINDER_HOUR,
            today_override: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_lookup(|key| std::env::var(key).ok()))
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(path) = lookup("HARITPAL_DATA") {
            if !path.trim().is_empty() {
                config.data_path = PathBuf::from(path.trim());
            }
        }
        if let Some(hour) = lookup("HARITPAL_REMINDER_HOUR") {
            if let Ok(value) = hour.trim().parse::<u32>() {
                if value < 24 {
                    config.reminder_hour = value;
                }
            }
        }
        if let Some(today) = lookup("HARITPAL_TODAY") {
            if let Ok(date) = NaiveDate::parse_from_str(today.trim(), "%Y-%m-%d") {
                config.today_override = Some(date);
            }
        }
        config
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(path) = &cli.data {
            self.data_path = path.clone();
        }
    }

    /// Current instant, pinned to midday of `HARITPAL_TODAY` when set.
    pub(crate) fn now(&self) -> DateTime<Utc> {
        match self.today_override {
            Some(date) => date
                .and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN))
                .and_utc(),
            None => Utc::now(),
        }
    }
}

/// Reminders land in the log; the terminal has no notification centre.
struct TracingSink;

impl NotificationSink for TracingSink {
    fn schedule(&self, reminder: ReminderRequest) {
        info!(
            task_id = %reminder.task_id,
            at = %reminder.scheduled_for,
            "reminder: {}",
            reminder.title
        );
    }

    fn clear_for_task(&self, task: &CareTask) {
        debug!(task_id = %task.id, "reminder cleared");
    }

    fn clear_for_plant(&self, plant_id: Uuid) {
        debug!(%plant_id, "reminders cleared for plant");
    }
}

pub fn run(mut config: AppConfig, cli: Cli) -> Result<()> {
    config.apply_cli(&cli);
    let store = JsonFileStore::open(&config.data_path)
        .with_context(|| format!("opening care data at {}", config.data_path.display()))?;
    let service = CareService::builder()
        .with_store(store)
        .with_notification_sink(Box::new(TracingSink))
        .reminder_hour(config.reminder_hour)
        .build();

    let now = config.now();
    let today = now.date_naive();
    debug!(%today, path = %config.data_path.display(), "running command");
    let json = cli.json;

    match cli.command {
        Command::Add(add) => {
            let plant = service.register_plant(new_plant(add), now)?;
            emit(json, &plant, || format!("Added {} ({})", plant.name, plant.id))
        }
        Command::Plants => {
            let plants = service.plants()?;
            let overviews = plants
                .iter()
                .map(|plant| service.plant_overview(plant.id, today))
                .collect::<Result<Vec<_>, _>>()?;
            emit(json, &overviews, || {
                if overviews.is_empty() {
                    return "No plants yet".to_string();
                }
                overviews
                    .iter()
                    .map(|overview| {
                        let next = overview
                            .upcoming
                            .iter()
                            .find(|care| care.task_type == TaskType::Watering)
                            .map(|care| care.due_in);
                        plant_line(&overview.plant, overview.last_watered, next)
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        Command::Today => {
            let tasks = service.todays_tasks(today)?;
            emit(json, &tasks, || task_lines(&tasks, "Nothing due today"))
        }
        Command::Overdue => {
            let tasks = service.overdue_tasks(today)?;
            emit(json, &tasks, || task_lines(&tasks, "Nothing overdue"))
        }
        Command::Refresh => {
            let report = service.refresh_schedule(today)?;
            emit(json, &report, || {
                format!(
                    "Checked {} plants, created {} tasks",
                    report.plants_checked,
                    report.tasks_created.len()
                )
            })
        }
        Command::Complete {
            plant,
            task_type,
            note,
            at,
        } => {
            let plant = resolve_plant(&service, &plant)?;
            let mut request = CompletionRequest::new(plant.id, task_type, at.unwrap_or(now));
            request.note = note;
            let outcome = service.complete_task(request)?;
            report_completion(json, &plant, &outcome)
        }
        Command::Water { plant } => {
            let plant = resolve_plant(&service, &plant)?;
            let outcome = service.water_now(plant.id, now)?;
            report_completion(json, &plant, &outcome)
        }
        Command::Skip { task } => {
            let task_id = resolve_task(&service, &task)?;
            let task = service.skip_task(task_id)?;
            emit(json, &task, || format!("Skipped {}", task.title))
        }
        Command::Health { plant, status } => {
            let plant = resolve_plant(&service, &plant)?;
            let plant = service.update_health_status(plant.id, status)?;
            emit(json, &plant, || format!("{} is now {}", plant.name, plant.health_status))
        }
        Command::Cadence {
            plant,
            water_every,
            fertilize_every,
        } => {
            let plant = resolve_plant(&service, &plant)?;
            let plant = service.update_cadence(plant.id, water_every, fertilize_every, today)?;
            emit(json, &plant, || {
                format!("{} is watered {}", plant.name, plant.watering_frequency_days)
            })
        }
        Command::History { plant } => {
            let plant = resolve_plant(&service, &plant)?;
            let history = service.care_history(plant.id)?;
            emit(json, &history, || {
                if history.is_empty() {
                    return format!("No care recorded for {}", plant.name);
                }
                history
                    .iter()
                    .map(|entry| {
                        let note = entry.notes.as_deref().unwrap_or("");
                        format!(
                            "{}  {:<12} {}",
                            entry.performed_at.format("%Y-%m-%d %H:%M"),
                            entry.task_type,
                            note
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        Command::Remove { plant } => {
            let plant = resolve_plant(&service, &plant)?;
            service.remove_plant(plant.id)?;
            emit(json, &plant.id, || format!("Removed {}", plant.name))
        }
        Command::Summary => {
            let summary = service.summary(today)?;
            emit(json, &summary, || {
                format!(
                    "{} plants: {} healthy, {} need attention, {} critical\n{} tasks today, {} overdue",
                    summary.plants,
                    summary.healthy,
                    summary.needs_attention,
                    summary.critical,
                    summary.tasks_today,
                    summary.overdue
                )
            })
        }
    }
}

fn new_plant(add: AddPlant) -> NewPlant {
    NewPlant {
        name: add.name,
        plant_type: add.plant_type,
        location: add.location,
        sunlight_requirement: add.sunlight,
        health_status: add.health,
        image_url: None,
        notes: add.notes,
        watering_frequency_days: add.water_every,
        fertilizing_frequency_days: add.fertilize_every,
        last_watered_date: add.last_watered,
        last_fertilized_date: add.last_fertilized,
    }
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text());
    }
    Ok(())
}

fn report_completion(json: bool, plant: &Plant, outcome: &CompletionOutcome) -> Result<()> {
    for failure in &outcome.secondary_failures {
        eprintln!("warning: {failure}");
    }
    emit(json, outcome, || match &outcome.completed_task {
        Some(task) => format!("Recorded care for {}; completed \"{}\"", plant.name, task.title),
        None => format!("Recorded care for {}", plant.name),
    })
}

pub(crate) fn plant_line(plant: &Plant, last_watered: SinceLast, next: Option<DueIn>) -> String {
    let next = next.map_or_else(|| "not scheduled".to_string(), |due| due.to_string());
    format!(
        "{}  {:<20} {:<16} last watered: {:<12} next: {}",
        short_id(plant.id),
        plant.name,
        plant.health_status.to_string(),
        last_watered.to_string(),
        next
    )
}

fn task_lines(tasks: &[TaskView], empty: &str) -> String {
    if tasks.is_empty() {
        return empty.to_string();
    }
    tasks
        .iter()
        .map(|view| {
            format!(
                "{}  {}  {:<12} {}",
                short_id(view.task.id),
                view.task.scheduled_date,
                view.task.task_type,
                view.task.title
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn short_id(id: Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

/// Accepts a full id, an id prefix, or a plant name (case-insensitive).
pub(crate) fn resolve_plant(service: &CareService, reference: &str) -> Result<Plant> {
    if let Ok(id) = Uuid::parse_str(reference) {
        return Ok(service.plant(id)?);
    }
    let needle = reference.trim().to_ascii_lowercase();
    let plants = service.plants()?;
    let matches: Vec<&Plant> = plants
        .iter()
        .filter(|plant| {
            plant.name.to_ascii_lowercase() == needle
                || plant.id.simple().to_string().starts_with(&needle)
        })
        .collect();
    match matches.as_slice() {
        [plant] => Ok((*plant).clone()),
        [] => Err(anyhow!("no plant matches `{reference}`")),
        _ => bail!("`{reference}` matches {} plants; use the id", matches.len()),
    }
}

fn resolve_task(service: &CareService, reference: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(reference) {
        return Ok(id);
    }
    let needle = reference.trim().to_ascii_lowercase();
    let tasks = service.store().tasks(&TaskFilter::new().pending())?;
    let matches: Vec<Uuid> = tasks
        .iter()
        .map(|task| task.id)
        .filter(|id| id.simple().to_string().starts_with(&needle))
        .collect();
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(anyhow!("no pending task matches `{reference}`")),
        _ => bail!("`{reference}` matches {} tasks; use the full id", matches.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn config_reads_environment_and_ignores_bad_values() {
        let config = AppConfig::from_lookup(|key| match key {
            "HARITPAL_DATA" => Some("/tmp/plants.json".into()),
            "HARITPAL_REMINDER_HOUR" => Some("27".into()),
            "HARITPAL_TODAY" => Some("2024-01-10".into()),
            _ => None,
        });
        assert_eq!(config.data_path, PathBuf::from("/tmp/plants.json"));
        assert_eq!(config.reminder_hour, DEFAULT_REMINDER_HOUR);
        assert_eq!(
            config.now().date_naive(),
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
        );
    }

    #[test]
    fn resolves_plants_by_name_or_id_prefix() {
        let service = CareService::builder().build();
        let fern = service
            .register_plant(NewPlant::new("Boston Fern", 4), Utc::now())
            .unwrap();
        service
            .register_plant(NewPlant::new("Aloe", 14), Utc::now())
            .unwrap();

        assert_eq!(resolve_plant(&service, "boston fern").unwrap().id, fern.id);
        let prefix = &fern.id.simple().to_string()[..8];
        assert_eq!(resolve_plant(&service, prefix).unwrap().id, fern.id);
        assert!(resolve_plant(&service, "cactus").is_err());
    }

    #[test]
    fn plant_line_shows_unscheduled_watering() {
        let plant = NewPlant::new("Cactus", 1_000_000_000)
            .into_plant(Utc::now())
            .unwrap();
        let line = plant_line(&plant, SinceLast::Never, None);
        assert!(line.ends_with("next: not scheduled"));
        let line = plant_line(&plant, SinceLast::Never, Some(DueIn::Tomorrow));
        assert!(line.ends_with("next: Tomorrow"));
    }
}
