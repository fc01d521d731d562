//! Command-line surface of `haritpal`.

use std::path::PathBuf;

use care_domain::plant::{HealthStatus, SunlightRequirement};
use care_domain::task::TaskType;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "haritpal", version, about = "Houseplant care reminders and history")]
pub struct Cli {
    /// Care data file; overrides `HARITPAL_DATA`.
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Register a plant and schedule its first care.
    Add(AddPlant),
    /// List plants with their next watering.
    Plants,
    /// Pending care due today.
    Today,
    /// Pending care left over from earlier days.
    Overdue,
    /// Generate any care tasks that have come due.
    Refresh,
    /// Record a care action for a plant.
    Complete {
        plant: String,
        task_type: TaskType,
        #[arg(long)]
        note: Option<String>,
        /// When it was done (RFC 3339); defaults to now.
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Water a plant right now.
    Water { plant: String },
    /// Skip a pending task.
    Skip { task: String },
    /// Set a plant's health status.
    Health { plant: String, status: HealthStatus },
    /// Change how often a plant is watered and fertilized.
    Cadence {
        plant: String,
        #[arg(long)]
        water_every: i64,
        #[arg(long)]
        fertilize_every: Option<i64>,
    },
    /// Show a plant's care history.
    History { plant: String },
    /// Delete a plant with its tasks and history.
    Remove { plant: String },
    /// Dashboard counts.
    Summary,
}

#[derive(Debug, Args)]
pub struct AddPlant {
    pub name: String,
    #[arg(long = "type", default_value = "")]
    pub plant_type: String,
    #[arg(long, default_value = "")]
    pub location: String,
    #[arg(long, default_value = "bright-indirect")]
    pub sunlight: SunlightRequirement,
    #[arg(long, default_value = "healthy")]
    pub health: HealthStatus,
    #[arg(long)]
    pub water_every: i64,
    #[arg(long)]
    pub fertilize_every: Option<i64>,
    #[arg(long)]
    pub last_watered: Option<NaiveDate>,
    #[arg(long)]
    pub last_fertilized: Option<NaiveDate>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use care_domain::plant::SunlightRequirement;
    use care_domain::task::TaskType;
    use clap::Parser;

    #[test]
    fn parses_add_subcommand() {
        let cli = Cli::parse_from([
            "haritpal",
            "add",
            "Monstera",
            "--water-every",
            "7",
            "--sunlight",
            "low light",
            "--last-watered",
            "2024-01-01",
        ]);
        let Command::Add(add) = cli.command else {
            panic!("expected add");
        };
        assert_eq!(add.name, "Monstera");
        assert_eq!(add.water_every, 7);
        assert_eq!(add.sunlight, SunlightRequirement::LowLight);
        assert!(add.last_watered.is_some());
    }

    #[test]
    fn parses_complete_with_global_flags() {
        let cli = Cli::parse_from([
            "haritpal",
            "complete",
            "Monstera",
            "fertilizing",
            "--note",
            "half strength",
            "--json",
        ]);
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Command::Complete {
                task_type: TaskType::Fertilizing,
                ..
            }
        ));
    }

    #[test]
    fn rejects_unknown_task_type() {
        assert!(Cli::try_parse_from(["haritpal", "complete", "Fern", "misting"]).is_err());
    }
}
