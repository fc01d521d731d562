use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CareError, CareResult};
use crate::recurrence::Cadence;
use crate::task::TaskType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    #[serde(rename = "Needs Attention")]
    NeedsAttention,
    Critical,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            HealthStatus::Healthy => "Healthy",
            HealthStatus::NeedsAttention => "Needs Attention",
            HealthStatus::Critical => "Critical",
        };
        f.write_str(label)
    }
}

impl std::str::FromStr for HealthStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "healthy" => Ok(HealthStatus::Healthy),
            "needsattention" => Ok(HealthStatus::NeedsAttention),
            "critical" => Ok(HealthStatus::Critical),
            _ => Err(format!("unknown health status `{s}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SunlightRequirement {
    #[serde(rename = "Full Sun")]
    FullSun,
    #[serde(rename = "Partial Sun")]
    PartialSun,
    #[serde(rename = "Bright, indirect")]
    BrightIndirect,
    #[serde(rename = "Low light")]
    LowLight,
    Shade,
}

impl std::fmt::Display for SunlightRequirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SunlightRequirement::FullSun => "Full Sun",
            SunlightRequirement::PartialSun => "Partial Sun",
            SunlightRequirement::BrightIndirect => "Bright, indirect",
            SunlightRequirement::LowLight => "Low light",
            SunlightRequirement::Shade => "Shade",
        };
        f.write_str(label)
    }
}

impl std::str::FromStr for SunlightRequirement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "fullsun" | "full" => Ok(SunlightRequirement::FullSun),
            "partialsun" | "partial" => Ok(SunlightRequirement::PartialSun),
            "brightindirect" | "indirect" => Ok(SunlightRequirement::BrightIndirect),
            "lowlight" | "low" => Ok(SunlightRequirement::LowLight),
            "shade" => Ok(SunlightRequirement::Shade),
            _ => Err(format!("unknown sunlight requirement `{s}`")),
        }
    }
}

/// A tracked plant together with its care cadences.
///
/// `last_watered_date` and `last_fertilized_date` mirror the newest matching
/// care log entry; the completion path keeps them in step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plant {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub plant_type: String,
    pub location: String,
    pub sunlight_requirement: SunlightRequirement,
    pub health_status: HealthStatus,
    pub image_url: Option<String>,
    pub notes: Option<String>,
    pub watering_frequency_days: Cadence,
    pub fertilizing_frequency_days: Option<Cadence>,
    pub last_watered_date: Option<NaiveDate>,
    pub last_fertilized_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Plant {
    /// Cadence for the task type, if the plant schedules it at all.
    pub fn cadence_for(&self, task_type: TaskType) -> Option<Cadence> {
        match task_type {
            TaskType::Watering => Some(self.watering_frequency_days),
            TaskType::Fertilizing => self.fertilizing_frequency_days,
            TaskType::Pesticide | TaskType::Pruning | TaskType::Repotting | TaskType::Checking => {
                None
            }
        }
    }

    pub fn last_performed(&self, task_type: TaskType) -> Option<NaiveDate> {
        match task_type {
            TaskType::Watering => self.last_watered_date,
            TaskType::Fertilizing => self.last_fertilized_date,
            TaskType::Pesticide | TaskType::Pruning | TaskType::Repotting | TaskType::Checking => {
                None
            }
        }
    }

    /// Advances the cached last-performed date to `date`. The cache only moves
    /// forward, so a backdated action leaves it alone. Returns whether the
    /// plant changed.
    pub fn record_performed(&mut self, task_type: TaskType, date: NaiveDate) -> bool {
        let slot = match task_type {
            TaskType::Watering => &mut self.last_watered_date,
            TaskType::Fertilizing => &mut self.last_fertilized_date,
            TaskType::Pesticide | TaskType::Pruning | TaskType::Repotting | TaskType::Checking => {
                return false;
            }
        };
        if slot.is_some_and(|current| current >= date) {
            return false;
        }
        *slot = Some(date);
        true
    }

    /// Task types with a cadence on this plant, in scheduling order.
    pub fn scheduled_task_types(&self) -> impl Iterator<Item = (TaskType, Cadence)> + '_ {
        [TaskType::Watering, TaskType::Fertilizing]
            .into_iter()
            .filter_map(|kind| self.cadence_for(kind).map(|cadence| (kind, cadence)))
    }

    pub fn set_cadences(
        &mut self,
        watering_days: i64,
        fertilizing_days: Option<i64>,
    ) -> CareResult<()> {
        let watering = Cadence::new(watering_days)?;
        let fertilizing = fertilizing_days.map(Cadence::new).transpose()?;
        self.watering_frequency_days = watering;
        self.fertilizing_frequency_days = fertilizing;
        Ok(())
    }
}

/// User-supplied registration data, validated by [`NewPlant::into_plant`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPlant {
    pub name: String,
    pub plant_type: String,
    pub location: String,
    pub sunlight_requirement: SunlightRequirement,
    pub health_status: HealthStatus,
    pub image_url: Option<String>,
    pub notes: Option<String>,
    pub watering_frequency_days: i64,
    pub fertilizing_frequency_days: Option<i64>,
    pub last_watered_date: Option<NaiveDate>,
    pub last_fertilized_date: Option<NaiveDate>,
}

impl NewPlant {
    pub fn new(name: impl Into<String>, watering_frequency_days: i64) -> Self {
        Self {
            name: name.into(),
            plant_type: String::new(),
            location: String::new(),
            sunlight_requirement: SunlightRequirement::BrightIndirect,
            health_status: HealthStatus::Healthy,
            image_url: None,
            notes: None,
            watering_frequency_days,
            fertilizing_frequency_days: None,
            last_watered_date: None,
            last_fertilized_date: None,
        }
    }

    pub fn fertilize_every(mut self, days: i64) -> Self {
        self.fertilizing_frequency_days = Some(days);
        self
    }

    pub fn last_watered(mut self, date: NaiveDate) -> Self {
        self.last_watered_date = Some(date);
        self
    }

    pub fn last_fertilized(mut self, date: NaiveDate) -> Self {
        self.last_fertilized_date = Some(date);
        self
    }

    pub fn into_plant(self, created_at: DateTime<Utc>) -> CareResult<Plant> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(CareError::InvalidPlant("name must not be blank".into()));
        }
        let watering_frequency_days = Cadence::new(self.watering_frequency_days)?;
        let fertilizing_frequency_days = self
            .fertilizing_frequency_days
            .map(Cadence::new)
            .transpose()?;
        let optional = |value: Option<String>| value.filter(|text| !text.trim().is_empty());

        Ok(Plant {
            id: Uuid::new_v4(),
            name,
            plant_type: self.plant_type.trim().to_string(),
            location: self.location.trim().to_string(),
            sunlight_requirement: self.sunlight_requirement,
            health_status: self.health_status,
            image_url: optional(self.image_url),
            notes: optional(self.notes),
            watering_frequency_days,
            fertilizing_frequency_days,
            last_watered_date: self.last_watered_date,
            last_fertilized_date: self.last_fertilized_date,
            created_at,
        })
    }
}
