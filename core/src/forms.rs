//! Raw user input for each record kind, shaped into a creation record.
//!
//! Fields arrive as text (CLI arguments, HTML-style form posts) or as JSON
//! numbers; both are accepted.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use crate::models::{
    MealType, NewExerciseRecord, NewFoodRecord, NewRecord, NewSleepRecord, NewWeightRecord,
    ParseEnumError, SleepQuality, parse_clock_time, sleep_duration_hours,
};

pub const EXERCISE_TYPES: &[&str] = &[
    "running",
    "brisk walking",
    "swimming",
    "cycling",
    "yoga",
    "gym",
    "ball sports",
    "hiking",
    "dancing",
    "other",
];

pub const DEFAULT_BEDTIME: &str = "22:00";
pub const DEFAULT_WAKE_TIME: &str = "07:00";

pub const WEIGHT_RANGE_KG: (f64, f64) = (20.0, 200.0);
pub const BODY_FAT_RANGE: (f64, f64) = (1.0, 50.0);
pub const MUSCLE_RANGE: (f64, f64) = (10.0, 60.0);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{field} must be a number (got '{value}')")]
    InvalidNumber { field: &'static str, value: String },
    #[error("{field} must be at least {min}")]
    TooSmall { field: &'static str, min: u32 },
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("Invalid date '{0}'. Use YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Invalid {field} '{value}'. Use HH:MM")]
    InvalidTime { field: &'static str, value: String },
    #[error(transparent)]
    InvalidChoice(#[from] ParseEnumError),
}

/// Input that can be validated into a record ready for storage.
pub trait Form {
    type Output: NewRecord;

    /// Validate against `today`, which fills in a missing date.
    fn to_record(&self, today: NaiveDate) -> Result<Self::Output, FormError>;
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExerciseForm {
    #[serde(deserialize_with = "loose_opt")]
    pub date: Option<String>,
    #[serde(rename = "type", deserialize_with = "loose")]
    pub exercise_type: String,
    #[serde(deserialize_with = "loose")]
    pub duration: String,
    #[serde(deserialize_with = "loose")]
    pub calories: String,
    #[serde(deserialize_with = "loose_opt")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FoodForm {
    #[serde(deserialize_with = "loose_opt")]
    pub date: Option<String>,
    #[serde(deserialize_with = "loose_opt")]
    pub meal: Option<String>,
    #[serde(deserialize_with = "loose")]
    pub name: String,
    #[serde(deserialize_with = "loose")]
    pub calories: String,
    #[serde(deserialize_with = "loose_opt")]
    pub weight: Option<String>,
    #[serde(deserialize_with = "loose_opt")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SleepForm {
    #[serde(deserialize_with = "loose_opt")]
    pub date: Option<String>,
    #[serde(deserialize_with = "loose_opt")]
    pub bedtime: Option<String>,
    #[serde(deserialize_with = "loose_opt")]
    pub wake_time: Option<String>,
    #[serde(deserialize_with = "loose_opt")]
    pub quality: Option<String>,
    #[serde(deserialize_with = "loose_opt")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeightForm {
    #[serde(deserialize_with = "loose_opt")]
    pub date: Option<String>,
    #[serde(deserialize_with = "loose")]
    pub weight: String,
    #[serde(deserialize_with = "loose_opt")]
    pub body_fat: Option<String>,
    #[serde(deserialize_with = "loose_opt")]
    pub muscle: Option<String>,
}

impl Form for ExerciseForm {
    type Output = NewExerciseRecord;

    fn to_record(&self, today: NaiveDate) -> Result<NewExerciseRecord, FormError> {
        let exercise_type = required("type", &self.exercise_type)?;
        let duration = positive_int("duration", required("duration", &self.duration)?)?;
        let calories = positive_int("calories", required("calories", &self.calories)?)?;
        Ok(NewExerciseRecord {
            date: form_date(self.date.as_deref(), today)?,
            exercise_type: exercise_type.to_string(),
            duration,
            calories,
            notes: notes(self.notes.as_deref()),
        })
    }
}

impl Form for FoodForm {
    type Output = NewFoodRecord;

    fn to_record(&self, today: NaiveDate) -> Result<NewFoodRecord, FormError> {
        let name = required("name", &self.name)?;
        let calories = positive_int("calories", required("calories", &self.calories)?)?;
        let meal = match present(self.meal.as_deref()) {
            Some(m) => m.parse::<MealType>()?,
            None => MealType::default(),
        };
        let weight = present(self.weight.as_deref())
            .map(|w| positive_int("weight", w))
            .transpose()?;
        Ok(NewFoodRecord {
            date: form_date(self.date.as_deref(), today)?,
            meal,
            name: name.to_string(),
            calories,
            weight,
            notes: notes(self.notes.as_deref()),
        })
    }
}

impl Form for SleepForm {
    type Output = NewSleepRecord;

    fn to_record(&self, today: NaiveDate) -> Result<NewSleepRecord, FormError> {
        let bedtime = clock("bedtime", self.bedtime.as_deref(), DEFAULT_BEDTIME)?;
        let wake_time = clock("wake time", self.wake_time.as_deref(), DEFAULT_WAKE_TIME)?;
        let quality = match present(self.quality.as_deref()) {
            Some(q) => {
                let value = q.parse::<u8>().map_err(|_| FormError::InvalidNumber {
                    field: "quality",
                    value: q.to_string(),
                })?;
                SleepQuality::new(value).ok_or(FormError::OutOfRange {
                    field: "quality",
                    min: f64::from(SleepQuality::MIN),
                    max: f64::from(SleepQuality::MAX),
                })?
            }
            None => SleepQuality::default(),
        };
        Ok(NewSleepRecord {
            date: form_date(self.date.as_deref(), today)?,
            bedtime,
            wake_time,
            duration: sleep_duration_hours(bedtime, wake_time),
            quality,
            notes: notes(self.notes.as_deref()),
        })
    }
}

impl Form for WeightForm {
    type Output = NewWeightRecord;

    fn to_record(&self, today: NaiveDate) -> Result<NewWeightRecord, FormError> {
        let weight = ranged("weight", required("weight", &self.weight)?, WEIGHT_RANGE_KG)?;
        let body_fat = present(self.body_fat.as_deref())
            .map(|v| ranged("body fat", v, BODY_FAT_RANGE))
            .transpose()?;
        let muscle = present(self.muscle.as_deref())
            .map(|v| ranged("muscle", v, MUSCLE_RANGE))
            .transpose()?;
        Ok(NewWeightRecord {
            date: form_date(self.date.as_deref(), today)?,
            weight,
            body_fat,
            muscle,
        })
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, FormError> {
    present(Some(value)).ok_or(FormError::Missing(field))
}

fn notes(value: Option<&str>) -> Option<String> {
    present(value).map(str::to_string)
}

/// Whole numbers, including JSON floats such as `30.0`. Fractions are
/// rejected rather than truncated.
#[allow(clippy::cast_sign_loss)]
fn positive_int(field: &'static str, value: &str) -> Result<u32, FormError> {
    let n = value
        .parse::<u32>()
        .ok()
        .or_else(|| {
            value
                .parse::<f64>()
                .ok()
                .filter(|n| n.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(n))
                .map(|n| n as u32)
        })
        .ok_or_else(|| FormError::InvalidNumber {
            field,
            value: value.to_string(),
        })?;
    if n == 0 {
        return Err(FormError::TooSmall { field, min: 1 });
    }
    Ok(n)
}

fn ranged(field: &'static str, value: &str, (min, max): (f64, f64)) -> Result<f64, FormError> {
    let n = value
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| FormError::InvalidNumber {
            field,
            value: value.to_string(),
        })?;
    if !(min..=max).contains(&n) {
        return Err(FormError::OutOfRange { field, min, max });
    }
    Ok(n)
}

fn form_date(value: Option<&str>, today: NaiveDate) -> Result<NaiveDate, FormError> {
    match present(value) {
        Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
            .map_err(|_| FormError::InvalidDate(d.to_string())),
        None => Ok(today),
    }
}

fn clock(
    field: &'static str,
    value: Option<&str>,
    default: &str,
) -> Result<chrono::NaiveTime, FormError> {
    let raw = present(value).unwrap_or(default);
    parse_clock_time(raw).ok_or_else(|| FormError::InvalidTime {
        field,
        value: raw.to_string(),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Text(String),
    Number(serde_json::Number),
}

impl From<Loose> for String {
    fn from(value: Loose) -> Self {
        match value {
            Loose::Text(s) => s,
            Loose::Number(n) => n.to_string(),
        }
    }
}

fn loose<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<Loose>::deserialize(deserializer)?
        .map(String::from)
        .unwrap_or_default())
}

fn loose_opt<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Loose>::deserialize(deserializer)?.map(String::from))
}
