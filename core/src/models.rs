use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Raised when a string doesn't name a known record kind or meal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {what} '{value}'. Must be one of: {expected}")]
pub struct ParseEnumError {
    pub what: &'static str,
    pub value: String,
    pub expected: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Exercise,
    Food,
    Sleep,
    Weight,
}

impl RecordKind {
    pub const ALL: [RecordKind; 4] = [
        RecordKind::Exercise,
        RecordKind::Food,
        RecordKind::Sleep,
        RecordKind::Weight,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exercise => "exercise",
            Self::Food => "food",
            Self::Sleep => "sleep",
            Self::Weight => "weight",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == lower)
            .ok_or_else(|| ParseEnumError {
                what: "record kind",
                value: s.to_string(),
                expected: Self::ALL.map(Self::as_str).join(", "),
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    #[default]
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

pub const MEAL_TYPES: &[&str] = &["breakfast", "lunch", "dinner", "snack"];

impl MealType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
            Self::Snack => "snack",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Breakfast => "Breakfast",
            Self::Lunch => "Lunch",
            Self::Dinner => "Dinner",
            Self::Snack => "Snack",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => Ok(Self::Breakfast),
            "lunch" => Ok(Self::Lunch),
            "dinner" => Ok(Self::Dinner),
            "snack" => Ok(Self::Snack),
            _ => Err(ParseEnumError {
                what: "meal type",
                value: s.to_string(),
                expected: MEAL_TYPES.join(", "),
            }),
        }
    }
}

/// Subjective sleep rating, 1 (very poor) to 5 (very good).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SleepQuality(u8);

impl SleepQuality {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    #[must_use]
    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "very poor",
            2 => "poor",
            3 => "fair",
            4 => "good",
            _ => "very good",
        }
    }
}

impl Default for SleepQuality {
    fn default() -> Self {
        Self(3)
    }
}

impl TryFrom<u8> for SleepQuality {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| {
            format!(
                "sleep quality must be between {} and {} (got {value})",
                Self::MIN,
                Self::MAX
            )
        })
    }
}

impl From<SleepQuality> for u8 {
    fn from(q: SleepQuality) -> Self {
        q.0
    }
}

impl fmt::Display for SleepQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0, Self::MAX)
    }
}

/// `HH:MM` wire format for bedtime and wake time.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format("%H:%M"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_clock_time(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid time '{s}', expected HH:MM")))
    }
}

/// Parse an `HH:MM` clock time. Seconds are tolerated and dropped.
#[must_use]
pub fn parse_clock_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
        .and_then(|t| t.with_second(0))
}

/// Hours slept between `bedtime` and `wake`, rounded to one decimal.
///
/// A wake time earlier than bedtime means the night crossed midnight.
#[must_use]
pub fn sleep_duration_hours(bedtime: NaiveTime, wake: NaiveTime) -> f64 {
    let bed = i64::from(bedtime.num_seconds_from_midnight() / 60);
    let mut wake = i64::from(wake.num_seconds_from_midnight() / 60);
    if wake < bed {
        wake += MINUTES_PER_DAY;
    }
    #[allow(clippy::cast_precision_loss)]
    let hours = (wake - bed) as f64 / 60.0;
    round1(hours)
}

#[must_use]
pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

// --- Records ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseRecord {
    #[serde(alias = "$id")]
    pub id: String,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub exercise_type: String,
    /// Minutes.
    pub duration: u32,
    pub calories: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodRecord {
    #[serde(alias = "$id")]
    pub id: String,
    pub date: NaiveDate,
    pub meal: MealType,
    pub name: String,
    pub calories: u32,
    /// Grams.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepRecord {
    #[serde(alias = "$id")]
    pub id: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub bedtime: NaiveTime,
    #[serde(with = "hhmm")]
    pub wake_time: NaiveTime,
    /// Hours, derived from bedtime and wake time.
    pub duration: f64,
    pub quality: SleepQuality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightRecord {
    #[serde(alias = "$id")]
    pub id: String,
    pub date: NaiveDate,
    /// Kilograms.
    pub weight: f64,
    /// Percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_fat: Option<f64>,
    /// Percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muscle: Option<f64>,
}

// --- Creation shapes (a record before the backend assigns its id) ---

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExerciseRecord {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub exercise_type: String,
    pub duration: u32,
    pub calories: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFoodRecord {
    pub date: NaiveDate,
    pub meal: MealType,
    pub name: String,
    pub calories: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSleepRecord {
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub bedtime: NaiveTime,
    #[serde(with = "hhmm")]
    pub wake_time: NaiveTime,
    pub duration: f64,
    pub quality: SleepQuality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWeightRecord {
    pub date: NaiveDate,
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_fat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub muscle: Option<f64>,
}

/// Everything the tracker holds for one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HealthData {
    pub exercise: Vec<ExerciseRecord>,
    pub food: Vec<FoodRecord>,
    pub sleep: Vec<SleepRecord>,
    pub weight: Vec<WeightRecord>,
}

impl HealthData {
    #[must_use]
    pub fn count(&self, kind: RecordKind) -> usize {
        match kind {
            RecordKind::Exercise => self.exercise.len(),
            RecordKind::Food => self.food.len(),
            RecordKind::Sleep => self.sleep.len(),
            RecordKind::Weight => self.weight.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        RecordKind::ALL.into_iter().all(|k| self.count(k) == 0)
    }
}

/// A stored record of one kind, with its slot in [`HealthData`].
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: RecordKind;

    fn id(&self) -> &str;
    fn date(&self) -> NaiveDate;
    fn records(data: &HealthData) -> &[Self];
    fn records_mut(data: &mut HealthData) -> &mut Vec<Self>;
}

/// A record that hasn't been stored yet.
pub trait NewRecord: Serialize + Send + Sync {
    type Record: Record;
}

impl Record for ExerciseRecord {
    const KIND: RecordKind = RecordKind::Exercise;

    fn id(&self) -> &str {
        &self.id
    }
    fn date(&self) -> NaiveDate {
        self.date
    }
    fn records(data: &HealthData) -> &[Self] {
        &data.exercise
    }
    fn records_mut(data: &mut HealthData) -> &mut Vec<Self> {
        &mut data.exercise
    }
}

impl Record for FoodRecord {
    const KIND: RecordKind = RecordKind::Food;

    fn id(&self) -> &str {
        &self.id
    }
    fn date(&self) -> NaiveDate {
        self.date
    }
    fn records(data: &HealthData) -> &[Self] {
        &data.food
    }
    fn records_mut(data: &mut HealthData) -> &mut Vec<Self> {
        &mut data.food
    }
}

impl Record for SleepRecord {
    const KIND: RecordKind = RecordKind::Sleep;

    fn id(&self) -> &str {
        &self.id
    }
    fn date(&self) -> NaiveDate {
        self.date
    }
    fn records(data: &HealthData) -> &[Self] {
        &data.sleep
    }
    fn records_mut(data: &mut HealthData) -> &mut Vec<Self> {
        &mut data.sleep
    }
}

impl Record for WeightRecord {
    const KIND: RecordKind = RecordKind::Weight;

    fn id(&self) -> &str {
        &self.id
    }
    fn date(&self) -> NaiveDate {
        self.date
    }
    fn records(data: &HealthData) -> &[Self] {
        &data.weight
    }
    fn records_mut(data: &mut HealthData) -> &mut Vec<Self> {
        &mut data.weight
    }
}

impl NewRecord for NewExerciseRecord {
    type Record = ExerciseRecord;
}

impl NewRecord for NewFoodRecord {
    type Record = FoodRecord;
}

impl NewRecord for NewSleepRecord {
    type Record = SleepRecord;
}

impl NewRecord for NewWeightRecord {
    type Record = WeightRecord;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_sleep_duration_wraps_midnight() {
        assert!((sleep_duration_hours(t(23, 0), t(7, 0)) - 8.0).abs() < f64::EPSILON);
        assert!((sleep_duration_hours(t(22, 30), t(6, 45)) - 8.3).abs() < 1e-9);
    }

    #[test]
    fn test_sleep_duration_same_day() {
        assert!((sleep_duration_hours(t(1, 0), t(9, 30)) - 8.5).abs() < 1e-9);
        assert!((sleep_duration_hours(t(13, 0), t(14, 20)) - 1.3).abs() < 1e-9);
    }

    #[test]
    fn test_sleep_duration_equal_times_is_zero() {
        assert!(sleep_duration_hours(t(7, 0), t(7, 0)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_clock_time() {
        assert_eq!(parse_clock_time("23:00"), Some(t(23, 0)));
        assert_eq!(parse_clock_time(" 07:15 "), Some(t(7, 15)));
        assert_eq!(parse_clock_time("07:15:42"), Some(t(7, 15)));
        assert!(parse_clock_time("25:00").is_none());
        assert!(parse_clock_time("late").is_none());
    }

    #[test]
    fn test_record_kind_parse() {
        assert_eq!("Exercise".parse::<RecordKind>().unwrap(), RecordKind::Exercise);
        assert_eq!("weight".parse::<RecordKind>().unwrap(), RecordKind::Weight);
        let err = "steps".parse::<RecordKind>().unwrap_err();
        assert!(err.to_string().contains("exercise, food, sleep, weight"));
    }

    #[test]
    fn test_meal_type_case_insensitive() {
        assert_eq!("LUNCH".parse::<MealType>().unwrap(), MealType::Lunch);
        assert_eq!("snack".parse::<MealType>().unwrap(), MealType::Snack);
        assert!("brunch".parse::<MealType>().is_err());
    }

    #[test]
    fn test_sleep_quality_bounds() {
        assert!(SleepQuality::new(0).is_none());
        assert!(SleepQuality::new(6).is_none());
        assert_eq!(SleepQuality::new(4).unwrap().label(), "good");
        assert_eq!(SleepQuality::default().value(), 3);
        assert_eq!(SleepQuality::new(5).unwrap().to_string(), "5/5");
    }

    #[test]
    fn test_sleep_record_from_document() {
        let doc = serde_json::json!({
            "$id": "abc123",
            "$createdAt": "2024-06-15T07:05:00.000+00:00",
            "$collectionId": "sleep-records",
            "userId": "user1",
            "date": "2024-06-15",
            "bedtime": "23:00",
            "wakeTime": "07:00",
            "duration": 8,
            "quality": 4,
            "notes": null
        });
        let record: SleepRecord = serde_json::from_value(doc).unwrap();
        assert_eq!(record.id, "abc123");
        assert_eq!(record.wake_time, t(7, 0));
        assert!((record.duration - 8.0).abs() < f64::EPSILON);
        assert_eq!(record.quality.value(), 4);
        assert!(record.notes.is_none());
    }

    #[test]
    fn test_sleep_record_rejects_bad_quality() {
        let doc = serde_json::json!({
            "$id": "abc123",
            "date": "2024-06-15",
            "bedtime": "23:00",
            "wakeTime": "07:00",
            "duration": 8.0,
            "quality": 9
        });
        assert!(serde_json::from_value::<SleepRecord>(doc).is_err());
    }

    #[test]
    fn test_new_records_serialize_camel_case() {
        let record = NewWeightRecord {
            date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            weight: 70.5,
            body_fat: Some(18.0),
            muscle: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["date"], "2024-06-15");
        assert_eq!(json["bodyFat"], 18.0);
        assert!(json.get("muscle").is_none());

        let exercise = NewExerciseRecord {
            date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            exercise_type: "running".to_string(),
            duration: 30,
            calories: 250,
            notes: None,
        };
        let json = serde_json::to_value(&exercise).unwrap();
        assert_eq!(json["type"], "running");
    }

    #[test]
    fn test_health_data_counts() {
        let mut data = HealthData::default();
        assert!(data.is_empty());
        data.weight.push(WeightRecord {
            id: "w1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            weight: 70.0,
            body_fat: None,
            muscle: None,
        });
        assert!(!data.is_empty());
        assert_eq!(data.count(RecordKind::Weight), 1);
        assert_eq!(data.count(RecordKind::Food), 0);
    }
}
