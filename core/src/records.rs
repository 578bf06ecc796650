//! All four record kinds merged into one browsable list.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{
    ExerciseRecord, FoodRecord, HealthData, ParseEnumError, RecordKind, SleepRecord, WeightRecord,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RecordEntry {
    Exercise(ExerciseRecord),
    Food(FoodRecord),
    Sleep(SleepRecord),
    Weight(WeightRecord),
}

impl From<ExerciseRecord> for RecordEntry {
    fn from(r: ExerciseRecord) -> Self {
        Self::Exercise(r)
    }
}

impl From<FoodRecord> for RecordEntry {
    fn from(r: FoodRecord) -> Self {
        Self::Food(r)
    }
}

impl From<SleepRecord> for RecordEntry {
    fn from(r: SleepRecord) -> Self {
        Self::Sleep(r)
    }
}

impl From<WeightRecord> for RecordEntry {
    fn from(r: WeightRecord) -> Self {
        Self::Weight(r)
    }
}

impl RecordEntry {
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Exercise(_) => RecordKind::Exercise,
            Self::Food(_) => RecordKind::Food,
            Self::Sleep(_) => RecordKind::Sleep,
            Self::Weight(_) => RecordKind::Weight,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Exercise(r) => &r.id,
            Self::Food(r) => &r.id,
            Self::Sleep(r) => &r.id,
            Self::Weight(r) => &r.id,
        }
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Exercise(r) => r.date,
            Self::Food(r) => r.date,
            Self::Sleep(r) => r.date,
            Self::Weight(r) => r.date,
        }
    }

    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        match self {
            Self::Exercise(r) => r.notes.as_deref(),
            Self::Food(r) => r.notes.as_deref(),
            Self::Sleep(r) => r.notes.as_deref(),
            Self::Weight(_) => None,
        }
    }

    /// One-line headline for the entry.
    #[must_use]
    pub fn title(&self) -> String {
        match self {
            Self::Exercise(r) => format!(
                "{} - {} min, {} kcal",
                r.exercise_type, r.duration, r.calories
            ),
            Self::Food(r) => format!("{} - {} kcal", r.name, r.calories),
            Self::Sleep(r) => format!("Sleep {}h - quality {}", r.duration, r.quality),
            Self::Weight(r) => match r.body_fat.filter(|bf| *bf > 0.0) {
                Some(bf) => format!("Weight {}kg - body fat {bf}%", r.weight),
                None => format!("Weight {}kg", r.weight),
            },
        }
    }

    /// Secondary details, if the kind has any worth showing.
    #[must_use]
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Exercise(_) => None,
            Self::Food(r) => Some(match r.weight {
                Some(g) => format!("{}, {g}g", r.meal.label()),
                None => r.meal.label().to_string(),
            }),
            Self::Sleep(r) => Some(format!(
                "{} - {}",
                r.bedtime.format("%H:%M"),
                r.wake_time.format("%H:%M")
            )),
            Self::Weight(r) => r
                .muscle
                .filter(|m| *m > 0.0)
                .map(|m| format!("muscle {m}%")),
        }
    }
}

/// Which kinds a records listing shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Category {
    #[default]
    All,
    Only(RecordKind),
}

impl Category {
    #[must_use]
    pub fn includes(self, kind: RecordKind) -> bool {
        match self {
            Self::All => true,
            Self::Only(k) => k == kind,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(kind) => write!(f, "{kind}"),
        }
    }
}

impl FromStr for Category {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse::<RecordKind>()
            .map(Self::Only)
            .map_err(|e| ParseEnumError {
                what: "category",
                expected: format!("all, {}", e.expected),
                ..e
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecordCounts {
    pub exercise: usize,
    pub food: usize,
    pub sleep: usize,
    pub weight: usize,
}

impl RecordCounts {
    #[must_use]
    pub fn of(data: &HealthData) -> Self {
        Self {
            exercise: data.exercise.len(),
            food: data.food.len(),
            sleep: data.sleep.len(),
            weight: data.weight.len(),
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.exercise + self.food + self.sleep + self.weight
    }
}

/// Every record, newest date first. Same-day entries keep kind order
/// (exercise, food, sleep, weight) and then backend order.
#[must_use]
pub fn merge_records(data: &HealthData) -> Vec<RecordEntry> {
    let mut entries: Vec<RecordEntry> = data
        .exercise
        .iter()
        .cloned()
        .map(RecordEntry::from)
        .chain(data.food.iter().cloned().map(RecordEntry::from))
        .chain(data.sleep.iter().cloned().map(RecordEntry::from))
        .chain(data.weight.iter().cloned().map(RecordEntry::from))
        .collect();
    entries.sort_by(|a, b| b.date().cmp(&a.date()));
    entries
}

#[must_use]
pub fn filter_records(entries: Vec<RecordEntry>, category: Category) -> Vec<RecordEntry> {
    entries
        .into_iter()
        .filter(|e| category.includes(e.kind()))
        .collect()
}

#[must_use]
pub fn list_records(data: &HealthData, category: Category) -> Vec<RecordEntry> {
    filter_records(merge_records(data), category)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MealType, SleepQuality};
    use chrono::NaiveTime;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    fn sample() -> HealthData {
        HealthData {
            exercise: vec![ExerciseRecord {
                id: "e1".to_string(),
                date: d(14),
                exercise_type: "cycling".to_string(),
                duration: 60,
                calories: 480,
                notes: Some("hilly".to_string()),
            }],
            food: vec![
                FoodRecord {
                    id: "f2".to_string(),
                    date: d(15),
                    meal: MealType::Dinner,
                    name: "Pasta".to_string(),
                    calories: 700,
                    weight: Some(250),
                    notes: None,
                },
                FoodRecord {
                    id: "f1".to_string(),
                    date: d(14),
                    meal: MealType::Breakfast,
                    name: "Oatmeal".to_string(),
                    calories: 320,
                    weight: None,
                    notes: None,
                },
            ],
            sleep: vec![SleepRecord {
                id: "s1".to_string(),
                date: d(15),
                bedtime: NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
                wake_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
                duration: 8.0,
                quality: SleepQuality::new(4).unwrap(),
                notes: None,
            }],
            weight: vec![WeightRecord {
                id: "w1".to_string(),
                date: d(14),
                weight: 70.5,
                body_fat: Some(18.2),
                muscle: Some(35.0),
            }],
        }
    }

    #[test]
    fn test_merge_sorts_by_date_with_stable_kind_order() {
        let ids: Vec<String> = merge_records(&sample())
            .iter()
            .map(|e| e.id().to_string())
            .collect();
        assert_eq!(ids, vec!["f2", "s1", "e1", "f1", "w1"]);
    }

    #[test]
    fn test_filter_by_category() {
        let food = list_records(&sample(), Category::Only(RecordKind::Food));
        assert_eq!(food.len(), 2);
        assert!(food.iter().all(|e| e.kind() == RecordKind::Food));
        assert_eq!(list_records(&sample(), Category::All).len(), 5);
        assert!(list_records(&HealthData::default(), Category::All).is_empty());
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("all".parse::<Category>().unwrap(), Category::All);
        assert_eq!(
            "Sleep".parse::<Category>().unwrap(),
            Category::Only(RecordKind::Sleep)
        );
        let err = "steps".parse::<Category>().unwrap_err();
        assert!(err.to_string().contains("all, exercise"));
        assert_eq!(Category::Only(RecordKind::Food).to_string(), "food");
    }

    #[test]
    fn test_titles_and_details() {
        let entries = merge_records(&sample());
        let by_id = |id: &str| entries.iter().find(|e| e.id() == id).unwrap();

        assert_eq!(by_id("e1").title(), "cycling - 60 min, 480 kcal");
        assert_eq!(by_id("e1").detail(), None);
        assert_eq!(by_id("e1").notes(), Some("hilly"));
        assert_eq!(by_id("f2").title(), "Pasta - 700 kcal");
        assert_eq!(by_id("f2").detail().as_deref(), Some("Dinner, 250g"));
        assert_eq!(by_id("f1").detail().as_deref(), Some("Breakfast"));
        assert_eq!(by_id("s1").title(), "Sleep 8h - quality 4/5");
        assert_eq!(by_id("s1").detail().as_deref(), Some("23:00 - 07:00"));
        assert_eq!(by_id("w1").title(), "Weight 70.5kg - body fat 18.2%");
        assert_eq!(by_id("w1").detail().as_deref(), Some("muscle 35%"));
    }

    #[test]
    fn test_counts() {
        let counts = RecordCounts::of(&sample());
        assert_eq!(counts.food, 2);
        assert_eq!(counts.total(), 5);
    }

    #[test]
    fn test_entry_serializes_with_kind_tag() {
        let entries = list_records(&sample(), Category::Only(RecordKind::Weight));
        let json = serde_json::to_value(&entries[0]).unwrap();
        assert_eq!(json["kind"], "weight");
        assert_eq!(json["id"], "w1");
        assert_eq!(json["bodyFat"], 18.2);
    }
}
