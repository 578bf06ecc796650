//! Derived views over [`HealthData`]: today's overview, the 7-day calorie
//! balance, the weight trend and the weekly summary.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::models::{HealthData, SleepQuality, WeightRecord, round1};

pub const WINDOW_DAYS: u64 = 7;
pub const WEIGHT_TREND_POINTS: usize = 14;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayOverview {
    pub date: NaiveDate,
    pub exercise_minutes: u64,
    pub calories_burned: u64,
    pub calories_consumed: u64,
    /// 0.0 when no sleep is logged for today.
    pub sleep_hours: f64,
    pub sleep_quality: Option<SleepQuality>,
    pub latest_weight: Option<f64>,
    pub latest_body_fat: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCalories {
    pub date: NaiveDate,
    /// `MM/dd`
    pub label: String,
    pub consumed: u64,
    pub burned: u64,
    pub net: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightPoint {
    pub date: NaiveDate,
    pub label: String,
    pub weight: f64,
    pub body_fat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightTrend {
    /// Oldest first.
    pub points: Vec<WeightPoint>,
    pub show_body_fat: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySummary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub exercise_minutes: u64,
    pub calories_consumed: u64,
    pub average_sleep_hours: f64,
    pub sleep_nights: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub today: TodayOverview,
    pub daily_calories: Vec<DailyCalories>,
    pub weight_trend: WeightTrend,
    pub week: WeeklySummary,
}

#[must_use]
pub fn build_dashboard(data: &HealthData, today: NaiveDate) -> Dashboard {
    Dashboard {
        today: today_overview(data, today),
        daily_calories: daily_calories(data, today),
        weight_trend: weight_trend(data),
        week: weekly_summary(data, today),
    }
}

fn window_start(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_days(Days::new(WINDOW_DAYS - 1))
        .unwrap_or(NaiveDate::MIN)
}

fn in_window(date: NaiveDate, today: NaiveDate) -> bool {
    (window_start(today)..=today).contains(&date)
}

fn label(date: NaiveDate) -> String {
    date.format("%m/%d").to_string()
}

/// The weight record with the latest date; among same-day entries the one
/// the backend returned first (most recently created).
fn latest_weight(records: &[WeightRecord]) -> Option<&WeightRecord> {
    records.iter().rev().max_by_key(|w| w.date)
}

#[must_use]
pub fn today_overview(data: &HealthData, today: NaiveDate) -> TodayOverview {
    let exercise = data.exercise.iter().filter(|e| e.date == today);
    let (exercise_minutes, calories_burned) = exercise.fold((0, 0), |(m, c), e| {
        (m + u64::from(e.duration), c + u64::from(e.calories))
    });
    let calories_consumed = data
        .food
        .iter()
        .filter(|f| f.date == today)
        .map(|f| u64::from(f.calories))
        .sum();
    let sleep = data.sleep.iter().find(|s| s.date == today);
    let weight = latest_weight(&data.weight);

    TodayOverview {
        date: today,
        exercise_minutes,
        calories_burned,
        calories_consumed,
        sleep_hours: sleep.map_or(0.0, |s| s.duration),
        sleep_quality: sleep.map(|s| s.quality),
        latest_weight: weight.map(|w| w.weight),
        latest_body_fat: weight.and_then(|w| w.body_fat),
    }
}

/// Consumed and burned calories per day, oldest day first.
#[must_use]
pub fn daily_calories(data: &HealthData, today: NaiveDate) -> Vec<DailyCalories> {
    let start = window_start(today);
    start
        .iter_days()
        .take_while(|d| *d <= today)
        .map(|date| {
            let consumed: u64 = data
                .food
                .iter()
                .filter(|f| f.date == date)
                .map(|f| u64::from(f.calories))
                .sum();
            let burned: u64 = data
                .exercise
                .iter()
                .filter(|e| e.date == date)
                .map(|e| u64::from(e.calories))
                .sum();
            #[allow(clippy::cast_possible_wrap)]
            let net = consumed as i64 - burned as i64;
            DailyCalories {
                date,
                label: label(date),
                consumed,
                burned,
                net,
            }
        })
        .collect()
}

#[must_use]
pub fn weight_trend(data: &HealthData) -> WeightTrend {
    // Oldest created first within a day, then a stable sort by date.
    let mut sorted: Vec<&WeightRecord> = data.weight.iter().rev().collect();
    sorted.sort_by_key(|w| w.date);
    let skip = sorted.len().saturating_sub(WEIGHT_TREND_POINTS);

    let points: Vec<WeightPoint> = sorted
        .into_iter()
        .skip(skip)
        .map(|w| WeightPoint {
            date: w.date,
            label: label(w.date),
            weight: w.weight,
            body_fat: w.body_fat.unwrap_or(0.0),
        })
        .collect();
    let show_body_fat = points.iter().any(|p| p.body_fat > 0.0);
    WeightTrend {
        points,
        show_body_fat,
    }
}

#[must_use]
pub fn weekly_summary(data: &HealthData, today: NaiveDate) -> WeeklySummary {
    let exercise_minutes = data
        .exercise
        .iter()
        .filter(|e| in_window(e.date, today))
        .map(|e| u64::from(e.duration))
        .sum();
    let calories_consumed = data
        .food
        .iter()
        .filter(|f| in_window(f.date, today))
        .map(|f| u64::from(f.calories))
        .sum();
    let nights: Vec<f64> = data
        .sleep
        .iter()
        .filter(|s| in_window(s.date, today))
        .map(|s| s.duration)
        .collect();

    WeeklySummary {
        start: window_start(today),
        end: today,
        exercise_minutes,
        calories_consumed,
        average_sleep_hours: average_sleep_hours(&nights),
        sleep_nights: nights.len(),
    }
}

/// Mean of `hours` to one decimal; 0.0 for no nights.
#[must_use]
pub fn average_sleep_hours(hours: &[f64]) -> f64 {
    if hours.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = hours.iter().sum::<f64>() / hours.len() as f64;
    round1(mean)
}
