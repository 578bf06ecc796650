use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use healthlog_core::auth::AuthService;
use healthlog_core::dashboard::{Dashboard, TodayOverview, WeeklySummary, build_dashboard};

use super::helpers::{one_decimal, parse_date};
use super::load_tracker;

#[derive(Tabled)]
struct CalorieRow {
    #[tabled(rename = "Day")]
    label: String,
    #[tabled(rename = "Consumed")]
    consumed: u64,
    #[tabled(rename = "Burned")]
    burned: u64,
    #[tabled(rename = "Net")]
    net: i64,
}

#[derive(Tabled)]
struct WeightRow {
    #[tabled(rename = "Day")]
    label: String,
    #[tabled(rename = "Weight (kg)")]
    weight: String,
    #[tabled(rename = "Body fat (%)")]
    body_fat: String,
}

fn today_lines(today: &TodayOverview) -> Vec<String> {
    let sleep = match today.sleep_quality {
        Some(q) => format!(
            "{} h, quality {q} ({})",
            one_decimal(today.sleep_hours),
            q.label()
        ),
        None => "none logged".to_string(),
    };
    let weight = match (today.latest_weight, today.latest_body_fat) {
        (Some(w), Some(bf)) => format!("{} kg, body fat {}%", one_decimal(w), one_decimal(bf)),
        (Some(w), None) => format!("{} kg", one_decimal(w)),
        (None, _) => "none logged".to_string(),
    };
    vec![
        format!(
            "  Exercise:  {} min, {} kcal burned",
            today.exercise_minutes, today.calories_burned
        ),
        format!("  Food:      {} kcal consumed", today.calories_consumed),
        format!("  Sleep:     {sleep}"),
        format!("  Weight:    {weight}"),
    ]
}

fn week_line(week: &WeeklySummary) -> String {
    format!(
        "  {} min exercise | {} kcal consumed | {} h average sleep ({} nights)",
        week.exercise_minutes,
        week.calories_consumed,
        one_decimal(week.average_sleep_hours),
        week.sleep_nights
    )
}

fn print_dashboard(dashboard: &Dashboard) {
    println!("=== {} ===\n", dashboard.today.date.format("%Y-%m-%d"));
    for line in today_lines(&dashboard.today) {
        println!("{line}");
    }

    println!("\nCalories, last 7 days");
    let rows: Vec<CalorieRow> = dashboard
        .daily_calories
        .iter()
        .map(|d| CalorieRow {
            label: d.label.clone(),
            consumed: d.consumed,
            burned: d.burned,
            net: d.net,
        })
        .collect();
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    let trend = &dashboard.weight_trend;
    if !trend.points.is_empty() {
        println!("\nWeight trend");
        let rows: Vec<WeightRow> = trend
            .points
            .iter()
            .map(|p| WeightRow {
                label: p.label.clone(),
                weight: one_decimal(p.weight),
                body_fat: if trend.show_body_fat && p.body_fat > 0.0 {
                    one_decimal(p.body_fat)
                } else {
                    "-".to_string()
                },
            })
            .collect();
        let table = Table::new(&rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{table}");
    }

    let week = &dashboard.week;
    println!(
        "\nWeek {} to {}",
        week.start.format("%Y-%m-%d"),
        week.end.format("%Y-%m-%d")
    );
    println!("{}", week_line(week));
}

pub(crate) async fn cmd_dashboard(auth: &AuthService, date: Option<String>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let tracker = load_tracker(auth).await?;
    let dashboard = build_dashboard(&tracker.snapshot(), date);

    if json {
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
    } else {
        print_dashboard(&dashboard);
    }
    Ok(())
}
