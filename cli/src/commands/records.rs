use anyhow::Result;
use std::process;
use tabled::{Table, Tabled, settings::Style};

use healthlog_core::auth::AuthService;
use healthlog_core::records::{Category, RecordCounts, RecordEntry, list_records};

use super::helpers::truncate;
use super::load_tracker;

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Entry")]
    title: String,
    #[tabled(rename = "Detail")]
    detail: String,
    #[tabled(rename = "Notes")]
    notes: String,
    #[tabled(rename = "ID")]
    id: String,
}

fn record_rows(entries: &[RecordEntry]) -> Vec<RecordRow> {
    entries
        .iter()
        .map(|e| RecordRow {
            date: e.date().format("%Y-%m-%d").to_string(),
            kind: e.kind().to_string(),
            title: e.title(),
            detail: e.detail().unwrap_or_default(),
            notes: e.notes().map(|n| truncate(n, 30)).unwrap_or_default(),
            id: e.id().to_string(),
        })
        .collect()
}

fn counts_line(counts: &RecordCounts) -> String {
    format!(
        "{} exercise | {} food | {} sleep | {} weight ({} total)",
        counts.exercise,
        counts.food,
        counts.sleep,
        counts.weight,
        counts.total()
    )
}

pub(crate) async fn cmd_records(auth: &AuthService, category: &str, json: bool) -> Result<()> {
    let category: Category = category.parse()?;
    let tracker = load_tracker(auth).await?;
    let data = tracker.snapshot();
    let entries = list_records(&data, category);
    let counts = RecordCounts::of(&data);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "category": category.to_string(),
                "records": entries,
                "counts": counts,
            }))?
        );
        return Ok(());
    }

    if entries.is_empty() {
        let message = match category {
            Category::All => "No records yet".to_string(),
            Category::Only(kind) => format!("No {kind} records yet"),
        };
        eprintln!("{message}");
        process::exit(2);
    }

    let table = Table::new(record_rows(&entries))
        .with(Style::rounded())
        .to_string();
    println!("{table}");
    println!("\n  {}", counts_line(&counts));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use healthlog_core::models::{FoodRecord, HealthData, MealType};

    #[test]
    fn test_record_rows() {
        let data = HealthData {
            food: vec![FoodRecord {
                id: "f1".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
                meal: MealType::Snack,
                name: "Apple".to_string(),
                calories: 80,
                weight: Some(150),
                notes: Some("Crisp and very fresh from the market this morning".to_string()),
            }],
            ..Default::default()
        };
        let rows = record_rows(&list_records(&data, Category::All));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, "2024-06-15");
        assert_eq!(rows[0].kind, "food");
        assert_eq!(rows[0].title, "Apple - 80 kcal");
        assert_eq!(rows[0].detail, "Snack, 150g");
        assert!(rows[0].notes.ends_with("..."));
        assert_eq!(rows[0].notes.chars().count(), 30);
    }

    #[test]
    fn test_counts_line() {
        let counts = RecordCounts {
            exercise: 3,
            food: 5,
            sleep: 2,
            weight: 4,
        };
        assert_eq!(
            counts_line(&counts),
            "3 exercise | 5 food | 2 sleep | 4 weight (14 total)"
        );
    }
}
