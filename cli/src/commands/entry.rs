use anyhow::{Context, Result};
use std::process;

use healthlog_core::auth::AuthService;
use healthlog_core::forms::Form;
use healthlog_core::models::{NewRecord, RecordKind};
use healthlog_core::records::RecordEntry;

use super::bound_tracker;
use super::helpers::{json_error, today};

/// Validate `form`, then store it for the signed-in user.
pub(crate) async fn cmd_add<F>(auth: &AuthService, form: F, json: bool) -> Result<()>
where
    F: Form,
    <F::Output as NewRecord>::Record: Into<RecordEntry>,
{
    let record = form.to_record(today())?;
    let tracker = bound_tracker(auth).await?;
    let created = tracker
        .add(record)
        .await
        .context("Failed to save record")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&created)?);
        return Ok(());
    }

    let entry: RecordEntry = created.into();
    println!(
        "Logged {} for {} [{}]",
        entry.title(),
        entry.date().format("%Y-%m-%d"),
        entry.id()
    );
    if let Some(detail) = entry.detail() {
        println!("  {detail}");
    }
    if let Some(notes) = entry.notes() {
        println!("  Notes: {notes}");
    }
    Ok(())
}

pub(crate) async fn cmd_delete(auth: &AuthService, kind: &str, id: &str, json: bool) -> Result<()> {
    let kind: RecordKind = kind.parse()?;
    let tracker = bound_tracker(auth).await?;

    match tracker.delete_kind(kind, id).await {
        Ok(()) => {
            if json {
                println!("{}", serde_json::json!({ "deleted": id, "kind": kind }));
            } else {
                println!("Deleted {kind} record {id}");
            }
            Ok(())
        }
        Err(e) if e.is_not_found() => {
            if json {
                println!("{}", json_error(&format!("No {kind} record with ID {id}")));
            } else {
                eprintln!("No {kind} record with ID {id}");
            }
            process::exit(2);
        }
        Err(e) => Err(e).context("Failed to delete record"),
    }
}
