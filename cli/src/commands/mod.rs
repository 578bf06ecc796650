mod auth;
mod dashboard;
mod entry;
mod helpers;
mod records;

use std::sync::Arc;

use anyhow::{Context, Result};

use healthlog_core::appwrite::{AppwriteClient, User};
use healthlog_core::auth::AuthService;
use healthlog_core::database::RecordService;
use healthlog_core::tracker::Tracker;

pub(crate) use auth::{cmd_login, cmd_logout, cmd_recover, cmd_register, cmd_verify, cmd_whoami};
pub(crate) use dashboard::cmd_dashboard;
pub(crate) use entry::{cmd_add, cmd_delete};
pub(crate) use helpers::form_date;
pub(crate) use records::cmd_records;

fn record_service(client: &AppwriteClient) -> RecordService {
    RecordService::new(
        Arc::new(client.clone()),
        client.config().collections.clone(),
    )
}

async fn signed_in_user(auth: &AuthService) -> Result<User> {
    auth.current_user()
        .await
        .context("Not signed in. Run `healthlog auth login <email>` first")
}

/// A tracker for the signed-in user with every record loaded.
pub(crate) async fn load_tracker(auth: &AuthService) -> Result<Tracker> {
    let user = signed_in_user(auth).await?;
    let tracker = Tracker::new(record_service(auth.client()));
    tracker
        .set_user(Some(user))
        .await
        .context("Failed to load health records")?;
    Ok(tracker)
}

/// A tracker bound to the signed-in user, for single writes.
async fn bound_tracker(auth: &AuthService) -> Result<Tracker> {
    let user = signed_in_user(auth).await?;
    Ok(Tracker::with_user(record_service(auth.client()), user))
}
