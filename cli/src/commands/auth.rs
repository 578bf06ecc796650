use anyhow::{Context, Result};
use std::process;

use healthlog_core::auth::AuthService;

use super::helpers::{json_error, prompt_line};
use crate::config::Config;

fn persist_session(config: &Config, auth: &AuthService) -> Result<()> {
    let secret = auth
        .client()
        .session_secret()
        .context("Backend did not return a session")?;
    config.save_session(&secret)
}

fn default_name(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

pub(crate) async fn cmd_register(
    config: &Config,
    auth: &AuthService,
    email: &str,
    name: Option<String>,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => prompt_line("Password")?,
    };
    let name = name.unwrap_or_else(|| default_name(email));

    let user = auth
        .register(email, &password, &name)
        .await
        .context("Registration failed")?;
    persist_session(config, auth)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
    } else {
        println!("Registered and signed in as {} <{}>", user.name, user.email);
        println!("Run `healthlog auth verify` to confirm your email address");
    }
    Ok(())
}

pub(crate) async fn cmd_login(
    config: &Config,
    auth: &AuthService,
    email: &str,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => prompt_line("Password")?,
    };
    let session = auth
        .login(email, &password)
        .await
        .context("Sign-in failed")?;
    persist_session(config, auth)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&session)?);
    } else {
        println!("Signed in as {email}");
    }
    Ok(())
}

pub(crate) async fn cmd_logout(config: &Config, auth: &AuthService, json: bool) -> Result<()> {
    if auth.client().session_secret().is_none() {
        config.clear_session()?;
        if json {
            println!("{}", serde_json::json!({ "signedOut": false }));
        } else {
            println!("Not signed in");
        }
        return Ok(());
    }

    let result = auth.logout().await;
    config.clear_session()?;
    result.context("Server sign-out failed (local session removed)")?;

    if json {
        println!("{}", serde_json::json!({ "signedOut": true }));
    } else {
        println!("Signed out");
    }
    Ok(())
}

pub(crate) async fn cmd_whoami(auth: &AuthService, json: bool) -> Result<()> {
    let Some(user) = auth.current_user().await else {
        if json {
            println!("{}", json_error("Not signed in"));
        } else {
            eprintln!("Not signed in. Run `healthlog auth login <email>`");
        }
        process::exit(2);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
    } else {
        println!("{} <{}>", user.name, user.email);
        println!("  ID: {}", user.id);
        if !user.email_verification {
            println!("  Email not verified (run `healthlog auth verify`)");
        }
    }
    Ok(())
}

pub(crate) async fn cmd_verify(auth: &AuthService, json: bool) -> Result<()> {
    auth.send_email_verification()
        .await
        .context("Failed to send verification email")?;
    if json {
        println!("{}", serde_json::json!({ "verificationSent": true }));
    } else {
        println!("Verification email sent");
    }
    Ok(())
}

pub(crate) async fn cmd_recover(auth: &AuthService, email: &str, json: bool) -> Result<()> {
    auth.reset_password(email)
        .await
        .context("Failed to send password recovery email")?;
    if json {
        println!("{}", serde_json::json!({ "recoverySent": true, "email": email }));
    } else {
        println!("Password recovery email sent to {email}");
    }
    Ok(())
}
