//! Session commands.

use crate::app::App;
use crate::output::{self, OutputFormat};
use anyhow::{Context, Result};
use auth_state::{AuthError, SessionState};
use serde_json::json;

/// Probe the session and print who is logged in.
pub async fn whoami(app: &App, format: &OutputFormat) -> Result<()> {
    app.auth
        .mount()
        .await
        .context("Session probe task failed")?;
    let state = app.auth.state();
    app.auth.unmount();

    match format {
        OutputFormat::Text => match &state {
            SessionState::Authenticated(user) => {
                output::print_heading("Session");
                output::print_row("API", app.api.config().base_url.as_str());
                output::print_row("Status", "authenticated");
                output::print_row("User ID", &user.id);
                if let Some(name) = user.display_name() {
                    output::print_row("Name", name);
                }
                if let Some(email) = user.email.as_deref() {
                    output::print_row("Email", email);
                }
                if let Some(avatar) = user.avatar_url() {
                    output::print_row("Avatar", avatar);
                }
            }
            _ => {
                output::print_heading("Session");
                output::print_row("API", app.api.config().base_url.as_str());
                output::print_row("Status", "anonymous");
                println!("\nRun 'techinsights login-url' to sign in.");
            }
        },
        OutputFormat::Json => output::print_json(&state),
    }
    report_navigation(app, format);
    Ok(())
}

/// Print the external login URL.
pub fn login_url(app: &App, format: &OutputFormat) -> Result<()> {
    let url = app.auth.login_url()?;
    match format {
        OutputFormat::Text => {
            println!("Open this URL in a browser to sign in:");
            println!("  {}", url);
        }
        OutputFormat::Json => output::print_json(&json!({ "login_url": url.as_str() })),
    }
    Ok(())
}

/// Log out. Always succeeds locally.
pub async fn logout(app: &App, format: &OutputFormat) -> Result<()> {
    app.auth.logout().await;
    output::print_success("Logged out", format);
    report_navigation(app, format);
    Ok(())
}

/// Change the nickname of the current user.
pub async fn nickname(app: &App, nickname: &str, format: &OutputFormat) -> Result<()> {
    match app.auth.update_nickname(nickname).await {
        Ok(()) => {
            let shown = app
                .auth
                .user()
                .and_then(|u| u.nickname)
                .unwrap_or_else(|| nickname.trim().to_string());
            output::print_success(&format!("Nickname changed to {}", shown), format);
            Ok(())
        }
        Err(AuthError::SessionExpired) => {
            output::print_error("Session expired. Sign in again to change your nickname.", format);
            Ok(())
        }
        Err(e @ (AuthError::InvalidNickname(_) | AuthError::Rejected(_))) => {
            output::print_error(&e.to_string(), format);
            Ok(())
        }
        Err(e) if e.is_transient() => {
            output::print_error(
                &format!("Service temporarily unavailable, try again later ({})", e),
                format,
            );
            report_navigation(app, format);
            Ok(())
        }
        Err(e) => Err(e).context("Failed to update nickname"),
    }
}

/// Print the persisted anonymous device id, optionally rotating it first.
pub fn device_id(app: &App, reset: bool, format: &OutputFormat) -> Result<()> {
    if reset {
        app.identity
            .reset()
            .context("Failed to reset device id")?;
    }
    let id = app.identity.device_id();
    match format {
        OutputFormat::Text => output::print_row("Device ID", &id),
        OutputFormat::Json => output::print_json(&json!({
            "device_id": id,
            "store": app.paths.device_store_file(),
        })),
    }
    Ok(())
}

/// Show navigation the core requested (home, maintenance page).
pub(crate) fn report_navigation(app: &App, format: &OutputFormat) {
    for target in app.navigator.take() {
        match format {
            OutputFormat::Text => output::print_row("Redirect", &target),
            OutputFormat::Json => output::print_json(&json!({ "navigate": target })),
        }
    }
}
