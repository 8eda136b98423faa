use crate::auth::CredentialPair;
use crate::config::env_file::{ACCESS_TOKEN_KEY, DEVICE_ID_KEY, REFRESH_TOKEN_KEY};
use anyhow::{bail, Context, Result};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Password};
use std::io::IsTerminal;
use tracing::info;

/// Credentials identifying this client to the chat service.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub pair: CredentialPair,
    pub device_id: String,
}

/// Resolves the credential triple from already-parsed values, prompting for
/// whatever is missing when attached to a terminal.
///
/// Browser sessions expose these values as the `x-access-token` /
/// `x-device-id` request headers and the refresh token cookie.
pub fn load_credentials(
    access_token: Option<String>,
    refresh_token: Option<String>,
    device_id: Option<String>,
) -> Result<Credentials> {
    let access_token = resolve(access_token, ACCESS_TOKEN_KEY, "access token", true)?;
    let refresh_token = resolve(refresh_token, REFRESH_TOKEN_KEY, "refresh token", true)?;
    let device_id = resolve(device_id, DEVICE_ID_KEY, "device id", false)?;

    Ok(Credentials {
        pair: CredentialPair::new(access_token, refresh_token),
        device_id,
    })
}

/// Always prompts; used by the setup flow.
pub fn prompt_credentials() -> Result<Credentials> {
    Ok(Credentials {
        pair: CredentialPair::new(
            prompt(ACCESS_TOKEN_KEY, "access token", true)?,
            prompt(REFRESH_TOKEN_KEY, "refresh token", true)?,
        ),
        device_id: prompt(DEVICE_ID_KEY, "device id", false)?,
    })
}

fn resolve(value: Option<String>, key: &str, label: &str, secret: bool) -> Result<String> {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        return Ok(value.trim().to_string());
    }

    if !std::io::stdin().is_terminal() {
        bail!("`{key}` is not set and no terminal is attached to prompt for the {label}");
    }

    info!(target: "plain", "🔑 The `{key}` setting is not set.");
    prompt(key, label, secret)
}

fn prompt(key: &str, label: &str, secret: bool) -> Result<String> {
    let theme = ColorfulTheme::default();
    let prompt_text = format!("Please enter your {label} ({key})");
    let validator = |input: &String| -> Result<(), String> {
        if input.trim().is_empty() {
            Err(format!("The {label} cannot be empty"))
        } else {
            Ok(())
        }
    };

    let value = if secret {
        Password::with_theme(&theme)
            .with_prompt(prompt_text)
            .validate_with(validator)
            .interact()
    } else {
        Input::<String>::with_theme(&theme)
            .with_prompt(prompt_text)
            .validate_with(validator)
            .interact_text()
    }
    .with_context(|| format!("Failed to read {label} input"))?;

    Ok(value.trim().to_string())
}
